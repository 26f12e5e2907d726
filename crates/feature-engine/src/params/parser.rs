//! Recursive-descent parser and evaluator for parameter expressions.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! expr  := term (('+' | '-') term)*
//! term  := unary (('*' | '/') unary)*
//! unary := ('-' | '+') unary | power
//! power := atom ('^' unary)?
//! atom  := number | ident | ident '(' expr ')' | '(' expr ')'
//! ```

use std::ops::Range;

use super::ParamError;

pub const CONSTANTS: [&str; 2] = ["PI", "E"];

pub const FUNCTIONS: [&str; 14] = [
    "sin", "cos", "tan", "asin", "acos", "atan", "sqrt", "abs", "ln", "log10", "exp", "floor", "ceil", "round",
];

pub fn is_reserved(name: &str) -> bool {
    CONSTANTS.contains(&name) || FUNCTIONS.contains(&name)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

fn syntax(msg: impl Into<String>) -> ParamError {
    ParamError::EvaluationError(msg.into())
}

fn tokenize(src: &str) -> Result<Vec<(Token, Range<usize>)>, ParamError> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        let start = i;
        let token = match c {
            ' ' | '\t' | '\n' | '\r' => {
                i += 1;
                continue;
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '^' => Token::Caret,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '0'..='9' | '.' => {
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                    i += 1;
                }
                if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
                    let mut j = i + 1;
                    if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
                        j += 1;
                    }
                    if j < bytes.len() && bytes[j].is_ascii_digit() {
                        while j < bytes.len() && bytes[j].is_ascii_digit() {
                            j += 1;
                        }
                        i = j;
                    }
                }
                let text = &src[start..i];
                let value = text
                    .parse::<f64>()
                    .map_err(|_| syntax(format!("invalid number '{}'", text)))?;
                tokens.push((Token::Num(value), start..i));
                continue;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                tokens.push((Token::Ident(src[start..i].to_string()), start..i));
                continue;
            }
            other => return Err(syntax(format!("unexpected character '{}' at {}", other, start))),
        };
        i += 1;
        tokens.push((token, start..i));
    }
    Ok(tokens)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Const(f64),
    Ident(String),
    Neg(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call(String, Box<Expr>),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn expect(&mut self, want: Token) -> Result<(), ParamError> {
        match self.next() {
            Some(t) if t == want => Ok(()),
            Some(t) => Err(syntax(format!("expected {:?}, found {:?}", want, t))),
            None => Err(syntax(format!("expected {:?}, found end of input", want))),
        }
    }

    fn expr(&mut self) -> Result<Expr, ParamError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn term(&mut self) -> Result<Expr, ParamError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> Result<Expr, ParamError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Expr, ParamError> {
        let base = self.atom()?;
        if self.peek() == Some(&Token::Caret) {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(Expr::Binary(BinOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Expr, ParamError> {
        match self.next() {
            Some(Token::Num(v)) => Ok(Expr::Num(v)),
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    if !FUNCTIONS.contains(&name.as_str()) {
                        return Err(syntax(format!("unknown function '{}'", name)));
                    }
                    self.pos += 1;
                    let arg = self.expr()?;
                    self.expect(Token::RParen)?;
                    return Ok(Expr::Call(name, Box::new(arg)));
                }
                Ok(match name.as_str() {
                    "PI" => Expr::Const(std::f64::consts::PI),
                    "E" => Expr::Const(std::f64::consts::E),
                    _ => Expr::Ident(name),
                })
            }
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(t) => Err(syntax(format!("unexpected {:?}", t))),
            None => Err(syntax("unexpected end of input")),
        }
    }
}

pub fn parse(src: &str) -> Result<Expr, ParamError> {
    let tokens = tokenize(src)?.into_iter().map(|(t, _)| t).collect();
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expr()?;
    if let Some(t) = parser.peek() {
        return Err(syntax(format!("trailing input at {:?}", t)));
    }
    Ok(expr)
}

impl Expr {
    /// Parameter names referenced by this expression, in first-use order.
    pub fn identifiers(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_identifiers(&mut out);
        out
    }

    fn collect_identifiers(&self, out: &mut Vec<String>) {
        match self {
            Expr::Num(_) | Expr::Const(_) => {}
            Expr::Ident(name) => {
                if !out.contains(name) {
                    out.push(name.clone());
                }
            }
            Expr::Neg(inner) | Expr::Call(_, inner) => inner.collect_identifiers(out),
            Expr::Binary(_, a, b) => {
                a.collect_identifiers(out);
                b.collect_identifiers(out);
            }
        }
    }

    /// Evaluate with `lookup` supplying parameter values.
    pub fn eval(&self, lookup: &dyn Fn(&str) -> Result<f64, ParamError>) -> Result<f64, ParamError> {
        let v = match self {
            Expr::Num(v) | Expr::Const(v) => *v,
            Expr::Ident(name) => lookup(name)?,
            Expr::Neg(inner) => -inner.eval(lookup)?,
            Expr::Binary(op, a, b) => {
                let (a, b) = (a.eval(lookup)?, b.eval(lookup)?);
                match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => {
                        if b == 0.0 {
                            return Err(ParamError::EvaluationError("division by zero".into()));
                        }
                        a / b
                    }
                    BinOp::Pow => a.powf(b),
                }
            }
            Expr::Call(name, arg) => call(name, arg.eval(lookup)?)?,
        };
        if !v.is_finite() {
            return Err(ParamError::EvaluationError(format!("result is not finite ({})", v)));
        }
        Ok(v)
    }
}

fn call(name: &str, x: f64) -> Result<f64, ParamError> {
    let domain = |ok: bool| {
        if ok {
            Ok(())
        } else {
            Err(ParamError::EvaluationError(format!("{}({}) is outside the domain", name, x)))
        }
    };
    Ok(match name {
        "sin" => x.sin(),
        "cos" => x.cos(),
        "tan" => x.tan(),
        "asin" => {
            domain((-1.0..=1.0).contains(&x))?;
            x.asin()
        }
        "acos" => {
            domain((-1.0..=1.0).contains(&x))?;
            x.acos()
        }
        "atan" => x.atan(),
        "sqrt" => {
            domain(x >= 0.0)?;
            x.sqrt()
        }
        "abs" => x.abs(),
        "ln" => {
            domain(x > 0.0)?;
            x.ln()
        }
        "log10" => {
            domain(x > 0.0)?;
            x.log10()
        }
        "exp" => x.exp(),
        "floor" => x.floor(),
        "ceil" => x.ceil(),
        "round" => x.round(),
        other => return Err(ParamError::EvaluationError(format!("unknown function '{}'", other))),
    })
}

/// Rewrite every use of identifier `old` in `src` to `new`, leaving the rest
/// of the text untouched. Sources that do not tokenize come back unchanged.
pub fn rename_identifier(src: &str, old: &str, new: &str) -> String {
    let Ok(tokens) = tokenize(src) else {
        return src.to_string();
    };
    let mut out = String::with_capacity(src.len());
    let mut last = 0;
    for (token, span) in tokens {
        if matches!(&token, Token::Ident(name) if name == old) {
            out.push_str(&src[last..span.start]);
            out.push_str(new);
            last = span.end;
        }
    }
    out.push_str(&src[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(src: &str) -> Result<f64, ParamError> {
        parse(src)?.eval(&|name| Err(ParamError::UnknownReference(name.to_string())))
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(eval("1 + 2 * 3").unwrap(), 7.0);
        assert_eq!(eval("(1 + 2) * 3").unwrap(), 9.0);
        assert_eq!(eval("2 ^ 3 ^ 2").unwrap(), 512.0);
        assert_eq!(eval("-2 ^ 2").unwrap(), -4.0);
        assert_eq!(eval("2 ^ -1").unwrap(), 0.5);
        assert_eq!(eval("10 - 4 - 3").unwrap(), 3.0);
    }

    #[test]
    fn numbers_and_constants() {
        assert_eq!(eval("1.5e2").unwrap(), 150.0);
        assert_eq!(eval("2E-1").unwrap(), 0.2);
        assert!((eval("PI").unwrap() - std::f64::consts::PI).abs() < 1e-15);
        assert!((eval("cos(PI)").unwrap() + 1.0).abs() < 1e-15);
        assert_eq!(eval("round(2.6) + floor(-0.5)").unwrap(), 2.0);
    }

    #[test]
    fn errors() {
        assert!(matches!(eval("1 / 0"), Err(ParamError::EvaluationError(_))));
        assert!(matches!(eval("sqrt(-1)"), Err(ParamError::EvaluationError(_))));
        assert!(matches!(eval("1 +"), Err(ParamError::EvaluationError(_))));
        assert!(matches!(eval("foo(1)"), Err(ParamError::EvaluationError(_))));
        assert!(matches!(eval("(1"), Err(ParamError::EvaluationError(_))));
        assert_eq!(eval("w * 2"), Err(ParamError::UnknownReference("w".into())));
    }

    #[test]
    fn identifiers_skip_constants_and_functions() {
        let e = parse("sin(a) * PI + b - a").unwrap();
        assert_eq!(e.identifiers(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn rename_only_touches_whole_identifiers() {
        assert_eq!(rename_identifier("w*2 + width", "w", "len"), "len*2 + width");
    }
}
