use serde::{Deserialize, Serialize};

/// A numeric operation field: either a literal or an expression over parameters.
///
/// Serialized untagged, so documents hold `5.0` or `"width * 2"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Value(f64),
    Expr(String),
}

impl Scalar {
    pub fn expr(text: impl Into<String>) -> Self {
        Scalar::Expr(text.into())
    }

    /// Resolve with `eval` for expressions; literals pass straight through.
    pub fn resolve<E>(&self, eval: impl FnOnce(&str) -> Result<f64, E>) -> Result<f64, E> {
        match self {
            Scalar::Value(v) => Ok(*v),
            Scalar::Expr(text) => eval(text),
        }
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Value(v)
    }
}

impl From<&str> for Scalar {
    fn from(text: &str) -> Self {
        Scalar::Expr(text.to_string())
    }
}
