//! Named parameters with expressions that may reference each other.

pub mod parser;
pub mod unit;

use std::collections::{BTreeMap, HashMap};

use history_types::ParamId;
use serde::{Deserialize, Serialize};

use crate::types::EngineError;
pub use unit::Unit;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamError {
    #[error("cyclic reference")]
    CyclicReference,

    #[error("unknown reference '{0}'")]
    UnknownReference(String),

    #[error("{0}")]
    EvaluationError(String),
}

/// How a new parameter is specified.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamInput {
    Value(f64),
    Expr(String),
}

impl ParamInput {
    fn into_text(self) -> String {
        match self {
            ParamInput::Value(v) => v.to_string(),
            ParamInput::Expr(text) => text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub id: ParamId,
    pub name: String,
    pub expression: String,
    /// Last successfully evaluated value.
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub unit: Unit,
}

/// The parameter table of a studio.
///
/// Every mutation re-evaluates the whole table. A parameter that fails keeps
/// its last good value and gets an entry in `errors`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamEnv {
    #[serde(with = "history_types::pairs")]
    params: BTreeMap<ParamId, Parameter>,
    #[serde(skip)]
    errors: BTreeMap<ParamId, ParamError>,
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl ParamEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn params(&self) -> impl Iterator<Item = &Parameter> {
        self.params.values()
    }

    pub fn get(&self, id: ParamId) -> Option<&Parameter> {
        self.params.get(&id)
    }

    pub fn by_name(&self, name: &str) -> Option<&Parameter> {
        self.params.values().find(|p| p.name == name)
    }

    pub fn value_of(&self, name: &str) -> Option<f64> {
        self.by_name(name).and_then(|p| p.value)
    }

    pub fn error(&self, id: ParamId) -> Option<&ParamError> {
        self.errors.get(&id)
    }

    pub fn errors(&self) -> &BTreeMap<ParamId, ParamError> {
        &self.errors
    }

    fn check_name(&self, name: &str, except: Option<ParamId>) -> Result<(), EngineError> {
        if !is_identifier(name) || parser::is_reserved(name) {
            return Err(EngineError::InvalidParamName { name: name.to_string() });
        }
        if self.params.values().any(|p| p.name == name && Some(p.id) != except) {
            return Err(EngineError::DuplicateParamName { name: name.to_string() });
        }
        Ok(())
    }

    /// Check names for validity and uniqueness, e.g. after loading a document.
    pub fn validate(&self) -> Result<(), EngineError> {
        for (id, p) in &self.params {
            if *id != p.id {
                return Err(EngineError::InvalidDocument(format!(
                    "parameter stored under {} carries id {}",
                    id, p.id
                )));
            }
            self.check_name(&p.name, Some(p.id))?;
        }
        Ok(())
    }

    pub fn add_parameter(
        &mut self,
        name: impl Into<String>,
        input: ParamInput,
        unit: Unit,
    ) -> Result<ParamId, EngineError> {
        let name = name.into();
        self.check_name(&name, None)?;
        let id = ParamId::new();
        self.params.insert(
            id,
            Parameter {
                id,
                name,
                expression: input.into_text(),
                value: None,
                unit,
            },
        );
        self.evaluate_all();
        Ok(id)
    }

    /// Replace a parameter's expression. Returns whether any value changed.
    pub fn update_expression(&mut self, id: ParamId, expression: impl Into<String>) -> Result<bool, EngineError> {
        let param = self.params.get_mut(&id).ok_or(EngineError::ParamNotFound { id })?;
        param.expression = expression.into();
        Ok(self.evaluate_all())
    }

    /// Remove a parameter. Dependents report an unknown reference afterwards.
    pub fn remove_parameter(&mut self, id: ParamId) -> Result<Parameter, EngineError> {
        let removed = self.params.remove(&id).ok_or(EngineError::ParamNotFound { id })?;
        self.errors.remove(&id);
        self.evaluate_all();
        Ok(removed)
    }

    /// Rename a parameter and rewrite every expression that uses the old name.
    pub fn rename_parameter(&mut self, id: ParamId, new_name: impl Into<String>) -> Result<(), EngineError> {
        let new_name = new_name.into();
        let old_name = self
            .params
            .get(&id)
            .map(|p| p.name.clone())
            .ok_or(EngineError::ParamNotFound { id })?;
        self.check_name(&new_name, Some(id))?;
        for p in self.params.values_mut() {
            p.expression = parser::rename_identifier(&p.expression, &old_name, &new_name);
        }
        if let Some(p) = self.params.get_mut(&id) {
            p.name = new_name;
        }
        self.evaluate_all();
        Ok(())
    }

    /// Evaluate an expression against the current parameter values.
    pub fn evaluate_inline(&self, expression: &str) -> Result<f64, ParamError> {
        let expr = parser::parse(expression)?;
        expr.eval(&|name| {
            let p = self
                .by_name(name)
                .ok_or_else(|| ParamError::UnknownReference(name.to_string()))?;
            if self.errors.contains_key(&p.id) {
                return Err(ParamError::EvaluationError(format!(
                    "depends on failed parameter '{}'",
                    name
                )));
            }
            p.value
                .ok_or_else(|| ParamError::EvaluationError(format!("parameter '{}' has no value", name)))
        })
    }

    /// Re-evaluate every parameter in dependency order. Returns whether any
    /// value changed.
    pub fn evaluate_all(&mut self) -> bool {
        let ids: Vec<ParamId> = self.params.keys().copied().collect();
        let names: Vec<String> = self.params.values().map(|p| p.name.clone()).collect();
        let index: HashMap<&str, usize> = names.iter().enumerate().map(|(i, n)| (n.as_str(), i)).collect();

        let mut errors: BTreeMap<ParamId, ParamError> = BTreeMap::new();
        let mut parsed = Vec::with_capacity(ids.len());
        let mut deps: Vec<Vec<usize>> = vec![Vec::new(); ids.len()];
        for (i, p) in self.params.values().enumerate() {
            match parser::parse(&p.expression) {
                Ok(expr) => {
                    for name in expr.identifiers() {
                        match index.get(name.as_str()) {
                            Some(&j) => deps[i].push(j),
                            None => {
                                errors.entry(p.id).or_insert(ParamError::UnknownReference(name));
                            }
                        }
                    }
                    parsed.push(Some(expr));
                }
                Err(e) => {
                    errors.insert(p.id, e);
                    parsed.push(None);
                }
            }
        }

        let components = strongly_connected(&deps);
        for component in &components {
            let cyclic = component.len() > 1 || deps[component[0]].contains(&component[0]);
            if cyclic {
                for &i in component {
                    errors.insert(ids[i], ParamError::CyclicReference);
                }
            }
        }

        // Components come out dependencies first.
        let mut values: Vec<Option<f64>> = self.params.values().map(|p| p.value).collect();
        for component in &components {
            let [i] = component.as_slice() else {
                continue;
            };
            let i = *i;
            if errors.contains_key(&ids[i]) {
                continue;
            }
            if let Some(&j) = deps[i].iter().find(|&&j| errors.contains_key(&ids[j])) {
                errors.insert(
                    ids[i],
                    ParamError::EvaluationError(format!("depends on failed parameter '{}'", names[j])),
                );
                continue;
            }
            let Some(expr) = &parsed[i] else {
                continue;
            };
            let result = expr.eval(&|name| {
                index
                    .get(name)
                    .and_then(|&j| values[j])
                    .ok_or_else(|| ParamError::UnknownReference(name.to_string()))
            });
            match result {
                Ok(v) => values[i] = Some(v),
                Err(e) => {
                    errors.insert(ids[i], e);
                }
            }
        }

        let mut changed = false;
        for (p, value) in self.params.values_mut().zip(values) {
            if p.value != value {
                changed = true;
                p.value = value;
            }
        }
        for (id, e) in &errors {
            if let Some(p) = self.params.get(id) {
                tracing::debug!(param = %p.name, error = %e, "parameter failed to evaluate");
            }
        }
        self.errors = errors;
        changed
    }
}

/// Tarjan's algorithm. Components are returned so that every component comes
/// after all components it points to.
fn strongly_connected(edges: &[Vec<usize>]) -> Vec<Vec<usize>> {
    struct Walk<'a> {
        edges: &'a [Vec<usize>],
        index: Vec<Option<usize>>,
        low: Vec<usize>,
        on_stack: Vec<bool>,
        stack: Vec<usize>,
        next: usize,
        out: Vec<Vec<usize>>,
    }

    impl Walk<'_> {
        fn visit(&mut self, v: usize) {
            self.index[v] = Some(self.next);
            self.low[v] = self.next;
            self.next += 1;
            self.stack.push(v);
            self.on_stack[v] = true;
            for k in 0..self.edges[v].len() {
                let w = self.edges[v][k];
                match self.index[w] {
                    None => {
                        self.visit(w);
                        self.low[v] = self.low[v].min(self.low[w]);
                    }
                    Some(iw) if self.on_stack[w] => self.low[v] = self.low[v].min(iw),
                    Some(_) => {}
                }
            }
            if self.index[v] == Some(self.low[v]) {
                let mut component = Vec::new();
                while let Some(w) = self.stack.pop() {
                    self.on_stack[w] = false;
                    component.push(w);
                    if w == v {
                        break;
                    }
                }
                self.out.push(component);
            }
        }
    }

    let n = edges.len();
    let mut walk = Walk {
        edges,
        index: vec![None; n],
        low: vec![0; n],
        on_stack: vec![false; n],
        stack: Vec::new(),
        next: 0,
        out: Vec::new(),
    };
    for v in 0..n {
        if walk.index[v].is_none() {
            walk.visit(v);
        }
    }
    walk.out
}
