//! # Expressions
//!
//! A small vectorised expression language used by generated datasets and custom definitions.
//! Values are scalars, vectors (1D dataset data) or grids (2D datasets), combined elementwise
//! with scalars broadcasting over the others.

pub mod context;
mod eval;
pub mod parser;

use std::collections::BTreeMap;

pub use context::EvalContext;
pub use parser::Expr;

use crate::state::dataset::{Dataset, Grid, Values};

/// Nested custom function calls deeper than this are assumed to be runaway recursion.
pub const MAX_DEPTH: usize = 32;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error("syntax error at {position}: {message}")]
    Syntax { position: usize, message: String },
    #[error("unknown name `{0}`")]
    UnknownName(String),
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    #[error("`{name}` takes {expected} arguments, got {found}")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("cannot combine values of length {0} and {1}")]
    Length(usize, usize),
    #[error("cannot combine grids of shape {0:?} and {1:?}")]
    Shape((usize, usize), (usize, usize)),
    #[error("cannot combine a vector with a grid")]
    Mixed,
    #[error("too much recursion evaluating `{0}`")]
    TooDeep(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprValue {
    Scalar(f64),
    Vector(Vec<f64>),
    Grid(Grid),
}
impl ExprValue {
    #[must_use]
    pub fn map(&self, mut f: impl FnMut(f64) -> f64) -> Self {
        match self {
            Self::Scalar(v) => Self::Scalar(f(*v)),
            Self::Vector(values) => Self::Vector(values.iter().copied().map(f).collect()),
            Self::Grid(grid) => Self::Grid(grid.map(f)),
        }
    }
    /// Combine elementwise, broadcasting scalars.
    pub fn zip_with(&self, other: &Self, f: impl Fn(f64, f64) -> f64) -> Result<Self, ExprError> {
        let zip = |a: &[f64], b: &[f64]| -> Vec<f64> {
            a.iter().zip(b).map(|(&a, &b)| f(a, b)).collect()
        };
        Ok(match (self, other) {
            (Self::Scalar(a), Self::Scalar(b)) => Self::Scalar(f(*a, *b)),
            (Self::Scalar(a), b) => b.map(|b| f(*a, b)),
            (a, Self::Scalar(b)) => a.map(|a| f(a, *b)),
            (Self::Vector(a), Self::Vector(b)) => {
                if a.len() != b.len() {
                    return Err(ExprError::Length(a.len(), b.len()));
                }
                Self::Vector(zip(a, b))
            }
            (Self::Grid(a), Self::Grid(b)) => {
                if a.shape() != b.shape() {
                    return Err(ExprError::Shape(a.shape(), b.shape()));
                }
                Self::Grid(a.with_values(zip(a.values(), b.values())))
            }
            (Self::Vector(_), Self::Grid(_)) | (Self::Grid(_), Self::Vector(_)) => {
                return Err(ExprError::Mixed)
            }
        })
    }
    /// Number of elements. Scalars count as one.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Scalar(_) => 1,
            Self::Vector(values) => values.len(),
            Self::Grid(grid) => grid.values().len(),
        }
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
impl From<f64> for ExprValue {
    fn from(value: f64) -> Self {
        Self::Scalar(value)
    }
}

/// Everything an expression can see while being evaluated.
#[derive(Clone)]
pub struct Env<'a> {
    context: &'a EvalContext,
    data: &'a BTreeMap<String, Dataset>,
    variables: Vec<(&'a str, ExprValue)>,
    /// A dataset that can't see itself.
    hidden: Option<&'a str>,
    depth: usize,
}
impl<'a> Env<'a> {
    #[must_use]
    pub fn new(context: &'a EvalContext, data: &'a BTreeMap<String, Dataset>) -> Self {
        Self {
            context,
            data,
            variables: Vec::new(),
            hidden: None,
            depth: 0,
        }
    }
    /// Hide the dataset `name`, for evaluating something that will replace it.
    #[must_use]
    pub fn hiding(mut self, name: &'a str) -> Self {
        self.hidden = Some(name);
        self
    }
    #[must_use]
    pub fn dataset(&self, name: &str) -> Option<&'a Dataset> {
        if self.hidden == Some(name) {
            None
        } else {
            self.data.get(name)
        }
    }
    /// Bind a variable, shadowing any earlier binding, custom or dataset of the same name.
    #[must_use]
    pub fn with_variable(mut self, name: &'a str, value: impl Into<ExprValue>) -> Self {
        self.variables.push((name, value.into()));
        self
    }
    /// Look up a bare name: variables, then custom constants, then datasets, then `pi` and `e`.
    pub fn lookup(&self, name: &str) -> Result<ExprValue, ExprError> {
        if let Some((_, value)) = self.variables.iter().rev().find(|(n, _)| *n == name) {
            return Ok(value.clone());
        }
        if let Some(value) = self.context.constant(name) {
            return Ok(value.clone());
        }
        if let Some(dataset) = self.dataset(name) {
            return Ok(match dataset.values() {
                Values::OneD(columns) => ExprValue::Vector(columns.data().to_vec()),
                Values::TwoD(grid) => ExprValue::Grid(grid.clone()),
            });
        }
        match name {
            "pi" => Ok(ExprValue::Scalar(std::f64::consts::PI)),
            "e" => Ok(ExprValue::Scalar(std::f64::consts::E)),
            _ => Err(ExprError::UnknownName(name.to_owned())),
        }
    }
    pub fn evaluate(&self, source: &str) -> Result<ExprValue, ExprError> {
        let expr = parser::parse(source)?;
        self.eval(&expr)
    }
    pub fn eval(&self, expr: &Expr) -> Result<ExprValue, ExprError> {
        eval::eval(expr, self)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::state::custom::Custom;

    fn data() -> BTreeMap<String, Dataset> {
        let mut data = BTreeMap::new();
        data.insert("x".to_owned(), Dataset::one_d(vec![1.0, 2.0, 3.0]));
        data.insert("odd name".to_owned(), Dataset::one_d(vec![10.0, 20.0, 30.0]));
        data.insert("short".to_owned(), Dataset::one_d(vec![1.0]));
        data
    }
    #[test]
    fn vector_arithmetic() {
        let data = data();
        let context = EvalContext::default();
        let env = Env::new(&context, &data);
        assert_eq!(
            env.evaluate("x*2 + `odd name`").unwrap(),
            ExprValue::Vector(vec![12.0, 24.0, 36.0])
        );
        assert_eq!(
            env.evaluate("x + short"),
            Err(ExprError::Length(3, 1))
        );
        assert_eq!(env.evaluate("-2^2").unwrap(), ExprValue::Scalar(-4.0));
        assert_eq!(env.evaluate("2**3**2").unwrap(), ExprValue::Scalar(512.0));
        assert!(matches!(env.evaluate("nothing"), Err(ExprError::UnknownName(_))));

        let env = env.hiding("x");
        assert!(env.dataset("x").is_none());
        assert_eq!(env.evaluate("x"), Err(ExprError::UnknownName("x".into())));
        assert!(env.evaluate("short").is_ok());
    }
    #[test]
    fn variables_shadow() {
        let data = data();
        let context = EvalContext::default();
        let env = Env::new(&context, &data).with_variable("x", 5.0);
        assert_eq!(env.evaluate("x + 1").unwrap(), ExprValue::Scalar(6.0));
    }
    #[test]
    fn customs_visible() {
        let data = data();
        let customs = [
            Custom::constant("k", "2"),
            Custom::function("sq(a)", "a*a*k"),
            Custom::constant("broken", "1 +"),
        ];
        let context = EvalContext::build(&customs, &data);
        assert!(context.constant("broken").is_none());
        let env = Env::new(&context, &data);
        assert_eq!(env.evaluate("sq(3)").unwrap(), ExprValue::Scalar(18.0));
        assert!(matches!(
            env.evaluate("sq(1, 2)"),
            Err(ExprError::Arity { expected: 1, found: 2, .. })
        ));
    }
    #[test]
    fn runaway_recursion() {
        let data = BTreeMap::new();
        let customs = [Custom::function("f(a)", "f(a)")];
        let context = EvalContext::build(&customs, &data);
        let env = Env::new(&context, &data);
        assert_eq!(env.evaluate("f(1)"), Err(ExprError::TooDeep("f".into())));
    }
}
