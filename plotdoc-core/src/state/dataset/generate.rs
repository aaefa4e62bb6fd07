//! Datasets computed from ranges or expressions, rather than stored.

use super::{Column, Columns, DatasetError, Grid, Values};
use crate::expr::{Env, ExprValue};
use crate::plugins::PluginOutput;
use crate::util;

/// Largest number of values a generator may produce.
pub const MAX_SAMPLES: usize = 10_000_000;

fn too_many(what: &str, count: impl std::fmt::Display) -> DatasetError {
    DatasetError::Invalid(format!("{what} would have {count} values, the limit is {MAX_SAMPLES}"))
}

/// A value for `data` and, optionally, each error column.
#[derive(Clone, Debug, PartialEq)]
pub struct Parts<T> {
    pub data: T,
    pub serr: Option<T>,
    pub perr: Option<T>,
    pub nerr: Option<T>,
}
impl<T> Parts<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            serr: None,
            perr: None,
            nerr: None,
        }
    }
    #[must_use]
    pub fn with(mut self, column: Column, value: T) -> Self {
        match column {
            Column::Data => self.data = value,
            Column::Serr => self.serr = Some(value),
            Column::Perr => self.perr = Some(value),
            Column::Nerr => self.nerr = Some(value),
        }
        self
    }
    pub fn iter(&self) -> impl Iterator<Item = (Column, &T)> + '_ {
        [
            (Column::Data, Some(&self.data)),
            (Column::Serr, self.serr.as_ref()),
            (Column::Perr, self.perr.as_ref()),
            (Column::Nerr, self.nerr.as_ref()),
        ]
        .into_iter()
        .filter_map(|(c, v)| Some((c, v?)))
    }
}

/// `t` runs from `t0` to `t1` (inclusive) in `numsteps` values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Parametric {
    pub t0: f64,
    pub t1: f64,
    pub numsteps: usize,
}

/// Sample points `min, min + step, ..., max`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Step {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}
impl Step {
    /// Number of samples, without producing them.
    fn len(self) -> Result<usize, DatasetError> {
        if ![self.min, self.max, self.step].iter().all(|v| v.is_finite()) {
            return Err(DatasetError::Invalid("range bounds must be finite".into()));
        }
        if self.step <= 0.0 {
            return Err(DatasetError::Invalid("step must be positive".into()));
        }
        match util::arange_len(self.min, self.max, self.step) {
            Some(0) => Err(DatasetError::Invalid(format!(
                "no values between {} and {}",
                self.min, self.max
            ))),
            Some(len) if len <= MAX_SAMPLES => Ok(len),
            Some(len) => Err(too_many("range", len)),
            None => Err(too_many("range", (self.max - self.min) / self.step)),
        }
    }
    fn samples(self) -> Result<Vec<f64>, DatasetError> {
        self.len()?;
        Ok(util::arange_inclusive(self.min, self.max, self.step))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Generator {
    /// Evenly spaced `(start, stop)` values per column.
    Range {
        numsteps: usize,
        parts: Parts<(f64, f64)>,
    },
    /// An expression per column, optionally of a parameter `t`.
    Expression {
        parts: Parts<String>,
        parametric: Option<Parametric>,
    },
    /// Scattered points gridded on their unique x and y values.
    Xyz { x: String, y: String, z: String },
    /// A single expression with a 2D result.
    Expression2D { expr: String },
    /// A function of `x` and `y` sampled on a regular grid.
    XyFunc { xstep: Step, ystep: Step, expr: String },
    /// One output of a dataset plugin.
    Plugin(PluginOutput),
}
impl Generator {
    /// Checks that need no evaluation.
    pub fn validate(&self) -> Result<(), DatasetError> {
        let positive = |numsteps: usize| {
            if numsteps == 0 {
                Err(DatasetError::Invalid("number of steps must be positive".into()))
            } else if numsteps > MAX_SAMPLES {
                Err(too_many("range", numsteps))
            } else {
                Ok(())
            }
        };
        match self {
            Self::Range { numsteps, parts } => {
                positive(*numsteps)?;
                if parts.iter().any(|(_, (a, b))| !a.is_finite() || !b.is_finite()) {
                    return Err(DatasetError::Invalid("range bounds must be finite".into()));
                }
                Ok(())
            }
            Self::Expression {
                parametric: Some(p),
                ..
            } => {
                positive(p.numsteps)?;
                if !p.t0.is_finite() || !p.t1.is_finite() {
                    return Err(DatasetError::Invalid("range of t must be finite".into()));
                }
                Ok(())
            }
            Self::XyFunc { xstep, ystep, .. } => {
                let cells = xstep.len()?.saturating_mul(ystep.len()?);
                if cells > MAX_SAMPLES {
                    return Err(too_many("grid", cells));
                }
                Ok(())
            }
            Self::Expression { .. }
            | Self::Xyz { .. }
            | Self::Expression2D { .. }
            | Self::Plugin(_) => Ok(()),
        }
    }

    /// Compute the values. Nothing is modified.
    pub fn evaluate(&self, env: &Env) -> Result<Values, DatasetError> {
        self.validate()?;
        match self {
            Self::Range { numsteps, parts } => {
                let mut columns = Columns::new(util::linspace(parts.data.0, parts.data.1, *numsteps));
                for (column, (start, stop)) in parts.iter().skip(1) {
                    columns.replace_column(column, Some(util::linspace(*start, *stop, *numsteps)))?;
                }
                Ok(Values::OneD(columns))
            }
            Self::Expression { parts, parametric } => {
                let env = match parametric {
                    Some(p) => env
                        .clone()
                        .with_variable("t", ExprValue::Vector(util::linspace(p.t0, p.t1, p.numsteps))),
                    None => env.clone(),
                };
                let data = to_vector(env.evaluate(&parts.data)?, parametric.map(|p| p.numsteps))?;
                let len = data.len();
                let mut columns = Columns::new(data);
                for (column, expr) in parts.iter().skip(1) {
                    let values = to_vector(env.evaluate(expr)?, Some(len))?;
                    columns.replace_column(column, Some(values))?;
                }
                Ok(Values::OneD(columns))
            }
            Self::Xyz { x, y, z } => {
                let x = to_vector(env.evaluate(x)?, None)?;
                let y = to_vector(env.evaluate(y)?, Some(x.len()))?;
                let z = to_vector(env.evaluate(z)?, Some(x.len()))?;
                Ok(Values::TwoD(grid_points(&x, &y, &z)?))
            }
            Self::Expression2D { expr } => match env.evaluate(expr)? {
                ExprValue::Grid(grid) => {
                    non_empty(&grid)?;
                    Ok(Values::TwoD(grid))
                }
                _ => Err(DatasetError::Not2D),
            },
            Self::XyFunc { xstep, ystep, expr } => {
                let xs = xstep.samples()?;
                let ys = ystep.samples()?;
                let (rows, cols) = (ys.len(), xs.len());
                let xrange = util::cell_range(&xs);
                let yrange = util::cell_range(&ys);
                let xgrid: Vec<f64> = (0..rows).flat_map(|_| xs.iter().copied()).collect();
                let ygrid: Vec<f64> = ys
                    .iter()
                    .flat_map(|&y| std::iter::repeat(y).take(cols))
                    .collect();
                let xgrid = Grid::new(rows, cols, xgrid, xrange, yrange)?;
                let ygrid = xgrid.with_values(ygrid);
                let env = env
                    .clone()
                    .with_variable("x", ExprValue::Grid(xgrid.clone()))
                    .with_variable("y", ExprValue::Grid(ygrid));
                let grid = match env.evaluate(expr)? {
                    ExprValue::Grid(grid) => grid,
                    ExprValue::Scalar(v) => xgrid.map(|_| v),
                    ExprValue::Vector(_) => return Err(DatasetError::Not2D),
                };
                Ok(Values::TwoD(grid))
            }
            Self::Plugin(output) => output.evaluate(env),
        }
    }
}

fn non_empty(grid: &Grid) -> Result<(), DatasetError> {
    let (rows, cols) = grid.shape();
    if rows == 0 || cols == 0 {
        Err(DatasetError::Invalid("2D dataset would be empty".into()))
    } else {
        Ok(())
    }
}

/// Scalars broadcast to `len` (or a single value), vectors must match it.
fn to_vector(value: ExprValue, len: Option<usize>) -> Result<Vec<f64>, DatasetError> {
    match value {
        ExprValue::Scalar(v) => Ok(vec![v; len.unwrap_or(1)]),
        ExprValue::Vector(values) => match len {
            Some(len) if len != values.len() => Err(crate::expr::ExprError::Length(len, values.len()).into()),
            _ => Ok(values),
        },
        ExprValue::Grid(_) => Err(DatasetError::Not1D),
    }
}

/// Grid scattered `(x, y, z)` points on the sorted unique x and y values. Cells with no point
/// are NaN. Later points overwrite earlier ones in the same cell.
fn grid_points(x: &[f64], y: &[f64], z: &[f64]) -> Result<Grid, DatasetError> {
    let xs = util::sorted_unique(x);
    let ys = util::sorted_unique(y);
    if xs.is_empty() || ys.is_empty() {
        return Err(DatasetError::Invalid("2D dataset would be empty".into()));
    }
    let cols = xs.len();
    let mut values = vec![f64::NAN; ys.len() * cols];
    for ((x, y), z) in x.iter().zip(y).zip(z) {
        let (Ok(col), Ok(row)) = (
            xs.binary_search_by(|v| v.total_cmp(x)),
            ys.binary_search_by(|v| v.total_cmp(y)),
        ) else {
            // NaN coordinates.
            continue;
        };
        values[row * cols + col] = *z;
    }
    Grid::new(ys.len(), cols, values, util::cell_range(&xs), util::cell_range(&ys))
}
