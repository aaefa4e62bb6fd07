//! # Datasets
//!
//! Named numeric data held by the document. One-dimensional datasets are a `data` column with
//! optional symmetric (`serr`), positive (`perr`) and negative (`nerr`) error columns, all the
//! same length. Two-dimensional datasets are a row-major [`Grid`].
//!
//! A dataset may remember where it came from: a file link (shared with every other dataset read
//! by the same import) or a [`Generator`] that recomputes it from expressions or ranges.

pub mod generate;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

pub use generate::Generator;

use crate::expr::ExprError;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DatasetError {
    #[error("{0:?} is not a dataset column (expected data, serr, perr or nerr)")]
    InvalidColumn(String),
    #[error("dataset has no {0} column")]
    MissingColumn(Column),
    #[error("rows {start}..{end} out of range for {len} rows")]
    RowsOutOfRange { start: usize, end: usize, len: usize },
    #[error("cell {0:?} out of range")]
    CellOutOfRange((usize, usize)),
    #[error("operation needs a one-dimensional dataset")]
    Not1D,
    #[error("operation needs a two-dimensional dataset")]
    Not2D,
    #[error("dataset is generated and cannot be edited directly")]
    Generated,
    #[error("{column} column has {found} values, expected {expected}")]
    LengthMismatch {
        column: Column,
        expected: usize,
        found: usize,
    },
    #[error("{0}")]
    Invalid(String),
    #[error("plugin {plugin:?} failed: {message}")]
    Plugin { plugin: String, message: String },
    #[error(transparent)]
    Expression(#[from] ExprError),
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum Column {
    Data,
    Serr,
    Perr,
    Nerr,
}
impl Column {
    pub fn parse(name: &str) -> Result<Self, DatasetError> {
        name.parse()
            .map_err(|_| DatasetError::InvalidColumn(name.to_owned()))
    }
}

/// Values removed by [`Columns::delete_rows`], by column.
pub type SavedRows = smallvec::SmallVec<[(Column, Vec<f64>); 4]>;

/// The columns of a 1D dataset. Every present column has the same length as `data`.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Columns {
    data: Vec<f64>,
    serr: Option<Vec<f64>>,
    perr: Option<Vec<f64>>,
    nerr: Option<Vec<f64>>,
}
impl Columns {
    #[must_use]
    pub fn new(data: Vec<f64>) -> Self {
        Self {
            data,
            ..Default::default()
        }
    }
    /// Builder to attach an error column. Checked against the length of `data`.
    pub fn with(mut self, column: Column, values: Vec<f64>) -> Result<Self, DatasetError> {
        self.replace_column(column, Some(values))?;
        Ok(self)
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    #[must_use]
    pub fn data(&self) -> &[f64] {
        &self.data
    }
    #[must_use]
    pub fn column(&self, column: Column) -> Option<&[f64]> {
        match column {
            Column::Data => Some(&self.data),
            Column::Serr => self.serr.as_deref(),
            Column::Perr => self.perr.as_deref(),
            Column::Nerr => self.nerr.as_deref(),
        }
    }
    fn column_vec_mut(&mut self, column: Column) -> Option<&mut Vec<f64>> {
        match column {
            Column::Data => Some(&mut self.data),
            Column::Serr => self.serr.as_mut(),
            Column::Perr => self.perr.as_mut(),
            Column::Nerr => self.nerr.as_mut(),
        }
    }
    /// Present columns, `data` first.
    pub fn present(&self) -> impl Iterator<Item = (Column, &[f64])> + '_ {
        use strum::IntoEnumIterator;
        Column::iter().filter_map(move |c| Some((c, self.column(c)?)))
    }
    /// Swap a column for `values`, returning what was there. `None` removes an error column.
    /// The `data` column cannot be removed, and all columns keep the current length.
    pub fn replace_column(
        &mut self,
        column: Column,
        values: Option<Vec<f64>>,
    ) -> Result<Option<Vec<f64>>, DatasetError> {
        if let Some(values) = &values {
            // A lone data column may change length freely.
            let only_data = column == Column::Data && self.present().count() == 1;
            if values.len() != self.len() && !only_data {
                return Err(DatasetError::LengthMismatch {
                    column,
                    expected: self.len(),
                    found: values.len(),
                });
            }
        }
        match (column, values) {
            (Column::Data, None) => Err(DatasetError::MissingColumn(Column::Data)),
            (Column::Data, Some(values)) => Ok(Some(std::mem::replace(&mut self.data, values))),
            (Column::Serr, values) => Ok(std::mem::replace(&mut self.serr, values)),
            (Column::Perr, values) => Ok(std::mem::replace(&mut self.perr, values)),
            (Column::Nerr, values) => Ok(std::mem::replace(&mut self.nerr, values)),
        }
    }
    /// Overwrite one value, returning the previous one.
    pub fn set_value(&mut self, column: Column, row: usize, value: f64) -> Result<f64, DatasetError> {
        let values = self
            .column_vec_mut(column)
            .ok_or(DatasetError::MissingColumn(column))?;
        let cell = values
            .get_mut(row)
            .ok_or(DatasetError::CellOutOfRange((row, 0)))?;
        Ok(std::mem::replace(cell, value))
    }
    fn check_rows(&self, start: usize, count: usize, inclusive_end: bool) -> Result<(), DatasetError> {
        let len = self.len();
        let end = start.saturating_add(count);
        let in_range = if inclusive_end {
            start <= len
        } else {
            end <= len
        };
        if in_range {
            Ok(())
        } else {
            Err(DatasetError::RowsOutOfRange { start, end, len })
        }
    }
    /// Remove `count` rows from every present column.
    pub fn delete_rows(&mut self, start: usize, count: usize) -> Result<SavedRows, DatasetError> {
        self.check_rows(start, count, false)?;
        let mut saved = SavedRows::new();
        for column in [Column::Data, Column::Serr, Column::Perr, Column::Nerr] {
            if let Some(values) = self.column_vec_mut(column) {
                saved.push((column, values.drain(start..start + count).collect()));
            }
        }
        Ok(saved)
    }
    /// Put back rows removed by [`Self::delete_rows`] at `start`.
    pub fn restore_rows(&mut self, start: usize, saved: SavedRows) -> Result<(), DatasetError> {
        self.check_rows(start, 0, true)?;
        for (column, values) in saved {
            let target = self
                .column_vec_mut(column)
                .ok_or(DatasetError::MissingColumn(column))?;
            target.splice(start..start, values);
        }
        Ok(())
    }
    /// Insert `count` zero rows at `start` in every present column. `start` may equal the length.
    pub fn insert_rows(&mut self, start: usize, count: usize) -> Result<(), DatasetError> {
        self.check_rows(start, 0, true)?;
        for column in [Column::Data, Column::Serr, Column::Perr, Column::Nerr] {
            if let Some(values) = self.column_vec_mut(column) {
                values.splice(start..start, std::iter::repeat(0.0).take(count));
            }
        }
        Ok(())
    }
}

/// Row-major 2D values. `xrange`/`yrange` are the coordinate spans of the columns and rows.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
    pub xrange: (f64, f64),
    pub yrange: (f64, f64),
}
impl Grid {
    pub fn new(
        rows: usize,
        cols: usize,
        data: Vec<f64>,
        xrange: (f64, f64),
        yrange: (f64, f64),
    ) -> Result<Self, DatasetError> {
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(DatasetError::Invalid(format!(
                "{} values do not fill a {rows}x{cols} grid",
                data.len()
            )));
        }
        Ok(Self {
            rows,
            cols,
            data,
            xrange,
            yrange,
        })
    }
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.data
    }
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        (row < self.rows && col < self.cols).then(|| self.data[row * self.cols + col])
    }
    /// Overwrite one cell, returning the previous value.
    pub fn set(&mut self, row: usize, col: usize, value: f64) -> Result<f64, DatasetError> {
        if row >= self.rows || col >= self.cols {
            return Err(DatasetError::CellOutOfRange((row, col)));
        }
        Ok(std::mem::replace(&mut self.data[row * self.cols + col], value))
    }
    /// Same shape and ranges, new values. Used for elementwise maths.
    pub(crate) fn map(&self, f: impl FnMut(f64) -> f64) -> Self {
        Self {
            data: self.data.iter().copied().map(f).collect(),
            ..self.clone()
        }
    }
    pub(crate) fn with_values(&self, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), self.data.len());
        Self {
            data,
            ..self.clone()
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Values {
    OneD(Columns),
    TwoD(Grid),
}
impl Values {
    #[must_use]
    pub fn dimensions(&self) -> usize {
        match self {
            Self::OneD(_) => 1,
            Self::TwoD(_) => 2,
        }
    }
    /// Bitwise equality, so NaNs compare equal to themselves.
    #[must_use]
    pub fn identical(&self, other: &Self) -> bool {
        let same = |a: &[f64], b: &[f64]| {
            a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.to_bits() == b.to_bits())
        };
        match (self, other) {
            (Self::OneD(a), Self::OneD(b)) => {
                a.present().count() == b.present().count()
                    && a.present()
                        .zip(b.present())
                        .all(|((ca, va), (cb, vb))| ca == cb && same(va, vb))
            }
            (Self::TwoD(a), Self::TwoD(b)) => {
                a.shape() == b.shape()
                    && same(a.values(), b.values())
                    && same(&[a.xrange.0, a.xrange.1], &[b.xrange.0, b.xrange.1])
                    && same(&[a.yrange.0, a.yrange.1], &[b.yrange.0, b.yrange.1])
            }
            _ => false,
        }
    }
}

/// Import parameters, shared between all datasets read from one file.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct LinkParams {
    /// How the file was read. Opaque to this crate.
    pub descriptor: String,
    /// Datasets renamed since the import, `original name -> current name`.
    pub renames: hashbrown::HashMap<String, String>,
}

#[derive(Clone, Debug)]
pub struct LinkedFile {
    pub filename: PathBuf,
    pub params: Arc<parking_lot::RwLock<LinkParams>>,
}
impl LinkedFile {
    #[must_use]
    pub fn new(filename: impl Into<PathBuf>, descriptor: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            params: Arc::new(parking_lot::RwLock::new(LinkParams {
                descriptor: descriptor.into(),
                renames: hashbrown::HashMap::new(),
            })),
        }
    }
}
impl PartialEq for LinkedFile {
    fn eq(&self, other: &Self) -> bool {
        // Same block: equal without locking (and without locking it twice).
        self.filename == other.filename
            && (Arc::ptr_eq(&self.params, &other.params)
                || *self.params.read() == *other.params.read())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    values: Values,
    generator: Option<Generator>,
    pub linked: Option<LinkedFile>,
    pub tags: BTreeSet<String>,
}
impl Dataset {
    #[must_use]
    pub fn new(values: Values) -> Self {
        Self {
            values,
            generator: None,
            linked: None,
            tags: BTreeSet::new(),
        }
    }
    #[must_use]
    pub fn one_d(data: Vec<f64>) -> Self {
        Self::new(Values::OneD(Columns::new(data)))
    }
    #[must_use]
    pub fn generated(values: Values, generator: Generator) -> Self {
        Self {
            generator: Some(generator),
            ..Self::new(values)
        }
    }
    #[must_use]
    pub fn with_link(mut self, link: LinkedFile) -> Self {
        self.linked = Some(link);
        self
    }
    #[must_use]
    pub fn values(&self) -> &Values {
        &self.values
    }
    /// Values for direct editing. Generated datasets are recomputed, not edited.
    pub fn values_mut(&mut self) -> Result<&mut Values, DatasetError> {
        if self.generator.is_some() {
            Err(DatasetError::Generated)
        } else {
            Ok(&mut self.values)
        }
    }
    pub fn columns_mut(&mut self) -> Result<&mut Columns, DatasetError> {
        match self.values_mut()? {
            Values::OneD(columns) => Ok(columns),
            Values::TwoD(_) => Err(DatasetError::Not1D),
        }
    }
    pub fn grid_mut(&mut self) -> Result<&mut Grid, DatasetError> {
        match self.values_mut()? {
            Values::TwoD(grid) => Ok(grid),
            Values::OneD(_) => Err(DatasetError::Not2D),
        }
    }
    #[must_use]
    pub fn generator(&self) -> Option<&Generator> {
        self.generator.as_ref()
    }
    pub(crate) fn replace_generated_values(&mut self, values: Values) {
        self.values = values;
    }
    #[must_use]
    pub fn is_linked_to(&self, filename: &std::path::Path) -> bool {
        self.linked.as_ref().is_some_and(|l| l.filename == filename)
    }
    /// A frozen copy: same values and tags, no generator and no file link.
    #[must_use]
    pub fn return_copy(&self) -> Self {
        Self {
            values: self.values.clone(),
            generator: None,
            linked: None,
            tags: self.tags.clone(),
        }
    }
}
