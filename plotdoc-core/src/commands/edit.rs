//! In-place edits of stored datasets. Generated datasets refuse these.

use std::borrow::Cow;

use super::{applied, not_applied, CommandError, Operation, Outcome};
use crate::state::dataset::{Column, DatasetError, SavedRows};
use crate::Document;

/// Add (or reset) an error column, filled with zeros.
#[derive(Debug)]
pub struct DatasetAddColumn {
    name: String,
    column: Column,
    previous: Option<Option<Vec<f64>>>,
}
impl DatasetAddColumn {
    /// `column` is one of `data`, `serr`, `perr` or `nerr`.
    pub fn new(name: impl Into<String>, column: &str) -> Result<Self, DatasetError> {
        Ok(Self {
            name: name.into(),
            column: Column::parse(column)?,
            previous: None,
        })
    }
}
impl Operation for DatasetAddColumn {
    fn apply(&mut self, document: &mut Document) -> Result<Outcome, CommandError> {
        not_applied(&self.previous)?;
        let columns = document.dataset_mut(&self.name)?.columns_mut()?;
        let zeros = vec![0.0; columns.len()];
        let previous = columns.replace_column(self.column, Some(zeros))?;
        document.modified_data(&self.name);
        self.previous = Some(previous);
        Ok(Outcome::None)
    }
    fn undo(&mut self, document: &mut Document) -> Result<(), CommandError> {
        let previous = applied(&mut self.previous)?;
        document
            .dataset_mut(&self.name)?
            .columns_mut()?
            .replace_column(self.column, previous)?;
        document.modified_data(&self.name);
        Ok(())
    }
    fn descr(&self) -> Cow<'_, str> {
        "add dataset column".into()
    }
}

/// Overwrite one value of a 1D dataset.
#[derive(Debug)]
pub struct DatasetSetVal {
    name: String,
    column: Column,
    row: usize,
    value: f64,
    previous: Option<f64>,
}
impl DatasetSetVal {
    #[must_use]
    pub fn new(name: impl Into<String>, column: Column, row: usize, value: f64) -> Self {
        Self {
            name: name.into(),
            column,
            row,
            value,
            previous: None,
        }
    }
}
impl Operation for DatasetSetVal {
    fn apply(&mut self, document: &mut Document) -> Result<Outcome, CommandError> {
        not_applied(&self.previous)?;
        let previous = document
            .dataset_mut(&self.name)?
            .columns_mut()?
            .set_value(self.column, self.row, self.value)?;
        document.modified_data(&self.name);
        self.previous = Some(previous);
        Ok(Outcome::None)
    }
    fn undo(&mut self, document: &mut Document) -> Result<(), CommandError> {
        let previous = applied(&mut self.previous)?;
        document
            .dataset_mut(&self.name)?
            .columns_mut()?
            .set_value(self.column, self.row, previous)?;
        document.modified_data(&self.name);
        Ok(())
    }
    fn descr(&self) -> Cow<'_, str> {
        "change dataset value".into()
    }
}

/// Overwrite one cell of a 2D dataset.
#[derive(Debug)]
pub struct DatasetSetVal2D {
    name: String,
    row: usize,
    col: usize,
    value: f64,
    previous: Option<f64>,
}
impl DatasetSetVal2D {
    #[must_use]
    pub fn new(name: impl Into<String>, row: usize, col: usize, value: f64) -> Self {
        Self {
            name: name.into(),
            row,
            col,
            value,
            previous: None,
        }
    }
}
impl Operation for DatasetSetVal2D {
    fn apply(&mut self, document: &mut Document) -> Result<Outcome, CommandError> {
        not_applied(&self.previous)?;
        let previous = document
            .dataset_mut(&self.name)?
            .grid_mut()?
            .set(self.row, self.col, self.value)?;
        document.modified_data(&self.name);
        self.previous = Some(previous);
        Ok(Outcome::None)
    }
    fn undo(&mut self, document: &mut Document) -> Result<(), CommandError> {
        let previous = applied(&mut self.previous)?;
        document
            .dataset_mut(&self.name)?
            .grid_mut()?
            .set(self.row, self.col, previous)?;
        document.modified_data(&self.name);
        Ok(())
    }
    fn descr(&self) -> Cow<'_, str> {
        "change dataset value".into()
    }
}

/// Remove `count` rows from every column of a 1D dataset.
#[derive(Debug)]
pub struct DatasetDeleteRow {
    name: String,
    row: usize,
    count: usize,
    saved: Option<SavedRows>,
}
impl DatasetDeleteRow {
    #[must_use]
    pub fn new(name: impl Into<String>, row: usize, count: usize) -> Self {
        Self {
            name: name.into(),
            row,
            count,
            saved: None,
        }
    }
}
impl Operation for DatasetDeleteRow {
    fn apply(&mut self, document: &mut Document) -> Result<Outcome, CommandError> {
        not_applied(&self.saved)?;
        let saved = document
            .dataset_mut(&self.name)?
            .columns_mut()?
            .delete_rows(self.row, self.count)?;
        document.modified_data(&self.name);
        self.saved = Some(saved);
        Ok(Outcome::None)
    }
    fn undo(&mut self, document: &mut Document) -> Result<(), CommandError> {
        let saved = applied(&mut self.saved)?;
        document
            .dataset_mut(&self.name)?
            .columns_mut()?
            .restore_rows(self.row, saved)?;
        document.modified_data(&self.name);
        Ok(())
    }
    fn descr(&self) -> Cow<'_, str> {
        "delete dataset row".into()
    }
}

/// Insert `count` zero rows into every column of a 1D dataset.
#[derive(Debug)]
pub struct DatasetInsertRow {
    name: String,
    row: usize,
    count: usize,
    inserted: Option<()>,
}
impl DatasetInsertRow {
    #[must_use]
    pub fn new(name: impl Into<String>, row: usize, count: usize) -> Self {
        Self {
            name: name.into(),
            row,
            count,
            inserted: None,
        }
    }
}
impl Operation for DatasetInsertRow {
    fn apply(&mut self, document: &mut Document) -> Result<Outcome, CommandError> {
        not_applied(&self.inserted)?;
        document
            .dataset_mut(&self.name)?
            .columns_mut()?
            .insert_rows(self.row, self.count)?;
        document.modified_data(&self.name);
        self.inserted = Some(());
        Ok(Outcome::None)
    }
    fn undo(&mut self, document: &mut Document) -> Result<(), CommandError> {
        applied(&mut self.inserted)?;
        document
            .dataset_mut(&self.name)?
            .columns_mut()?
            .delete_rows(self.row, self.count)?;
        document.modified_data(&self.name);
        Ok(())
    }
    fn descr(&self) -> Cow<'_, str> {
        "insert dataset row".into()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::state::dataset::generate::Parts;
    use crate::state::dataset::{Columns, Dataset, Generator, Grid, Values};

    fn columns(doc: &Document, name: &str) -> Columns {
        match doc.dataset(name).unwrap().values() {
            Values::OneD(columns) => columns.clone(),
            Values::TwoD(_) => panic!("expected 1D"),
        }
    }
    fn document() -> Document {
        let mut doc = Document::new();
        let data: Vec<f64> = (0..10).map(f64::from).collect();
        let columns = Columns::new(data.clone())
            .with(Column::Serr, vec![0.5; 10])
            .unwrap()
            .with(Column::Perr, data.iter().map(|v| v * 2.0).collect())
            .unwrap();
        doc.set_data("d", Dataset::new(Values::OneD(columns)));
        let grid = Grid::new(2, 2, vec![1.0, 2.0, 3.0, 4.0], (0.0, 1.0), (0.0, 1.0)).unwrap();
        doc.set_data("g", Dataset::new(Values::TwoD(grid)));
        doc
    }

    #[test]
    fn delete_rows_undo_exactly() {
        let mut doc = document();
        let before = columns(&doc, "d");
        doc.apply(DatasetDeleteRow::new("d", 2, 3)).unwrap();
        let after = columns(&doc, "d");
        assert_eq!(after.len(), 7);
        assert_eq!(&after.data()[..3], [0.0, 1.0, 5.0]);
        assert_eq!(after.column(Column::Perr).unwrap().len(), 7);
        doc.undo().unwrap();
        assert_eq!(columns(&doc, "d"), before);

        // Past the end.
        assert!(doc.apply(DatasetDeleteRow::new("d", 8, 3)).is_err());
        assert_eq!(columns(&doc, "d"), before);
    }
    #[test]
    fn insert_rows() {
        let mut doc = document();
        let before = columns(&doc, "d");
        doc.apply(DatasetInsertRow::new("d", 10, 2)).unwrap();
        let after = columns(&doc, "d");
        assert_eq!(after.len(), 12);
        assert_eq!(after.column(Column::Serr).unwrap()[11], 0.0);
        doc.undo().unwrap();
        assert_eq!(columns(&doc, "d"), before);
        assert!(doc.apply(DatasetInsertRow::new("d", 11, 1)).is_err());
    }
    #[test]
    fn add_column() {
        let mut doc = document();
        let before = columns(&doc, "d");
        assert!(DatasetAddColumn::new("d", "xerr").is_err());

        doc.apply(DatasetAddColumn::new("d", "nerr").unwrap()).unwrap();
        assert_eq!(columns(&doc, "d").column(Column::Nerr), Some(&[0.0; 10][..]));
        doc.undo().unwrap();
        assert_eq!(columns(&doc, "d"), before);

        // Resetting an existing column restores its old values.
        doc.apply(DatasetAddColumn::new("d", "perr").unwrap()).unwrap();
        doc.undo().unwrap();
        assert_eq!(columns(&doc, "d"), before);
    }
    #[test]
    fn set_values() {
        let mut doc = document();
        doc.apply(DatasetSetVal::new("d", Column::Serr, 3, 9.0))
            .unwrap();
        assert_eq!(columns(&doc, "d").column(Column::Serr).unwrap()[3], 9.0);
        doc.undo().unwrap();
        assert_eq!(columns(&doc, "d").column(Column::Serr).unwrap()[3], 0.5);
        assert!(doc
            .apply(DatasetSetVal::new("d", Column::Nerr, 0, 1.0))
            .is_err());
        assert!(doc.apply(DatasetSetVal::new("g", Column::Data, 0, 1.0)).is_err());

        doc.apply(DatasetSetVal2D::new("g", 1, 0, 0.0)).unwrap();
        let Values::TwoD(grid) = doc.dataset("g").unwrap().values() else {
            panic!("expected 2D");
        };
        assert_eq!(grid.values(), [1.0, 2.0, 0.0, 4.0]);
        doc.undo().unwrap();
        let Values::TwoD(grid) = doc.dataset("g").unwrap().values() else {
            panic!("expected 2D");
        };
        assert_eq!(grid.values(), [1.0, 2.0, 3.0, 4.0]);
        assert!(doc.apply(DatasetSetVal2D::new("g", 2, 0, 0.0)).is_err());
    }
    #[test]
    fn generated_rejects_edits() {
        let mut doc = document();
        let generator = Generator::Range {
            numsteps: 3,
            parts: Parts::new((0.0, 1.0)),
        };
        let values = generator.evaluate(&doc.env()).unwrap();
        doc.set_data("gen", Dataset::generated(values, generator));
        assert!(matches!(
            doc.apply(DatasetSetVal::new("gen", Column::Data, 0, 1.0)),
            Err(CommandError::Dataset(DatasetError::Generated))
        ));
        assert!(doc.apply(DatasetInsertRow::new("gen", 0, 1)).is_err());
    }
}
