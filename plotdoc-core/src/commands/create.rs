//! Datasets made from ranges and expressions.
//!
//! Each command either keeps its [`Generator`] on the new dataset ("linked"), so it is recomputed
//! whenever the customs or any other dataset change, or installs a plain copy of the values.
//! A linked dataset cannot read the dataset it replaces.

use std::borrow::Cow;

use super::dataset::Backup;
use super::{CommandError, Operation, Outcome};
use crate::state::dataset::generate::{Parametric, Parts, Step};
use crate::state::dataset::{Dataset, Generator, Values};
use crate::Document;

#[derive(Debug)]
struct Create {
    name: String,
    generator: Generator,
    linked: bool,
    backup: Backup,
}
impl Create {
    fn new(name: String, generator: Generator, linked: bool) -> Self {
        Self {
            name,
            generator,
            linked,
            backup: Backup::default(),
        }
    }
    fn evaluate(&self, document: &Document) -> Result<Values, CommandError> {
        let env = if self.linked {
            document.env().hiding(&self.name)
        } else {
            document.env()
        };
        Ok(self.generator.evaluate(&env)?)
    }
    fn apply(&mut self, document: &mut Document) -> Result<Outcome, CommandError> {
        if self.backup.is_taken() {
            return Err(CommandError::AlreadyApplied);
        }
        let values = self.evaluate(document)?;
        let dataset = if self.linked {
            Dataset::generated(values, self.generator.clone())
        } else {
            Dataset::new(values)
        };
        self.backup.install(document, &self.name, dataset)?;
        Ok(Outcome::Dataset(self.name.clone()))
    }
    fn undo(&mut self, document: &mut Document) -> Result<(), CommandError> {
        self.backup.restore(document, &self.name)?;
        Ok(())
    }
}

macro_rules! create_commands {
    ($($(#[$meta:meta])* $name:ident => $descr:literal,)*) => {
        $(
            $(#[$meta])*
            #[derive(Debug)]
            pub struct $name(Create);
            impl $name {
                /// Check that the dataset can be computed, without touching the document.
                pub fn validate_expression(&self, document: &Document) -> Result<(), CommandError> {
                    self.0.evaluate(document).map(|_| ())
                }
                #[must_use]
                pub fn generator(&self) -> &Generator {
                    &self.0.generator
                }
            }
            impl Operation for $name {
                fn apply(&mut self, document: &mut Document) -> Result<Outcome, CommandError> {
                    self.0.apply(document)
                }
                fn undo(&mut self, document: &mut Document) -> Result<(), CommandError> {
                    self.0.undo(document)
                }
                fn descr(&self) -> Cow<'_, str> {
                    $descr.into()
                }
            }
        )*
    };
}

create_commands! {
    /// Evenly spaced values for `data` and any error columns.
    DatasetCreateRange => "create dataset from range",
    /// Expressions of a parameter `t`.
    DatasetCreateParametric => "create parametric dataset",
    /// Expressions over datasets and customs.
    DatasetCreateExpression => "create dataset from expression",
    /// Scattered `x`, `y`, `z` points gridded into a 2D dataset.
    Dataset2DCreateExpressionXYZ => "create 2D dataset from x, y and z",
    Dataset2DCreateExpression => "create 2D dataset from expression",
    /// A function of `x` and `y` sampled on a grid.
    Dataset2DCreateXYFunc => "create 2D dataset from function of x and y",
}

impl DatasetCreateRange {
    /// `parts` are `(start, stop)` for each column.
    #[must_use]
    pub fn new(name: impl Into<String>, numsteps: usize, parts: Parts<(f64, f64)>, linked: bool) -> Self {
        Self(Create::new(
            name.into(),
            Generator::Range { numsteps, parts },
            linked,
        ))
    }
}
impl DatasetCreateParametric {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        t0: f64,
        t1: f64,
        numsteps: usize,
        parts: Parts<String>,
        linked: bool,
    ) -> Self {
        Self(Create::new(
            name.into(),
            Generator::Expression {
                parts,
                parametric: Some(Parametric { t0, t1, numsteps }),
            },
            linked,
        ))
    }
}
impl DatasetCreateExpression {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        parts: Parts<String>,
        linked: bool,
        parametric: Option<Parametric>,
    ) -> Self {
        Self(Create::new(
            name.into(),
            Generator::Expression { parts, parametric },
            linked,
        ))
    }
}
impl Dataset2DCreateExpressionXYZ {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        x: impl Into<String>,
        y: impl Into<String>,
        z: impl Into<String>,
        linked: bool,
    ) -> Self {
        Self(Create::new(
            name.into(),
            Generator::Xyz {
                x: x.into(),
                y: y.into(),
                z: z.into(),
            },
            linked,
        ))
    }
}
impl Dataset2DCreateExpression {
    #[must_use]
    pub fn new(name: impl Into<String>, expr: impl Into<String>, linked: bool) -> Self {
        Self(Create::new(
            name.into(),
            Generator::Expression2D { expr: expr.into() },
            linked,
        ))
    }
}
impl Dataset2DCreateXYFunc {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        xstep: Step,
        ystep: Step,
        expr: impl Into<String>,
        linked: bool,
    ) -> Self {
        Self(Create::new(
            name.into(),
            Generator::XyFunc {
                xstep,
                ystep,
                expr: expr.into(),
            },
            linked,
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::commands::custom::SetCustom;
    use crate::commands::dataset::{DatasetDelete, DatasetSet};
    use crate::commands::edit::DatasetSetVal;
    use crate::state::custom::Custom;
    use crate::state::dataset::generate::MAX_SAMPLES;
    use crate::state::dataset::{Column, DatasetError};

    fn data(doc: &Document, name: &str) -> Vec<f64> {
        match doc.dataset(name).unwrap().values() {
            Values::OneD(columns) => columns.data().to_vec(),
            Values::TwoD(_) => panic!("expected 1D"),
        }
    }

    #[test]
    fn range_replaces_and_restores() {
        let mut doc = Document::new();
        doc.set_data("r", Dataset::one_d(vec![9.0]));
        let outcome = doc
            .apply(DatasetCreateRange::new(
                "r",
                5,
                Parts::new((0.0, 1.0)).with(Column::Serr, (0.1, 0.1)),
                false,
            ))
            .unwrap();
        assert_eq!(outcome, Outcome::Dataset("r".into()));
        assert_eq!(data(&doc, "r"), [0.0, 0.25, 0.5, 0.75, 1.0]);
        assert!(doc.dataset("r").unwrap().generator().is_none());
        doc.undo().unwrap();
        assert_eq!(data(&doc, "r"), [9.0]);
    }
    #[test]
    fn validation_before_install() {
        let mut doc = Document::new();
        assert!(doc
            .apply(DatasetCreateRange::new("r", 0, Parts::new((0.0, 1.0)), false))
            .is_err());
        assert!(doc
            .apply(DatasetCreateRange::new("r", 3, Parts::new((0.0, f64::INFINITY)), false))
            .is_err());
        let bad = DatasetCreateExpression::new("e", Parts::new("nope * 2".into()), false, None);
        assert!(matches!(
            bad.validate_expression(&doc),
            Err(CommandError::Dataset(_))
        ));
        assert!(doc.data().is_empty());
        assert!(!doc.can_undo());
    }
    #[test]
    fn parametric() {
        let mut doc = Document::new();
        doc.apply(DatasetCreateParametric::new(
            "p",
            0.0,
            2.0,
            3,
            Parts::new("t * 10".into()).with(Column::Perr, "1".into()),
            true,
        ))
        .unwrap();
        assert_eq!(data(&doc, "p"), [0.0, 10.0, 20.0]);
        assert!(doc.dataset("p").unwrap().generator().is_some());
    }
    #[test]
    fn linked_follows_customs() {
        let mut doc = Document::new();
        doc.set_data("x", Dataset::one_d(vec![1.0, 2.0]));
        doc.apply(SetCustom::new(vec![Custom::constant("k", "2")]))
            .unwrap();
        doc.apply(DatasetCreateExpression::new("linked", Parts::new("x * k".into()), true, None))
            .unwrap();
        doc.apply(DatasetCreateExpression::new("frozen", Parts::new("x * k".into()), false, None))
            .unwrap();
        assert_eq!(data(&doc, "linked"), [2.0, 4.0]);

        doc.apply(SetCustom::new(vec![Custom::constant("k", "3")]))
            .unwrap();
        assert_eq!(data(&doc, "linked"), [3.0, 6.0]);
        assert_eq!(data(&doc, "frozen"), [2.0, 4.0]);
        doc.undo().unwrap();
        assert_eq!(data(&doc, "linked"), [2.0, 4.0]);
    }
    #[test]
    fn two_d() {
        let mut doc = Document::new();
        doc.set_data("xs", Dataset::one_d(vec![0.0, 1.0, 0.0]));
        doc.set_data("ys", Dataset::one_d(vec![0.0, 0.0, 1.0]));
        doc.set_data("zs", Dataset::one_d(vec![5.0, 6.0, 7.0]));
        doc.apply(Dataset2DCreateExpressionXYZ::new("g", "xs", "ys", "zs", false))
            .unwrap();
        let Values::TwoD(grid) = doc.dataset("g").unwrap().values() else {
            panic!("expected 2D");
        };
        assert_eq!(grid.shape(), (2, 2));
        assert_eq!(grid.get(0, 1), Some(6.0));
        assert!(grid.get(1, 1).unwrap().is_nan());

        let step = Step {
            min: 0.0,
            max: 1.0,
            step: 0.5,
        };
        doc.apply(Dataset2DCreateXYFunc::new("f", step, step, "x + y", true))
            .unwrap();
        let Values::TwoD(grid) = doc.dataset("f").unwrap().values() else {
            panic!("expected 2D");
        };
        assert_eq!(grid.shape(), (3, 3));
        assert_eq!(grid.get(2, 1), Some(1.5));

        doc.apply(Dataset2DCreateExpression::new("twice", "f * 2", false))
            .unwrap();
        assert!(doc
            .apply(Dataset2DCreateExpression::new("one", "xs * 2", false))
            .is_err());

        let bad = Step { step: 0.0, ..step };
        assert!(doc
            .apply(Dataset2DCreateXYFunc::new("bad", bad, step, "x", false))
            .is_err());
        doc.undo().unwrap();
        assert!(doc.dataset("twice").is_err());
    }
    #[test]
    fn linked_follows_source_data() {
        let mut doc = Document::new();
        doc.set_data("x", Dataset::one_d(vec![1.0, 2.0]));
        doc.apply(DatasetCreateExpression::new("y", Parts::new("x * 2".into()), true, None))
            .unwrap();
        doc.apply(DatasetCreateExpression::new("frozen", Parts::new("x * 2".into()), false, None))
            .unwrap();
        // Through a chain of linked datasets too.
        doc.apply(DatasetCreateExpression::new("w", Parts::new("y + 1".into()), true, None))
            .unwrap();

        doc.apply(DatasetSetVal::new("x", Column::Data, 0, 10.0)).unwrap();
        assert_eq!(data(&doc, "y"), [20.0, 4.0]);
        assert_eq!(data(&doc, "w"), [21.0, 5.0]);
        assert_eq!(data(&doc, "frozen"), [2.0, 4.0]);

        doc.apply(DatasetSet::new("x", Dataset::one_d(vec![3.0, 4.0, 5.0])))
            .unwrap();
        assert_eq!(data(&doc, "y"), [6.0, 8.0, 10.0]);
        assert_eq!(data(&doc, "w"), [7.0, 9.0, 11.0]);

        doc.undo().unwrap();
        assert_eq!(data(&doc, "y"), [20.0, 4.0]);
        doc.undo().unwrap();
        assert_eq!(data(&doc, "y"), [2.0, 4.0]);
        assert_eq!(data(&doc, "w"), [3.0, 5.0]);
        doc.redo().unwrap();
        assert_eq!(data(&doc, "y"), [20.0, 4.0]);

        // Without its source a linked dataset keeps what it had.
        doc.apply(DatasetDelete::new("x")).unwrap();
        assert_eq!(data(&doc, "y"), [20.0, 4.0]);
    }
    #[test]
    fn linked_cannot_read_itself() {
        let mut doc = Document::new();
        doc.set_data("x", Dataset::one_d(vec![1.0, 2.0]));
        assert!(matches!(
            doc.apply(DatasetCreateExpression::new("x", Parts::new("x * 2".into()), true, None)),
            Err(CommandError::Dataset(DatasetError::Expression(_)))
        ));
        doc.apply(DatasetCreateExpression::new("x", Parts::new("x * 2".into()), false, None))
            .unwrap();
        assert_eq!(data(&doc, "x"), [2.0, 4.0]);
        doc.apply(DatasetSetVal::new("x", Column::Data, 0, 5.0)).unwrap();
        assert_eq!(data(&doc, "x"), [5.0, 4.0]);
    }
    #[test]
    fn oversized_steps_rejected() {
        let mut doc = Document::new();
        let huge = Step {
            min: 0.0,
            max: 1e300,
            step: 1e-300,
        };
        let create = Dataset2DCreateXYFunc::new("z", huge, huge, "x+y", true);
        assert!(matches!(
            create.validate_expression(&doc),
            Err(CommandError::Dataset(DatasetError::Invalid(_)))
        ));
        assert!(doc.apply(create).is_err());

        let unit = Step {
            min: 0.0,
            max: 1.0,
            step: 0.5,
        };
        let backwards = Step {
            min: 1.0,
            max: 0.0,
            step: 0.5,
        };
        let nan = Step {
            step: f64::NAN,
            ..unit
        };
        for bad in [backwards, nan] {
            assert!(doc
                .apply(Dataset2DCreateXYFunc::new("z", bad, unit, "x", false))
                .is_err());
        }
        assert!(doc
            .apply(DatasetCreateRange::new("r", MAX_SAMPLES + 1, Parts::new((0.0, 1.0)), false))
            .is_err());
        assert!(doc.data().is_empty());
        assert!(!doc.can_undo());
    }
}
