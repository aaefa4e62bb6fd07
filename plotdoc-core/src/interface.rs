//! Scripting-level access to a document. Every modifying call issues one ordinary command
//! through [`Document::apply`], so it is recorded like any other, or collected into an open batch.

use crate::commands::custom::SetCustom;
use crate::commands::create::{DatasetCreateExpression, DatasetCreateRange};
use crate::commands::dataset::{DataTag, DatasetSet};
use crate::commands::setting::SettingSet;
use crate::commands::widget::{WidgetAdd, WidgetDelete, WidgetRename};
use crate::commands::{Command, CommandError, Outcome};
use crate::state::custom::{Custom, CustomKind};
use crate::state::dataset::generate::{Parametric, Parts};
use crate::state::dataset::{Column, Columns, Dataset, Values};
use crate::state::path;
use crate::state::setting::{SettingValue, Value};
use crate::state::tree::WidgetKind;
use crate::Document;

pub struct CommandInterface<'d> {
    document: &'d mut Document,
    /// Widget that relative paths start from.
    current: String,
}
impl<'d> CommandInterface<'d> {
    pub fn new(document: &'d mut Document) -> Self {
        Self {
            document,
            current: "/".to_owned(),
        }
    }
    #[must_use]
    pub fn document(&self) -> &Document {
        self.document
    }
    #[must_use]
    pub fn current(&self) -> &str {
        &self.current
    }
    fn absolute(&self, target: &str) -> String {
        path::resolve_relative(&self.current, target)
    }
    fn apply(&mut self, command: impl Into<Command>) -> Result<Outcome, CommandError> {
        self.document.apply(command)
    }
    /// Change the current widget.
    pub fn to(&mut self, target: &str) -> Result<(), CommandError> {
        let target = self.absolute(target);
        self.document.resolve_widget(&target)?;
        self.current = target;
        Ok(())
    }
    pub fn set(&mut self, setting: &str, value: Value) -> Result<(), CommandError> {
        let setting = self.absolute(setting);
        self.apply(SettingSet::new(setting, value))?;
        Ok(())
    }
    /// Bind a setting to another. `reference` is kept as written, relative to the setting.
    pub fn set_to_reference(&mut self, setting: &str, reference: &str) -> Result<(), CommandError> {
        let setting = self.absolute(setting);
        self.apply(SettingSet::to_reference(setting, reference))?;
        Ok(())
    }
    /// The effective value of a setting.
    pub fn get(&self, setting: &str) -> Result<Value, CommandError> {
        self.document.setting_val(&self.absolute(setting))
    }
    /// Add a widget under the current one, returning its path. The current widget is unchanged.
    pub fn add(
        &mut self,
        kind: WidgetKind,
        name: Option<&str>,
        autoadd: bool,
        values: Vec<(String, SettingValue)>,
    ) -> Result<String, CommandError> {
        let mut command = WidgetAdd::new(self.current.clone(), kind).autoadd(autoadd);
        if let Some(name) = name {
            command = command.name(name);
        }
        for (setting, value) in values {
            command = command.value(setting, value);
        }
        match self.apply(command)? {
            Outcome::Widget(path) => Ok(path),
            // WidgetAdd always reports the new widget.
            _ => Err(CommandError::WidgetNotFound(self.current.clone())),
        }
    }
    pub fn remove(&mut self, target: &str) -> Result<(), CommandError> {
        let target = self.absolute(target);
        self.apply(WidgetDelete::new(target))?;
        Ok(())
    }
    pub fn rename(&mut self, target: &str, new_name: &str) -> Result<(), CommandError> {
        let target = self.absolute(target);
        self.apply(WidgetRename::new(target, new_name))?;
        Ok(())
    }
    /// Store literal values as a 1D dataset.
    pub fn set_data(&mut self, name: &str, parts: Parts<Vec<f64>>) -> Result<(), CommandError> {
        let Parts {
            data,
            serr,
            perr,
            nerr,
        } = parts;
        let mut columns = Columns::new(data);
        for (column, values) in [
            (Column::Serr, serr),
            (Column::Perr, perr),
            (Column::Nerr, nerr),
        ] {
            if let Some(values) = values {
                columns = columns.with(column, values)?;
            }
        }
        self.apply(DatasetSet::new(name, Dataset::new(Values::OneD(columns))))?;
        Ok(())
    }
    pub fn set_data_expression(
        &mut self,
        name: &str,
        parts: Parts<String>,
        linked: bool,
        parametric: Option<Parametric>,
    ) -> Result<(), CommandError> {
        self.apply(DatasetCreateExpression::new(name, parts, linked, parametric))?;
        Ok(())
    }
    pub fn set_data_range(
        &mut self,
        name: &str,
        numsteps: usize,
        parts: Parts<(f64, f64)>,
        linked: bool,
    ) -> Result<(), CommandError> {
        self.apply(DatasetCreateRange::new(name, numsteps, parts, linked))?;
        Ok(())
    }
    pub fn tag_datasets(&mut self, tag: &str, names: Vec<String>) -> Result<(), CommandError> {
        self.apply(DataTag::new(tag, names))?;
        Ok(())
    }
    /// Define a custom, replacing one of the same kind and name.
    pub fn add_custom(&mut self, kind: CustomKind, name: &str, value: &str) -> Result<(), CommandError> {
        let custom = Custom {
            kind,
            name: name.to_owned(),
            value: value.to_owned(),
        };
        let mut customs = self.document.customs().to_vec();
        match customs
            .iter_mut()
            .find(|c| c.kind == kind && c.name == custom.name)
        {
            Some(existing) => *existing = custom,
            None => customs.push(custom),
        }
        self.apply(SetCustom::new(customs))?;
        Ok(())
    }
    /// Type name of a widget, such as `graph`.
    pub fn widget_type(&self, target: &str) -> Result<&'static str, CommandError> {
        Ok(self.document.resolve_widget(&self.absolute(target))?.typename())
    }
    /// Names of a widget's children, in order.
    pub fn children(&self, target: &str) -> Result<Vec<String>, CommandError> {
        Ok(self
            .document
            .resolve_widget(&self.absolute(target))?
            .childnames()
            .into_iter()
            .map(str::to_owned)
            .collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn relative_navigation() {
        let mut doc = Document::new();
        let mut interface = CommandInterface::new(&mut doc);
        let page = interface.add(WidgetKind::Page, None, true, Vec::new()).unwrap();
        assert_eq!(page, "/page1");
        assert_eq!(interface.current(), "/");
        interface.to("page1").unwrap();
        let graph = interface
            .add(WidgetKind::Graph, Some("g"), true, Vec::new())
            .unwrap();
        assert_eq!(graph, "/page1/g");
        interface.to("g/x").unwrap();
        interface.set("label", Value::Text("time".into())).unwrap();
        interface.to("../y").unwrap();
        interface.set_to_reference("label", "../x/label").unwrap();
        assert_eq!(interface.get("label").unwrap(), Value::Text("time".into()));
        assert_eq!(interface.widget_type("..").unwrap(), "graph");
        assert_eq!(interface.children("/page1/g").unwrap(), ["x", "y"]);
        assert!(interface.to("/nope").is_err());
        assert_eq!(interface.current(), "/page1/g/y");

        interface.to("/page1").unwrap();
        interface.rename("g", "main").unwrap();
        interface.remove("main").unwrap();
        assert!(interface.children("").unwrap().is_empty());
        // Every call was its own undo step.
        assert_eq!(doc.history().undo_len(), 6);
    }
    #[test]
    fn data_and_customs() {
        let mut doc = Document::new();
        let mut interface = CommandInterface::new(&mut doc);
        interface
            .set_data(
                "a",
                Parts::new(vec![1.0, 2.0]).with(Column::Serr, vec![0.1, 0.1]),
            )
            .unwrap();
        assert!(interface
            .set_data(
                "bad",
                Parts::new(vec![1.0]).with(Column::Serr, vec![0.1, 0.1]),
            )
            .is_err());
        interface.add_custom(CustomKind::Constant, "k", "2").unwrap();
        interface.add_custom(CustomKind::Constant, "k", "5").unwrap();
        interface
            .set_data_expression("b", Parts::new("a * k".into()), true, None)
            .unwrap();
        interface
            .set_data_range("r", 3, Parts::new((0.0, 1.0)), false)
            .unwrap();
        interface.tag_datasets("mine", vec!["a".into(), "b".into()]).unwrap();

        assert_eq!(doc.customs().len(), 1);
        assert_eq!(
            doc.evaluate("b").unwrap(),
            crate::expr::ExprValue::Vector(vec![5.0, 10.0])
        );
        assert!(doc.dataset("b").unwrap().tags.contains("mine"));
        assert_eq!(doc.data().len(), 3);
    }
}
