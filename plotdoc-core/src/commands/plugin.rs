use std::borrow::Cow;
use std::sync::Arc;

use super::batch::Recorded;
use super::dataset::Backup;
use super::{applied, not_applied, CommandError, Operation, Outcome};
use crate::interface::CommandInterface;
use crate::plugins::{DatasetPlugin, Fields, PluginOutput, ToolsPlugin};
use crate::state::dataset::{Columns, Dataset, Generator, Values};
use crate::Document;

/// Run a tools plugin. Whatever it does through the interface becomes one undo step.
pub struct ApplyToolsPlugin {
    plugin: Arc<dyn ToolsPlugin>,
    fields: Fields,
    inner: Recorded,
}
impl ApplyToolsPlugin {
    #[must_use]
    pub fn new(plugin: Arc<dyn ToolsPlugin>, fields: Fields) -> Self {
        Self {
            plugin,
            fields,
            inner: Recorded::default(),
        }
    }
}
impl std::fmt::Debug for ApplyToolsPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplyToolsPlugin")
            .field("plugin", &self.plugin.name())
            .field("fields", &self.fields)
            .field("inner", &self.inner)
            .finish()
    }
}
impl Operation for ApplyToolsPlugin {
    fn apply(&mut self, document: &mut Document) -> Result<Outcome, CommandError> {
        let plugin = &self.plugin;
        let fields = &self.fields;
        self.inner.apply(document, |document| {
            plugin
                .apply(&mut CommandInterface::new(document), fields)
                .map_err(|source| CommandError::Plugin {
                    name: plugin.name().to_owned(),
                    source,
                })
        })?;
        Ok(Outcome::None)
    }
    fn undo(&mut self, document: &mut Document) -> Result<(), CommandError> {
        self.inner.undo(document)
    }
    fn descr(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.plugin.name())
    }
    fn partially_applied(&self) -> bool {
        self.inner.partially_applied()
    }
}

/// Run a dataset plugin and install what it produces. Each output keeps the plugin as its
/// generator, so it is recomputed when the plugin's inputs change.
pub struct ApplyDatasetPlugin {
    plugin: Arc<dyn DatasetPlugin>,
    fields: Fields,
    /// Output name as declared by the plugin, to the name to store it under.
    renames: hashbrown::HashMap<String, String>,
    installed: Option<Vec<(String, Backup)>>,
}
impl ApplyDatasetPlugin {
    #[must_use]
    pub fn new(plugin: Arc<dyn DatasetPlugin>, fields: Fields) -> Self {
        Self {
            plugin,
            fields,
            renames: hashbrown::HashMap::new(),
            installed: None,
        }
    }
    #[must_use]
    pub fn rename(mut self, declared: impl Into<String>, stored: impl Into<String>) -> Self {
        self.renames.insert(declared.into(), stored.into());
        self
    }
    /// Names the outputs will be stored under.
    #[must_use]
    pub fn output_names(&self) -> Vec<String> {
        self.plugin
            .dataset_names(&self.fields)
            .into_iter()
            .map(|name| self.renames.get(&name).cloned().unwrap_or(name))
            .collect()
    }
    /// Run the plugin once without storing anything, reporting its failure.
    pub fn validate(&self, document: &Document) -> Result<(), CommandError> {
        self.evaluate(document).map(|_| ())
    }
    fn evaluate(&self, document: &Document) -> Result<Vec<Values>, CommandError> {
        self.plugin
            .evaluate(&document.env(), &self.fields)
            .map_err(|source| CommandError::Plugin {
                name: self.plugin.name().to_owned(),
                source,
            })
    }
}
impl std::fmt::Debug for ApplyDatasetPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplyDatasetPlugin")
            .field("plugin", &self.plugin.name())
            .field("fields", &self.fields)
            .field("renames", &self.renames)
            .field("installed", &self.installed)
            .finish()
    }
}
impl Operation for ApplyDatasetPlugin {
    fn apply(&mut self, document: &mut Document) -> Result<Outcome, CommandError> {
        not_applied(&self.installed)?;
        let names = self.output_names();
        let empty = || {
            names
                .iter()
                .map(|_| Values::OneD(Columns::new(Vec::new())))
                .collect::<Vec<_>>()
        };
        // A failing plugin still leaves its datasets in place, empty.
        let outputs = match self.evaluate(document) {
            Ok(outputs) if outputs.len() == names.len() => outputs,
            Ok(outputs) => {
                log::warn!(
                    "Plugin {} produced {} datasets, expected {}",
                    self.plugin.name(),
                    outputs.len(),
                    names.len()
                );
                empty()
            }
            Err(e) => {
                log::warn!("{e}");
                empty()
            }
        };
        let mut installed = Vec::with_capacity(names.len());
        for (index, (name, values)) in names.iter().zip(outputs).enumerate() {
            let generator = Generator::Plugin(PluginOutput {
                plugin: Arc::clone(&self.plugin),
                fields: self.fields.clone(),
                index,
            });
            let mut backup = Backup::default();
            backup.install(document, name, Dataset::generated(values, generator))?;
            installed.push((name.clone(), backup));
        }
        self.installed = Some(installed);
        Ok(Outcome::Datasets(names))
    }
    fn undo(&mut self, document: &mut Document) -> Result<(), CommandError> {
        for (name, mut backup) in applied(&mut self.installed)?.into_iter().rev() {
            backup.restore(document, &name)?;
        }
        Ok(())
    }
    fn descr(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.plugin.name())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::commands::edit::DatasetSetVal;
    use crate::plugins::{HideWidgetsPlugin, MultiplyPlugin};
    use crate::state::dataset::Column;
    use crate::state::setting::Value;
    use crate::state::tree::WidgetKind;

    fn fields(entries: &[(&str, Value)]) -> Fields {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }
    fn multiply(input: &str) -> ApplyDatasetPlugin {
        ApplyDatasetPlugin::new(
            Arc::new(MultiplyPlugin),
            fields(&[
                ("ds_in", Value::Text(input.into())),
                ("ds_out", Value::Text("out".into())),
                ("factor", Value::Float(2.0)),
            ]),
        )
    }

    #[test]
    fn dataset_plugin_installs_and_restores() {
        let mut doc = Document::new();
        doc.set_data("in", Dataset::one_d(vec![1.0, 2.0]));
        doc.set_data("doubled", Dataset::one_d(vec![0.0]));
        let before = doc.data().clone();

        let outcome = doc.apply(multiply("in").rename("out", "doubled")).unwrap();
        assert_eq!(outcome, Outcome::Datasets(vec!["doubled".into()]));
        assert_eq!(
            doc.evaluate("doubled").unwrap(),
            crate::expr::ExprValue::Vector(vec![2.0, 4.0])
        );
        doc.undo().unwrap();
        assert_eq!(doc.data(), &before);
    }
    #[test]
    fn dataset_plugin_failure_installs_empty() {
        let mut doc = Document::new();
        let command = multiply("missing");
        assert!(matches!(
            command.validate(&doc),
            Err(CommandError::Plugin { .. })
        ));
        doc.apply(command).unwrap();
        let Values::OneD(out) = doc.dataset("out").unwrap().values() else {
            panic!("expected 1D");
        };
        assert!(out.is_empty());
        assert!(doc.dataset("out").unwrap().generator().is_some());

        // Fills in once its input exists.
        doc.apply(crate::commands::dataset::DatasetSet::new(
            "missing",
            Dataset::one_d(vec![4.0]),
        ))
        .unwrap();
        assert_eq!(
            doc.evaluate("out").unwrap(),
            crate::expr::ExprValue::Vector(vec![8.0])
        );
        doc.undo().unwrap();
        doc.undo().unwrap();
        assert!(doc.data().is_empty());
    }
    #[test]
    fn dataset_plugin_output_follows_input() {
        let mut doc = Document::new();
        doc.set_data("in", Dataset::one_d(vec![1.0, 2.0]));
        let command = multiply("in");
        assert_eq!(command.descr(), "Multiply");
        doc.apply(command).unwrap();

        doc.apply(DatasetSetVal::new("in", Column::Data, 1, 5.0)).unwrap();
        assert_eq!(
            doc.evaluate("out").unwrap(),
            crate::expr::ExprValue::Vector(vec![2.0, 10.0])
        );
        assert!(matches!(
            doc.apply(DatasetSetVal::new("out", Column::Data, 0, 1.0)),
            Err(CommandError::Dataset(_))
        ));
        doc.undo().unwrap();
        assert_eq!(
            doc.evaluate("out").unwrap(),
            crate::expr::ExprValue::Vector(vec![2.0, 4.0])
        );
    }
    #[test]
    fn tools_plugin_is_one_step() {
        let mut doc = Document::new();
        doc.apply(crate::commands::widget::WidgetAdd::new("/", WidgetKind::Page))
            .unwrap();
        for _ in 0..2 {
            doc.apply(crate::commands::widget::WidgetAdd::new("/page1", WidgetKind::Graph))
                .unwrap();
        }
        let before = doc.root().clone();
        let steps = doc.history().undo_len();

        doc.apply(ApplyToolsPlugin::new(
            Arc::new(HideWidgetsPlugin),
            fields(&[("kind", Value::Text("axis".into()))]),
        ))
        .unwrap();
        assert_eq!(doc.history().undo_len(), steps + 1);
        assert_eq!(
            doc.setting_val("/page1/graph2/y/hide").unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            doc.setting_val("/page1/graph2/hide").unwrap(),
            Value::Bool(false)
        );
        doc.undo().unwrap();
        assert_eq!(doc.root(), &before);
        doc.redo().unwrap();
        assert_eq!(
            doc.setting_val("/page1/graph1/x/hide").unwrap(),
            Value::Bool(true)
        );

        assert!(matches!(
            doc.apply(ApplyToolsPlugin::new(
                Arc::new(HideWidgetsPlugin),
                fields(&[("kind", Value::Text("teapot".into()))]),
            )),
            Err(CommandError::Plugin { .. })
        ));
    }
}
