//! # Plugins
//!
//! Extension points driven through commands. A [`DatasetPlugin`] computes new datasets from the
//! document, a [`ToolsPlugin`] modifies the document through a [`CommandInterface`].
//! Both take their parameters as named [`Fields`].

use std::sync::Arc;

use anyhow::Context;

use crate::expr::Env;
use crate::interface::CommandInterface;
use crate::state::dataset::{Column, Columns, DatasetError, Values};
use crate::state::setting::Value;
use crate::state::tree::WidgetKind;

pub type Fields = hashbrown::HashMap<String, Value>;

fn field<'f>(fields: &'f Fields, name: &str) -> anyhow::Result<&'f Value> {
    fields
        .get(name)
        .with_context(|| format!("missing field {name:?}"))
}
fn text_field<'f>(fields: &'f Fields, name: &str) -> anyhow::Result<&'f str> {
    field(fields, name)?
        .as_str()
        .with_context(|| format!("field {name:?} should be text"))
}

pub trait DatasetPlugin: Send + Sync {
    fn name(&self) -> &str;
    /// Names of the datasets [`Self::evaluate`] will produce, in order.
    fn dataset_names(&self, fields: &Fields) -> Vec<String>;
    /// Compute one set of values per declared name from the datasets and customs in `env`.
    fn evaluate(&self, env: &Env, fields: &Fields) -> anyhow::Result<Vec<Values>>;
}

/// Output `index` of a dataset plugin run with `fields`. Stored as the generator of each
/// dataset the plugin produced, so the output follows its inputs.
#[derive(Clone)]
pub struct PluginOutput {
    pub plugin: Arc<dyn DatasetPlugin>,
    pub fields: Fields,
    pub index: usize,
}
impl PluginOutput {
    pub fn evaluate(&self, env: &Env) -> Result<Values, DatasetError> {
        let failed = |message: String| DatasetError::Plugin {
            plugin: self.plugin.name().to_owned(),
            message,
        };
        let mut outputs = self
            .plugin
            .evaluate(env, &self.fields)
            .map_err(|err| failed(format!("{err:#}")))?;
        if self.index >= outputs.len() {
            return Err(failed(format!(
                "produced {} datasets, expected at least {}",
                outputs.len(),
                self.index + 1
            )));
        }
        Ok(outputs.swap_remove(self.index))
    }
}
impl std::fmt::Debug for PluginOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginOutput")
            .field("plugin", &self.plugin.name())
            .field("fields", &self.fields)
            .field("index", &self.index)
            .finish()
    }
}
impl PartialEq for PluginOutput {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.plugin, &other.plugin)
            && self.fields == other.fields
            && self.index == other.index
    }
}

pub trait ToolsPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn apply(&self, interface: &mut CommandInterface, fields: &Fields) -> anyhow::Result<()>;
}

/// `ds_out = ds_in * factor`, error columns included.
///
/// Fields: `ds_in` and `ds_out` (text), `factor` (number).
#[derive(Debug, Default)]
pub struct MultiplyPlugin;
impl DatasetPlugin for MultiplyPlugin {
    fn name(&self) -> &str {
        "Multiply"
    }
    fn dataset_names(&self, fields: &Fields) -> Vec<String> {
        text_field(fields, "ds_out")
            .map(|name| vec![name.to_owned()])
            .unwrap_or_default()
    }
    fn evaluate(&self, env: &Env, fields: &Fields) -> anyhow::Result<Vec<Values>> {
        let input = text_field(fields, "ds_in")?;
        let factor = field(fields, "factor")?
            .as_f64()
            .context("field \"factor\" should be a number")?;
        let dataset = env
            .dataset(input)
            .with_context(|| format!("no dataset named {input:?}"))?;
        let Values::OneD(columns) = dataset.values() else {
            anyhow::bail!("{input:?} is not one-dimensional");
        };
        let scale = |values: &[f64]| values.iter().map(|v| v * factor).collect::<Vec<_>>();
        let mut output = Columns::new(scale(columns.data()));
        for (column, values) in columns.present().filter(|(c, _)| *c != Column::Data) {
            // Negative errors stay negative, magnitudes scale.
            output = output.with(column, scale(values))?;
        }
        Ok(vec![Values::OneD(output)])
    }
}

/// Set `hide` on every widget of a kind.
///
/// Fields: `kind` (widget type name), `hide` (boolean, default true).
#[derive(Debug, Default)]
pub struct HideWidgetsPlugin;
impl ToolsPlugin for HideWidgetsPlugin {
    fn name(&self) -> &str {
        "Hide widgets"
    }
    fn apply(&self, interface: &mut CommandInterface, fields: &Fields) -> anyhow::Result<()> {
        let kind = WidgetKind::parse(text_field(fields, "kind")?)?;
        let hide = match fields.get("hide") {
            Some(Value::Bool(hide)) => *hide,
            Some(other) => anyhow::bail!("field \"hide\" should be a boolean, not {other}"),
            None => true,
        };
        let mut targets = Vec::new();
        interface
            .document()
            .root()
            .visit_descendants("/", None, &mut |path, widget| {
                if widget.kind() == kind {
                    targets.push(path.to_owned());
                }
            });
        log::debug!("Setting hide={hide} on {} widgets", targets.len());
        for path in targets {
            interface.set(&format!("{path}/hide"), Value::Bool(hide))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::state::dataset::Dataset;
    use crate::Document;

    fn fields(entries: &[(&str, Value)]) -> Fields {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }
    #[test]
    fn multiply() {
        let mut doc = Document::new();
        let columns = Columns::new(vec![1.0, 2.0])
            .with(Column::Nerr, vec![-0.5, -0.5])
            .unwrap();
        doc.set_data("in", Dataset::new(Values::OneD(columns)));
        let fields = fields(&[
            ("ds_in", Value::Text("in".into())),
            ("ds_out", Value::Text("out".into())),
            ("factor", Value::Int(3)),
        ]);
        assert_eq!(MultiplyPlugin.dataset_names(&fields), ["out"]);
        let values = MultiplyPlugin.evaluate(&doc.env(), &fields).unwrap();
        let Values::OneD(out) = &values[0] else {
            panic!("expected 1D");
        };
        assert_eq!(out.data(), [3.0, 6.0]);
        assert_eq!(out.column(Column::Nerr).unwrap(), [-1.5, -1.5]);

        let missing = self::fields(&[("ds_in", Value::Text("nope".into()))]);
        assert!(MultiplyPlugin.evaluate(&doc.env(), &missing).is_err());
        assert!(MultiplyPlugin.dataset_names(&missing).is_empty());
    }
    #[test]
    fn output_selects_index() {
        let mut doc = Document::new();
        doc.set_data("in", Dataset::one_d(vec![1.0, 2.0]));
        let plugin: Arc<dyn DatasetPlugin> = Arc::new(MultiplyPlugin);
        let fields = fields(&[
            ("ds_in", Value::Text("in".into())),
            ("ds_out", Value::Text("out".into())),
            ("factor", Value::Float(0.5)),
        ]);
        let first = PluginOutput {
            plugin: Arc::clone(&plugin),
            fields: fields.clone(),
            index: 0,
        };
        let Values::OneD(out) = first.evaluate(&doc.env()).unwrap() else {
            panic!("expected 1D");
        };
        assert_eq!(out.data(), [0.5, 1.0]);

        let second = PluginOutput { index: 1, ..first.clone() };
        assert!(matches!(
            second.evaluate(&doc.env()),
            Err(DatasetError::Plugin { .. })
        ));
        assert_ne!(first, second);
        assert_eq!(first, first.clone());
    }
}
