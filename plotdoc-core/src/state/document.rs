use std::collections::BTreeMap;

use super::custom::Custom;
use super::dataset::Dataset;
use super::path;
use super::setting::{Setting, SettingError, SettingValue, Value};
use super::tree::Widget;
use crate::commands::{Command, CommandError, Operation, Outcome};
use crate::expr::{Env, EvalContext, ExprError, ExprValue};
use crate::history::{Batch, History};

/// References are followed at most this many hops before giving up.
const MAX_REFERENCE_HOPS: usize = 16;

pub struct Document {
    root: Widget,
    data: BTreeMap<String, Dataset>,
    customs: Vec<Custom>,
    context: EvalContext,
    history: History,
    /// Bumped on every change, so observers can tell if they are stale.
    changeset: u64,
}
impl Default for Document {
    fn default() -> Self {
        Self::with_history_limit(None)
    }
}
impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("widgets", &self.root.count())
            .field("datasets", &self.data.len())
            .field("customs", &self.customs.len())
            .field("changeset", &self.changeset)
            .finish_non_exhaustive()
    }
}
impl Document {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    /// An empty document keeping at most `limit` undo steps, or unlimited for `None`.
    #[must_use]
    pub fn with_history_limit(limit: Option<usize>) -> Self {
        Self {
            root: Widget::root(),
            data: BTreeMap::new(),
            customs: Vec::new(),
            context: EvalContext::default(),
            history: History::new(limit),
            changeset: 0,
        }
    }
    #[must_use]
    pub fn root(&self) -> &Widget {
        &self.root
    }
    #[must_use]
    pub fn changeset(&self) -> u64 {
        self.changeset
    }
    fn changed(&mut self) {
        self.changeset = self.changeset.wrapping_add(1);
    }

    // ---- Widgets and settings ----

    pub fn resolve_widget(&self, path: &str) -> Result<&Widget, CommandError> {
        path::segments(path)
            .try_fold(&self.root, |widget, name| widget.child(name))
            .ok_or_else(|| CommandError::WidgetNotFound(path.to_owned()))
    }
    pub fn resolve_widget_mut(&mut self, path: &str) -> Result<&mut Widget, CommandError> {
        self.changed();
        path::segments(path)
            .try_fold(&mut self.root, |widget, name| widget.child_mut(name))
            .ok_or_else(|| CommandError::WidgetNotFound(path.to_owned()))
    }
    /// Split a setting path into the path of the owning widget and the setting's
    /// group/name segments. Widget names are matched greedily from the root.
    pub fn split_setting_path<'p>(&self, path: &'p str) -> Result<(String, Vec<&'p str>), CommandError> {
        let segments: Vec<&str> = path::segments(path).collect();
        let mut widget = &self.root;
        let mut depth = 0;
        while let Some(child) = segments.get(depth).and_then(|name| widget.child(name)) {
            widget = child;
            depth += 1;
        }
        if depth == segments.len() {
            // Names a widget, not a setting.
            return Err(CommandError::SettingNotFound(path.to_owned()));
        }
        let owner = format!("/{}", segments[..depth].join("/"));
        Ok((owner, segments[depth..].to_vec()))
    }
    pub fn resolve_setting(&self, path: &str) -> Result<&Setting, CommandError> {
        let (owner, segments) = self.split_setting_path(path)?;
        self.resolve_widget(&owner)?
            .settings()
            .lookup(&segments)
            .ok_or_else(|| CommandError::SettingNotFound(path.to_owned()))
    }
    pub fn resolve_setting_mut(&mut self, path: &str) -> Result<&mut Setting, CommandError> {
        let (owner, segments) = self.split_setting_path(path)?;
        self.resolve_widget_mut(&owner)?
            .settings_mut()
            .lookup_mut(&segments)
            .ok_or_else(|| CommandError::SettingNotFound(path.to_owned()))
    }
    /// Rebind a setting, returning the previous binding.
    pub fn set_setting(&mut self, path: &str, value: SettingValue) -> Result<SettingValue, CommandError> {
        self.resolve_setting_mut(path)?
            .set(value)
            .map_err(|source| CommandError::Setting {
                path: path.to_owned(),
                source,
            })
    }
    /// The effective value of a setting, following references.
    pub fn setting_val(&self, path: &str) -> Result<Value, CommandError> {
        let mut current = path.to_owned();
        for _ in 0..MAX_REFERENCE_HOPS {
            match self.resolve_setting(&current)?.value() {
                SettingValue::Literal(value) => return Ok(value.clone()),
                SettingValue::Reference(target) => {
                    // Relative to the group holding the setting.
                    let base = path::split(&current).map_or_else(|| "/".to_owned(), |(p, _)| p);
                    current = path::resolve_relative(&base, target);
                }
            }
        }
        Err(CommandError::Setting {
            path: path.to_owned(),
            source: SettingError::Unresolved(path.to_owned()),
        })
    }

    // ---- Datasets ----

    #[must_use]
    pub fn data(&self) -> &BTreeMap<String, Dataset> {
        &self.data
    }
    pub fn dataset(&self, name: &str) -> Result<&Dataset, CommandError> {
        self.data
            .get(name)
            .ok_or_else(|| CommandError::DatasetNotFound(name.to_owned()))
    }
    /// For in-place edits. Call [`Self::modified_data`] afterwards.
    pub fn dataset_mut(&mut self, name: &str) -> Result<&mut Dataset, CommandError> {
        self.data
            .get_mut(name)
            .ok_or_else(|| CommandError::DatasetNotFound(name.to_owned()))
    }
    /// Install a dataset, returning whatever had that name.
    pub fn set_data(&mut self, name: &str, dataset: Dataset) -> Option<Dataset> {
        log::trace!("Setting dataset {name:?}");
        let old = self.data.insert(name.to_owned(), dataset);
        self.data_changed();
        old
    }
    pub fn delete_data(&mut self, name: &str) -> Option<Dataset> {
        log::trace!("Deleting dataset {name:?}");
        let old = self.data.remove(name);
        self.data_changed();
        old
    }
    pub fn rename_dataset(&mut self, old: &str, new: &str) -> Result<(), CommandError> {
        if self.data.contains_key(new) {
            return Err(CommandError::DatasetExists(new.to_owned()));
        }
        let dataset = self
            .data
            .remove(old)
            .ok_or_else(|| CommandError::DatasetNotFound(old.to_owned()))?;
        self.data.insert(new.to_owned(), dataset);
        self.data_changed();
        Ok(())
    }
    /// Note that a dataset was edited in place.
    pub fn modified_data(&mut self, name: &str) {
        log::trace!("Dataset {name:?} modified");
        self.data_changed();
    }
    /// Customs constants and generated datasets may read any dataset, so bring them up to date.
    fn data_changed(&mut self) {
        self.changed();
        self.refresh();
    }
    /// Names of datasets read from `filename`, in name order.
    #[must_use]
    pub fn datasets_linked_to(&self, filename: &std::path::Path) -> Vec<String> {
        self.data
            .iter()
            .filter(|(_, ds)| ds.is_linked_to(filename))
            .map(|(name, _)| name.clone())
            .collect()
    }

    // ---- Customs and expressions ----

    #[must_use]
    pub fn customs(&self) -> &[Custom] {
        &self.customs
    }
    /// Replace the customs, returning the old ones. Follow with [`Self::update_eval_context`].
    pub fn set_customs(&mut self, customs: Vec<Custom>) -> Vec<Custom> {
        self.changed();
        std::mem::replace(&mut self.customs, customs)
    }
    #[must_use]
    pub fn eval_context(&self) -> &EvalContext {
        &self.context
    }
    /// Evaluation environment over this document's customs and datasets.
    #[must_use]
    pub fn env(&self) -> Env<'_> {
        Env::new(&self.context, &self.data)
    }
    pub fn evaluate(&self, expr: &str) -> Result<ExprValue, ExprError> {
        self.env().evaluate(expr)
    }
    /// Rebuild the evaluation context from the customs, then recompute every generated
    /// dataset. Datasets that fail to recompute keep their previous values.
    pub fn update_eval_context(&mut self) {
        self.refresh();
        self.changed();
    }
    fn refresh(&mut self) {
        self.context = EvalContext::build(&self.customs, &self.data);
        self.regenerate();
    }
    /// Recompute generated datasets until they settle. Each may read others, so this takes at
    /// most one pass per generated dataset for a chain, and gives up on a cycle.
    fn regenerate(&mut self) {
        let generated: Vec<String> = self
            .data
            .iter()
            .filter(|(_, ds)| ds.generator().is_some())
            .map(|(name, _)| name.clone())
            .collect();
        for pass in 0..=generated.len() {
            let mut settled = true;
            for name in &generated {
                let Some(generator) = self.data.get(name).and_then(Dataset::generator) else {
                    continue;
                };
                let result = generator.evaluate(&self.env().hiding(name));
                match result {
                    Ok(values) => {
                        if let Some(ds) = self.data.get_mut(name) {
                            if !ds.values().identical(&values) {
                                ds.replace_generated_values(values);
                                settled = false;
                            }
                        }
                    }
                    // Only once, later passes would repeat it.
                    Err(e) if pass == 0 => log::warn!("Could not update dataset {name:?}: {e}"),
                    Err(_) => (),
                }
            }
            if settled {
                return;
            }
        }
        if !generated.is_empty() {
            log::warn!("Generated datasets did not settle, they may depend on each other");
        }
    }

    // ---- History ----

    /// Apply a command and record it for undo. A command that failed part way is still
    /// recorded so that what it did can be undone, and the error is returned.
    pub fn apply(&mut self, command: impl Into<Command>) -> Result<Outcome, CommandError> {
        let mut command = command.into();
        log::trace!("Applying {}", command.descr());
        match command.apply(self) {
            Ok(outcome) => {
                self.history.record(command);
                Ok(outcome)
            }
            Err(e) => {
                if command.partially_applied() {
                    log::warn!("{} failed part way: {e}", command.descr());
                    self.history.record(command);
                }
                Err(e)
            }
        }
    }
    /// Undo the latest command. `Ok(false)` if there was nothing to undo.
    ///
    /// A command failing to undo means the document and history no longer agree, so the
    /// history is discarded.
    pub fn undo(&mut self) -> Result<bool, CommandError> {
        if self.history.is_batching() {
            return Err(CommandError::Batching);
        }
        let Some(mut command) = self.history.pop_undo() else {
            return Ok(false);
        };
        log::debug!("Undoing {}", command.descr());
        if let Err(e) = command.undo(self) {
            log::error!("Failed to undo {}, discarding history: {e}", command.descr());
            self.history.clear();
            return Err(e);
        }
        self.history.push_redo(command);
        Ok(true)
    }
    /// Re-apply the latest undone command. `Ok(false)` if there was nothing to redo.
    pub fn redo(&mut self) -> Result<bool, CommandError> {
        if self.history.is_batching() {
            return Err(CommandError::Batching);
        }
        let Some(mut command) = self.history.pop_redo() else {
            return Ok(false);
        };
        log::debug!("Redoing {}", command.descr());
        if let Err(e) = command.apply(self) {
            log::error!("Failed to redo {}, discarding history: {e}", command.descr());
            self.history.clear();
            return Err(e);
        }
        self.history.push_undo(command);
        Ok(true)
    }
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }
    #[must_use]
    pub fn undo_descr(&self) -> Option<std::borrow::Cow<'_, str>> {
        self.history.undo_descr()
    }
    #[must_use]
    pub fn redo_descr(&self) -> Option<std::borrow::Cow<'_, str>> {
        self.history.redo_descr()
    }
    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }
    pub fn clear_history(&mut self) {
        self.history.clear();
    }
    /// Open a batch: until the returned guard is dropped, commands applied through it are
    /// collected into `sink` instead of becoming separate undo steps.
    pub fn batch<'d>(&'d mut self, sink: &'d mut Vec<Command>) -> Batch<'d> {
        let depth = self.history.open_batch();
        Batch::new(self, sink, depth)
    }
    pub(crate) fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }
}
