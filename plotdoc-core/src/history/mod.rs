//! # History
//!
//! Undo and redo stacks of applied commands. While a batch is open (see [`Batch`]), commands
//! are collected into it instead, and become part of whichever composite command opened it.

mod batch;

use std::borrow::Cow;
use std::collections::VecDeque;

pub use batch::Batch;

use crate::commands::{Command, Operation};

pub struct History {
    undo: VecDeque<Command>,
    redo: Vec<Command>,
    /// Maximum undo entries, `None` for unlimited.
    limit: Option<usize>,
    /// Open batches, innermost last.
    batches: smallvec::SmallVec<[Vec<Command>; 2]>,
}
impl History {
    #[must_use]
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit,
            batches: smallvec::SmallVec::new(),
        }
    }
    #[must_use]
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }
    /// Record a freshly applied command. Starts a new branch of history, so redo is lost.
    pub(crate) fn record(&mut self, command: Command) {
        if let Some(batch) = self.batches.last_mut() {
            batch.push(command);
            return;
        }
        self.redo.clear();
        self.push_undo(command);
    }
    pub(crate) fn push_undo(&mut self, command: Command) {
        self.undo.push_back(command);
        if let Some(limit) = self.limit {
            while self.undo.len() > limit {
                if let Some(dropped) = self.undo.pop_front() {
                    log::debug!("History full, forgetting {}", dropped.descr());
                }
            }
        }
    }
    pub(crate) fn pop_undo(&mut self) -> Option<Command> {
        self.undo.pop_back()
    }
    pub(crate) fn push_redo(&mut self, command: Command) {
        self.redo.push(command);
    }
    pub(crate) fn pop_redo(&mut self) -> Option<Command> {
        self.redo.pop()
    }
    #[must_use]
    pub fn is_batching(&self) -> bool {
        !self.batches.is_empty()
    }
    /// Open a nested batch, returning its depth for [`Self::close_batch`].
    pub(crate) fn open_batch(&mut self) -> usize {
        self.batches.push(Vec::new());
        self.batches.len() - 1
    }
    /// Close the batch at `depth`, returning what it collected. Any batches opened inside it
    /// and not closed are folded in, in order.
    pub(crate) fn close_batch(&mut self, depth: usize) -> Vec<Command> {
        let mut collected = Vec::new();
        for batch in self.batches.drain(depth.min(self.batches.len())..) {
            collected.extend(batch);
        }
        collected
    }
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }
    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }
    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }
    #[must_use]
    pub fn undo_descr(&self) -> Option<Cow<'_, str>> {
        self.undo.back().map(Operation::descr)
    }
    #[must_use]
    pub fn redo_descr(&self) -> Option<Cow<'_, str>> {
        self.redo.last().map(Operation::descr)
    }
    /// Forget everything. Open batches are left alone, as their guards still expect them.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
mod test {
    use crate::commands::setting::SettingSet;
    use crate::state::setting::Value;
    use crate::state::tree::{factory, WidgetKind};
    use crate::Document;

    fn document(limit: Option<usize>) -> Document {
        let mut doc = Document::with_history_limit(limit);
        let root = doc.resolve_widget_mut("/").unwrap();
        factory::make_widget(root, WidgetKind::Page, false, None, None, &[]).unwrap();
        doc
    }
    fn set_width(doc: &mut Document, width: &str) {
        doc.apply(SettingSet::new("/page1/width", Value::Text(width.into())))
            .unwrap();
    }
    #[test]
    fn limit_drops_oldest() {
        let mut doc = document(Some(2));
        for width in ["1cm", "2cm", "3cm"] {
            set_width(&mut doc, width);
        }
        assert_eq!(doc.history().undo_len(), 2);
        assert!(doc.undo().unwrap());
        assert!(doc.undo().unwrap());
        assert!(!doc.undo().unwrap());
        // The first change could not be undone.
        assert_eq!(
            doc.setting_val("/page1/width").unwrap(),
            Value::Text("1cm".into())
        );
    }
    #[test]
    fn new_command_clears_redo() {
        let mut doc = document(None);
        set_width(&mut doc, "1cm");
        doc.undo().unwrap();
        assert!(doc.can_redo());
        set_width(&mut doc, "2cm");
        assert!(!doc.can_redo());
    }
    #[test]
    fn batch_collects() {
        let mut doc = document(None);
        let mut sink = Vec::new();
        {
            let mut batch = doc.batch(&mut sink);
            batch
                .apply(SettingSet::new("/page1/width", Value::Text("1cm".into())))
                .unwrap();
            batch
                .apply(SettingSet::new("/page1/height", Value::Text("2cm".into())))
                .unwrap();
            assert!(batch.history().is_batching());
            assert!(matches!(
                batch.undo(),
                Err(crate::CommandError::Batching)
            ));
        }
        assert_eq!(sink.len(), 2);
        assert!(!doc.history().is_batching());
        assert!(!doc.can_undo());
    }
    #[test]
    fn batch_closes_on_panic() {
        let mut doc = document(None);
        let mut sink = Vec::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut batch = doc.batch(&mut sink);
            batch
                .apply(SettingSet::new("/page1/width", Value::Text("1cm".into())))
                .unwrap();
            panic!("interpreter blew up");
        }));
        assert!(result.is_err());
        assert!(!doc.history().is_batching());
        assert_eq!(sink.len(), 1);
    }
}
