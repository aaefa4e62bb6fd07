use crate::commands::Command;
use crate::Document;

/// An open batch on a document's history. Dereferences to the document, so commands can
/// be applied through it as usual; they are collected rather than becoming undo steps.
///
/// Dropping the guard closes the batch and moves what it collected into the sink it was
/// opened with. This happens on every exit path, unwinding included.
pub struct Batch<'d> {
    document: &'d mut Document,
    sink: &'d mut Vec<Command>,
    depth: usize,
}
impl<'d> Batch<'d> {
    pub(crate) fn new(document: &'d mut Document, sink: &'d mut Vec<Command>, depth: usize) -> Self {
        log::trace!("Opened batch at depth {depth}");
        Self {
            document,
            sink,
            depth,
        }
    }
}
impl std::ops::Deref for Batch<'_> {
    type Target = Document;
    fn deref(&self) -> &Document {
        self.document
    }
}
impl std::ops::DerefMut for Batch<'_> {
    fn deref_mut(&mut self) -> &mut Document {
        self.document
    }
}
impl Drop for Batch<'_> {
    fn drop(&mut self) {
        let collected = self.document.history_mut().close_batch(self.depth);
        if std::thread::panicking() {
            // Still keep what was applied, so it can be undone.
            log::warn!(
                "Batch at depth {} closed by a panic with {} commands",
                self.depth,
                collected.len()
            );
        } else {
            log::trace!(
                "Closed batch at depth {} with {} commands",
                self.depth,
                collected.len()
            );
        }
        self.sink.extend(collected);
    }
}
