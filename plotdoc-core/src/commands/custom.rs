use std::borrow::Cow;

use super::{CommandError, Operation, Outcome};
use crate::state::custom::Custom;
use crate::Document;

/// Replace every custom definition at once.
///
/// Both directions rebuild the evaluation context, which recomputes linked datasets too.
#[derive(Debug)]
pub struct SetCustom {
    /// The definitions not currently in the document: the new ones before apply, the old ones
    /// after.
    customs: Vec<Custom>,
    applied: bool,
}
impl SetCustom {
    #[must_use]
    pub fn new(customs: Vec<Custom>) -> Self {
        Self {
            customs,
            applied: false,
        }
    }
    fn swap(&mut self, document: &mut Document) {
        let customs = std::mem::take(&mut self.customs);
        self.customs = document.set_customs(customs);
        document.update_eval_context();
        self.applied = !self.applied;
    }
}
impl Operation for SetCustom {
    fn apply(&mut self, document: &mut Document) -> Result<Outcome, CommandError> {
        if self.applied {
            return Err(CommandError::AlreadyApplied);
        }
        self.swap(document);
        Ok(Outcome::None)
    }
    fn undo(&mut self, document: &mut Document) -> Result<(), CommandError> {
        if !self.applied {
            return Err(CommandError::NotApplied);
        }
        self.swap(document);
        Ok(())
    }
    fn descr(&self) -> Cow<'_, str> {
        "change custom definition".into()
    }
}
