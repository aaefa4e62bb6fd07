//! Commands made of other commands.

use std::borrow::Cow;
use std::path::PathBuf;

use super::{applied, Command, CommandError, Operation, Outcome};
use crate::interface::CommandInterface;
use crate::script::Script;
use crate::Document;

/// Child commands and how many of them are currently applied.
#[derive(Debug, Default)]
pub(crate) struct Recorded {
    children: Vec<Command>,
    /// Once captured, the children are replayed rather than produced again.
    captured: bool,
    applied: Option<usize>,
}
impl Recorded {
    pub(crate) fn captured(children: Vec<Command>) -> Self {
        Self {
            children,
            captured: true,
            applied: None,
        }
    }
    /// Apply the children, or on first use run `produce` inside a batch to capture them.
    pub(crate) fn apply(
        &mut self,
        document: &mut Document,
        produce: impl FnOnce(&mut Document) -> Result<(), CommandError>,
    ) -> Result<(), CommandError> {
        if self.applied.is_some() {
            return Err(CommandError::AlreadyApplied);
        }
        if self.captured {
            return self.replay(document);
        }
        let result = {
            let mut batch = document.batch(&mut self.children);
            produce(&mut *batch)
        };
        self.captured = true;
        self.applied = Some(self.children.len());
        result
    }
    /// Apply in order, stopping at the first failure.
    fn replay(&mut self, document: &mut Document) -> Result<(), CommandError> {
        let mut count = 0;
        for child in &mut self.children {
            match child.apply(document) {
                Ok(_) => count += 1,
                Err(e) => {
                    if child.partially_applied() {
                        count += 1;
                    }
                    self.applied = Some(count);
                    return Err(e);
                }
            }
        }
        self.applied = Some(count);
        Ok(())
    }
    /// Undo the applied children, last first.
    pub(crate) fn undo(&mut self, document: &mut Document) -> Result<(), CommandError> {
        let count = applied(&mut self.applied)?;
        for child in self.children[..count].iter_mut().rev() {
            child.undo(document)?;
        }
        Ok(())
    }
    pub(crate) fn partially_applied(&self) -> bool {
        self.applied.is_some_and(|count| count > 0)
    }
    #[must_use]
    pub(crate) fn children(&self) -> &[Command] {
        &self.children
    }
}

/// Several commands as one undo step.
#[derive(Debug)]
pub struct Multiple {
    descr: String,
    inner: Recorded,
}
impl Multiple {
    #[must_use]
    pub fn new(descr: impl Into<String>, children: Vec<Command>) -> Self {
        Self {
            descr: descr.into(),
            inner: Recorded::captured(children),
        }
    }
    #[must_use]
    pub fn children(&self) -> &[Command] {
        self.inner.children()
    }
}
impl Operation for Multiple {
    fn apply(&mut self, document: &mut Document) -> Result<Outcome, CommandError> {
        self.inner.apply(document, |_| Ok(()))?;
        Ok(Outcome::None)
    }
    fn undo(&mut self, document: &mut Document) -> Result<(), CommandError> {
        self.inner.undo(document)
    }
    fn descr(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.descr)
    }
    fn partially_applied(&self) -> bool {
        self.inner.partially_applied()
    }
}

/// Where a script comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptSource {
    File(PathBuf),
    Text(String),
}
impl ScriptSource {
    fn read(&self) -> Result<Cow<'_, str>, CommandError> {
        match self {
            Self::File(path) => std::fs::read_to_string(path)
                .map(Cow::Owned)
                .map_err(|source| CommandError::Io {
                    path: path.clone(),
                    source,
                }),
            Self::Text(text) => Ok(Cow::Borrowed(text)),
        }
    }
}

/// Run a style sheet, as one undo step.
#[derive(Debug)]
pub struct LoadStyleSheet {
    source: ScriptSource,
    inner: Recorded,
}
impl LoadStyleSheet {
    #[must_use]
    pub fn new(source: ScriptSource) -> Self {
        Self {
            source,
            inner: Recorded::default(),
        }
    }
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(ScriptSource::File(path.into()))
    }
}
impl Operation for LoadStyleSheet {
    fn apply(&mut self, document: &mut Document) -> Result<Outcome, CommandError> {
        let source = &self.source;
        self.inner.apply(document, |document| {
            let script = Script::parse(&source.read()?)?;
            log::debug!("Running style sheet of {} statements", script.len());
            script.run(&mut CommandInterface::new(document))
        })?;
        Ok(Outcome::None)
    }
    fn undo(&mut self, document: &mut Document) -> Result<(), CommandError> {
        self.inner.undo(document)
    }
    fn descr(&self) -> Cow<'_, str> {
        "load stylesheet".into()
    }
    fn partially_applied(&self) -> bool {
        self.inner.partially_applied()
    }
}

/// Load custom definitions, as one undo step. The script may only contain `AddCustom` calls.
#[derive(Debug)]
pub struct LoadCustom {
    source: ScriptSource,
    inner: Recorded,
}
impl LoadCustom {
    #[must_use]
    pub fn new(source: ScriptSource) -> Self {
        Self {
            source,
            inner: Recorded::default(),
        }
    }
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(ScriptSource::File(path.into()))
    }
}
impl Operation for LoadCustom {
    fn apply(&mut self, document: &mut Document) -> Result<Outcome, CommandError> {
        let source = &self.source;
        self.inner.apply(document, |document| {
            let script = Script::parse(&source.read()?)?;
            if !script.only_customs() {
                return Err(CommandError::Script {
                    line: 0,
                    message: "custom definition files may only contain AddCustom".into(),
                });
            }
            script.run(&mut CommandInterface::new(document))
        })?;
        Ok(Outcome::None)
    }
    fn undo(&mut self, document: &mut Document) -> Result<(), CommandError> {
        self.inner.undo(document)
    }
    fn descr(&self) -> Cow<'_, str> {
        "load custom definitions".into()
    }
    fn partially_applied(&self) -> bool {
        self.inner.partially_applied()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::commands::dataset::{DataTag, DatasetSet};
    use crate::commands::setting::SettingSet;
    use crate::commands::widget::WidgetAdd;
    use crate::state::dataset::Dataset;
    use crate::state::setting::Value;
    use crate::state::tree::WidgetKind;

    fn page() -> Document {
        let mut doc = Document::new();
        doc.apply(WidgetAdd::new("/", WidgetKind::Page)).unwrap();
        doc.clear_history();
        doc
    }
    fn text(script: &str) -> ScriptSource {
        ScriptSource::Text(script.to_owned())
    }

    #[test]
    fn multiple_is_one_step() {
        let mut doc = page();
        let before = doc.root().clone();
        doc.apply(Multiple::new(
            "set size",
            vec![
                SettingSet::new("/page1/width", Value::Text("10cm".into())).into(),
                SettingSet::new("/page1/height", Value::Text("5cm".into())).into(),
            ],
        ))
        .unwrap();
        assert_eq!(doc.undo_descr().as_deref(), Some("set size"));
        assert_eq!(doc.history().undo_len(), 1);
        doc.undo().unwrap();
        assert_eq!(doc.root(), &before);
        doc.redo().unwrap();
        assert_eq!(
            doc.setting_val("/page1/height").unwrap(),
            Value::Text("5cm".into())
        );
    }
    #[test]
    fn multiple_failing_second_child() {
        let mut doc = page();
        doc.set_data("a", Dataset::one_d(vec![1.0]));
        let before = doc.root().clone();
        let err = doc
            .apply(Multiple::new(
                "batch",
                vec![
                    SettingSet::new("/page1/width", Value::Text("10cm".into())).into(),
                    SettingSet::new("/page1/nope", Value::Text("5cm".into())).into(),
                    DataTag::new("never", ["a"]).into(),
                ],
            ))
            .unwrap_err();
        assert!(matches!(err, CommandError::SettingNotFound(_)));
        // The first child stays applied, and is one undo step.
        assert_eq!(
            doc.setting_val("/page1/width").unwrap(),
            Value::Text("10cm".into())
        );
        assert!(doc.dataset("a").unwrap().tags.is_empty());
        assert_eq!(doc.history().undo_len(), 1);
        doc.undo().unwrap();
        assert_eq!(doc.root(), &before);
    }
    #[test]
    fn nothing_applied_not_recorded() {
        let mut doc = page();
        assert!(doc
            .apply(Multiple::new(
                "fails",
                vec![SettingSet::new("/nope/width", Value::Text("1cm".into())).into()],
            ))
            .is_err());
        assert!(!doc.can_undo());
    }
    #[test]
    fn stylesheet_undo_redo() {
        let mut doc = page();
        let before = doc.root().clone();
        doc.apply(LoadStyleSheet::new(text(
            "To('/page1')\nAdd('graph', name='g')\nSet('g/x/label', 'time')",
        )))
        .unwrap();
        assert_eq!(doc.history().undo_len(), 1);
        assert_eq!(
            doc.setting_val("/page1/g/x/label").unwrap(),
            Value::Text("time".into())
        );
        doc.undo().unwrap();
        assert_eq!(doc.root(), &before);
        doc.redo().unwrap();
        assert!(doc.resolve_widget("/page1/g").is_ok());
    }
    #[test]
    fn stylesheet_partial_failure() {
        let mut doc = page();
        let before = doc.root().clone();
        let err = doc
            .apply(LoadStyleSheet::new(text(
                "Set('/page1/width', '3cm')\nRemove('/nope')\nSet('/page1/height', '3cm')",
            )))
            .unwrap_err();
        assert!(matches!(err, CommandError::ScriptLine { line: 2, .. }));
        assert!(!doc.history().is_batching());
        assert_eq!(doc.history().undo_len(), 1);
        doc.undo().unwrap();
        assert_eq!(doc.root(), &before);

        // A syntax error runs nothing.
        assert!(matches!(
            doc.apply(LoadStyleSheet::new(text("Set('/page1/width', '3cm')\nSet(("))),
            Err(CommandError::Script { line: 2, .. })
        ));
        assert_eq!(doc.root(), &before);
    }
    #[test]
    fn missing_file() {
        let mut doc = page();
        assert!(matches!(
            doc.apply(LoadStyleSheet::file("/definitely/not/here.vsz")),
            Err(CommandError::Io { .. })
        ));
    }
    #[test]
    fn load_customs() {
        let mut doc = page();
        doc.apply(DatasetSet::new("x", Dataset::one_d(vec![1.0, 2.0])))
            .unwrap();
        doc.apply(LoadCustom::new(text(
            "AddCustom('constant', 'k', '10')\nAddCustom('function', 'f(a)', 'a * k')",
        )))
        .unwrap();
        assert_eq!(
            doc.evaluate("f(x)").unwrap(),
            crate::expr::ExprValue::Vector(vec![10.0, 20.0])
        );
        doc.undo().unwrap();
        assert!(doc.customs().is_empty());
        assert!(doc
            .apply(LoadCustom::new(text("To('/page1')")))
            .is_err());
    }
}
