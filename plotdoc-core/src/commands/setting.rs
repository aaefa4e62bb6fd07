use std::borrow::Cow;

use super::{applied, not_applied, CommandError, Operation, Outcome};
use crate::state::path;
use crate::state::setting::SettingValue;
use crate::state::tree::WidgetKind;
use crate::Document;

/// Rebind one setting, to a literal or to a reference.
#[derive(Debug)]
pub struct SettingSet {
    path: String,
    value: SettingValue,
    old: Option<SettingValue>,
}
impl SettingSet {
    #[must_use]
    pub fn new(path: impl Into<String>, value: impl Into<SettingValue>) -> Self {
        Self {
            path: path.into(),
            value: value.into(),
            old: None,
        }
    }
    /// Make the setting follow another setting's value.
    #[must_use]
    pub fn to_reference(path: impl Into<String>, reference: impl Into<String>) -> Self {
        Self::new(path, SettingValue::Reference(reference.into()))
    }
}
impl Operation for SettingSet {
    fn apply(&mut self, document: &mut Document) -> Result<Outcome, CommandError> {
        not_applied(&self.old)?;
        self.old = Some(document.set_setting(&self.path, self.value.clone())?);
        Ok(Outcome::None)
    }
    fn undo(&mut self, document: &mut Document) -> Result<(), CommandError> {
        let old = applied(&mut self.old)?;
        document.set_setting(&self.path, old)?;
        Ok(())
    }
    fn descr(&self) -> Cow<'_, str> {
        "change setting".into()
    }
}

/// Which widgets a propagated setting is copied to, by type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum KindFilter {
    /// The type of the widget owning the source setting.
    #[default]
    Same,
    Any,
    Kind(WidgetKind),
}

/// Copy a setting's value to the same setting on matching widgets in a subtree.
#[derive(Debug)]
pub struct SettingPropagate {
    source: String,
    kind: KindFilter,
    name: Option<String>,
    root: Option<String>,
    max_levels: isize,
    restore: Option<Vec<(String, SettingValue)>>,
}
impl SettingPropagate {
    /// Propagate to every same-type widget below the document root.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            kind: KindFilter::Same,
            name: None,
            root: None,
            max_levels: -1,
            restore: None,
        }
    }
    #[must_use]
    pub fn kind(mut self, kind: KindFilter) -> Self {
        self.kind = kind;
        self
    }
    /// Only widgets with this name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
    /// Search below this widget rather than the root.
    #[must_use]
    pub fn root(mut self, root: impl Into<String>) -> Self {
        self.root = Some(root.into());
        self
    }
    /// 0 changes nothing, 1 only direct children of the root, negative is unlimited.
    #[must_use]
    pub fn max_levels(mut self, max_levels: isize) -> Self {
        self.max_levels = max_levels;
        self
    }
}
impl Operation for SettingPropagate {
    fn apply(&mut self, document: &mut Document) -> Result<Outcome, CommandError> {
        not_applied(&self.restore)?;
        let value = SettingValue::Literal(document.setting_val(&self.source)?);
        let (owner, segments) = document.split_setting_path(&self.source)?;
        let kind = match self.kind {
            KindFilter::Same => Some(document.resolve_widget(&owner)?.kind()),
            KindFilter::Any => None,
            KindFilter::Kind(kind) => Some(kind),
        };
        let root = self.root.as_deref().unwrap_or("/");
        let max_levels = usize::try_from(self.max_levels).ok();

        // Collect first, the tree can't be borrowed while setting.
        let mut targets = Vec::new();
        document
            .resolve_widget(root)?
            .visit_descendants(root, max_levels, &mut |widget_path, widget| {
                let kind_ok = kind.map_or(true, |k| k == widget.kind());
                let name_ok = self.name.as_deref().map_or(true, |n| n == widget.name());
                if kind_ok && name_ok && widget.settings().lookup(&segments).is_some() {
                    targets.push(path::join(widget_path, &segments.join("/")));
                }
            });

        let mut restore = Vec::with_capacity(targets.len());
        for target in targets {
            match document.set_setting(&target, value.clone()) {
                Ok(old) => restore.push((target, old)),
                Err(e) => {
                    // Put back what was already changed.
                    for (path, old) in restore.into_iter().rev() {
                        document.set_setting(&path, old)?;
                    }
                    return Err(e);
                }
            }
        }
        log::trace!("Propagated {} to {} settings", self.source, restore.len());
        self.restore = Some(restore);
        Ok(Outcome::None)
    }
    fn undo(&mut self, document: &mut Document) -> Result<(), CommandError> {
        for (path, old) in applied(&mut self.restore)?.into_iter().rev() {
            document.set_setting(&path, old)?;
        }
        Ok(())
    }
    fn descr(&self) -> Cow<'_, str> {
        "propagate setting".into()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::state::setting::Value;
    use crate::state::tree::factory;

    /// Page with two graphs, each with x and y axes.
    fn document() -> Document {
        let mut doc = Document::new();
        let root = doc.resolve_widget_mut("/").unwrap();
        factory::make_widget(root, WidgetKind::Page, false, None, None, &[]).unwrap();
        for _ in 0..2 {
            let page = doc.resolve_widget_mut("/page1").unwrap();
            factory::make_widget(page, WidgetKind::Graph, true, None, None, &[]).unwrap();
        }
        doc
    }
    fn width(doc: &Document, path: &str) -> Value {
        doc.setting_val(&format!("{path}/Line/width")).unwrap()
    }

    #[test]
    fn set_and_undo_reference() {
        let mut doc = document();
        let label = "/page1/graph1/y/label";
        doc.apply(SettingSet::to_reference(label, "../x/label")).unwrap();
        assert!(doc.resolve_setting(label).unwrap().is_reference());
        doc.apply(SettingSet::new(label, Value::Text("y".into())))
            .unwrap();
        doc.undo().unwrap();
        // Restores the reference itself, not its resolved value.
        assert_eq!(
            doc.resolve_setting(label).unwrap().value(),
            &SettingValue::Reference("../x/label".into())
        );
        doc.undo().unwrap();
        assert_eq!(
            doc.resolve_setting(label).unwrap().value(),
            &SettingValue::Literal(Value::Text(String::new()))
        );
    }
    #[test]
    fn type_checked() {
        let mut doc = document();
        let err = doc
            .apply(SettingSet::new("/page1/graph1/hide", Value::Float(1.0)))
            .unwrap_err();
        assert!(matches!(err, CommandError::Setting { .. }));
    }
    #[test]
    fn undo_without_apply() {
        let mut doc = document();
        let mut command = SettingSet::new("/page1/graph1/hide", Value::Bool(true));
        assert!(matches!(command.undo(&mut doc), Err(CommandError::NotApplied)));
        command.apply(&mut doc).unwrap();
        assert!(matches!(command.apply(&mut doc), Err(CommandError::AlreadyApplied)));
    }
    #[test]
    fn propagate_levels() {
        let mut doc = document();
        doc.apply(SettingSet::new("/page1/graph1/x/Line/width", Value::Float(2.0)))
            .unwrap();
        let before = doc.root().clone();

        // Axes are two levels below the page, so one level reaches none of them.
        doc.apply(
            SettingPropagate::new("/page1/graph1/x/Line/width")
                .root("/page1")
                .max_levels(1),
        )
        .unwrap();
        assert_eq!(width(&doc, "/page1/graph2/y"), Value::Float(0.5));
        doc.undo().unwrap();

        doc.apply(SettingPropagate::new("/page1/graph1/x/Line/width").max_levels(-1))
            .unwrap();
        for axis in ["/page1/graph1/y", "/page1/graph2/x", "/page1/graph2/y"] {
            assert_eq!(width(&doc, axis), Value::Float(2.0));
        }
        // Graphs also have a Line/width, but are not axes.
        assert_eq!(width(&doc, "/page1/graph2"), Value::Float(0.5));
        doc.undo().unwrap();
        assert_eq!(doc.root(), &before);
    }
    #[test]
    fn propagate_filters() {
        let mut doc = document();
        doc.apply(SettingSet::new("/page1/graph1/Line/width", Value::Float(4.0)))
            .unwrap();
        doc.apply(
            SettingPropagate::new("/page1/graph1/Line/width")
                .kind(KindFilter::Any)
                .name("y"),
        )
        .unwrap();
        assert_eq!(width(&doc, "/page1/graph2/y"), Value::Float(4.0));
        assert_eq!(width(&doc, "/page1/graph2/x"), Value::Float(0.5));
        assert_eq!(width(&doc, "/page1/graph2"), Value::Float(0.5));

        doc.apply(
            SettingPropagate::new("/page1/graph1/Line/width")
                .root("/page1")
                .max_levels(1),
        )
        .unwrap();
        assert_eq!(width(&doc, "/page1/graph2"), Value::Float(4.0));
        assert_eq!(width(&doc, "/page1/graph2/x"), Value::Float(0.5));

        doc.apply(SettingPropagate::new("/page1/graph1/Line/width").max_levels(0))
            .unwrap();
        doc.undo().unwrap();
        assert_eq!(width(&doc, "/page1/graph2"), Value::Float(4.0));
    }
    #[test]
    fn propagate_depths() {
        let mut doc = document();
        for parent in ["/page1", "/page1/graph1"] {
            let parent = doc.resolve_widget_mut(parent).unwrap();
            factory::make_widget(parent, WidgetKind::Label, false, None, None, &[]).unwrap();
        }
        let source = "/page1/label1/Text/size";
        doc.apply(SettingSet::new(source, Value::Float(20.0))).unwrap();
        let size = |doc: &Document| doc.setting_val("/page1/graph1/label1/Text/size").unwrap();

        // Direct children of the page only.
        doc.apply(SettingPropagate::new(source).root("/page1").max_levels(1))
            .unwrap();
        assert_eq!(size(&doc), Value::Float(14.0));
        doc.undo().unwrap();

        doc.apply(SettingPropagate::new(source).root("/page1").max_levels(-1))
            .unwrap();
        assert_eq!(size(&doc), Value::Float(20.0));
        doc.undo().unwrap();
        assert_eq!(size(&doc), Value::Float(14.0));
        assert_eq!(doc.setting_val(source).unwrap(), Value::Float(20.0));
    }
}
