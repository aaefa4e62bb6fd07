//! # Widget tree
//!
//! The document is a tree of widgets, each owning its children in order. Siblings have
//! unique names, so a widget is addressed by the `/`-joined names from the root.

pub mod factory;

use super::setting::{SettingError, SettingGroup, Value};

pub type WidgetID = crate::id::PlotID<Widget>;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TreeError {
    #[error("name {0:?} is already used by a sibling")]
    NameInUse(String),
    #[error("{0:?} is not a valid widget name")]
    InvalidName(String),
    #[error("no child named {0:?}")]
    NoChild(String),
    #[error("a {child} widget cannot be placed inside a {parent}")]
    NotAllowed { child: WidgetKind, parent: WidgetKind },
    #[error("unknown widget type {0:?}")]
    UnknownKind(String),
    #[error("cannot move {0} into itself or its own descendant")]
    WouldCycle(String),
    #[error("the root widget cannot be moved, renamed or removed")]
    Root,
    #[error("{kind} widget has no setting {path:?}")]
    UnknownSetting { kind: WidgetKind, path: String },
    #[error("bad value for setting {path:?}")]
    BadValue {
        path: String,
        #[source]
        source: SettingError,
    },
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
    strum::EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum WidgetKind {
    Document,
    Page,
    Grid,
    Graph,
    Axis,
    Xy,
    Function,
    Label,
    Key,
    Image,
}
impl WidgetKind {
    pub fn parse(name: &str) -> Result<Self, TreeError> {
        name.parse()
            .map_err(|_| TreeError::UnknownKind(name.to_owned()))
    }
    /// The kinds of widget this kind may be placed inside.
    #[must_use]
    pub fn allowed_parents(self) -> &'static [WidgetKind] {
        use WidgetKind as K;
        match self {
            K::Document => &[],
            K::Page => &[K::Document],
            K::Grid => &[K::Page, K::Grid],
            K::Graph => &[K::Page, K::Grid],
            K::Axis => &[K::Graph, K::Grid],
            K::Label => &[K::Graph, K::Page],
            K::Xy | K::Function | K::Key | K::Image => &[K::Graph],
        }
    }
    /// Default settings of a freshly made widget of this kind.
    #[must_use]
    pub fn settings(self) -> SettingGroup {
        use WidgetKind as K;
        let text = |s: &str| Value::Text(s.to_owned());
        let line = || {
            SettingGroup::new("Line")
                .with("color", text("foreground"))
                .with("width", Value::Float(0.5))
                .with("hide", Value::Bool(false))
        };
        let font = || {
            SettingGroup::new("Text")
                .with("size", Value::Float(14.0))
                .with("color", text("foreground"))
        };
        let base = SettingGroup::new("").with("hide", Value::Bool(false));
        match self {
            K::Document => SettingGroup::new("")
                .with("width", text("15cm"))
                .with("height", text("15cm")),
            K::Page => base.with("width", text("")).with("height", text("")),
            K::Grid => base.with("rows", Value::Int(2)).with("columns", Value::Int(2)),
            K::Graph => base
                .with("leftMargin", text("1.7cm"))
                .with("bottomMargin", text("1.7cm"))
                .with_group(line().with("style", text("solid")))
                .with_group(
                    SettingGroup::new("Background")
                        .with("color", text("background"))
                        .with("hide", Value::Bool(false)),
                ),
            K::Axis => base
                .with("label", text(""))
                .with("min", text("Auto"))
                .with("max", text("Auto"))
                .with("log", Value::Bool(false))
                .with("direction", text("horizontal"))
                .with_group(line())
                .with_group(SettingGroup::new("Label").with("size", Value::Float(14.0))),
            K::Xy => base
                .with("xData", text("x"))
                .with("yData", text("y"))
                .with("marker", text("circle"))
                .with("markerSize", Value::Float(3.0))
                .with("color", text("auto"))
                .with_group(line())
                .with_group(SettingGroup::new("MarkerFill").with("color", text("auto"))),
            K::Function => base
                .with("function", text("x"))
                .with("variable", text("x"))
                .with("steps", Value::Int(50))
                .with_group(line()),
            K::Label => base
                .with("label", text(""))
                .with("xPos", Value::List(vec![0.5]))
                .with("yPos", Value::List(vec![0.5]))
                .with_group(font()),
            K::Key => base
                .with("title", text(""))
                .with("horzPosn", text("right"))
                .with("vertPosn", text("top"))
                .with_group(font()),
            K::Image => base
                .with("data", text(""))
                .with("min", text("Auto"))
                .with("max", text("Auto"))
                .with("colorMap", text("grey")),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Widget {
    id: WidgetID,
    name: String,
    kind: WidgetKind,
    settings: SettingGroup,
    children: Vec<Widget>,
}
impl Widget {
    #[must_use]
    pub fn new(kind: WidgetKind, name: impl Into<String>) -> Self {
        Self {
            id: WidgetID::default(),
            name: name.into(),
            kind,
            settings: kind.settings(),
            children: Vec::new(),
        }
    }
    /// An empty document root.
    #[must_use]
    pub fn root() -> Self {
        Self::new(WidgetKind::Document, "")
    }
    #[must_use]
    pub fn id(&self) -> WidgetID {
        self.id
    }
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
    #[must_use]
    pub fn kind(&self) -> WidgetKind {
        self.kind
    }
    #[must_use]
    pub fn typename(&self) -> &'static str {
        self.kind.into()
    }
    #[must_use]
    pub fn settings(&self) -> &SettingGroup {
        &self.settings
    }
    pub fn settings_mut(&mut self) -> &mut SettingGroup {
        &mut self.settings
    }
    #[must_use]
    pub fn children(&self) -> &[Widget] {
        &self.children
    }
    #[must_use]
    pub fn childnames(&self) -> Vec<&str> {
        self.children.iter().map(|c| c.name.as_str()).collect()
    }
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Widget> {
        self.children.iter().find(|c| c.name == name)
    }
    pub fn child_mut(&mut self, name: &str) -> Option<&mut Widget> {
        self.children.iter_mut().find(|c| c.name == name)
    }
    #[must_use]
    pub fn child_index(&self, name: &str) -> Option<usize> {
        self.children.iter().position(|c| c.name == name)
    }
    pub fn check_name(name: &str) -> Result<(), TreeError> {
        if name.is_empty() || name.contains('/') || name.trim() != name {
            Err(TreeError::InvalidName(name.to_owned()))
        } else {
            Ok(())
        }
    }
    /// Insert an existing widget as a child. `None` or an index past the end appends.
    /// Returns the index it landed at.
    pub fn insert_child(&mut self, child: Widget, index: Option<usize>) -> Result<usize, TreeError> {
        Self::check_name(&child.name)?;
        if self.child(&child.name).is_some() {
            return Err(TreeError::NameInUse(child.name));
        }
        let index = index.map_or(self.children.len(), |i| i.min(self.children.len()));
        self.children.insert(index, child);
        Ok(index)
    }
    /// Detach a child, returning it with the index it was at.
    pub fn remove_child(&mut self, name: &str) -> Option<(usize, Widget)> {
        let index = self.child_index(name)?;
        Some((index, self.children.remove(index)))
    }
    /// Swap the named child with its neighbour, `direction` < 0 towards the front.
    /// Returns false if it is already at that end.
    pub fn move_child(&mut self, name: &str, direction: isize) -> bool {
        let Some(index) = self.child_index(name) else {
            return false;
        };
        let Some(target) = index.checked_add_signed(direction.signum()) else {
            return false;
        };
        if target >= self.children.len() || direction == 0 {
            return false;
        }
        self.children.swap(index, target);
        true
    }
    pub fn rename_child(&mut self, old: &str, new: &str) -> Result<(), TreeError> {
        Self::check_name(new)?;
        if old != new && self.child(new).is_some() {
            return Err(TreeError::NameInUse(new.to_owned()));
        }
        let child = self
            .child_mut(old)
            .ok_or_else(|| TreeError::NoChild(old.to_owned()))?;
        new.clone_into(&mut child.name);
        Ok(())
    }
    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }
    /// A name for a new child of the given kind: `<type><n>` with the lowest free n >= 1.
    #[must_use]
    pub fn choose_name(&self, kind: WidgetKind) -> String {
        let prefix: &'static str = kind.into();
        (1usize..)
            .map(|n| format!("{prefix}{n}"))
            .find(|name| self.child(name).is_none())
            .unwrap_or_else(|| prefix.to_owned())
    }
    /// Pre-order walk of the descendants (not self), calling `visit` with each widget's path.
    /// `max_levels` of `None` is unlimited, `Some(0)` visits nothing, `Some(1)` only direct children.
    pub fn visit_descendants(
        &self,
        path: &str,
        max_levels: Option<usize>,
        visit: &mut impl FnMut(&str, &Widget),
    ) {
        if max_levels == Some(0) {
            return;
        }
        let below = max_levels.map(|l| l.saturating_sub(1));
        for child in &self.children {
            let child_path = super::path::join(path, &child.name);
            visit(&child_path, child);
            child.visit_descendants(&child_path, below, visit);
        }
    }
    /// Total number of widgets in this subtree, including self.
    #[must_use]
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Widget::count).sum::<usize>()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    fn graph_with_children() -> Widget {
        let mut graph = Widget::new(WidgetKind::Graph, "graph1");
        for name in ["a", "b", "c"] {
            graph
                .insert_child(Widget::new(WidgetKind::Xy, name), None)
                .unwrap();
        }
        graph
    }
    #[test]
    fn kind_names() {
        assert_eq!(WidgetKind::Xy.to_string(), "xy");
        assert_eq!(WidgetKind::parse("graph"), Ok(WidgetKind::Graph));
        assert_eq!(
            WidgetKind::parse("teapot"),
            Err(TreeError::UnknownKind("teapot".into()))
        );
    }
    #[test]
    fn choose_name_lowest_free() {
        let mut graph = graph_with_children();
        assert_eq!(graph.choose_name(WidgetKind::Xy), "xy1");
        graph
            .insert_child(Widget::new(WidgetKind::Xy, "xy1"), None)
            .unwrap();
        graph
            .insert_child(Widget::new(WidgetKind::Xy, "xy3"), None)
            .unwrap();
        assert_eq!(graph.choose_name(WidgetKind::Xy), "xy2");
    }
    #[test]
    fn duplicate_and_bad_names() {
        let mut graph = graph_with_children();
        assert_eq!(
            graph.insert_child(Widget::new(WidgetKind::Xy, "a"), None),
            Err(TreeError::NameInUse("a".into()))
        );
        assert!(graph.rename_child("a", "b").is_err());
        assert!(graph.rename_child("a", "x/y").is_err());
        assert!(graph.rename_child("a", "").is_err());
        graph.rename_child("a", "z").unwrap();
        assert_eq!(graph.childnames(), ["z", "b", "c"]);
    }
    #[test]
    fn move_child_bounds() {
        let mut graph = graph_with_children();
        assert!(!graph.move_child("a", -1));
        assert!(graph.move_child("a", 1));
        assert_eq!(graph.childnames(), ["b", "a", "c"]);
        assert!(!graph.move_child("c", 1));
    }
    #[test]
    fn visit_depth() {
        let mut page = Widget::new(WidgetKind::Page, "page1");
        page.insert_child(graph_with_children(), None).unwrap();
        let mut seen = Vec::new();
        page.visit_descendants("/page1", Some(1), &mut |p, _| seen.push(p.to_owned()));
        assert_eq!(seen, ["/page1/graph1"]);
        seen.clear();
        page.visit_descendants("/page1", None, &mut |p, _| seen.push(p.to_owned()));
        assert_eq!(seen.len(), 4);
        seen.clear();
        page.visit_descendants("/page1", Some(0), &mut |p, _| seen.push(p.to_owned()));
        assert!(seen.is_empty());
    }
}
