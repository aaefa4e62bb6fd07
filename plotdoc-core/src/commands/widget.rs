use std::borrow::Cow;

use super::{applied, not_applied, CommandError, Operation, Outcome};
use crate::state::path;
use crate::state::setting::SettingValue;
use crate::state::tree::{factory, TreeError, Widget, WidgetKind};
use crate::Document;

/// Split a widget path into its parent path and name, refusing the root.
fn parent_and_name(widget_path: &str) -> Result<(String, String), CommandError> {
    let normalized = path::resolve_relative("/", widget_path);
    let (parent, name) = path::split(&normalized).ok_or(TreeError::Root)?;
    Ok((parent, name.to_owned()))
}

#[derive(Debug)]
pub struct WidgetRename {
    path: String,
    new_name: String,
    /// New path and old name.
    renamed: Option<(String, String)>,
}
impl WidgetRename {
    #[must_use]
    pub fn new(path: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            new_name: new_name.into(),
            renamed: None,
        }
    }
}
impl Operation for WidgetRename {
    fn apply(&mut self, document: &mut Document) -> Result<Outcome, CommandError> {
        not_applied(&self.renamed)?;
        let (parent, old_name) = parent_and_name(&self.path)?;
        let parent_widget = document.resolve_widget_mut(&parent)?;
        if parent_widget.child(&old_name).is_none() {
            return Err(CommandError::WidgetNotFound(self.path.clone()));
        }
        parent_widget.rename_child(&old_name, &self.new_name)?;
        self.renamed = Some((path::join(&parent, &self.new_name), old_name));
        Ok(Outcome::None)
    }
    fn undo(&mut self, document: &mut Document) -> Result<(), CommandError> {
        let (new_path, old_name) = applied(&mut self.renamed)?;
        let (parent, new_name) = parent_and_name(&new_path)?;
        document
            .resolve_widget_mut(&parent)?
            .rename_child(&new_name, &old_name)?;
        Ok(())
    }
    fn descr(&self) -> Cow<'_, str> {
        "rename".into()
    }
}

/// A widget detached from the tree, and where it came from.
#[derive(Debug)]
struct Removed {
    parent: String,
    index: usize,
    widget: Widget,
}
impl Removed {
    fn take(document: &mut Document, widget_path: &str) -> Result<Self, CommandError> {
        let (parent, name) = parent_and_name(widget_path)?;
        let (index, widget) = document
            .resolve_widget_mut(&parent)?
            .remove_child(&name)
            .ok_or_else(|| CommandError::WidgetNotFound(widget_path.to_owned()))?;
        log::trace!("Detached {} from {parent}", widget.id());
        Ok(Self {
            parent,
            index,
            widget,
        })
    }
    fn put_back(self, document: &mut Document) -> Result<(), CommandError> {
        document
            .resolve_widget_mut(&self.parent)?
            .insert_child(self.widget, Some(self.index))?;
        Ok(())
    }
}

/// Detach a widget, keeping it so undo can put back the very same one.
#[derive(Debug)]
pub struct WidgetDelete {
    path: String,
    removed: Option<Removed>,
}
impl WidgetDelete {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            removed: None,
        }
    }
}
impl Operation for WidgetDelete {
    fn apply(&mut self, document: &mut Document) -> Result<Outcome, CommandError> {
        not_applied(&self.removed)?;
        self.removed = Some(Removed::take(document, &self.path)?);
        Ok(Outcome::None)
    }
    fn undo(&mut self, document: &mut Document) -> Result<(), CommandError> {
        applied(&mut self.removed)?.put_back(document)
    }
    fn descr(&self) -> Cow<'_, str> {
        "delete".into()
    }
}

/// Delete several widgets at once. Paths below another requested path are skipped, as
/// deleting the ancestor takes them too.
#[derive(Debug)]
pub struct WidgetsDelete {
    paths: Vec<String>,
    removed: Option<Vec<Removed>>,
}
impl WidgetsDelete {
    #[must_use]
    pub fn new(paths: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            removed: None,
        }
    }
    /// The paths that will actually be deleted, shortest first.
    fn roots(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .paths
            .iter()
            .map(|p| path::resolve_relative("/", p))
            .collect();
        // Stable, so equal-length paths keep their requested order.
        paths.sort_by_key(String::len);
        let mut kept: Vec<String> = Vec::with_capacity(paths.len());
        for candidate in paths {
            let covered = kept
                .iter()
                .any(|k| *k == candidate || candidate.starts_with(&format!("{k}/")));
            if !covered {
                kept.push(candidate);
            }
        }
        kept
    }
}
impl Operation for WidgetsDelete {
    fn apply(&mut self, document: &mut Document) -> Result<Outcome, CommandError> {
        not_applied(&self.removed)?;
        let roots = self.roots();
        // All or nothing.
        for root in &roots {
            parent_and_name(root)?;
            document.resolve_widget(root)?;
        }
        let mut removed = Vec::with_capacity(roots.len());
        for root in &roots {
            removed.push(Removed::take(document, root)?);
        }
        self.removed = Some(removed);
        Ok(Outcome::None)
    }
    fn undo(&mut self, document: &mut Document) -> Result<(), CommandError> {
        // Reverse order, so recorded indices are valid again.
        for removed in applied(&mut self.removed)?.into_iter().rev() {
            removed.put_back(document)?;
        }
        Ok(())
    }
    fn descr(&self) -> Cow<'_, str> {
        "delete".into()
    }
}

/// Swap a widget with its previous (`direction` < 0) or next sibling.
#[derive(Debug)]
pub struct WidgetMoveUpDown {
    path: String,
    direction: isize,
    moved: Option<bool>,
}
impl WidgetMoveUpDown {
    #[must_use]
    pub fn new(path: impl Into<String>, direction: isize) -> Self {
        Self {
            path: path.into(),
            direction,
            moved: None,
        }
    }
}
impl Operation for WidgetMoveUpDown {
    fn apply(&mut self, document: &mut Document) -> Result<Outcome, CommandError> {
        not_applied(&self.moved)?;
        let (parent, name) = parent_and_name(&self.path)?;
        let parent = document.resolve_widget_mut(&parent)?;
        if parent.child(&name).is_none() {
            return Err(CommandError::WidgetNotFound(self.path.clone()));
        }
        // Hitting either end is not an error, just nothing to do.
        self.moved = Some(parent.move_child(&name, self.direction));
        Ok(Outcome::None)
    }
    fn undo(&mut self, document: &mut Document) -> Result<(), CommandError> {
        if applied(&mut self.moved)? {
            let (parent, name) = parent_and_name(&self.path)?;
            document
                .resolve_widget_mut(&parent)?
                .move_child(&name, -self.direction);
        }
        Ok(())
    }
    fn descr(&self) -> Cow<'_, str> {
        "move".into()
    }
}

#[derive(Debug)]
struct Moved {
    old_parent: String,
    old_index: usize,
    /// Set if the widget had to be renamed to fit in with its new siblings.
    old_name: Option<String>,
    new_path: String,
}

/// Move a widget to a new parent and position. Moving within the same parent reorders.
#[derive(Debug)]
pub struct WidgetMove {
    path: String,
    new_parent: String,
    /// `None` appends.
    index: Option<usize>,
    moved: Option<Moved>,
}
impl WidgetMove {
    /// A negative index appends.
    #[must_use]
    pub fn new(path: impl Into<String>, new_parent: impl Into<String>, index: isize) -> Self {
        Self {
            path: path.into(),
            new_parent: new_parent.into(),
            index: usize::try_from(index).ok(),
            moved: None,
        }
    }
}
impl Operation for WidgetMove {
    fn apply(&mut self, document: &mut Document) -> Result<Outcome, CommandError> {
        not_applied(&self.moved)?;
        let child_path = path::resolve_relative("/", &self.path);
        let new_parent = path::resolve_relative("/", &self.new_parent);
        let (old_parent, name) = parent_and_name(&child_path)?;

        // Validate before touching anything.
        let kind = document.resolve_widget(&child_path)?.kind();
        let parent_kind = document.resolve_widget(&new_parent)?.kind();
        if path::is_within(&child_path, &new_parent) {
            return Err(TreeError::WouldCycle(child_path).into());
        }
        if !kind.allowed_parents().contains(&parent_kind) {
            return Err(TreeError::NotAllowed {
                child: kind,
                parent: parent_kind,
            }
            .into());
        }

        let (old_index, mut widget) = document
            .resolve_widget_mut(&old_parent)?
            .remove_child(&name)
            .ok_or_else(|| CommandError::WidgetNotFound(child_path.clone()))?;

        let mut old_name = None;
        let target_index = if old_parent == new_parent {
            // Indices past the removal point shift down by one.
            self.index
                .map(|index| if index > old_index { index - 1 } else { index })
        } else {
            let target = document.resolve_widget(&new_parent)?;
            if target.child(&name).is_some() {
                widget.set_name(target.choose_name(kind));
                old_name = Some(name);
            }
            self.index
        };
        let new_name = widget.name().to_owned();
        document
            .resolve_widget_mut(&new_parent)?
            .insert_child(widget, target_index)?;
        self.moved = Some(Moved {
            old_parent,
            old_index,
            old_name,
            new_path: path::join(&new_parent, &new_name),
        });
        Ok(Outcome::None)
    }
    fn undo(&mut self, document: &mut Document) -> Result<(), CommandError> {
        let moved = applied(&mut self.moved)?;
        let (new_parent, new_name) = parent_and_name(&moved.new_path)?;
        let (_, mut widget) = document
            .resolve_widget_mut(&new_parent)?
            .remove_child(&new_name)
            .ok_or_else(|| CommandError::WidgetNotFound(moved.new_path.clone()))?;
        if let Some(old_name) = moved.old_name {
            widget.set_name(old_name);
        }
        document
            .resolve_widget_mut(&moved.old_parent)?
            .insert_child(widget, Some(moved.old_index))?;
        Ok(())
    }
    fn descr(&self) -> Cow<'_, str> {
        "move".into()
    }
}

/// Make a new widget with the factory.
#[derive(Debug)]
pub struct WidgetAdd {
    parent: String,
    kind: WidgetKind,
    autoadd: bool,
    name: Option<String>,
    index: Option<usize>,
    values: Vec<(String, SettingValue)>,
    created: Option<String>,
}
impl WidgetAdd {
    /// Adds at the end, with mandatory children and a generated name.
    #[must_use]
    pub fn new(parent: impl Into<String>, kind: WidgetKind) -> Self {
        Self {
            parent: parent.into(),
            kind,
            autoadd: true,
            name: None,
            index: None,
            values: Vec::new(),
            created: None,
        }
    }
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
    #[must_use]
    pub fn autoadd(mut self, autoadd: bool) -> Self {
        self.autoadd = autoadd;
        self
    }
    #[must_use]
    pub fn index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }
    /// An initial setting value, by path relative to the new widget.
    #[must_use]
    pub fn value(mut self, setting: impl Into<String>, value: impl Into<SettingValue>) -> Self {
        self.values.push((setting.into(), value.into()));
        self
    }
}
impl Operation for WidgetAdd {
    fn apply(&mut self, document: &mut Document) -> Result<Outcome, CommandError> {
        not_applied(&self.created)?;
        let parent = document.resolve_widget_mut(&self.parent)?;
        let name = factory::make_widget(
            parent,
            self.kind,
            self.autoadd,
            self.name.as_deref(),
            self.index,
            &self.values,
        )?;
        let created = path::join(&path::resolve_relative("/", &self.parent), &name);
        self.created = Some(name);
        Ok(Outcome::Widget(created))
    }
    fn undo(&mut self, document: &mut Document) -> Result<(), CommandError> {
        let name = applied(&mut self.created)?;
        document
            .resolve_widget_mut(&self.parent)?
            .remove_child(&name)
            .ok_or_else(|| CommandError::WidgetNotFound(path::join(&self.parent, &name)))?;
        Ok(())
    }
    fn descr(&self) -> Cow<'_, str> {
        "add".into()
    }
}
