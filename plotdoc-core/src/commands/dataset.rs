use std::borrow::Cow;
use std::path::PathBuf;

use super::{applied, not_applied, CommandError, Operation, Outcome};
use crate::state::dataset::{Dataset, LinkedFile};
use crate::Document;

/// Whatever occupied a dataset name before a command put something there.
#[derive(Debug, Default)]
pub(crate) struct Backup {
    /// `Some(None)` records that the name was free.
    taken: Option<Option<Dataset>>,
}
impl Backup {
    pub(crate) fn install(
        &mut self,
        document: &mut Document,
        name: &str,
        dataset: Dataset,
    ) -> Result<(), CommandError> {
        not_applied(&self.taken)?;
        self.taken = Some(document.set_data(name, dataset));
        Ok(())
    }
    /// Put back the previous occupant, returning the dataset that was installed.
    pub(crate) fn restore(
        &mut self,
        document: &mut Document,
        name: &str,
    ) -> Result<Option<Dataset>, CommandError> {
        Ok(match applied(&mut self.taken)? {
            Some(previous) => document.set_data(name, previous),
            None => document.delete_data(name),
        })
    }
    pub(crate) fn is_taken(&self) -> bool {
        self.taken.is_some()
    }
}

/// Install a dataset under a name, replacing anything already there.
#[derive(Debug)]
pub struct DatasetSet {
    name: String,
    /// Moved into the document on apply, and back out on undo.
    dataset: Option<Dataset>,
    backup: Backup,
}
impl DatasetSet {
    #[must_use]
    pub fn new(name: impl Into<String>, dataset: Dataset) -> Self {
        Self {
            name: name.into(),
            dataset: Some(dataset),
            backup: Backup::default(),
        }
    }
}
impl Operation for DatasetSet {
    fn apply(&mut self, document: &mut Document) -> Result<Outcome, CommandError> {
        not_applied(&self.backup.taken)?;
        let dataset = applied(&mut self.dataset)?;
        self.backup.install(document, &self.name, dataset)?;
        Ok(Outcome::Dataset(self.name.clone()))
    }
    fn undo(&mut self, document: &mut Document) -> Result<(), CommandError> {
        self.dataset = self.backup.restore(document, &self.name)?;
        Ok(())
    }
    fn descr(&self) -> Cow<'_, str> {
        "set dataset".into()
    }
}

#[derive(Debug)]
pub struct DatasetDelete {
    name: String,
    deleted: Option<Dataset>,
}
impl DatasetDelete {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            deleted: None,
        }
    }
}
impl Operation for DatasetDelete {
    fn apply(&mut self, document: &mut Document) -> Result<Outcome, CommandError> {
        not_applied(&self.deleted)?;
        let deleted = document
            .delete_data(&self.name)
            .ok_or_else(|| CommandError::DatasetNotFound(self.name.clone()))?;
        self.deleted = Some(deleted);
        Ok(Outcome::None)
    }
    fn undo(&mut self, document: &mut Document) -> Result<(), CommandError> {
        let deleted = applied(&mut self.deleted)?;
        document.set_data(&self.name, deleted);
        Ok(())
    }
    fn descr(&self) -> Cow<'_, str> {
        "delete dataset".into()
    }
}

/// A rename-map entry, keyed by the name the dataset had when its file was read.
#[derive(Debug)]
struct RenameEntry {
    original: String,
    displaced: Option<String>,
}

#[derive(Debug)]
pub struct DatasetRename {
    old_name: String,
    new_name: String,
    /// `Some(None)` if the dataset has no file link.
    renamed: Option<Option<RenameEntry>>,
}
impl DatasetRename {
    #[must_use]
    pub fn new(old_name: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self {
            old_name: old_name.into(),
            new_name: new_name.into(),
            renamed: None,
        }
    }
}
impl Operation for DatasetRename {
    fn apply(&mut self, document: &mut Document) -> Result<Outcome, CommandError> {
        not_applied(&self.renamed)?;
        document.rename_dataset(&self.old_name, &self.new_name)?;
        let entry = document
            .dataset(&self.new_name)?
            .linked
            .as_ref()
            .map(|link| {
                let mut params = link.params.write();
                // Already renamed since the import? Then keep the key it was read under.
                let original = params
                    .renames
                    .iter()
                    .find(|(_, current)| **current == self.old_name)
                    .map_or_else(|| self.old_name.clone(), |(original, _)| original.clone());
                let displaced = params
                    .renames
                    .insert(original.clone(), self.new_name.clone());
                RenameEntry {
                    original,
                    displaced,
                }
            });
        self.renamed = Some(entry);
        Ok(Outcome::None)
    }
    fn undo(&mut self, document: &mut Document) -> Result<(), CommandError> {
        let entry = applied(&mut self.renamed)?;
        if let Some(RenameEntry {
            original,
            displaced,
        }) = entry
        {
            if let Some(link) = &document.dataset(&self.new_name)?.linked {
                let mut params = link.params.write();
                match displaced {
                    Some(displaced) => params.renames.insert(original, displaced),
                    None => params.renames.remove(&original),
                };
            }
        }
        document.rename_dataset(&self.new_name, &self.old_name)
    }
    fn descr(&self) -> Cow<'_, str> {
        "rename dataset".into()
    }
}

/// Copy a dataset's current values to a new name, without generator or file link.
#[derive(Debug)]
pub struct DatasetDuplicate {
    source: String,
    destination: String,
    backup: Backup,
}
impl DatasetDuplicate {
    #[must_use]
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            backup: Backup::default(),
        }
    }
}
impl Operation for DatasetDuplicate {
    fn apply(&mut self, document: &mut Document) -> Result<Outcome, CommandError> {
        not_applied(&self.backup.taken)?;
        let copy = document.dataset(&self.source)?.return_copy();
        self.backup.install(document, &self.destination, copy)?;
        Ok(Outcome::Dataset(self.destination.clone()))
    }
    fn undo(&mut self, document: &mut Document) -> Result<(), CommandError> {
        self.backup.restore(document, &self.destination)?;
        Ok(())
    }
    fn descr(&self) -> Cow<'_, str> {
        "duplicate dataset".into()
    }
}

/// Forget which file a dataset was read from.
#[derive(Debug)]
pub struct DatasetUnlinkFile {
    name: String,
    unlinked: Option<Option<LinkedFile>>,
}
impl DatasetUnlinkFile {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unlinked: None,
        }
    }
}
impl Operation for DatasetUnlinkFile {
    fn apply(&mut self, document: &mut Document) -> Result<Outcome, CommandError> {
        not_applied(&self.unlinked)?;
        let link = document.dataset_mut(&self.name)?.linked.take();
        document.modified_data(&self.name);
        self.unlinked = Some(link);
        Ok(Outcome::None)
    }
    fn undo(&mut self, document: &mut Document) -> Result<(), CommandError> {
        let link = applied(&mut self.unlinked)?;
        document.dataset_mut(&self.name)?.linked = link;
        document.modified_data(&self.name);
        Ok(())
    }
    fn descr(&self) -> Cow<'_, str> {
        "unlink dataset".into()
    }
}

/// Freeze a generated dataset at its current values.
#[derive(Debug)]
pub struct DatasetUnlinkRelation {
    name: String,
    original: Option<Dataset>,
}
impl DatasetUnlinkRelation {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            original: None,
        }
    }
}
impl Operation for DatasetUnlinkRelation {
    fn apply(&mut self, document: &mut Document) -> Result<Outcome, CommandError> {
        not_applied(&self.original)?;
        let frozen = document.dataset(&self.name)?.return_copy();
        self.original = document.set_data(&self.name, frozen);
        Ok(Outcome::None)
    }
    fn undo(&mut self, document: &mut Document) -> Result<(), CommandError> {
        let original = applied(&mut self.original)?;
        document.set_data(&self.name, original);
        Ok(())
    }
    fn descr(&self) -> Cow<'_, str> {
        "unlink dataset".into()
    }
}

/// Unlink every dataset read from a file.
#[derive(Debug)]
pub struct DatasetUnlinkByFile {
    filename: PathBuf,
    unlinked: Option<Vec<(String, LinkedFile)>>,
}
impl DatasetUnlinkByFile {
    #[must_use]
    pub fn new(filename: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            unlinked: None,
        }
    }
}
impl Operation for DatasetUnlinkByFile {
    fn apply(&mut self, document: &mut Document) -> Result<Outcome, CommandError> {
        not_applied(&self.unlinked)?;
        let mut unlinked = Vec::new();
        for name in document.datasets_linked_to(&self.filename) {
            if let Some(link) = document.dataset_mut(&name)?.linked.take() {
                document.modified_data(&name);
                unlinked.push((name, link));
            }
        }
        self.unlinked = Some(unlinked);
        Ok(Outcome::None)
    }
    fn undo(&mut self, document: &mut Document) -> Result<(), CommandError> {
        for (name, link) in applied(&mut self.unlinked)? {
            document.dataset_mut(&name)?.linked = Some(link);
            document.modified_data(&name);
        }
        Ok(())
    }
    fn descr(&self) -> Cow<'_, str> {
        "unlink file".into()
    }
}

/// Delete every dataset read from a file.
#[derive(Debug)]
pub struct DatasetDeleteByFile {
    filename: PathBuf,
    deleted: Option<Vec<(String, Dataset)>>,
}
impl DatasetDeleteByFile {
    #[must_use]
    pub fn new(filename: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            deleted: None,
        }
    }
}
impl Operation for DatasetDeleteByFile {
    fn apply(&mut self, document: &mut Document) -> Result<Outcome, CommandError> {
        not_applied(&self.deleted)?;
        let deleted = document
            .datasets_linked_to(&self.filename)
            .into_iter()
            .filter_map(|name| {
                let dataset = document.delete_data(&name)?;
                Some((name, dataset))
            })
            .collect();
        self.deleted = Some(deleted);
        Ok(Outcome::None)
    }
    fn undo(&mut self, document: &mut Document) -> Result<(), CommandError> {
        for (name, dataset) in applied(&mut self.deleted)? {
            document.set_data(&name, dataset);
        }
        Ok(())
    }
    fn descr(&self) -> Cow<'_, str> {
        "delete datasets".into()
    }
}

fn check_all_exist(document: &Document, names: &[String]) -> Result<(), CommandError> {
    for name in names {
        document.dataset(name)?;
    }
    Ok(())
}

/// Add a tag to datasets. Only those not already tagged are untagged again by undo.
#[derive(Debug)]
pub struct DataTag {
    tag: String,
    names: Vec<String>,
    changed: Option<Vec<String>>,
}
impl DataTag {
    #[must_use]
    pub fn new(tag: impl Into<String>, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            tag: tag.into(),
            names: names.into_iter().map(Into::into).collect(),
            changed: None,
        }
    }
}
impl Operation for DataTag {
    fn apply(&mut self, document: &mut Document) -> Result<Outcome, CommandError> {
        not_applied(&self.changed)?;
        check_all_exist(document, &self.names)?;
        let mut changed = Vec::new();
        for name in &self.names {
            if document.dataset_mut(name)?.tags.insert(self.tag.clone()) {
                document.modified_data(name);
                changed.push(name.clone());
            }
        }
        self.changed = Some(changed);
        Ok(Outcome::None)
    }
    fn undo(&mut self, document: &mut Document) -> Result<(), CommandError> {
        for name in applied(&mut self.changed)? {
            document.dataset_mut(&name)?.tags.remove(&self.tag);
            document.modified_data(&name);
        }
        Ok(())
    }
    fn descr(&self) -> Cow<'_, str> {
        "tag datasets".into()
    }
}

/// Remove a tag from datasets. Only those that carried it are tagged again by undo.
#[derive(Debug)]
pub struct DataUntag {
    tag: String,
    names: Vec<String>,
    changed: Option<Vec<String>>,
}
impl DataUntag {
    #[must_use]
    pub fn new(tag: impl Into<String>, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            tag: tag.into(),
            names: names.into_iter().map(Into::into).collect(),
            changed: None,
        }
    }
}
impl Operation for DataUntag {
    fn apply(&mut self, document: &mut Document) -> Result<Outcome, CommandError> {
        not_applied(&self.changed)?;
        check_all_exist(document, &self.names)?;
        let mut changed = Vec::new();
        for name in &self.names {
            if document.dataset_mut(name)?.tags.remove(&self.tag) {
                document.modified_data(name);
                changed.push(name.clone());
            }
        }
        self.changed = Some(changed);
        Ok(Outcome::None)
    }
    fn undo(&mut self, document: &mut Document) -> Result<(), CommandError> {
        for name in applied(&mut self.changed)? {
            document.dataset_mut(&name)?.tags.insert(self.tag.clone());
            document.modified_data(&name);
        }
        Ok(())
    }
    fn descr(&self) -> Cow<'_, str> {
        "untag datasets".into()
    }
}
