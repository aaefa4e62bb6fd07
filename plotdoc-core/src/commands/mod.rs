//! # Commands
//!
//! Commands are the way the document is modified. Every change to the widget tree, settings,
//! datasets or customs is a command that knows how to apply itself and how to put things back.
//! Hand commands to [`Document::apply`](crate::Document::apply) so they are recorded for undo.
//!
//! Commands store paths and names, never references into the document, and re-resolve them
//! every time they are applied or undone. What they need to undo is captured while applying.

pub mod batch;
pub mod create;
pub mod custom;
pub mod dataset;
pub mod edit;
pub mod plugin;
pub mod setting;
pub mod widget;

use std::borrow::Cow;

use crate::expr::ExprError;
use crate::state::dataset::DatasetError;
use crate::state::setting::SettingError;
use crate::state::tree::TreeError;
use crate::Document;

#[derive(thiserror::Error, Debug)]
pub enum CommandError {
    #[error("no widget at {0:?}")]
    WidgetNotFound(String),
    #[error("no setting at {0:?}")]
    SettingNotFound(String),
    #[error("no dataset named {0:?}")]
    DatasetNotFound(String),
    #[error("a dataset named {0:?} already exists")]
    DatasetExists(String),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("setting {path:?}: {source}")]
    Setting {
        path: String,
        #[source]
        source: SettingError,
    },
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Expression(#[from] ExprError),
    #[error("command has not been applied")]
    NotApplied,
    #[error("command is already applied")]
    AlreadyApplied,
    #[error("plugin {name:?} failed: {source}")]
    Plugin {
        name: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("cannot read {path:?}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: {message}")]
    Script { line: usize, message: String },
    #[error("line {line}: {source}")]
    ScriptLine {
        line: usize,
        #[source]
        source: Box<CommandError>,
    },
    #[error("cannot undo or redo while a batch is open")]
    Batching,
}

/// What applying a command produced, for callers that want to follow up on it.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Outcome {
    #[default]
    None,
    /// Path of a new widget.
    Widget(String),
    /// Name of a new dataset.
    Dataset(String),
    Datasets(Vec<String>),
}

/// A reversible change to a document.
pub trait Operation {
    /// Make the change, capturing whatever is needed to undo it.
    /// On error the document should not be observably changed, unless
    /// [`Self::partially_applied`] says otherwise.
    fn apply(&mut self, document: &mut Document) -> Result<Outcome, CommandError>;
    /// Restore the document to how it was before [`Self::apply`].
    fn undo(&mut self, document: &mut Document) -> Result<(), CommandError>;
    /// Short description for history display.
    fn descr(&self) -> Cow<'_, str>;
    /// Whether a failed apply left some changes in place that `undo` would revert.
    fn partially_applied(&self) -> bool {
        false
    }
}

macro_rules! commands {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        #[derive(Debug)]
        pub enum Command {
            $($variant($ty),)*
        }
        $(
            impl From<$ty> for Command {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
        impl Operation for Command {
            fn apply(&mut self, document: &mut Document) -> Result<Outcome, CommandError> {
                match self {
                    $(Self::$variant(c) => c.apply(document),)*
                }
            }
            fn undo(&mut self, document: &mut Document) -> Result<(), CommandError> {
                match self {
                    $(Self::$variant(c) => c.undo(document),)*
                }
            }
            fn descr(&self) -> Cow<'_, str> {
                match self {
                    $(Self::$variant(c) => c.descr(),)*
                }
            }
            fn partially_applied(&self) -> bool {
                match self {
                    $(Self::$variant(c) => c.partially_applied(),)*
                }
            }
        }
    };
}

commands! {
    SettingSet(setting::SettingSet),
    SettingPropagate(setting::SettingPropagate),
    WidgetRename(widget::WidgetRename),
    WidgetDelete(widget::WidgetDelete),
    WidgetsDelete(widget::WidgetsDelete),
    WidgetMoveUpDown(widget::WidgetMoveUpDown),
    WidgetMove(widget::WidgetMove),
    WidgetAdd(widget::WidgetAdd),
    DatasetSet(dataset::DatasetSet),
    DatasetDelete(dataset::DatasetDelete),
    DatasetRename(dataset::DatasetRename),
    DatasetDuplicate(dataset::DatasetDuplicate),
    DatasetUnlinkFile(dataset::DatasetUnlinkFile),
    DatasetUnlinkRelation(dataset::DatasetUnlinkRelation),
    DatasetCreateRange(create::DatasetCreateRange),
    DatasetCreateParametric(create::DatasetCreateParametric),
    DatasetCreateExpression(create::DatasetCreateExpression),
    Dataset2DCreateExpressionXYZ(create::Dataset2DCreateExpressionXYZ),
    Dataset2DCreateExpression(create::Dataset2DCreateExpression),
    Dataset2DCreateXYFunc(create::Dataset2DCreateXYFunc),
    DatasetUnlinkByFile(dataset::DatasetUnlinkByFile),
    DatasetDeleteByFile(dataset::DatasetDeleteByFile),
    DataTag(dataset::DataTag),
    DataUntag(dataset::DataUntag),
    DatasetAddColumn(edit::DatasetAddColumn),
    DatasetSetVal(edit::DatasetSetVal),
    DatasetSetVal2D(edit::DatasetSetVal2D),
    DatasetDeleteRow(edit::DatasetDeleteRow),
    DatasetInsertRow(edit::DatasetInsertRow),
    SetCustom(custom::SetCustom),
    Multiple(batch::Multiple),
    LoadStyleSheet(batch::LoadStyleSheet),
    LoadCustom(batch::LoadCustom),
    ToolsPlugin(plugin::ApplyToolsPlugin),
    DatasetPlugin(plugin::ApplyDatasetPlugin),
}

/// Take an undo record, or fail if there is none because the command was never applied.
pub(crate) fn applied<T>(record: &mut Option<T>) -> Result<T, CommandError> {
    record.take().ok_or(CommandError::NotApplied)
}

/// Fail if a previous apply has not been undone.
pub(crate) fn not_applied<T>(record: &Option<T>) -> Result<(), CommandError> {
    if record.is_some() {
        Err(CommandError::AlreadyApplied)
    } else {
        Ok(())
    }
}
