pub mod commands;
pub mod expr;
pub mod history;
pub mod id;
pub mod interface;
pub mod plugins;
pub mod script;
pub mod state;
pub mod util;

pub use commands::{Command, CommandError, Operation, Outcome};
pub use id::PlotID;
pub use state::document::Document;
