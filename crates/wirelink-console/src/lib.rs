//! Console-side core for Wirelink: everything the operator UI needs short
//! of actually drawing anything.
//!
//! - `PromptLog` - ordered prompts, result correlation, stub expansion
//! - `CommandHistory` - recall of previously executed commands
//! - `render` - plain-text rendering of encoded values

pub mod history;
pub mod prompts;
pub mod render;

pub use history::CommandHistory;
pub use prompts::{ConsoleEvent, PromptEntry, PromptLog};
pub use render::render;
