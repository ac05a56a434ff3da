//! Remote agent client for Wirelink.
//!
//! An agent connects to the relay server, joins (or rejoins) a session, and
//! serves commands: each relayed command is handed to a [`CommandHandler`],
//! and the resulting runtime value goes back through the bounded encoder.

pub mod agent;
pub mod handler;
pub mod store;

pub use agent::{Agent, AgentError};
pub use handler::{CommandHandler, ScopeHandler};
pub use store::SessionCodeStore;
