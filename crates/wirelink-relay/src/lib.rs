//! Session pairing and message relay for Wirelink.
//!
//! This crate is the server-side core:
//! - `protocol` - wire message shapes shared with consoles and agents
//! - `registry` - `SessionRegistry`, the pairing state machine
//! - `router` - `RelayRouter`, dispatch for attach and relay messages

pub mod protocol;
pub mod registry;
pub mod router;

pub use protocol::{PromptId, SessionCode};
pub use registry::{
    DEFAULT_SESSION_LIMIT, PeerSender, RegistryError, RelayOutcome, Role, SessionCounts,
    SessionRegistry,
};
pub use router::{ConnectionCtx, RelayRouter};
