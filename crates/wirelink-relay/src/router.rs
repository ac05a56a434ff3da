//! Dispatch of incoming connection messages.
//!
//! A connection starts unbound. Its first recognized message either
//! establishes a pairing (`connectRemote` / `connectConsole`) or is ignored;
//! every message after binding is an opaque relay payload forwarded verbatim
//! to the session's peer. Failures are answered to the requester as
//! structured payloads, never by dropping the connection.

use std::sync::Arc;

use serde_json::Value as Json;

use crate::protocol::{
    ConnectError, MSG_RECEIVER_NOT_CONNECTED, Notice, PromptId, SessionCode, to_wire,
};
use crate::registry::{PeerSender, RegistryError, RelayOutcome, Role, SessionRegistry};

/// Per-connection dispatch state: the opaque send capability plus the
/// session binding once established.
pub struct ConnectionCtx {
    sender: PeerSender,
    binding: Option<(SessionCode, Role)>,
}

impl ConnectionCtx {
    /// Wrap a connection's send capability.
    #[must_use]
    pub fn new(sender: PeerSender) -> Self {
        Self {
            sender,
            binding: None,
        }
    }

    /// The session and role this connection is bound to, if any.
    #[must_use]
    pub fn binding(&self) -> Option<(SessionCode, Role)> {
        self.binding
    }
}

/// Server-side message dispatcher over one shared registry.
pub struct RelayRouter {
    registry: Arc<SessionRegistry>,
}

impl RelayRouter {
    /// Create a router over a registry.
    #[must_use]
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// The registry this router dispatches against.
    #[must_use]
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Handle one incoming message from a connection.
    pub fn handle_message(&self, conn: &mut ConnectionCtx, msg: Json) {
        match conn.binding {
            Some((code, role)) => self.relay(conn, code, role, msg),
            None => self.attach(conn, msg),
        }
    }

    /// Handle a connection's disconnect; drives the termination transition.
    pub fn handle_disconnect(&self, conn: &mut ConnectionCtx) {
        if let Some((code, role)) = conn.binding.take() {
            self.registry.detach(code, role, &conn.sender);
        }
    }

    fn attach(&self, conn: &mut ConnectionCtx, msg: Json) {
        if let Some(requested) = remote_attach_code(&msg) {
            match self.registry.attach_remote(requested, &conn.sender) {
                Ok(code) => conn.binding = Some((code, Role::Remote)),
                Err(e) => reply_error(&conn.sender, None, &e),
            }
        } else if msg.get("connectConsole").is_some() {
            let id = prompt_id(&msg);
            let attached = parse_code(msg.get("connectConsole"))
                .ok_or(RegistryError::SessionNotFound)
                .and_then(|code| {
                    self.registry
                        .attach_console(code, id, &conn.sender)
                        .map(|()| code)
                });
            match attached {
                Ok(code) => conn.binding = Some((code, Role::Console)),
                Err(e) => reply_error(&conn.sender, id, &e),
            }
        } else {
            tracing::debug!("ignoring message from unbound connection");
        }
    }

    fn relay(&self, conn: &ConnectionCtx, code: SessionCode, role: Role, msg: Json) {
        let id = prompt_id(&msg);
        match self.registry.relay(code, role, msg) {
            Ok(RelayOutcome::Delivered) => {}
            Ok(RelayOutcome::NoPeer) => {
                let _ = conn.sender.send(to_wire(&Notice {
                    id,
                    message: MSG_RECEIVER_NOT_CONNECTED.to_owned(),
                }));
            }
            Err(e) => reply_error(&conn.sender, id, &e),
        }
    }
}

/// `Some(requested)` when the message carries the remote-attach
/// discriminator; the inner option distinguishes a remembered code from an
/// explicit null (or unusable) value.
fn remote_attach_code(msg: &Json) -> Option<Option<SessionCode>> {
    let field = msg.get("connectRemote")?;
    Some(parse_code(Some(field)))
}

fn parse_code(field: Option<&Json>) -> Option<SessionCode> {
    field?.as_u64()?.try_into().ok()
}

fn prompt_id(msg: &Json) -> Option<PromptId> {
    msg.get("id")?.as_u64()
}

fn reply_error(sender: &PeerSender, id: Option<PromptId>, error: &RegistryError) {
    tracing::debug!(%error, "attach or relay refused");
    let _ = sender.send(to_wire(&ConnectError {
        id,
        connect_error: true,
        message: error.to_string(),
    }));
}
