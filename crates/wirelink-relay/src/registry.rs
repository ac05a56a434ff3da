//! Session pairing state machine and registry.
//!
//! A session joins at most one console and one remote connection under a
//! 5-digit code. The registry is the sole owner of the code-to-session
//! mapping and of the process-wide counters; every mutation happens inside
//! one mutex, which serializes event dispatch the same way the surrounding
//! event loop does.

use std::collections::HashMap;
use std::sync::Mutex;

use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::protocol::{
    self, MSG_REMOTE_CONNECTED, MSG_REMOTE_DISCONNECTED, Notice, PeerStatus, PromptId,
    RemoteGreeting, SessionCode,
};

/// Maximum concurrently active sessions unless overridden.
pub const DEFAULT_SESSION_LIMIT: usize = 250;

const CODE_MIN: SessionCode = 10_000;
const CODE_MAX: SessionCode = 99_999;

/// Opaque send capability of one connection.
///
/// Sessions hold these per role; a send to a connection that has since gone
/// away is silently dropped, and the disconnect event cleans the slot up.
pub type PeerSender = mpsc::UnboundedSender<serde_json::Value>;

/// Which side of a session a connection plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The operator endpoint issuing commands.
    Console,
    /// The untrusted runtime executing them.
    Remote,
}

impl Role {
    /// The opposite role.
    #[must_use]
    pub const fn peer(self) -> Self {
        match self {
            Self::Console => Self::Remote,
            Self::Remote => Self::Console,
        }
    }
}

/// Pairing errors, each answered to the requesting connection as a
/// structured payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Active session count is at the limit.
    #[error("Session limit met. Please try again later.")]
    CapacityExceeded,
    /// No active session matches the code.
    #[error("Session invalid or expired.")]
    SessionNotFound,
    /// The session already has a console attached.
    #[error("Another console is already connected to this session.")]
    ConsoleOccupied,
}

/// Result of a relay attempt against an existing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The payload reached the peer connection.
    Delivered,
    /// The target role is currently empty; nothing was queued.
    NoPeer,
}

/// Process-wide session counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCounts {
    /// Sessions created since startup; never decremented.
    pub total: u64,
    /// Currently active sessions.
    pub active: usize,
}

#[derive(Default)]
struct Session {
    console: Option<PeerSender>,
    remote: Option<PeerSender>,
}

impl Session {
    fn slot_mut(&mut self, role: Role) -> &mut Option<PeerSender> {
        match role {
            Role::Console => &mut self.console,
            Role::Remote => &mut self.remote,
        }
    }

    fn peer_of(&self, role: Role) -> Option<&PeerSender> {
        match role.peer() {
            Role::Console => self.console.as_ref(),
            Role::Remote => self.remote.as_ref(),
        }
    }

    fn is_empty(&self) -> bool {
        self.console.is_none() && self.remote.is_none()
    }
}

struct Inner {
    sessions: HashMap<SessionCode, Session>,
    total: u64,
}

/// Owner of all pairing state. Inject one instance into the router; nothing
/// here is ambient or global.
pub struct SessionRegistry {
    limit: usize,
    inner: Mutex<Inner>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    /// Create a registry with the default session limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_SESSION_LIMIT)
    }

    /// Create a registry with a custom session limit.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            inner: Mutex::new(Inner {
                sessions: HashMap::new(),
                total: 0,
            }),
        }
    }

    /// Snapshot of the lifetime and active counters.
    #[must_use]
    pub fn counts(&self) -> SessionCounts {
        let inner = self.inner.lock().unwrap();
        SessionCounts {
            total: inner.total,
            active: inner.sessions.len(),
        }
    }

    /// Whether a session is currently active under `code`.
    #[must_use]
    pub fn is_active(&self, code: SessionCode) -> bool {
        self.inner.lock().unwrap().sessions.contains_key(&code)
    }

    /// Attach a remote connection.
    ///
    /// A known `requested` code rejoins that session, replacing any earlier
    /// remote sender; an unknown or absent code creates a fresh session.
    /// Acks the remote with its code and notifies an attached console that
    /// the peer connected.
    ///
    /// # Errors
    /// [`RegistryError::CapacityExceeded`] when a fresh session is needed
    /// but the active count is at the limit.
    pub fn attach_remote(
        &self,
        requested: Option<SessionCode>,
        sender: &PeerSender,
    ) -> Result<SessionCode, RegistryError> {
        let mut inner = self.inner.lock().unwrap();

        let code = match requested {
            Some(code) if inner.sessions.contains_key(&code) => code,
            _ => self.create_locked(&mut inner)?,
        };

        if let Some(session) = inner.sessions.get_mut(&code) {
            let paired = session.console.is_some();
            session.remote = Some(sender.clone());

            notify(
                sender,
                &RemoteGreeting {
                    session_id: code,
                    message: protocol::session_status(code, paired),
                },
            );
            if let Some(console) = &session.console {
                notify(
                    console,
                    &PeerStatus {
                        id: None,
                        connected: true,
                        message: MSG_REMOTE_CONNECTED.to_owned(),
                    },
                );
            }
            tracing::debug!(code, rejoined = paired, "remote attached");
        }

        Ok(code)
    }

    /// Attach a console connection to an existing session.
    ///
    /// Acks the console with the peer status (attributed to `prompt_id`)
    /// and sends the remote an updated status line.
    ///
    /// # Errors
    /// [`RegistryError::SessionNotFound`] for unknown codes,
    /// [`RegistryError::ConsoleOccupied`] when a console is already
    /// attached; the original console stays attached in that case.
    pub fn attach_console(
        &self,
        code: SessionCode,
        prompt_id: Option<PromptId>,
        sender: &PeerSender,
    ) -> Result<(), RegistryError> {
        let mut inner = self.inner.lock().unwrap();
        let session = inner
            .sessions
            .get_mut(&code)
            .ok_or(RegistryError::SessionNotFound)?;

        if session.console.is_some() {
            return Err(RegistryError::ConsoleOccupied);
        }
        session.console = Some(sender.clone());

        notify(
            sender,
            &PeerStatus {
                id: prompt_id,
                connected: session.remote.is_some(),
                message: MSG_REMOTE_CONNECTED.to_owned(),
            },
        );
        if let Some(remote) = &session.remote {
            notify(
                remote,
                &Notice {
                    id: None,
                    message: protocol::session_status(code, true),
                },
            );
        }
        tracing::debug!(code, "console attached");
        Ok(())
    }

    /// Relay an opaque payload from `from` to the session's other role.
    ///
    /// # Errors
    /// [`RegistryError::SessionNotFound`] when the session has vanished.
    pub fn relay(
        &self,
        code: SessionCode,
        from: Role,
        payload: serde_json::Value,
    ) -> Result<RelayOutcome, RegistryError> {
        let inner = self.inner.lock().unwrap();
        let session = inner
            .sessions
            .get(&code)
            .ok_or(RegistryError::SessionNotFound)?;

        match session.peer_of(from) {
            Some(peer) => {
                let _ = peer.send(payload);
                Ok(RelayOutcome::Delivered)
            }
            None => Ok(RelayOutcome::NoPeer),
        }
    }

    /// React to a connection's disconnect.
    ///
    /// Clears the role slot only if it still holds this sender - a rejoined
    /// peer may have replaced it already. Notifies the surviving peer, and
    /// terminates the session once both slots are empty, making the code
    /// reusable.
    pub fn detach(&self, code: SessionCode, role: Role, sender: &PeerSender) {
        let mut inner = self.inner.lock().unwrap();
        let Some(session) = inner.sessions.get_mut(&code) else {
            return;
        };

        let slot = session.slot_mut(role);
        match slot {
            Some(current) if current.same_channel(sender) => *slot = None,
            _ => return,
        }

        match role {
            Role::Console => {
                if let Some(remote) = &session.remote {
                    notify(
                        remote,
                        &Notice {
                            id: None,
                            message: protocol::session_status(code, false),
                        },
                    );
                }
            }
            Role::Remote => {
                if let Some(console) = &session.console {
                    notify(
                        console,
                        &Notice {
                            id: None,
                            message: MSG_REMOTE_DISCONNECTED.to_owned(),
                        },
                    );
                }
            }
        }

        if session.is_empty() {
            inner.sessions.remove(&code);
            tracing::info!(code, "session terminated");
        }
    }

    /// Allocate a fresh session under a code unique among active ones.
    fn create_locked(&self, inner: &mut Inner) -> Result<SessionCode, RegistryError> {
        if inner.sessions.len() >= self.limit {
            return Err(RegistryError::CapacityExceeded);
        }

        let mut rng = rand::rng();
        let code = loop {
            let candidate = rng.random_range(CODE_MIN..=CODE_MAX);
            if !inner.sessions.contains_key(&candidate) {
                break candidate;
            }
        };

        inner.sessions.insert(code, Session::default());
        inner.total += 1;
        tracing::info!(code, active = inner.sessions.len(), "session created");
        Ok(code)
    }
}

/// Fire-and-forget send of a protocol message to one connection.
fn notify<T: Serialize>(sender: &PeerSender, msg: &T) {
    let _ = sender.send(protocol::to_wire(msg));
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;

    fn conn() -> (PeerSender, UnboundedReceiver<serde_json::Value>) {
        mpsc::unbounded_channel()
    }

    fn drain(rx: &mut UnboundedReceiver<serde_json::Value>) -> Vec<serde_json::Value> {
        let mut out = Vec::new();
        while let Ok(v) = rx.try_recv() {
            out.push(v);
        }
        out
    }

    #[test]
    fn capacity_is_enforced_and_counts_track_creation() {
        let registry = SessionRegistry::with_limit(2);
        let (tx, _rx) = conn();

        registry.attach_remote(None, &tx).unwrap();
        registry.attach_remote(None, &tx).unwrap();
        assert_eq!(registry.counts().active, 2);

        let err = registry.attach_remote(None, &tx).unwrap_err();
        assert_eq!(err, RegistryError::CapacityExceeded);
        let counts = registry.counts();
        assert_eq!(counts.active, 2);
        assert_eq!(counts.total, 2);
    }

    #[test]
    fn codes_are_unique_among_active_sessions() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = conn();

        let codes: Vec<_> = (0..50)
            .map(|_| registry.attach_remote(None, &tx).unwrap())
            .collect();
        let mut unique = codes.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), codes.len());
        assert!(codes.iter().all(|c| (10_000..=99_999).contains(c)));
    }

    #[test]
    fn remote_attach_acks_with_code_and_status() {
        let registry = SessionRegistry::new();
        let (tx, mut rx) = conn();

        let code = registry.attach_remote(None, &tx).unwrap();
        let acks = drain(&mut rx);
        assert_eq!(
            acks,
            vec![json!({
                "sessionId": code,
                "message": format!("Wirelink Session Id: {code}")
            })]
        );
    }

    #[test]
    fn console_attach_to_unknown_code_fails_without_side_effects() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = conn();

        let err = registry.attach_console(11111, Some(0), &tx).unwrap_err();
        assert_eq!(err, RegistryError::SessionNotFound);
        assert_eq!(registry.counts().active, 0);
    }

    #[test]
    fn pairing_notifies_both_sides() {
        let registry = SessionRegistry::new();
        let (remote_tx, mut remote_rx) = conn();
        let (console_tx, mut console_rx) = conn();

        let code = registry.attach_remote(None, &remote_tx).unwrap();
        drain(&mut remote_rx);

        registry.attach_console(code, Some(0), &console_tx).unwrap();
        assert_eq!(
            drain(&mut console_rx),
            vec![json!({ "id": 0, "connected": true, "message": "Remote connected." })]
        );
        assert_eq!(
            drain(&mut remote_rx),
            vec![json!({ "message": format!("Wirelink Session Id: {code} [Connected]") })]
        );
    }

    #[test]
    fn second_console_is_refused_and_first_stays_attached() {
        let registry = SessionRegistry::new();
        let (remote_tx, _remote_rx) = conn();
        let (first_tx, mut first_rx) = conn();
        let (second_tx, _second_rx) = conn();

        let code = registry.attach_remote(None, &remote_tx).unwrap();
        registry.attach_console(code, Some(0), &first_tx).unwrap();
        drain(&mut first_rx);

        let err = registry.attach_console(code, Some(0), &second_tx).unwrap_err();
        assert_eq!(err, RegistryError::ConsoleOccupied);

        // The original console still receives relayed traffic.
        let payload = json!({ "id": 1, "response": 42 });
        let outcome = registry.relay(code, Role::Remote, payload.clone()).unwrap();
        assert_eq!(outcome, RelayOutcome::Delivered);
        assert_eq!(drain(&mut first_rx), vec![payload]);
    }

    #[test]
    fn relay_without_peer_reports_no_peer_and_delivers_nothing() {
        let registry = SessionRegistry::new();
        let (remote_tx, mut remote_rx) = conn();

        let code = registry.attach_remote(None, &remote_tx).unwrap();
        drain(&mut remote_rx);

        let outcome = registry
            .relay(code, Role::Remote, json!({ "response": 1 }))
            .unwrap();
        assert_eq!(outcome, RelayOutcome::NoPeer);
        assert!(drain(&mut remote_rx).is_empty());
    }

    #[test]
    fn disconnect_sequencing_terminates_only_when_both_sides_left() {
        let registry = SessionRegistry::with_limit(1);
        let (remote_tx, mut remote_rx) = conn();
        let (console_tx, mut console_rx) = conn();

        let code = registry.attach_remote(None, &remote_tx).unwrap();
        registry.attach_console(code, Some(0), &console_tx).unwrap();
        drain(&mut remote_rx);
        drain(&mut console_rx);

        registry.detach(code, Role::Remote, &remote_tx);
        assert!(registry.is_active(code));
        assert_eq!(
            drain(&mut console_rx),
            vec![json!({ "message": "Remote disconnected." })]
        );

        registry.detach(code, Role::Console, &console_tx);
        assert!(!registry.is_active(code));
        assert_eq!(registry.counts().active, 0);

        // Capacity freed: a new session can be created at limit 1 again.
        registry.attach_remote(None, &remote_tx).unwrap();
        assert_eq!(registry.counts().total, 2);
    }

    #[test]
    fn console_departure_downgrades_remote_status_line() {
        let registry = SessionRegistry::new();
        let (remote_tx, mut remote_rx) = conn();
        let (console_tx, _console_rx) = conn();

        let code = registry.attach_remote(None, &remote_tx).unwrap();
        registry.attach_console(code, Some(0), &console_tx).unwrap();
        drain(&mut remote_rx);

        registry.detach(code, Role::Console, &console_tx);
        assert_eq!(
            drain(&mut remote_rx),
            vec![json!({ "message": format!("Wirelink Session Id: {code}") })]
        );
        assert!(registry.is_active(code));
    }

    #[test]
    fn stale_remote_disconnect_does_not_clobber_a_rejoined_remote() {
        let registry = SessionRegistry::new();
        let (old_tx, _old_rx) = conn();
        let (new_tx, mut new_rx) = conn();
        let (console_tx, _console_rx) = conn();

        let code = registry.attach_remote(None, &old_tx).unwrap();
        registry.attach_console(code, Some(0), &console_tx).unwrap();
        registry.attach_remote(Some(code), &new_tx).unwrap();
        drain(&mut new_rx);

        // The replaced connection's disconnect arrives late.
        registry.detach(code, Role::Remote, &old_tx);
        assert!(registry.is_active(code));

        let payload = json!({ "id": 1, "command": "x" });
        registry.relay(code, Role::Console, payload.clone()).unwrap();
        assert_eq!(drain(&mut new_rx), vec![payload]);
    }

    #[test]
    fn rejoin_by_remembered_code_reuses_the_session() {
        let registry = SessionRegistry::new();
        let (tx, mut rx) = conn();

        let code = registry.attach_remote(None, &tx).unwrap();
        drain(&mut rx);
        let rejoined = registry.attach_remote(Some(code), &tx).unwrap();
        assert_eq!(rejoined, code);
        assert_eq!(registry.counts().total, 1);
    }
}
