//! Wire protocol between consoles, the relay server, and remote agents.
//!
//! Everything the server originates is a typed struct here. Relayed
//! payloads, by contrast, stay raw [`serde_json::Value`]s end to end: the
//! router forwards them verbatim and never inspects their contents beyond
//! the attach discriminators and the `id` echo.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use wirelink_codec::EncodedValue;

/// 5-digit session pairing code.
pub type SessionCode = u32;

/// Console prompt index, used to correlate a command with its result.
pub type PromptId = u64;

/// Notice sent to a sender whose peer is currently absent.
pub const MSG_RECEIVER_NOT_CONNECTED: &str = "Receiver not connected.";

/// Peer-status message when a remote joins.
pub const MSG_REMOTE_CONNECTED: &str = "Remote connected.";

/// Peer-status message when a remote leaves.
pub const MSG_REMOTE_DISCONNECTED: &str = "Remote disconnected.";

/// Status line shown on the remote side; marks pairing when a console is
/// attached.
#[must_use]
pub fn session_status(code: SessionCode, paired: bool) -> String {
    if paired {
        format!("Wirelink Session Id: {code} [Connected]")
    } else {
        format!("Wirelink Session Id: {code}")
    }
}

/// Remote agent's attach request. `connect_remote` is always present on the
/// wire, null when no previous code is remembered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteAttach {
    /// Previously issued code to rejoin, if any.
    pub connect_remote: Option<SessionCode>,
}

/// Console's attach request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleAttach {
    /// The session code to join.
    pub connect_console: SessionCode,
    /// The prompt that initiated the connection.
    pub id: PromptId,
}

/// Attach ack / peer-status update sent to a console.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerStatus {
    /// Prompt to attribute the update to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PromptId>,
    /// Whether the peer is currently attached.
    pub connected: bool,
    /// Human-readable status line.
    pub message: String,
}

/// Structured attach failure, answered to the requesting connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectError {
    /// Prompt to attribute the failure to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PromptId>,
    /// Always true; distinguishes failures from plain notices.
    pub connect_error: bool,
    /// Human-readable reason.
    pub message: String,
}

/// Attach ack sent to a remote agent; carries the confirmed code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteGreeting {
    /// The session code the agent is attached under.
    pub session_id: SessionCode,
    /// Human-readable status line.
    pub message: String,
}

/// Informational notice (peer unavailable, peer status changes).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    /// Prompt to attribute the notice to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PromptId>,
    /// Human-readable text.
    pub message: String,
}

/// Command submitted by a console, relayed to the remote agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    /// Prompt index of the submitting console.
    pub id: PromptId,
    /// Source text to evaluate.
    pub command: String,
}

/// Result produced by the remote agent, relayed back to the console.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    /// Prompt index the result correlates with.
    pub id: PromptId,
    /// The encoded value.
    pub response: EncodedValue,
}

/// Everything a remote agent may receive, as one lenient shape.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteInbound {
    /// Confirmed session code, on attach.
    #[serde(default)]
    pub session_id: Option<SessionCode>,
    /// Prompt index accompanying a command.
    #[serde(default)]
    pub id: Option<PromptId>,
    /// Command source text to evaluate.
    #[serde(default)]
    pub command: Option<String>,
    /// Status text to surface to the host application.
    #[serde(default)]
    pub message: Option<String>,
    /// Present when an attach was refused.
    #[serde(default)]
    pub connect_error: Option<bool>,
}

/// Everything a console may receive, as one lenient shape.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleInbound {
    /// Prompt index the message correlates with.
    #[serde(default)]
    pub id: Option<PromptId>,
    /// Encoded command result.
    #[serde(default)]
    pub response: Option<EncodedValue>,
    /// Status or notice text.
    #[serde(default)]
    pub message: Option<String>,
    /// Peer-status flag.
    #[serde(default)]
    pub connected: Option<bool>,
    /// Present when an attach was refused.
    #[serde(default)]
    pub connect_error: Option<bool>,
}

/// Serialize a protocol message to its wire JSON.
///
/// Serialization of these shapes cannot fail in practice; if it ever does,
/// the error is logged and a null payload sent, which receivers ignore.
#[must_use]
pub fn to_wire<T: Serialize>(msg: &T) -> Json {
    serde_json::to_value(msg).unwrap_or_else(|e| {
        tracing::error!("failed to serialize protocol message: {e}");
        Json::Null
    })
}
