//! Prompt/command correlation and stub expansion.
//!
//! The console keeps command text purely client-side; the relay server has
//! no notion of "expand", only "run another command". Expanding a stub
//! therefore re-derives a command from the prompt that produced it and
//! submits the result as a brand-new prompt with a fresh id.

use wirelink_codec::{EncodedValue, expand_command};
use wirelink_relay::protocol::{ConsoleInbound, PromptId};

use crate::render::render;

/// One submitted prompt and, eventually, its output.
#[derive(Debug, Clone)]
pub struct PromptEntry {
    /// The submitted command text.
    pub command: String,
    /// The encoded result, once received.
    pub output: Option<EncodedValue>,
}

/// What an applied server message means for the display.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleEvent {
    /// A command result arrived for a prompt.
    Result {
        /// The prompt it correlates with.
        id: PromptId,
        /// Rendered output text.
        rendered: String,
    },
    /// A status notice, not tied to the result of any command.
    Status {
        /// The notice text.
        message: String,
    },
    /// An attach attempt was refused.
    ConnectFailed {
        /// Why the attach was refused.
        message: String,
    },
}

/// Ordered log of submitted prompts; a prompt's id is its position.
#[derive(Debug, Default)]
pub struct PromptLog {
    entries: Vec<PromptEntry>,
}

impl PromptLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of prompts submitted so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no prompt has been submitted yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a submitted command and return its correlation id.
    pub fn submit(&mut self, command: impl Into<String>) -> PromptId {
        let id = self.entries.len() as PromptId;
        self.entries.push(PromptEntry {
            command: command.into(),
            output: None,
        });
        id
    }

    /// Look up a prompt by id.
    #[must_use]
    pub fn entry(&self, id: PromptId) -> Option<&PromptEntry> {
        self.entries.get(usize::try_from(id).ok()?)
    }

    /// Apply a server message: results are stored against their prompt and
    /// rendered; notices and errors pass through for display.
    pub fn apply(&mut self, msg: ConsoleInbound) -> Option<ConsoleEvent> {
        if let Some(response) = msg.response {
            let id = msg.id?;
            let rendered = render(&response);
            let index = usize::try_from(id).ok()?;
            self.entries.get_mut(index)?.output = Some(response);
            return Some(ConsoleEvent::Result { id, rendered });
        }
        let message = msg.message?;
        if msg.connect_error == Some(true) {
            return Some(ConsoleEvent::ConnectFailed { message });
        }
        Some(ConsoleEvent::Status { message })
    }

    /// Derive and submit the drill-down command for `property` of the value
    /// shown at prompt `id`. Returns the new prompt's id and command text,
    /// or `None` if `id` is unknown.
    pub fn expand(&mut self, id: PromptId, property: &str) -> Option<(PromptId, String)> {
        let command = expand_command(&self.entry(id)?.command, property);
        let new_id = self.submit(command.clone());
        Some((new_id, command))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn inbound(value: serde_json::Value) -> ConsoleInbound {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn ids_are_positions() {
        let mut log = PromptLog::new();
        assert_eq!(log.submit("a"), 0);
        assert_eq!(log.submit("b"), 1);
        assert_eq!(log.entry(1).unwrap().command, "b");
    }

    #[test]
    fn results_correlate_by_id() {
        let mut log = PromptLog::new();
        let id = log.submit("document");

        let event = log.apply(inbound(json!({ "id": id, "response": 42 }))).unwrap();
        assert_eq!(
            event,
            ConsoleEvent::Result {
                id,
                rendered: "42".to_owned()
            }
        );
        assert!(log.entry(id).unwrap().output.is_some());
    }

    #[test]
    fn notices_and_connect_errors_pass_through() {
        let mut log = PromptLog::new();

        let event = log
            .apply(inbound(json!({ "message": "Remote disconnected." })))
            .unwrap();
        assert_eq!(
            event,
            ConsoleEvent::Status {
                message: "Remote disconnected.".to_owned()
            }
        );

        let event = log
            .apply(inbound(json!({
                "id": 0,
                "connectError": true,
                "message": "Session invalid or expired."
            })))
            .unwrap();
        assert_eq!(
            event,
            ConsoleEvent::ConnectFailed {
                message: "Session invalid or expired.".to_owned()
            }
        );
    }

    #[test]
    fn expansion_submits_a_brand_new_prompt() {
        let mut log = PromptLog::new();
        let id = log.submit("document");

        let (new_id, command) = log.expand(id, "foo").unwrap();
        assert_eq!(command, r#"document["foo"]"#);
        assert_ne!(new_id, id);
        assert_eq!(log.entry(new_id).unwrap().command, command);

        // Expansion chains off the derived prompt.
        let (_, deeper) = log.expand(new_id, "bar").unwrap();
        assert_eq!(deeper, r#"document["foo"]["bar"]"#);
    }

    #[test]
    fn expanding_an_unknown_prompt_is_a_noop() {
        let mut log = PromptLog::new();
        assert!(log.expand(7, "x").is_none());
        assert!(log.is_empty());
    }
}
