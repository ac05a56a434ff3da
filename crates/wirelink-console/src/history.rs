//! Recall of previously executed commands.

/// Command history with shell-style up/down recall.
#[derive(Debug, Default)]
pub struct CommandHistory {
    commands: Vec<String>,
    cursor: Option<usize>,
}

impl CommandHistory {
    /// Create an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All remembered commands, oldest first.
    #[must_use]
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Remember an executed command; consecutive duplicates are skipped.
    pub fn remember(&mut self, command: &str) {
        if self.commands.last().is_none_or(|last| last != command) {
            self.commands.push(command.to_owned());
        }
        self.cursor = None;
    }

    /// Step to the previous (older) command; clamps at the oldest.
    pub fn previous(&mut self) -> Option<&str> {
        if self.commands.is_empty() {
            return None;
        }
        let next = match self.cursor {
            None => self.commands.len() - 1,
            Some(0) => 0,
            Some(i) => i - 1,
        };
        self.cursor = Some(next);
        self.commands.get(next).map(String::as_str)
    }

    /// Step to the next (newer) command; past the newest returns `None`
    /// and leaves recall mode.
    pub fn next(&mut self) -> Option<&str> {
        let i = self.cursor?;
        if i + 1 < self.commands.len() {
            self.cursor = Some(i + 1);
            self.commands.get(i + 1).map(String::as_str)
        } else {
            self.cursor = None;
            None
        }
    }

    /// Leave recall mode (typing resumed).
    pub fn reset(&mut self) {
        self.cursor = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recall_walks_backwards_and_clamps() {
        let mut history = CommandHistory::new();
        history.remember("a");
        history.remember("b");

        assert_eq!(history.previous(), Some("b"));
        assert_eq!(history.previous(), Some("a"));
        assert_eq!(history.previous(), Some("a"));
    }

    #[test]
    fn next_returns_to_the_empty_prompt() {
        let mut history = CommandHistory::new();
        history.remember("a");
        history.remember("b");

        history.previous();
        history.previous();
        assert_eq!(history.next(), Some("b"));
        assert_eq!(history.next(), None);
        // Recall restarts from the newest entry.
        assert_eq!(history.previous(), Some("b"));
    }

    #[test]
    fn consecutive_duplicates_are_skipped() {
        let mut history = CommandHistory::new();
        history.remember("a");
        history.remember("a");
        history.remember("b");
        history.remember("a");
        assert_eq!(history.commands(), ["a", "b", "a"]);
    }

    #[test]
    fn empty_history_recalls_nothing() {
        let mut history = CommandHistory::new();
        assert_eq!(history.previous(), None);
        assert_eq!(history.next(), None);
    }
}
