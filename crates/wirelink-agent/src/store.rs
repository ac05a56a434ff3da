//! Session-code persistence across agent restarts.
//!
//! The agent keeps its confirmed decimal code in a small file and offers it
//! back on reconnect so the operator's session survives an agent restart.

use std::io;
use std::path::{Path, PathBuf};

use wirelink_relay::protocol::SessionCode;

/// File-backed store for the confirmed session code.
#[derive(Debug, Clone)]
pub struct SessionCodeStore {
    path: PathBuf,
}

impl SessionCodeStore {
    /// Store the code at an explicit path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store the code under the user cache directory.
    #[must_use]
    pub fn default_location() -> Self {
        let base = dirs::cache_dir().unwrap_or_else(std::env::temp_dir);
        Self::new(base.join("wirelink").join("session"))
    }

    /// The backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the remembered code, if any. Best-effort: unreadable or
    /// unparseable contents are logged and treated as absent.
    #[must_use]
    pub fn load(&self) -> Option<SessionCode> {
        let contents = std::fs::read_to_string(&self.path).ok()?;
        match contents.trim().parse() {
            Ok(code) => Some(code),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "ignoring stored session code: {e}");
                None
            }
        }
    }

    /// Persist a confirmed code.
    ///
    /// # Errors
    /// Returns the underlying I/O error if the file cannot be written.
    pub fn save(&self, code: SessionCode) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, code.to_string())
    }

    /// Forget the remembered code.
    ///
    /// # Errors
    /// Returns the underlying I/O error, except for the file already being
    /// gone.
    pub fn clear(&self) -> io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}
