//! Error types for local client state.
//!
//! Network errors live in `opshub-api-client`; this module only covers the
//! session file and token handling that never leave the machine.

use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Failed to access session file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Session file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("No per-user config directory available; set OPSHUB_SESSION_FILE")]
    NoConfigDir,
}

impl SessionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        SessionError::Io {
            path: path.into(),
            source,
        }
    }
}
