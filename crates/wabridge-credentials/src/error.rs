//! Error types for credential persistence.

use std::path::PathBuf;

/// Errors that can occur while reading, writing, or wiping credentials.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// A filesystem operation failed.
    #[error("credential i/o failed at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A credential file exists but does not parse. The directory must be
    /// wiped and paired again.
    #[error("corrupt credential file {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A value could not be serialized.
    #[error("credential encode failed: {0}")]
    Encode(#[source] serde_json::Error),
}

impl CredentialError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
