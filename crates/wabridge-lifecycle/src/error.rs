//! Error types for the lifecycle layer.

use wabridge_credentials::CredentialError;
use wabridge_session::SessionError;

/// Errors that can occur while starting a session or talking to the
/// lifecycle manager.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// Credentials could not be loaded, so no session was started.
    #[error("credential store error: {0}")]
    Credentials(#[from] CredentialError),

    /// The session library refused to open a session.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// The manager task has stopped (shut down, or every handle dropped).
    #[error("lifecycle manager is unavailable")]
    Unavailable,
}
