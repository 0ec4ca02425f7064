//! Unified error type for wabridge.

use wabridge_credentials::CredentialError;
use wabridge_lifecycle::LifecycleError;
use wabridge_protocol::ProtocolError;
use wabridge_session::SessionError;
use wabridge_transport::TransportError;

/// Top-level error that wraps every crate-specific error.
///
/// `?` converts sub-crate errors through the generated `From` impls.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Observer socket failure (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Credential persistence failed.
    #[error(transparent)]
    Credentials(#[from] CredentialError),

    /// The session library reported an error.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The lifecycle manager is gone or could not start a session.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}
