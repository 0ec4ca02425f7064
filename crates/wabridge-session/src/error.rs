//! Error types for the session boundary.

/// Errors reported by a [`SessionConnector`](crate::SessionConnector) or a
/// live [`SessionConnection`](crate::SessionConnection).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A new session could not be established at all. Closes that happen
    /// after a session exists arrive as events instead.
    #[error("session connect failed: {0}")]
    Connect(String),

    /// The operation needs an open session and this one is not open.
    #[error("session is not open")]
    NotOpen,

    /// A request on an open session failed (network error, server
    /// rejection, timeout inside the session library).
    #[error("session request failed: {0}")]
    Request(String),
}
