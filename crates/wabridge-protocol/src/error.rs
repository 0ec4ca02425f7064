//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// The bytes were not a valid frame: malformed JSON, an unknown
    /// `event` name, or a missing field.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The frame decoded but is not acceptable here.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
