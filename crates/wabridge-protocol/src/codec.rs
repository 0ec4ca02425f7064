//! Codec trait and the JSON implementation used on the observer socket.
//!
//! The bridge never hard-codes `serde_json` calls in its handlers; it goes
//! through a [`Codec`] so tests and alternative dashboards can swap the
//! encoding without touching connection handling.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to bytes and decodes bytes back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// observer task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the value cannot be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the bytes are malformed or do
    /// not match `T`.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`.
///
/// ```rust
/// use wabridge_protocol::{Codec, ConnectionStatus, JsonCodec, LifecycleEvent, ServerFrame};
///
/// let codec = JsonCodec;
/// let frame = ServerFrame::from(LifecycleEvent::connection(ConnectionStatus::Connected));
///
/// let bytes = codec.encode(&frame).unwrap();
/// let decoded: ServerFrame = codec.decode(&bytes).unwrap();
/// assert_eq!(frame, decoded);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ObserverCommand;

    #[test]
    fn test_decode_command_from_text_frame_bytes() {
        let codec = JsonCodec;

        let cmd: ObserverCommand = codec.decode(br#"{"event":"get-groups"}"#).unwrap();

        assert_eq!(cmd, ObserverCommand::GetGroups);
    }

    #[test]
    fn test_decode_garbage_returns_decode_error() {
        let codec = JsonCodec;

        let result: Result<ObserverCommand, _> = codec.decode(b"not json");

        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
