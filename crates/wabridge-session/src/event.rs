//! Events a live session reports, one variant per kind.
//!
//! The session library pushes these into the receiver returned from
//! [`SessionConnector::connect`](crate::SessionConnector::connect). Each
//! variant carries only the fields that kind of event has, so the
//! lifecycle manager matches on them exhaustively instead of probing
//! optional fields of one loose record.

use std::fmt;

use wabridge_credentials::Credentials;
use wabridge_protocol::UpsertKind;

// ---------------------------------------------------------------------------
// DisconnectReason
// ---------------------------------------------------------------------------

/// Close codes the messaging network uses.
///
/// Only [`DisconnectReason::LoggedOut`] changes what the lifecycle manager
/// does; the rest are named so logs say something better than a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisconnectReason {
    /// The device was unlinked from the phone. Stored credentials are dead.
    LoggedOut,
    /// The server asked for a fresh connection (normal right after pairing).
    RestartRequired,
    ConnectionClosed,
    /// Keepalive or request timeout.
    ConnectionLost,
    /// Another client opened a session with the same credentials.
    ConnectionReplaced,
    MultideviceMismatch,
    Forbidden,
    BadSession,
    UnavailableService,
}

impl DisconnectReason {
    /// The numeric code for this reason.
    pub fn code(self) -> u16 {
        match self {
            Self::LoggedOut => 401,
            Self::Forbidden => 403,
            Self::ConnectionLost => 408,
            Self::MultideviceMismatch => 411,
            Self::ConnectionClosed => 428,
            Self::ConnectionReplaced => 440,
            Self::BadSession => 500,
            Self::UnavailableService => 503,
            Self::RestartRequired => 515,
        }
    }

    /// Maps a numeric code back to a reason, `None` for unknown codes.
    pub fn from_code(code: u16) -> Option<Self> {
        Some(match code {
            401 => Self::LoggedOut,
            403 => Self::Forbidden,
            408 => Self::ConnectionLost,
            411 => Self::MultideviceMismatch,
            428 => Self::ConnectionClosed,
            440 => Self::ConnectionReplaced,
            500 => Self::BadSession,
            503 => Self::UnavailableService,
            515 => Self::RestartRequired,
            _ => return None,
        })
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?} ({})", self.code())
    }
}

// ---------------------------------------------------------------------------
// DisconnectError
// ---------------------------------------------------------------------------

/// Why a session closed. Either part may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisconnectError {
    pub message: Option<String>,
    pub status_code: Option<u16>,
}

impl DisconnectError {
    /// Message text that marks a recoverable stream drop. Pairing is still
    /// valid when this appears.
    pub const TRANSIENT_SIGNATURE: &'static str = "Stream Errored";

    pub fn new(message: impl Into<String>, status_code: Option<u16>) -> Self {
        Self {
            message: Some(message.into()),
            status_code,
        }
    }

    /// A close carrying only a status code.
    pub fn with_code(reason: DisconnectReason) -> Self {
        Self {
            message: None,
            status_code: Some(reason.code()),
        }
    }

    /// The message, or `""` when there is none.
    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or("")
    }

    /// `true` if the message carries the transient stream-error signature.
    pub fn is_transient(&self) -> bool {
        self.message().contains(Self::TRANSIENT_SIGNATURE)
    }

    /// `true` if the remote side logged this device out.
    pub fn is_logged_out(&self) -> bool {
        self.status_code == Some(DisconnectReason::LoggedOut.code())
    }

    /// The named reason for the status code, if known.
    pub fn reason(&self) -> Option<DisconnectReason> {
        self.status_code.and_then(DisconnectReason::from_code)
    }
}

impl fmt::Display for DisconnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.message.as_deref(), self.status_code) {
            (Some(msg), Some(code)) => write!(f, "{msg} (code {code})"),
            (Some(msg), None) => f.write_str(msg),
            (None, Some(code)) => write!(f, "code {code}"),
            (None, None) => f.write_str("no reason given"),
        }
    }
}

// ---------------------------------------------------------------------------
// ConnectionUpdate
// ---------------------------------------------------------------------------

/// Coarse phase of the underlying connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Connecting,
    Open,
    Close,
}

/// A connection-state change.
///
/// Fields are independent: one update may carry a QR code and a phase at
/// once, and the lifecycle manager reacts to each present field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionUpdate {
    pub phase: Option<ConnectionPhase>,
    pub qr: Option<String>,
    /// Only meaningful with [`ConnectionPhase::Close`].
    pub last_disconnect: Option<DisconnectError>,
}

impl ConnectionUpdate {
    /// A new pairing code, no phase change.
    pub fn qr(code: impl Into<String>) -> Self {
        Self {
            qr: Some(code.into()),
            ..Self::default()
        }
    }

    pub fn open() -> Self {
        Self {
            phase: Some(ConnectionPhase::Open),
            ..Self::default()
        }
    }

    pub fn closed(error: Option<DisconnectError>) -> Self {
        Self {
            phase: Some(ConnectionPhase::Close),
            last_disconnect: error,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// SessionEvent
// ---------------------------------------------------------------------------

/// A batch of inbound messages. Contents are passed through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageBatch {
    pub kind: UpsertKind,
    pub messages: Vec<serde_json::Value>,
}

/// Everything a session can report.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Credential material changed and should be persisted.
    CredentialsUpdated(Credentials),
    /// The connection changed state.
    ConnectionUpdate(ConnectionUpdate),
    /// Messages arrived.
    MessagesUpserted(MessageBatch),
}
