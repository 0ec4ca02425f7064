//! What to do when a session closes.
//!
//! Every close goes through [`CloseAction::classify`] exactly once, and the
//! result decides both the status observers see and whether a new session
//! is started. There is no second path that can start a session from the
//! same close.

use wabridge_protocol::ConnectionStatus;
use wabridge_session::DisconnectError;

/// The single decision taken for one close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseAction {
    /// The stream dropped but the pairing is still valid. Start again with
    /// the same credentials, immediately and without a retry limit.
    Retry,

    /// The device was logged out. Wipe the credentials and start again so
    /// a new pairing code is issued.
    WipeAndRepair,

    /// Anything else. Stay disconnected until an operator reconnects.
    Terminal,
}

impl CloseAction {
    /// Classifies a close. `None` (no error attached) is terminal.
    ///
    /// A logged-out code wins over the transient signature: the old
    /// credentials are dead, so retrying with them cannot succeed.
    pub fn classify(error: Option<&DisconnectError>) -> Self {
        match error {
            Some(e) if e.is_logged_out() => Self::WipeAndRepair,
            Some(e) if e.is_transient() => Self::Retry,
            _ => Self::Terminal,
        }
    }

    /// The status announced for this close.
    pub fn status(self) -> ConnectionStatus {
        match self {
            Self::Retry => ConnectionStatus::Reconnecting,
            Self::WipeAndRepair | Self::Terminal => ConnectionStatus::Disconnected,
        }
    }

    /// Returns `true` if a new session follows this close.
    pub fn restarts(self) -> bool {
        !matches!(self, Self::Terminal)
    }
}

impl std::fmt::Display for CloseAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Retry => write!(f, "Retry"),
            Self::WipeAndRepair => write!(f, "WipeAndRepair"),
            Self::Terminal => write!(f, "Terminal"),
        }
    }
}
