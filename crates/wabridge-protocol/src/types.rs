//! Wire types shared by the lifecycle manager, the bridge server, and
//! dashboard clients.
//!
//! Everything in this module is what observers actually see. The JSON
//! shape is kept flat (`{"origin": ..., "status": ..., "qr": ...}`) because
//! dashboards were written against that shape, while the Rust side stays a
//! tagged union so consumers match on every event kind exhaustively.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the single outbound event observers subscribe to.
pub const BOT_EVENT: &str = "bot-event";

// ---------------------------------------------------------------------------
// ConnectionStatus
// ---------------------------------------------------------------------------

/// Process-wide status of the messaging session.
///
/// ```text
///            qr            open
///   (unset) ───→ AwaitingPairing ───→ Connected
///      │                                  │ close
///      │           ┌── transient ──→ Reconnecting ──→ (next qr/open)
///      └── close ──┤
///                  └── other ─────→ Disconnected
/// ```
///
/// The string values are the ones dashboards already switch on, so they
/// are fixed by `#[serde(rename)]` rather than derived from the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionStatus {
    /// A QR code is on screen; waiting for the phone to scan it.
    #[serde(rename = "wa-waiting-connection")]
    AwaitingPairing,

    /// The session is open and receiving messages.
    #[serde(rename = "wa-connected")]
    Connected,

    /// A replacement session is being established.
    #[serde(rename = "wa-reconnecting")]
    Reconnecting,

    /// The session closed and nothing will restart it without an
    /// operator command.
    #[serde(rename = "wa-disconnected")]
    Disconnected,
}

impl ConnectionStatus {
    /// Returns the wire string for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AwaitingPairing => "wa-waiting-connection",
            Self::Connected => "wa-connected",
            Self::Reconnecting => "wa-reconnecting",
            Self::Disconnected => "wa-disconnected",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Origin
// ---------------------------------------------------------------------------

/// Which subsystem produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Produced by the lifecycle manager while interpreting session events.
    Whatsapp,
    /// Produced by the bridge server in answer to an observer command.
    Socket,
}

// ---------------------------------------------------------------------------
// Groups and messages
// ---------------------------------------------------------------------------

/// Identifier of a group chat on the messaging network (e.g.
/// `120363041234567890@g.us`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub String);

impl GroupId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of a group listing sent to observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub id: GroupId,
    pub name: String,
    pub participants: usize,
    /// Profile picture URL, or a placeholder when the group has none.
    pub image: String,
}

/// Discriminator of an inbound message batch.
///
/// `Notify` batches are new messages; `Append` batches are history the
/// session library back-filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertKind {
    Notify,
    Append,
}

// ---------------------------------------------------------------------------
// LifecycleEvent
// ---------------------------------------------------------------------------

/// The payload of an event, one variant per kind.
///
/// Serialized untagged so the variant's fields land directly in the event
/// object. Variant order matters for deserialization: serde tries them top
/// to bottom and [`EventKind::Status`] accepts anything, so it comes last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventKind {
    /// A pairing code is available.
    Pairing { status: ConnectionStatus, qr: String },

    /// A batch of inbound messages. Messages only arrive on an open
    /// session, so `status` is always `Connected`.
    Messages {
        status: ConnectionStatus,
        #[serde(rename = "type")]
        kind: UpsertKind,
        messages: Vec<serde_json::Value>,
    },

    /// A group listing requested by an observer.
    Groups {
        status: Option<ConnectionStatus>,
        groups: Vec<GroupSummary>,
    },

    /// A status change, or a status query answer. `None` means no session
    /// has been attempted yet.
    Status { status: Option<ConnectionStatus> },
}

/// A normalized record broadcast to every observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub origin: Origin,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl LifecycleEvent {
    /// A connection-state change produced by the lifecycle manager.
    pub fn connection(status: ConnectionStatus) -> Self {
        Self {
            origin: Origin::Whatsapp,
            kind: EventKind::Status {
                status: Some(status),
            },
        }
    }

    /// A new pairing code. Always carries `AwaitingPairing`.
    pub fn pairing(qr: impl Into<String>) -> Self {
        Self {
            origin: Origin::Whatsapp,
            kind: EventKind::Pairing {
                status: ConnectionStatus::AwaitingPairing,
                qr: qr.into(),
            },
        }
    }

    /// An inbound message batch.
    pub fn messages(kind: UpsertKind, messages: Vec<serde_json::Value>) -> Self {
        Self {
            origin: Origin::Whatsapp,
            kind: EventKind::Messages {
                status: ConnectionStatus::Connected,
                kind,
                messages,
            },
        }
    }

    /// The answer to a `get-status` command.
    pub fn status_reply(status: Option<ConnectionStatus>) -> Self {
        Self {
            origin: Origin::Socket,
            kind: EventKind::Status { status },
        }
    }

    /// The announcement made when an observer asks for a reconnect. Goes
    /// out before the old session has closed.
    pub fn reconnect_requested() -> Self {
        Self {
            origin: Origin::Socket,
            kind: EventKind::Status {
                status: Some(ConnectionStatus::Reconnecting),
            },
        }
    }

    /// The answer to a `get-groups` command.
    pub fn groups_reply(status: Option<ConnectionStatus>, groups: Vec<GroupSummary>) -> Self {
        Self {
            origin: Origin::Socket,
            kind: EventKind::Groups { status, groups },
        }
    }

    /// The status carried by this event, if any.
    pub fn status(&self) -> Option<ConnectionStatus> {
        match &self.kind {
            EventKind::Pairing { status, .. } | EventKind::Messages { status, .. } => {
                Some(*status)
            }
            EventKind::Groups { status, .. } | EventKind::Status { status } => *status,
        }
    }

    /// The pairing code, for [`EventKind::Pairing`] events.
    pub fn qr(&self) -> Option<&str> {
        match &self.kind {
            EventKind::Pairing { qr, .. } => Some(qr),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Observer frames
// ---------------------------------------------------------------------------

/// A command sent by an observer.
///
/// Frames look like `{"event": "get-status"}`. The older event names used
/// by existing dashboards are accepted as aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ObserverCommand {
    /// Broadcast the current status.
    #[serde(alias = "get-whatsapp-status")]
    GetStatus,

    /// Broadcast the current group listing.
    GetGroups,

    /// Tear the session down and pair again.
    #[serde(alias = "reconnect-whatsapp")]
    Reconnect,
}

/// A frame sent from the bridge to an observer.
///
/// Adjacently tagged: `{"event": "bot-event", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerFrame {
    #[serde(rename = "bot-event")]
    BotEvent(LifecycleEvent),
}

impl From<LifecycleEvent> for ServerFrame {
    fn from(event: LifecycleEvent) -> Self {
        Self::BotEvent(event)
    }
}

#[cfg(test)]
mod tests {
    //! These check the JSON shape dashboards depend on, not just that
    //! serde can read back what it wrote.

    use serde_json::json;

    use super::*;

    #[test]
    fn test_connection_status_serializes_to_dashboard_strings() {
        let json = serde_json::to_value(ConnectionStatus::AwaitingPairing).unwrap();
        assert_eq!(json, json!("wa-waiting-connection"));
        assert_eq!(
            serde_json::to_value(ConnectionStatus::Reconnecting).unwrap(),
            json!("wa-reconnecting")
        );
        assert_eq!(ConnectionStatus::Disconnected.to_string(), "wa-disconnected");
    }

    #[test]
    fn test_connection_event_is_flat_object() {
        let event = LifecycleEvent::connection(ConnectionStatus::Connected);

        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json, json!({"origin": "whatsapp", "status": "wa-connected"}));
    }

    #[test]
    fn test_pairing_event_carries_qr_and_awaiting_status() {
        let event = LifecycleEvent::pairing("2@abc,def");

        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(
            json,
            json!({"origin": "whatsapp", "status": "wa-waiting-connection", "qr": "2@abc,def"})
        );
        assert_eq!(event.qr(), Some("2@abc,def"));
    }

    #[test]
    fn test_messages_event_uses_type_discriminator() {
        let event = LifecycleEvent::messages(UpsertKind::Notify, vec![json!({"key": {"id": "1"}})]);

        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], json!("notify"));
        assert_eq!(json["status"], json!("wa-connected"));
        assert_eq!(json["messages"][0]["key"]["id"], json!("1"));
    }

    #[test]
    fn test_status_reply_before_first_attempt_is_null() {
        let event = LifecycleEvent::status_reply(None);

        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json, json!({"origin": "socket", "status": null}));
        assert_eq!(event.status(), None);
    }

    #[test]
    fn test_reconnect_requested_comes_from_socket() {
        let event = LifecycleEvent::reconnect_requested();

        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json, json!({"origin": "socket", "status": "wa-reconnecting"}));
        assert_eq!(event.status(), Some(ConnectionStatus::Reconnecting));
    }

    #[test]
    fn test_decode_picks_the_matching_kind() {
        let pairing: LifecycleEvent = serde_json::from_value(
            json!({"origin": "whatsapp", "status": "wa-waiting-connection", "qr": "x"}),
        )
        .unwrap();
        assert!(matches!(pairing.kind, EventKind::Pairing { .. }));

        let groups: LifecycleEvent = serde_json::from_value(
            json!({"origin": "socket", "status": null, "groups": []}),
        )
        .unwrap();
        assert!(matches!(groups.kind, EventKind::Groups { status: None, .. }));

        let status: LifecycleEvent =
            serde_json::from_value(json!({"origin": "whatsapp", "status": "wa-disconnected"}))
                .unwrap();
        assert_eq!(status.status(), Some(ConnectionStatus::Disconnected));
    }

    #[test]
    fn test_observer_command_accepts_legacy_names() {
        let cmd: ObserverCommand =
            serde_json::from_value(json!({"event": "get-whatsapp-status"})).unwrap();
        assert_eq!(cmd, ObserverCommand::GetStatus);

        let cmd: ObserverCommand =
            serde_json::from_value(json!({"event": "reconnect-whatsapp"})).unwrap();
        assert_eq!(cmd, ObserverCommand::Reconnect);

        let cmd: ObserverCommand = serde_json::from_value(json!({"event": "get-groups"})).unwrap();
        assert_eq!(cmd, ObserverCommand::GetGroups);
    }

    #[test]
    fn test_observer_command_rejects_unknown_event() {
        let result: Result<ObserverCommand, _> =
            serde_json::from_value(json!({"event": "delete-everything"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_server_frame_wraps_event_under_data() {
        let frame = ServerFrame::from(LifecycleEvent::connection(ConnectionStatus::Reconnecting));

        let json = serde_json::to_value(&frame).unwrap();

        assert_eq!(json["event"], json!(BOT_EVENT));
        assert_eq!(json["data"]["status"], json!("wa-reconnecting"));
    }
}
