//! Integration tests for the bridge server, handler, and full observer flow.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use wabridge::prelude::*;

// =========================================================================
// Stub session library
// =========================================================================

#[derive(Default)]
struct StubState {
    senders: Vec<SessionEventSender>,
    groups: Vec<GroupMetadata>,
}

/// Paired credentials open at once, unpaired ones get `qr-<n>`. Logout
/// closes with the logged-out code.
#[derive(Clone, Default)]
struct StubConnector {
    state: Arc<Mutex<StubState>>,
}

impl StubConnector {
    fn connects(&self) -> usize {
        self.state.lock().unwrap().senders.len()
    }

    fn push(&self, event: SessionEvent) {
        let state = self.state.lock().unwrap();
        let sender = state.senders.last().expect("no session");
        sender.send(event).expect("session receiver dropped");
    }

    fn set_groups(&self, groups: Vec<GroupMetadata>) {
        self.state.lock().unwrap().groups = groups;
    }
}

struct StubConnection {
    index: usize,
    state: Arc<Mutex<StubState>>,
}

impl SessionConnection for StubConnection {
    async fn logout(&self) -> Result<(), SessionError> {
        let state = self.state.lock().unwrap();
        let close = ConnectionUpdate::closed(Some(DisconnectError::with_code(
            DisconnectReason::LoggedOut,
        )));
        let _ = state.senders[self.index].send(SessionEvent::ConnectionUpdate(close));
        Ok(())
    }

    async fn fetch_all_groups(&self) -> Result<HashMap<GroupId, GroupMetadata>, SessionError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .groups
            .iter()
            .map(|g| (g.id.clone(), g.clone()))
            .collect())
    }

    async fn fetch_profile_picture(&self, _id: &GroupId) -> Result<Option<String>, SessionError> {
        Err(SessionError::Request("item-not-found".into()))
    }
}

impl SessionConnector for StubConnector {
    type Connection = StubConnection;

    async fn connect(
        &self,
        setup: SessionSetup,
    ) -> Result<(StubConnection, SessionEvents), SessionError> {
        let mut state = self.state.lock().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        let index = state.senders.len();
        let first = if setup.credentials.is_paired() {
            ConnectionUpdate::open()
        } else {
            ConnectionUpdate::qr(format!("qr-{index}"))
        };
        tx.send(SessionEvent::ConnectionUpdate(first))
            .expect("receiver is alive");
        state.senders.push(tx);
        Ok((
            StubConnection {
                index,
                state: Arc::clone(&self.state),
            },
            rx,
        ))
    }
}

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

struct Running {
    addr: String,
    connector: StubConnector,
    lifecycle: LifecycleHandle<StubConnection>,
}

/// Starts a server on a random port with credentials under `auth_dir`.
async fn start_server(auth_dir: &Path) -> Running {
    let connector = StubConnector::default();
    let server = BridgeServerBuilder::new()
        .bind("127.0.0.1:0")
        .auth_dir(auth_dir)
        .build(connector.clone())
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();
    let lifecycle = server.lifecycle();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    Running {
        addr,
        connector,
        lifecycle,
    }
}

async fn pair(auth_dir: &Path) {
    let mut creds = Credentials::fresh();
    creds.me = Some(wabridge_credentials::AccountId {
        id: "5511999999999:1@s.whatsapp.net".into(),
        name: None,
    });
    CredentialStore::new(auth_dir).save(&creds).await.unwrap();
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send_json(ws: &mut ClientWs, value: Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .expect("send");
}

/// Returns the `data` of the next `bot-event` frame.
async fn next_event(ws: &mut ClientWs) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("websocket error");
        if !(msg.is_text() || msg.is_binary()) {
            continue;
        }
        let frame: Value = serde_json::from_slice(&msg.into_data()).expect("frame is JSON");
        assert_eq!(frame["event"], "bot-event");
        return frame["data"].clone();
    }
}

/// Skips events until one matches `pred`.
async fn wait_for(ws: &mut ClientWs, pred: impl Fn(&Value) -> bool) -> Value {
    loop {
        let event = next_event(ws).await;
        if pred(&event) {
            return event;
        }
    }
}

/// Connects and waits until the observer's handler is subscribed, using a
/// status query as the marker.
async fn attach(addr: &str) -> ClientWs {
    let mut ws = connect(addr).await;
    send_json(&mut ws, json!({"event": "get-status"})).await;
    wait_for(&mut ws, |e| e["origin"] == "socket").await;
    ws
}

// =========================================================================
// Attach
// =========================================================================

#[tokio::test]
async fn test_attach_without_credentials_receives_pairing_code() {
    let tmp = tempfile::tempdir().unwrap();
    let running = start_server(&tmp.path().join("auth")).await;
    let mut ws = connect(&running.addr).await;

    let event = next_event(&mut ws).await;

    assert_eq!(
        event,
        json!({"origin": "whatsapp", "status": "wa-waiting-connection", "qr": "qr-0"})
    );
}

#[tokio::test]
async fn test_attach_with_credentials_receives_connected() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("auth");
    pair(&dir).await;
    let running = start_server(&dir).await;
    let mut ws = connect(&running.addr).await;

    let event = next_event(&mut ws).await;

    assert_eq!(event, json!({"origin": "whatsapp", "status": "wa-connected"}));
}

#[tokio::test]
async fn test_second_observer_does_not_start_second_session() {
    let tmp = tempfile::tempdir().unwrap();
    let running = start_server(&tmp.path().join("auth")).await;
    let mut first = connect(&running.addr).await;
    next_event(&mut first).await;

    let _second = attach(&running.addr).await;
    running.lifecycle.list_groups().await.unwrap();

    assert_eq!(running.connector.connects(), 1);
}

// =========================================================================
// Commands
// =========================================================================

#[tokio::test]
async fn test_get_status_reply_reaches_every_observer() {
    let tmp = tempfile::tempdir().unwrap();
    let running = start_server(&tmp.path().join("auth")).await;
    let mut first = connect(&running.addr).await;
    next_event(&mut first).await;
    let mut second = attach(&running.addr).await;

    send_json(&mut second, json!({"event": "get-whatsapp-status"})).await;

    let expected = json!({"origin": "socket", "status": "wa-waiting-connection"});
    assert_eq!(wait_for(&mut first, |e| e["origin"] == "socket").await, expected);
    assert_eq!(wait_for(&mut second, |e| e["origin"] == "socket").await, expected);
}

#[tokio::test]
async fn test_get_groups_replies_with_placeholder_images() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("auth");
    pair(&dir).await;
    let running = start_server(&dir).await;
    running.connector.set_groups(vec![GroupMetadata {
        id: GroupId::new("120363@g.us"),
        subject: "Orders".into(),
        size: 12,
        owner: None,
        description: None,
    }]);
    let mut ws = connect(&running.addr).await;
    wait_for(&mut ws, |e| e["status"] == "wa-connected").await;

    send_json(&mut ws, json!({"event": "get-groups"})).await;

    let event = wait_for(&mut ws, |e| e.get("groups").is_some()).await;
    assert_eq!(
        event,
        json!({
            "origin": "socket",
            "status": "wa-connected",
            "groups": [{
                "id": "120363@g.us",
                "name": "Orders",
                "participants": 12,
                "image": PLACEHOLDER_IMAGE,
            }],
        })
    );
}

#[tokio::test]
async fn test_reconnect_with_session_repairs() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("auth");
    pair(&dir).await;
    let running = start_server(&dir).await;
    let mut ws = connect(&running.addr).await;
    wait_for(&mut ws, |e| e["status"] == "wa-connected").await;

    send_json(&mut ws, json!({"event": "reconnect"})).await;

    assert_eq!(
        next_event(&mut ws).await,
        json!({"origin": "socket", "status": "wa-reconnecting"})
    );
    assert_eq!(next_event(&mut ws).await["status"], "wa-disconnected");
    let pairing = next_event(&mut ws).await;
    assert_eq!(pairing["status"], "wa-waiting-connection");
    assert_eq!(pairing["qr"], "qr-1");
    assert!(!dir.join("creds.json").exists());
}

#[tokio::test]
async fn test_reconnect_after_terminal_close_starts_session() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("auth");
    pair(&dir).await;
    let running = start_server(&dir).await;
    let mut ws = connect(&running.addr).await;
    wait_for(&mut ws, |e| e["status"] == "wa-connected").await;
    running.connector.push(SessionEvent::ConnectionUpdate(ConnectionUpdate::closed(
        Some(DisconnectError::with_code(DisconnectReason::ConnectionReplaced)),
    )));
    assert_eq!(next_event(&mut ws).await["status"], "wa-disconnected");

    send_json(&mut ws, json!({"event": "reconnect-whatsapp"})).await;

    assert_eq!(next_event(&mut ws).await["status"], "wa-reconnecting");
    assert_eq!(next_event(&mut ws).await["status"], "wa-connected");
    assert_eq!(running.connector.connects(), 2);
}

#[tokio::test]
async fn test_malformed_frame_is_ignored() {
    let tmp = tempfile::tempdir().unwrap();
    let running = start_server(&tmp.path().join("auth")).await;
    let mut ws = connect(&running.addr).await;
    next_event(&mut ws).await;

    ws.send(Message::Text("not json".into())).await.unwrap();
    send_json(&mut ws, json!({"event": "launch-rockets"})).await;
    send_json(&mut ws, json!({"event": "get-status"})).await;

    let event = next_event(&mut ws).await;
    assert_eq!(event["origin"], "socket");
}

// =========================================================================
// Forwarding
// =========================================================================

#[tokio::test]
async fn test_messages_are_forwarded_as_bot_events() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("auth");
    pair(&dir).await;
    let running = start_server(&dir).await;
    let mut ws = connect(&running.addr).await;
    wait_for(&mut ws, |e| e["status"] == "wa-connected").await;

    running.connector.push(SessionEvent::MessagesUpserted(MessageBatch {
        kind: UpsertKind::Notify,
        messages: vec![json!({"key": {"id": "3EB0"}, "message": {"conversation": "hi"}})],
    }));

    let event = next_event(&mut ws).await;
    assert_eq!(
        event,
        json!({
            "origin": "whatsapp",
            "status": "wa-connected",
            "type": "notify",
            "messages": [{"key": {"id": "3EB0"}, "message": {"conversation": "hi"}}],
        })
    );
}

#[tokio::test]
async fn test_subscribe_sees_published_events() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("auth");
    pair(&dir).await;
    let connector = StubConnector::default();
    let server = BridgeServerBuilder::new()
        .bind("127.0.0.1:0")
        .auth_dir(&dir)
        .build(connector)
        .await
        .unwrap();
    let mut events = server.subscribe();

    server.lifecycle().start().await.unwrap();

    let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.status(), Some(ConnectionStatus::Connected));
}
