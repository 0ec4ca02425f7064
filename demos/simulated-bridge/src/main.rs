//! Runs the bridge over a simulated session library, for dashboard work
//! without a phone.
//!
//! Behaviour of the simulated network:
//! - unpaired credentials get a pairing code; after `pair_delay` the
//!   "phone" scans it, the credentials are updated and the stream restarts
//!   (as the real network does right after pairing)
//! - paired credentials store a pre-key entry and open straight away
//! - logout closes with the logged-out code
//! - with `flap_every` set, an open session drops with a transient stream
//!   error on that interval
//!
//! Every flag can also be set through its `WABRIDGE_*` variable; see
//! `--help`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;
use wabridge::prelude::*;

/// Bridge over a simulated messaging network
#[derive(Debug, Parser)]
#[command(name = "simulated-bridge")]
struct Cli {
    #[command(flatten)]
    bridge: BridgeArgs,

    /// Seconds before the simulated phone scans a pairing code
    #[arg(long, env = "WABRIDGE_SIM_PAIR_DELAY_SECS", default_value_t = 5)]
    pair_delay_secs: u64,

    /// Drop every open session with a stream error after this many seconds
    #[arg(long, env = "WABRIDGE_SIM_FLAP_SECS")]
    flap_secs: Option<u64>,
}

// ---------------------------------------------------------------------------
// Simulated session library
// ---------------------------------------------------------------------------

struct SimulatedConnector {
    pair_delay: Duration,
    flap_every: Option<Duration>,
    sessions: AtomicU64,
}

impl SimulatedConnector {
    fn new(pair_delay: Duration, flap_every: Option<Duration>) -> Self {
        Self {
            pair_delay,
            flap_every,
            sessions: AtomicU64::new(0),
        }
    }
}

impl From<&Cli> for SimulatedConnector {
    fn from(cli: &Cli) -> Self {
        Self::new(
            Duration::from_secs(cli.pair_delay_secs),
            cli.flap_secs.map(Duration::from_secs),
        )
    }
}

struct SimulatedConnection {
    events: SessionEventSender,
}

impl SessionConnection for SimulatedConnection {
    async fn logout(&self) -> Result<(), SessionError> {
        let close = ConnectionUpdate::closed(Some(DisconnectError::new(
            "Intentional Logout",
            Some(DisconnectReason::LoggedOut.code()),
        )));
        self.events
            .send(SessionEvent::ConnectionUpdate(close))
            .map_err(|_| SessionError::NotOpen)
    }

    async fn fetch_all_groups(&self) -> Result<HashMap<GroupId, GroupMetadata>, SessionError> {
        let groups = [
            ("120363000000000001@g.us", "Kitchen", 6),
            ("120363000000000002@g.us", "Deliveries", 14),
        ];
        Ok(groups
            .into_iter()
            .map(|(id, subject, size)| {
                let id = GroupId::new(id);
                let metadata = GroupMetadata {
                    id: id.clone(),
                    subject: subject.to_string(),
                    size,
                    owner: None,
                    description: None,
                };
                (id, metadata)
            })
            .collect())
    }

    async fn fetch_profile_picture(&self, id: &GroupId) -> Result<Option<String>, SessionError> {
        if id.as_str().ends_with("1@g.us") {
            Ok(Some(format!("https://example.invalid/pictures/{id}.jpg")))
        } else {
            Err(SessionError::Request("item-not-found".into()))
        }
    }
}

impl SessionConnector for SimulatedConnector {
    type Connection = SimulatedConnection;

    async fn connect(
        &self,
        setup: SessionSetup,
    ) -> Result<(SimulatedConnection, SessionEvents), SessionError> {
        let session = self.sessions.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(drive_session(
            session,
            setup.credentials,
            setup.keys,
            tx.clone(),
            self.pair_delay,
            self.flap_every,
        ));

        Ok((SimulatedConnection { events: tx }, rx))
    }
}

/// Plays the network's side of one session. Returns as soon as the
/// lifecycle manager drops the session.
async fn drive_session(
    session: u64,
    mut credentials: Credentials,
    keys: CredentialStore,
    tx: SessionEventSender,
    pair_delay: Duration,
    flap_every: Option<Duration>,
) {
    let send = |event| tx.send(event).is_ok();

    if !credentials.is_paired() {
        if !send(SessionEvent::ConnectionUpdate(ConnectionUpdate::qr(format!(
            "2@simulated-{session}"
        )))) {
            return;
        }
        tokio::select! {
            () = tokio::time::sleep(pair_delay) => {}
            () = tx.closed() => return,
        }

        tracing::info!(session, "simulated phone scanned the pairing code");
        credentials.me = Some(AccountId {
            id: "5500000000000:1@s.whatsapp.net".into(),
            name: Some("simulated".into()),
        });
        credentials.registered = true;
        send(SessionEvent::CredentialsUpdated(credentials));
        send(SessionEvent::ConnectionUpdate(ConnectionUpdate::closed(Some(
            DisconnectError::new(
                "Stream Errored (restart required)",
                Some(DisconnectReason::RestartRequired.code()),
            ),
        ))));
        return;
    }

    let pre_key = serde_json::json!({"keyId": 1, "session": session});
    if let Err(e) = keys.write_entry("pre-key", "1", &pre_key).await {
        tracing::warn!(session, error = %e, "simulated pre-key upload failed");
    }

    if !send(SessionEvent::ConnectionUpdate(ConnectionUpdate::open())) {
        return;
    }
    send(SessionEvent::MessagesUpserted(MessageBatch {
        kind: UpsertKind::Notify,
        messages: vec![serde_json::json!({
            "key": {"remoteJid": "120363000000000001@g.us", "id": format!("SIM{session}")},
            "message": {"conversation": "simulated session is up"},
        })],
    }));

    let Some(every) = flap_every else {
        return;
    };
    tokio::select! {
        () = tokio::time::sleep(every) => {
            tracing::info!(session, "simulated stream error");
            send(SessionEvent::ConnectionUpdate(ConnectionUpdate::closed(Some(
                DisconnectError::new("Stream Errored (restart required)", None),
            ))));
        }
        () = tx.closed() => {}
    }
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    wabridge::init_subscriber("info");

    let cli = Cli::parse();
    let connector = SimulatedConnector::from(&cli);
    let config = BridgeConfig::from(cli.bridge);
    tracing::info!(
        bind = %config.bind,
        auth_dir = %config.lifecycle.auth_dir.display(),
        pair_delay = ?connector.pair_delay,
        flap_every = ?connector.flap_every,
        "starting simulated bridge"
    );

    let server = BridgeServerBuilder::from_config(config)
        .build(connector)
        .await?;

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
