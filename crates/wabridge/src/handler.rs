//! Per-observer handler: event forwarding and command dispatch.
//!
//! Each attached observer gets its own Tokio task running this handler.
//! The flow is:
//!   1. Subscribe to published events, then ask for a session start
//!   2. Loop: forward each event as a `bot-event` frame, and dispatch each
//!      command frame the observer sends
//!
//! Replies to commands are published to every observer, not just the one
//! that asked, so all dashboards stay in step.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use wabridge_lifecycle::ManualReconnect;
use wabridge_protocol::{Codec, LifecycleEvent, ObserverCommand, ServerFrame};
use wabridge_session::SessionConnector;
use wabridge_transport::{Connection, ObserverId, WebSocketConnection};

use crate::BridgeError;
use crate::server::ServerState;

/// Handles a single observer from attach to detach.
pub(crate) async fn handle_observer<K, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<K, C>>,
) -> Result<(), BridgeError>
where
    K: SessionConnector,
    C: Codec,
{
    let observer = conn.id();
    tracing::info!(%observer, "observer attached");

    // Subscribe first so the events caused by the start below are seen.
    let mut events = state.events.subscribe();
    state.lifecycle.start().await?;

    loop {
        tokio::select! {
            received = conn.recv() => match received {
                Ok(Some(data)) => handle_frame(&state, observer, &data).await?,
                Ok(None) => {
                    tracing::info!(%observer, "observer detached");
                    break;
                }
                Err(e) => {
                    tracing::debug!(%observer, error = %e, "recv error");
                    break;
                }
            },
            event = events.recv() => match event {
                Ok(event) => {
                    let bytes = state.codec.encode(&ServerFrame::from(event))?;
                    conn.send(&bytes).await?;
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(%observer, skipped, "observer lagging, events skipped");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    Ok(())
}

/// Decodes and dispatches one command frame. Frames that are not a known
/// command are ignored.
async fn handle_frame<K, C>(
    state: &Arc<ServerState<K, C>>,
    observer: ObserverId,
    data: &[u8],
) -> Result<(), BridgeError>
where
    K: SessionConnector,
    C: Codec,
{
    let command: ObserverCommand = match state.codec.decode(data) {
        Ok(command) => command,
        Err(e) => {
            tracing::debug!(%observer, error = %e, "ignoring unrecognised frame");
            return Ok(());
        }
    };

    tracing::debug!(%observer, ?command, "command received");
    match command {
        ObserverCommand::GetStatus => {
            state.publish(LifecycleEvent::status_reply(state.lifecycle.status()));
        }

        ObserverCommand::GetGroups => {
            // Listing makes one network call per group; keep the observer
            // loop responsive meanwhile.
            let state = Arc::clone(state);
            tokio::spawn(async move {
                match state.lifecycle.list_groups().await {
                    Ok(groups) => {
                        let status = state.lifecycle.status();
                        state.publish(LifecycleEvent::groups_reply(status, groups));
                    }
                    Err(e) => tracing::warn!(%observer, error = %e, "group listing failed"),
                }
            });
        }

        ObserverCommand::Reconnect => {
            tracing::info!(%observer, "manual reconnect requested");
            if state.lifecycle.reconnect_manual().await? == ManualReconnect::NoActiveSession {
                state.lifecycle.start().await?;
            }
        }
    }

    Ok(())
}
