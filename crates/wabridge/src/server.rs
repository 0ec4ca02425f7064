//! `BridgeServer` builder and accept loop.
//!
//! Ties the layers together: observers attach over the transport, the
//! lifecycle manager publishes into a broadcast channel, and every
//! observer handler forwards that channel to its socket.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::broadcast;
use wabridge_lifecycle::{EventSink, LifecycleConfig, LifecycleHandle, spawn_lifecycle};
use wabridge_protocol::{Codec, JsonCodec, LifecycleEvent};
use wabridge_session::SessionConnector;
use wabridge_transport::{Transport, WebSocketTransport};

use crate::handler::handle_observer;
use crate::{BridgeConfig, BridgeError};

/// Shared server state passed to each observer task.
pub(crate) struct ServerState<K: SessionConnector, C: Codec> {
    pub(crate) lifecycle: LifecycleHandle<K::Connection>,
    pub(crate) events: broadcast::Sender<LifecycleEvent>,
    pub(crate) codec: C,
}

impl<K: SessionConnector, C: Codec> ServerState<K, C> {
    /// Sends an event to every attached observer.
    pub(crate) fn publish(&self, event: LifecycleEvent) {
        self.events.emit(event);
    }
}

/// Builder for configuring and starting a bridge server.
///
/// # Example
///
/// ```rust,ignore
/// use wabridge::prelude::*;
///
/// let server = BridgeServerBuilder::new()
///     .bind("0.0.0.0:3001")
///     .auth_dir("/var/lib/wabridge")
///     .build(my_connector)
///     .await?;
/// server.run().await
/// ```
pub struct BridgeServerBuilder {
    bind_addr: String,
    lifecycle_config: LifecycleConfig,
    event_capacity: usize,
}

impl BridgeServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::from_config(BridgeConfig::default())
    }

    /// Starts from a loaded [`BridgeConfig`].
    pub fn from_config(config: BridgeConfig) -> Self {
        Self {
            bind_addr: config.bind,
            lifecycle_config: config.lifecycle,
            event_capacity: 256,
        }
    }

    /// Sets the address observers connect to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the credential directory.
    pub fn auth_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.lifecycle_config.auth_dir = dir.into();
        self
    }

    /// Replaces the whole lifecycle configuration.
    pub fn lifecycle_config(mut self, config: LifecycleConfig) -> Self {
        self.lifecycle_config = config;
        self
    }

    /// Sets how many events a slow observer may fall behind before it
    /// starts skipping.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Binds the observer socket and spawns the lifecycle manager.
    ///
    /// No session is started yet; the first observer to attach starts it.
    pub async fn build<K: SessionConnector>(
        self,
        connector: K,
    ) -> Result<BridgeServer<K, JsonCodec>, BridgeError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let (events, _) = broadcast::channel(self.event_capacity);
        let lifecycle = spawn_lifecycle(connector, self.lifecycle_config, events.clone());

        let state = Arc::new(ServerState {
            lifecycle,
            events,
            codec: JsonCodec,
        });

        Ok(BridgeServer { transport, state })
    }
}

impl Default for BridgeServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound bridge server.
///
/// Built with [`BridgeServerBuilder`]. Call [`run()`](Self::run) to
/// start accepting observers.
pub struct BridgeServer<K: SessionConnector, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<K, C>>,
}

impl<K, C> BridgeServer<K, C>
where
    K: SessionConnector,
    C: Codec,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, BridgeError> {
        Ok(self.transport.local_addr()?)
    }

    /// Handle to the lifecycle manager, for status reads or starting a
    /// session without waiting for an observer.
    pub fn lifecycle(&self) -> LifecycleHandle<K::Connection> {
        self.state.lifecycle.clone()
    }

    /// A receiver for every event published to observers.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.state.events.subscribe()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), BridgeError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes, then stops the
    /// lifecycle manager. The live session is dropped, not logged out, so
    /// the next start resumes without pairing.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()> + Send,
    ) -> Result<(), BridgeError> {
        let addr = self.local_addr()?;
        tracing::info!(%addr, "bridge server running");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_observer(conn, state).await {
                                tracing::debug!(error = %e, "observer ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
                () = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    break;
                }
            }
        }

        self.state.lifecycle.shutdown().await?;
        tracing::info!("bridge server stopped");
        Ok(())
    }
}
