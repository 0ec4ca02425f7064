//! Lifecycle actor: the one task that owns the session.
//!
//! The actor holds the current status and at most one live session, and
//! is the only writer of either. It waits on two things at once: commands
//! from [`LifecycleHandle`]s and events from the current session. A close
//! never starts the next session from inside the close handler; the
//! handler returns a decision and the loop acts on it after the old
//! session has been dropped. Reconnect storms therefore run in constant
//! stack depth and never overlap two sessions.
//!
//! ```text
//!            start()                qr              open
//!   (none) ─────────▶ connecting ───────▶ pairing ──────▶ connected
//!                         ▲                                   │ close
//!                         │ Retry / WipeAndRepair             ▼
//!                         └─────────────────────── CloseAction::classify
//!                                                             │ Terminal
//!                                                             ▼
//!                                                        disconnected
//! ```

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use wabridge_credentials::CredentialStore;
use wabridge_protocol::{ConnectionStatus, GroupSummary, LifecycleEvent};
use wabridge_session::{
    ConnectionPhase, ConnectionUpdate, DisconnectError, GroupMetadataCache, MessageBatch,
    SessionConnection, SessionConnector, SessionEvent, SessionEvents, SessionSetup,
};

use crate::{CloseAction, EventSink, LifecycleConfig, LifecycleError};

/// Outcome of [`LifecycleHandle::reconnect_manual`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualReconnect {
    /// A logout was sent to the live session. Its close starts the next
    /// session. If the logout itself fails, the session is dropped and
    /// restarted with the same credentials.
    LogoutIssued,
    /// There was no session to log out. Nothing will start on its own;
    /// the caller decides whether to call [`LifecycleHandle::start`].
    NoActiveSession,
}

/// Commands sent to the lifecycle actor through its channel.
pub(crate) enum LifecycleCommand<C> {
    /// Start a session unless one is already live.
    Start,

    /// Announce `Reconnecting` and log the live session out.
    ReconnectManual {
        reply: oneshot::Sender<ManualReconnect>,
    },

    /// A logout issued by a manual reconnect failed, so no close will
    /// follow for `session`.
    LogoutFailed { session: u64 },

    /// Borrow the live session for a request made outside the actor.
    CurrentSession {
        reply: oneshot::Sender<Option<(Arc<C>, GroupMetadataCache)>>,
    },

    /// Stop the actor. The live session, if any, is dropped without a
    /// logout so the pairing survives a restart of the process.
    Shutdown,
}

/// Handle to a running lifecycle actor.
///
/// Cheap to clone. The actor stops when [`shutdown`](Self::shutdown) is
/// called or when every handle has been dropped.
pub struct LifecycleHandle<C> {
    sender: mpsc::Sender<LifecycleCommand<C>>,
    status: watch::Receiver<Option<ConnectionStatus>>,
}

impl<C> Clone for LifecycleHandle<C> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            status: self.status.clone(),
        }
    }
}

impl<C: SessionConnection> LifecycleHandle<C> {
    /// Asks the actor to start a session. Does nothing if one is live.
    ///
    /// Returns once the request is queued; progress is reported through
    /// the event sink.
    pub async fn start(&self) -> Result<(), LifecycleError> {
        self.sender
            .send(LifecycleCommand::Start)
            .await
            .map_err(|_| LifecycleError::Unavailable)
    }

    /// Operator-requested reconnect.
    ///
    /// `Reconnecting` has been emitted by the time this returns. With a
    /// live session a logout is issued and the resulting close drives the
    /// restart. Without one nothing else happens; see
    /// [`ManualReconnect::NoActiveSession`].
    pub async fn reconnect_manual(&self) -> Result<ManualReconnect, LifecycleError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(LifecycleCommand::ReconnectManual { reply: reply_tx })
            .await
            .map_err(|_| LifecycleError::Unavailable)?;
        reply_rx.await.map_err(|_| LifecycleError::Unavailable)
    }

    /// The last status the actor set, `None` before the first attempt.
    pub fn status(&self) -> Option<ConnectionStatus> {
        *self.status.borrow()
    }

    /// A receiver that sees every status change.
    pub fn watch_status(&self) -> watch::Receiver<Option<ConnectionStatus>> {
        self.status.clone()
    }

    /// Lists the groups of the live session.
    ///
    /// Returns an empty list when there is no session or the listing
    /// fails. The fetch runs on the caller's task so the actor keeps
    /// processing session events meanwhile.
    pub async fn list_groups(&self) -> Result<Vec<GroupSummary>, LifecycleError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(LifecycleCommand::CurrentSession { reply: reply_tx })
            .await
            .map_err(|_| LifecycleError::Unavailable)?;
        let current = reply_rx.await.map_err(|_| LifecycleError::Unavailable)?;

        match current {
            Some((connection, cache)) => Ok(crate::groups::list_groups(&*connection, &cache).await),
            None => {
                tracing::debug!("group listing requested without a session");
                Ok(Vec::new())
            }
        }
    }

    /// Tells the actor to stop.
    pub async fn shutdown(&self) -> Result<(), LifecycleError> {
        self.sender
            .send(LifecycleCommand::Shutdown)
            .await
            .map_err(|_| LifecycleError::Unavailable)
    }
}

/// One live session and everything that dies with it.
///
/// Dropping this drops the event receiver, which unsubscribes every
/// listener the session had.
struct ActiveSession<C> {
    id: u64,
    connection: Arc<C>,
    events: SessionEvents,
    group_cache: GroupMetadataCache,
}

/// The only mutable state the manager has.
struct LifecycleContext<C> {
    status: Option<ConnectionStatus>,
    session: Option<ActiveSession<C>>,
}

/// What the loop does after handling one session event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Next {
    Continue,
    StartSession,
}

enum Step<C> {
    Command(Option<LifecycleCommand<C>>),
    Session(Option<SessionEvent>),
}

struct LifecycleActor<K: SessionConnector, S> {
    connector: K,
    store: CredentialStore,
    config: LifecycleConfig,
    sink: S,
    context: LifecycleContext<K::Connection>,
    status_tx: watch::Sender<Option<ConnectionStatus>>,
    receiver: mpsc::Receiver<LifecycleCommand<K::Connection>>,
    // Weak so the actor still stops once every handle is dropped.
    commands: mpsc::WeakSender<LifecycleCommand<K::Connection>>,
    sessions_started: u64,
}

impl<K: SessionConnector, S: EventSink> LifecycleActor<K, S> {
    async fn run(mut self) {
        tracing::info!(auth_dir = %self.store.dir().display(), "lifecycle manager started");

        loop {
            let step = match &mut self.context.session {
                Some(active) => tokio::select! {
                    cmd = self.receiver.recv() => Step::Command(cmd),
                    event = active.events.recv() => Step::Session(event),
                },
                None => Step::Command(self.receiver.recv().await),
            };

            let next = match step {
                Step::Command(None) | Step::Command(Some(LifecycleCommand::Shutdown)) => break,
                Step::Command(Some(cmd)) => self.handle_command(cmd).await,
                Step::Session(Some(event)) => self.handle_session_event(event).await,
                Step::Session(None) => {
                    tracing::warn!(
                        session = self.current_session_id(),
                        "session event stream ended without a close"
                    );
                    self.on_close(None).await
                }
            };

            if next == Next::StartSession {
                self.start_session().await;
            }
        }

        if let Some(active) = self.context.session.take() {
            tracing::debug!(session = active.id, "dropping live session on shutdown");
        }
        tracing::info!("lifecycle manager stopped");
    }

    async fn handle_command(&mut self, cmd: LifecycleCommand<K::Connection>) -> Next {
        match cmd {
            LifecycleCommand::Start => {
                if self.context.session.is_some() {
                    tracing::debug!(
                        session = self.current_session_id(),
                        "start requested with a live session, ignoring"
                    );
                    Next::Continue
                } else {
                    Next::StartSession
                }
            }
            LifecycleCommand::ReconnectManual { reply } => {
                let outcome = self.reconnect_manual();
                let _ = reply.send(outcome);
                Next::Continue
            }
            LifecycleCommand::LogoutFailed { session } => self.on_logout_failed(session),
            LifecycleCommand::CurrentSession { reply } => {
                let current = self
                    .context
                    .session
                    .as_ref()
                    .map(|active| (Arc::clone(&active.connection), active.group_cache.clone()));
                let _ = reply.send(current);
                Next::Continue
            }
            // Handled by the loop.
            LifecycleCommand::Shutdown => Next::Continue,
        }
    }

    /// Loads credentials and opens a new session. On failure the status
    /// becomes `Disconnected` and nothing is retried.
    async fn start_session(&mut self) {
        debug_assert!(self.context.session.is_none());

        match self.open_session().await {
            Ok(active) => {
                tracing::info!(session = active.id, "session started");
                self.context.session = Some(active);
            }
            Err(e) => {
                tracing::error!(error = %e, "session start failed");
                self.transition(ConnectionStatus::Disconnected);
            }
        }
    }

    async fn open_session(&mut self) -> Result<ActiveSession<K::Connection>, LifecycleError> {
        let auth = self.store.load_or_init().await?;
        if auth.fresh {
            tracing::info!("starting with fresh credentials, a pairing code will follow");
        }

        let group_cache = GroupMetadataCache::new(self.config.group_cache.clone());
        let setup = SessionSetup::new(auth.credentials, self.store.clone(), group_cache.clone());
        let (connection, events) = self.connector.connect(setup).await?;

        self.sessions_started += 1;
        Ok(ActiveSession {
            id: self.sessions_started,
            connection: Arc::new(connection),
            events,
            group_cache,
        })
    }

    async fn handle_session_event(&mut self, event: SessionEvent) -> Next {
        match event {
            SessionEvent::CredentialsUpdated(credentials) => {
                if let Err(e) = self.store.save(&credentials).await {
                    tracing::warn!(error = %e, "credential save failed, will retry on next update");
                }
                Next::Continue
            }
            SessionEvent::ConnectionUpdate(update) => self.on_connection_update(update).await,
            SessionEvent::MessagesUpserted(MessageBatch { kind, messages }) => {
                tracing::debug!(?kind, count = messages.len(), "messages received");
                self.sink.emit(LifecycleEvent::messages(kind, messages));
                Next::Continue
            }
        }
    }

    /// Reacts to each present field, in order: pairing code, open, close.
    async fn on_connection_update(&mut self, update: ConnectionUpdate) -> Next {
        let ConnectionUpdate {
            phase,
            qr,
            last_disconnect,
        } = update;

        if let Some(qr) = qr {
            tracing::info!(session = self.current_session_id(), "pairing code issued");
            self.set_status(ConnectionStatus::AwaitingPairing);
            self.sink.emit(LifecycleEvent::pairing(qr));
        }

        match phase {
            Some(ConnectionPhase::Open) => {
                tracing::info!(session = self.current_session_id(), "session open");
                self.transition(ConnectionStatus::Connected);
                Next::Continue
            }
            Some(ConnectionPhase::Close) => self.on_close(last_disconnect).await,
            Some(ConnectionPhase::Connecting) | None => Next::Continue,
        }
    }

    /// The single decision point for a close.
    ///
    /// The session is dropped before anything else happens, so nothing can
    /// start another one until this returns.
    async fn on_close(&mut self, error: Option<DisconnectError>) -> Next {
        let closed = self.context.session.take().map(|active| active.id);
        let action = CloseAction::classify(error.as_ref());

        match &error {
            Some(e) => tracing::info!(
                session = closed,
                %action,
                reason = %e,
                code = ?e.reason(),
                "session closed"
            ),
            None => tracing::info!(session = closed, %action, "session closed"),
        }

        self.transition(action.status());

        if action == CloseAction::WipeAndRepair {
            if let Err(e) = self.store.wipe().await {
                tracing::error!(error = %e, "credential wipe failed, not restarting");
                return Next::Continue;
            }
            tracing::info!(dir = %self.store.dir().display(), "credentials wiped");
        }

        if action.restarts() {
            Next::StartSession
        } else {
            Next::Continue
        }
    }

    fn reconnect_manual(&mut self) -> ManualReconnect {
        self.set_status(ConnectionStatus::Reconnecting);
        self.sink.emit(LifecycleEvent::reconnect_requested());

        let Some(active) = &self.context.session else {
            tracing::info!("manual reconnect without a live session");
            return ManualReconnect::NoActiveSession;
        };

        tracing::info!(session = active.id, "manual reconnect, logging out");
        let connection = Arc::clone(&active.connection);
        let session = active.id;
        let commands = self.commands.clone();
        // The close that follows arrives as a session event.
        tokio::spawn(async move {
            if let Err(e) = connection.logout().await {
                tracing::warn!(session, error = %e, "logout failed");
                if let Some(commands) = commands.upgrade() {
                    let _ = commands.send(LifecycleCommand::LogoutFailed { session }).await;
                }
            }
        });
        ManualReconnect::LogoutIssued
    }

    /// Drops a session whose logout failed and starts a new one with the
    /// same credentials, so the announced `Reconnecting` is followed up.
    fn on_logout_failed(&mut self, session: u64) -> Next {
        if self.current_session_id() != Some(session) {
            tracing::debug!(session, "logout failure for a session already gone");
            return Next::Continue;
        }

        self.context.session = None;
        tracing::warn!(session, "dropping session after failed logout, restarting");
        Next::StartSession
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        tracing::debug!(from = ?self.context.status, to = %status, "status changed");
        self.context.status = Some(status);
        self.status_tx.send_replace(Some(status));
    }

    /// Sets the status and announces it.
    fn transition(&mut self, status: ConnectionStatus) {
        self.set_status(status);
        self.sink.emit(LifecycleEvent::connection(status));
    }

    fn current_session_id(&self) -> Option<u64> {
        self.context.session.as_ref().map(|active| active.id)
    }
}

/// Spawns the lifecycle actor and returns a handle to it.
///
/// Nothing connects until [`LifecycleHandle::start`] is called. Must be
/// called from within a Tokio runtime.
pub fn spawn_lifecycle<K, S>(
    connector: K,
    config: LifecycleConfig,
    sink: S,
) -> LifecycleHandle<K::Connection>
where
    K: SessionConnector,
    S: EventSink,
{
    let (tx, rx) = mpsc::channel(config.command_channel_size.max(1));
    let commands = tx.downgrade();
    let (status_tx, status_rx) = watch::channel(None);

    let actor = LifecycleActor {
        connector,
        store: CredentialStore::new(config.auth_dir.clone()),
        config,
        sink,
        context: LifecycleContext {
            status: None,
            session: None,
        },
        status_tx,
        receiver: rx,
        commands,
        sessions_started: 0,
    };

    tokio::spawn(actor.run());

    LifecycleHandle {
        sender: tx,
        status: status_rx,
    }
}
