//! The seam between the lifecycle manager and the messaging-session library.
//!
//! The lifecycle manager never speaks the messaging network's protocol. It
//! asks a [`SessionConnector`] for a new session, then drives everything
//! from the [`SessionEvents`] stream and the few requests on
//! [`SessionConnection`].
//!
//! Production wires these traits to a real session library. Tests and the
//! demo binary use scripted connectors.

use std::collections::HashMap;
use std::future::Future;

use tokio::sync::mpsc;
use tracing::level_filters::LevelFilter;
use wabridge_credentials::{CredentialStore, Credentials};
use wabridge_protocol::GroupId;

use crate::{GroupMetadata, GroupMetadataCache, SessionError, SessionEvent};

/// Receiving half of a session's event stream.
///
/// The stream ending (the sender dropped) means the session is gone.
pub type SessionEvents = mpsc::UnboundedReceiver<SessionEvent>;

/// Sending half, held by the session library.
pub type SessionEventSender = mpsc::UnboundedSender<SessionEvent>;

/// Everything a connector needs to open one session.
#[derive(Debug, Clone)]
pub struct SessionSetup {
    /// Loaded (or freshly generated) credential material.
    pub credentials: Credentials,
    /// Where the session library keeps its per-key material (pre-keys,
    /// peer sessions, app-state keys). Same directory as `creds.json`, so
    /// a logged-out wipe takes these with it.
    pub keys: CredentialStore,
    /// Cache the session library consults before fetching group metadata.
    pub group_cache: GroupMetadataCache,
    /// Verbosity for the session library's own logging. The library is
    /// chatty, so this defaults to off.
    pub log_level: LevelFilter,
}

impl SessionSetup {
    pub fn new(
        credentials: Credentials,
        keys: CredentialStore,
        group_cache: GroupMetadataCache,
    ) -> Self {
        Self {
            credentials,
            keys,
            group_cache,
            log_level: LevelFilter::OFF,
        }
    }
}

/// Requests available on a live session.
///
/// Shared as `Arc<Self>` so a group listing can run outside the lifecycle
/// actor while the actor keeps processing events.
pub trait SessionConnection: Send + Sync + 'static {
    /// Asks the remote side to unlink this device. The session closes
    /// afterwards with a logged-out reason, reported on the event stream.
    fn logout(&self) -> impl Future<Output = Result<(), SessionError>> + Send;

    /// Every group the account participates in, keyed by group id.
    fn fetch_all_groups(
        &self,
    ) -> impl Future<Output = Result<HashMap<GroupId, GroupMetadata>, SessionError>> + Send;

    /// URL of a group's picture.
    ///
    /// `Ok(None)` means the group has no picture; `Err` means the lookup
    /// failed. Callers substitute a placeholder either way.
    fn fetch_profile_picture(
        &self,
        id: &GroupId,
    ) -> impl Future<Output = Result<Option<String>, SessionError>> + Send;
}

/// Opens sessions.
///
/// # Example
///
/// ```rust
/// use std::collections::HashMap;
///
/// use tokio::sync::mpsc;
/// use wabridge_protocol::GroupId;
/// use wabridge_session::{
///     ConnectionUpdate, GroupMetadata, SessionConnection, SessionConnector, SessionError,
///     SessionEvent, SessionEvents, SessionSetup,
/// };
///
/// /// A session that opens immediately and has no groups.
/// struct AlwaysOpen;
///
/// struct IdleConnection;
///
/// impl SessionConnection for IdleConnection {
///     async fn logout(&self) -> Result<(), SessionError> {
///         Ok(())
///     }
///
///     async fn fetch_all_groups(&self) -> Result<HashMap<GroupId, GroupMetadata>, SessionError> {
///         Ok(HashMap::new())
///     }
///
///     async fn fetch_profile_picture(
///         &self,
///         _id: &GroupId,
///     ) -> Result<Option<String>, SessionError> {
///         Ok(None)
///     }
/// }
///
/// impl SessionConnector for AlwaysOpen {
///     type Connection = IdleConnection;
///
///     async fn connect(
///         &self,
///         _setup: SessionSetup,
///     ) -> Result<(IdleConnection, SessionEvents), SessionError> {
///         let (tx, rx) = mpsc::unbounded_channel();
///         let _ = tx.send(SessionEvent::ConnectionUpdate(ConnectionUpdate::open()));
///         // A real library keeps `tx`; dropping it ends the stream.
///         Ok((IdleConnection, rx))
///     }
/// }
/// ```
pub trait SessionConnector: Send + Sync + 'static {
    /// The live-session type this connector produces.
    type Connection: SessionConnection;

    /// Opens a new session with the given setup.
    ///
    /// Returns the connection and its event stream. A failure here means
    /// no session exists; once this returns `Ok`, every close is reported
    /// as a [`SessionEvent::ConnectionUpdate`] instead.
    fn connect(
        &self,
        setup: SessionSetup,
    ) -> impl Future<Output = Result<(Self::Connection, SessionEvents), SessionError>> + Send;
}
