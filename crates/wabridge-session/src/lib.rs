//! Session boundary for wabridge.
//!
//! Defines what the lifecycle manager needs from a messaging-session
//! library, without depending on one:
//!
//! - [`SessionConnector`] / [`SessionConnection`]: open a session and make
//!   requests on it
//! - [`SessionEvent`]: what a live session reports
//! - [`GroupMetadataCache`]: the TTL cache shared with the session library

#![allow(async_fn_in_trait)]

mod cache;
mod connector;
mod error;
mod event;

pub use cache::{CacheConfig, GroupMetadata, GroupMetadataCache};
pub use connector::{
    SessionConnection, SessionConnector, SessionEventSender, SessionEvents, SessionSetup,
};
pub use error::SessionError;
pub use event::{
    ConnectionPhase, ConnectionUpdate, DisconnectError, DisconnectReason, MessageBatch,
    SessionEvent,
};
