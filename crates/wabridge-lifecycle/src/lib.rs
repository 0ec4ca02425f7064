//! Connection lifecycle management for wabridge.
//!
//! Owns the single messaging session, decides what happens when it
//! closes, and reports every change to an [`EventSink`].
//!
//! # Key types
//!
//! - [`spawn_lifecycle`]: starts the manager task
//! - [`LifecycleHandle`]: start, reconnect, status, group listing
//! - [`CloseAction`]: the close classification (retry, wipe, or stop)
//! - [`EventSink`]: where events go (a broadcast channel in the server)
//! - [`LifecycleConfig`]: credential directory and cache settings

mod config;
mod error;
mod groups;
mod manager;
mod policy;
mod sink;

pub use config::LifecycleConfig;
pub use error::LifecycleError;
pub use groups::PLACEHOLDER_IMAGE;
pub use manager::{LifecycleHandle, ManualReconnect, spawn_lifecycle};
pub use policy::CloseAction;
pub use sink::EventSink;
