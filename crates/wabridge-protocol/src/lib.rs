//! Wire protocol for wabridge.
//!
//! - **Types** ([`LifecycleEvent`], [`ConnectionStatus`], [`ObserverCommand`],
//!   [`ServerFrame`]) describe what travels between the bridge and its
//!   dashboard observers.
//! - **Codec** ([`Codec`], [`JsonCodec`]) turns those types into bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Lifecycle (LifecycleEvent) → Protocol (ServerFrame bytes) → Transport
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    BOT_EVENT, ConnectionStatus, EventKind, GroupId, GroupSummary, LifecycleEvent,
    ObserverCommand, Origin, ServerFrame, UpsertKind,
};
