//! # wabridge
//!
//! Keeps one messaging session alive and republishes its lifecycle and
//! inbound messages to dashboard observers over WebSocket.
//!
//! A deployment provides a [`SessionConnector`](wabridge_session::SessionConnector)
//! for its messaging library; the bridge owns everything else: pairing,
//! reconnects, credential persistence and wipe, and observer fan-out.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wabridge::prelude::*;
//!
//! // Implement SessionConnector for your session library, then:
//! // with `BridgeArgs` flattened into the binary's clap parser:
//! // let config = BridgeConfig::from(cli.bridge);
//! // let server = BridgeServerBuilder::from_config(config)
//! //     .build(my_connector)
//! //     .await?;
//! // server.run().await
//! ```

mod config;
mod error;
mod handler;
mod logging;
mod server;

pub use config::{BridgeArgs, BridgeConfig, ENV_AUTH_DIR, ENV_BIND, ENV_GROUP_CACHE_TTL_SECS};
pub use error::BridgeError;
pub use logging::init_subscriber;
pub use server::{BridgeServer, BridgeServerBuilder};

pub mod prelude {
    pub use crate::{BridgeArgs, BridgeConfig, BridgeError, BridgeServer, BridgeServerBuilder};

    pub use wabridge_credentials::{AccountId, CredentialStore, Credentials};
    pub use wabridge_lifecycle::{
        EventSink, LifecycleConfig, LifecycleHandle, ManualReconnect, PLACEHOLDER_IMAGE,
    };
    pub use wabridge_protocol::{
        ConnectionStatus, GroupId, GroupSummary, LifecycleEvent, ObserverCommand, ServerFrame,
        UpsertKind,
    };
    pub use wabridge_session::{
        CacheConfig, ConnectionPhase, ConnectionUpdate, DisconnectError, DisconnectReason,
        GroupMetadata, MessageBatch, SessionConnection, SessionConnector, SessionError,
        SessionEvent, SessionEventSender, SessionEvents, SessionSetup,
    };
}
