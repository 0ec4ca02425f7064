//! Durable pairing credentials for wabridge.
//!
//! A session that has paired once can resume from what is stored here
//! without showing a QR code again. This crate provides:
//!
//! 1. **Material** ([`Credentials`]): opaque keys plus the paired account.
//! 2. **Storage** ([`CredentialStore`]): load-or-init, save on change, key
//!    entries, all under one directory.
//! 3. **Wipe** ([`wipe`]): post-order recursive removal used when the
//!    remote side logs the device out.

mod credentials;
mod error;
mod store;
mod wipe;

pub use credentials::{AccountId, AuthState, Credentials, SecretKey};
pub use error::CredentialError;
pub use store::CredentialStore;
pub use wipe::wipe;
