//! Credential material: what a session needs to resume without pairing.
//!
//! The session library owns the cryptography. This crate only keeps its
//! secrets on disk and hands them back on the next start, so key material
//! is treated as opaque bytes (base64 in JSON).

use rand::Rng;
use serde::{Deserialize, Serialize};

/// An opaque 32-byte secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretKey(#[serde(with = "base64_bytes")] Vec<u8>);

impl SecretKey {
    /// Generates a new random key.
    pub fn generate() -> Self {
        let bytes: [u8; 32] = rand::rng().random();
        Self(bytes.to_vec())
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

// Never print secrets, even at trace level.
impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretKey(<{} bytes>)", self.0.len())
    }
}

/// The account a device was paired with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountId {
    /// Device JID, e.g. `5511999999999:12@s.whatsapp.net`.
    pub id: String,
    /// Push name shown on the phone, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Everything persisted in `creds.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub noise_key: SecretKey,
    pub signed_identity_key: SecretKey,
    pub signed_pre_key_id: u32,
    /// 14-bit registration id.
    pub registration_id: u16,
    pub adv_secret_key: SecretKey,
    pub next_pre_key_id: u32,
    pub first_unuploaded_pre_key_id: u32,
    /// Set once pairing completes.
    #[serde(default)]
    pub me: Option<AccountId>,
    /// `true` after the phone has confirmed the pairing.
    #[serde(default)]
    pub registered: bool,
}

impl Credentials {
    /// Fresh, unpaired material. A session started with these always goes
    /// through the QR flow.
    pub fn fresh() -> Self {
        let mut rng = rand::rng();
        Self {
            noise_key: SecretKey::generate(),
            signed_identity_key: SecretKey::generate(),
            signed_pre_key_id: 1,
            registration_id: rng.random::<u16>() & 0x3fff,
            adv_secret_key: SecretKey::generate(),
            next_pre_key_id: 1,
            first_unuploaded_pre_key_id: 1,
            me: None,
            registered: false,
        }
    }

    /// Returns `true` if these credentials belong to a paired device.
    pub fn is_paired(&self) -> bool {
        self.me.is_some()
    }
}

/// Result of [`CredentialStore::load_or_init`](crate::CredentialStore::load_or_init).
#[derive(Debug, Clone)]
pub struct AuthState {
    pub credentials: Credentials,
    /// `true` when nothing was on disk and `credentials` were just generated.
    pub fresh: bool,
}

mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(d)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_credentials_are_unpaired() {
        let creds = Credentials::fresh();

        assert!(!creds.is_paired());
        assert!(!creds.registered);
        assert_eq!(creds.noise_key.as_bytes().len(), 32);
        assert!(creds.registration_id <= 0x3fff);
    }

    #[test]
    fn test_fresh_credentials_differ_between_calls() {
        let a = Credentials::fresh();
        let b = Credentials::fresh();

        assert_ne!(a.noise_key, b.noise_key, "keys must be random");
    }

    #[test]
    fn test_secret_key_serializes_as_base64_string() {
        let key = SecretKey::from_bytes(vec![0u8, 1, 2, 255]);

        let json = serde_json::to_value(&key).unwrap();

        assert_eq!(json, serde_json::json!("AAEC/w=="));
    }

    #[test]
    fn test_secret_key_debug_hides_bytes() {
        let key = SecretKey::from_bytes(vec![42u8; 32]);

        assert_eq!(format!("{key:?}"), "SecretKey(<32 bytes>)");
    }

    #[test]
    fn test_credentials_json_uses_camel_case() {
        let json = serde_json::to_value(Credentials::fresh()).unwrap();

        assert!(json.get("noiseKey").is_some());
        assert!(json.get("registrationId").is_some());
        assert_eq!(json["registered"], serde_json::json!(false));
    }
}
