//! Directory-backed credential store.
//!
//! Layout:
//!
//! ```text
//! auth_dir/
//! ├── creds.json                  ← Credentials
//! ├── pre-key-1.json              ← key entries, one file each
//! ├── session-5511999999999.0.json
//! └── app-state-sync-key-AAAA.json
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs;

use crate::{AuthState, CredentialError, Credentials};

const CREDS_FILE: &str = "creds.json";

/// Reads and writes credential material under one directory.
///
/// Cheap to clone; holds only the path.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    /// Creates a store rooted at `dir`. Nothing touches the disk until the
    /// first load or save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory this store owns.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Loads `creds.json`, or generates fresh unpaired credentials when it
    /// does not exist.
    ///
    /// The directory is created if missing. Fresh credentials are not
    /// written here; the session persists them through [`save`](Self::save)
    /// once it reports a credential change.
    ///
    /// # Errors
    /// - [`CredentialError::Io`] if the directory cannot be created or the
    ///   file cannot be read.
    /// - [`CredentialError::Corrupt`] if `creds.json` does not parse.
    pub async fn load_or_init(&self) -> Result<AuthState, CredentialError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| CredentialError::io(&self.dir, e))?;

        let path = self.dir.join(CREDS_FILE);
        match fs::read(&path).await {
            Ok(bytes) => {
                let credentials = serde_json::from_slice(&bytes)
                    .map_err(|source| CredentialError::Corrupt { path, source })?;
                tracing::debug!(dir = %self.dir.display(), "loaded stored credentials");
                Ok(AuthState {
                    credentials,
                    fresh: false,
                })
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(dir = %self.dir.display(), "no stored credentials, must pair");
                Ok(AuthState {
                    credentials: Credentials::fresh(),
                    fresh: true,
                })
            }
            Err(e) => Err(CredentialError::io(path, e)),
        }
    }

    /// Overwrites `creds.json` with `credentials`.
    ///
    /// Idempotent. The write goes to a temporary file that is renamed into
    /// place, so a crash never leaves a half-written `creds.json`.
    pub async fn save(&self, credentials: &Credentials) -> Result<(), CredentialError> {
        self.write_json(CREDS_FILE, credentials).await
    }

    /// Reads one key entry, `Ok(None)` if it does not exist.
    pub async fn read_entry<T: DeserializeOwned>(
        &self,
        category: &str,
        id: &str,
    ) -> Result<Option<T>, CredentialError> {
        let path = self.dir.join(entry_file_name(category, id));
        match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|source| CredentialError::Corrupt { path, source }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CredentialError::io(path, e)),
        }
    }

    /// Writes one key entry, replacing any previous value.
    pub async fn write_entry<T: Serialize>(
        &self,
        category: &str,
        id: &str,
        value: &T,
    ) -> Result<(), CredentialError> {
        self.write_json(&entry_file_name(category, id), value).await
    }

    /// Removes one key entry. Removing a missing entry is not an error.
    pub async fn remove_entry(&self, category: &str, id: &str) -> Result<(), CredentialError> {
        let path = self.dir.join(entry_file_name(category, id));
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CredentialError::io(path, e)),
        }
    }

    /// Deletes the whole directory. See [`wipe`](crate::wipe).
    pub async fn wipe(&self) -> Result<(), CredentialError> {
        crate::wipe(&self.dir).await
    }

    async fn write_json<T: Serialize>(
        &self,
        file_name: &str,
        value: &T,
    ) -> Result<(), CredentialError> {
        let bytes = serde_json::to_vec(value).map_err(CredentialError::Encode)?;

        // The directory may have been wiped since the last load.
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| CredentialError::io(&self.dir, e))?;

        let path = self.dir.join(file_name);
        let tmp = self.dir.join(format!("{file_name}.tmp"));
        fs::write(&tmp, &bytes)
            .await
            .map_err(|e| CredentialError::io(&tmp, e))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| CredentialError::io(&path, e))?;
        Ok(())
    }
}

/// File name for a key entry. Ids contain `/` (base64) and `:` (device
/// suffixes), neither of which is safe in a file name.
fn entry_file_name(category: &str, id: &str) -> String {
    let raw = format!("{category}-{id}.json");
    raw.replace('/', "__").replace(':', "-")
}
