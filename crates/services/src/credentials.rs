//! Client-side persistence of the one bearer credential.
//!
//! The credential is the only state the client persists. It lives behind a
//! trait so the session store can be exercised in tests without touching the
//! filesystem.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use lesson_core::model::{Credential, CredentialError};

/// Errors surfaced by credential stores.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CredentialStoreError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] CredentialError),

    #[error("credential store lock poisoned")]
    Poisoned,
}

/// Load/save/clear for the persisted credential.
pub trait CredentialStore: Send + Sync {
    /// Read the persisted credential, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns `CredentialStoreError` if the stored value cannot be read or
    /// is malformed.
    fn load(&self) -> Result<Option<Credential>, CredentialStoreError>;

    /// Persist the credential, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `CredentialStoreError` if the value cannot be written.
    fn save(&self, credential: &Credential) -> Result<(), CredentialStoreError>;

    /// Remove the persisted credential. Removing an absent credential is ok.
    ///
    /// # Errors
    ///
    /// Returns `CredentialStoreError` if removal fails.
    fn clear(&self) -> Result<(), CredentialStoreError>;
}

/// Persisted shape of the credential on disk.
#[derive(Debug, Serialize, Deserialize)]
struct StoredCredential {
    token: String,
    scheme: String,
}

/// JSON-file credential store.
#[derive(Clone, Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<Credential>, CredentialStoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let stored: StoredCredential = serde_json::from_str(&raw)?;
        Ok(Some(Credential::new(stored.token, stored.scheme)?))
    }

    fn save(&self, credential: &Credential) -> Result<(), CredentialStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let stored = StoredCredential {
            token: credential.token().to_owned(),
            scheme: credential.scheme().to_owned(),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&stored)?)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-memory credential store for tests and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryCredentialStore {
    slot: Arc<Mutex<Option<Credential>>>,
}

impl InMemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn load(&self) -> Result<Option<Credential>, CredentialStoreError> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| CredentialStoreError::Poisoned)?;
        Ok(slot.clone())
    }

    fn save(&self, credential: &Credential) -> Result<(), CredentialStoreError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| CredentialStoreError::Poisoned)?;
        *slot = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialStoreError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| CredentialStoreError::Poisoned)?;
        *slot = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_round_trips_and_clears() {
        let dir = std::env::temp_dir().join(format!("lesson-cred-{}", std::process::id()));
        let store = FileCredentialStore::new(dir.join("session.json"));

        assert!(store.load().unwrap().is_none());

        let cred = Credential::new("abc123", "bearer").unwrap();
        store.save(&cred).unwrap();
        assert_eq!(store.load().unwrap(), Some(cred));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        // clearing twice is fine
        store.clear().unwrap();

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn in_memory_store_round_trips() {
        let store = InMemoryCredentialStore::new();
        assert!(store.load().unwrap().is_none());

        let cred = Credential::new("abc123", "bearer").unwrap();
        store.save(&cred).unwrap();
        assert_eq!(store.load().unwrap(), Some(cred));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
