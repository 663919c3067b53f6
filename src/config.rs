use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::crypto::DEFAULT_PBKDF2_ITERATIONS;
use crate::error::StorageError;
use crate::persistence::{Persistence, STORAGE_KEY};
use crate::storage::{EncryptedFileStore, FileStore, KeyValueStore};

/// Settings file contents (`settings.json` next to the data by convention).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackerConfig {
    pub data_dir: PathBuf,
    pub storage_key: String,
    pub encrypted: bool,
    pub pbkdf2_iterations: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            data_dir: PathBuf::from("."),
            storage_key: STORAGE_KEY.to_string(),
            encrypted: false,
            pbkdf2_iterations: DEFAULT_PBKDF2_ITERATIONS,
        }
    }
}

impl TrackerConfig {
    /// A missing file means defaults; a malformed one is an error.
    pub fn load(path: &Path) -> Result<TrackerConfig, StorageError> {
        if !path.exists() {
            return Ok(TrackerConfig::default());
        }
        let raw = fs::read_to_string(path)?;
        let mut config: TrackerConfig = serde_json::from_str(raw.as_str())?;
        config.normalize();
        Ok(config)
    }

    fn normalize(&mut self) {
        if self.storage_key.trim().is_empty() {
            self.storage_key = STORAGE_KEY.to_string();
        }
        self.pbkdf2_iterations = self.pbkdf2_iterations.max(1);
    }

    /// Builds the configured file backend. Encrypted storage needs a
    /// passphrase.
    pub fn open_backend(
        &self,
        passphrase: Option<&str>,
    ) -> Result<Persistence<Box<dyn KeyValueStore>>, StorageError> {
        let store: Box<dyn KeyValueStore> = if self.encrypted {
            let passphrase = passphrase
                .filter(|value| !value.is_empty())
                .ok_or(StorageError::MissingPassphrase)?;
            Box::new(EncryptedFileStore::new(
                self.data_dir.clone(),
                passphrase,
                self.pbkdf2_iterations,
            ))
        } else {
            Box::new(FileStore::new(self.data_dir.clone()))
        };
        Ok(Persistence::with_key(store, self.storage_key.clone()))
    }
}
