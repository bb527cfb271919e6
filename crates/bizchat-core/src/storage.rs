//! Profile persistence
//!
//! The business profile is written to two tiers under the same key: a durable
//! JSON file that survives restarts, and a session-scoped in-memory slot that
//! is cleared when the app exits.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::StorageError;
use crate::state::BusinessProfile;

/// Storage key of the business profile record
pub const PROFILE_KEY: &str = "businessFields";

pub trait ProfileStore: Send + Sync {
    fn load(&self) -> Result<Option<BusinessProfile>, StorageError>;
    fn save(&self, profile: &BusinessProfile) -> Result<(), StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
}

/// Durable tier: `<dir>/businessFields.json`
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.json", PROFILE_KEY)),
        }
    }

    /// Store under the platform data directory (`~/.local/share/bizchat` etc.)
    pub fn default_location() -> Result<Self, StorageError> {
        let data_dir = dirs::data_dir().ok_or(StorageError::NoDataDir)?;
        Ok(Self::new(data_dir.join("bizchat")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProfileStore for FileStore {
    fn load(&self) -> Result<Option<BusinessProfile>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        let profile: BusinessProfile = serde_json::from_str(&content)?;
        Ok(Some(profile))
    }

    fn save(&self, profile: &BusinessProfile) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(profile)?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Session tier. Holds the serialized record, like a browser's session storage.
#[derive(Debug, Default)]
pub struct SessionStore {
    slot: Mutex<Option<String>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileStore for SessionStore {
    fn load(&self) -> Result<Option<BusinessProfile>, StorageError> {
        let slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        match slot.as_deref() {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }

    fn save(&self, profile: &BusinessProfile) -> Result<(), StorageError> {
        let json = serde_json::to_string(profile)?;
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(json);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}
