//! Keyed configuration store

use std::path::{Path, PathBuf};
use tracing::debug;

use super::validate::validate_value;
use crate::utils::write_with_mode;
use crate::Result;

/// Well-known configuration keys
pub mod keys {
    /// API key sent to the completion provider
    pub const API_KEY: &str = "api_key";
    /// Base URL of the OpenAI-compatible endpoint
    pub const BASE_URL: &str = "base_url";
    /// Model used for queries
    pub const MODEL: &str = "model";
    /// Persistent system prompt added to new sessions
    pub const PROMPT: &str = "prompt";
    /// Number of anonymous sessions kept on disk
    pub const RETAIN: &str = "retain";

    pub const ALL: [&str; 5] = [API_KEY, BASE_URL, MODEL, PROMPT, RETAIN];
}

/// Get/set/unset access to scalar settings
pub trait ConfigStore: Send + Sync {
    /// Read a value; `None` when the key has never been set
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Validate and write a value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value. Removing an unset key succeeds.
    fn unset(&self, key: &str) -> Result<()>;
}

const VALUE_FILE_MODE: u32 = 0o600;

/// Configuration store keeping one file per key in a directory
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    dir: PathBuf,
}

impl FileConfigStore {
    /// Create a store over an existing config directory
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Get the config directory path
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl ConfigStore for FileConfigStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match std::fs::read_to_string(self.value_path(key)) {
            Ok(content) => {
                let value = content.trim_end_matches(['\n', '\r']);
                Ok(Some(value.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        validate_value(key, value)?;

        let path = self.value_path(key);
        write_with_mode(&path, value.as_bytes(), VALUE_FILE_MODE)?;
        debug!("Set config value {}", key);
        Ok(())
    }

    fn unset(&self, key: &str) -> Result<()> {
        match std::fs::remove_file(self.value_path(key)) {
            Ok(()) => {
                debug!("Unset config value {}", key);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
