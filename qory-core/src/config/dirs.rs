//! Location of the qory config directory

use std::path::{Path, PathBuf};
use tracing::info;

use crate::session::SESSIONS_DIR_NAME;
use crate::utils::ensure_private_dir;
use crate::{Error, Result};

/// Environment variable overriding the config directory
pub const HOME_ENV: &str = "QORY_HOME";

const CONFIG_DIR_NAME: &str = ".qory";
const LEGACY_PARENT: &str = ".config";
const LEGACY_DIR_NAME: &str = "qory";
const LOGS_DIR_NAME: &str = "logs";

/// Resolved qory directories
#[derive(Debug, Clone)]
pub struct ConfigDirs {
    root: PathBuf,
}

impl ConfigDirs {
    /// Resolve the config directory, creating it if needed.
    ///
    /// Precedence: explicit override, then `QORY_HOME`, then the per-user
    /// default location.
    pub fn resolve(override_dir: Option<PathBuf>) -> Result<Self> {
        let explicit = override_dir.or_else(|| std::env::var_os(HOME_ENV).map(PathBuf::from));
        let root = match explicit {
            Some(dir) => ensure_private_dir(dir)?,
            None => config_dir()?,
        };
        Ok(Self { root })
    }

    /// Use `root` as is, creating it if needed
    pub fn at<P: AsRef<Path>>(root: P) -> Result<Self> {
        Ok(Self {
            root: ensure_private_dir(root)?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.root.join(SESSIONS_DIR_NAME)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join(LOGS_DIR_NAME)
    }
}

/// Default per-user config directory (`~/.qory`, or `%APPDATA%\.qory` on Windows)
pub fn config_dir() -> Result<PathBuf> {
    let user_dir = user_dir()?;
    resolve_in(&user_dir, cfg!(not(windows)))
}

fn user_dir() -> Result<PathBuf> {
    if cfg!(windows) {
        return std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .ok_or_else(|| Error::Config("Env var [APPDATA] not defined".to_string()));
    }

    dirs::home_dir().ok_or_else(|| Error::Config("cannot determine home directory".to_string()))
}

fn resolve_in(user_dir: &Path, migrate_legacy: bool) -> Result<PathBuf> {
    let config_dir = user_dir.join(CONFIG_DIR_NAME);

    if migrate_legacy {
        let legacy = user_dir.join(LEGACY_PARENT).join(LEGACY_DIR_NAME);
        if legacy.is_dir() && std::fs::rename(&legacy, &config_dir).is_ok() {
            info!(
                "Migrated config directory {} -> {}",
                legacy.display(),
                config_dir.display()
            );
            return Ok(config_dir);
        }
    }

    Ok(ensure_private_dir(config_dir)?)
}
