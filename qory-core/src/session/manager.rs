//! Session manager: file-backed storage of conversation sessions

use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};
use uuid::Uuid;

use super::store::{Session, SessionPreview};
use crate::utils::{ensure_private_dir, set_mode};
use crate::{Error, Result};

/// Name of the sessions directory inside the qory config directory
pub const SESSIONS_DIR_NAME: &str = "sessions";

const SESSION_FILE_MODE: u32 = 0o600;

static VALID_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("session id pattern compiles"));

/// Whether `id` is usable as a session ID (and therefore as a file name)
pub fn is_valid_id(id: &str) -> bool {
    VALID_ID.is_match(id)
}

/// Anonymous sessions are the ones with machine-generated UUID IDs
pub fn is_anonymous_id(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

/// Generate a fresh ID for an anonymous session
pub fn new_anonymous_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug)]
struct SessionFile {
    id: String,
    modified: SystemTime,
}

/// Manages conversation sessions stored in a directory, one file per session
#[derive(Debug, Clone)]
pub struct SessionManager {
    /// Sessions directory
    sessions_dir: PathBuf,
}

impl SessionManager {
    /// Create a session manager over `sessions_dir`, creating it if missing
    pub fn new<P: AsRef<Path>>(sessions_dir: P) -> Result<Self> {
        let sessions_dir = ensure_private_dir(sessions_dir)?;
        Ok(Self { sessions_dir })
    }

    /// Get the sessions directory path
    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    /// Load a session from disk
    pub fn load(&self, id: &str) -> Result<Session> {
        let path = self.session_path(id)?;

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            warn!("Session file for {} is empty", id);
            return Ok(Session::new());
        }

        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Save a session to disk, replacing any previous content.
    ///
    /// The content goes to a temporary file in the sessions directory which
    /// is then renamed over the target, so readers see either the old or
    /// the new file.
    pub fn store(&self, id: &str, session: &Session) -> Result<()> {
        let path = self.session_path(id)?;
        let content = serde_json::to_vec(session)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.sessions_dir)?;
        tmp.write_all(&content)?;
        tmp.as_file().sync_all()?;
        set_mode(tmp.path(), SESSION_FILE_MODE)?;
        tmp.persist(&path).map_err(|e| e.error)?;

        debug!("Stored session {} ({} messages)", id, session.messages.len());
        Ok(())
    }

    /// List previews of stored sessions, most recently updated first.
    ///
    /// `limit == 0` lists every session. A session without any user message
    /// fails the whole listing with [`Error::NoUserContent`].
    pub fn enumerate(&self, limit: usize) -> Result<Vec<SessionPreview>> {
        let mut files = self.files_by_recency()?;
        if limit > 0 {
            files.truncate(limit);
        }

        files.into_iter().map(|file| self.preview(file)).collect()
    }

    /// ID of the most recently updated session
    pub fn last(&self) -> Result<String> {
        self.files_by_recency()?
            .into_iter()
            .next()
            .map(|file| file.id)
            .ok_or(Error::NoSessions)
    }

    /// Delete all but the `retain` most recent anonymous sessions.
    ///
    /// Named sessions are never touched. Returns the number of deleted
    /// sessions; the first deletion failure aborts the pass.
    pub fn cleanup(&self, retain: usize) -> Result<usize> {
        let anonymous: Vec<SessionFile> = self
            .files_by_recency()?
            .into_iter()
            .filter(|file| is_anonymous_id(&file.id))
            .collect();

        if anonymous.len() <= retain {
            return Ok(0);
        }

        let mut removed = 0;
        for file in &anonymous[retain..] {
            let path = self.sessions_dir.join(&file.id);
            fs::remove_file(&path).map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!("delete session {}: {}", file.id, e),
                ))
            })?;
            debug!("Removed expired session {}", file.id);
            removed += 1;
        }

        Ok(removed)
    }

    fn preview(&self, file: SessionFile) -> Result<SessionPreview> {
        let session = self.load(&file.id)?;
        let snippet = session
            .snippet()
            .ok_or_else(|| Error::NoUserContent(file.id.clone()))?;

        Ok(SessionPreview {
            id: file.id,
            updated_at: DateTime::<Local>::from(file.modified),
            snippet,
        })
    }

    /// Session files sorted by modification time, newest first
    fn files_by_recency(&self) -> Result<Vec<SessionFile>> {
        let entries = fs::read_dir(&self.sessions_dir).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("read dir {}: {}", self.sessions_dir.display(), e),
            ))
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }

            let Ok(id) = entry.file_name().into_string() else {
                continue;
            };
            if !is_valid_id(&id) {
                debug!("Skipping non-session file {:?}", id);
                continue;
            }

            let modified = entry.metadata()?.modified()?;
            files.push(SessionFile { id, modified });
        }

        files.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.id.cmp(&b.id)));
        Ok(files)
    }

    /// Get the file path for a session, rejecting malformed IDs
    fn session_path(&self, id: &str) -> Result<PathBuf> {
        if !is_valid_id(id) {
            return Err(Error::InvalidId(id.to_string()));
        }
        Ok(self.sessions_dir.join(id))
    }
}
