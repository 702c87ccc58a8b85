//! The query use case: resolve a session, ask the model, persist the turn

use std::io::Write;
use std::sync::Arc;

use qory_core::config::{keys, ConfigStore};
use qory_core::session::{new_anonymous_id, Message, Session, SessionManager};
use qory_core::{Error, Result};
use qory_providers::CompletionClient;
use tracing::{debug, info, warn};

use crate::prompt::build_user_prompt;

/// Anonymous sessions kept when `retain` is not configured
pub const DEFAULT_RETAIN: usize = 100;

/// Which session a query continues
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionTarget {
    /// A fresh session with a generated ID
    Anonymous,
    /// The session with this ID, created on first use
    Named(String),
    /// The most recently updated session
    Last,
}

/// Result of a completed query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOutcome {
    /// ID the session is (or would have been) stored under
    pub session_id: String,
    /// Full assistant reply
    pub response: String,
    /// False when the reply was shown but saving the session failed
    pub persisted: bool,
}

/// Runs queries against the configured model
pub struct QueryRunner {
    sessions: SessionManager,
    config: Arc<dyn ConfigStore>,
    client: CompletionClient,
}

impl QueryRunner {
    pub fn new(
        sessions: SessionManager,
        config: Arc<dyn ConfigStore>,
        client: CompletionClient,
    ) -> Self {
        Self {
            sessions,
            config,
            client,
        }
    }

    /// Ask the model, streaming its answer into `sink`.
    ///
    /// A provider failure leaves the stored session untouched. A failure to
    /// save after a successful answer is reported through
    /// [`QueryOutcome::persisted`] rather than as an error.
    pub async fn run<W: Write + ?Sized>(
        &self,
        target: SessionTarget,
        args: &[String],
        sink: &mut W,
    ) -> Result<QueryOutcome> {
        if args.is_empty() {
            return Err(Error::Validation("no input given".to_string()));
        }

        let (session_id, mut session) = self.resolve(&target)?;
        debug!(
            "Query in session {} ({} previous messages)",
            session_id,
            session.messages.len()
        );

        let model = self
            .config
            .get(keys::MODEL)?
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| {
                Error::Config("model is not set, run `qory config model set`".to_string())
            })?;

        if session.is_empty() {
            if let Some(prompt) = self.config.get(keys::PROMPT)? {
                session.add_message(Message::system(prompt));
            }
        }
        session.add_message(Message::user(build_user_prompt(args)));

        let response = self.client.query(&model, &session.messages, sink).await?;
        session.add_message(Message::assistant(response.clone()));

        let persisted = match self.sessions.store(&session_id, &session) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to save session {}: {}", session_id, e);
                false
            }
        };

        if target == SessionTarget::Anonymous && persisted {
            self.prune();
        }

        Ok(QueryOutcome {
            session_id,
            response,
            persisted,
        })
    }

    fn resolve(&self, target: &SessionTarget) -> Result<(String, Session)> {
        let id = match target {
            SessionTarget::Anonymous => return Ok((new_anonymous_id(), Session::new())),
            SessionTarget::Named(id) => id.clone(),
            SessionTarget::Last => self.sessions.last()?,
        };

        match self.sessions.load(&id) {
            Ok(session) => Ok((id, session)),
            Err(e) if e.is_not_found() => {
                debug!("Starting new session {}", id);
                Ok((id, Session::new()))
            }
            Err(e) => Err(e),
        }
    }

    fn retain(&self) -> usize {
        match self.config.get(keys::RETAIN) {
            Ok(Some(value)) => value.trim().parse().unwrap_or_else(|_| {
                warn!("Ignoring invalid retain value {:?}", value);
                DEFAULT_RETAIN
            }),
            Ok(None) => DEFAULT_RETAIN,
            Err(e) => {
                warn!("Failed to read retain setting: {}", e);
                DEFAULT_RETAIN
            }
        }
    }

    fn prune(&self) {
        match self.sessions.cleanup(self.retain()) {
            Ok(0) => {}
            Ok(removed) => info!("Removed {} old anonymous sessions", removed),
            Err(e) => warn!("Session cleanup failed: {}", e),
        }
    }
}
