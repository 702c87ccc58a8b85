//! Session management for conversation history
//!
//! Each session is stored as one JSON file named after its ID inside the
//! sessions directory. The file modification time is the session's recency.

pub mod manager;
pub mod message;
pub mod store;

pub use manager::{
    is_anonymous_id, is_valid_id, new_anonymous_id, SessionManager, SESSIONS_DIR_NAME,
};
pub use message::{Message, Role};
pub use store::{Session, SessionPreview};
