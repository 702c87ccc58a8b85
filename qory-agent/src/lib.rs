//! Query orchestration for qory
//!
//! Ties the session store, the configuration store and the completion
//! client together into the "ask a question" use case.

pub mod prompt;
pub mod query;

pub use prompt::build_user_prompt;
pub use query::{QueryOutcome, QueryRunner, SessionTarget, DEFAULT_RETAIN};
