//! Configuration management
//!
//! Scalar settings are stored one file per key inside the qory config
//! directory, so they can be inspected and edited by hand.

pub mod dirs;
pub mod schema;
pub mod store;
pub mod validate;

pub use dirs::{config_dir, ConfigDirs};
pub use schema::LoggingConfig;
pub use store::{keys, ConfigStore, FileConfigStore};
pub use validate::validate_value;
