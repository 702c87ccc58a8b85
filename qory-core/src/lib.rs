//! Core types for qory
//!
//! This crate provides the message model, the file-backed session store,
//! the keyed configuration store and the logging setup shared by the
//! other qory crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod session;
pub mod utils;

pub use error::{Error, Result};
