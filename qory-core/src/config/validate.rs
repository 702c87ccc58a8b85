//! Configuration validation rules.

use super::store::keys;

/// Validate a value before it is written under `key`
pub fn validate_value(key: &str, value: &str) -> crate::Result<()> {
    let error = match key {
        keys::BASE_URL if !value.ends_with('/') => Some("base_url must end with a '/'"),
        keys::RETAIN if value.trim().parse::<usize>().is_err() => {
            Some("retain must be a non-negative integer")
        }
        keys::MODEL if value.trim().is_empty() => Some("model must not be empty"),
        _ => None,
    };

    match error {
        Some(message) => Err(crate::Error::Validation(message.to_string())),
        None => Ok(()),
    }
}
