//! Shared validation helpers for configuration fields.

use validator::ValidationError;

/// Interface names follow Linux conventions: non-empty, at most 15
/// characters, alphanumeric plus underscore.
pub fn validate_interface(name: &str) -> Result<(), ValidationError> {
    let re = regex::Regex::new("^[a-zA-Z0-9_]{1,15}$")
        .map_err(|_| ValidationError::new("invalid_regex"))?;

    if re.is_match(name) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_interface"))
    }
}
