//! Validation functions for configuration values.

use sanitize_filename::{is_sanitized, sanitize};
use validator::ValidationError;

/// Units accepted by `borg prune --keep-within`
static KEEP_WITHIN_UNITS: &[char] = &['H', 'd', 'w', 'm', 'y'];

pub fn validate_not_blank<S: AsRef<str>>(value: S) -> Result<(), ValidationError> {
    if value.as_ref().trim().is_empty() {
        return Err(ValidationError::new("Blank").with_message("must not be blank".into()));
    }

    Ok(())
}

/// An archive prefix ends up inside borg archive names and prune globs, so it
/// has to be a plain file name without glob characters. Empty means "use the
/// hostname".
pub fn validate_archive_prefix<S: AsRef<str>>(prefix: S) -> Result<(), ValidationError> {
    let prefix = prefix.as_ref();
    if prefix.is_empty() {
        return Ok(());
    }

    if !is_sanitized(prefix) {
        return Err(ValidationError::new("InvalidArchivePrefix").with_message(
            format!(
                "Invalid archive prefix, try sanitizing like {:?}",
                sanitize(prefix)
            )
            .into(),
        ));
    }

    if prefix.chars().any(|c| matches!(c, '*' | '?' | '[' | ']') || c.is_whitespace()) {
        return Err(ValidationError::new("InvalidArchivePrefix").with_message(
            format!("Archive prefix {prefix:?} must not contain glob characters or whitespace")
                .into(),
        ));
    }

    Ok(())
}

/// `keep_within` is either empty or a positive count followed by one unit.
pub fn validate_keep_within<S: AsRef<str>>(interval: S) -> Result<(), ValidationError> {
    let interval = interval.as_ref();
    if interval.is_empty() {
        return Ok(());
    }

    let valid = interval
        .char_indices()
        .last()
        .filter(|(_, unit)| KEEP_WITHIN_UNITS.contains(unit))
        .map(|(idx, _)| &interval[..idx])
        .and_then(|count| count.parse::<u64>().ok())
        .is_some_and(|count| count > 0);

    if !valid {
        return Err(ValidationError::new("InvalidKeepWithin").with_message(
            format!(
                "Invalid keep_within {interval:?}, expected a number followed by one of {KEEP_WITHIN_UNITS:?}"
            )
            .into(),
        ));
    }

    Ok(())
}

pub fn validate_server_url<S: AsRef<str>>(server: S) -> Result<(), ValidationError> {
    let server = server.as_ref();
    if server.is_empty() || server.starts_with("http://") || server.starts_with("https://") {
        return Ok(());
    }

    Err(ValidationError::new("InvalidServer").with_message(
        format!("Notification server {server:?} must start with http:// or https://").into(),
    ))
}
