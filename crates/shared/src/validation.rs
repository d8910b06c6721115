//! Common validation utilities.

use chrono::{TimeZone, Utc};
use validator::ValidationError;

/// Maximum length of a device identifier.
pub const MAX_DEVICE_ID_LENGTH: usize = 128;

/// Validates that a device identifier is non-blank and uses a safe character set.
///
/// Accepts alphanumerics plus `-`, `_`, `.` and `:` so that UUIDs, Android IDs
/// and vendor serials all pass.
pub fn validate_device_id(device_id: &str) -> Result<(), ValidationError> {
    let trimmed = device_id.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("device_id_blank");
        err.message = Some("Device ID must not be blank".into());
        return Err(err);
    }

    if trimmed.len() > MAX_DEVICE_ID_LENGTH {
        let mut err = ValidationError::new("device_id_length");
        err.message = Some("Device ID must be at most 128 characters".into());
        return Err(err);
    }

    if trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
    {
        Ok(())
    } else {
        let mut err = ValidationError::new("device_id_charset");
        err.message = Some(
            "Device ID may only contain letters, digits, '-', '_', '.' and ':'".into(),
        );
        Err(err)
    }
}

/// Validates that a capture timestamp (seconds since epoch) is non-negative
/// and representable as a calendar date.
pub fn validate_capture_timestamp(timestamp_secs: i64) -> Result<(), ValidationError> {
    if timestamp_secs < 0 {
        let mut err = ValidationError::new("timestamp_negative");
        err.message = Some("Timestamp must be non-negative".into());
        return Err(err);
    }

    if Utc.timestamp_opt(timestamp_secs, 0).single().is_none() {
        let mut err = ValidationError::new("timestamp_invalid");
        err.message = Some("Invalid timestamp format".into());
        return Err(err);
    }

    Ok(())
}
