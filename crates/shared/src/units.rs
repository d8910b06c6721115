//! Numeric clamping and unit conversion for device telemetry.

/// Bytes in one mebibyte, the unit used for every "MB" figure in responses.
pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Clamps a value to `[0, 100]`. Non-finite values become 0.
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Clamps a value to `[0, +inf)`. Non-finite values become 0.
pub fn clamp_non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Converts a byte count to mebibytes.
pub fn bytes_to_mb(bytes: f64) -> f64 {
    bytes / BYTES_PER_MB
}

/// Converts mebibytes to whole bytes, saturating at `u64::MAX`.
pub fn mb_to_bytes(mb: f64) -> u64 {
    let bytes = clamp_non_negative(mb) * BYTES_PER_MB;
    if bytes >= u64::MAX as f64 {
        u64::MAX
    } else {
        bytes.round() as u64
    }
}

/// Rounds to one decimal place for human-readable output.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
