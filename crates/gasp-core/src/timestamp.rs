//! Sync cursor validation.
//!
//! Cursors (`lastInteraction`, `since`) must be non-negative integers. Hosts
//! bridging from signed or floating-point clocks validate through here before
//! a value reaches the engine.

use crate::error::{CoreError, Result};

/// Validate a signed cursor value.
pub fn validate_timestamp(value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| CoreError::InvalidTimestamp(value.to_string()))
}

/// Validate a floating-point cursor value.
///
/// Rejects NaN, infinities, negative values and values with a fractional part.
pub fn validate_timestamp_f64(value: f64) -> Result<u64> {
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > u64::MAX as f64 {
        return Err(CoreError::InvalidTimestamp(value.to_string()));
    }
    Ok(value as u64)
}
