//! Deadline validation for extractor attempts

use std::time::Duration;

use crate::utils::errors::UnfurlError;

/// Maximum deadline for a single fetch or render attempt (5 minutes)
/// Covers slow-loading sites, heavy SPAs, and network delays
pub const MAX_DEADLINE_MS: u64 = 300_000; // 5 minutes

/// Validate a configured deadline
///
/// # Arguments
/// * `name` - Config key, used in the error message
/// * `deadline_ms` - Configured deadline in milliseconds
///
/// # Returns
/// * `Ok(Duration)` - Validated Duration object
/// * `Err(UnfurlError::Config)` - Zero, or exceeds MAX_DEADLINE_MS
///
/// # Example
/// ```rust
/// use kodegen_tools_link_preview::validate_deadline;
///
/// let timeout = validate_deadline("fetch.timeout_ms", 10_000).unwrap();
/// assert_eq!(timeout.as_secs(), 10);
/// ```
pub fn validate_deadline(name: &str, deadline_ms: u64) -> Result<Duration, UnfurlError> {
    if deadline_ms == 0 {
        return Err(UnfurlError::Config(format!("{name} must be greater than 0ms")));
    }

    if deadline_ms > MAX_DEADLINE_MS {
        return Err(UnfurlError::Config(format!(
            "{} cannot exceed {}ms ({} minutes). Received: {}ms ({:.1} minutes)",
            name,
            MAX_DEADLINE_MS,
            MAX_DEADLINE_MS / 60_000,
            deadline_ms,
            deadline_ms as f64 / 60_000.0
        )));
    }

    Ok(Duration::from_millis(deadline_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_deadline_within_bounds() {
        let d = validate_deadline("render.timeout_ms", 30_000).unwrap();
        assert_eq!(d, Duration::from_secs(30));
    }

    #[test]
    fn rejects_zero_and_oversized_deadlines() {
        assert!(matches!(
            validate_deadline("fetch.timeout_ms", 0),
            Err(UnfurlError::Config(_))
        ));
        let err = validate_deadline("fetch.timeout_ms", MAX_DEADLINE_MS + 1).unwrap_err();
        assert!(err.to_string().contains("fetch.timeout_ms"));
    }
}
