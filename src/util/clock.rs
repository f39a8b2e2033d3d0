//! Clock helpers.
//!
//! Deadlines are `Instant`s so wall-clock adjustments never move them.

use std::time::{Duration, Instant};

use crate::core::SchedulerError;

/// Upper bound used when `now + delay` overflows the platform `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// Monotonic instant `delay` from now, saturating at a far-future bound.
#[must_use]
pub fn deadline_after(delay: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(delay)
        .unwrap_or_else(|| now + FAR_FUTURE)
}

/// Time left until `deadline`, zero once it has passed.
#[must_use]
pub fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
#[must_use]
pub fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Convert fractional seconds into a delay.
///
/// # Errors
///
/// Returns `SchedulerError::InvalidArgument` for negative, NaN or
/// unrepresentable values.
pub fn duration_from_secs(secs: f64) -> Result<Duration, SchedulerError> {
    if secs.is_nan() || secs < 0.0 {
        return Err(SchedulerError::InvalidArgument(format!(
            "delay must be a non-negative number of seconds, got {secs}"
        )));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| SchedulerError::InvalidArgument(format!("delay out of range: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_from_secs() {
        assert_eq!(duration_from_secs(0.25).unwrap(), Duration::from_millis(250));
        assert_eq!(duration_from_secs(0.0).unwrap(), Duration::ZERO);
        assert!(duration_from_secs(-0.1).is_err());
        assert!(duration_from_secs(f64::NAN).is_err());
        assert!(duration_from_secs(f64::INFINITY).is_err());
    }

    #[test]
    fn test_deadline_after_saturates() {
        let far = deadline_after(Duration::MAX);
        assert!(far > Instant::now() + Duration::from_secs(60 * 60 * 24 * 365));
    }

    #[test]
    fn test_remaining_is_zero_after_deadline() {
        let past = Instant::now();
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(remaining(past), Duration::ZERO);
        assert!(remaining(deadline_after(Duration::from_secs(5))) > Duration::from_secs(4));
    }

    #[test]
    fn test_millis_saturates() {
        assert_eq!(millis(Duration::from_millis(1500)), 1500);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }
}
