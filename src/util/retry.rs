//! Fixed-interval polling for readiness checks.

use std::time::Duration;

/// Poll `probe` up to `max_attempts` times, sleeping `interval` between
/// attempts. Returns true as soon as the probe succeeds, false once the
/// attempt budget is exhausted.
///
/// Used for readiness checks only — mutations are never retried here.
pub fn wait_until<F>(max_attempts: u32, interval: Duration, mut probe: F) -> bool
where
    F: FnMut() -> bool,
{
    for attempt in 0..max_attempts {
        if probe() {
            return true;
        }
        if attempt > 0 && attempt % 10 == 0 {
            crate::util::log::info(&format!(
                "Still waiting... ({}/{})",
                attempt, max_attempts
            ));
        }
        if attempt + 1 < max_attempts {
            std::thread::sleep(interval);
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_returns_true_immediately_on_success() {
        let mut calls = 0;
        let ok = wait_until(5, Duration::from_millis(0), || {
            calls += 1;
            true
        });
        assert!(ok);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_returns_true_on_later_success() {
        let mut calls = 0;
        let ok = wait_until(5, Duration::from_millis(0), || {
            calls += 1;
            calls == 3
        });
        assert!(ok);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_returns_false_after_max_attempts() {
        let mut calls = 0;
        let ok = wait_until(4, Duration::from_millis(0), || {
            calls += 1;
            false
        });
        assert!(!ok);
        assert_eq!(calls, 4);
    }

    #[test]
    fn test_zero_attempts_never_probes() {
        let mut calls = 0;
        let ok = wait_until(0, Duration::from_millis(0), || {
            calls += 1;
            true
        });
        assert!(!ok);
        assert_eq!(calls, 0);
    }
}
