use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;

/// Timeout applied to a request when none is configured: five minutes
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// The timed operation did not finish in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Request timed out after {duration:?}")]
pub struct Elapsed {
    pub duration: Duration,
}

/// Race `future` against `duration`.
///
/// When the deadline passes first the future is dropped, abandoning whatever
/// work it had in flight.
pub async fn with_timeout<F>(future: F, duration: Duration) -> Result<F::Output, Elapsed>
where
    F: Future,
{
    timeout(duration, future)
        .await
        .map_err(|_| Elapsed { duration })
}

/// Check if a duration is usable as a request timeout
pub fn is_valid_timeout(duration: Duration) -> bool {
    duration > Duration::ZERO
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeout() {
        assert_eq!(DEFAULT_TIMEOUT, Duration::from_secs(300));
        assert!(is_valid_timeout(DEFAULT_TIMEOUT));
        assert!(!is_valid_timeout(Duration::ZERO));
    }

    #[tokio::test]
    async fn test_completes_before_deadline() {
        let result = with_timeout(async { 7 }, Duration::from_secs(1)).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fires() {
        let slow = tokio::time::sleep(Duration::from_secs(60));
        let result = with_timeout(slow, Duration::from_secs(2)).await;

        let elapsed = result.unwrap_err();
        assert_eq!(elapsed.duration, Duration::from_secs(2));
        assert_eq!(elapsed.to_string(), "Request timed out after 2s");
    }
}
