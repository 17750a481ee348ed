//! Timestamp utilities

use chrono::Utc;
use std::time::Duration;

/// Current wall-clock time as epoch milliseconds
///
/// Used for telemetry `timestamp` fields and residency touch times.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert an elapsed duration to fractional milliseconds rounded to
/// microsecond resolution (three decimal places)
pub fn duration_to_ms(elapsed: Duration) -> f64 {
    let ms = elapsed.as_secs_f64() * 1000.0;
    (ms * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_ms_is_after_2000() {
        assert!(now_ms() > 946_684_800_000);
    }

    #[test]
    fn test_now_ms_matches_chrono() {
        let before = Utc::now().timestamp_millis();
        let ms = now_ms();
        let after = Utc::now().timestamp_millis();
        assert!(before <= ms && ms <= after);
    }

    #[tokio::test]
    async fn test_now_ms_successive_calls_advance() {
        let t1 = now_ms();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let t2 = now_ms();
        assert!(t2 > t1);
    }

    #[test]
    fn test_duration_to_ms_zero() {
        assert_eq!(duration_to_ms(Duration::ZERO), 0.0);
    }

    #[test]
    fn test_duration_to_ms_rounds_to_microseconds() {
        // 1.2345678 ms -> 1.235 ms
        let elapsed = Duration::from_nanos(1_234_567);
        assert_eq!(duration_to_ms(elapsed), 1.235);
    }

    #[test]
    fn test_duration_to_ms_whole_seconds() {
        assert_eq!(duration_to_ms(Duration::from_secs(2)), 2000.0);
    }
}
