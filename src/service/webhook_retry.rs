use chrono::{DateTime, Duration, Utc};

/// Maximum delivery attempts per webhook. After this many failures the
/// delivery is left permanently unsuccessful.
pub const MAX_RETRIES: i32 = 3;

pub fn should_retry(attempts: i32, max_retries: i32) -> bool {
    attempts < max_retries
}

/// Exponential backoff: 2^attempts seconds (2s, 4s, 8s, ...), exponent
/// capped to keep the arithmetic bounded.
pub fn backoff(attempts: i32) -> Duration {
    let exp = attempts.clamp(1, 8) as u32;
    Duration::seconds(2_i64.pow(exp))
}

/// Schedule for the delivery after an attempt has been recorded.
/// `attempts` is the count including the attempt that just ran. `None`
/// means terminal: delivered, or retries exhausted.
pub fn plan_next_attempt(
    attempts: i32,
    success: bool,
    max_retries: i32,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if success || !should_retry(attempts, max_retries) {
        return None;
    }
    Some(now + backoff(attempts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        assert_eq!(backoff(1), Duration::seconds(2));
        assert_eq!(backoff(2), Duration::seconds(4));
        assert_eq!(backoff(3), Duration::seconds(8));
    }

    #[test]
    fn backoff_exponent_is_capped() {
        assert_eq!(backoff(40), Duration::seconds(256));
    }

    #[test]
    fn third_failure_is_terminal() {
        let now = Utc::now();
        assert!(plan_next_attempt(1, false, MAX_RETRIES, now).is_some());
        assert!(plan_next_attempt(2, false, MAX_RETRIES, now).is_some());
        assert_eq!(plan_next_attempt(3, false, MAX_RETRIES, now), None);
    }

    #[test]
    fn success_never_reschedules() {
        let now = Utc::now();
        assert_eq!(plan_next_attempt(1, true, MAX_RETRIES, now), None);
    }

    #[test]
    fn retry_lands_at_backoff_offset() {
        let now = Utc::now();
        let next = plan_next_attempt(2, false, MAX_RETRIES, now).unwrap();
        assert_eq!(next - now, Duration::seconds(4));
    }
}
