//! Utility functions and helpers

use chrono::Utc;

/// Current time in epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Sanitize string for logging (remove sensitive data)
pub fn sanitize_for_logging(s: &str) -> String {
    if s.len() <= 8 {
        return "*".repeat(s.len());
    }
    let head: String = s.chars().take(4).collect();
    format!("{}...", head)
}

/// Number of logical processors available to this process
pub fn available_processors() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_for_logging() {
        assert_eq!(sanitize_for_logging("short"), "*****");
        assert_eq!(sanitize_for_logging("b3f1c2d4-0000-token"), "b3f1...");
    }

    #[test]
    fn test_now_millis_is_recent() {
        let now = now_millis();
        assert!(now > 1_600_000_000_000);
    }

    #[test]
    fn test_available_processors_at_least_one() {
        assert!(available_processors() >= 1);
    }
}
