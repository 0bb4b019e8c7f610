//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Build a timestamped report file name, e.g. `bands_report_20250101_120000.json`
pub fn report_file_name(prefix: &str, timestamp: DateTime<Utc>, extension: &str) -> String {
    format!(
        "{}_{}.{}",
        prefix,
        timestamp.format("%Y%m%d_%H%M%S"),
        extension
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[test]
    fn test_report_file_name_format() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(
            report_file_name("combos_report", ts, "json"),
            "combos_report_20240309_070501.json"
        );
    }
}
