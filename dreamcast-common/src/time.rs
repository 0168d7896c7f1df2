//! Timestamp and clock-label utilities

use chrono::{DateTime, Local, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a playback position as `m:ss`.
///
/// Negative and non-finite values render as `0:00`, matching what the
/// transport labels show before a buffer is loaded.
pub fn format_clock(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0:00".to_string();
    }
    let whole = seconds.floor() as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}

/// Wall-clock label (`HH:MM`) shown by the screensaver.
pub fn wall_clock_label(at: DateTime<Local>) -> String {
    at.format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_now_returns_recent_timestamp() {
        let timestamp = now();
        assert!(timestamp.timestamp() > 946_684_800); // 2000-01-01
        assert!(timestamp.timestamp() < 4_102_444_800); // 2100-01-01
    }

    #[test]
    fn test_format_clock_zero_and_invalid() {
        assert_eq!(format_clock(0.0), "0:00");
        assert_eq!(format_clock(-3.0), "0:00");
        assert_eq!(format_clock(f64::NAN), "0:00");
        assert_eq!(format_clock(f64::INFINITY), "0:00");
    }

    #[test]
    fn test_format_clock_pads_seconds() {
        assert_eq!(format_clock(5.9), "0:05");
        assert_eq!(format_clock(61.0), "1:01");
        assert_eq!(format_clock(600.0), "10:00");
    }

    #[test]
    fn test_wall_clock_label() {
        let at = Local.with_ymd_and_hms(2024, 3, 1, 21, 7, 0).unwrap();
        assert_eq!(wall_clock_label(at), "21:07");
    }
}
