//! Rounding policy for work-log durations and the running clock display.

/// Jira `timeSpent` string for `seconds` of work.
///
/// Zero (or negative) time is `"0m"` and must not be logged; any positive
/// duration under a minute becomes `"1m"`; everything else is rounded up to
/// whole minutes and split into `<h>h <m>m`, dropping zero parts.
pub fn format_duration(seconds: i64) -> String {
    if seconds <= 0 {
        return "0m".to_string();
    }
    if seconds < 60 {
        return "1m".to_string();
    }

    let total_minutes = (seconds + 59) / 60;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    let mut parts = Vec::with_capacity(2);
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    parts.join(" ")
}

/// True when the formatted duration would be rejected as too short to log.
pub fn is_loggable(seconds: i64) -> bool {
    format_duration(seconds) != "0m"
}

/// `HH:MM:SS` rendering used while the timer runs.
pub fn format_clock(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn zero_is_not_loggable() {
        assert_eq!(format_duration(0), "0m");
        assert!(!is_loggable(0));
        assert_eq!(format_duration(-30), "0m");
    }

    #[test]
    fn sub_minute_rounds_up_to_one_minute() {
        assert_eq!(format_duration(1), "1m");
        assert_eq!(format_duration(45), "1m");
        assert_eq!(format_duration(59), "1m");
        assert!(is_loggable(1));
    }

    #[test]
    fn minutes_are_rounded_up() {
        assert_eq!(format_duration(60), "1m");
        assert_eq!(format_duration(61), "2m");
        assert_eq!(format_duration(3599), "1h");
    }

    #[test]
    fn hour_boundaries() {
        assert_eq!(format_duration(3600), "1h");
        assert_eq!(format_duration(3601), "1h 1m");
        assert_eq!(format_duration(3661), "1h 2m");
        assert_eq!(format_duration(7200 + 30 * 60), "2h 30m");
    }

    #[test]
    fn positive_durations_are_hour_and_minute_tokens() {
        let shape = Regex::new(r"^(\d+h)?( )?(\d+m)?$").unwrap();
        for seconds in (1..20_000).step_by(7) {
            let formatted = format_duration(seconds);
            assert!(!formatted.is_empty(), "{} produced empty output", seconds);
            assert!(shape.is_match(&formatted), "{} -> {}", seconds, formatted);
            assert!(formatted.ends_with('h') || formatted.ends_with('m'));
            assert!(!formatted.starts_with(' ') && !formatted.ends_with(' '));
        }
    }

    #[test]
    fn clock_pads_components() {
        assert_eq!(format_clock(0), "00:00:00");
        assert_eq!(format_clock(3725), "01:02:05");
        assert_eq!(format_clock(360_000), "100:00:00");
    }
}
