use std::time::Duration;

use anyhow::{bail, Result};

/// Suffix to nanoseconds multiplier (order matters: longer suffixes first)
const UNITS: &[(&str, f64)] = &[
    ("ns", 1.0),
    ("µs", 1_000.0),
    ("us", 1_000.0),
    ("ms", 1_000_000.0),
    ("s", 1_000_000_000.0),
    ("m", 60_000_000_000.0),
    ("h", 3_600_000_000_000.0),
];

/// Parse duration strings like "5m", "10m", "1h", "500ms", "2.5s"
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();

    for (suffix, multiplier) in UNITS {
        if let Some(val_str) = s.strip_suffix(suffix) {
            let val: f64 = val_str.trim().parse()?;
            if !val.is_finite() || val < 0.0 {
                bail!("Duration out of range: {}", s);
            }
            return Ok(Duration::from_nanos((val * multiplier) as u64));
        }
    }

    bail!("Unknown duration format: {}", s)
}

/// Format a duration for display, using the largest whole unit
pub fn format_duration(d: Duration) -> String {
    let millis = d.as_millis();
    if millis == 0 && !d.is_zero() {
        format!("{}ns", d.as_nanos())
    } else if millis % 1_000 != 0 {
        format!("{}ms", millis)
    } else if millis % 3_600_000 == 0 && millis > 0 {
        format!("{}h", millis / 3_600_000)
    } else if millis % 60_000 == 0 && millis > 0 {
        format!("{}m", millis / 60_000)
    } else {
        format!("{}s", millis / 1_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minutes() {
        let d = parse_duration("5m").unwrap();
        assert_eq!(d, Duration::from_secs(300));
    }

    #[test]
    fn parse_hours() {
        let d = parse_duration("1h").unwrap();
        assert_eq!(d, Duration::from_secs(3600));
    }

    #[test]
    fn parse_milliseconds_not_minutes() {
        let d = parse_duration("500ms").unwrap();
        assert_eq!(d.as_millis(), 500);
    }

    #[test]
    fn parse_fractional_seconds() {
        let d = parse_duration("2.5s").unwrap();
        assert_eq!(d.as_millis(), 2_500);
    }

    #[test]
    fn parse_microseconds_with_us_suffix() {
        let d = parse_duration("500us").unwrap();
        assert_eq!(d.as_nanos(), 500_000);
    }

    #[test]
    fn parse_with_whitespace() {
        let d = parse_duration("  10m  ").unwrap();
        assert_eq!(d.as_secs(), 600);
    }

    #[test]
    fn parse_unknown_format_fails() {
        assert!(parse_duration("100x").is_err());
        assert!(parse_duration("300").is_err());
    }

    #[test]
    fn parse_invalid_number_fails() {
        assert!(parse_duration("abcm").is_err());
    }

    #[test]
    fn parse_negative_fails() {
        assert!(parse_duration("-5m").is_err());
    }

    #[test]
    fn format_zero() {
        assert_eq!(format_duration(Duration::ZERO), "0s");
    }

    #[test]
    fn format_picks_largest_whole_unit() {
        assert_eq!(format_duration(Duration::from_secs(3600)), "1h");
        assert_eq!(format_duration(Duration::from_secs(600)), "10m");
        assert_eq!(format_duration(Duration::from_secs(5)), "5s");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1500ms");
        assert_eq!(format_duration(Duration::from_nanos(500)), "500ns");
    }

    #[test]
    fn format_round_trips_through_parse() {
        for d in [
            Duration::from_secs(300),
            Duration::from_secs(5),
            Duration::from_millis(250),
        ] {
            assert_eq!(parse_duration(&format_duration(d)).unwrap(), d);
        }
    }
}
