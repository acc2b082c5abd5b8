//! Time window parsing
//!
//! Converts human-readable duration strings such as `"10 s"` or `"5 m"` into
//! milliseconds. The format is `"<positive integer> <unit>"` with unit one of
//! `ms`, `s`, `m`, `h`, `d`.

use crate::utils::error::{RatelimitError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Parse a time window string into milliseconds.
///
/// # Examples
///
/// ```
/// use ratelimit_rs::parse_time_window;
///
/// assert_eq!(parse_time_window("5 s").unwrap(), 5000);
/// assert_eq!(parse_time_window("2 m").unwrap(), 120000);
/// ```
///
/// # Errors
///
/// Returns [`RatelimitError::InvalidTimeValue`] when the numeric part is
/// missing, non-numeric or not positive, and
/// [`RatelimitError::InvalidTimeUnit`] when the unit is not recognized.
pub fn parse_time_window(window: &str) -> Result<u64> {
    let mut parts = window.split_whitespace();

    let value = parts
        .next()
        .ok_or_else(|| RatelimitError::InvalidTimeValue(window.to_string()))?;
    let unit = parts
        .next()
        .ok_or_else(|| RatelimitError::InvalidTimeUnit(window.to_string()))?;
    if parts.next().is_some() {
        return Err(RatelimitError::InvalidTimeUnit(window.to_string()));
    }

    let value: i64 = value
        .parse()
        .map_err(|_| RatelimitError::InvalidTimeValue(window.to_string()))?;
    if value <= 0 {
        return Err(RatelimitError::InvalidTimeValue(window.to_string()));
    }

    let factor: u64 = match unit {
        "ms" => 1,
        "s" => 1_000,
        "m" => 60_000,
        "h" => 3_600_000,
        "d" => 86_400_000,
        _ => return Err(RatelimitError::InvalidTimeUnit(window.to_string())),
    };

    Ok(value as u64 * factor)
}

/// A validated time window, stored as milliseconds.
///
/// Parses from the same `"<value> <unit>"` strings as [`parse_time_window`],
/// which lets host configuration files carry windows like `"10 s"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeWindow(u64);

impl TimeWindow {
    /// Window length in milliseconds
    pub fn as_millis(&self) -> u64 {
        self.0
    }
}

impl FromStr for TimeWindow {
    type Err = RatelimitError;

    fn from_str(s: &str) -> Result<Self> {
        parse_time_window(s).map(TimeWindow)
    }
}

impl From<TimeWindow> for u64 {
    fn from(window: TimeWindow) -> u64 {
        window.0
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ms", self.0)
    }
}

impl Serialize for TimeWindow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeWindow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_window_units() {
        assert_eq!(parse_time_window("100 ms").unwrap(), 100);
        assert_eq!(parse_time_window("5 s").unwrap(), 5000);
        assert_eq!(parse_time_window("2 m").unwrap(), 120_000);
        assert_eq!(parse_time_window("1 h").unwrap(), 3_600_000);
        assert_eq!(parse_time_window("1 d").unwrap(), 86_400_000);
    }

    #[test]
    fn test_parse_time_window_invalid_values() {
        assert!(matches!(
            parse_time_window("0 s"),
            Err(RatelimitError::InvalidTimeValue(_))
        ));
        assert!(matches!(
            parse_time_window("-5 s"),
            Err(RatelimitError::InvalidTimeValue(_))
        ));
        assert!(matches!(
            parse_time_window("invalid s"),
            Err(RatelimitError::InvalidTimeValue(_))
        ));
    }

    #[test]
    fn test_parse_time_window_invalid_units() {
        assert!(matches!(
            parse_time_window("10 xyz"),
            Err(RatelimitError::InvalidTimeUnit(_))
        ));
        assert!(matches!(
            parse_time_window("10"),
            Err(RatelimitError::InvalidTimeUnit(_))
        ));
        assert!(matches!(
            parse_time_window("10 s extra"),
            Err(RatelimitError::InvalidTimeUnit(_))
        ));
    }

    #[test]
    fn test_time_window_from_str() {
        let window: TimeWindow = "10 s".parse().unwrap();
        assert_eq!(window.as_millis(), 10_000);
        assert_eq!(u64::from(window), 10_000);

        assert!("banana".parse::<TimeWindow>().is_err());
    }

    #[test]
    fn test_time_window_serde() {
        let window: TimeWindow = serde_json::from_str("\"30 s\"").unwrap();
        assert_eq!(window.as_millis(), 30_000);

        assert!(serde_json::from_str::<TimeWindow>("\"0 s\"").is_err());
    }
}
