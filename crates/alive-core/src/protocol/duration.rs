//! Threshold durations as the board server sends them.
//!
//! `maxTBU` and `expireAfter` arrive as a JSON number of seconds, a string of
//! integer seconds (`"30"`), a Go duration string (`"90s"`, `"1h30m"`,
//! `"1.5h"`, `"250ms"`) or `""` meaning "not set".

use std::time::Duration;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

use super::errors::ProtocolError;

/// Parse a threshold string. Bare integers are seconds.
pub fn parse_duration(value: &str) -> Result<Duration, ProtocolError> {
    let trimmed = value.trim();
    let invalid = |reason: &str| ProtocolError::InvalidDuration {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    if trimmed.is_empty() {
        return Err(invalid("empty duration"));
    }
    if trimmed.starts_with('-') {
        return Err(invalid("negative duration"));
    }
    let body = trimmed.strip_prefix('+').unwrap_or(trimmed);

    if let Ok(secs) = body.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total_secs = 0f64;
    let mut rest = body;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return Err(invalid("expected a number"));
        }
        let number: f64 = rest[..number_len]
            .parse()
            .map_err(|_| invalid("bad number"))?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];

        let unit_secs = match unit {
            "ns" => 1e-9,
            "us" | "µs" | "μs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            "" => return Err(invalid("missing unit")),
            other => return Err(invalid(&format!("unknown unit '{other}'"))),
        };
        total_secs += number * unit_secs;
    }

    Duration::try_from_secs_f64(total_secs).map_err(|_| invalid("out of range"))
}

/// Format a duration the way Go prints it, truncated to whole seconds
/// (`1h2m5s`, `1m0s`, `45s`). Sub-second values print as milliseconds.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    if total == 0 {
        let millis = duration.subsec_millis();
        return if millis == 0 {
            "0s".to_string()
        } else {
            format!("{millis}ms")
        };
    }

    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawThreshold {
    Seconds(f64),
    Text(String),
}

/// Serde helper for optional thresholds.
///
/// Absent, `null` and `""` all become `None`; `0` / `"0"` become
/// `Some(Duration::ZERO)`, which callers treat as an explicit disable.
pub fn deserialize_threshold<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawThreshold>::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(RawThreshold::Seconds(secs)) => Duration::try_from_secs_f64(secs)
            .map(Some)
            .map_err(|_| D::Error::custom(format!("invalid duration: {secs}"))),
        Some(RawThreshold::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(RawThreshold::Text(text)) => parse_duration(&text)
            .map(Some)
            .map_err(D::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_integer_seconds() {
        assert_eq!(parse_duration("30").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_parse_go_style() {
        assert_eq!(parse_duration("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("0s").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("-5s").is_err());
        assert!(parse_duration("5x").is_err());
        assert!(parse_duration("s").is_err());
        assert!(parse_duration("1.5").is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::ZERO), "0s");
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_secs(45)), "45s");
        assert_eq!(format_duration(Duration::from_secs(60)), "1m0s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h2m5s");
        assert_eq!(format_duration(Duration::from_millis(2_900)), "2s");
    }

    #[derive(Deserialize)]
    struct Holder {
        #[serde(default, deserialize_with = "deserialize_threshold")]
        value: Option<Duration>,
    }

    fn threshold(json: &str) -> Option<Duration> {
        serde_json::from_str::<Holder>(json).unwrap().value
    }

    #[test]
    fn test_threshold_variants() {
        assert_eq!(threshold("{}"), None);
        assert_eq!(threshold(r#"{"value": null}"#), None);
        assert_eq!(threshold(r#"{"value": ""}"#), None);
        assert_eq!(threshold(r#"{"value": "0"}"#), Some(Duration::ZERO));
        assert_eq!(threshold(r#"{"value": 0}"#), Some(Duration::ZERO));
        assert_eq!(threshold(r#"{"value": 2}"#), Some(Duration::from_secs(2)));
        assert_eq!(threshold(r#"{"value": "2m"}"#), Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_threshold_rejects_negative_number() {
        assert!(serde_json::from_str::<Holder>(r#"{"value": -1}"#).is_err());
        assert!(serde_json::from_str::<Holder>(r#"{"value": "soon"}"#).is_err());
    }
}
