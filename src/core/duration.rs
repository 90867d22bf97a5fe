//! Engine-style duration literals: `500ms`, `30s`, `1m`, `1m30s`, `2h`.

#![allow(missing_docs)]

use std::time::Duration;

use crate::core::errors::{RampError, Result};

/// Parse a duration literal made of one or more `<integer><unit>` segments.
///
/// Units are `ms`, `s`, `m`, `h`. Segments are summed, so `1m30s` is 90 seconds.
pub fn parse_duration(raw: &str) -> Result<Duration> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(parse_error(raw, "empty duration"));
    }

    let mut total = Duration::ZERO;
    let mut rest = text;
    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| parse_error(raw, "missing unit"))?;
        if digits_end == 0 {
            return Err(parse_error(raw, "expected a number"));
        }
        let value: u64 = rest[..digits_end]
            .parse()
            .map_err(|_| parse_error(raw, "number out of range"))?;
        rest = &rest[digits_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(rest.len());
        let segment = match &rest[..unit_end] {
            "ms" => Duration::from_millis(value),
            "s" => Duration::from_secs(value),
            "m" => Duration::from_secs(value.saturating_mul(60)),
            "h" => Duration::from_secs(value.saturating_mul(3_600)),
            other => return Err(parse_error(raw, &format!("unknown unit {other:?}"))),
        };
        total = total.saturating_add(segment);
        rest = &rest[unit_end..];
    }
    Ok(total)
}

/// Render a duration as the shortest literal that [`parse_duration`] reads back.
#[must_use]
pub fn format_duration(value: Duration) -> String {
    let total_ms = value.as_millis();
    if total_ms == 0 {
        return "0s".to_string();
    }

    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let seconds = (total_ms % 60_000) / 1_000;
    let millis = total_ms % 1_000;

    let mut out = String::new();
    for (amount, unit) in [(hours, "h"), (minutes, "m"), (seconds, "s"), (millis, "ms")] {
        if amount > 0 {
            out.push_str(&format!("{amount}{unit}"));
        }
    }
    out
}

fn parse_error(raw: &str, reason: &str) -> RampError {
    RampError::ConfigParse {
        context: "duration",
        details: format!("{raw:?}: {reason}"),
    }
}

/// `#[serde(with = "...")]` adapter storing a [`Duration`] as a literal string.
pub mod literal {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_duration(*value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_units() {
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3_600));
    }

    #[test]
    fn parses_compound_literals() {
        assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(
            parse_duration("1h2m3s4ms").unwrap(),
            Duration::from_millis(3_723_004)
        );
    }

    #[test]
    fn rejects_malformed_literals() {
        for raw in ["", "30", "s", "10x", "1.5s", "-5s", "m30"] {
            let err = parse_duration(raw).expect_err(raw);
            assert_eq!(err.code(), "RC-1003", "{raw}: {err}");
        }
    }

    #[test]
    fn formats_shortest_literal() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(60)), "1m");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m30s");
        assert_eq!(format_duration(Duration::from_millis(1_500)), "1s500ms");
        assert_eq!(format_duration(Duration::ZERO), "0s");
    }

    #[test]
    fn format_then_parse_is_identity_for_whole_millis() {
        for ms in [1_u64, 999, 1_000, 61_001, 3_600_000, 5_400_250] {
            let d = Duration::from_millis(ms);
            assert_eq!(parse_duration(&format_duration(d)).unwrap(), d);
        }
    }
}
