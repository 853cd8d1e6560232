//! Serde helper for duration strings like "500ms", "10s", "2m".

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{self, Deserialize, Deserializer};
use std::str::FromStr;
use std::time::Duration;

pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    // A null timeout falls back to the client default.
    Option::<String>::deserialize(deserializer)?
        .as_deref()
        .map_or(Ok(Duration::ZERO), parse_duration)
        .map_err(serde::de::Error::custom)
}

/// Parses "<number><unit>" where unit is one of ms, s, m, h. A bare number means seconds.
pub(crate) fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(Duration::ZERO);
    }

    let split = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);

    let value = Decimal::from_str(number).map_err(|_| format!("invalid duration number: {}", number))?;

    let millis_per_unit = match unit.trim() {
        "ms" => 1,
        "s" | "" => 1_000,
        "m" => 60_000,
        "h" => 3_600_000,
        other => return Err(format!("unknown duration unit: {}", other)),
    };

    let millis = (value * Decimal::from(millis_per_unit))
        .trunc()
        .to_u64()
        .ok_or_else(|| format!("duration out of range: {}", s))?;

    Ok(Duration::from_millis(millis))
}
