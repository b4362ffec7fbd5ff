//! Serde helpers for the appliance's loose JSON typing.
//!
//! Responsibilities:
//! - Accept either JSON numbers or strings for identifiers and lifetimes.
//!
//! Invariants / assumptions:
//! - Identifiers are numeric on current appliances but are kept as strings
//!   so they can be spliced into paths unchanged.
//! - These helpers must not log or print secrets; errors are generic parse errors.

use serde::Deserialize;
use serde::de::Error as _;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    U64(u64),
    I64(i64),
}

/// Deserialize an identifier that may be a JSON number or string.
pub fn string_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::U64(v) => v.to_string(),
        StringOrNumber::I64(v) => v.to_string(),
    })
}

/// Deserialize an optional non-negative integer that may be quoted.
pub fn opt_u64_from_string_or_number<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<StringOrNumber>::deserialize(deserializer)? {
        None => Ok(None),
        Some(StringOrNumber::U64(v)) => Ok(Some(v)),
        Some(StringOrNumber::I64(v)) => u64::try_from(v).map(Some).map_err(D::Error::custom),
        Some(StringOrNumber::String(s)) => s.trim().parse::<u64>().map(Some).map_err(D::Error::custom),
    }
}
