//! Integer coercion shared by the store, device messages and settings page
//! responses.
//!
//! Values travel as decimal strings in storage and as loosely typed JSON on
//! the wire, so every read goes through leading-integer parsing: surrounding
//! whitespace and a sign are accepted, trailing garbage is ignored, and a
//! string without leading digits has no value.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Parses the leading integer of `input`, `"12abc"` gives 12, `"abc"` gives `None`.
pub fn parse_int(input: &str) -> Option<i32> {
    let trimmed = input.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let magnitude = digits[..end].parse::<i64>().ok()?;
    let value = if negative { -magnitude } else { magnitude };
    i32::try_from(value).ok()
}

/// Coerces a JSON value to an integer. Floats are truncated toward zero,
/// strings use [`parse_int`], everything else has no integer value.
pub fn value_to_int(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i32::try_from(i).ok()
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite())
                    .map(f64::trunc)
                    .filter(|f| *f >= i32::MIN as f64 && *f <= i32::MAX as f64)
                    .map(|f| f as i32)
            }
        }
        Value::String(s) => parse_int(s),
        _ => None,
    }
}

/// Serde adapter for sparse integer fields: anything that does not coerce is
/// treated as absent.
pub(crate) fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_int))
}
