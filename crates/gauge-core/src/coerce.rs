//! # Coercion Subsystem
//!
//! Best-effort conversion of an input toward a target kind, attempted by
//! coercible shapes before they reject a value of the wrong kind.
//!
//! Every function returns a [`Coerced`]: `Some(value)` on success, or
//! [`NEVER`] when the conversion is impossible. Callers only ever test for
//! `NEVER`; a failed coercion carries no further information.
//!
//! ## Stability
//!
//! - A value that is already of the target kind is returned as the *same*
//!   value (identity preserved), so a coerced value is a fixed point.
//! - Conversions are deterministic: an input that yields `NEVER` always
//!   yields `NEVER`.
//!
//! Scalar targets unwrap a single-element array before converting, so
//! `["42"]` coerces to the number `42`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::value::{dedup, iso_string, Value};

/// Outcome of a coercion attempt.
pub type Coerced = Option<Value>;

/// The "coercion impossible" marker.
pub const NEVER: Coerced = None;

/// Largest integer a `Number` represents exactly (`2^53 - 1`).
pub const MAX_SAFE_INTEGER: i128 = 9_007_199_254_740_991;

/// Unwrap a single-element array; other arrays cannot become scalars.
fn scalar(value: &Value) -> Coerced {
    match value {
        Value::Array(items) => {
            if items.len() == 1 {
                items.get(0)
            } else {
                NEVER
            }
        }
        other => Some(other.clone()),
    }
}

/// Coerce to a number.
pub fn number(value: &Value) -> Coerced {
    if let Value::Number(n) = value {
        return if n.is_nan() { NEVER } else { Some(value.clone()) };
    }
    let n = match scalar(value)? {
        Value::Number(n) => n,
        Value::Undefined | Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(b)),
        Value::String(s) => parse_number(&s)?,
        Value::BigInt(n) if n.abs() <= MAX_SAFE_INTEGER => n as f64,
        Value::Date(d) => d.timestamp_millis() as f64,
        _ => return NEVER,
    };
    if n.is_nan() {
        NEVER
    } else {
        Some(Value::Number(n))
    }
}

/// Coerce to a string.
pub fn string(value: &Value) -> Coerced {
    if let Value::String(_) = value {
        return Some(value.clone());
    }
    let text = match scalar(value)? {
        Value::String(s) => return Some(Value::String(s)),
        Value::Undefined | Value::Null => String::new(),
        Value::Number(n) if n.is_finite() => format_number(n),
        Value::Bool(b) => b.to_string(),
        Value::BigInt(n) => n.to_string(),
        Value::Date(d) => iso_string(&d),
        _ => return NEVER,
    };
    Some(Value::from(text))
}

/// Coerce to a boolean.
pub fn boolean(value: &Value) -> Coerced {
    if let Value::Bool(_) = value {
        return Some(value.clone());
    }
    let b = match scalar(value)? {
        Value::Bool(b) => b,
        Value::Undefined | Value::Null => false,
        Value::Number(n) if n == 0.0 => false,
        Value::Number(n) if n == 1.0 => true,
        Value::String(s) if &*s == "false" => false,
        Value::String(s) if &*s == "true" => true,
        _ => return NEVER,
    };
    Some(Value::Bool(b))
}

/// Coerce to a bigint.
pub fn bigint(value: &Value) -> Coerced {
    if let Value::BigInt(_) = value {
        return Some(value.clone());
    }
    let n = match scalar(value)? {
        Value::BigInt(n) => n,
        Value::Undefined | Value::Null => 0,
        Value::Bool(b) => i128::from(b),
        Value::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1.7e38 => n as i128,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return NEVER;
            }
            trimmed.parse::<i128>().ok()?
        }
        _ => return NEVER,
    };
    Some(Value::BigInt(n))
}

/// Coerce to a date.
pub fn date(value: &Value) -> Coerced {
    if let Value::Date(_) = value {
        return Some(value.clone());
    }
    let d = match scalar(value)? {
        Value::Date(d) => d,
        Value::String(s) => parse_date(&s)?,
        Value::Number(n) if n.is_finite() => DateTime::from_timestamp_millis(n.trunc() as i64)?,
        _ => return NEVER,
    };
    Some(Value::Date(d))
}

/// Coerce to an array.
///
/// Sets become their members, maps become `[key, value]` pair arrays and
/// any other value is wrapped as a singleton.
pub fn array(value: &Value) -> Coerced {
    let items = match value {
        Value::Array(_) => return Some(value.clone()),
        Value::Set(s) => s.values(),
        Value::Map(m) => pair_arrays(m.entries()),
        other => vec![other.clone()],
    };
    Some(Value::array(items))
}

/// Coerce to a set.
///
/// Arrays are deduplicated, maps become `[key, value]` pair arrays and any
/// other value is wrapped as a singleton.
pub fn set(value: &Value) -> Coerced {
    let items = match value {
        Value::Set(_) => return Some(value.clone()),
        Value::Array(a) => dedup(a.to_vec()),
        Value::Map(m) => pair_arrays(m.entries()),
        other => vec![other.clone()],
    };
    Some(Value::set(items))
}

/// Coerce to a map.
///
/// Accepts arrays of two-element arrays and plain objects. Anything else is
/// [`NEVER`].
pub fn map(value: &Value) -> Coerced {
    match value {
        Value::Map(_) => Some(value.clone()),
        Value::Object(o) => Some(Value::map(
            o.entries().into_iter().map(|(k, v)| (Value::from(k), v)),
        )),
        Value::Array(a) => {
            let mut pairs = Vec::with_capacity(a.len());
            for item in a.to_vec() {
                let Value::Array(pair) = item else {
                    return NEVER;
                };
                if pair.len() != 2 {
                    return NEVER;
                }
                let (Some(k), Some(v)) = (pair.get(0), pair.get(1)) else {
                    return NEVER;
                };
                pairs.push((k, v));
            }
            Some(Value::map(pairs))
        }
        _ => NEVER,
    }
}

fn pair_arrays(entries: Vec<(Value, Value)>) -> Vec<Value> {
    entries
        .into_iter()
        .map(|(k, v)| Value::array([k, v]))
        .collect()
}

/// Parse a numeric string the way `Number(string)` does, except that blank
/// strings are rejected instead of becoming zero.
pub fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed {
        "Infinity" | "+Infinity" => return Some(f64::INFINITY),
        "-Infinity" => return Some(f64::NEG_INFINITY),
        _ => {}
    }
    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = trimmed.strip_prefix(prefix) {
            return u64::from_str_radix(digits, radix).ok().map(|n| n as f64);
        }
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| !n.is_nan())
}

/// Render a finite number the way `String(number)` does.
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    let abs = n.abs();
    if n.fract() == 0.0 && abs < 1e21 {
        return format!("{}", n as i128);
    }
    if abs >= 1e21 || abs < 1e-6 {
        let rendered = format!("{n:e}");
        return match rendered.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => rendered,
        };
    }
    format!("{n}")
}

/// Parse an RFC 3339 timestamp, a `YYYY-MM-DD` date or a zone-less
/// `YYYY-MM-DDTHH:MM:SS[.fff]` timestamp (taken as UTC). Sub-millisecond
/// precision is dropped.
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let trimmed = s.trim();
    let parsed = if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        dt.with_timezone(&Utc)
    } else if let Ok(day) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        day.and_hms_opt(0, 0, 0)?.and_utc()
    } else if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        naive.and_utc()
    } else {
        return None;
    };
    DateTime::from_timestamp_millis(parsed.timestamp_millis())
}
