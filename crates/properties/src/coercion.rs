//! Scalar coercion grammar
//!
//! Pure functions that turn a stored [`Value`] into a typed result.
//! Numeric strings accept a few extras on top of plain integers:
//!
//! - `weekly`, `daily`, `hourly` resolve to milliseconds
//! - a trailing `K`, `M`, `G` or `T` multiplies by the matching power of 1024
//! - anything with a `.` is parsed as a double and rounded half-up
//!
//! Thread counts additionally understand `{processors}` with one trailing
//! arithmetic operator, e.g. `{processors} * 2`.

use crate::value::{Scalar, Value};
use types::CoercionError;

const HOUR_MS: i64 = 60 * 60 * 1000;
const DAY_MS: i64 = 24 * HOUR_MS;
const WEEK_MS: i64 = 7 * DAY_MS;

const KILO: i64 = 1 << 10;
const MEGA: i64 = 1 << 20;
const GIGA: i64 = 1 << 30;
const TERA: i64 = 1 << 40;

/// Token replaced by the host's logical processor count
pub const PROCESSORS_TOKEN: &str = "{processors}";

/// Read a value as a boolean. Never fails: unrecognised input is `false`.
pub fn as_bool(value: &Value) -> bool {
    match value {
        Value::Scalar(Scalar::Bool(b)) => *b,
        Value::Scalar(Scalar::String(s)) => parse_bool(s),
        _ => false,
    }
}

/// `enable`/`disable` synonyms, then case-insensitive `true`
pub fn parse_bool(s: &str) -> bool {
    let s = s.trim();
    if s.eq_ignore_ascii_case("enable") {
        return true;
    }
    if s.eq_ignore_ascii_case("disable") {
        return false;
    }
    s.eq_ignore_ascii_case("true")
}

/// Read a value as a 64-bit integer
pub fn as_long(value: &Value) -> Result<i64, CoercionError> {
    match value {
        Value::Scalar(Scalar::Integer(i)) => Ok(*i),
        Value::Scalar(Scalar::Float(f)) => round_half_up(*f),
        Value::Scalar(Scalar::String(s)) => parse_long(s),
        other => Err(CoercionError::UnknownFormat {
            value: other.to_string(),
        }),
    }
}

/// Parse the numeric string grammar described in the module docs
pub fn parse_long(s: &str) -> Result<i64, CoercionError> {
    let value = s.trim();
    if value.contains('.') {
        return round_half_up(parse_double(value)?);
    }

    if let Some(millis) = parse_time_literal(value) {
        return Ok(millis);
    }

    let multiplier = unit_multiplier(value);
    let digits = if multiplier > 1 {
        &value[..value.len() - 1]
    } else {
        value
    };

    let base: i64 = digits.parse().map_err(|e: std::num::ParseIntError| {
        CoercionError::InvalidNumber {
            value: s.to_string(),
            reason: e.to_string(),
        }
    })?;

    base.checked_mul(multiplier)
        .ok_or_else(|| CoercionError::Overflow { value: s.to_string() })
}

/// Read a value as a double
pub fn as_double(value: &Value) -> Result<f64, CoercionError> {
    match value {
        Value::Scalar(Scalar::Integer(i)) => Ok(*i as f64),
        Value::Scalar(Scalar::Float(f)) => Ok(*f),
        Value::Scalar(Scalar::String(s)) => parse_double(s),
        other => Err(CoercionError::UnknownFormat {
            value: other.to_string(),
        }),
    }
}

pub fn parse_double(s: &str) -> Result<f64, CoercionError> {
    s.trim()
        .parse::<f64>()
        .map_err(|e| CoercionError::InvalidNumber {
            value: s.to_string(),
            reason: e.to_string(),
        })
}

/// Round to the nearest integer, halves towards positive infinity
pub fn round_half_up(value: f64) -> Result<i64, CoercionError> {
    let rounded = (value + 0.5).floor();
    if !rounded.is_finite() || rounded < i64::MIN as f64 || rounded >= i64::MAX as f64 {
        return Err(CoercionError::Overflow {
            value: value.to_string(),
        });
    }
    Ok(rounded as i64)
}

/// `weekly`, `daily` and `hourly` in milliseconds
pub fn parse_time_literal(value: &str) -> Option<i64> {
    if value.eq_ignore_ascii_case("weekly") {
        Some(WEEK_MS)
    } else if value.eq_ignore_ascii_case("daily") {
        Some(DAY_MS)
    } else if value.eq_ignore_ascii_case("hourly") {
        Some(HOUR_MS)
    } else {
        None
    }
}

/// Multiplier for a trailing binary unit suffix, 1 when there is none
pub fn unit_multiplier(value: &str) -> i64 {
    match value.chars().last().map(|c| c.to_ascii_uppercase()) {
        Some('T') => TERA,
        Some('G') => GIGA,
        Some('M') => MEGA,
        Some('K') => KILO,
        _ => 1,
    }
}

/// Resolve a thread count expression against `processors` logical cores
pub fn thread_count(expression: &str, processors: usize) -> Result<i32, CoercionError> {
    let value = expression.trim();

    if value.to_ascii_lowercase().contains(PROCESSORS_TOKEN) {
        let mut threads = i64::try_from(processors).unwrap_or(i64::from(i32::MAX));

        let operator = value
            .char_indices()
            .filter(|(_, c)| matches!(c, '+' | '-' | '*' | '/'))
            .last();

        if let Some((idx, op)) = operator {
            let operand = value[idx + op.len_utf8()..].trim();
            if let Ok(operand) = operand.parse::<i64>() {
                threads = match op {
                    '+' => threads.saturating_add(operand),
                    '-' => threads.saturating_sub(operand),
                    '*' => threads.saturating_mul(operand),
                    '/' if operand != 0 => threads / operand,
                    _ => threads,
                };
            }
        }

        return Ok(threads.clamp(1, i64::from(i32::MAX)) as i32);
    }

    let integer_part = match value.find('.') {
        Some(dot) => value[..dot].trim(),
        None => value,
    };
    integer_part
        .parse::<i32>()
        .map_err(|e| CoercionError::InvalidNumber {
            value: expression.to_string(),
            reason: e.to_string(),
        })
}
