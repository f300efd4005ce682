//! Conversion of loosely typed values to declared field types.
//!
//! | target   | rule                                                        |
//! |----------|-------------------------------------------------------------|
//! | `bigint` | integral conversion; anything else is a conversion error    |
//! | `string` | `null` becomes `""`, everything else is stringified         |
//! | `number` | numeric cast; a `NaN` result is `Invalid Number`            |
//! | `date`   | date parse or epoch milliseconds; failure is `Invalid Date` |
//! | `bool`   | truthiness, never fails                                     |

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::CoerceError;
use crate::types::FieldType;
use crate::value::{format_number, Value};

/// Convert `value` to `target`.
///
/// Values that already have the target's runtime type are returned as-is.
/// `interface` is never a coercion target: nested objects are generated,
/// not converted.
pub fn coerce(value: &Value, target: FieldType) -> Result<Value, CoerceError> {
    if target.accepts(value.kind()) {
        return Ok(value.clone());
    }
    match target {
        FieldType::BigInt => to_bigint(value).map(Value::BigInt),
        FieldType::String => Ok(Value::String(match value {
            Value::Null => String::new(),
            other => other.to_string(),
        })),
        FieldType::Number => {
            let n = to_number(value);
            if n.is_nan() {
                Err(CoerceError::InvalidNumber)
            } else {
                Ok(Value::Number(n))
            }
        }
        FieldType::Date => to_date(value).map(Value::Date),
        FieldType::Bool => Ok(Value::Bool(value.is_truthy())),
        FieldType::Interface => Err(CoerceError::Unsupported { target }),
    }
}

/// Numeric cast; `NaN` when the value has no numeric reading.
fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => *n,
        Value::BigInt(n) => *n as f64,
        Value::String(s) => parse_number(s).unwrap_or(f64::NAN),
        Value::Date(d) => d.timestamp_millis() as f64,
        Value::Array(_) => parse_number(&value.to_string()).unwrap_or(f64::NAN),
        Value::Object(_) => f64::NAN,
    }
}

/// Parse a numeric string. Surrounding whitespace is ignored and the empty
/// string reads as zero. Accepts decimal and exponent forms, `Infinity`, and
/// `0x`/`0o`/`0b` integer prefixes.
fn parse_number(text: &str) -> Option<f64> {
    let s = text.trim();
    if s.is_empty() {
        return Some(0.0);
    }
    match s {
        "Infinity" | "+Infinity" => return Some(f64::INFINITY),
        "-Infinity" => return Some(f64::NEG_INFINITY),
        _ => {}
    }
    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = s.strip_prefix(prefix) {
            if digits.starts_with(['+', '-']) {
                return None;
            }
            return u128::from_str_radix(digits, radix).ok().map(|n| n as f64);
        }
    }
    // f64's parser also takes "inf" and "nan", which are not numbers here
    if s.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return None;
    }
    s.parse::<f64>().ok()
}

fn to_bigint(value: &Value) -> Result<i128, CoerceError> {
    let fail = |shown: String| CoerceError::InvalidBigInt {
        message: format!("Cannot convert {shown} to a BigInt"),
    };
    match value {
        Value::BigInt(n) => Ok(*n),
        Value::Bool(b) => Ok(i128::from(*b)),
        Value::Number(n) => {
            if n.is_finite() && n.fract() == 0.0 && n.abs() < 1.7e38 {
                Ok(*n as i128)
            } else {
                Err(fail(format_number(*n)))
            }
        }
        Value::String(s) => parse_bigint(s).ok_or_else(|| fail(s.clone())),
        Value::Date(d) => Ok(i128::from(d.timestamp_millis())),
        Value::Array(_) => {
            let joined = value.to_string();
            parse_bigint(&joined).ok_or_else(|| fail(joined))
        }
        Value::Null | Value::Object(_) => Err(fail(value.to_string())),
    }
}

fn parse_bigint(text: &str) -> Option<i128> {
    let s = text.trim();
    if s.is_empty() {
        return Some(0);
    }
    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = s.strip_prefix(prefix) {
            if digits.starts_with(['+', '-']) {
                return None;
            }
            return i128::from_str_radix(digits, radix).ok();
        }
    }
    s.parse::<i128>().ok()
}

fn to_date(value: &Value) -> Result<DateTime<Utc>, CoerceError> {
    let parsed = match value {
        Value::Date(d) => Some(*d),
        Value::Null => DateTime::from_timestamp_millis(0),
        Value::Bool(b) => DateTime::from_timestamp_millis(i64::from(*b)),
        Value::Number(n) => from_millis(*n),
        Value::String(s) => parse_date(s),
        Value::Array(items) => match items.as_slice() {
            [only] => return to_date(only),
            _ => None,
        },
        Value::BigInt(_) | Value::Object(_) => None,
    };
    parsed.ok_or(CoerceError::InvalidDate)
}

fn from_millis(ms: f64) -> Option<DateTime<Utc>> {
    if !ms.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(ms.trunc() as i64)
}

fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let s = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn numeric_string_coerces_to_number() {
        assert_eq!(
            coerce(&Value::from("180"), FieldType::Number),
            Ok(Value::Number(180.0))
        );
        assert_eq!(
            coerce(&Value::from(" 1.5e2 "), FieldType::Number),
            Ok(Value::Number(150.0))
        );
        assert_eq!(
            coerce(&Value::from("0x1F"), FieldType::Number),
            Ok(Value::Number(31.0))
        );
        assert_eq!(coerce(&Value::from(""), FieldType::Number), Ok(Value::Number(0.0)));
        assert_eq!(coerce(&Value::Null, FieldType::Number), Ok(Value::Number(0.0)));
        assert_eq!(coerce(&Value::from(true), FieldType::Number), Ok(Value::Number(1.0)));
    }

    #[test]
    fn non_numeric_string_is_invalid_number() {
        assert_eq!(
            coerce(&Value::from("81x"), FieldType::Number),
            Err(CoerceError::InvalidNumber)
        );
        assert_eq!(
            coerce(&Value::from("inf"), FieldType::Number),
            Err(CoerceError::InvalidNumber)
        );
        assert_eq!(
            coerce(&Value::from(json!({"a": 1})), FieldType::Number),
            Err(CoerceError::InvalidNumber)
        );
    }

    #[test]
    fn arrays_read_as_their_joined_text() {
        assert_eq!(
            coerce(&Value::from(json!([])), FieldType::Number),
            Ok(Value::Number(0.0))
        );
        assert_eq!(
            coerce(&Value::from(json!([5])), FieldType::Number),
            Ok(Value::Number(5.0))
        );
        assert_eq!(
            coerce(&Value::from(json!(["5"])), FieldType::Number),
            Ok(Value::Number(5.0))
        );
        assert_eq!(
            coerce(&Value::from(json!([true])), FieldType::Number),
            Err(CoerceError::InvalidNumber)
        );
        assert_eq!(
            coerce(&Value::from(json!([1, 2])), FieldType::Number),
            Err(CoerceError::InvalidNumber)
        );
    }

    #[test]
    fn string_coercion() {
        assert_eq!(coerce(&Value::Null, FieldType::String), Ok(Value::from("")));
        assert_eq!(coerce(&Value::from(180), FieldType::String), Ok(Value::from("180")));
        assert_eq!(coerce(&Value::from(false), FieldType::String), Ok(Value::from("false")));
        assert_eq!(
            coerce(&Value::BigInt(42), FieldType::String),
            Ok(Value::from("42"))
        );
    }

    #[test]
    fn bool_coercion_is_truthiness() {
        assert_eq!(coerce(&Value::from(""), FieldType::Bool), Ok(Value::Bool(false)));
        assert_eq!(coerce(&Value::from("no"), FieldType::Bool), Ok(Value::Bool(true)));
        assert_eq!(coerce(&Value::from(0), FieldType::Bool), Ok(Value::Bool(false)));
        assert_eq!(coerce(&Value::Null, FieldType::Bool), Ok(Value::Bool(false)));
    }

    #[test]
    fn date_coercion() {
        let expected = Utc.with_ymd_and_hms(2020, 2, 29, 0, 0, 0).unwrap();
        assert_eq!(
            coerce(&Value::from("2020-02-29"), FieldType::Date),
            Ok(Value::Date(expected))
        );
        assert_eq!(
            coerce(&Value::from("2020-02-29T00:00:00Z"), FieldType::Date),
            Ok(Value::Date(expected))
        );
        assert_eq!(
            coerce(&Value::from(expected.timestamp_millis()), FieldType::Date),
            Ok(Value::Date(expected))
        );
    }

    #[test]
    fn unparseable_date_is_invalid_date() {
        let err = coerce(&Value::from("wrong date"), FieldType::Date).unwrap_err();
        assert_eq!(err, CoerceError::InvalidDate);
        assert!(err.to_string().contains("Invalid Date"));
        assert_eq!(
            coerce(&Value::from(""), FieldType::Date),
            Err(CoerceError::InvalidDate)
        );
    }

    #[test]
    fn bigint_coercion() {
        assert_eq!(coerce(&Value::from("123"), FieldType::BigInt), Ok(Value::BigInt(123)));
        assert_eq!(coerce(&Value::from(12), FieldType::BigInt), Ok(Value::BigInt(12)));
        assert_eq!(coerce(&Value::from(true), FieldType::BigInt), Ok(Value::BigInt(1)));
        assert_eq!(
            coerce(&Value::from(12.5), FieldType::BigInt),
            Err(CoerceError::InvalidBigInt {
                message: "Cannot convert 12.5 to a BigInt".into()
            })
        );
        assert!(coerce(&Value::Null, FieldType::BigInt).is_err());
        assert!(coerce(&Value::from("12abc"), FieldType::BigInt).is_err());
    }

    #[test]
    fn matching_values_pass_through() {
        let v = Value::from("already");
        assert_eq!(coerce(&v, FieldType::String), Ok(v));
    }

    #[test]
    fn interface_is_not_a_coercion_target() {
        assert_eq!(
            coerce(&Value::from("x"), FieldType::Interface),
            Err(CoerceError::Unsupported {
                target: FieldType::Interface
            })
        );
    }
}
