//! Value coercion between column types.
//!
//! Coercion never fails: a value that cannot be cast resolves to the target
//! tag's default and the result says so.

use crate::catalog::{FieldSize, TypeKind, TypeTag};
use chrono::{Datelike, NaiveDate};
use rusqlite::types::Value;

/// Result of coercing one value.
#[derive(Debug, Clone, PartialEq)]
pub struct Coerced {
    /// The value to store.
    pub value: Value,
    /// Whether the tag's default was substituted.
    pub used_default: bool,
}

impl Coerced {
    fn cast(value: Value) -> Self {
        Self {
            value,
            used_default: false,
        }
    }

    fn default_for(tag: TypeTag) -> Self {
        Self {
            value: tag.default_value(),
            used_default: true,
        }
    }
}

/// Coerce `value` into a column of type `tag` and width `size`.
pub fn coerce(value: &Value, tag: TypeTag, size: FieldSize) -> Coerced {
    let cast = match tag.kind() {
        TypeKind::Integer => to_integer(value)
            .filter(|n| !tag.is_unsigned() || *n >= 0)
            .map(Value::Integer),
        TypeKind::Decimal => to_real(value)
            .filter(|n| !tag.is_unsigned() || *n >= 0.0)
            .map(|n| Value::Real(round_to(n, size.places))),
        TypeKind::Date => to_date(value).map(Value::Integer),
        TypeKind::Text => to_text(value).map(|s| Value::Text(fold_case(tag, s))),
        TypeKind::Blob => to_blob(value).map(Value::Blob),
    };
    match cast {
        Some(value) => Coerced::cast(value),
        None => Coerced::default_for(tag),
    }
}

fn to_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(n) => Some(*n),
        Value::Real(f) => real_to_integer(*f),
        Value::Text(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(real_to_integer))
        }
        Value::Null | Value::Blob(_) => None,
    }
}

fn real_to_integer(f: f64) -> Option<i64> {
    let truncated = f.trunc();
    if truncated.is_finite() && truncated >= i64::MIN as f64 && truncated <= i64::MAX as f64 {
        Some(truncated as i64)
    } else {
        None
    }
}

fn to_real(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Integer(n) => *n as f64,
        Value::Real(f) => *f,
        Value::Text(s) => s.trim().parse::<f64>().ok()?,
        Value::Null | Value::Blob(_) => return None,
    };
    n.is_finite().then_some(n)
}

fn round_to(n: f64, places: u8) -> f64 {
    let scale = 10f64.powi(i32::from(places));
    (n * scale).round() / scale
}

/// Dates are CCYYMMDD integers; zero means "no date". ISO `YYYY-MM-DD` text is accepted.
fn to_date(value: &Value) -> Option<i64> {
    if let Value::Text(s) = value {
        if let Ok(date) = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d") {
            return Some(date_number(date));
        }
    }
    let n = to_integer(value)?;
    if n == 0 {
        return Some(0);
    }
    if !(10_000_101..=99_991_231).contains(&n) {
        return None;
    }
    let (year, month, day) = (n / 10_000, (n / 100) % 100, n % 100);
    let date = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)?;
    Some(date_number(date))
}

pub(crate) fn date_number(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 10_000 + i64::from(date.month()) * 100 + i64::from(date.day())
}

fn to_text(value: &Value) -> Option<String> {
    match value {
        Value::Text(s) => Some(s.clone()),
        Value::Integer(n) => Some(n.to_string()),
        Value::Real(f) => f.is_finite().then(|| f.to_string()),
        Value::Blob(bytes) => String::from_utf8(bytes.clone()).ok(),
        Value::Null => None,
    }
}

fn fold_case(tag: TypeTag, s: String) -> String {
    match tag {
        TypeTag::UpperAlpha => s.to_uppercase(),
        TypeTag::LowerAlpha => s.to_lowercase(),
        _ => s,
    }
}

fn to_blob(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::Blob(bytes) => Some(bytes.clone()),
        Value::Text(s) => Some(s.clone().into_bytes()),
        Value::Integer(_) | Value::Real(_) | Value::Null => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn coerce_w(value: Value, tag: TypeTag) -> Coerced {
        coerce(&value, tag, FieldSize::new(10))
    }

    #[test]
    fn test_uncastable_values_resolve_to_defaults() {
        let garbage = Value::Blob(vec![0xff, 0xfe, 0x00]);
        for tag in TypeTag::ALL {
            let input = if tag == TypeTag::Blob {
                Value::Real(1.5)
            } else {
                garbage.clone()
            };
            let result = coerce_w(input, tag);
            assert!(result.used_default, "{} should fall back", tag);
            assert_eq!(result.value, tag.default_value(), "{} default", tag);
        }
    }

    #[test]
    fn test_null_uses_default() {
        let result = coerce_w(Value::Null, TypeTag::Alpha);
        assert_eq!(result.value, text(""));
        assert!(result.used_default);
    }

    #[test]
    fn test_integer_casts() {
        assert_eq!(coerce_w(text(" 42 "), TypeTag::SignedInteger).value, Value::Integer(42));
        assert_eq!(coerce_w(Value::Real(7.9), TypeTag::SignedInteger).value, Value::Integer(7));
        assert_eq!(coerce_w(text("-3.5"), TypeTag::SignedInteger).value, Value::Integer(-3));
        let result = coerce_w(text("12abc"), TypeTag::SignedInteger);
        assert!(result.used_default);
        assert_eq!(result.value, Value::Integer(0));
    }

    #[test]
    fn test_unsigned_rejects_negative() {
        let result = coerce_w(Value::Integer(-5), TypeTag::UnsignedInteger);
        assert!(result.used_default);
        assert_eq!(result.value, Value::Integer(0));

        let result = coerce_w(Value::Real(-0.5), TypeTag::UnsignedDecimal);
        assert!(result.used_default);
        assert_eq!(result.value, Value::Real(0.0));
    }

    #[test]
    fn test_decimal_rounds_to_places() {
        let result = coerce(&text("12.346"), TypeTag::SignedDecimal, FieldSize::decimal(13, 2));
        assert_eq!(result.value, Value::Real(12.35));
        assert!(!result.used_default);

        let result = coerce(&Value::Integer(3), TypeTag::SignedDecimal, FieldSize::decimal(13, 2));
        assert_eq!(result.value, Value::Real(3.0));
    }

    #[test]
    fn test_dates() {
        assert_eq!(coerce_w(Value::Integer(20240229), TypeTag::Date).value, Value::Integer(20240229));
        assert_eq!(coerce_w(text("2023-07-01"), TypeTag::Date).value, Value::Integer(20230701));
        assert_eq!(coerce_w(Value::Integer(0), TypeTag::Date).value, Value::Integer(0));

        let result = coerce_w(Value::Integer(20230230), TypeTag::Date);
        assert!(result.used_default);
        assert_eq!(result.value, Value::Integer(0));
    }

    #[test]
    fn test_text_casts_and_case_folding() {
        assert_eq!(coerce_w(Value::Integer(15), TypeTag::Alpha).value, text("15"));
        assert_eq!(coerce_w(text("abc"), TypeTag::UpperAlpha).value, text("ABC"));
        assert_eq!(coerce_w(text("ABC"), TypeTag::LowerAlpha).value, text("abc"));
        assert_eq!(coerce_w(Value::Blob(b"hi".to_vec()), TypeTag::Text).value, text("hi"));
    }

    #[test]
    fn test_text_is_never_truncated() {
        let long = "a value longer than ten";
        let result = coerce(&text(long), TypeTag::Alpha, FieldSize::new(10));
        assert_eq!(result.value, text(long));
        assert!(!result.used_default);
    }

    #[test]
    fn test_blob_casts() {
        assert_eq!(coerce_w(text("x"), TypeTag::Blob).value, Value::Blob(b"x".to_vec()));
        let result = coerce_w(Value::Integer(1), TypeTag::Blob);
        assert!(result.used_default);
        assert_eq!(result.value, Value::Blob(Vec::new()));
    }
}
