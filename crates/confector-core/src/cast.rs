//! Explicit per-kind coercion of JSON input into [`TypedValue`]s.
//!
//! Every kind has its own arm in [`try_cast`]; there is no generic
//! fallback. Lists need their element kind, which comes from the
//! property's `subtype` config parameter, so they are cast through
//! [`cast_list`] or [`cast_for`].

use chrono::{DateTime, Utc};
use confector_schema::{PropertyDef, ValueKind};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::value::TypedValue;

/// Why a value could not be cast.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CastError {
    #[error("expected {expected}, found {found}")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("{0}")]
    Invalid(String),

    #[error("{0} values are never assigned directly")]
    NotAssignable(ValueKind),

    #[error("list property has no valid subtype")]
    MissingSubtype,
}

pub type CastResult<T> = Result<T, CastError>;

/// Cast a JSON value to `kind`.
///
/// `List` always fails with [`CastError::MissingSubtype`]; use
/// [`cast_list`] instead.
pub fn try_cast(raw: &Value, kind: ValueKind) -> CastResult<TypedValue> {
    match kind {
        ValueKind::Integer => cast_integer(raw).map(TypedValue::Integer),
        ValueKind::Float => cast_float(raw).map(TypedValue::Float),
        ValueKind::String => cast_text(raw, "a string").map(TypedValue::String),
        ValueKind::TextArea => cast_text(raw, "a string").map(TypedValue::TextArea),
        ValueKind::Enum => cast_text(raw, "an enum variant").map(TypedValue::Enum),
        ValueKind::Boolean => cast_bool(raw).map(TypedValue::Boolean),
        ValueKind::Date => cast_date(raw).map(TypedValue::Date),
        ValueKind::Url => cast_url(raw).map(TypedValue::Url),
        ValueKind::Tags => cast_string_list(raw).map(TypedValue::Tags),
        ValueKind::FeatureList => cast_bool_list(raw).map(TypedValue::FeatureList),
        ValueKind::Hierarchies => cast_hierarchies(raw).map(TypedValue::Hierarchies),
        ValueKind::Location => match raw {
            Value::Object(map) => Ok(TypedValue::Location(map.clone())),
            other => Err(mismatch("an object", other)),
        },
        ValueKind::List => Err(CastError::MissingSubtype),
        ValueKind::Box | ValueKind::Link => Err(CastError::NotAssignable(kind)),
    }
}

/// Cast a JSON array to a list whose elements are of `subtype`.
pub fn cast_list(raw: &Value, subtype: ValueKind) -> CastResult<TypedValue> {
    if matches!(subtype, ValueKind::Box | ValueKind::Link | ValueKind::List) {
        return Err(CastError::Invalid(format!(
            "{subtype} cannot be a list element kind"
        )));
    }
    let Value::Array(items) = raw else {
        return Err(mismatch("an array", raw));
    };
    items
        .iter()
        .map(|item| try_cast(item, subtype))
        .collect::<CastResult<Vec<_>>>()
        .map(TypedValue::List)
}

/// Cast a JSON value for a leaf property, reading the list subtype from
/// its config where needed.
pub fn cast_for(property: &PropertyDef, raw: &Value) -> CastResult<TypedValue> {
    match property.kind() {
        ValueKind::List => cast_list(raw, list_subtype(property)?),
        kind => try_cast(raw, kind),
    }
}

/// Element kind of a list property.
pub fn list_subtype(property: &PropertyDef) -> CastResult<ValueKind> {
    property
        .config_value("subtype")
        .and_then(Value::as_str)
        .and_then(|name| ValueKind::resolve(name).ok())
        .ok_or(CastError::MissingSubtype)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn mismatch(expected: &'static str, found: &Value) -> CastError {
    CastError::Mismatch {
        expected,
        found: json_type(found),
    }
}

fn cast_integer(raw: &Value) -> CastResult<i64> {
    match raw {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                    Ok(f as i64)
                }
                _ => Err(CastError::Invalid(format!("{n} is not an integer in range"))),
            }
        }
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| CastError::Invalid(format!("{s:?} is not an integer"))),
        other => Err(mismatch("an integer", other)),
    }
}

fn cast_float(raw: &Value) -> CastResult<f64> {
    match raw {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| CastError::Invalid(format!("{n} is not representable as float"))),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .ok_or_else(|| CastError::Invalid(format!("{s:?} is not a finite number"))),
        other => Err(mismatch("a number", other)),
    }
}

fn cast_text(raw: &Value, expected: &'static str) -> CastResult<String> {
    match raw {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(mismatch(expected, other)),
    }
}

fn cast_bool(raw: &Value) -> CastResult<bool> {
    match raw {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f == 0.0 => Ok(false),
            Some(f) if f == 1.0 => Ok(true),
            _ => Err(CastError::Invalid(format!("{n} is neither 0 nor 1"))),
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(CastError::Invalid(format!("{s:?} is not a boolean"))),
        },
        other => Err(mismatch("a boolean", other)),
    }
}

fn cast_date(raw: &Value) -> CastResult<DateTime<Utc>> {
    let out_of_range = || CastError::Invalid(format!("{raw} is out of range for a date"));
    match raw {
        Value::Number(n) => {
            if let Some(secs) = n.as_i64() {
                return DateTime::from_timestamp(secs, 0).ok_or_else(out_of_range);
            }
            let f = n.as_f64().filter(|f| f.is_finite()).ok_or_else(out_of_range)?;
            let secs = f.floor();
            if secs < i64::MIN as f64 || secs >= i64::MAX as f64 {
                return Err(out_of_range());
            }
            let nanos = ((f - secs) * 1e9) as u32;
            DateTime::from_timestamp(secs as i64, nanos.min(999_999_999)).ok_or_else(out_of_range)
        }
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| CastError::Invalid(format!("{s:?} is not an RFC 3339 date: {e}"))),
        other => Err(mismatch("a timestamp", other)),
    }
}

fn cast_url(raw: &Value) -> CastResult<Url> {
    match raw {
        Value::String(s) => {
            Url::parse(s.trim()).map_err(|e| CastError::Invalid(format!("{s:?} is not a URL: {e}")))
        }
        other => Err(mismatch("a URL string", other)),
    }
}

fn cast_string_list(raw: &Value) -> CastResult<Vec<String>> {
    let Value::Array(items) = raw else {
        return Err(mismatch("an array of strings", raw));
    };
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => Ok(s.clone()),
            other => Err(mismatch("a string", other)),
        })
        .collect()
}

fn cast_bool_list(raw: &Value) -> CastResult<Vec<bool>> {
    let Value::Array(items) = raw else {
        return Err(mismatch("an array of booleans", raw));
    };
    items
        .iter()
        .map(|item| match item {
            Value::Bool(b) => Ok(*b),
            other => Err(mismatch("a boolean", other)),
        })
        .collect()
}

fn cast_hierarchies(raw: &Value) -> CastResult<Vec<Vec<String>>> {
    let Value::Array(paths) = raw else {
        return Err(mismatch("an array of paths", raw));
    };
    paths.iter().map(cast_string_list).collect()
}
