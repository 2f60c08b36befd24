//! Conversion of raw textual CSV fields into typed values, driven by the
//! per-feed column schema.
//!
//! Only *empty* fields coerce to sentinels. A non-empty value that fails
//! to parse violates the upstream data-quality contract and fails the
//! run.

use crate::error::{Result, SaverError};
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde_json::Value;
use std::collections::HashMap;

/// Sentinel for empty integer fields, meaning "not applicable" as
/// distinct from zero.
pub const MISSING_INT: i64 = -1;

/// Textual layout of feed timestamps.
const TIMESTAMP_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S";

/// Feeds report timestamps without an explicit offset; they are known to
/// be US Eastern.
const EASTERN_OFFSET_SECS: i32 = 5 * 3600;

/// Target type for a feed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// `"True"` / `"False"` exact match, anything else is the null
    /// sentinel
    Boolean,
    /// Empty becomes [`MISSING_INT`]
    Integer,
    /// `YYYY-MM-DDTHH:MM:SS`, attributed the Eastern offset
    Timestamp,
    /// Pass-through
    Text,
}

/// A coerced field value. Booleans and timestamps are three-valued: the
/// inner `None` is the explicit missing/invalid sentinel.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(Option<bool>),
    Int(i64),
    Timestamp(Option<DateTime<FixedOffset>>),
    Text(String),
}

impl FieldValue {
    pub fn into_json(self) -> Value {
        match self {
            FieldValue::Bool(Some(b)) => Value::Bool(b),
            FieldValue::Bool(None) => Value::Null,
            FieldValue::Int(i) => Value::from(i),
            FieldValue::Timestamp(Some(ts)) => Value::String(ts.to_rfc3339()),
            FieldValue::Timestamp(None) => Value::Null,
            FieldValue::Text(text) => Value::String(text),
        }
    }
}

/// A feed row with named-column access. Missing columns are an error, not
/// a silent empty read.
#[derive(Debug, Clone)]
pub struct RawRow(HashMap<String, String>);

impl RawRow {
    pub fn new(fields: HashMap<String, String>) -> Self {
        Self(fields)
    }

    pub fn get(&self, column: &str) -> Result<&str> {
        self.0
            .get(column)
            .map(String::as_str)
            .ok_or_else(|| SaverError::MissingColumn(column.to_string()))
    }
}

/// Coerce one raw field per its declared type.
pub fn coerce_field(column: &str, raw: &str, ty: FieldType) -> Result<FieldValue> {
    match ty {
        FieldType::Boolean => Ok(FieldValue::Bool(coerce_bool(raw))),
        FieldType::Integer => Ok(FieldValue::Int(coerce_int(column, raw)?)),
        FieldType::Timestamp => Ok(FieldValue::Timestamp(coerce_timestamp(column, raw)?)),
        FieldType::Text => Ok(FieldValue::Text(raw.to_string())),
    }
}

/// Exact-match `"True"` / `"False"`; anything else (including empty) is
/// the null sentinel.
fn coerce_bool(raw: &str) -> Option<bool> {
    match raw {
        "True" => Some(true),
        "False" => Some(false),
        _ => None,
    }
}

fn coerce_int(column: &str, raw: &str) -> Result<i64> {
    if raw.is_empty() {
        return Ok(MISSING_INT);
    }
    raw.parse::<i64>()
        .map_err(|e| SaverError::InvalidFieldValue {
            column: column.to_string(),
            value: raw.to_string(),
            reason: e.to_string(),
        })
}

fn coerce_timestamp(column: &str, raw: &str) -> Result<Option<DateTime<FixedOffset>>> {
    if raw.is_empty() {
        return Ok(None);
    }

    let naive = NaiveDateTime::parse_from_str(raw, TIMESTAMP_LAYOUT).map_err(|e| {
        SaverError::InvalidFieldValue {
            column: column.to_string(),
            value: raw.to_string(),
            reason: e.to_string(),
        }
    })?;

    let eastern = FixedOffset::west_opt(EASTERN_OFFSET_SECS).ok_or_else(|| {
        SaverError::InvalidFieldValue {
            column: column.to_string(),
            value: raw.to_string(),
            reason: "invalid fixed offset".to_string(),
        }
    })?;

    match naive.and_local_timezone(eastern) {
        chrono::LocalResult::Single(ts) => Ok(Some(ts)),
        _ => Err(SaverError::InvalidFieldValue {
            column: column.to_string(),
            value: raw.to_string(),
            reason: "ambiguous local time".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_coercion() {
        assert_eq!(
            coerce_field("Live", "True", FieldType::Boolean).unwrap(),
            FieldValue::Bool(Some(true))
        );
        assert_eq!(
            coerce_field("Live", "False", FieldType::Boolean).unwrap(),
            FieldValue::Bool(Some(false))
        );
        assert_eq!(
            coerce_field("Live", "", FieldType::Boolean).unwrap(),
            FieldValue::Bool(None)
        );
        // Never raises for unexpected literals, case-sensitive exact match
        assert_eq!(
            coerce_field("Live", "maybe", FieldType::Boolean).unwrap(),
            FieldValue::Bool(None)
        );
        assert_eq!(
            coerce_field("Live", "true", FieldType::Boolean).unwrap(),
            FieldValue::Bool(None)
        );
    }

    #[test]
    fn test_integer_coercion() {
        assert_eq!(
            coerce_field("Scanned Port", "443", FieldType::Integer).unwrap(),
            FieldValue::Int(443)
        );
        assert_eq!(
            coerce_field("Scanned Port", "", FieldType::Integer).unwrap(),
            FieldValue::Int(MISSING_INT)
        );
    }

    #[test]
    fn test_non_empty_unparseable_integer_is_fatal() {
        let err = coerce_field("Key Length", "abc", FieldType::Integer).unwrap_err();
        assert!(matches!(err, SaverError::InvalidFieldValue { .. }));
    }

    #[test]
    fn test_timestamp_coercion() {
        let value = coerce_field("Not Before", "2023-06-01T12:30:00", FieldType::Timestamp)
            .unwrap();
        match value {
            FieldValue::Timestamp(Some(ts)) => {
                assert_eq!(ts.to_rfc3339(), "2023-06-01T12:30:00-05:00");
            }
            other => panic!("unexpected value: {:?}", other),
        }

        assert_eq!(
            coerce_field("Not Before", "", FieldType::Timestamp).unwrap(),
            FieldValue::Timestamp(None)
        );
    }

    #[test]
    fn test_non_empty_unparseable_timestamp_is_fatal() {
        let err =
            coerce_field("Not After", "06/01/2023", FieldType::Timestamp).unwrap_err();
        assert!(matches!(err, SaverError::InvalidFieldValue { .. }));
    }

    #[test]
    fn test_text_passes_through() {
        assert_eq!(
            coerce_field("Errors", "unreachable", FieldType::Text).unwrap(),
            FieldValue::Text("unreachable".to_string())
        );
    }

    #[test]
    fn test_into_json_sentinels() {
        assert_eq!(FieldValue::Bool(None).into_json(), Value::Null);
        assert_eq!(FieldValue::Int(MISSING_INT).into_json(), Value::from(-1));
        assert_eq!(FieldValue::Timestamp(None).into_json(), Value::Null);
    }

    #[test]
    fn test_raw_row_missing_column() {
        let row = RawRow::new(HashMap::from([("Domain".to_string(), "a.gov".to_string())]));
        assert_eq!(row.get("Domain").unwrap(), "a.gov");
        assert!(matches!(
            row.get("Base Domain").unwrap_err(),
            SaverError::MissingColumn(_)
        ));
    }
}
