//! The type-coercion pipeline: one parse/serialize function pair per
//! declared field kind.
//!
//! `parse` runs on every assignment (constructor, setters, bulk update,
//! load-from-storage) and normalizes the incoming value into the field's
//! canonical variant. `serialize` runs immediately before storage and
//! produces the dialect-neutral bind form: temporal values as RFC 3339
//! text, json as compact text, uuids as hyphenated text, booleans as
//! native binds.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value as Json;
use uuid::Uuid;

use rowkit_db::DbValue;

use crate::schema::FieldKind;

/// Coerce an incoming value into the canonical variant for `kind`.
///
/// `Null` passes through untouched for every kind.
pub(crate) fn parse(kind: FieldKind, value: DbValue) -> Result<DbValue, String> {
    if value.is_null() {
        return Ok(DbValue::Null);
    }
    match kind {
        FieldKind::Integer => parse_integer(value),
        FieldKind::Float => parse_float(value),
        FieldKind::Boolean => Ok(DbValue::Bool(truthy(&value))),
        FieldKind::DateTime => parse_datetime(value),
        FieldKind::Json => parse_json(value),
        FieldKind::Uuid => Ok(parse_uuid(value)),
        FieldKind::Text => Ok(parse_text(value)),
    }
}

/// Produce the storage bind form of an already-canonical value.
pub(crate) fn serialize(value: DbValue) -> DbValue {
    match value {
        DbValue::DateTime(t) => DbValue::Text(t.to_rfc3339()),
        DbValue::Uuid(u) => DbValue::Text(u.to_string()),
        DbValue::Json(j) => DbValue::Text(j.to_string()),
        other => other,
    }
}

fn parse_integer(value: DbValue) -> Result<DbValue, String> {
    match value {
        DbValue::Int(i) => Ok(DbValue::Int(i)),
        #[allow(clippy::cast_possible_truncation)]
        DbValue::Float(x) => Ok(DbValue::Int(x as i64)),
        DbValue::Bool(b) => Ok(DbValue::Int(i64::from(b))),
        DbValue::Text(s) => s
            .trim()
            .parse::<i64>()
            .map(DbValue::Int)
            .map_err(|e| e.to_string()),
        other => Err(format!("unsupported source value: {other}")),
    }
}

fn parse_float(value: DbValue) -> Result<DbValue, String> {
    match value {
        DbValue::Float(x) => Ok(DbValue::Float(x)),
        #[allow(clippy::cast_precision_loss)]
        DbValue::Int(i) => Ok(DbValue::Float(i as f64)),
        DbValue::Text(s) => s
            .trim()
            .parse::<f64>()
            .map(DbValue::Float)
            .map_err(|e| e.to_string()),
        other => Err(format!("unsupported source value: {other}")),
    }
}

/// Empty-ish values (zero, empty string, "0", false, null json) are false;
/// everything else is true.
fn truthy(value: &DbValue) -> bool {
    match value {
        DbValue::Null => false,
        DbValue::Bool(b) => *b,
        DbValue::Int(i) => *i != 0,
        DbValue::Float(x) => *x != 0.0,
        DbValue::Text(s) => !(s.is_empty() || s == "0"),
        DbValue::Json(j) => !matches!(j, Json::Null | Json::Bool(false)),
        DbValue::DateTime(_) | DbValue::Uuid(_) => true,
    }
}

fn parse_datetime(value: DbValue) -> Result<DbValue, String> {
    match value {
        DbValue::DateTime(t) => Ok(DbValue::DateTime(t)),
        DbValue::Int(secs) => DateTime::<Utc>::from_timestamp(secs, 0)
            .map(DbValue::DateTime)
            .ok_or_else(|| format!("{secs}: timestamp out of range")),
        DbValue::Text(s) => parse_datetime_text(s.trim())
            .map(DbValue::DateTime)
            .ok_or_else(|| format!("{s}: could not translate into datetime")),
        other => Err(format!("unsupported source value: {other}")),
    }
}

fn parse_datetime_text(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    None
}

fn parse_json(value: DbValue) -> Result<DbValue, String> {
    match value {
        DbValue::Json(j) => Ok(DbValue::Json(j)),
        DbValue::Text(s) => serde_json::from_str::<Json>(&s)
            .map(DbValue::Json)
            .map_err(|e| e.to_string()),
        DbValue::Bool(b) => Ok(DbValue::Json(Json::Bool(b))),
        DbValue::Int(i) => Ok(DbValue::Json(Json::from(i))),
        DbValue::Float(x) => Ok(DbValue::Json(match serde_json::Number::from_f64(x) {
            Some(n) => Json::Number(n),
            None => Json::Null,
        })),
        other => Err(format!("unsupported source value: {other}")),
    }
}

/// An unparsable uuid coerces to `Null` (with a warning) rather than
/// erroring; validation is the place to complain about it.
fn parse_uuid(value: DbValue) -> DbValue {
    match value {
        DbValue::Uuid(u) => DbValue::Uuid(u),
        DbValue::Text(s) => match Uuid::parse_str(s.trim()) {
            Ok(u) => DbValue::Uuid(u),
            Err(_) => {
                tracing::warn!(target: "rowkit_record", value = %s, "invalid uuid coerced to NULL");
                DbValue::Null
            }
        },
        other => {
            tracing::warn!(target: "rowkit_record", value = %other, "invalid uuid coerced to NULL");
            DbValue::Null
        }
    }
}

fn parse_text(value: DbValue) -> DbValue {
    match value {
        DbValue::Text(s) => DbValue::Text(s),
        DbValue::Json(Json::String(s)) => DbValue::Text(s),
        other => DbValue::Text(other.to_string()),
    }
}
