//! The tagged value type shared by binds, record fields and authorization
//! attribute comparison.

use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value as Json;
use uuid::Uuid;

/// A dynamically typed database value.
///
/// `DbValue` is the single currency for statement binds, record field
/// storage and authorization attribute checks. Equality is structural;
/// `Float` compares with IEEE semantics, so `NaN != NaN`.
#[derive(Debug, Clone, PartialEq)]
pub enum DbValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    DateTime(DateTime<Utc>),
    Uuid(Uuid),
    Json(Json),
}

impl DbValue {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, DbValue::Null)
    }

    /// Borrow the textual content, if this is a `Text` value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            DbValue::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            DbValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DbValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for DbValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbValue::Null => write!(f, "NULL"),
            DbValue::Bool(b) => write!(f, "{b}"),
            DbValue::Int(i) => write!(f, "{i}"),
            DbValue::Float(x) => write!(f, "{x}"),
            DbValue::Text(s) => write!(f, "{s}"),
            DbValue::DateTime(t) => write!(f, "{}", t.to_rfc3339()),
            DbValue::Uuid(u) => write!(f, "{u}"),
            DbValue::Json(j) => write!(f, "{j}"),
        }
    }
}

impl From<bool> for DbValue {
    fn from(v: bool) -> Self {
        DbValue::Bool(v)
    }
}

impl From<i32> for DbValue {
    fn from(v: i32) -> Self {
        DbValue::Int(i64::from(v))
    }
}

impl From<i64> for DbValue {
    fn from(v: i64) -> Self {
        DbValue::Int(v)
    }
}

impl From<f64> for DbValue {
    fn from(v: f64) -> Self {
        DbValue::Float(v)
    }
}

impl From<&str> for DbValue {
    fn from(v: &str) -> Self {
        DbValue::Text(v.to_owned())
    }
}

impl From<String> for DbValue {
    fn from(v: String) -> Self {
        DbValue::Text(v)
    }
}

impl From<DateTime<Utc>> for DbValue {
    fn from(v: DateTime<Utc>) -> Self {
        DbValue::DateTime(v)
    }
}

impl From<Uuid> for DbValue {
    fn from(v: Uuid) -> Self {
        DbValue::Uuid(v)
    }
}

/// JSON scalars map onto the matching variants; arrays and objects stay
/// structured as `Json`.
impl From<Json> for DbValue {
    fn from(v: Json) -> Self {
        match v {
            Json::Null => DbValue::Null,
            Json::Bool(b) => DbValue::Bool(b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    DbValue::Int(i)
                } else {
                    DbValue::Float(n.as_f64().unwrap_or_default())
                }
            }
            Json::String(s) => DbValue::Text(s),
            structured @ (Json::Array(_) | Json::Object(_)) => DbValue::Json(structured),
        }
    }
}

impl<T: Into<DbValue>> From<Option<T>> for DbValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(DbValue::Null, Into::into)
    }
}
