//! Dynamically typed SQL values.

use chrono::{DateTime, Utc};
use rusqlite::types::{Null, ToSql, ToSqlOutput, ValueRef};

use crate::error::OrmError;

/// Core value type exchanged between models and SQLite.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Whether this is the zero value of its type.
    ///
    /// Partial-record updates skip zero values. Timestamps are never zero.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Integer(i) => *i == 0,
            Value::Real(f) => *f == 0.0,
            Value::Text(s) => s.is_empty(),
            Value::Blob(b) => b.is_empty(),
            Value::Boolean(b) => !b,
            Value::Timestamp(_) => false,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
            Value::Boolean(_) => "boolean",
            Value::Timestamp(_) => "timestamp",
        }
    }

    /// Convert into a `String`, rejecting non-text values.
    pub fn into_text(self, column: &str) -> Result<String, OrmError> {
        match self {
            Value::Text(s) => Ok(s),
            other => Err(OrmError::type_mismatch(column, "text", &other)),
        }
    }

    /// Convert into an integer type, rejecting non-integers and values that
    /// do not fit the target.
    pub fn into_integer<T: TryFrom<i64>>(self, column: &str) -> Result<T, OrmError> {
        let raw = match &self {
            Value::Integer(i) => *i,
            other => return Err(OrmError::type_mismatch(column, "integer", other)),
        };
        T::try_from(raw).map_err(|_| OrmError::type_mismatch(column, "integer in range", &self))
    }

    pub fn into_real(self, column: &str) -> Result<f64, OrmError> {
        match self {
            Value::Real(f) => Ok(f),
            Value::Integer(i) => Ok(i as f64),
            other => Err(OrmError::type_mismatch(column, "real", &other)),
        }
    }

    /// Convert into a `bool`. Integers are accepted because booleans are
    /// stored as `NUMERIC` and read back as 0 or 1.
    pub fn into_bool(self, column: &str) -> Result<bool, OrmError> {
        match self {
            Value::Boolean(b) => Ok(b),
            Value::Integer(i) => Ok(i != 0),
            other => Err(OrmError::type_mismatch(column, "boolean", &other)),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v.into())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(v: ValueRef<'_>) -> Self {
        match v {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::from(Null),
            Value::Integer(i) => ToSqlOutput::from(*i),
            Value::Real(f) => ToSqlOutput::from(*f),
            Value::Text(s) => ToSqlOutput::from(s.as_str()),
            Value::Blob(b) => ToSqlOutput::from(b.as_slice()),
            Value::Boolean(b) => ToSqlOutput::from(*b),
            Value::Timestamp(ts) => return ts.to_sql(),
        })
    }
}
