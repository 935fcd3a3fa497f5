//! Dynamic SQL values.

use crate::error::{Error, TypeError};
use crate::types::SqlType;
use serde::{Deserialize, Serialize};

/// A dynamically-typed SQL value.
///
/// This enum represents all possible SQL values and is used
/// for parameter binding and result fetching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// NULL value
    Null,

    /// Boolean value
    Bool(bool),

    /// 8-bit signed integer
    TinyInt(i8),

    /// 16-bit signed integer
    SmallInt(i16),

    /// 32-bit signed integer
    Int(i32),

    /// 64-bit signed integer
    BigInt(i64),

    /// 32-bit floating point
    Float(f32),

    /// 64-bit floating point
    Double(f64),

    /// Arbitrary precision decimal (stored as string)
    Decimal(String),

    /// Text string
    Text(String),

    /// Binary data
    Bytes(Vec<u8>),

    /// Date (days since epoch)
    Date(i32),

    /// Time (microseconds since midnight)
    Time(i64),

    /// Timestamp (microseconds since epoch)
    Timestamp(i64),

    /// Timestamp with timezone (microseconds since epoch, UTC)
    TimestampTz(i64),

    /// UUID (as 16 bytes)
    Uuid([u8; 16]),

    /// JSON value
    Json(serde_json::Value),

    /// Array of values
    Array(Vec<Value>),
}

impl Value {
    /// Check if this value is NULL.
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is the zero value of its type.
    ///
    /// NULL, numeric zero, `false`, and empty text/bytes/arrays are zero.
    /// An auto-increment column holding a zero value is left out of an
    /// insert so the database generates it.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(v) => !*v,
            Value::TinyInt(v) => *v == 0,
            Value::SmallInt(v) => *v == 0,
            Value::Int(v) => *v == 0,
            Value::BigInt(v) => *v == 0,
            Value::Float(v) => *v == 0.0,
            Value::Double(v) => *v == 0.0,
            Value::Decimal(s) | Value::Text(s) => s.is_empty(),
            Value::Bytes(b) => b.is_empty(),
            Value::Date(v) => *v == 0,
            Value::Time(v) | Value::Timestamp(v) | Value::TimestampTz(v) => *v == 0,
            Value::Uuid(u) => u.iter().all(|b| *b == 0),
            Value::Json(j) => j.is_null(),
            Value::Array(a) => a.is_empty(),
        }
    }

    /// Get the type name of this value.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::TinyInt(_) => "TINYINT",
            Value::SmallInt(_) => "SMALLINT",
            Value::Int(_) => "INTEGER",
            Value::BigInt(_) => "BIGINT",
            Value::Float(_) => "REAL",
            Value::Double(_) => "DOUBLE",
            Value::Decimal(_) => "DECIMAL",
            Value::Text(_) => "TEXT",
            Value::Bytes(_) => "BLOB",
            Value::Date(_) => "DATE",
            Value::Time(_) => "TIME",
            Value::Timestamp(_) => "TIMESTAMP",
            Value::TimestampTz(_) => "TIMESTAMPTZ",
            Value::Uuid(_) => "UUID",
            Value::Json(_) => "JSON",
            Value::Array(_) => "ARRAY",
        }
    }

    /// Try to convert this value to a bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            Value::TinyInt(v) => Some(*v != 0),
            Value::SmallInt(v) => Some(*v != 0),
            Value::Int(v) => Some(*v != 0),
            Value::BigInt(v) => Some(*v != 0),
            _ => None,
        }
    }

    /// Try to convert this value to an i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::TinyInt(v) => Some(i64::from(*v)),
            Value::SmallInt(v) => Some(i64::from(*v)),
            Value::Int(v) => Some(i64::from(*v)),
            Value::BigInt(v) => Some(*v),
            Value::Bool(v) => Some(if *v { 1 } else { 0 }),
            _ => None,
        }
    }

    /// Try to get this value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Decimal(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as a byte slice.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            Value::Text(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Read an integer from a value returned by a driver.
    ///
    /// Drivers may hand back generated keys as native integers or in their
    /// textual/byte form; both are accepted. Text is parsed as a base-10
    /// integer after trimming surrounding whitespace.
    #[allow(clippy::result_large_err)]
    pub fn parse_i64(&self) -> crate::Result<i64> {
        if let Some(v) = self.as_i64() {
            return Ok(v);
        }
        let text = match self {
            Value::Text(s) | Value::Decimal(s) => s.as_str(),
            Value::Bytes(b) => std::str::from_utf8(b).map_err(|_| {
                Error::Type(TypeError {
                    expected: "integer",
                    actual: "non-UTF-8 bytes".to_string(),
                    column: None,
                    rust_type: Some("i64"),
                })
            })?,
            other => {
                return Err(Error::Type(TypeError {
                    expected: "integer",
                    actual: other.type_name().to_string(),
                    column: None,
                    rust_type: Some("i64"),
                }));
            }
        };
        text.trim().parse::<i64>().map_err(|e| {
            Error::Type(TypeError {
                expected: "integer",
                actual: format!("'{}' ({})", text, e),
                column: None,
                rust_type: Some("i64"),
            })
        })
    }

    /// Build an integer value in the width declared by `sql_type`.
    ///
    /// Non-integer column types fall back to `BIGINT`. Values that do not fit
    /// the declared width are a type error.
    #[allow(clippy::result_large_err)]
    pub fn integer_for(sql_type: &SqlType, v: i64) -> crate::Result<Value> {
        let overflow = |expected: &'static str| {
            Error::Type(TypeError {
                expected,
                actual: format!("{} out of range", v),
                column: None,
                rust_type: None,
            })
        };
        match sql_type {
            SqlType::TinyInt => i8::try_from(v)
                .map(Value::TinyInt)
                .map_err(|_| overflow("TINYINT")),
            SqlType::SmallInt => i16::try_from(v)
                .map(Value::SmallInt)
                .map_err(|_| overflow("SMALLINT")),
            SqlType::Integer => i32::try_from(v)
                .map(Value::Int)
                .map_err(|_| overflow("INTEGER")),
            _ => Ok(Value::BigInt(v)),
        }
    }
}

// Conversion implementations
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Value::TinyInt(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::SmallInt(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl From<[u8; 16]> for Value {
    fn from(v: [u8; 16]) -> Self {
        Value::Uuid(v)
    }
}

// TryFrom implementations for extracting values

impl TryFrom<Value> for i32 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::TinyInt(v) => Ok(i32::from(v)),
            Value::SmallInt(v) => Ok(i32::from(v)),
            Value::Int(v) => Ok(v),
            Value::Bool(v) => Ok(if v { 1 } else { 0 }),
            other => Err(Error::Type(TypeError {
                expected: "i32",
                actual: other.type_name().to_string(),
                column: None,
                rust_type: None,
            })),
        }
    }
}

impl TryFrom<Value> for i64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value.as_i64().ok_or_else(|| {
            Error::Type(TypeError {
                expected: "i64",
                actual: value.type_name().to_string(),
                column: None,
                rust_type: None,
            })
        })
    }
}

impl TryFrom<Value> for String {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Text(s) | Value::Decimal(s) => Ok(s),
            other => Err(Error::Type(TypeError {
                expected: "String",
                actual: other.type_name().to_string(),
                column: None,
                rust_type: None,
            })),
        }
    }
}

/// `NULL` maps to `None`; anything else goes through the inner conversion.
impl<T> TryFrom<Value> for Option<T>
where
    T: TryFrom<Value, Error = Error>,
{
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Ok(None),
            v => T::try_from(v).map(Some),
        }
    }
}
