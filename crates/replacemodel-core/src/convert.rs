//! Ready-made column conversions.
//!
//! Each function has the [`Conversion`](crate::table::Conversion) shape and
//! can be attached with `Column::with_conversion` for fields whose Rust
//! representation differs from what the database column stores.

use crate::Result;
use crate::error::{Error, TypeError};
use crate::value::Value;
use std::fmt::Write;

/// Serialize a JSON value into text, for databases without a JSON type.
///
/// Non-JSON values pass through unchanged.
#[allow(clippy::result_large_err)]
pub fn json_to_text(value: Value) -> Result<Value> {
    match value {
        Value::Json(json) => serde_json::to_string(&json)
            .map(Value::Text)
            .map_err(|e| {
                Error::Type(TypeError {
                    expected: "serializable JSON",
                    actual: e.to_string(),
                    column: None,
                    rust_type: Some("serde_json::Value"),
                })
            }),
        other => Ok(other),
    }
}

/// Store booleans as `0`/`1` integers.
#[allow(clippy::result_large_err)]
pub fn bool_to_int(value: Value) -> Result<Value> {
    match value {
        Value::Bool(b) => Ok(Value::TinyInt(i8::from(b))),
        other => Ok(other),
    }
}

/// Store UUIDs in their hyphenated lowercase text form.
#[allow(clippy::result_large_err)]
pub fn uuid_to_text(value: Value) -> Result<Value> {
    match value {
        Value::Uuid(bytes) => {
            let mut out = String::with_capacity(36);
            for (i, b) in bytes.iter().enumerate() {
                if matches!(i, 4 | 6 | 8 | 10) {
                    out.push('-');
                }
                write!(out, "{:02x}", b)?;
            }
            Ok(Value::Text(out))
        }
        other => Ok(other),
    }
}
