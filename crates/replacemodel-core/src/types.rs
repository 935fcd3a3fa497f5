//! SQL type definitions and mapping.

/// SQL data types a column can declare.
///
/// The declared type decides the width of generated ids and version
/// counters written back to a record, and the shape of generated
/// timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlType {
    // Integer types
    TinyInt,
    SmallInt,
    Integer,
    BigInt,

    // Floating point
    Real,
    Double,

    // Fixed precision
    Decimal { precision: u8, scale: u8 },

    // Boolean
    Boolean,

    // String types
    Char(u32),
    VarChar(u32),
    Text,

    // Binary types
    Blob,

    // Date/time types
    Date,
    Time,
    DateTime,
    Timestamp,
    TimestampTz,

    // UUID
    Uuid,

    // JSON
    Json,

    // Custom type name
    Custom(&'static str),
}

impl SqlType {
    /// Check if this type is an integer type.
    pub const fn is_integer(&self) -> bool {
        matches!(
            self,
            SqlType::TinyInt | SqlType::SmallInt | SqlType::Integer | SqlType::BigInt
        )
    }

    /// Check if this type is text-based.
    pub const fn is_text(&self) -> bool {
        matches!(self, SqlType::Char(_) | SqlType::VarChar(_) | SqlType::Text)
    }
}
