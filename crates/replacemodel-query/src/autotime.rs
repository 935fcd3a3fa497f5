//! Generated timestamps for created/updated columns.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Timelike, Utc};
use replacemodel_core::{SqlType, Value};

const TEXT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Produces "now" in the representation a column's SQL type expects.
#[derive(Debug, Clone, Copy)]
pub struct AutoTime {
    offset: FixedOffset,
}

impl Default for AutoTime {
    fn default() -> Self {
        Self::utc()
    }
}

impl AutoTime {
    /// Wall-clock values in UTC.
    pub fn utc() -> Self {
        Self {
            offset: Utc.fix(),
        }
    }

    /// Wall-clock values shifted by `seconds` east of UTC.
    ///
    /// Offsets outside ±24h fall back to UTC.
    pub fn with_offset_secs(seconds: i32) -> Self {
        match FixedOffset::east_opt(seconds) {
            Some(offset) => Self { offset },
            None => {
                tracing::warn!(seconds, "Invalid time zone offset, using UTC");
                Self::utc()
            }
        }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// The current time for a column of `sql_type`.
    pub fn now_value(&self, sql_type: &SqlType) -> Value {
        self.value_at(sql_type, Utc::now())
    }

    /// `at` in the representation a column of `sql_type` expects.
    ///
    /// - integer columns: Unix seconds
    /// - `Date`: days since the epoch in the configured offset
    /// - `Time`: microseconds since local midnight
    /// - `Timestamp`/`DateTime`: microseconds of the local wall clock
    /// - `TimestampTz`: microseconds since the epoch, UTC
    /// - text columns: `YYYY-MM-DD HH:MM:SS` local
    pub fn value_at(&self, sql_type: &SqlType, at: DateTime<Utc>) -> Value {
        let local = at.with_timezone(&self.offset).naive_local();
        match sql_type {
            SqlType::Integer => {
                let secs = at.timestamp();
                i32::try_from(secs).map_or(Value::BigInt(secs), Value::Int)
            }
            t if t.is_integer() => Value::BigInt(at.timestamp()),
            SqlType::Date => {
                let days = NaiveDate::from_ymd_opt(1970, 1, 1)
                    .map_or(0, |epoch| local.date().signed_duration_since(epoch).num_days());
                Value::Date(i32::try_from(days).unwrap_or(i32::MAX))
            }
            SqlType::Time => {
                let time = local.time();
                let micros = i64::from(time.num_seconds_from_midnight()) * 1_000_000
                    + i64::from(time.nanosecond() / 1_000);
                Value::Time(micros)
            }
            SqlType::TimestampTz => Value::TimestampTz(at.timestamp_micros()),
            t if t.is_text() => Value::Text(local.format(TEXT_FORMAT).to_string()),
            _ => Value::Timestamp(local.and_utc().timestamp_micros()),
        }
    }
}
