//! Database connection trait.
//!
//! Replace-insert needs exactly two primitives from a driver: run a
//! statement and report what it did, or run a statement and hand back
//! its rows. Pooling, prepared statements and wire protocols live in
//! driver crates.
//!
//! All operations integrate with asupersync's structured concurrency via `Cx`
//! for proper cancellation and timeout handling.

use crate::row::Row;
use crate::value::Value;
use asupersync::{Cx, Outcome};

/// What a driver reports after executing a statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// Rows inserted, replaced or otherwise affected.
    pub rows_affected: u64,
    /// Last generated id, for drivers that report one.
    pub last_insert_id: Option<i64>,
}

impl ExecResult {
    /// A result with only an affected-row count.
    pub const fn affected(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            last_insert_id: None,
        }
    }

    /// Attach a driver-reported generated id.
    pub const fn with_last_insert_id(mut self, id: i64) -> Self {
        self.last_insert_id = Some(id);
        self
    }
}

/// A database connection capable of executing statements.
///
/// Implementations must be `Send + Sync` for use across async boundaries.
///
/// # Example
///
/// ```rust,ignore
/// let res = conn.execute(&cx, "REPLACE INTO `t` (`name`) VALUES (?)", &[Value::from("x")]).await;
/// let rows = conn.query(&cx, "REPLACE INTO \"t\" (\"name\") VALUES ($1) RETURNING \"id\"", &params).await;
/// ```
pub trait Connection: Send + Sync {
    /// Execute a statement and return the affected count and any generated id.
    fn execute(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<ExecResult, crate::Error>> + Send;

    /// Execute a statement and return all rows it produced.
    fn query(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Row>, crate::Error>> + Send;
}
