//! replacemodel - insert-or-replace for Rust data models.
//!
//! Given one or many in-memory records, replacemodel:
//!
//! - decides which fields become SQL columns
//! - writes dialect-correct `REPLACE INTO` statements
//! - executes them through a `Connection`
//! - writes generated ids and version counters back into the records
//! - runs or defers before/after-insert hooks
//!
//! # Quick Start
//!
//! ```ignore
//! use replacemodel::prelude::*;
//!
//! struct Hero {
//!     id: i64,
//!     name: String,
//! }
//!
//! impl Model for Hero {
//!     const TABLE_NAME: &'static str = "heroes";
//!
//!     fn columns() -> Vec<Column<Self>> {
//!         vec![
//!             Column::new("id", SqlType::BigInt, |h: &Hero| Value::BigInt(h.id))
//!                 .auto_increment()
//!                 .with_setter(|h, v| { h.id = v.parse_i64()?; Ok(()) }),
//!             Column::new("name", SqlType::Text, |h: &Hero| Value::Text(h.name.clone())),
//!         ]
//!     }
//! }
//!
//! async fn save(cx: &Cx, conn: impl Connection) {
//!     let mut session = Session::with_config(conn, SessionConfig::new().dialect(Dialect::Postgres));
//!     let mut hero = Hero { id: 0, name: "Spider-Man".to_string() };
//!     session
//!         .replace_insert(cx, &mut hero, &InsertSpec::new(), HookQueue::new())
//!         .await;
//!     assert!(hero.id > 0);
//! }
//! ```
//!
//! # Dialects
//!
//! | dialect | placeholders | generated key |
//! |---------|--------------|---------------|
//! | MySQL | `?` | reported by the driver |
//! | SQLite | `?` | reported by the driver |
//! | PostgreSQL | `$n` | `RETURNING` |
//! | SQL Server | `@pn` | `OUTPUT Inserted.<col>` |
//! | Oracle | `:n` | `SELECT <seq>.CURRVAL FROM DUAL` |

pub use replacemodel_core::{
    AfterInsert, BeforeInsert, Column, ColumnInfo, Connection, Conversion, Cx, Dialect, Error,
    ExecResult, GeneratedKey, Getter, Model, Outcome, QueryError, QueryErrorKind, QuotePolicy,
    Result, Row, Setter, SqlType, Table, TableRegistry, TypeError, UsageError,
    UsageErrorKind, Value, convert,
};
pub use replacemodel_query::{
    AutoTime, Cond, ExtractedRow, Hook, InsertSpec, SqlWriter, Statement, build_batch,
    build_single, extract_batch, extract_row,
};
pub use replacemodel_session::{
    AfterCommit, CacheInvalidator, DeferredHooks, Execution, GeneratedId, HookQueue,
    InvalidationLog, RecordKey, Session, SessionConfig,
};

/// Common imports for mapping records and running inserts.
pub mod prelude {
    pub use crate::{
        // Capabilities
        AfterInsert,
        BeforeInsert,
        // Metadata
        Column,
        // Core traits and types
        Connection,
        Cx,
        Dialect,
        Error,
        ExecResult,
        // Session
        HookQueue,
        // Options
        InsertSpec,
        Cond,
        Model,
        Outcome,
        QuotePolicy,
        Result,
        Row,
        Session,
        SessionConfig,
        SqlType,
        Value,
    };
}
