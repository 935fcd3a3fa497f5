//! Core types and traits for replacemodel.
//!
//! This crate provides the foundations shared by statement synthesis and
//! execution:
//!
//! - `Model` trait and `Table`/`Column` metadata with field accessors
//! - `Dialect` profiles for quoting, placeholders and generated keys
//! - `Connection` trait for database connections
//! - `Value`/`Row` for parameters and results
//! - `Outcome` re-export from asupersync for cancel-correct operations
//! - `Cx` context for structured concurrency

// Re-export asupersync primitives for structured concurrency
pub use asupersync::{Cx, Outcome};

pub mod connection;
pub mod convert;
pub mod dialect;
pub mod error;
pub mod model;
pub mod registry;
pub mod row;
pub mod table;
pub mod types;
pub mod value;

pub use connection::{Connection, ExecResult};
pub use dialect::{Dialect, GeneratedKey, QuotePolicy};
pub use error::{
    Error, QueryError, QueryErrorKind, Result, TypeError, UsageError, UsageErrorKind,
};
pub use model::{AfterInsert, BeforeInsert, Model};
pub use registry::TableRegistry;
pub use row::{ColumnInfo, Row};
pub use table::{Column, Conversion, Getter, Setter, Table};
pub use types::SqlType;
pub use value::Value;
