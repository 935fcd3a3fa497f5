//! Statement execution and generated-key reconciliation.
//!
//! How the auto-increment value comes back depends on the dialect:
//! drivers report it, the statement returns it, or a follow-up sequence
//! query reads it. Once the statement has run, failing to mirror the key
//! or version locally is logged, never returned.

use replacemodel_core::{
    Connection, Cx, Dialect, Error, GeneratedKey, Outcome, QueryError, QueryErrorKind, Row,
    Table, Value,
};
use replacemodel_query::{InsertSpec, Statement};

/// What execution learned about the generated key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratedId {
    /// No key to reconcile (no auto-increment column, or the driver gave none).
    Unavailable,
    /// The generated key.
    Id(i64),
    /// A key-returning statement produced no rows.
    Missing,
}

/// Result of executing one statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Execution {
    pub rows_affected: u64,
    pub id: GeneratedId,
}

/// Run a single-record statement using the dialect's key strategy.
pub async fn execute_single<C: Connection, M>(
    conn: &C,
    cx: &Cx,
    dialect: Dialect,
    table: &Table<M>,
    stmt: &Statement,
) -> Outcome<Execution, Error> {
    let Some(auto_increment) = table.auto_increment_column().map(|c| c.name) else {
        return match conn.execute(cx, &stmt.sql, &stmt.args).await {
            Outcome::Ok(res) => Outcome::Ok(Execution {
                rows_affected: res.rows_affected,
                id: GeneratedId::Unavailable,
            }),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        };
    };

    let strategy = dialect.generated_key();
    tracing::trace!(?strategy, table = table.name(), "Executing replace statement");

    match strategy {
        GeneratedKey::DriverReported => match conn.execute(cx, &stmt.sql, &stmt.args).await {
            Outcome::Ok(res) => Outcome::Ok(Execution {
                rows_affected: res.rows_affected,
                id: res
                    .last_insert_id
                    .filter(|id| *id > 0)
                    .map_or(GeneratedId::Unavailable, GeneratedId::Id),
            }),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        },
        GeneratedKey::Returning => match conn.query(cx, &stmt.sql, &stmt.args).await {
            Outcome::Ok(rows) => Outcome::Ok(from_rows(&rows, auto_increment)),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        },
        GeneratedKey::SequenceQuery => {
            match conn.execute(cx, &stmt.sql, &stmt.args).await {
                Outcome::Ok(_) => {}
                Outcome::Err(e) => return Outcome::Err(e),
                Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            }
            let sequence = table.sequence_name();
            let Some(sql) = dialect.sequence_query(&sequence) else {
                return Outcome::Ok(Execution {
                    rows_affected: 1,
                    id: GeneratedId::Unavailable,
                });
            };
            tracing::trace!(sql = %sql, "Reading generated key from sequence");
            match conn.query(cx, &sql, &[]).await {
                Outcome::Ok(rows) => Outcome::Ok(from_rows(&rows, auto_increment)),
                Outcome::Err(e) => Outcome::Err(e),
                Outcome::Cancelled(r) => Outcome::Cancelled(r),
                Outcome::Panicked(p) => Outcome::Panicked(p),
            }
        }
    }
}

/// Read the key from the first returned row.
///
/// The auto-increment column is preferred; drivers that name the result
/// column differently (e.g. `CURRVAL`) fall back to the first column.
fn from_rows(rows: &[Row], auto_increment: &str) -> Execution {
    let Some(row) = rows.first() else {
        return Execution {
            rows_affected: 0,
            id: GeneratedId::Missing,
        };
    };
    let parsed = match row.get_by_name(auto_increment) {
        Some(value) => value.parse_i64(),
        None => row.first_i64(),
    };
    let id = match parsed {
        Ok(id) if id > 0 => GeneratedId::Id(id),
        Ok(id) => {
            tracing::warn!(id, column = auto_increment, "Ignoring non-positive generated id");
            GeneratedId::Unavailable
        }
        Err(e) => {
            tracing::warn!(error = %e, column = auto_increment, "Failed to read generated id");
            GeneratedId::Unavailable
        }
    };
    Execution {
        rows_affected: 1,
        id,
    }
}

/// The error reported when a key-returning statement produced no rows.
pub fn missing_id_error(stmt: &Statement) -> Error {
    Error::Query(QueryError {
        kind: QueryErrorKind::NoGeneratedId,
        sql: Some(stmt.sql.clone()),
        sqlstate: None,
        message: "insert succeeded but no id returned".to_string(),
        source: None,
    })
}

/// Mirror the executed insert into `record`: bump the version column and
/// assign the generated key, each in the column's declared width.
///
/// Unsettable columns are skipped; failures are logged.
pub fn apply<M>(record: &mut M, table: &Table<M>, spec: &InsertSpec, id: GeneratedId) {
    if spec.check_version {
        if let Some(column) = table.version_column() {
            let bumped = column
                .raw_value(record)
                .parse_i64()
                .and_then(|v| Value::integer_for(&column.sql_type, v.saturating_add(1)));
            match bumped.and_then(|v| column.set(record, v)) {
                Ok(true) => {}
                Ok(false) => {
                    tracing::trace!(column = column.name, "Version column is not settable");
                }
                Err(e) => {
                    tracing::warn!(column = column.name, error = %e, "Failed to increment version");
                }
            }
        }
    }

    let GeneratedId::Id(id) = id else {
        return;
    };
    let Some(column) = table.auto_increment_column() else {
        return;
    };
    match Value::integer_for(&column.sql_type, id).and_then(|v| column.set(record, v)) {
        Ok(true) => {
            tracing::debug!(id, column = column.name, "Assigned generated id");
        }
        Ok(false) => {
            tracing::trace!(column = column.name, "Auto-increment column is not settable");
        }
        Err(e) => {
            tracing::warn!(id, column = column.name, error = %e, "Failed to assign generated id");
        }
    }
}
