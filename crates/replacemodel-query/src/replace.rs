//! Replace-insert statement synthesis.
//!
//! Turns extracted rows into `REPLACE INTO` statements (or `INSERT ALL`
//! for Oracle batches) with dialect-specific quoting, placeholders and
//! generated-key clauses.

use crate::extract::ExtractedRow;
use crate::spec::InsertSpec;
use crate::writer::SqlWriter;
use replacemodel_core::{Dialect, Error, QuotePolicy, Result, Table, UsageErrorKind, Value};

/// A synthesized statement and its positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<Value>,
}

impl Statement {
    fn from_writer(w: SqlWriter) -> Self {
        let (sql, args) = w.finish();
        Self { sql, args }
    }
}

/// Build the statement for one record.
///
/// Shapes, by case:
/// - no bound columns: `REPLACE INTO t VALUES ()` on MySQL, otherwise
///   `REPLACE INTO t DEFAULT VALUES`
/// - with a source filter: `REPLACE INTO t (cols) SELECT ?, .. FROM t WHERE ..`
/// - otherwise: `REPLACE INTO t (cols) VALUES (?, ..)`
///
/// Raw expression columns follow the bound columns. SQL Server gets an
/// `OUTPUT Inserted.<id>` clause and PostgreSQL a trailing `RETURNING <id>`
/// when the table has an auto-increment column.
#[allow(clippy::result_large_err)]
pub fn build_single<M>(
    table: &Table<M>,
    row: &ExtractedRow<M>,
    spec: &InsertSpec,
    dialect: Dialect,
    quote_policy: QuotePolicy,
) -> Result<Statement> {
    let table_name = target_name(table, spec);
    let auto_increment = table.auto_increment_column().map(|c| c.name);
    let output = dialect.output_clause(quote_policy, auto_increment);

    let mut w = SqlWriter::new(dialect, quote_policy);
    w.push("REPLACE INTO ");
    w.ident(table_name);

    if row.is_empty() {
        if dialect.empty_values_insert() {
            w.push(" VALUES ()");
        } else {
            w.push_fmt(format_args!("{} DEFAULT VALUES", output))?;
        }
    } else {
        w.push(" (");
        w.ident_list(
            row.column_names(table)
                .into_iter()
                .chain(spec.exprs.iter().map(|(name, _)| name.as_str())),
        );
        w.push(")");
        w.push(&output);

        if let Some(cond) = &spec.cond {
            w.push(" SELECT ");
            write_tuple(&mut w, &row.values, spec);
            w.push(" FROM ");
            w.ident(table_name);
            w.push(" WHERE ");
            cond.write_to(&mut w);
        } else {
            w.push(" VALUES (");
            write_tuple(&mut w, &row.values, spec);
            w.push(")");
        }
    }

    w.push(&dialect.returning_clause(quote_policy, auto_increment));

    let stmt = Statement::from_writer(w);
    tracing::trace!(sql = %stmt.sql, args = stmt.args.len(), "Synthesized replace statement");
    Ok(stmt)
}

/// Build one statement inserting every row.
///
/// The column list is taken from the first row. Dialects without multi-row
/// `VALUES` get `INSERT ALL INTO .. SELECT 1 FROM DUAL`. No generated-key
/// clause is emitted in batch mode.
#[allow(clippy::result_large_err)]
pub fn build_batch<M>(
    table: &Table<M>,
    rows: &[ExtractedRow<M>],
    spec: &InsertSpec,
    dialect: Dialect,
    quote_policy: QuotePolicy,
) -> Result<Statement> {
    let Some(first) = rows.first() else {
        return Err(Error::usage(
            UsageErrorKind::EmptyBatch,
            "could not build a batch statement from zero rows",
        ));
    };
    let table_name = target_name(table, spec);
    let columns: Vec<&str> = first
        .column_names(table)
        .into_iter()
        .chain(spec.exprs.iter().map(|(name, _)| name.as_str()))
        .collect();

    let mut w = SqlWriter::new(dialect, quote_policy);
    if dialect.supports_multi_row_values() {
        w.push("REPLACE INTO ");
        w.ident(table_name);
        w.push(" (");
        w.ident_list(columns.iter().copied());
        w.push(") VALUES ");
        for (i, row) in rows.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.push("(");
            write_tuple(&mut w, &row.values, spec);
            w.push(")");
        }
    } else {
        w.push("INSERT ALL");
        for row in rows {
            w.push(" INTO ");
            w.ident(table_name);
            w.push(" (");
            w.ident_list(columns.iter().copied());
            w.push(") VALUES (");
            write_tuple(&mut w, &row.values, spec);
            w.push(")");
        }
        w.push(" SELECT 1 FROM DUAL");
    }

    let stmt = Statement::from_writer(w);
    tracing::trace!(
        sql = %stmt.sql,
        rows = rows.len(),
        args = stmt.args.len(),
        "Synthesized batch replace statement"
    );
    Ok(stmt)
}

fn target_name<'a, M>(table: &'a Table<M>, spec: &'a InsertSpec) -> &'a str {
    spec.table.as_deref().unwrap_or_else(|| table.name())
}

/// Placeholders for `values` followed by the raw expression SQL.
fn write_tuple(w: &mut SqlWriter, values: &[Value], spec: &InsertSpec) {
    w.bind_list(values.iter().cloned());
    for (i, (_, sql)) in spec.exprs.iter().enumerate() {
        if i > 0 || !values.is_empty() {
            w.push(", ");
        }
        w.push(sql);
    }
}
