//! Field extraction: deciding which columns of a record are written.

use crate::autotime::AutoTime;
use crate::spec::InsertSpec;
use replacemodel_core::{Column, Result, Table, Value};
use std::fmt;
use std::sync::Arc;

/// A callback run against a record, before or after insert.
pub type Hook<M> = Arc<dyn Fn(&mut M) + Send + Sync>;

/// The columns and values extracted from one record.
pub struct ExtractedRow<M> {
    /// Indices into the table's columns, in emission order
    pub columns: Vec<usize>,
    /// One bound value per entry of `columns`
    pub values: Vec<Value>,
    /// Write-backs of generated timestamps and version seeds
    pub after: Vec<Hook<M>>,
}

impl<M> ExtractedRow<M> {
    fn empty() -> Self {
        Self {
            columns: Vec::new(),
            values: Vec::new(),
            after: Vec::new(),
        }
    }

    /// Column names in emission order.
    pub fn column_names<'t>(&self, table: &'t Table<M>) -> Vec<&'t str> {
        self.columns
            .iter()
            .filter_map(|&i| table.column(i).map(|c| c.name))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<M> fmt::Debug for ExtractedRow<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractedRow")
            .field("columns", &self.columns)
            .field("values", &self.values)
            .field("after", &self.after.len())
            .finish()
    }
}

/// Extract the columns and values `record` contributes to an insert.
///
/// Conversion failures abort extraction; nothing is emitted for the
/// record in that case.
#[allow(clippy::result_large_err)]
pub fn extract_row<M: 'static>(
    table: &Table<M>,
    record: &M,
    spec: &InsertSpec,
    clock: &AutoTime,
) -> Result<ExtractedRow<M>> {
    let mut row = ExtractedRow::empty();
    for (index, column) in table.columns().iter().enumerate() {
        if skipped(column, record, spec) {
            continue;
        }
        emit(&mut row, index, column, record, spec, clock)?;
    }
    Ok(row)
}

/// Extract every record of a batch.
///
/// The column list is fixed by the first record; later records are walked
/// against that list with the same skip rules, so a record whose shape
/// differs contributes fewer values.
#[allow(clippy::result_large_err)]
pub fn extract_batch<M: 'static>(
    table: &Table<M>,
    records: &[M],
    spec: &InsertSpec,
    clock: &AutoTime,
) -> Result<Vec<ExtractedRow<M>>> {
    let Some((first, rest)) = records.split_first() else {
        return Ok(Vec::new());
    };

    let head = extract_row(table, first, spec, clock)?;
    let mut rows = Vec::with_capacity(records.len());
    for record in rest {
        let mut row = ExtractedRow::empty();
        for &index in &head.columns {
            let Some(column) = table.column(index) else {
                continue;
            };
            if skipped(column, record, spec) {
                continue;
            }
            emit(&mut row, index, column, record, spec, clock)?;
        }
        if row.columns.len() != head.columns.len() {
            tracing::debug!(
                table = table.name(),
                expected = head.columns.len(),
                actual = row.columns.len(),
                "Batch record contributes a different column count"
            );
        }
        rows.push(row);
    }
    rows.insert(0, head);
    Ok(rows)
}

fn skipped<M>(column: &Column<M>, record: &M, spec: &InsertSpec) -> bool {
    if column.auto_increment && column.raw_value(record).is_zero() {
        return true;
    }
    if column.read_only || column.deleted {
        return true;
    }
    if spec.is_omitted(column.name) || !spec.is_allowed(column.name) {
        return true;
    }
    // Written as a raw expression instead
    spec.has_expr(column.name)
}

#[allow(clippy::result_large_err)]
fn emit<M: 'static>(
    row: &mut ExtractedRow<M>,
    index: usize,
    column: &Column<M>,
    record: &M,
    spec: &InsertSpec,
    clock: &AutoTime,
) -> Result<()> {
    let value = if column.is_auto_time() && spec.use_auto_time {
        let now = clock.now_value(&column.sql_type);
        row.after.push(write_back(column, now.clone()));
        now
    } else if column.version && spec.check_version {
        let seed = Value::integer_for(&column.sql_type, 1)?;
        row.after.push(write_back(column, seed.clone()));
        seed
    } else {
        column.bound_value(record)?
    };
    row.columns.push(index);
    row.values.push(value);
    Ok(())
}

/// Hook assigning `value` to `column` of the record it is run against.
fn write_back<M: 'static>(column: &Column<M>, value: Value) -> Hook<M> {
    let column = column.clone();
    Arc::new(move |record: &mut M| {
        if let Err(e) = column.set(record, value.clone()) {
            tracing::warn!(column = column.name, error = %e, "Failed to write back generated value");
        }
    })
}
