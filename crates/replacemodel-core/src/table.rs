//! Table and column metadata for mapped record types.
//!
//! A [`Table`] is the per-type description that extraction, synthesis and
//! reconciliation walk: an ordered list of [`Column`]s, each carrying its
//! SQL type, role flags and plain `fn` accessors into the record.

use crate::Result;
use crate::error::{Error, UsageErrorKind};
use crate::types::SqlType;
use crate::value::Value;
use std::fmt;

/// Reads a column's current value from a record.
pub type Getter<M> = fn(&M) -> Value;

/// Writes a value into a record's field.
pub type Setter<M> = fn(&mut M, Value) -> Result<()>;

/// Converts a field value into its bound SQL representation.
pub type Conversion = fn(Value) -> Result<Value>;

/// One mapped column of a record type.
pub struct Column<M> {
    /// Database column name
    pub name: &'static str,
    /// Declared SQL type
    pub sql_type: SqlType,
    /// Generated by the database on insert
    pub auto_increment: bool,
    /// Set to the current time on insert
    pub created: bool,
    /// Set to the current time on insert and update
    pub updated: bool,
    /// Optimistic-lock counter, seeded to 1 on insert
    pub version: bool,
    /// Soft-delete marker, never written by inserts
    pub deleted: bool,
    /// Filled by the database only
    pub read_only: bool,
    getter: Getter<M>,
    setter: Option<Setter<M>>,
    conversion: Option<Conversion>,
}

impl<M> Column<M> {
    /// Create a plain column with a getter and no setter.
    pub fn new(name: &'static str, sql_type: SqlType, getter: Getter<M>) -> Self {
        Self {
            name,
            sql_type,
            auto_increment: false,
            created: false,
            updated: false,
            version: false,
            deleted: false,
            read_only: false,
            getter,
            setter: None,
            conversion: None,
        }
    }

    /// Attach a setter so generated values can be written back.
    pub fn with_setter(mut self, setter: Setter<M>) -> Self {
        self.setter = Some(setter);
        self
    }

    /// Attach a conversion applied to the getter's value before binding.
    pub fn with_conversion(mut self, conversion: Conversion) -> Self {
        self.conversion = Some(conversion);
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn created(mut self) -> Self {
        self.created = true;
        self
    }

    pub fn updated(mut self) -> Self {
        self.updated = true;
        self
    }

    pub fn version(mut self) -> Self {
        self.version = true;
        self
    }

    pub fn deleted(mut self) -> Self {
        self.deleted = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Whether the column receives a generated timestamp on insert.
    pub fn is_auto_time(&self) -> bool {
        self.created || self.updated
    }

    /// Whether the record field can be written.
    pub fn is_settable(&self) -> bool {
        self.setter.is_some()
    }

    /// Current field value, without conversion.
    pub fn raw_value(&self, record: &M) -> Value {
        (self.getter)(record)
    }

    /// Current field value passed through the column's conversion.
    #[allow(clippy::result_large_err)]
    pub fn bound_value(&self, record: &M) -> Result<Value> {
        let raw = (self.getter)(record);
        match self.conversion {
            Some(convert) => convert(raw),
            None => Ok(raw),
        }
    }

    /// Write `value` into the record.
    ///
    /// Returns `Ok(false)` without touching the record when the column has
    /// no setter.
    #[allow(clippy::result_large_err)]
    pub fn set(&self, record: &mut M, value: Value) -> Result<bool> {
        match self.setter {
            Some(setter) => setter(record, value).map(|()| true),
            None => Ok(false),
        }
    }
}

impl<M> Clone for Column<M> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            sql_type: self.sql_type.clone(),
            auto_increment: self.auto_increment,
            created: self.created,
            updated: self.updated,
            version: self.version,
            deleted: self.deleted,
            read_only: self.read_only,
            getter: self.getter,
            setter: self.setter,
            conversion: self.conversion,
        }
    }
}

impl<M> fmt::Debug for Column<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("name", &self.name)
            .field("sql_type", &self.sql_type)
            .field("auto_increment", &self.auto_increment)
            .field("created", &self.created)
            .field("updated", &self.updated)
            .field("version", &self.version)
            .field("deleted", &self.deleted)
            .field("read_only", &self.read_only)
            .field("settable", &self.setter.is_some())
            .finish_non_exhaustive()
    }
}

/// Metadata for one mapped record type.
pub struct Table<M> {
    name: String,
    columns: Vec<Column<M>>,
    auto_increment: Option<usize>,
    version: Option<usize>,
    sequence: Option<String>,
}

impl<M> Table<M> {
    /// Build a table, locating its auto-increment and version columns.
    ///
    /// At most one column may carry each of those roles.
    #[allow(clippy::result_large_err)]
    pub fn new(name: impl Into<String>, columns: Vec<Column<M>>) -> Result<Self> {
        let name = name.into();
        let auto_increment = single_role(&name, &columns, "auto-increment", |c| c.auto_increment)?;
        let version = single_role(&name, &columns, "version", |c| c.version)?;
        Ok(Self {
            name,
            columns,
            auto_increment,
            version,
            sequence: None,
        })
    }

    /// Use `sequence` instead of `seq_<table>` for sequence-based key lookup.
    pub fn with_sequence(mut self, sequence: impl Into<String>) -> Self {
        self.sequence = Some(sequence.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column<M>] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&Column<M>> {
        self.columns.get(index)
    }

    /// Index of the auto-increment column, if the table has one.
    pub fn auto_increment_index(&self) -> Option<usize> {
        self.auto_increment
    }

    pub fn auto_increment_column(&self) -> Option<&Column<M>> {
        self.auto_increment.and_then(|i| self.columns.get(i))
    }

    /// Index of the version column, if the table has one.
    pub fn version_index(&self) -> Option<usize> {
        self.version
    }

    pub fn version_column(&self) -> Option<&Column<M>> {
        self.version.and_then(|i| self.columns.get(i))
    }

    /// Sequence consulted for generated keys on sequence-query dialects.
    pub fn sequence_name(&self) -> String {
        self.sequence
            .clone()
            .unwrap_or_else(|| format!("seq_{}", self.name))
    }
}

impl<M> fmt::Debug for Table<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("columns", &self.columns)
            .field("auto_increment", &self.auto_increment)
            .field("version", &self.version)
            .field("sequence", &self.sequence)
            .finish()
    }
}

#[allow(clippy::result_large_err)]
fn single_role<M>(
    table: &str,
    columns: &[Column<M>],
    role: &str,
    has_role: impl Fn(&Column<M>) -> bool,
) -> Result<Option<usize>> {
    let mut found = None;
    for (i, column) in columns.iter().enumerate() {
        if !has_role(column) {
            continue;
        }
        if let Some(prev) = found {
            let prev: &Column<M> = &columns[prev];
            return Err(Error::usage(
                UsageErrorKind::DuplicateRole,
                format!(
                    "table '{}' declares more than one {} column ('{}' and '{}')",
                    table, role, prev.name, column.name
                ),
            ));
        }
        found = Some(i);
    }
    Ok(found)
}
