//! Model trait for mapping record types to tables.

use crate::Result;
use crate::table::Column;

/// Trait for types that can be replace-inserted into a table.
///
/// Implementations describe their columns once; [`TableRegistry`] builds
/// and caches the resulting [`Table`].
///
/// [`TableRegistry`]: crate::registry::TableRegistry
/// [`Table`]: crate::table::Table
///
/// # Example
///
/// ```ignore
/// impl Model for User {
///     const TABLE_NAME: &'static str = "users";
///
///     fn columns() -> Vec<Column<Self>> {
///         vec![
///             Column::new("id", SqlType::BigInt, |u: &User| Value::BigInt(u.id))
///                 .auto_increment()
///                 .with_setter(|u, v| { u.id = v.parse_i64()?; Ok(()) }),
///             Column::new("name", SqlType::Text, |u: &User| Value::Text(u.name.clone())),
///         ]
///     }
/// }
/// ```
pub trait Model: Sized + Send + Sync + 'static {
    /// The name of the database table. Empty means the type is not mapped.
    const TABLE_NAME: &'static str;

    /// Sequence backing the auto-increment column on sequence-query dialects.
    ///
    /// Defaults to `seq_<table>` when unset.
    const SEQUENCE_NAME: Option<&'static str> = None;

    /// Column metadata in declaration order.
    fn columns() -> Vec<Column<Self>>;

    /// The record's before-insert capability, if it has one.
    fn before_insert_hook(&mut self) -> Option<&mut dyn BeforeInsert> {
        None
    }

    /// The record's after-insert capability, if it has one.
    fn after_insert_hook(&mut self) -> Option<&mut dyn AfterInsert> {
        None
    }
}

/// Runs on a record before it is written. Returning an error aborts the
/// insert before any SQL is issued.
pub trait BeforeInsert {
    #[allow(clippy::result_large_err)]
    fn before_insert(&mut self) -> Result<()>;
}

/// Runs on a record after it has been written and reconciled.
///
/// The record already carries its generated id and version at this point.
pub trait AfterInsert {
    #[allow(clippy::result_large_err)]
    fn after_insert(&mut self) -> Result<()>;
}
