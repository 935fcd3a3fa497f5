//! Per-type table metadata cache.

use crate::Result;
use crate::error::{Error, UsageErrorKind};
use crate::model::Model;
use crate::table::Table;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Resolves and caches the [`Table`] of each record type.
///
/// Tables are built from [`Model::columns`] on first use and shared
/// behind `Arc` afterwards.
#[derive(Debug, Default)]
pub struct TableRegistry {
    tables: Mutex<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table metadata for `M`.
    ///
    /// Fails with `NotMapped` when `M` has an empty table name, or with
    /// `DuplicateRole` when its columns declare a role twice.
    #[allow(clippy::result_large_err)]
    pub fn resolve<M: Model>(&self) -> Result<Arc<Table<M>>> {
        if M::TABLE_NAME.is_empty() {
            return Err(Error::usage(
                UsageErrorKind::NotMapped,
                format!(
                    "type {} is not mapped to a table",
                    std::any::type_name::<M>()
                ),
            ));
        }

        let mut tables = match self.tables.lock() {
            Ok(guard) => guard,
            // Entries are immutable once inserted
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(cached) = tables.get(&TypeId::of::<M>()) {
            if let Ok(table) = Arc::clone(cached).downcast::<Table<M>>() {
                return Ok(table);
            }
        }

        let mut table = Table::new(M::TABLE_NAME, M::columns())?;
        if let Some(seq) = M::SEQUENCE_NAME {
            table = table.with_sequence(seq);
        }
        let table = Arc::new(table);
        tracing::trace!(table = M::TABLE_NAME, "Cached table metadata");
        tables.insert(
            TypeId::of::<M>(),
            Arc::clone(&table) as Arc<dyn Any + Send + Sync>,
        );
        Ok(table)
    }

    /// Number of cached tables.
    pub fn len(&self) -> usize {
        match self.tables.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
