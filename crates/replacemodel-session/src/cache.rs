//! Result-set cache invalidation.

use std::fmt;
use std::sync::Mutex;

/// A cache of query results that must forget a table after it is written.
pub trait CacheInvalidator: Send + Sync {
    /// Drop every cached result that depends on `table`.
    fn invalidate(&self, table: &str);
}

/// An invalidator that remembers which tables it was asked to drop.
///
/// Useful when a caller wants to invalidate lazily, e.g. once per
/// transaction instead of once per insert.
#[derive(Default)]
pub struct InvalidationLog {
    tables: Mutex<Vec<String>>,
}

impl InvalidationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tables invalidated so far, in order, without duplicates.
    pub fn tables(&self) -> Vec<String> {
        match self.tables.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Take the recorded tables, leaving the log empty.
    pub fn drain(&self) -> Vec<String> {
        match self.tables.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl CacheInvalidator for InvalidationLog {
    fn invalidate(&self, table: &str) {
        let mut tables = match self.tables.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !tables.iter().any(|t| t == table) {
            tables.push(table.to_string());
        }
    }
}

impl fmt::Debug for InvalidationLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvalidationLog")
            .field("tables", &self.tables())
            .finish()
    }
}
