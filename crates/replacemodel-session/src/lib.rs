//! Replace-insert execution for replacemodel.
//!
//! `replacemodel-session` is the **execution layer**. A [`Session`] owns a
//! `Connection`, runs the hooks around each insert, executes the
//! synthesized statement, and mirrors generated ids and version counters
//! back into the caller's records.
//!
//! # Role In The Architecture
//!
//! - **Hook scheduling**: before-insert hooks always run before extraction;
//!   after-insert hooks run immediately under auto-commit or are deferred
//!   until [`Session::commit`] inside a transaction.
//! - **Key reconciliation**: per-dialect strategies in [`reconcile`].
//! - **Cache invalidation**: an optional [`CacheInvalidator`] forgets the
//!   written table after every successful insert.
//!
//! # Example
//!
//! ```ignore
//! let mut session = Session::with_config(conn, SessionConfig::new().dialect(Dialect::Postgres));
//!
//! let mut user = User { id: 0, name: "ann".into() };
//! let affected = session
//!     .replace_insert(&cx, &mut user, &InsertSpec::new(), HookQueue::new())
//!     .await;
//! // user.id now holds the generated key
//! ```

pub mod cache;
pub mod config;
pub mod hooks;
pub mod reconcile;

pub use cache::{CacheInvalidator, InvalidationLog};
pub use config::SessionConfig;
pub use hooks::{AfterCommit, DeferredHooks, HookQueue, RecordKey};
pub use reconcile::{Execution, GeneratedId};

use replacemodel_core::{
    Connection, Cx, Error, Model, Outcome, Result, Table, TableRegistry, UsageErrorKind,
};
use replacemodel_query::{
    AutoTime, ExtractedRow, Hook, InsertSpec, build_batch, build_single, extract_batch,
    extract_row,
};
use std::sync::Arc;

/// Executes replace-inserts over one connection.
///
/// A session is either in auto-commit mode (the default) or holding a
/// transaction opened with [`begin`](Session::begin). The mode decides
/// whether after-insert hooks run immediately or wait for
/// [`commit`](Session::commit).
pub struct Session<C: Connection> {
    /// The database connection.
    connection: C,
    /// Configuration.
    config: SessionConfig,
    /// Clock for generated timestamps, derived from the configuration.
    clock: AutoTime,
    /// Whether we're in a transaction.
    in_transaction: bool,
    /// After-insert work waiting for commit.
    deferred: DeferredHooks,
    /// Table metadata, shareable across sessions.
    registry: Arc<TableRegistry>,
    /// Result-set cache to invalidate after writes.
    cache: Option<Arc<dyn CacheInvalidator>>,
}

impl<C: Connection> Session<C> {
    /// Create a new session from an existing connection.
    pub fn new(connection: C) -> Self {
        Self::with_config(connection, SessionConfig::default())
    }

    /// Create a new session with custom configuration.
    pub fn with_config(connection: C, config: SessionConfig) -> Self {
        Self {
            connection,
            clock: config.clock(),
            config,
            in_transaction: false,
            deferred: DeferredHooks::new(),
            registry: Arc::new(TableRegistry::new()),
            cache: None,
        }
    }

    /// Share table metadata with other sessions.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<TableRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Invalidate `cache` after every successful insert.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn CacheInvalidator>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Get a reference to the underlying connection.
    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<TableRegistry> {
        &self.registry
    }

    /// Whether after-insert hooks run immediately.
    pub fn is_auto_commit(&self) -> bool {
        !self.in_transaction
    }

    /// After-insert work deferred until commit.
    pub fn deferred_hooks(&self) -> &DeferredHooks {
        &self.deferred
    }

    // ========================================================================
    // Replace-insert
    // ========================================================================

    /// Insert or replace one record.
    ///
    /// Runs the before-insert hooks, writes the record, assigns the generated
    /// id and bumps the version column, then runs or defers the after-insert
    /// hooks. Returns the number of affected rows.
    ///
    /// On key-returning dialects an empty result is reported as a
    /// `NoGeneratedId` query error even though the row was written.
    #[tracing::instrument(level = "debug", skip_all, fields(table = M::TABLE_NAME))]
    pub async fn replace_insert<M: Model>(
        &mut self,
        cx: &Cx,
        record: &mut M,
        spec: &InsertSpec,
        hooks: HookQueue<M>,
    ) -> Outcome<u64, Error> {
        let table = match self.registry.resolve::<M>() {
            Ok(table) => table,
            Err(e) => return Outcome::Err(e),
        };
        let target = match target_table(&table, spec) {
            Ok(target) => target,
            Err(e) => return Outcome::Err(e),
        };

        if let Err(e) = run_before(record, &hooks.before) {
            return Outcome::Err(e);
        }

        let row = match extract_row(&table, record, spec, &self.clock) {
            Ok(row) => row,
            Err(e) => return Outcome::Err(e),
        };
        let stmt = match build_single(
            &table,
            &row,
            spec,
            self.config.dialect,
            self.config.quote_policy,
        ) {
            Ok(stmt) => stmt,
            Err(e) => return Outcome::Err(e),
        };

        let execution = match reconcile::execute_single(
            &self.connection,
            cx,
            self.config.dialect,
            &table,
            &stmt,
        )
        .await
        {
            Outcome::Ok(execution) => execution,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };

        self.invalidate(target);
        reconcile::apply(record, &table, spec, execution.id);
        self.after_phase(record, row, &hooks.after);

        if execution.id == GeneratedId::Missing {
            return Outcome::Err(reconcile::missing_id_error(&stmt));
        }
        Outcome::Ok(execution.rows_affected)
    }

    /// Insert or replace every record in one statement.
    ///
    /// The column list comes from the first record. Generated ids and
    /// version counters are not read back in batch mode.
    #[tracing::instrument(level = "debug", skip_all, fields(table = M::TABLE_NAME, count = records.len()))]
    pub async fn replace_insert_many<M: Model>(
        &mut self,
        cx: &Cx,
        records: &mut [M],
        spec: &InsertSpec,
        hooks: HookQueue<M>,
    ) -> Outcome<u64, Error> {
        if records.is_empty() {
            return Outcome::Err(Error::usage(
                UsageErrorKind::EmptyBatch,
                "could not insert an empty slice",
            ));
        }

        let table = match self.registry.resolve::<M>() {
            Ok(table) => table,
            Err(e) => return Outcome::Err(e),
        };
        let target = match target_table(&table, spec) {
            Ok(target) => target,
            Err(e) => return Outcome::Err(e),
        };

        for record in records.iter_mut() {
            if let Err(e) = run_before(record, &hooks.before) {
                return Outcome::Err(e);
            }
        }

        let rows = match extract_batch(&table, records, spec, &self.clock) {
            Ok(rows) => rows,
            Err(e) => return Outcome::Err(e),
        };
        let stmt = match build_batch(
            &table,
            &rows,
            spec,
            self.config.dialect,
            self.config.quote_policy,
        ) {
            Ok(stmt) => stmt,
            Err(e) => return Outcome::Err(e),
        };

        let affected = match self.connection.execute(cx, &stmt.sql, &stmt.args).await {
            Outcome::Ok(res) => res.rows_affected,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };

        self.invalidate(target);
        for (record, row) in records.iter_mut().zip(rows) {
            self.after_phase(record, row, &hooks.after);
        }

        Outcome::Ok(affected)
    }

    // ========================================================================
    // Transaction Management
    // ========================================================================

    /// Begin a transaction. After-insert hooks are deferred until commit.
    pub async fn begin(&mut self, cx: &Cx) -> Outcome<(), Error> {
        if self.in_transaction {
            return Outcome::Ok(());
        }

        match self.connection.execute(cx, "BEGIN", &[]).await {
            Outcome::Ok(_) => {
                self.in_transaction = true;
                Outcome::Ok(())
            }
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// Commit the current transaction and release its deferred hooks.
    ///
    /// The returned [`AfterCommit`] runs each record's deferred hooks when
    /// handed that record. On failure the deferred hooks stay parked.
    pub async fn commit(&mut self, cx: &Cx) -> Outcome<AfterCommit, Error> {
        if self.in_transaction {
            match self.connection.execute(cx, "COMMIT", &[]).await {
                Outcome::Ok(_) => {
                    self.in_transaction = false;
                }
                Outcome::Err(e) => return Outcome::Err(e),
                Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            }
        }

        let after = self.deferred.take();
        tracing::debug!(records = after.pending(), "Released deferred after-insert hooks");
        Outcome::Ok(after)
    }

    /// Rollback the current transaction, discarding deferred hooks.
    pub async fn rollback(&mut self, cx: &Cx) -> Outcome<(), Error> {
        if self.in_transaction {
            match self.connection.execute(cx, "ROLLBACK", &[]).await {
                Outcome::Ok(_) => {
                    self.in_transaction = false;
                }
                Outcome::Err(e) => return Outcome::Err(e),
                Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            }
        }

        self.deferred.clear();
        Outcome::Ok(())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn invalidate(&self, table: &str) {
        if let Some(cache) = &self.cache {
            tracing::trace!(table, "Invalidating cached results");
            cache.invalidate(table);
        }
    }

    /// Run or defer the caller's after-insert hooks followed by the
    /// timestamp and version write-backs in `row`.
    ///
    /// Caller hooks therefore observe the record as it was bound, and the
    /// write-backs have the final word on generated fields.
    fn after_phase<M: Model>(&mut self, record: &mut M, row: ExtractedRow<M>, shared: &[Hook<M>]) {
        let mut pending: Vec<Hook<M>> = shared.to_vec();
        pending.extend(row.after);

        if self.is_auto_commit() {
            for hook in &pending {
                hook(record);
            }
            hooks::run_after_insert(record);
        } else {
            tracing::debug!(
                table = M::TABLE_NAME,
                hooks = pending.len(),
                "Deferring after-insert hooks until commit"
            );
            self.deferred.defer(record, pending);
        }
    }
}

impl<C: Connection> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("in_transaction", &self.in_transaction)
            .field("deferred", &self.deferred)
            .field("tables", &self.registry.len())
            .field("cache", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

/// The table a call writes to: the per-call override, else the mapped name.
#[allow(clippy::result_large_err)]
fn target_table<'a, M>(table: &'a Table<M>, spec: &'a InsertSpec) -> Result<&'a str> {
    let name = spec.table.as_deref().unwrap_or_else(|| table.name());
    if name.is_empty() {
        return Err(Error::usage(
            UsageErrorKind::NotMapped,
            "no table name for replace insert",
        ));
    }
    Ok(name)
}

/// Run the before-insert hooks, then the record's `BeforeInsert` capability.
#[allow(clippy::result_large_err)]
fn run_before<M: Model>(record: &mut M, hooks: &[Hook<M>]) -> Result<()> {
    for hook in hooks {
        hook(record);
    }
    if let Some(capability) = record.before_insert_hook() {
        capability.before_insert()?;
    }
    Ok(())
}
