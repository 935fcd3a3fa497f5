//! Before/after-insert hook scheduling.
//!
//! Hooks given to an insert call travel in a [`HookQueue`] that the call
//! consumes. After-insert work that cannot run yet because the session
//! holds an open transaction is parked in [`DeferredHooks`], keyed by
//! record identity, and handed back by `Session::commit` as an
//! [`AfterCommit`].

use replacemodel_core::Model;
use replacemodel_query::Hook;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Ordered before- and after-insert callbacks for one insert call.
pub struct HookQueue<M> {
    pub(crate) before: Vec<Hook<M>>,
    pub(crate) after: Vec<Hook<M>>,
}

impl<M> Default for HookQueue<M> {
    fn default() -> Self {
        Self {
            before: Vec::new(),
            after: Vec::new(),
        }
    }
}

impl<M> HookQueue<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` on each record before its columns are extracted.
    #[must_use]
    pub fn before(mut self, f: impl Fn(&mut M) + Send + Sync + 'static) -> Self {
        self.before.push(Arc::new(f));
        self
    }

    /// Run `f` on each record after a successful insert.
    #[must_use]
    pub fn after(mut self, f: impl Fn(&mut M) + Send + Sync + 'static) -> Self {
        self.after.push(Arc::new(f));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }
}

impl<M> fmt::Debug for HookQueue<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookQueue")
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .finish()
    }
}

/// Identity of an in-memory record: its type and address.
///
/// A record must stay in place between the insert and the commit for its
/// deferred hooks to be found again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordKey {
    type_id: TypeId,
    addr: usize,
}

impl RecordKey {
    pub fn of<M: 'static>(record: &M) -> Self {
        Self {
            type_id: TypeId::of::<M>(),
            addr: std::ptr::from_ref(record) as usize,
        }
    }
}

/// A boxed `Vec<Hook<M>>`; `None` marks a record whose only deferred work is
/// its `AfterInsert` capability.
type Entry = Option<Box<dyn Any + Send>>;

/// After-insert work parked until the surrounding transaction commits.
#[derive(Default)]
pub struct DeferredHooks {
    entries: HashMap<RecordKey, Entry>,
}

impl DeferredHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park `hooks` for `record`.
    ///
    /// Hooks are appended to any already parked for the same record. With no
    /// hooks, a capability marker is parked if the record has an
    /// `AfterInsert` capability and nothing is parked for it yet.
    pub fn defer<M: Model>(&mut self, record: &mut M, hooks: Vec<Hook<M>>) {
        let key = RecordKey::of(record);
        if hooks.is_empty() {
            if record.after_insert_hook().is_some() {
                self.entries.entry(key).or_insert(None);
            }
            return;
        }

        let existing = self
            .entries
            .get_mut(&key)
            .and_then(|entry| entry.as_mut())
            .and_then(|boxed| boxed.downcast_mut::<Vec<Hook<M>>>());
        match existing {
            Some(list) => list.extend(hooks),
            None => {
                self.entries.insert(key, Some(Box::new(hooks)));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether anything is parked for `record`.
    pub fn contains<M: 'static>(&self, record: &M) -> bool {
        self.entries.contains_key(&RecordKey::of(record))
    }

    /// Number of hooks parked for `record`; `Some(0)` for a capability marker.
    pub fn hook_count<M: 'static>(&self, record: &M) -> Option<usize> {
        let entry = self.entries.get(&RecordKey::of(record))?;
        Some(
            entry
                .as_ref()
                .and_then(|boxed| boxed.downcast_ref::<Vec<Hook<M>>>())
                .map_or(0, Vec::len),
        )
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn take(&mut self) -> AfterCommit {
        AfterCommit {
            entries: std::mem::take(&mut self.entries),
        }
    }
}

impl fmt::Debug for DeferredHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredHooks")
            .field("records", &self.entries.len())
            .finish()
    }
}

/// Deferred after-insert work released by a commit.
///
/// Call [`run`](AfterCommit::run) with each record inserted during the
/// transaction.
#[derive(Default)]
pub struct AfterCommit {
    entries: HashMap<RecordKey, Entry>,
}

impl AfterCommit {
    /// Run the hooks parked for `record`, then its `AfterInsert` capability.
    ///
    /// Returns `false` if nothing was parked for this record.
    pub fn run<M: Model>(&mut self, record: &mut M) -> bool {
        let Some(entry) = self.entries.remove(&RecordKey::of(record)) else {
            return false;
        };
        if let Some(hooks) = entry.and_then(|boxed| boxed.downcast::<Vec<Hook<M>>>().ok()) {
            for hook in hooks.iter() {
                hook(record);
            }
        }
        run_after_insert(record);
        true
    }

    /// Records still waiting to be run.
    pub fn pending(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for AfterCommit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AfterCommit")
            .field("pending", &self.entries.len())
            .finish()
    }
}

/// Run the record's `AfterInsert` capability, logging failures.
pub(crate) fn run_after_insert<M: Model>(record: &mut M) {
    if let Some(capability) = record.after_insert_hook() {
        if let Err(e) = capability.after_insert() {
            tracing::warn!(table = M::TABLE_NAME, error = %e, "After-insert hook failed");
        }
    }
}
