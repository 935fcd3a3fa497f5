//! Per-call insert options.

use crate::cond::Cond;

/// Options for one replace-insert call.
///
/// # Example
///
/// ```ignore
/// let spec = InsertSpec::new()
///     .omit(["nickname"])
///     .set_expr("touched", "CURRENT_TIMESTAMP");
/// session.replace_insert(&cx, &mut user, &spec, HookQueue::new()).await;
/// ```
#[derive(Debug, Clone)]
pub struct InsertSpec {
    /// Table name override
    pub table: Option<String>,
    /// Allow-list of column names; empty means all columns
    pub cols: Vec<String>,
    /// Deny-list of column names
    pub omit: Vec<String>,
    /// Source-row filter; switches the statement to insert-from-select
    pub cond: Option<Cond>,
    /// Raw SQL expression columns, emitted after the bound columns
    pub exprs: Vec<(String, String)>,
    /// Fill created/updated columns with the current time
    pub use_auto_time: bool,
    /// Seed and bump the version column
    pub check_version: bool,
}

impl Default for InsertSpec {
    fn default() -> Self {
        Self {
            table: None,
            cols: Vec::new(),
            omit: Vec::new(),
            cond: None,
            exprs: Vec::new(),
            use_auto_time: true,
            check_version: true,
        }
    }
}

impl InsertSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write into `name` instead of the record type's table.
    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.table = Some(name.into());
        self
    }

    /// Only write the named columns.
    pub fn cols<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cols.extend(names.into_iter().map(Into::into));
        self
    }

    /// Never write the named columns.
    pub fn omit<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.omit.extend(names.into_iter().map(Into::into));
        self
    }

    /// Insert from a `SELECT` over the target table filtered by `cond`.
    ///
    /// Repeated calls are combined with AND.
    pub fn filter(mut self, cond: Cond) -> Self {
        self.cond = Some(match self.cond {
            Some(existing) => existing.and(cond),
            None => cond,
        });
        self
    }

    /// Set `column` to a raw SQL expression instead of a bound value.
    pub fn set_expr(mut self, column: impl Into<String>, sql: impl Into<String>) -> Self {
        self.exprs.push((column.into(), sql.into()));
        self
    }

    pub fn no_auto_time(mut self) -> Self {
        self.use_auto_time = false;
        self
    }

    pub fn no_version_check(mut self) -> Self {
        self.check_version = false;
        self
    }

    /// Whether `column` is on the deny-list (ASCII case-insensitive).
    pub fn is_omitted(&self, column: &str) -> bool {
        self.omit.iter().any(|c| c.eq_ignore_ascii_case(column))
    }

    /// Whether `column` passes the allow-list (ASCII case-insensitive).
    pub fn is_allowed(&self, column: &str) -> bool {
        self.cols.is_empty() || self.cols.iter().any(|c| c.eq_ignore_ascii_case(column))
    }

    /// Whether `column` is written as a raw expression instead.
    pub fn has_expr(&self, column: &str) -> bool {
        self.exprs
            .iter()
            .any(|(c, _)| c.eq_ignore_ascii_case(column))
    }
}
