//! Statement buffer pairing SQL text with its bound arguments.

use replacemodel_core::{Dialect, QuotePolicy, Result, Value};
use std::fmt;

/// Accumulates SQL text and positional arguments for one statement.
///
/// Placeholders are numbered across the whole statement, so a bind made
/// after a condition continues where the condition left off.
#[derive(Debug, Clone)]
pub struct SqlWriter {
    sql: String,
    args: Vec<Value>,
    dialect: Dialect,
    quote_policy: QuotePolicy,
}

impl SqlWriter {
    pub fn new(dialect: Dialect, quote_policy: QuotePolicy) -> Self {
        Self {
            sql: String::new(),
            args: Vec::new(),
            dialect,
            quote_policy,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn quote_policy(&self) -> QuotePolicy {
        self.quote_policy
    }

    /// Append raw SQL text.
    pub fn push(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    /// Append an identifier, quoted per the writer's policy.
    pub fn ident(&mut self, name: &str) {
        let quoted = self.dialect.quote_with(self.quote_policy, name);
        self.sql.push_str(&quoted);
    }

    /// Append `a, b, c` for a list of identifiers.
    pub fn ident_list<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        for (i, name) in names.into_iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.ident(name);
        }
    }

    /// Bind `value` and append its placeholder.
    pub fn bind(&mut self, value: Value) {
        self.args.push(value);
        let placeholder = self.dialect.placeholder(self.args.len());
        self.sql.push_str(&placeholder);
    }

    /// Bind each value, appending placeholders separated by `, `.
    pub fn bind_list(&mut self, values: impl IntoIterator<Item = Value>) {
        for (i, value) in values.into_iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.bind(value);
        }
    }

    /// Append formatted text, mapping formatter failures to a synthesis error.
    #[allow(clippy::result_large_err)]
    pub fn push_fmt(&mut self, args: fmt::Arguments<'_>) -> Result<()> {
        fmt::Write::write_fmt(self, args)?;
        Ok(())
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Consume the writer, returning the SQL text and its arguments.
    pub fn finish(self) -> (String, Vec<Value>) {
        (self.sql, self.args)
    }
}

impl fmt::Write for SqlWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.sql.push_str(s);
        Ok(())
    }
}
