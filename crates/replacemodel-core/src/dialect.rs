//! Database dialect profiles.
//!
//! A [`Dialect`] bundles the static facts about one database engine family
//! that replace-insert synthesis and id reconciliation depend on: how
//! identifiers are quoted, how placeholders are spelled, whether multi-row
//! `VALUES` lists exist, and how generated keys come back.

use serde::{Deserialize, Serialize};

/// SQL dialect for generating dialect-specific SQL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// MySQL / MariaDB (uses ? placeholders, `LAST_INSERT_ID`)
    #[default]
    Mysql,
    /// SQLite (uses ? placeholders, `last_insert_rowid`)
    Sqlite,
    /// PostgreSQL (uses $1, $2 placeholders, RETURNING)
    Postgres,
    /// Microsoft SQL Server (uses @p1 placeholders, OUTPUT Inserted.*)
    Mssql,
    /// Oracle (uses :1 placeholders, sequences, no multi-row VALUES)
    Oracle,
}

/// How a dialect hands back the value of an auto-increment column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratedKey {
    /// The driver reports the last generated id alongside the affected count.
    DriverReported,
    /// The statement itself carries a RETURNING/OUTPUT clause and is run as a query.
    Returning,
    /// A follow-up query reads the current value of the table's sequence.
    SequenceQuery,
}

/// When identifiers are wrapped in the dialect's quote characters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotePolicy {
    /// Quote every table and column name.
    #[default]
    Always,
    /// Emit identifiers verbatim.
    Never,
}

impl Dialect {
    /// Generate a placeholder for the given parameter index (1-based).
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Mssql => format!("@p{index}"),
            Dialect::Oracle => format!(":{index}"),
            Dialect::Mysql | Dialect::Sqlite => "?".to_string(),
        }
    }

    /// Quote an identifier for this dialect.
    ///
    /// Embedded quote characters are escaped by doubling them.
    pub fn quote_identifier(self, name: &str) -> String {
        match self {
            Dialect::Postgres | Dialect::Sqlite | Dialect::Oracle => {
                let escaped = name.replace('"', "\"\"");
                format!("\"{}\"", escaped)
            }
            Dialect::Mysql => {
                let escaped = name.replace('`', "``");
                format!("`{}`", escaped)
            }
            Dialect::Mssql => {
                let escaped = name.replace(']', "]]");
                format!("[{}]", escaped)
            }
        }
    }

    /// Quote an identifier according to `policy`.
    pub fn quote_with(self, policy: QuotePolicy, name: &str) -> String {
        match policy {
            QuotePolicy::Always => self.quote_identifier(name),
            QuotePolicy::Never => name.to_string(),
        }
    }

    /// Whether one statement can carry several `VALUES` tuples.
    ///
    /// Oracle has no multi-row `VALUES`; batches use `INSERT ALL` instead.
    pub const fn supports_multi_row_values(self) -> bool {
        !matches!(self, Dialect::Oracle)
    }

    /// Whether an insert with no columns is written as `VALUES ()`.
    ///
    /// Every other dialect uses `DEFAULT VALUES`.
    pub const fn empty_values_insert(self) -> bool {
        matches!(self, Dialect::Mysql)
    }

    /// How generated auto-increment values are retrieved.
    pub const fn generated_key(self) -> GeneratedKey {
        match self {
            Dialect::Mysql | Dialect::Sqlite => GeneratedKey::DriverReported,
            Dialect::Postgres | Dialect::Mssql => GeneratedKey::Returning,
            Dialect::Oracle => GeneratedKey::SequenceQuery,
        }
    }

    /// Clause placed between the column list and the row source that reports
    /// the generated key (`OUTPUT Inserted.<col>` on SQL Server).
    pub fn output_clause(self, policy: QuotePolicy, auto_increment: Option<&str>) -> String {
        match (self, auto_increment) {
            (Dialect::Mssql, Some(col)) => {
                format!(" OUTPUT Inserted.{}", self.quote_with(policy, col))
            }
            _ => String::new(),
        }
    }

    /// Clause appended after the statement that reports the generated key
    /// (`RETURNING <col>` on PostgreSQL).
    pub fn returning_clause(self, policy: QuotePolicy, auto_increment: Option<&str>) -> String {
        match (self, auto_increment) {
            (Dialect::Postgres, Some(col)) => {
                format!(" RETURNING {}", self.quote_with(policy, col))
            }
            _ => String::new(),
        }
    }

    /// Query reading the current value of `sequence` (sequence-query dialects only).
    pub fn sequence_query(self, sequence: &str) -> Option<String> {
        match self.generated_key() {
            GeneratedKey::SequenceQuery => Some(format!("SELECT {}.CURRVAL FROM DUAL", sequence)),
            _ => None,
        }
    }
}
