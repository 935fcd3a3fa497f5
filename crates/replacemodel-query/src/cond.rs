//! Source-row conditions for insert-from-select statements.

use crate::writer::SqlWriter;
use replacemodel_core::Value;

/// A boolean condition over the target table's columns.
///
/// Values are bound as parameters; `Raw` text is emitted verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum Cond {
    /// `col = ?`
    Eq(String, Value),
    /// `col <> ?`
    Ne(String, Value),
    /// `col < ?`
    Lt(String, Value),
    /// `col > ?`
    Gt(String, Value),
    /// `col IN (?, ?)`
    In(String, Vec<Value>),
    /// `col IS NULL`
    IsNull(String),
    /// Conjunction; an empty list is always true.
    And(Vec<Cond>),
    /// Disjunction; an empty list is always false.
    Or(Vec<Cond>),
    /// Verbatim SQL fragment.
    Raw(String),
}

impl Cond {
    pub fn eq(col: impl Into<String>, value: impl Into<Value>) -> Self {
        Cond::Eq(col.into(), value.into())
    }

    pub fn ne(col: impl Into<String>, value: impl Into<Value>) -> Self {
        Cond::Ne(col.into(), value.into())
    }

    pub fn lt(col: impl Into<String>, value: impl Into<Value>) -> Self {
        Cond::Lt(col.into(), value.into())
    }

    pub fn gt(col: impl Into<String>, value: impl Into<Value>) -> Self {
        Cond::Gt(col.into(), value.into())
    }

    pub fn is_in(col: impl Into<String>, values: impl IntoIterator<Item = Value>) -> Self {
        Cond::In(col.into(), values.into_iter().collect())
    }

    pub fn is_null(col: impl Into<String>) -> Self {
        Cond::IsNull(col.into())
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Cond::Raw(sql.into())
    }

    /// Combine with another condition using AND.
    pub fn and(self, other: Cond) -> Self {
        match self {
            Cond::And(mut parts) => {
                parts.push(other);
                Cond::And(parts)
            }
            first => Cond::And(vec![first, other]),
        }
    }

    /// Combine with another condition using OR.
    pub fn or(self, other: Cond) -> Self {
        match self {
            Cond::Or(mut parts) => {
                parts.push(other);
                Cond::Or(parts)
            }
            first => Cond::Or(vec![first, other]),
        }
    }

    /// Write the condition into `w`, binding its values.
    pub fn write_to(&self, w: &mut SqlWriter) {
        match self {
            Cond::Eq(col, v) => binary(w, col, " = ", v),
            Cond::Ne(col, v) => binary(w, col, " <> ", v),
            Cond::Lt(col, v) => binary(w, col, " < ", v),
            Cond::Gt(col, v) => binary(w, col, " > ", v),
            Cond::In(col, values) => {
                if values.is_empty() {
                    w.push("1 = 0");
                    return;
                }
                w.ident(col);
                w.push(" IN (");
                w.bind_list(values.iter().cloned());
                w.push(")");
            }
            Cond::IsNull(col) => {
                w.ident(col);
                w.push(" IS NULL");
            }
            Cond::And(parts) => group(w, parts, " AND ", "1 = 1"),
            Cond::Or(parts) => group(w, parts, " OR ", "1 = 0"),
            Cond::Raw(sql) => w.push(sql),
        }
    }
}

fn binary(w: &mut SqlWriter, col: &str, op: &str, value: &Value) {
    w.ident(col);
    w.push(op);
    w.bind(value.clone());
}

fn group(w: &mut SqlWriter, parts: &[Cond], sep: &str, empty: &str) {
    match parts {
        [] => w.push(empty),
        [only] => only.write_to(w),
        _ => {
            w.push("(");
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    w.push(sep);
                }
                part.write_to(w);
            }
            w.push(")");
        }
    }
}
