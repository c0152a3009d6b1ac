//! Filter types for dynamic query building.
//!
//! Filters carry caller input, so LIKE patterns built from literals must
//! go through [`escape_like`] before they reach a query.

use serde::{Deserialize, Serialize};

/// Filter comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    /// Exact equality.
    Eq,
    /// Not equal.
    Ne,
    /// SQL `LIKE` pattern match (case-sensitive).
    Like,
    /// SQL `IS NULL` check.
    IsNull,
    /// SQL `IS NOT NULL` check.
    IsNotNull,
}

/// A dynamic filter value that can represent various SQL types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// A string value.
    String(String),
    /// An integer value.
    Integer(i64),
    /// A boolean value.
    Boolean(bool),
    /// Null / no value (for `IS NULL`, `IS NOT NULL`).
    Null,
}

/// A single filter condition on a named field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterField {
    /// The column or field name to filter on.
    pub field: String,
    /// The comparison operator.
    pub op: FilterOp,
    /// The value to compare against.
    pub value: FilterValue,
}

impl FilterField {
    /// Create a new filter field.
    pub fn new(field: impl Into<String>, op: FilterOp, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }

    /// Shorthand for a string equality filter.
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, FilterOp::Eq, FilterValue::String(value.into()))
    }

    /// Shorthand for a boolean equality filter.
    pub fn eq_bool(field: impl Into<String>, value: bool) -> Self {
        Self::new(field, FilterOp::Eq, FilterValue::Boolean(value))
    }

    /// Shorthand for a raw LIKE filter. The pattern is passed through
    /// unchanged, so wildcards are the caller's responsibility.
    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(field, FilterOp::Like, FilterValue::String(pattern.into()))
    }

    /// Case-sensitive substring match. The needle is escaped so that
    /// wildcard characters in caller input match literally.
    pub fn contains(field: impl Into<String>, needle: &str) -> Self {
        Self::like(field, format!("%{}%", escape_like(needle)))
    }
}

/// Escape LIKE wildcard characters in a literal.
///
/// Escapes `\`, `%`, and `_` with a backslash; queries using the result
/// must declare `ESCAPE '\'`.
pub fn escape_like(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
