//! Request descriptor validation.
//!
//! Validates structural invariants of table and column specifications,
//! catching errors such as empty names, missing types, and conflicting
//! primary keys before any SQL text is produced or any request is sent.
//!
//! # Examples
//!
//! ```
//! use supa_admin_core::*;
//!
//! let table = TableSpec::new("products")
//!     .with_column(ColumnSpec::new("id", "bigint").identity())
//!     .with_column(ColumnSpec::new("name", "text"));
//! assert!(validate_table(&table).is_empty());
//!
//! // Invalid: two primary keys
//! let bad = TableSpec::new("products")
//!     .with_column(ColumnSpec::new("a", "text").primary_key())
//!     .with_column(ColumnSpec::new("b", "text").primary_key());
//! assert!(!validate_table(&bad).is_empty());
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::{ColumnSpec, TableSpec};

/// Descriptor validation errors.
///
/// Each variant describes a specific problem with caller-supplied input.
/// The `Display` impl provides a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Table name is empty or whitespace-only.
    #[error("table name cannot be empty")]
    EmptyTableName,
    /// Schema name is empty or whitespace-only.
    #[error("schema name cannot be empty")]
    EmptySchemaName,
    /// A table definition carries no columns.
    #[error("table '{0}' must define at least one column")]
    NoColumns(String),
    /// Column name is empty or whitespace-only.
    #[error("column name cannot be empty")]
    EmptyColumnName,
    /// Column has no SQL type.
    #[error("column '{0}' must define a type")]
    MissingColumnType(String),
    /// Two columns in the same table share a name.
    #[error("duplicate column in table: {0}")]
    DuplicateColumn(String),
    /// More than one column claims to be the primary key.
    #[error("table '{table}' declares more than one primary key: {columns}")]
    MultiplePrimaryKeys { table: String, columns: String },
    /// A filter value does not start with a recognized operator.
    #[error("unrecognized filter operator in '{column}={value}'")]
    UnknownOperator { column: String, value: String },
    /// A filter value is not of the form `[not.]operator.operand`.
    #[error("'{0}' does not start with a recognized filter operator")]
    InvalidFilter(String),
    /// A filter targets an empty column name.
    #[error("filter column cannot be empty")]
    EmptyFilterColumn,
    /// A mutating operation was called without filters.
    #[error("{0} requires at least one filter")]
    MissingFilters(&'static str),
    /// Import batch size is zero.
    #[error("batch size must be greater than zero")]
    InvalidBatchSize,
}

/// Validates a single column definition.
///
/// Checks that the name and type are present and non-blank.
pub fn validate_column(column: &ColumnSpec) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if column.name.trim().is_empty() {
        errors.push(ValidationError::EmptyColumnName);
    }
    if column.sql_type.trim().is_empty() {
        errors.push(ValidationError::MissingColumnType(column.name.clone()));
    }
    errors
}

/// Validates a full table definition.
///
/// Checks the table and schema names, requires at least one column,
/// validates each column, and rejects duplicate column names and more than
/// one primary key. Integer identity columns count as primary keys because
/// they render as `SERIAL PRIMARY KEY`.
///
/// # Examples
///
/// ```
/// use supa_admin_core::*;
///
/// let empty = TableSpec::new("t");
/// let errors = validate_table(&empty);
/// assert!(errors.iter().any(|e| matches!(e, ValidationError::NoColumns(_))));
/// ```
pub fn validate_table(table: &TableSpec) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if table.name.trim().is_empty() {
        errors.push(ValidationError::EmptyTableName);
    }
    if table.schema.trim().is_empty() {
        errors.push(ValidationError::EmptySchemaName);
    }
    if table.columns.is_empty() {
        errors.push(ValidationError::NoColumns(table.name.clone()));
        return errors;
    }

    let mut seen = HashSet::new();
    let mut primary_keys = Vec::new();
    for column in &table.columns {
        errors.extend(validate_column(column));
        if !column.name.is_empty() && !seen.insert(column.name.as_str()) {
            errors.push(ValidationError::DuplicateColumn(column.name.clone()));
        }
        if column.is_effective_primary_key() {
            primary_keys.push(column.name.as_str());
        }
    }

    if primary_keys.len() > 1 {
        errors.push(ValidationError::MultiplePrimaryKeys {
            table: table.name.clone(),
            columns: primary_keys.join(", "),
        });
    }

    errors
}
