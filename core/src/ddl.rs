//! `CREATE TABLE` generation.
//!
//! Renders a [`TableSpec`] as a single PostgreSQL statement so that every
//! column constraint is applied in one step when executed through the
//! metadata API's query endpoint.
//!
//! # Column rendering
//!
//! Each column starts as `"name" TYPE` and then gains, in order:
//!
//! - identity handling: integer types become `SERIAL PRIMARY KEY`, big
//!   integers `BIGSERIAL PRIMARY KEY`, anything else gets
//!   `GENERATED BY DEFAULT AS IDENTITY`;
//! - `PRIMARY KEY` for explicit primary keys;
//! - `NOT NULL` for required columns that are not primary keys;
//! - `DEFAULT ...` when a default is set.
//!
//! # Example
//!
//! ```
//! use supa_admin_core::{ColumnSpec, TableSpec, build_create_table};
//!
//! let table = TableSpec::new("products")
//!     .with_column(ColumnSpec::new("id", "bigint").identity())
//!     .with_column(ColumnSpec::new("name", "text"));
//!
//! let sql = build_create_table(&table).unwrap();
//! assert_eq!(
//!     sql,
//!     "CREATE TABLE \"products\" (\n    \"id\" BIGSERIAL PRIMARY KEY,\n    \"name\" TEXT NOT NULL\n);"
//! );
//! ```

use crate::types::{ColumnSpec, DefaultValue, TableSpec};
use crate::validate::{ValidationError, validate_table};

/// Produces DDL text for table definitions.
///
/// [`PostgresDdl`] is the string-assembling implementation; callers that
/// want a different statement builder can provide their own.
pub trait DdlBuilder {
    /// Builds the `CREATE TABLE` statement for `table`.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found in `table`.
    fn create_table(&self, table: &TableSpec) -> Result<String, ValidationError>;
}

/// PostgreSQL DDL builder.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDdl;

impl DdlBuilder for PostgresDdl {
    fn create_table(&self, table: &TableSpec) -> Result<String, ValidationError> {
        build_create_table(table)
    }
}

/// Builds a `CREATE TABLE` statement for `table`.
///
/// The schema qualifier is omitted for the `public` schema.
///
/// # Errors
///
/// Returns the first [`ValidationError`] reported by
/// [`validate_table`](crate::validate_table), e.g.
/// [`ValidationError::NoColumns`] for an empty column list.
pub fn build_create_table(table: &TableSpec) -> Result<String, ValidationError> {
    if let Some(err) = validate_table(table).into_iter().next() {
        return Err(err);
    }

    let columns: Vec<String> = table.columns.iter().map(render_column).collect();
    let qualified = if table.is_default_schema() {
        quote_ident(&table.name)
    } else {
        format!("{}.{}", quote_ident(&table.schema), quote_ident(&table.name))
    };

    Ok(format!(
        "CREATE TABLE {qualified} (\n{}\n);",
        columns.join(",\n")
    ))
}

/// Renders one column clause, including its leading indentation.
pub(crate) fn render_column(column: &ColumnSpec) -> String {
    let name = quote_ident(&column.name);
    let mut clause = match column.serial_type() {
        Some(serial) => format!("    {name} {serial} PRIMARY KEY"),
        None => {
            let mut base = format!("    {name} {}", column.sql_type.trim().to_uppercase());
            if column.is_primary_key {
                base.push_str(" PRIMARY KEY");
            }
            if column.is_identity {
                base.push_str(" GENERATED BY DEFAULT AS IDENTITY");
            }
            base
        }
    };

    if !column.is_nullable && !column.is_effective_primary_key() {
        clause.push_str(" NOT NULL");
    }

    if let Some(default) = &column.default_value {
        clause.push_str(" DEFAULT ");
        clause.push_str(&render_default(default));
    }

    clause
}

fn render_default(value: &DefaultValue) -> String {
    match value {
        DefaultValue::Text(text) if text.trim().eq_ignore_ascii_case("now()") => {
            "NOW()".to_string()
        }
        DefaultValue::Text(text) if is_all_digits(text) => text.clone(),
        DefaultValue::Text(text) => quote_literal(text),
        DefaultValue::Number(number) => number.to_string(),
    }
}

fn is_all_digits(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}
