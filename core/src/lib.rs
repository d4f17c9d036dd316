//! Schema definition and query translation for a hosted PostgreSQL backend.
//!
//! This crate holds the pure, I/O-free half of supa-admin:
//!
//! - [`build_create_table`] / [`DdlBuilder`]: renders a [`TableSpec`] as a
//!   single `CREATE TABLE` statement with identity, primary-key, not-null
//!   and default handling.
//! - [`encode_query`] / [`encode_filters`]: turns a [`QuerySpec`] or
//!   [`FilterSpec`] into the query parameters of the REST data API.
//! - [`coerce`] / [`coerce_row`]: converts string fields read during bulk
//!   import into integers, floats or strings.
//!
//! Descriptors are validated when built ([`FilterSpec`] rejects unknown
//! operators) or before use ([`validate_table`]), and every failure is a
//! [`ValidationError`].
//!
//! # Example
//!
//! ```
//! use supa_admin_core::*;
//!
//! let table = TableSpec::new("products")
//!     .with_column(ColumnSpec::new("id", "bigint").identity())
//!     .with_column(ColumnSpec::new("name", "text"))
//!     .with_column(ColumnSpec::new("price", "numeric").nullable());
//! let sql = build_create_table(&table).unwrap();
//! assert!(sql.contains("\"id\" BIGSERIAL PRIMARY KEY"));
//!
//! let query = QuerySpec::new()
//!     .filters(FilterSpec::new().with("price", "gte.100").unwrap())
//!     .limit(10);
//! let params = encode_query(&query);
//! assert_eq!(params["price"], "gte.100");
//!
//! assert_eq!(coerce("42"), CoercedValue::Integer(42));
//! ```

mod coerce;
mod ddl;
mod filter;
mod query;
mod types;
mod validate;

pub use coerce::{CoercedValue, coerce, coerce_row, is_numeric_candidate};
pub use ddl::{DdlBuilder, PostgresDdl, build_create_table};
pub use filter::{Filter, FilterOperator, FilterSpec};
pub use query::{QueryParams, QuerySpec, SELECT_ALL, encode_filters, encode_query};
pub use types::*;
pub use validate::{ValidationError, validate_column, validate_table};
