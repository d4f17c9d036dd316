//! Administration client for a hosted PostgreSQL backend.
//!
//! This crate drives two HTTP interfaces with a service-role key: the
//! metadata API (`/pg/...`) for schema changes and the REST data API
//! (`/rest/v1/...`) for rows, plus the `exec_sql` RPC function for raw SQL.
//! On top of those it offers CSV and JSON import and export.
//!
//! # Quick start
//!
//! ```no_run
//! use supa_admin_client::{AdminClient, ClientConfig, ConfigOverrides};
//! use supa_admin_core::FilterSpec;
//!
//! // Endpoint and key from flags, environment, or a YAML file
//! let config = ClientConfig::resolve(&ConfigOverrides::default()).unwrap();
//! let client = AdminClient::connect(config).unwrap();
//!
//! for table in client.list_tables("public").unwrap() {
//!     println!("{}.{}", table.schema, table.name);
//! }
//!
//! let active = FilterSpec::new().with("status", "eq.active").unwrap();
//! println!("{} active users", client.count("users", Some(&active)).unwrap());
//!
//! client.export_to_csv("users", "users.csv", Some(&active)).unwrap();
//! ```
//!
//! # Testing without a server
//!
//! [`AdminClient`] is generic over [`Transport`]. Supplying an in-memory
//! implementation through [`AdminClient::with_transport`] lets every
//! operation run without network access.

mod client;
mod config;
mod error;
mod model;
mod transfer;
mod transport;

pub use client::{AdminClient, EXEC_SQL_FUNCTION, EXEC_SQL_INSTALL};
pub use config::{
    ClientConfig, ConfigFile, ConfigOverrides, DEFAULT_BATCH_SIZE, DEFAULT_SETTLE_DELAY,
    DEFAULT_TIMEOUT, DEFAULT_URL, KEY_ENV, URL_ENV, URL_ENV_FALLBACK,
};
pub use error::{ClientError, Result};
pub use model::{CreatedTable, Row, TableInfo};
pub use transfer::{FileFormat, read_csv_rows, rows_from_json, write_csv_rows};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, Transport, TransportError};
