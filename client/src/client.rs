//! The administration facade.
//!
//! [`AdminClient`] wraps the metadata API (`/pg/...`) for schema changes and
//! the REST data API (`/rest/v1/...`) for rows. Every operation builds one
//! [`ApiRequest`] per HTTP call and hands it to the configured
//! [`Transport`]; requests are issued sequentially and never retried.
//!
//! # Example
//!
//! ```no_run
//! use supa_admin_client::{AdminClient, ClientConfig};
//! use supa_admin_core::{ColumnSpec, FilterSpec, QuerySpec, TableSpec};
//!
//! let client = AdminClient::connect(ClientConfig::new("http://localhost:8000", "service-key")).unwrap();
//!
//! let table = TableSpec::new("products")
//!     .with_column(ColumnSpec::new("id", "bigint").identity())
//!     .with_column(ColumnSpec::new("price", "numeric"));
//! client.create_table(&table).unwrap();
//!
//! let cheap = QuerySpec::new()
//!     .filters(FilterSpec::new().with("price", "lt.10").unwrap())
//!     .order("price.asc");
//! let rows = client.select("products", &cheap).unwrap();
//! println!("{} cheap products", rows.len());
//! ```

use std::thread;

use serde_json::{Value, json};
use supa_admin_core::{
    ColumnAlteration, ColumnSpec, DdlBuilder, FilterSpec, PostgresDdl, QuerySpec, TableRef,
    TableSpec, ValidationError, encode_filters, encode_query, validate_column,
};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::model::{CreatedTable, Row, TableInfo};
use crate::transport::{ApiRequest, ApiResponse, HttpTransport, Method, Transport};

/// Name of the RPC function used by [`AdminClient::execute_sql`].
pub const EXEC_SQL_FUNCTION: &str = "exec_sql";

/// SQL that installs [`EXEC_SQL_FUNCTION`] on the server.
pub const EXEC_SQL_INSTALL: &str = "CREATE OR REPLACE FUNCTION exec_sql(query text)
RETURNS SETOF json
LANGUAGE plpgsql
AS $$
BEGIN
    RETURN QUERY EXECUTE query;
END;
$$;";

/// Client for schema management and row access.
///
/// The configuration (endpoint, key, timeout) is fixed at construction.
/// Tests substitute the transport with [`with_transport`](Self::with_transport).
pub struct AdminClient<T: Transport = HttpTransport> {
    config: ClientConfig,
    transport: T,
    ddl: Box<dyn DdlBuilder + Send + Sync>,
}

impl AdminClient<HttpTransport> {
    /// Creates a client that talks HTTP using the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if the HTTP client cannot be built.
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.timeout)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> AdminClient<T> {
    /// Creates a client over an arbitrary transport.
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            ddl: Box::new(PostgresDdl),
        }
    }

    /// Replaces the statement builder used by [`create_table`](Self::create_table).
    pub fn with_ddl_builder(mut self, ddl: impl DdlBuilder + Send + Sync + 'static) -> Self {
        self.ddl = Box::new(ddl);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // ---- schema management ----

    /// Creates a table from its definition.
    ///
    /// The statement is built locally, executed through the metadata API's
    /// query endpoint, and followed by the configured settle delay so the
    /// data API sees the new table.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] for an invalid definition (no
    /// request is sent), or [`ClientError::Transport`] if the server rejects
    /// the statement.
    pub fn create_table(&self, table: &TableSpec) -> Result<CreatedTable> {
        let sql = self.ddl.create_table(table)?;
        let table_ref = table.table_ref();
        debug!(table = %table_ref, sql = %sql, "generated DDL");

        self.meta_query(&format!("create table {table_ref}"), &sql)?;
        info!(table = %table_ref, columns = table.columns.len(), "created table");

        if !self.config.settle_delay.is_zero() {
            debug!(delay = ?self.config.settle_delay, "waiting for schema cache refresh");
            thread::sleep(self.config.settle_delay);
        }

        Ok(CreatedTable {
            table_name: table.name.clone(),
            schema: table.schema.clone(),
            sql,
            columns: table.columns.clone(),
        })
    }

    /// Lists the tables of a schema.
    pub fn list_tables(&self, schema: &str) -> Result<Vec<TableInfo>> {
        let operation = format!("list tables in {schema}");
        let request = self
            .request(Method::Get, self.config.meta_url("/tables"))
            .query([("schema".to_string(), schema.to_string())].into());
        self.dispatch(&operation, request)?.decode(&operation)
    }

    /// Describes one table.
    pub fn get_table_info(&self, table: impl Into<TableRef>) -> Result<TableInfo> {
        let table = table.into();
        let operation = format!("get table info for {table}");
        let request = self.request(Method::Get, self.config.meta_url(&table_path(&table)));
        self.dispatch(&operation, request)?.decode(&operation)
    }

    /// Drops a table, optionally cascading to dependent objects.
    pub fn drop_table(&self, table: impl Into<TableRef>, cascade: bool) -> Result<Value> {
        let table = table.into();
        let operation = format!("drop table {table}");
        let request = self
            .request(Method::Delete, self.config.meta_url(&table_path(&table)))
            .query([("cascade".to_string(), cascade.to_string())].into());
        let value: Value = self.dispatch(&operation, request)?.decode(&operation)?;
        info!(table = %table, cascade, "dropped table");
        Ok(value)
    }

    /// Adds a column to an existing table.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] without sending a request if the
    /// column has no name or type.
    pub fn add_column(&self, table: impl Into<TableRef>, column: &ColumnSpec) -> Result<Value> {
        if let Some(err) = validate_column(column).into_iter().next() {
            return Err(err.into());
        }
        let table = table.into();
        let operation = format!("add column {} to {table}", column.name);
        let body = serde_json::to_value(column)
            .map_err(|e| ClientError::format("JSON", e.to_string()))?;
        let request = self
            .request(
                Method::Post,
                self.config.meta_url(&format!("{}/columns", table_path(&table))),
            )
            .json(body);
        let value: Value = self.dispatch(&operation, request)?.decode(&operation)?;
        info!(table = %table, column = %column.name, "added column");
        Ok(value)
    }

    /// Changes an existing column.
    pub fn alter_column(
        &self,
        table: impl Into<TableRef>,
        column: &str,
        change: &ColumnAlteration,
    ) -> Result<Value> {
        if column.trim().is_empty() {
            return Err(ValidationError::EmptyColumnName.into());
        }
        let table = table.into();
        let operation = format!("alter column {column} on {table}");
        let body = serde_json::to_value(change)
            .map_err(|e| ClientError::format("JSON", e.to_string()))?;
        let request = self
            .request(Method::Patch, self.config.meta_url(&column_path(&table, column)))
            .json(body);
        let value: Value = self.dispatch(&operation, request)?.decode(&operation)?;
        info!(table = %table, column, "altered column");
        Ok(value)
    }

    /// Drops a column.
    pub fn drop_column(&self, table: impl Into<TableRef>, column: &str) -> Result<Value> {
        if column.trim().is_empty() {
            return Err(ValidationError::EmptyColumnName.into());
        }
        let table = table.into();
        let operation = format!("drop column {column} from {table}");
        let request =
            self.request(Method::Delete, self.config.meta_url(&column_path(&table, column)));
        let value: Value = self.dispatch(&operation, request)?.decode(&operation)?;
        info!(table = %table, column, "dropped column");
        Ok(value)
    }

    // ---- rows ----

    /// Inserts rows and returns them as stored.
    ///
    /// An empty slice sends no request.
    pub fn insert(&self, table: impl Into<TableRef>, rows: &[Row]) -> Result<Vec<Row>> {
        let table = table.into();
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let operation = format!("insert into {table}");
        let body = Value::Array(rows.iter().cloned().map(Value::Object).collect());
        let request = self
            .rest_request(Method::Post, &table)
            .header("Prefer", "return=representation")
            .json(body);
        let inserted = decode_rows(&self.dispatch(&operation, request)?, &operation)?;
        info!(table = %table, rows = inserted.len(), "inserted rows");
        Ok(inserted)
    }

    /// Inserts a single row.
    pub fn insert_one(&self, table: impl Into<TableRef>, row: Row) -> Result<Vec<Row>> {
        self.insert(table, std::slice::from_ref(&row))
    }

    /// Reads rows.
    pub fn select(&self, table: impl Into<TableRef>, query: &QuerySpec) -> Result<Vec<Row>> {
        let table = table.into();
        let operation = format!("select from {table}");
        let request = self
            .rest_request(Method::Get, &table)
            .query(encode_query(query));
        let rows = decode_rows(&self.dispatch(&operation, request)?, &operation)?;
        debug!(table = %table, rows = rows.len(), "selected rows");
        Ok(rows)
    }

    /// Updates the rows matching `filters` and returns them.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingFilters`] without sending a request
    /// if `filters` is empty.
    pub fn update(
        &self,
        table: impl Into<TableRef>,
        values: &Row,
        filters: &FilterSpec,
    ) -> Result<Vec<Row>> {
        if filters.is_empty() {
            return Err(ValidationError::MissingFilters("update").into());
        }
        let table = table.into();
        let operation = format!("update {table}");
        let request = self
            .rest_request(Method::Patch, &table)
            .header("Prefer", "return=representation")
            .query(encode_filters(filters))
            .json(Value::Object(values.clone()));
        let updated = decode_rows(&self.dispatch(&operation, request)?, &operation)?;
        info!(table = %table, rows = updated.len(), "updated rows");
        Ok(updated)
    }

    /// Deletes the rows matching `filters` and returns them.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingFilters`] without sending a request
    /// if `filters` is empty.
    pub fn delete(&self, table: impl Into<TableRef>, filters: &FilterSpec) -> Result<Vec<Row>> {
        if filters.is_empty() {
            return Err(ValidationError::MissingFilters("delete").into());
        }
        let table = table.into();
        let operation = format!("delete from {table}");
        let request = self
            .rest_request(Method::Delete, &table)
            .header("Prefer", "return=representation")
            .query(encode_filters(filters));
        let deleted = decode_rows(&self.dispatch(&operation, request)?, &operation)?;
        info!(table = %table, rows = deleted.len(), "deleted rows");
        Ok(deleted)
    }

    /// Counts the rows matching `filters` (all rows when `None`).
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Format`] if the response carries no usable
    /// `Content-Range` total.
    pub fn count(&self, table: impl Into<TableRef>, filters: Option<&FilterSpec>) -> Result<u64> {
        let table = table.into();
        let operation = format!("count {table}");
        let mut request = self
            .rest_request(Method::Head, &table)
            .without_header("Content-Type")
            .header("Prefer", "count=exact");
        if let Some(filters) = filters {
            request = request.query(encode_filters(filters));
        }
        let response = self.dispatch(&operation, request)?;
        let range = response.header("Content-Range").ok_or_else(|| {
            ClientError::format("response", format!("{operation}: missing Content-Range header"))
        })?;
        let total = parse_content_range(range).ok_or_else(|| {
            ClientError::format(
                "response",
                format!("{operation}: unreadable Content-Range '{range}'"),
            )
        })?;
        debug!(table = %table, total, "counted rows");
        Ok(total)
    }

    // ---- sql ----

    /// Runs arbitrary SQL through the `exec_sql` RPC function.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MissingCapability`] with the installation SQL
    /// if the function does not exist (HTTP 404).
    pub fn execute_sql(&self, sql: &str) -> Result<Vec<Value>> {
        let operation = "execute sql";
        let request = self
            .request(
                Method::Post,
                self.config.rest_url(&format!("/rpc/{EXEC_SQL_FUNCTION}")),
            )
            .json(json!({ "query": sql }));
        let response = self.send(operation, &request)?;
        if response.status == 404 {
            warn!(function = EXEC_SQL_FUNCTION, "RPC function is not installed");
            return Err(ClientError::MissingCapability {
                function: EXEC_SQL_FUNCTION.to_string(),
                install_sql: EXEC_SQL_INSTALL.to_string(),
            });
        }
        let response = ensure_success(operation, response)?;
        let rows = match response.decode::<Value>(operation)? {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        };
        info!(rows = rows.len(), "executed sql");
        Ok(rows)
    }

    // ---- plumbing ----

    /// Executes a statement through the metadata API's query endpoint.
    fn meta_query(&self, operation: &str, sql: &str) -> Result<Value> {
        let request = self
            .request(Method::Post, self.config.meta_url("/query"))
            .json(json!({ "query": sql }));
        self.dispatch(operation, request)?.decode(operation)
    }

    /// Builds a request carrying the authentication headers.
    fn request(&self, method: Method, url: String) -> ApiRequest {
        let key = self.config.service_key();
        ApiRequest::new(method, url)
            .header("apikey", key)
            .header("Authorization", format!("Bearer {key}"))
            .header("Content-Type", "application/json")
    }

    /// Builds a data-API request for `table`, selecting its schema profile.
    fn rest_request(&self, method: Method, table: &TableRef) -> ApiRequest {
        let request = self.request(method, self.config.rest_url(&format!("/{}", table.name)));
        if table.is_default_schema() {
            return request;
        }
        match method {
            Method::Get | Method::Head => request.header("Accept-Profile", table.schema.as_str()),
            Method::Post | Method::Patch | Method::Delete => {
                request.header("Content-Profile", table.schema.as_str())
            }
        }
    }

    fn send(&self, operation: &str, request: &ApiRequest) -> Result<ApiResponse> {
        debug!(
            method = request.method.as_str(),
            url = %request.url,
            params = request.query.len(),
            "{operation}"
        );
        self.transport
            .send(request)
            .map_err(|e| ClientError::Transport {
                operation: operation.to_string(),
                status: None,
                body: e.to_string(),
            })
    }

    fn dispatch(&self, operation: &str, request: ApiRequest) -> Result<ApiResponse> {
        let response = self.send(operation, &request)?;
        ensure_success(operation, response)
    }
}

fn ensure_success(operation: &str, response: ApiResponse) -> Result<ApiResponse> {
    if response.is_success() {
        return Ok(response);
    }
    debug!(status = response.status, "{operation} rejected");
    Err(ClientError::Transport {
        operation: operation.to_string(),
        status: Some(response.status),
        body: response.body,
    })
}

/// Decodes a row list; an empty body yields no rows.
fn decode_rows(response: &ApiResponse, operation: &str) -> Result<Vec<Row>> {
    Ok(response
        .decode::<Option<Vec<Row>>>(operation)?
        .unwrap_or_default())
}

fn table_path(table: &TableRef) -> String {
    format!("/tables/{}.{}", table.schema, table.name)
}

fn column_path(table: &TableRef, column: &str) -> String {
    format!("{}/columns/{column}", table_path(table))
}

/// Reads the total from a `Content-Range` value such as `0-9/42` or `*/0`.
pub(crate) fn parse_content_range(value: &str) -> Option<u64> {
    let (_, total) = value.rsplit_once('/')?;
    total.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::time::Duration;

    use supa_admin_core::{Filter, FilterOperator};

    use super::*;
    use crate::transport::TransportError;

    /// Replies to every request with the same response and records it.
    struct FixedTransport {
        response: ApiResponse,
        sent: RefCell<Vec<ApiRequest>>,
    }

    impl FixedTransport {
        fn new(response: ApiResponse) -> Self {
            Self {
                response,
                sent: RefCell::new(Vec::new()),
            }
        }
    }

    impl Transport for FixedTransport {
        fn send(&self, request: &ApiRequest) -> std::result::Result<ApiResponse, TransportError> {
            self.sent.borrow_mut().push(request.clone());
            Ok(self.response.clone())
        }
    }

    fn client(response: ApiResponse) -> AdminClient<FixedTransport> {
        let config =
            ClientConfig::new("http://db:8000", "secret").with_settle_delay(Duration::ZERO);
        AdminClient::with_transport(config, FixedTransport::new(response))
    }

    #[test]
    fn test_parse_content_range() {
        assert_eq!(parse_content_range("0-9/42"), Some(42));
        assert_eq!(parse_content_range("*/0"), Some(0));
        assert_eq!(parse_content_range("0-9/*"), None);
        assert_eq!(parse_content_range("42"), None);
    }

    #[test]
    fn test_auth_headers_on_every_request() {
        let client = client(ApiResponse::json(200, &json!([])));
        client.list_tables("public").unwrap();

        let sent = client.transport().sent.borrow();
        let request = &sent[0];
        assert_eq!(request.url, "http://db:8000/pg/tables");
        assert_eq!(request.query.get("schema").map(String::as_str), Some("public"));
        assert_eq!(request.header_value("apikey"), Some("secret"));
        assert_eq!(request.header_value("authorization"), Some("Bearer secret"));
        assert_eq!(request.header_value("content-type"), Some("application/json"));
    }

    #[test]
    fn test_table_and_column_paths() {
        let table = TableRef::from("sales.orders");
        assert_eq!(table_path(&table), "/tables/sales.orders");
        assert_eq!(column_path(&table, "total"), "/tables/sales.orders/columns/total");
    }

    #[test]
    fn test_drop_table_sends_cascade_flag() {
        let client = client(ApiResponse::json(200, &json!({"name": "t"})));
        client.drop_table("t", true).unwrap();

        let sent = client.transport().sent.borrow();
        assert_eq!(sent[0].method, Method::Delete);
        assert_eq!(sent[0].url, "http://db:8000/pg/tables/public.t");
        assert_eq!(sent[0].query.get("cascade").map(String::as_str), Some("true"));
    }

    #[test]
    fn test_add_column_rejects_missing_type() {
        let client = client(ApiResponse::json(200, &json!({})));
        let err = client
            .add_column("t", &ColumnSpec::new("price", ""))
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Validation(ValidationError::MissingColumnType(_))
        ));
        assert!(client.transport().sent.borrow().is_empty());
    }

    #[test]
    fn test_alter_column_sends_only_set_fields() {
        let client = client(ApiResponse::json(200, &json!({})));
        let change = ColumnAlteration::new().nullable(true);
        client.alter_column("t", "price", &change).unwrap();

        let sent = client.transport().sent.borrow();
        assert_eq!(sent[0].method, Method::Patch);
        assert_eq!(sent[0].url, "http://db:8000/pg/tables/public.t/columns/price");
        assert_eq!(sent[0].body, Some(json!({"is_nullable": true})));
    }

    #[test]
    fn test_insert_empty_slice_sends_nothing() {
        let client = client(ApiResponse::json(201, &json!([])));
        assert!(client.insert("t", &[]).unwrap().is_empty());
        assert!(client.transport().sent.borrow().is_empty());
    }

    #[test]
    fn test_select_encodes_query() {
        let client = client(ApiResponse::json(200, &json!([{"id": 1}])));
        let query = QuerySpec::new()
            .filters(FilterSpec::new().with_filter("price", Filter::new(FilterOperator::Gt, "5")))
            .limit(10);
        let rows = client.select("products", &query).unwrap();
        assert_eq!(rows.len(), 1);

        let sent = client.transport().sent.borrow();
        assert_eq!(sent[0].url, "http://db:8000/rest/v1/products");
        assert_eq!(sent[0].query.get("select").map(String::as_str), Some("*"));
        assert_eq!(sent[0].query.get("price").map(String::as_str), Some("gt.5"));
        assert_eq!(sent[0].query.get("limit").map(String::as_str), Some("10"));
        assert_eq!(sent[0].header_value("Accept-Profile"), None);
    }

    #[test]
    fn test_delete_with_empty_body_returns_no_rows() {
        let client = client(ApiResponse {
            status: 204,
            headers: Vec::new(),
            body: String::new(),
        });
        let rows = client.delete("t", &FilterSpec::new().eq("id", 1)).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_count_without_content_range_is_format_error() {
        let client = client(ApiResponse::json(200, &json!([])));
        let err = client.count("t", None).unwrap_err();
        assert!(matches!(err, ClientError::Format { .. }));
    }

    #[test]
    fn test_execute_sql_wraps_scalar_result() {
        let client = client(ApiResponse::json(200, &json!({"ok": true})));
        let rows = client.execute_sql("select 1").unwrap();
        assert_eq!(rows, vec![json!({"ok": true})]);

        let sent = client.transport().sent.borrow();
        assert_eq!(sent[0].url, "http://db:8000/rest/v1/rpc/exec_sql");
        assert_eq!(sent[0].body, Some(json!({"query": "select 1"})));
    }

    #[test]
    fn test_custom_ddl_builder_is_used() {
        struct Fixed;
        impl DdlBuilder for Fixed {
            fn create_table(&self, _table: &TableSpec) -> std::result::Result<String, ValidationError> {
                Ok("SELECT 1;".to_string())
            }
        }

        let client = client(ApiResponse::json(200, &json!([]))).with_ddl_builder(Fixed);
        let created = client
            .create_table(&TableSpec::new("t").with_column(ColumnSpec::new("a", "text")))
            .unwrap();
        assert_eq!(created.sql, "SELECT 1;");
        assert_eq!(
            client.transport().sent.borrow()[0].body,
            Some(json!({"query": "SELECT 1;"}))
        );
    }
}
