use std::cell::RefCell;
use std::time::Duration;

use serde_json::{Value, json};
use supa_admin_client::{
    AdminClient, ApiRequest, ApiResponse, ClientConfig, ClientError, EXEC_SQL_FUNCTION, Method,
    Row, Transport, TransportError,
};
use supa_admin_core::{ColumnSpec, FilterSpec, QuerySpec, TableSpec, ValidationError};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

type Responder = Box<dyn Fn(&ApiRequest) -> Result<ApiResponse, TransportError>>;

/// In-memory transport that records every request.
struct RecordingTransport {
    responder: Responder,
    requests: RefCell<Vec<ApiRequest>>,
}

impl RecordingTransport {
    fn new(responder: impl Fn(&ApiRequest) -> ApiResponse + 'static) -> Self {
        Self {
            responder: Box::new(move |request: &ApiRequest| -> Result<ApiResponse, TransportError> {
                Ok(responder(request))
            }),
            requests: RefCell::new(Vec::new()),
        }
    }

    fn failing(message: &'static str) -> Self {
        Self {
            responder: Box::new(move |_: &ApiRequest| -> Result<ApiResponse, TransportError> {
                Err(message.into())
            }),
            requests: RefCell::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<ApiRequest> {
        self.requests.borrow().clone()
    }
}

impl Transport for RecordingTransport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        self.requests.borrow_mut().push(request.clone());
        (self.responder)(request)
    }
}

fn config() -> ClientConfig {
    ClientConfig::new("http://db.test:8000", "service-key").with_settle_delay(Duration::ZERO)
}

fn client(transport: &RecordingTransport) -> AdminClient<&RecordingTransport> {
    AdminClient::with_transport(config(), transport)
}

/// Echoes posted rows back, like `Prefer: return=representation`.
fn echo_rows(request: &ApiRequest) -> ApiResponse {
    ApiResponse::json(201, request.body.as_ref().unwrap_or(&Value::Null))
}

fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

fn body_len(request: &ApiRequest) -> usize {
    request
        .body
        .as_ref()
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Schema management
// ---------------------------------------------------------------------------

#[test]
fn test_create_table_posts_generated_sql() {
    let transport = RecordingTransport::new(|_| ApiResponse::json(200, &json!([])));
    let table = TableSpec::new("products")
        .with_column(ColumnSpec::new("id", "bigint").identity())
        .with_column(ColumnSpec::new("name", "text"))
        .with_column(ColumnSpec::new("price", "numeric").nullable().with_default(0));

    let created = client(&transport).create_table(&table).unwrap();
    assert_eq!(created.table_name, "products");
    assert_eq!(created.columns.len(), 3);

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::Post);
    assert_eq!(requests[0].url, "http://db.test:8000/pg/query");
    assert_eq!(
        requests[0].body,
        Some(json!({
            "query": "CREATE TABLE \"products\" (\n    \"id\" BIGSERIAL PRIMARY KEY,\n    \"name\" TEXT NOT NULL,\n    \"price\" NUMERIC DEFAULT 0\n);"
        }))
    );
    assert_eq!(created.sql, requests[0].body.as_ref().unwrap()["query"]);
}

#[test]
fn test_create_table_without_columns_sends_nothing() {
    let transport = RecordingTransport::new(|_| ApiResponse::json(200, &json!([])));
    let err = client(&transport)
        .create_table(&TableSpec::new("empty"))
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Validation(ValidationError::NoColumns(name)) if name == "empty"
    ));
    assert!(transport.requests().is_empty());
}

#[test]
fn test_create_table_rejection_reports_server_body() {
    let transport = RecordingTransport::new(|_| {
        ApiResponse::json(400, &json!({"error": "relation \"products\" already exists"}))
    });
    let table = TableSpec::new("products").with_column(ColumnSpec::new("id", "int"));
    let err = client(&transport).create_table(&table).unwrap_err();

    assert_eq!(err.status(), Some(400));
    let message = err.to_string();
    assert!(message.starts_with("create table public.products failed with HTTP 400"));
    assert!(message.contains("already exists"));
}

#[test]
fn test_list_and_describe_tables() {
    let transport = RecordingTransport::new(|request| {
        if request.url.ends_with("/pg/tables") {
            ApiResponse::json(
                200,
                &json!([
                    {"id": 1, "schema": "sales", "name": "orders", "rls_enabled": false},
                    {"id": 2, "schema": "sales", "name": "items"}
                ]),
            )
        } else {
            ApiResponse::json(200, &json!({"id": 1, "schema": "sales", "name": "orders", "columns": []}))
        }
    });
    let client = client(&transport);

    let tables = client.list_tables("sales").unwrap();
    assert_eq!(tables.len(), 2);
    assert_eq!(tables[0].table_ref().to_string(), "sales.orders");
    assert_eq!(tables[0].extra["rls_enabled"], false);

    let info = client.get_table_info("sales.orders").unwrap();
    assert_eq!(info.name, "orders");
    assert!(info.extra.contains_key("columns"));

    let requests = transport.requests();
    assert_eq!(requests[0].query.get("schema").map(String::as_str), Some("sales"));
    assert_eq!(requests[1].url, "http://db.test:8000/pg/tables/sales.orders");
}

#[test]
fn test_column_operations_address_column_endpoints() {
    let transport = RecordingTransport::new(|_| ApiResponse::json(200, &json!({})));
    let client = client(&transport);

    client
        .add_column("products", &ColumnSpec::new("sku", "text").nullable())
        .unwrap();
    client.drop_column("products", "sku").unwrap();

    let requests = transport.requests();
    assert_eq!(requests[0].method, Method::Post);
    assert_eq!(requests[0].url, "http://db.test:8000/pg/tables/public.products/columns");
    assert_eq!(requests[0].body.as_ref().unwrap()["name"], "sku");
    assert_eq!(requests[0].body.as_ref().unwrap()["isNullable"], true);
    assert_eq!(requests[1].method, Method::Delete);
    assert_eq!(requests[1].url, "http://db.test:8000/pg/tables/public.products/columns/sku");
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

#[test]
fn test_update_and_delete_require_filters() {
    let transport = RecordingTransport::new(|_| ApiResponse::json(200, &json!([])));
    let client = client(&transport);
    let empty = FilterSpec::new();

    let err = client
        .update("products", &row(json!({"price": 1})), &empty)
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Validation(ValidationError::MissingFilters("update"))
    ));

    let err = client.delete("products", &empty).unwrap_err();
    assert!(matches!(
        err,
        ClientError::Validation(ValidationError::MissingFilters("delete"))
    ));

    assert!(transport.requests().is_empty());
}

#[test]
fn test_update_sends_filters_and_values() {
    let transport = RecordingTransport::new(|_| ApiResponse::json(200, &json!([{"id": 7, "price": 12}])));
    let filters = FilterSpec::new().with("id", "eq.7").unwrap();

    let updated = client(&transport)
        .update("products", &row(json!({"price": 12})), &filters)
        .unwrap();
    assert_eq!(updated[0]["price"], 12);

    let request = &transport.requests()[0];
    assert_eq!(request.method, Method::Patch);
    assert_eq!(request.url, "http://db.test:8000/rest/v1/products");
    assert_eq!(request.query.get("id").map(String::as_str), Some("eq.7"));
    assert_eq!(request.header_value("Prefer"), Some("return=representation"));
    assert_eq!(request.body, Some(json!({"price": 12})));
}

#[test]
fn test_count_reads_content_range() {
    let transport = RecordingTransport::new(|request| {
        let total = if request.query.is_empty() { "*/0" } else { "0-9/42" };
        ApiResponse {
            status: 200,
            headers: Vec::new(),
            body: String::new(),
        }
        .with_header("Content-Range", total)
    });
    let client = client(&transport);

    assert_eq!(client.count("products", None).unwrap(), 0);
    let filters = FilterSpec::new().with("price", "gt.100").unwrap();
    assert_eq!(client.count("products", Some(&filters)).unwrap(), 42);

    let requests = transport.requests();
    assert_eq!(requests[0].method, Method::Head);
    assert_eq!(requests[0].header_value("Prefer"), Some("count=exact"));
    assert_eq!(requests[0].header_value("Content-Type"), None);
    assert_eq!(requests[1].query.get("price").map(String::as_str), Some("gt.100"));
}

#[test]
fn test_non_public_schema_uses_profile_headers() {
    let transport = RecordingTransport::new(|request| match request.method {
        Method::Post => echo_rows(request),
        _ => ApiResponse::json(200, &json!([])),
    });
    let client = client(&transport);

    client.select("sales.orders", &QuerySpec::new()).unwrap();
    client
        .insert("sales.orders", &[row(json!({"total": 5}))])
        .unwrap();
    client.select("orders", &QuerySpec::new()).unwrap();

    let requests = transport.requests();
    assert_eq!(requests[0].url, "http://db.test:8000/rest/v1/orders");
    assert_eq!(requests[0].header_value("Accept-Profile"), Some("sales"));
    assert_eq!(requests[0].header_value("Content-Profile"), None);
    assert_eq!(requests[1].header_value("Content-Profile"), Some("sales"));
    assert_eq!(requests[2].header_value("Accept-Profile"), None);
}

#[test]
fn test_transport_failure_names_operation() {
    let transport = RecordingTransport::failing("connection refused");
    let err = client(&transport)
        .select("products", &QuerySpec::new())
        .unwrap_err();

    assert_eq!(err.status(), None);
    assert_eq!(err.to_string(), "select from public.products failed: connection refused");
}

// ---------------------------------------------------------------------------
// SQL
// ---------------------------------------------------------------------------

#[test]
fn test_execute_sql_missing_function() {
    let transport = RecordingTransport::new(|_| {
        ApiResponse::json(404, &json!({"message": "Could not find the function"}))
    });
    let err = client(&transport).execute_sql("SELECT 1").unwrap_err();

    match err {
        ClientError::MissingCapability {
            function,
            install_sql,
        } => {
            assert_eq!(function, EXEC_SQL_FUNCTION);
            assert!(install_sql.starts_with("CREATE OR REPLACE FUNCTION exec_sql(query text)"));
            assert!(install_sql.contains("RETURN QUERY EXECUTE query;"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(transport.requests().len(), 1);
}

#[test]
fn test_execute_sql_returns_rows() {
    let transport = RecordingTransport::new(|_| {
        ApiResponse::json(200, &json!([{"n": 1}, {"n": 2}]))
    });
    let rows = client(&transport).execute_sql("SELECT n FROM t").unwrap();
    assert_eq!(rows, vec![json!({"n": 1}), json!({"n": 2})]);
}

// ---------------------------------------------------------------------------
// Import / export
// ---------------------------------------------------------------------------

#[test]
fn test_batched_import_splits_requests() {
    let transport = RecordingTransport::new(echo_rows);
    let rows: Vec<Row> = (0..2500).map(|i| row(json!({"id": i}))).collect();

    let total = client(&transport)
        .insert_batched("products", &rows, 1000)
        .unwrap();
    assert_eq!(total, 2500);

    let sizes: Vec<usize> = transport.requests().iter().map(body_len).collect();
    assert_eq!(sizes, vec![1000, 1000, 500]);
}

#[test]
fn test_zero_batch_size_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rows.json");
    std::fs::write(&path, "[]").unwrap();

    let transport = RecordingTransport::new(echo_rows);
    let client = client(&transport);

    for result in [
        client.import_from_json("t", &path, 0),
        client.import_from_csv("t", &path, 0),
        client.insert_batched("t", &[], 0),
    ] {
        assert!(matches!(
            result,
            Err(ClientError::Validation(ValidationError::InvalidBatchSize))
        ));
    }
    assert!(transport.requests().is_empty());
}

#[test]
fn test_failed_batch_aborts_import() {
    let transport = RecordingTransport::new(|request| {
        if request.body.as_ref().and_then(|b| b[0]["id"].as_i64()) == Some(2) {
            ApiResponse::json(409, &json!({"message": "duplicate key"}))
        } else {
            echo_rows(request)
        }
    });
    let rows: Vec<Row> = (0..5).map(|i| row(json!({"id": i}))).collect();

    let err = client(&transport)
        .insert_batched("products", &rows, 2)
        .unwrap_err();
    assert_eq!(err.status(), Some(409));
    assert_eq!(transport.requests().len(), 2);
}

#[test]
fn test_csv_export_import_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("products.csv");

    let stored = json!([
        {"id": 1, "name": "Widget", "price": 9.5, "stock": 10},
        {"id": 2, "name": "Gadget, large", "price": 120.25, "stock": -3}
    ]);
    let export_transport = RecordingTransport::new(move |_| ApiResponse::json(200, &stored));
    let exported = client(&export_transport)
        .export_to_csv("products", &path, None)
        .unwrap();
    assert_eq!(exported, 2);

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("id,name,price,stock\n"));

    let import_transport = RecordingTransport::new(echo_rows);
    let imported = client(&import_transport)
        .import_from_csv("products", &path, 1000)
        .unwrap();
    assert_eq!(imported, 2);

    let requests = import_transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].body,
        Some(json!([
            {"id": 1, "name": "Widget", "price": 9.5, "stock": 10},
            {"id": 2, "name": "Gadget, large", "price": 120.25, "stock": -3}
        ]))
    );
}

#[test]
fn test_csv_export_with_no_rows_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.csv");

    let transport = RecordingTransport::new(|_| ApiResponse::json(200, &json!([])));
    let filters = FilterSpec::new().with("id", "lt.0").unwrap();
    let exported = client(&transport)
        .export_to_csv("products", &path, Some(&filters))
        .unwrap();

    assert_eq!(exported, 0);
    assert!(!path.exists());
    assert_eq!(
        transport.requests()[0].query.get("id").map(String::as_str),
        Some("lt.0")
    );
}

#[test]
fn test_failed_csv_export_keeps_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.csv");
    std::fs::write(&path, "previous,good,export\n").unwrap();

    let transport =
        RecordingTransport::new(|_| ApiResponse::json(200, &json!([{"id": 1}, {"id": 2, "extra": 3}])));
    let err = client(&transport)
        .export_to_csv("products", &path, None)
        .unwrap_err();

    assert!(matches!(err, ClientError::Format { format: "CSV", .. }));
    assert!(err.to_string().contains("'extra'"));
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "previous,good,export\n"
    );
}

#[test]
fn test_json_export_with_no_rows_writes_empty_array() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.json");

    let transport = RecordingTransport::new(|_| ApiResponse::json(200, &json!([])));
    let exported = client(&transport)
        .export_to_json("products", &path, None)
        .unwrap();

    assert_eq!(exported, 0);
    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.trim_end(), "[]");
    assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), json!([]));
}

#[test]
fn test_json_export_import_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("products.json");

    let stored = json!([
        {"id": 1, "code": "007", "price": 9.5, "active": true},
        {"id": 2, "code": "042", "price": null, "active": false}
    ]);
    let expected = stored.clone();
    let export_transport = RecordingTransport::new(move |_| ApiResponse::json(200, &stored));
    assert_eq!(
        client(&export_transport)
            .export_to_json("products", &path, None)
            .unwrap(),
        2
    );

    let import_transport = RecordingTransport::new(echo_rows);
    let imported = client(&import_transport)
        .import_from_json("products", &path, 1)
        .unwrap();
    assert_eq!(imported, 2);

    let requests = import_transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].body, Some(json!([expected[0].clone()])));
    // JSON values are inserted as typed; "007" stays a string.
    assert_eq!(requests[1].body.as_ref().unwrap()[0]["code"], "042");
}

#[test]
fn test_json_import_single_object_and_bad_elements() {
    let dir = tempfile::tempdir().unwrap();
    let single = dir.path().join("single.json");
    let bad = dir.path().join("bad.json");
    std::fs::write(&single, r#"{"id": 1}"#).unwrap();
    std::fs::write(&bad, r#"[{"id": 1}, 2]"#).unwrap();

    let transport = RecordingTransport::new(echo_rows);
    let client = client(&transport);

    assert_eq!(client.import_from_json("t", &single, 1000).unwrap(), 1);
    let err = client.import_from_json("t", &bad, 1000).unwrap_err();
    assert!(matches!(err, ClientError::Format { format: "JSON", .. }));
    assert_eq!(transport.requests().len(), 1);
}

#[test]
fn test_empty_csv_import_sends_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.csv");
    std::fs::write(&path, "id,name\n").unwrap();

    let transport = RecordingTransport::new(echo_rows);
    assert_eq!(
        client(&transport)
            .import_from_csv("t", &path, 1000)
            .unwrap(),
        0
    );
    assert!(transport.requests().is_empty());
}

#[test]
fn test_missing_import_file_is_io_error() {
    let transport = RecordingTransport::new(echo_rows);
    let err = client(&transport)
        .import_from_csv("t", "/definitely/not/here.csv", 1000)
        .unwrap_err();
    assert!(matches!(err, ClientError::Io(_)));
}
