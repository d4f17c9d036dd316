//! Table and column descriptor types.
//!
//! This module defines the request descriptors used to describe tables to
//! the DDL builder and to the metadata API. The types are designed for
//! serialization with [`serde`] so column lists can be read from JSON files
//! and forwarded unchanged to the server.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the schema that is addressed when none is given.
pub const DEFAULT_SCHEMA: &str = "public";

/// Default value of a column.
///
/// Text defaults are quoted as string literals unless they are the
/// `now()` token or consist only of digits; numeric defaults are emitted
/// bare.
///
/// # Examples
///
/// ```
/// use supa_admin_core::DefaultValue;
///
/// let text: DefaultValue = serde_json::from_str("\"pending\"").unwrap();
/// assert_eq!(text, DefaultValue::Text("pending".into()));
///
/// let number: DefaultValue = serde_json::from_str("0").unwrap();
/// assert!(matches!(number, DefaultValue::Number(_)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    /// String default (e.g. `"now()"`, `"pending"`, `"42"`).
    Text(String),
    /// Numeric default (e.g. `0`, `1.5`).
    Number(serde_json::Number),
}

impl From<&str> for DefaultValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for DefaultValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for DefaultValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Number(number) => write!(f, "{number}"),
        }
    }
}

/// Definition of a single table column.
///
/// Use [`ColumnSpec::new`] and chain the builder methods to describe
/// constraints. A column is `NOT NULL` unless [`nullable`](Self::nullable)
/// is called, matching the JSON shape where a missing `isNullable` means
/// `false`.
///
/// # Examples
///
/// ```
/// use supa_admin_core::ColumnSpec;
///
/// let id = ColumnSpec::new("id", "bigint").identity();
/// assert!(id.is_identity);
/// assert!(id.is_effective_primary_key());
///
/// let json = r#"{"name": "price", "type": "numeric", "isNullable": true}"#;
/// let price: ColumnSpec = serde_json::from_str(json).unwrap();
/// assert_eq!(price.sql_type, "numeric");
/// assert!(price.is_nullable);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSpec {
    /// Column name.
    pub name: String,
    /// SQL type as written by the caller (e.g. `text`, `bigint`).
    #[serde(rename = "type", alias = "sqlType")]
    pub sql_type: String,
    /// Declares the column as the table's primary key.
    #[serde(default)]
    pub is_primary_key: bool,
    /// Declares the column as auto-generated.
    #[serde(default)]
    pub is_identity: bool,
    /// Allows `NULL` values.
    #[serde(default)]
    pub is_nullable: bool,
    /// Column default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<DefaultValue>,
}

impl ColumnSpec {
    /// Creates a required (`NOT NULL`) column with no constraints.
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            is_primary_key: false,
            is_identity: false,
            is_nullable: false,
            default_value: None,
        }
    }

    /// Marks as primary key.
    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    /// Marks as an identity (auto-generated) column.
    pub fn identity(mut self) -> Self {
        self.is_identity = true;
        self
    }

    /// Allows `NULL` values.
    pub fn nullable(mut self) -> Self {
        self.is_nullable = true;
        self
    }

    /// Sets the column default.
    pub fn with_default(mut self, value: impl Into<DefaultValue>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Returns the serial shortcut this identity column renders as, if any.
    ///
    /// Integer-family identity columns become `SERIAL`, big-integer ones
    /// `BIGSERIAL`; every other type (or a non-identity column) returns
    /// `None`.
    pub fn serial_type(&self) -> Option<&'static str> {
        if !self.is_identity {
            return None;
        }
        match self.sql_type.trim().to_ascii_lowercase().as_str() {
            "integer" | "int" | "int4" | "serial" => Some("SERIAL"),
            "bigint" | "big integer" | "int8" | "bigserial" => Some("BIGSERIAL"),
            _ => None,
        }
    }

    /// Returns `true` if the rendered column carries a primary key.
    ///
    /// This covers explicit primary keys and serial identity columns,
    /// which are emitted as `SERIAL PRIMARY KEY`.
    pub fn is_effective_primary_key(&self) -> bool {
        self.is_primary_key || self.serial_type().is_some()
    }
}

/// Changes to an existing column, forwarded to the metadata API.
///
/// Only the fields that are set are serialized.
///
/// # Examples
///
/// ```
/// use supa_admin_core::ColumnAlteration;
///
/// let change = ColumnAlteration::new().nullable(false).default_value("0");
/// let json = serde_json::to_value(&change).unwrap();
/// assert_eq!(json, serde_json::json!({"is_nullable": false, "default_value": "0"}));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnAlteration {
    /// New column name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New SQL type.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub sql_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_nullable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_unique: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<DefaultValue>,
    /// Removes the current default.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub drop_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ColumnAlteration {
    /// Creates an alteration that changes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Renames the column.
    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Changes the column type.
    pub fn sql_type(mut self, sql_type: impl Into<String>) -> Self {
        self.sql_type = Some(sql_type.into());
        self
    }

    /// Sets nullability.
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.is_nullable = Some(nullable);
        self
    }

    /// Sets uniqueness.
    pub fn unique(mut self, unique: bool) -> Self {
        self.is_unique = Some(unique);
        self
    }

    /// Sets a new default.
    pub fn default_value(mut self, value: impl Into<DefaultValue>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Drops the current default.
    pub fn drop_default(mut self) -> Self {
        self.drop_default = true;
        self
    }

    /// Sets the column comment.
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Returns `true` if no change is requested.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Definition of a table to create.
///
/// Column order is significant: it determines the order of the column
/// clauses in the generated `CREATE TABLE` statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    /// Table name.
    pub name: String,
    /// Schema the table lives in.
    #[serde(default = "default_schema")]
    pub schema: String,
    /// Ordered column definitions.
    pub columns: Vec<ColumnSpec>,
}

fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

impl TableSpec {
    /// Creates an empty table definition in the `public` schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: default_schema(),
            columns: Vec::new(),
        }
    }

    /// Places the table in a different schema.
    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Appends a column.
    pub fn with_column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }

    /// Returns `true` if the table lives in the default schema.
    pub fn is_default_schema(&self) -> bool {
        self.schema == DEFAULT_SCHEMA
    }

    /// Returns a reference to this table usable with the facade.
    pub fn table_ref(&self) -> TableRef {
        TableRef::new(self.schema.clone(), self.name.clone())
    }
}

/// Reference to an existing table.
///
/// Converts from `"schema.table"` or a bare `"table"` (which resolves to
/// the `public` schema).
///
/// # Examples
///
/// ```
/// use supa_admin_core::TableRef;
///
/// let t = TableRef::from("sales.orders");
/// assert_eq!(t.schema, "sales");
/// assert_eq!(t.name, "orders");
///
/// let p = TableRef::from("products");
/// assert_eq!(p.to_string(), "public.products");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct TableRef {
    /// Schema name.
    pub schema: String,
    /// Table name.
    pub name: String,
}

impl TableRef {
    /// Creates a reference to `schema.name`.
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// Creates a reference to a table in the `public` schema.
    pub fn public(name: impl Into<String>) -> Self {
        Self::new(DEFAULT_SCHEMA, name)
    }

    /// Returns `true` if the table lives in the default schema.
    pub fn is_default_schema(&self) -> bool {
        self.schema == DEFAULT_SCHEMA
    }
}

impl From<&str> for TableRef {
    fn from(raw: &str) -> Self {
        match raw.split_once('.') {
            Some((schema, name)) if !schema.is_empty() && !name.is_empty() => {
                Self::new(schema, name)
            }
            _ => Self::public(raw),
        }
    }
}

impl From<String> for TableRef {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<&TableRef> for TableRef {
    fn from(table: &TableRef) -> Self {
        table.clone()
    }
}

impl From<TableRef> for String {
    fn from(table: TableRef) -> Self {
        table.to_string()
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}
