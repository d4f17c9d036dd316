//! Response models.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use supa_admin_core::{ColumnSpec, TableRef};

/// A row as exchanged with the data API.
pub type Row = Map<String, Value>;

/// Table description returned by the metadata API.
///
/// Only the identifying fields are typed; everything else the server sends
/// (columns, primary keys, relationships, sizes) is kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub schema: String,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TableInfo {
    pub fn table_ref(&self) -> TableRef {
        TableRef::new(self.schema.clone(), self.name.clone())
    }
}

/// Result of a successful table creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedTable {
    /// Table name, without the schema.
    pub table_name: String,
    pub schema: String,
    /// The `CREATE TABLE` statement that was executed.
    pub sql: String,
    pub columns: Vec<ColumnSpec>,
}

impl CreatedTable {
    pub fn table_ref(&self) -> TableRef {
        TableRef::new(self.schema.clone(), self.table_name.clone())
    }
}
