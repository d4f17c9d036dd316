//! Query-string encoding for the REST data API.
//!
//! Turns a [`QuerySpec`] (projection, filters, ordering, pagination) into
//! the flat parameter map the data API expects. Values are copied
//! verbatim; URL escaping is left to the transport when it serializes the
//! map into a query string.
//!
//! # Example
//!
//! ```
//! use supa_admin_core::{FilterSpec, QuerySpec, encode_query};
//!
//! let query = QuerySpec::new()
//!     .filters(FilterSpec::new().with("price", "gte.100").unwrap())
//!     .order("created_at.desc")
//!     .limit(10);
//!
//! let params = encode_query(&query);
//! assert_eq!(params["select"], "*");
//! assert_eq!(params["price"], "gte.100");
//! assert_eq!(params["order"], "created_at.desc");
//! assert_eq!(params["limit"], "10");
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::filter::FilterSpec;

/// Flat query-parameter map sent to the data API.
///
/// Parameter order carries no meaning for the server; a sorted map keeps
/// encoded output deterministic.
pub type QueryParams = BTreeMap<String, String>;

/// Projection used when no columns are named.
pub const SELECT_ALL: &str = "*";

/// Row selection descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpec {
    /// Comma-separated projection (`*` by default).
    #[serde(default = "select_all")]
    pub columns: String,
    /// Row filters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<FilterSpec>,
    /// Ordering such as `created_at.desc` or `name.asc,id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    /// Maximum number of rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// Number of rows to skip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

fn select_all() -> String {
    SELECT_ALL.to_string()
}

impl Default for QuerySpec {
    fn default() -> Self {
        Self {
            columns: select_all(),
            filters: None,
            order: None,
            limit: None,
            offset: None,
        }
    }
}

impl QuerySpec {
    /// Creates a query selecting every column of every row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the projection.
    pub fn columns(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    /// Sets the row filters.
    pub fn filters(mut self, filters: FilterSpec) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Sets the ordering.
    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    /// Sets the row limit.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the row offset.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Encodes filters alone into query parameters.
///
/// Used by update, delete and count, which carry no projection or paging.
pub fn encode_filters(filters: &FilterSpec) -> QueryParams {
    filters
        .iter()
        .map(|(column, filter)| (column.to_string(), filter.as_param().to_string()))
        .collect()
}

/// Encodes a full query into query parameters.
///
/// Always includes `select`. `order` is copied when present; `limit` and
/// `offset` are included only when present and non-zero.
pub fn encode_query(query: &QuerySpec) -> QueryParams {
    let mut params = QueryParams::new();
    params.insert("select".to_string(), query.columns.clone());

    if let Some(filters) = &query.filters {
        params.extend(encode_filters(filters));
    }
    if let Some(order) = &query.order {
        params.insert("order".to_string(), order.clone());
    }
    if let Some(limit) = query.limit.filter(|&n| n != 0) {
        params.insert("limit".to_string(), limit.to_string());
    }
    if let Some(offset) = query.offset.filter(|&n| n != 0) {
        params.insert("offset".to_string(), offset.to_string());
    }

    params
}
