//! Data-API row filters.
//!
//! A filter pairs a column with an operator-prefixed comparison such as
//! `eq.1`, `gte.100`, or `not.is.null`. Filters are parsed and checked
//! against the closed set of operators the data API understands when they
//! are constructed, then encoded back to the exact text the caller gave.
//!
//! # Examples
//!
//! ```
//! use supa_admin_core::{FilterOperator, FilterSpec};
//!
//! let filters = FilterSpec::new()
//!     .with("price", "gte.100").unwrap()
//!     .with("name", "like.%phone%").unwrap();
//! assert_eq!(filters.get("price").unwrap().operator, FilterOperator::Gte);
//!
//! assert!(FilterSpec::new().with("id", "equals.1").is_err());
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::validate::ValidationError;

/// Comparison operators accepted by the data API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    Ilike,
    Match,
    Imatch,
    In,
    Is,
    IsDistinct,
    Fts,
    Plfts,
    Phfts,
    Wfts,
    Cs,
    Cd,
    Ov,
    Sl,
    Sr,
    Nxr,
    Nxl,
    Adj,
}

impl FilterOperator {
    /// Returns the operator token as written in query strings.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Like => "like",
            Self::Ilike => "ilike",
            Self::Match => "match",
            Self::Imatch => "imatch",
            Self::In => "in",
            Self::Is => "is",
            Self::IsDistinct => "isdistinct",
            Self::Fts => "fts",
            Self::Plfts => "plfts",
            Self::Phfts => "phfts",
            Self::Wfts => "wfts",
            Self::Cs => "cs",
            Self::Cd => "cd",
            Self::Ov => "ov",
            Self::Sl => "sl",
            Self::Sr => "sr",
            Self::Nxr => "nxr",
            Self::Nxl => "nxl",
            Self::Adj => "adj",
        }
    }

    /// Looks up an operator token.
    ///
    /// Full-text operators may carry a language suffix (`fts(english)`);
    /// the suffix is ignored for the lookup.
    pub fn from_token(token: &str) -> Option<Self> {
        let base = token.split_once('(').map_or(token, |(base, _)| base);
        let op = match base {
            "eq" => Self::Eq,
            "neq" => Self::Neq,
            "gt" => Self::Gt,
            "gte" => Self::Gte,
            "lt" => Self::Lt,
            "lte" => Self::Lte,
            "like" => Self::Like,
            "ilike" => Self::Ilike,
            "match" => Self::Match,
            "imatch" => Self::Imatch,
            "in" => Self::In,
            "is" => Self::Is,
            "isdistinct" => Self::IsDistinct,
            "fts" => Self::Fts,
            "plfts" => Self::Plfts,
            "phfts" => Self::Phfts,
            "wfts" => Self::Wfts,
            "cs" => Self::Cs,
            "cd" => Self::Cd,
            "ov" => Self::Ov,
            "sl" => Self::Sl,
            "sr" => Self::Sr,
            "nxr" => Self::Nxr,
            "nxl" => Self::Nxl,
            "adj" => Self::Adj,
            _ => return None,
        };
        Some(op)
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single parsed filter value (the right-hand side of `column=...`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    /// Comparison operator.
    pub operator: FilterOperator,
    /// Whether the comparison is negated with a `not.` prefix.
    pub negated: bool,
    /// Everything after the operator, passed through untouched.
    pub operand: String,
    raw: String,
}

impl Filter {
    /// Builds a filter from an operator and operand.
    pub fn new(operator: FilterOperator, operand: impl Into<String>) -> Self {
        let operand = operand.into();
        let raw = format!("{operator}.{operand}");
        Self {
            operator,
            negated: false,
            operand,
            raw,
        }
    }

    /// Negates the filter.
    pub fn negate(mut self) -> Self {
        if !self.negated {
            self.negated = true;
            self.raw = format!("not.{}", self.raw);
        }
        self
    }

    /// Returns the operator-prefixed value exactly as it is sent.
    pub fn as_param(&self) -> &str {
        &self.raw
    }
}

impl FromStr for Filter {
    type Err = ValidationError;

    /// Parses `[not.]operator.operand`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidFilter`] when the operator is
    /// missing or not recognized.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidFilter(raw.to_string());
        let (negated, rest) = match raw.strip_prefix("not.") {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let (token, operand) = rest.split_once('.').ok_or_else(invalid)?;
        let operator = FilterOperator::from_token(token).ok_or_else(invalid)?;
        Ok(Self {
            operator,
            negated,
            operand: operand.to_string(),
            raw: raw.to_string(),
        })
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Column-to-filter mapping for select, update, delete, and count.
///
/// Deserializes from a JSON object whose values are operator-prefixed
/// strings; every value is validated during deserialization.
///
/// # Examples
///
/// ```
/// use supa_admin_core::FilterSpec;
///
/// let filters: FilterSpec = serde_json::from_str(r#"{"id": "eq.1"}"#).unwrap();
/// assert_eq!(filters.len(), 1);
///
/// let bad = serde_json::from_str::<FilterSpec>(r#"{"id": "1"}"#);
/// assert!(bad.is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct FilterSpec {
    filters: BTreeMap<String, Filter>,
}

impl FilterSpec {
    /// Creates an empty filter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filter from its operator-prefixed text.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownOperator`] if the value does not
    /// start with a recognized operator, or
    /// [`ValidationError::EmptyFilterColumn`] for a blank column.
    pub fn with(mut self, column: &str, value: &str) -> Result<Self, ValidationError> {
        self.insert(column, value)?;
        Ok(self)
    }

    /// Adds an equality filter.
    pub fn eq(mut self, column: impl Into<String>, value: impl fmt::Display) -> Self {
        self.filters
            .insert(column.into(), Filter::new(FilterOperator::Eq, value.to_string()));
        self
    }

    /// Adds an already-built filter.
    pub fn with_filter(mut self, column: impl Into<String>, filter: Filter) -> Self {
        self.filters.insert(column.into(), filter);
        self
    }

    /// Parses and inserts a filter, replacing any filter on the same column.
    ///
    /// # Errors
    ///
    /// See [`with`](Self::with).
    pub fn insert(&mut self, column: &str, value: &str) -> Result<(), ValidationError> {
        if column.trim().is_empty() {
            return Err(ValidationError::EmptyFilterColumn);
        }
        let filter = value
            .parse::<Filter>()
            .map_err(|_| ValidationError::UnknownOperator {
                column: column.to_string(),
                value: value.to_string(),
            })?;
        self.filters.insert(column.to_string(), filter);
        Ok(())
    }

    /// Returns the filter on `column`, if any.
    pub fn get(&self, column: &str) -> Option<&Filter> {
        self.filters.get(column)
    }

    /// Iterates over `(column, filter)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Filter)> {
        self.filters.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of filtered columns.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns `true` if no filters are set.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl TryFrom<BTreeMap<String, String>> for FilterSpec {
    type Error = ValidationError;

    fn try_from(raw: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        let mut spec = Self::new();
        for (column, value) in &raw {
            spec.insert(column, value)?;
        }
        Ok(spec)
    }
}

impl From<FilterSpec> for BTreeMap<String, String> {
    fn from(spec: FilterSpec) -> Self {
        spec.filters
            .into_iter()
            .map(|(column, filter)| (column, filter.raw))
            .collect()
    }
}
