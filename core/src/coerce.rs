//! String-to-primitive coercion for bulk import.
//!
//! CSV fields arrive as strings. Before they are inserted, each field is
//! converted to an integer or a float when it looks numeric, and left as a
//! string otherwise.
//!
//! The numeric test is narrow: a value qualifies only if,
//! after dropping its first `.` and then one leading `-`, nothing but ASCII
//! digits remain. Exponents, `+` signs, surrounding whitespace and
//! thousands separators all keep the value a string, and `"1.2.3"` stays a
//! string because only one dot is dropped.
//!
//! # Examples
//!
//! ```
//! use supa_admin_core::{CoercedValue, coerce};
//!
//! assert_eq!(coerce("42"), CoercedValue::Integer(42));
//! assert_eq!(coerce("-5"), CoercedValue::Integer(-5));
//! assert_eq!(coerce("3.14"), CoercedValue::Float(3.14));
//! assert_eq!(coerce("abc"), CoercedValue::Text("abc".into()));
//! assert_eq!(coerce(""), CoercedValue::Text(String::new()));
//! ```

use serde::Serialize;
use serde_json::{Map, Value};

/// Result of coercing a single field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CoercedValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl From<CoercedValue> for Value {
    fn from(value: CoercedValue) -> Self {
        match value {
            CoercedValue::Integer(n) => Value::from(n),
            // Non-finite floats cannot be produced from digit-only input.
            CoercedValue::Float(f) => Value::from(f),
            CoercedValue::Text(s) => Value::String(s),
        }
    }
}

/// Returns `true` if `raw` passes the numeric eligibility test.
pub fn is_numeric_candidate(raw: &str) -> bool {
    let without_dot = raw.replacen('.', "", 1);
    let digits = without_dot.strip_prefix('-').unwrap_or(&without_dot);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Coerces one raw field.
///
/// Eligible values containing a `.` become floats, other eligible values
/// become integers. Eligible values that still do not parse (such as
/// `.-5`, or integers outside the `i64` range) are kept as strings.
pub fn coerce(raw: &str) -> CoercedValue {
    if !is_numeric_candidate(raw) {
        return CoercedValue::Text(raw.to_string());
    }

    if raw.contains('.') {
        match raw.parse::<f64>() {
            Ok(f) => CoercedValue::Float(f),
            Err(_) => CoercedValue::Text(raw.to_string()),
        }
    } else {
        match raw.parse::<i64>() {
            Ok(n) => CoercedValue::Integer(n),
            Err(_) => CoercedValue::Text(raw.to_string()),
        }
    }
}

/// Coerces every field of an import row into a JSON object.
///
/// # Examples
///
/// ```
/// use supa_admin_core::coerce_row;
///
/// let row = coerce_row([("id", "1"), ("name", "Widget"), ("price", "9.5")]);
/// assert_eq!(row["id"], 1);
/// assert_eq!(row["name"], "Widget");
/// assert_eq!(row["price"], 9.5);
/// ```
pub fn coerce_row<I, K, V>(fields: I) -> Map<String, Value>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: AsRef<str>,
{
    fields
        .into_iter()
        .map(|(key, value)| (key.into(), coerce(value.as_ref()).into()))
        .collect()
}
