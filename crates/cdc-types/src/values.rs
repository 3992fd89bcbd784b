//! Field values carried by change rows.
//!
//! The upstream CDC producer encodes every column as `{"content": <json>}`
//! where the content is whatever scalar the database handed out. We keep the
//! scalar shape as a closed tagged union so downstream code has to match on
//! it instead of casting.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single scalar column value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Boolean value
    Bool(bool),

    /// Any JSON number. The producer does not distinguish integers from
    /// floats, so neither do we.
    Number(f64),

    /// String value
    Text(String),

    /// SQL NULL or a missing `content`
    #[default]
    Null,
}

impl FieldValue {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Try to get this value as a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Human readable name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::Text(_) => "text",
            Self::Null => "null",
        }
    }
}

/// Render a number the way document identifiers are written: integral
/// values lose their fractional part (`42.0` becomes `"42"`), everything
/// else uses the shortest representation that round-trips.
pub fn canonical_number(n: f64) -> String {
    if n == 0.0 {
        // Collapse -0.0
        return "0".to_string();
    }
    n.to_string()
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => f.write_str(&canonical_number(*n)),
            Self::Text(s) => f.write_str(s),
            Self::Null => f.write_str("null"),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Wire wrapper around a value: `{"content": ...}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Field {
    #[serde(default)]
    pub content: FieldValue,
}

impl Field {
    pub fn new(content: impl Into<FieldValue>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_scalars() {
        let v: FieldValue = serde_json::from_str("42").unwrap();
        assert_eq!(v, FieldValue::Number(42.0));

        let v: FieldValue = serde_json::from_str("4.5").unwrap();
        assert_eq!(v, FieldValue::Number(4.5));

        let v: FieldValue = serde_json::from_str("\"hello\"").unwrap();
        assert_eq!(v, FieldValue::Text("hello".to_string()));

        let v: FieldValue = serde_json::from_str("true").unwrap();
        assert_eq!(v, FieldValue::Bool(true));

        let v: FieldValue = serde_json::from_str("null").unwrap();
        assert_eq!(v, FieldValue::Null);
    }

    #[test]
    fn test_decode_rejects_nested_values() {
        assert!(serde_json::from_str::<FieldValue>("[1, 2]").is_err());
        assert!(serde_json::from_str::<FieldValue>("{\"a\": 1}").is_err());
    }

    #[test]
    fn test_field_without_content_is_null() {
        let field: Field = serde_json::from_str("{}").unwrap();
        assert!(field.content.is_null());
    }

    #[test]
    fn test_canonical_number() {
        assert_eq!(canonical_number(42.0), "42");
        assert_eq!(canonical_number(-7.0), "-7");
        assert_eq!(canonical_number(1.5), "1.5");
        assert_eq!(canonical_number(-0.0), "0");
        assert_eq!(canonical_number(9_007_199_254_740_992.0), "9007199254740992");
    }

    #[test]
    fn test_serialize_is_plain_json() {
        let json = serde_json::to_string(&FieldValue::Text("x".into())).unwrap();
        assert_eq!(json, "\"x\"");
        let json = serde_json::to_string(&FieldValue::Null).unwrap();
        assert_eq!(json, "null");
    }
}
