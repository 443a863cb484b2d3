//! Flag values.
//!
//! [`Value`] is the tagged union used for defaults, resolved object flags and
//! context attributes. Its serde representation is untagged, so any JSON or
//! TOML document maps onto it recursively.

use crate::error::ValueError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Field map of a structured value.
pub type Structure = BTreeMap<String, Value>;

/// Any flag value, primitive or structured.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// No meaningful value
    #[default]
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
    List(Vec<Value>),
    Structure(Structure),
}

/// Discriminant of a [`Value`], used in type mismatch reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Boolean,
    Integer,
    Double,
    String,
    List,
    Structure,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Boolean => "boolean",
            ValueKind::Integer => "integer",
            ValueKind::Double => "double",
            ValueKind::String => "string",
            ValueKind::List => "list",
            ValueKind::Structure => "structure",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    /// Start building a structure value.
    ///
    /// # Examples
    ///
    /// ```
    /// use flagline_core::Value;
    ///
    /// let value = Value::structure()
    ///     .field("bool", true)
    ///     .field("number", 1000)
    ///     .build();
    ///
    /// assert_eq!(value.get("number").and_then(|v| v.as_i64().ok()), Some(1000));
    /// ```
    pub fn structure() -> StructureBuilder {
        StructureBuilder::default()
    }

    /// The variant this value holds.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Integer(_) => ValueKind::Integer,
            Value::Double(_) => ValueKind::Double,
            Value::String(_) => ValueKind::String,
            Value::List(_) => ValueKind::List,
            Value::Structure(_) => ValueKind::Structure,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True for the variants an object flag may resolve to.
    pub fn is_structured(&self) -> bool {
        matches!(self, Value::Structure(_) | Value::List(_))
    }

    pub fn as_bool(&self) -> Result<bool, ValueError> {
        match self {
            Value::Boolean(b) => Ok(*b),
            other => Err(other.mismatch(ValueKind::Boolean)),
        }
    }

    pub fn as_str(&self) -> Result<&str, ValueError> {
        match self {
            Value::String(s) => Ok(s),
            other => Err(other.mismatch(ValueKind::String)),
        }
    }

    pub fn as_i64(&self) -> Result<i64, ValueError> {
        match self {
            Value::Integer(i) => Ok(*i),
            other => Err(other.mismatch(ValueKind::Integer)),
        }
    }

    pub fn as_f64(&self) -> Result<f64, ValueError> {
        match self {
            Value::Double(d) => Ok(*d),
            other => Err(other.mismatch(ValueKind::Double)),
        }
    }

    pub fn as_structure(&self) -> Result<&Structure, ValueError> {
        match self {
            Value::Structure(fields) => Ok(fields),
            other => Err(other.mismatch(ValueKind::Structure)),
        }
    }

    pub fn as_list(&self) -> Result<&[Value], ValueError> {
        match self {
            Value::List(items) => Ok(items),
            other => Err(other.mismatch(ValueKind::List)),
        }
    }

    /// Look up a field of a structure. Returns `None` for other variants.
    pub fn get(&self, field: &str) -> Option<&Value> {
        match self {
            Value::Structure(fields) => fields.get(field),
            _ => None,
        }
    }

    fn mismatch(&self, expected: ValueKind) -> ValueError {
        ValueError::TypeMismatch {
            expected,
            found: self.kind(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Double(d) => write!(f, "{}", d),
            Value::String(s) => f.write_str(s),
            Value::List(_) | Value::Structure(_) => match serde_json::to_string(self) {
                Ok(json) => f.write_str(&json),
                Err(_) => Err(fmt::Error),
            },
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl From<Structure> for Value {
    fn from(value: Structure) -> Self {
        Value::Structure(value)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => n.as_f64().map_or(Value::Null, Value::Double),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Structure(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

/// Builder for [`Value::Structure`].
#[derive(Debug, Default)]
pub struct StructureBuilder {
    fields: Structure,
}

impl StructureBuilder {
    /// Add a field, replacing any earlier field with the same name.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn build(self) -> Value {
        Value::Structure(self.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors_match_variant() {
        assert_eq!(Value::from(true).as_bool(), Ok(true));
        assert_eq!(Value::from("on").as_str(), Ok("on"));
        assert_eq!(Value::from(42).as_i64(), Ok(42));
        assert_eq!(Value::from(0.5).as_f64(), Ok(0.5));
        assert_eq!(Value::from(vec![Value::Null]).as_list().map(|l| l.len()), Ok(1));
    }

    #[test]
    fn test_accessor_type_mismatch() {
        let err = Value::from("42").as_i64().unwrap_err();
        assert_eq!(
            err,
            ValueError::TypeMismatch {
                expected: ValueKind::Integer,
                found: ValueKind::String,
            }
        );

        // No implicit widening between numeric variants
        assert!(Value::from(1).as_f64().is_err());
        assert!(Value::Null.as_structure().is_err());
    }

    #[test]
    fn test_structure_builder() {
        let value = Value::structure()
            .field("bool", true)
            .field("string", "val")
            .field("number", 1000)
            .field("number", 1001)
            .build();

        let fields = value.as_structure().unwrap();
        assert_eq!(fields.len(), 3);
        assert_eq!(value.get("bool"), Some(&Value::Boolean(true)));
        assert_eq!(value.get("number"), Some(&Value::Integer(1001)));
        assert!(value.get("missing").is_none());
        assert!(value.is_structured());
    }

    #[test]
    fn test_deserialize_document() {
        let value: Value = serde_json::from_str(
            r#"{"flag": true, "count": 3, "ratio": 0.25, "tags": ["a", null], "name": "x"}"#,
        )
        .unwrap();

        assert_eq!(value.get("flag"), Some(&Value::Boolean(true)));
        assert_eq!(value.get("count"), Some(&Value::Integer(3)));
        assert_eq!(value.get("ratio"), Some(&Value::Double(0.25)));
        assert_eq!(
            value.get("tags"),
            Some(&Value::List(vec![Value::from("a"), Value::Null]))
        );
        assert_eq!(value.get("name").and_then(|v| v.as_str().ok()), Some("x"));
    }

    #[test]
    fn test_from_json_value() {
        let json = serde_json::json!({"n": 1, "f": 1.5, "big": u64::MAX, "nested": {"ok": false}});
        let value = Value::from(json);

        assert_eq!(value.get("n").map(Value::kind), Some(ValueKind::Integer));
        assert_eq!(value.get("f").map(Value::kind), Some(ValueKind::Double));
        assert_eq!(value.get("big").map(Value::kind), Some(ValueKind::Double));
        assert_eq!(
            value.get("nested").and_then(|n| n.get("ok")),
            Some(&Value::Boolean(false))
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from("text").to_string(), "text");
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(
            Value::structure().field("a", 1).build().to_string(),
            r#"{"a":1}"#
        );
    }
}
