//! Host-native projections of values.

use indexmap::IndexMap;
use std::fmt;
use thiserror::Error;

use super::{Kind, MapKey, MapValue, Value};

/// Shape a value can be projected onto with `Converter::convert_to_native`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NativeType {
    Bool,
    Int,
    Uint,
    Double,
    String,
    Bytes,
    List(Box<NativeType>),
    /// String-keyed map; non-string keys are rendered as text.
    Map(Box<NativeType>),
    Json,
    /// The value itself, unconverted.
    Value,
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeType::Bool => f.write_str("bool"),
            NativeType::Int => f.write_str("i64"),
            NativeType::Uint => f.write_str("u64"),
            NativeType::Double => f.write_str("f64"),
            NativeType::String => f.write_str("String"),
            NativeType::Bytes => f.write_str("Vec<u8>"),
            NativeType::List(elem) => write!(f, "Vec<{elem}>"),
            NativeType::Map(value) => write!(f, "IndexMap<String, {value}>"),
            NativeType::Json => f.write_str("serde_json::Value"),
            NativeType::Value => f.write_str("Value"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum NativeValue {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<NativeValue>),
    Map(IndexMap<String, NativeValue>),
    Json(serde_json::Value),
    Value(Value),
}

/// A value could not be projected onto the requested native shape.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("type conversion error from '{from}' to native '{to}'")]
pub struct ConversionError {
    pub from: Kind,
    pub to: NativeType,
}

impl ConversionError {
    pub fn new(from: Kind, to: &NativeType) -> Self {
        Self {
            from,
            to: to.clone(),
        }
    }
}

impl From<NativeValue> for Value {
    fn from(native: NativeValue) -> Self {
        match native {
            NativeValue::Bool(value) => Value::Bool(value),
            NativeValue::Int(value) => Value::Int(value),
            NativeValue::Uint(value) => Value::Uint(value),
            NativeValue::Double(value) => Value::double(value),
            NativeValue::String(value) => Value::string(value),
            NativeValue::Bytes(value) => Value::bytes(value),
            NativeValue::List(items) => Value::list(items.into_iter().map(Value::from)),
            NativeValue::Map(entries) => Value::Map(MapValue::from_entries(
                entries
                    .into_iter()
                    .map(|(key, value)| (MapKey::from(key.as_str()), Value::from(value)))
                    .collect(),
            )),
            NativeValue::Json(json) => Value::from(json),
            NativeValue::Value(value) => value,
        }
    }
}

/// JSON numbers become Int when integral and in range, Uint when only
/// representable unsigned, Double otherwise.
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(value) => Value::Bool(value),
            serde_json::Value::Number(number) => {
                if let Some(value) = number.as_i64() {
                    Value::Int(value)
                } else if let Some(value) = number.as_u64() {
                    Value::Uint(value)
                } else {
                    Value::double(number.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(value) => Value::string(value),
            serde_json::Value::Array(items) => Value::list(items.into_iter().map(Value::from)),
            serde_json::Value::Object(object) => Value::Map(MapValue::from_entries(
                object
                    .into_iter()
                    .map(|(key, value)| (MapKey::from(key.as_str()), Value::from(value)))
                    .collect(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_to_value() {
        let value = Value::from(serde_json::json!({
            "name": "ada",
            "age": 36,
            "tags": ["a", "b"],
            "ratio": 0.5,
            "nothing": null,
        }));
        let Value::Map(map) = &value else {
            panic!("expected map, got {value:?}");
        };
        assert_eq!(map.field("name"), Some(&Value::string("ada")));
        assert_eq!(map.field("age"), Some(&Value::Int(36)));
        assert_eq!(
            map.field("tags"),
            Some(&Value::list([Value::string("a"), Value::string("b")]))
        );
        assert_eq!(map.field("ratio"), Some(&Value::double(0.5)));
        assert_eq!(map.field("nothing"), Some(&Value::Null));
    }

    #[test]
    fn test_large_json_number_is_uint() {
        let value = Value::from(serde_json::json!(u64::MAX));
        assert_eq!(value, Value::Uint(u64::MAX));
    }

    #[test]
    fn test_conversion_error_message() {
        let error = ConversionError::new(Kind::String, &NativeType::Int);
        assert_eq!(
            error.to_string(),
            "type conversion error from 'string' to native 'i64'"
        );
    }
}
