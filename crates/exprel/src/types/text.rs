//! String and Bytes values.

use std::fmt;
use std::sync::Arc;

use super::traits::{Comparer, Converter, Equaler, Sizer};
use super::{
    ConversionError, ErrorValue, Kind, NativeType, NativeValue, Type, Value, no_such_overload,
    not_equal, parse_duration, temporal,
};

/// Immutable UTF-8 text.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StringValue(Arc<str>);

impl StringValue {
    pub fn new(value: impl Into<Arc<str>>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StringValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable byte sequence.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BytesValue(Arc<[u8]>);

impl BytesValue {
    pub fn new(value: impl Into<Arc<[u8]>>) -> Self {
        Self(value.into())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "1" | "t" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

fn parse_error(text: &str, target: &Type) -> Value {
    Value::error(format!("cannot convert string {text:?} to {target}"))
}

// =============================================================================
// String
// =============================================================================

impl Comparer for StringValue {
    fn compare(&self, other: &Value) -> Value {
        match other {
            // Byte order of UTF-8 is code point order.
            Value::String(other) => Value::from(self.0.cmp(&other.0)),
            _ => no_such_overload(other),
        }
    }
}

impl Equaler for StringValue {
    fn equal(&self, other: &Value) -> Value {
        match other {
            Value::String(other) => Value::Bool(self.0 == other.0),
            _ => not_equal(other),
        }
    }
}

impl Sizer for StringValue {
    fn size(&self) -> Value {
        Value::Int(self.0.chars().count() as i64)
    }
}

impl Converter for StringValue {
    fn convert_to_type(&self, target: &Type) -> Value {
        let text = self.as_str();
        match target.kind() {
            Kind::String | Kind::Dyn => Value::String(self.clone()),
            Kind::Int => text
                .parse()
                .map(Value::Int)
                .unwrap_or_else(|_| parse_error(text, target)),
            Kind::Uint => text
                .parse()
                .map(Value::Uint)
                .unwrap_or_else(|_| parse_error(text, target)),
            Kind::Double => text
                .parse::<f64>()
                .map(Value::double)
                .unwrap_or_else(|_| parse_error(text, target)),
            Kind::Bool => parse_bool(text)
                .map(Value::Bool)
                .unwrap_or_else(|| parse_error(text, target)),
            Kind::Bytes => Value::bytes(text.as_bytes()),
            Kind::Timestamp => temporal::parse_timestamp(text)
                .map(Value::Timestamp)
                .unwrap_or_else(|| parse_error(text, target)),
            Kind::Duration => parse_duration(text)
                .map(Value::Duration)
                .unwrap_or_else(|| parse_error(text, target)),
            Kind::Type => Value::Type(Type::String),
            _ => Value::Error(ErrorValue::conversion(&Type::String, target)),
        }
    }

    fn convert_to_native(&self, target: &NativeType) -> Result<NativeValue, ConversionError> {
        match target {
            NativeType::String => Ok(NativeValue::String(self.0.to_string())),
            NativeType::Json => Ok(NativeValue::Json(serde_json::Value::String(
                self.0.to_string(),
            ))),
            NativeType::Value => Ok(NativeValue::Value(Value::String(self.clone()))),
            _ => Err(ConversionError::new(Kind::String, target)),
        }
    }
}

// =============================================================================
// Bytes
// =============================================================================

impl Comparer for BytesValue {
    fn compare(&self, other: &Value) -> Value {
        match other {
            Value::Bytes(other) => Value::from(self.0.cmp(&other.0)),
            _ => no_such_overload(other),
        }
    }
}

impl Equaler for BytesValue {
    fn equal(&self, other: &Value) -> Value {
        match other {
            Value::Bytes(other) => Value::Bool(self.0 == other.0),
            _ => not_equal(other),
        }
    }
}

impl Sizer for BytesValue {
    fn size(&self) -> Value {
        Value::Int(self.0.len() as i64)
    }
}

impl Converter for BytesValue {
    fn convert_to_type(&self, target: &Type) -> Value {
        match target.kind() {
            Kind::Bytes | Kind::Dyn => Value::Bytes(self.clone()),
            Kind::String => match std::str::from_utf8(&self.0) {
                Ok(text) => Value::string(text),
                Err(error) => Value::error(format!("invalid UTF-8 in bytes: {error}")),
            },
            Kind::Type => Value::Type(Type::Bytes),
            _ => Value::Error(ErrorValue::conversion(&Type::Bytes, target)),
        }
    }

    fn convert_to_native(&self, target: &NativeType) -> Result<NativeValue, ConversionError> {
        match target {
            NativeType::Bytes => Ok(NativeValue::Bytes(self.0.to_vec())),
            NativeType::Json => Ok(NativeValue::Json(serde_json::Value::from(self.0.to_vec()))),
            NativeType::Value => Ok(NativeValue::Value(Value::Bytes(self.clone()))),
            _ => Err(ConversionError::new(Kind::Bytes, target)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_size_counts_code_points() {
        assert_eq!(Value::string("héllo").size(), Value::Int(5));
        assert_eq!(Value::bytes("héllo".as_bytes()).size(), Value::Int(6));
    }

    #[test]
    fn test_string_compare() {
        assert_eq!(Value::string("a").compare(&Value::string("b")), Value::Int(-1));
        assert_eq!(Value::string("b").compare(&Value::string("a")), Value::Int(1));
        assert!(Value::string("a").compare(&Value::Int(1)).is_error());
    }

    #[test]
    fn test_string_conversions() {
        assert_eq!(Value::string("42").convert_to_type(&Type::Int), Value::Int(42));
        assert_eq!(Value::string("True").convert_to_type(&Type::Bool), Value::Bool(true));
        assert!(Value::string("maybe").convert_to_type(&Type::Bool).is_error());
        assert!(Value::string("4x").convert_to_type(&Type::Uint).is_error());
        assert_eq!(
            Value::string("1.5s").convert_to_type(&Type::Duration),
            Value::Duration(time::Duration::milliseconds(1500))
        );
    }

    #[test]
    fn test_bytes_to_string_requires_utf8() {
        assert_eq!(Value::bytes(&b"abc"[..]).convert_to_type(&Type::String), Value::string("abc"));
        assert!(Value::bytes(&[0xffu8, 0xfe][..]).convert_to_type(&Type::String).is_error());
    }
}
