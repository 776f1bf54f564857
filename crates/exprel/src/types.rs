//! The dynamic value type system.
//!
//! `Value` is a closed sum over value kinds. Kind-specific behaviour lives in
//! the capability traits of [`traits`], implemented on each variant's payload;
//! `Value` exposes capability queries (`as_comparer()`, `as_mapper()`, ...)
//! plus short-circuiting convenience methods that dispatch through them.

use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

mod descriptor;
mod error;
mod list;
mod map;
mod native;
mod primitives;
mod provider;
mod temporal;
mod text;
pub mod traits;

pub use descriptor::{Kind, Type};
pub use error::{ErrorValue, UnknownValue};
pub use list::ListValue;
pub use map::{MapKey, MapValue};
pub use native::{ConversionError, NativeType, NativeValue};
pub use primitives::NullValue;
pub use provider::{Registry, RegistryError, TypeAdapter, TypeProvider};
pub use temporal::{format_duration, parse_duration};
pub use text::{BytesValue, StringValue};
pub use traits::{
    Comparer, Container, Converter, Equaler, Indexer, Iterable, Lookup, Mapper, Negater, Sizer,
    ValueIter,
};

/// A single runtime datum.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    /// Double with a total order: NaN equals itself and sorts above every
    /// other double.
    Double(OrderedFloat<f64>),
    String(StringValue),
    Bytes(BytesValue),
    List(ListValue),
    Map(MapValue),
    Timestamp(time::OffsetDateTime),
    Duration(time::Duration),
    Type(Type),
    Error(ErrorValue),
    Unknown(UnknownValue),
}

static NULL: NullValue = NullValue;

impl Value {
    pub fn double(value: f64) -> Self {
        Value::Double(OrderedFloat(value))
    }

    pub fn string(value: impl Into<Arc<str>>) -> Self {
        Value::String(StringValue::new(value))
    }

    pub fn bytes(value: impl Into<Arc<[u8]>>) -> Self {
        Value::Bytes(BytesValue::new(value))
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(ListValue::new(items))
    }

    pub fn error(message: impl Into<Arc<str>>) -> Self {
        Value::Error(ErrorValue::new(message))
    }

    pub fn unknown(id: i64) -> Self {
        Value::Unknown(UnknownValue::new(id))
    }

    /// The value's own runtime type.
    pub fn type_of(&self) -> Type {
        match self {
            Value::Null => Type::Null,
            Value::Bool(_) => Type::Bool,
            Value::Int(_) => Type::Int,
            Value::Uint(_) => Type::Uint,
            Value::Double(_) => Type::Double,
            Value::String(_) => Type::String,
            Value::Bytes(_) => Type::Bytes,
            Value::List(_) => Type::list(Type::Dyn),
            Value::Map(_) => Type::map(Type::Dyn, Type::Dyn),
            Value::Timestamp(_) => Type::Timestamp,
            Value::Duration(_) => Type::Duration,
            Value::Type(_) => Type::type_type(),
            Value::Error(_) => Type::Error,
            Value::Unknown(_) => Type::Unknown,
        }
    }

    pub fn kind(&self) -> Kind {
        self.type_of().kind()
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    // ----- Capability queries -----

    pub fn as_comparer(&self) -> Option<&dyn Comparer> {
        match self {
            Value::Bool(value) => Some(value),
            Value::Int(value) => Some(value),
            Value::Uint(value) => Some(value),
            Value::Double(value) => Some(value),
            Value::String(value) => Some(value),
            Value::Bytes(value) => Some(value),
            Value::Timestamp(value) => Some(value),
            Value::Duration(value) => Some(value),
            _ => None,
        }
    }

    /// Every kind supports equality.
    pub fn as_equaler(&self) -> &dyn Equaler {
        match self {
            Value::Null => &NULL,
            Value::Bool(value) => value,
            Value::Int(value) => value,
            Value::Uint(value) => value,
            Value::Double(value) => value,
            Value::String(value) => value,
            Value::Bytes(value) => value,
            Value::List(value) => value,
            Value::Map(value) => value,
            Value::Timestamp(value) => value,
            Value::Duration(value) => value,
            Value::Type(value) => value,
            Value::Error(value) => value,
            Value::Unknown(value) => value,
        }
    }

    pub fn as_negater(&self) -> Option<&dyn Negater> {
        match self {
            Value::Bool(value) => Some(value),
            Value::Int(value) => Some(value),
            Value::Double(value) => Some(value),
            Value::Duration(value) => Some(value),
            _ => None,
        }
    }

    /// Every kind supports conversion.
    pub fn as_converter(&self) -> &dyn Converter {
        match self {
            Value::Null => &NULL,
            Value::Bool(value) => value,
            Value::Int(value) => value,
            Value::Uint(value) => value,
            Value::Double(value) => value,
            Value::String(value) => value,
            Value::Bytes(value) => value,
            Value::List(value) => value,
            Value::Map(value) => value,
            Value::Timestamp(value) => value,
            Value::Duration(value) => value,
            Value::Type(value) => value,
            Value::Error(value) => value,
            Value::Unknown(value) => value,
        }
    }

    pub fn as_sizer(&self) -> Option<&dyn Sizer> {
        match self {
            Value::String(value) => Some(value),
            Value::Bytes(value) => Some(value),
            Value::List(value) => Some(value),
            Value::Map(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_indexer(&self) -> Option<&dyn Indexer> {
        match self {
            Value::List(value) => Some(value),
            Value::Map(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_iterable(&self) -> Option<&dyn Iterable> {
        match self {
            Value::List(value) => Some(value),
            Value::Map(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_container(&self) -> Option<&dyn Container> {
        match self {
            Value::List(value) => Some(value),
            Value::Map(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_mapper(&self) -> Option<&dyn Mapper> {
        match self {
            Value::Map(value) => Some(value),
            _ => None,
        }
    }

    // ----- Short-circuiting helpers -----

    /// The value every operation over `operands` must return unchanged: the
    /// first Error, otherwise the union of all Unknowns, otherwise `None`.
    pub fn propagate<'a>(operands: impl IntoIterator<Item = &'a Value>) -> Option<Value> {
        let mut unknown: Option<UnknownValue> = None;
        for operand in operands {
            match operand {
                Value::Error(_) => return Some(operand.clone()),
                Value::Unknown(next) => {
                    unknown = Some(match unknown {
                        Some(current) => current.merge(next),
                        None => next.clone(),
                    });
                }
                _ => {}
            }
        }
        unknown.map(Value::Unknown)
    }

    /// Apply `f` unless the value is an Error or Unknown.
    pub fn and_then(self, f: impl FnOnce(Value) -> Value) -> Value {
        if self.is_error() || self.is_unknown() {
            self
        } else {
            f(self)
        }
    }

    pub fn compare(&self, other: &Value) -> Value {
        if let Some(propagated) = Value::propagate([self, other]) {
            return propagated;
        }
        match self.as_comparer() {
            Some(comparer) => comparer.compare(other),
            None => Value::Error(ErrorValue::no_such_overload()),
        }
    }

    pub fn equal(&self, other: &Value) -> Value {
        if let Some(propagated) = Value::propagate([self, other]) {
            return propagated;
        }
        self.as_equaler().equal(other)
    }

    pub fn negate(&self) -> Value {
        match self.as_negater() {
            Some(negater) => negater.negate(),
            None => self.clone().and_then(|_| Value::Error(ErrorValue::no_such_overload())),
        }
    }

    pub fn convert_to_type(&self, target: &Type) -> Value {
        self.as_converter().convert_to_type(target)
    }

    pub fn convert_to_native(&self, target: &NativeType) -> Result<NativeValue, ConversionError> {
        self.as_converter().convert_to_native(target)
    }

    pub fn size(&self) -> Value {
        match self.as_sizer() {
            Some(sizer) => sizer.size(),
            None => self.clone().and_then(|_| Value::Error(ErrorValue::no_such_overload())),
        }
    }

    pub fn get(&self, index: &Value) -> Value {
        if let Some(propagated) = Value::propagate([self, index]) {
            return propagated;
        }
        match self.as_indexer() {
            Some(indexer) => indexer.get(index),
            None => Value::Error(ErrorValue::no_such_overload()),
        }
    }

    pub fn contains(&self, value: &Value) -> Value {
        if let Some(propagated) = Value::propagate([self, value]) {
            return propagated;
        }
        match self.as_container() {
            Some(container) => container.contains(value),
            None => Value::Error(ErrorValue::no_such_overload()),
        }
    }
}

/// Result for an operand of the wrong kind: Error and Unknown operands pass
/// through, anything else is `no such overload`.
pub(crate) fn no_such_overload(other: &Value) -> Value {
    match other {
        Value::Error(_) | Value::Unknown(_) => other.clone(),
        _ => Value::Error(ErrorValue::no_such_overload()),
    }
}

/// Result of equality against a value of another kind.
pub(crate) fn not_equal(other: &Value) -> Value {
    match other {
        Value::Error(_) | Value::Unknown(_) => other.clone(),
        _ => Value::Bool(false),
    }
}

impl From<Ordering> for Value {
    fn from(ordering: Ordering) -> Self {
        match ordering {
            Ordering::Less => Value::Int(-1),
            Ordering::Equal => Value::Int(0),
            Ordering::Greater => Value::Int(1),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Uint(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::string(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::string(value)
    }
}

impl From<Type> for Value {
    fn from(value: Type) -> Self {
        Value::Type(value)
    }
}

impl From<ErrorValue> for Value {
    fn from(value: ErrorValue) -> Self {
        Value::Error(value)
    }
}

impl From<MapValue> for Value {
    fn from(value: MapValue) -> Self {
        Value::Map(value)
    }
}

impl From<ListValue> for Value {
    fn from(value: ListValue) -> Self {
        Value::List(value)
    }
}

/// Canonical text rendering, also used by string conversion of aggregates.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Uint(value) => write!(f, "{value}u"),
            Value::Double(value) => write!(f, "{}", primitives::format_double(value.0)),
            Value::String(value) => write!(f, "{:?}", value.as_str()),
            Value::Bytes(value) => write!(f, "b{:?}", String::from_utf8_lossy(value.as_slice())),
            Value::List(list) => {
                f.write_str("[")?;
                for (index, item) in list.items().iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(map) => {
                f.write_str("{")?;
                for (index, (key, value)) in map.entries().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
            Value::Timestamp(value) => {
                write!(f, "timestamp({:?})", temporal::format_timestamp(value))
            }
            Value::Duration(value) => write!(f, "duration({:?})", format_duration(value)),
            Value::Type(value) => write!(f, "{value}"),
            Value::Error(value) => write!(f, "error({value})"),
            Value::Unknown(value) => write!(f, "{value}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_propagate_prefers_error_over_unknown() {
        let unknown = Value::unknown(1);
        let error = Value::error("boom");
        assert_eq!(Value::propagate([&unknown, &error]), Some(error.clone()));
        assert_eq!(
            Value::propagate([&unknown, &Value::unknown(2)]),
            Some(Value::Unknown(UnknownValue::new(1).merge(&UnknownValue::new(2))))
        );
        assert_eq!(Value::propagate([&Value::Int(1), &Value::Bool(true)]), None);
    }

    #[test]
    fn test_capabilities_by_kind() {
        assert!(Value::Bool(true).as_comparer().is_some());
        assert!(Value::Bool(true).as_sizer().is_none());
        assert!(Value::list([]).as_comparer().is_none());
        assert!(Value::list([]).as_sizer().is_some());
        assert!(Value::Map(MapValue::default()).as_mapper().is_some());
        assert!(Value::Uint(1).as_negater().is_none());
    }

    #[test]
    fn test_error_short_circuits() {
        let error = Value::error("boom");
        assert_eq!(Value::Int(1).compare(&error), error);
        assert_eq!(error.compare(&Value::Int(1)), error);
        assert_eq!(error.size(), error);
        assert_eq!(Value::list([Value::Int(1)]).get(&error), error);
        assert_eq!(error.convert_to_type(&Type::String), error);
    }

    #[test]
    fn test_unsupported_capability_is_error_value() {
        assert!(Value::Int(3).size().is_error());
        assert!(Value::Uint(3).negate().is_error());
        assert!(Value::list([]).compare(&Value::list([])).is_error());
    }

    #[test]
    fn test_display() {
        let list = Value::list([Value::Int(1), Value::string("a"), Value::Uint(2)]);
        assert_eq!(list.to_string(), "[1, \"a\", 2u]");
        assert_eq!(Value::double(1.0).to_string(), "1.0");
    }
}
