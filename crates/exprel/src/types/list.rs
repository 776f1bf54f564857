//! List values.

use std::sync::Arc;

use super::traits::{Container, Converter, Equaler, Indexer, Iterable, Sizer, ValueIter};
use super::{
    ConversionError, ErrorValue, Kind, NativeType, NativeValue, Type, Value, not_equal,
};

/// Immutable, cheaply clonable sequence of values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListValue(Arc<Vec<Value>>);

impl ListValue {
    pub fn new(items: impl IntoIterator<Item = Value>) -> Self {
        Self(Arc::new(items.into_iter().collect()))
    }

    pub fn items(&self) -> &[Value] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// New list holding the elements of `self` followed by those of `other`.
    pub fn concat(&self, other: &ListValue) -> ListValue {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        ListValue::new(self.0.iter().chain(other.0.iter()).cloned())
    }
}

impl Sizer for ListValue {
    fn size(&self) -> Value {
        Value::Int(self.0.len() as i64)
    }
}

impl Indexer for ListValue {
    fn get(&self, index: &Value) -> Value {
        let position = match index {
            Value::Int(index) => usize::try_from(*index).ok(),
            Value::Uint(index) => usize::try_from(*index).ok(),
            Value::Double(index) if index.0.fract() == 0.0 && index.0 >= 0.0 => {
                Some(index.0 as usize)
            }
            Value::Error(_) | Value::Unknown(_) => return index.clone(),
            _ => return Value::Error(ErrorValue::no_such_overload()),
        };
        match position.and_then(|position| self.0.get(position)) {
            Some(item) => item.clone(),
            None => Value::error(format!("index out of range: {index}")),
        }
    }
}

impl Iterable for ListValue {
    fn iter(&self) -> ValueIter<'_> {
        Box::new(self.0.iter().cloned())
    }
}

impl Container for ListValue {
    fn contains(&self, value: &Value) -> Value {
        let mut pending: Option<Value> = None;
        for item in self.0.iter() {
            match item.equal(value) {
                Value::Bool(true) => return Value::Bool(true),
                Value::Bool(false) => {}
                other => {
                    pending.get_or_insert(other);
                }
            }
        }
        pending.unwrap_or(Value::Bool(false))
    }
}

impl Equaler for ListValue {
    fn equal(&self, other: &Value) -> Value {
        let Value::List(other) = other else {
            return not_equal(other);
        };
        if self.len() != other.len() {
            return Value::Bool(false);
        }
        // A definite mismatch wins over an error in another position.
        let mut pending: Option<Value> = None;
        for (left, right) in self.0.iter().zip(other.0.iter()) {
            match left.equal(right) {
                Value::Bool(true) => {}
                Value::Bool(false) => return Value::Bool(false),
                other => {
                    pending.get_or_insert(other);
                }
            }
        }
        pending.unwrap_or(Value::Bool(true))
    }
}

impl Converter for ListValue {
    fn convert_to_type(&self, target: &Type) -> Value {
        match target.kind() {
            Kind::List | Kind::Dyn => Value::List(self.clone()),
            Kind::String => Value::string(Value::List(self.clone()).to_string()),
            Kind::Type => Value::Type(Type::list(Type::Dyn)),
            _ => Value::Error(ErrorValue::conversion(&Type::list(Type::Dyn), target)),
        }
    }

    fn convert_to_native(&self, target: &NativeType) -> Result<NativeValue, ConversionError> {
        match target {
            NativeType::List(elem) => self
                .0
                .iter()
                .map(|item| item.convert_to_native(elem))
                .collect::<Result<Vec<_>, _>>()
                .map(NativeValue::List),
            NativeType::Json => self
                .0
                .iter()
                .map(|item| match item.convert_to_native(&NativeType::Json)? {
                    NativeValue::Json(json) => Ok(json),
                    _ => Err(ConversionError::new(item.kind(), &NativeType::Json)),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(|items| NativeValue::Json(serde_json::Value::Array(items))),
            NativeType::Value => Ok(NativeValue::Value(Value::List(self.clone()))),
            _ => Err(ConversionError::new(Kind::List, target)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Value {
        Value::list([Value::Int(1), Value::string("two"), Value::double(3.0)])
    }

    #[test]
    fn test_get_by_index() {
        let list = sample();
        assert_eq!(list.get(&Value::Int(1)), Value::string("two"));
        assert_eq!(list.get(&Value::Uint(0)), Value::Int(1));
        assert!(list.get(&Value::Int(3)).is_error());
        assert!(list.get(&Value::Int(-1)).is_error());
        assert!(list.get(&Value::string("0")).is_error());
    }

    #[test]
    fn test_iter_restarts() {
        let Value::List(list) = sample() else {
            unreachable!()
        };
        assert_eq!(list.iter().count(), 3);
        assert_eq!(list.iter().next(), Some(Value::Int(1)));
    }

    #[test]
    fn test_contains_uses_equality() {
        let list = sample();
        assert_eq!(list.contains(&Value::string("two")), Value::Bool(true));
        assert_eq!(list.contains(&Value::Uint(1)), Value::Bool(false));
    }

    #[test]
    fn test_equal_elementwise() {
        assert_eq!(sample().equal(&sample()), Value::Bool(true));
        let shorter = Value::list([Value::Int(1)]);
        assert_eq!(sample().equal(&shorter), Value::Bool(false));
        assert_eq!(sample().equal(&Value::Int(1)), Value::Bool(false));
    }

    #[test]
    fn test_convert_to_native_list() {
        let list = Value::list([Value::Int(1), Value::Int(2)]);
        assert_eq!(
            list.convert_to_native(&NativeType::List(Box::new(NativeType::Int))),
            Ok(NativeValue::List(vec![NativeValue::Int(1), NativeValue::Int(2)]))
        );
        assert!(sample()
            .convert_to_native(&NativeType::List(Box::new(NativeType::Int)))
            .is_err());
    }
}
