//! Error and Unknown values.

use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

use super::traits::{Converter, Equaler};
use super::{ConversionError, Kind, NativeType, NativeValue, Type, Value};

/// A failed operation, carried through evaluation as a value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ErrorValue {
    message: Arc<str>,
}

impl ErrorValue {
    pub fn new(message: impl Into<Arc<str>>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn no_such_overload() -> Self {
        Self::new("no such overload")
    }

    pub fn no_such_key(key: &Value) -> Self {
        Self::new(format!("no such key: {key}"))
    }

    pub fn conversion(from: &Type, to: &Type) -> Self {
        Self::new(format!("type conversion error from '{from}' to '{to}'"))
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ErrorValue {}

/// A value that could not be computed because some input was not available.
///
/// Carries the ids of the expression nodes responsible.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct UnknownValue {
    ids: SmallVec<[i64; 2]>,
}

impl UnknownValue {
    pub fn new(id: i64) -> Self {
        Self {
            ids: SmallVec::from_slice(&[id]),
        }
    }

    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    /// Union of both id sets, sorted.
    pub fn merge(&self, other: &UnknownValue) -> UnknownValue {
        let mut ids = self.ids.clone();
        ids.extend_from_slice(&other.ids);
        ids.sort_unstable();
        ids.dedup();
        UnknownValue { ids }
    }
}

impl fmt::Display for UnknownValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown{:?}", self.ids.as_slice())
    }
}

// Errors and unknowns absorb every operation they take part in.

impl Equaler for ErrorValue {
    fn equal(&self, _other: &Value) -> Value {
        Value::Error(self.clone())
    }
}

impl Converter for ErrorValue {
    fn convert_to_type(&self, _target: &Type) -> Value {
        Value::Error(self.clone())
    }

    fn convert_to_native(&self, target: &NativeType) -> Result<NativeValue, ConversionError> {
        match target {
            NativeType::Value => Ok(NativeValue::Value(Value::Error(self.clone()))),
            _ => Err(ConversionError::new(Kind::Error, target)),
        }
    }
}

impl Equaler for UnknownValue {
    fn equal(&self, other: &Value) -> Value {
        match other {
            Value::Error(_) => other.clone(),
            Value::Unknown(unknown) => Value::Unknown(self.merge(unknown)),
            _ => Value::Unknown(self.clone()),
        }
    }
}

impl Converter for UnknownValue {
    fn convert_to_type(&self, _target: &Type) -> Value {
        Value::Unknown(self.clone())
    }

    fn convert_to_native(&self, target: &NativeType) -> Result<NativeValue, ConversionError> {
        match target {
            NativeType::Value => Ok(NativeValue::Value(Value::Unknown(self.clone()))),
            _ => Err(ConversionError::new(Kind::Unknown, target)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_merge_is_sorted_union() {
        let a = UnknownValue::new(3).merge(&UnknownValue::new(1));
        let b = a.merge(&UnknownValue::new(3));
        assert_eq!(b.ids(), &[1, 3]);
    }

    #[test]
    fn test_error_absorbs_equality() {
        let error = ErrorValue::new("boom");
        assert_eq!(error.equal(&Value::Bool(true)), Value::Error(error.clone()));
    }
}
