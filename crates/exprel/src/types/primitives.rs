//! Null, Bool, Int, Uint, Double and Type capabilities.

use ordered_float::OrderedFloat;

use super::traits::{Comparer, Converter, Equaler, Negater};
use super::{
    ConversionError, ErrorValue, Kind, NativeType, NativeValue, Type, Value, no_such_overload,
    not_equal,
};

/// Payload of `Value::Null`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NullValue;

/// Doubles always render with a fractional part or exponent so they read back
/// as doubles.
pub(crate) fn format_double(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

fn conversion_error(from: Type, target: &Type) -> Value {
    Value::Error(ErrorValue::conversion(&from, target))
}

// =============================================================================
// Null
// =============================================================================

impl Equaler for NullValue {
    fn equal(&self, other: &Value) -> Value {
        match other {
            Value::Null => Value::Bool(true),
            _ => not_equal(other),
        }
    }
}

impl Converter for NullValue {
    fn convert_to_type(&self, target: &Type) -> Value {
        match target.kind() {
            Kind::Null | Kind::Dyn => Value::Null,
            Kind::String => Value::string("null"),
            Kind::Type => Value::Type(Type::Null),
            _ => conversion_error(Type::Null, target),
        }
    }

    fn convert_to_native(&self, target: &NativeType) -> Result<NativeValue, ConversionError> {
        match target {
            NativeType::Json => Ok(NativeValue::Json(serde_json::Value::Null)),
            NativeType::Value => Ok(NativeValue::Value(Value::Null)),
            _ => Err(ConversionError::new(Kind::Null, target)),
        }
    }
}

// =============================================================================
// Bool
// =============================================================================

impl Comparer for bool {
    fn compare(&self, other: &Value) -> Value {
        match other {
            Value::Bool(other) => Value::from(self.cmp(other)),
            _ => no_such_overload(other),
        }
    }
}

impl Equaler for bool {
    fn equal(&self, other: &Value) -> Value {
        match other {
            Value::Bool(other) => Value::Bool(self == other),
            _ => not_equal(other),
        }
    }
}

impl Negater for bool {
    fn negate(&self) -> Value {
        Value::Bool(!self)
    }
}

impl Converter for bool {
    fn convert_to_type(&self, target: &Type) -> Value {
        match target.kind() {
            Kind::Bool | Kind::Dyn => Value::Bool(*self),
            Kind::String => Value::string(if *self { "true" } else { "false" }),
            Kind::Type => Value::Type(Type::Bool),
            _ => conversion_error(Type::Bool, target),
        }
    }

    fn convert_to_native(&self, target: &NativeType) -> Result<NativeValue, ConversionError> {
        match target {
            NativeType::Bool => Ok(NativeValue::Bool(*self)),
            NativeType::Json => Ok(NativeValue::Json(serde_json::Value::Bool(*self))),
            NativeType::Value => Ok(NativeValue::Value(Value::Bool(*self))),
            _ => Err(ConversionError::new(Kind::Bool, target)),
        }
    }
}

// =============================================================================
// Int
// =============================================================================

impl Comparer for i64 {
    fn compare(&self, other: &Value) -> Value {
        match other {
            Value::Int(other) => Value::from(self.cmp(other)),
            _ => no_such_overload(other),
        }
    }
}

impl Equaler for i64 {
    fn equal(&self, other: &Value) -> Value {
        match other {
            Value::Int(other) => Value::Bool(self == other),
            _ => not_equal(other),
        }
    }
}

impl Negater for i64 {
    fn negate(&self) -> Value {
        match self.checked_neg() {
            Some(negated) => Value::Int(negated),
            None => Value::error("integer overflow"),
        }
    }
}

impl Converter for i64 {
    fn convert_to_type(&self, target: &Type) -> Value {
        match target.kind() {
            Kind::Int | Kind::Dyn => Value::Int(*self),
            Kind::Uint => match u64::try_from(*self) {
                Ok(value) => Value::Uint(value),
                Err(_) => Value::error("range error converting int to uint"),
            },
            Kind::Double => Value::double(*self as f64),
            Kind::String => Value::string(self.to_string()),
            Kind::Timestamp => match time::OffsetDateTime::from_unix_timestamp(*self) {
                Ok(timestamp) => Value::Timestamp(timestamp),
                Err(_) => Value::error("timestamp out of range"),
            },
            Kind::Type => Value::Type(Type::Int),
            _ => conversion_error(Type::Int, target),
        }
    }

    fn convert_to_native(&self, target: &NativeType) -> Result<NativeValue, ConversionError> {
        match target {
            NativeType::Int => Ok(NativeValue::Int(*self)),
            NativeType::Double => Ok(NativeValue::Double(*self as f64)),
            NativeType::Json => Ok(NativeValue::Json(serde_json::Value::from(*self))),
            NativeType::Value => Ok(NativeValue::Value(Value::Int(*self))),
            _ => Err(ConversionError::new(Kind::Int, target)),
        }
    }
}

// =============================================================================
// Uint
// =============================================================================

impl Comparer for u64 {
    fn compare(&self, other: &Value) -> Value {
        match other {
            Value::Uint(other) => Value::from(self.cmp(other)),
            _ => no_such_overload(other),
        }
    }
}

impl Equaler for u64 {
    fn equal(&self, other: &Value) -> Value {
        match other {
            Value::Uint(other) => Value::Bool(self == other),
            _ => not_equal(other),
        }
    }
}

impl Converter for u64 {
    fn convert_to_type(&self, target: &Type) -> Value {
        match target.kind() {
            Kind::Uint | Kind::Dyn => Value::Uint(*self),
            Kind::Int => match i64::try_from(*self) {
                Ok(value) => Value::Int(value),
                Err(_) => Value::error("range error converting uint to int"),
            },
            Kind::Double => Value::double(*self as f64),
            Kind::String => Value::string(self.to_string()),
            Kind::Type => Value::Type(Type::Uint),
            _ => conversion_error(Type::Uint, target),
        }
    }

    fn convert_to_native(&self, target: &NativeType) -> Result<NativeValue, ConversionError> {
        match target {
            NativeType::Uint => Ok(NativeValue::Uint(*self)),
            NativeType::Double => Ok(NativeValue::Double(*self as f64)),
            NativeType::Json => Ok(NativeValue::Json(serde_json::Value::from(*self))),
            NativeType::Value => Ok(NativeValue::Value(Value::Uint(*self))),
            _ => Err(ConversionError::new(Kind::Uint, target)),
        }
    }
}

// =============================================================================
// Double
// =============================================================================

impl Comparer for OrderedFloat<f64> {
    fn compare(&self, other: &Value) -> Value {
        match other {
            Value::Double(other) => Value::from(self.cmp(other)),
            _ => no_such_overload(other),
        }
    }
}

impl Equaler for OrderedFloat<f64> {
    fn equal(&self, other: &Value) -> Value {
        match other {
            Value::Double(other) => Value::Bool(self == other),
            _ => not_equal(other),
        }
    }
}

impl Negater for OrderedFloat<f64> {
    fn negate(&self) -> Value {
        Value::Double(-*self)
    }
}

impl Converter for OrderedFloat<f64> {
    fn convert_to_type(&self, target: &Type) -> Value {
        let value = self.0;
        match target.kind() {
            Kind::Double | Kind::Dyn => Value::Double(*self),
            // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
            Kind::Int
                if value.is_finite() && value >= i64::MIN as f64 && value < i64::MAX as f64 =>
            {
                Value::Int(value.trunc() as i64)
            }
            Kind::Uint if value.is_finite() && value > -1.0 && value < u64::MAX as f64 => {
                Value::Uint(value.trunc() as u64)
            }
            Kind::Int | Kind::Uint => {
                Value::error(format!("range error converting {value} to {target}"))
            }
            Kind::String => Value::string(format!("{value}")),
            Kind::Type => Value::Type(Type::Double),
            _ => conversion_error(Type::Double, target),
        }
    }

    fn convert_to_native(&self, target: &NativeType) -> Result<NativeValue, ConversionError> {
        match target {
            NativeType::Double => Ok(NativeValue::Double(self.0)),
            // JSON has no NaN or infinities.
            NativeType::Json => serde_json::Number::from_f64(self.0)
                .map(|number| NativeValue::Json(serde_json::Value::Number(number)))
                .ok_or_else(|| ConversionError::new(Kind::Double, target)),
            NativeType::Value => Ok(NativeValue::Value(Value::Double(*self))),
            _ => Err(ConversionError::new(Kind::Double, target)),
        }
    }
}

// =============================================================================
// Type
// =============================================================================

impl Equaler for Type {
    fn equal(&self, other: &Value) -> Value {
        match other {
            Value::Type(other) => Value::Bool(self == other),
            _ => not_equal(other),
        }
    }
}

impl Converter for Type {
    fn convert_to_type(&self, target: &Type) -> Value {
        match target.kind() {
            Kind::Type => Value::Type(Type::type_type()),
            Kind::Dyn => Value::Type(self.clone()),
            Kind::String => Value::string(self.to_string()),
            _ => conversion_error(Type::type_type(), target),
        }
    }

    fn convert_to_native(&self, target: &NativeType) -> Result<NativeValue, ConversionError> {
        match target {
            NativeType::String => Ok(NativeValue::String(self.to_string())),
            NativeType::Json => Ok(NativeValue::Json(serde_json::Value::String(self.to_string()))),
            NativeType::Value => Ok(NativeValue::Value(Value::Type(self.clone()))),
            _ => Err(ConversionError::new(Kind::Type, target)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRUE: Value = Value::Bool(true);
    const FALSE: Value = Value::Bool(false);

    #[test]
    fn test_bool_compare() {
        assert_eq!(FALSE.compare(&TRUE), Value::Int(-1));
        assert_eq!(TRUE.compare(&FALSE), Value::Int(1));
        assert_eq!(TRUE.compare(&TRUE), Value::Int(0));
        assert_eq!(FALSE.compare(&FALSE), Value::Int(0));
        assert_eq!(TRUE.compare(&Value::Uint(0)), Value::Error(ErrorValue::no_such_overload()));
    }

    #[test]
    fn test_bool_convert_to_native() {
        assert_eq!(TRUE.convert_to_native(&NativeType::Bool), Ok(NativeValue::Bool(true)));
        assert!(TRUE.convert_to_native(&NativeType::String).is_err());
        assert_eq!(
            TRUE.convert_to_native(&NativeType::Json),
            Ok(NativeValue::Json(serde_json::Value::Bool(true)))
        );
        assert_eq!(TRUE.convert_to_native(&NativeType::Value), Ok(NativeValue::Value(TRUE)));
    }

    #[test]
    fn test_bool_convert_to_type() {
        assert_eq!(TRUE.convert_to_type(&Type::String).equal(&Value::string("true")), TRUE);
        assert_eq!(TRUE.convert_to_type(&Type::Bool), TRUE);
        assert_eq!(TRUE.convert_to_type(&Type::type_type()), Value::Type(Type::Bool));
        assert!(TRUE.convert_to_type(&Type::Timestamp).is_error());
    }

    #[test]
    fn test_bool_equal() {
        assert_eq!(TRUE.equal(&TRUE), TRUE);
        assert_eq!(FALSE.equal(&TRUE), FALSE);
        assert_eq!(Value::double(0.0).equal(&FALSE), FALSE);
    }

    #[test]
    fn test_bool_negate() {
        assert_eq!(TRUE.negate(), FALSE);
        assert_eq!(FALSE.negate(), TRUE);
    }

    #[test]
    fn test_int_negate_overflow() {
        assert_eq!(Value::Int(5).negate(), Value::Int(-5));
        assert!(Value::Int(i64::MIN).negate().is_error());
    }

    #[test]
    fn test_numeric_conversions() {
        assert!(Value::Int(-1).convert_to_type(&Type::Uint).is_error());
        assert_eq!(Value::Uint(7).convert_to_type(&Type::Int), Value::Int(7));
        assert_eq!(Value::double(-2.7).convert_to_type(&Type::Int), Value::Int(-2));
        assert!(Value::double(f64::NAN).convert_to_type(&Type::Int).is_error());
        assert!(Value::double(1e19).convert_to_type(&Type::Int).is_error());
        assert_eq!(Value::Int(3).convert_to_type(&Type::String), Value::string("3"));
    }

    #[test]
    fn test_double_nan_is_totally_ordered() {
        let nan = Value::double(f64::NAN);
        assert_eq!(nan.compare(&nan), Value::Int(0));
        assert_eq!(nan.equal(&nan), TRUE);
        assert_eq!(Value::double(1.0).compare(&nan), Value::Int(-1));
    }

    #[test]
    fn test_type_conversions() {
        let int_type = Value::Type(Type::Int);
        assert_eq!(int_type.convert_to_type(&Type::String), Value::string("int"));
        assert_eq!(int_type.convert_to_type(&Type::type_type()), Value::Type(Type::type_type()));
        assert_eq!(int_type.equal(&Value::Type(Type::Int)), TRUE);
    }
}
