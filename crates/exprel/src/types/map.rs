//! Map values.

use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

use super::traits::{
    Container, Converter, Equaler, Indexer, Iterable, Lookup, Mapper, Sizer, ValueIter,
};
use super::{
    ConversionError, ErrorValue, Kind, NativeType, NativeValue, StringValue, Type, Value,
    not_equal,
};

/// The subset of values usable as map keys.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MapKey {
    Bool(bool),
    Int(i64),
    Uint(u64),
    String(StringValue),
}

impl MapKey {
    pub fn to_value(&self) -> Value {
        match self {
            MapKey::Bool(value) => Value::Bool(*value),
            MapKey::Int(value) => Value::Int(*value),
            MapKey::Uint(value) => Value::Uint(*value),
            MapKey::String(value) => Value::String(value.clone()),
        }
    }

    /// Key text used when leaving the value domain, where keys are strings.
    fn native_name(&self) -> String {
        match self {
            MapKey::String(value) => value.as_str().to_string(),
            MapKey::Bool(value) => value.to_string(),
            MapKey::Int(value) => value.to_string(),
            MapKey::Uint(value) => value.to_string(),
        }
    }
}

impl TryFrom<&Value> for MapKey {
    type Error = ErrorValue;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Bool(value) => Ok(MapKey::Bool(*value)),
            Value::Int(value) => Ok(MapKey::Int(*value)),
            Value::Uint(value) => Ok(MapKey::Uint(*value)),
            Value::String(value) => Ok(MapKey::String(value.clone())),
            Value::Error(error) => Err(error.clone()),
            other => Err(ErrorValue::new(format!(
                "unsupported key type: {}",
                other.type_of()
            ))),
        }
    }
}

impl From<&str> for MapKey {
    fn from(value: &str) -> Self {
        MapKey::String(StringValue::new(value))
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

/// Immutable map with insertion-ordered iteration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapValue(Arc<IndexMap<MapKey, Value>>);

impl MapValue {
    /// Build a map from key/value pairs. Keys must be of a valid key kind and
    /// distinct.
    pub fn new(entries: impl IntoIterator<Item = (Value, Value)>) -> Result<Self, ErrorValue> {
        let mut map = IndexMap::new();
        for (key, value) in entries {
            let key = MapKey::try_from(&key)?;
            if map.contains_key(&key) {
                return Err(ErrorValue::new(format!("repeated map key: {key}")));
            }
            map.insert(key, value);
        }
        Ok(Self(Arc::new(map)))
    }

    pub fn from_entries(entries: IndexMap<MapKey, Value>) -> Self {
        Self(Arc::new(entries))
    }

    pub fn entries(&self) -> impl Iterator<Item = (&MapKey, &Value)> + '_ {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entry for a string key, without going through `Value`.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.0.get(&MapKey::from(name))
    }
}

impl Sizer for MapValue {
    fn size(&self) -> Value {
        Value::Int(self.0.len() as i64)
    }
}

impl Indexer for MapValue {
    fn get(&self, index: &Value) -> Value {
        match self.find(index) {
            Lookup::Found(value) => value,
            Lookup::Absent => Value::Error(ErrorValue::no_such_key(index)),
            Lookup::Failed(error) => Value::Error(error),
        }
    }
}

impl Iterable for MapValue {
    /// Iterates the keys.
    fn iter(&self) -> ValueIter<'_> {
        Box::new(self.0.keys().map(MapKey::to_value))
    }
}

impl Container for MapValue {
    fn contains(&self, value: &Value) -> Value {
        match self.find(value) {
            Lookup::Found(_) => Value::Bool(true),
            // Keys of another kind cannot be present.
            Lookup::Absent | Lookup::Failed(_) => Value::Bool(false),
        }
    }
}

impl Mapper for MapValue {
    fn find(&self, key: &Value) -> Lookup {
        match MapKey::try_from(key) {
            Ok(key) => match self.0.get(&key) {
                Some(value) => Lookup::Found(value.clone()),
                None => Lookup::Absent,
            },
            Err(error) => Lookup::Failed(error),
        }
    }
}

impl Equaler for MapValue {
    fn equal(&self, other: &Value) -> Value {
        let Value::Map(other) = other else {
            return not_equal(other);
        };
        if self.len() != other.len() {
            return Value::Bool(false);
        }
        let mut pending: Option<Value> = None;
        for (key, value) in self.0.iter() {
            let Some(other_value) = other.0.get(key) else {
                return Value::Bool(false);
            };
            match value.equal(other_value) {
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

impl Converter for MapValue {
    fn convert_to_type(&self, target: &Type) -> Value {
        match target.kind() {
            Kind::Map | Kind::Dyn => Value::Map(self.clone()),
            Kind::String => Value::string(Value::Map(self.clone()).to_string()),
            Kind::Type => Value::Type(Type::map(Type::Dyn, Type::Dyn)),
            _ => Value::Error(ErrorValue::conversion(
                &Type::map(Type::Dyn, Type::Dyn),
                target,
            )),
        }
    }

    fn convert_to_native(&self, target: &NativeType) -> Result<NativeValue, ConversionError> {
        match target {
            NativeType::Map(value_type) => self
                .0
                .iter()
                .map(|(key, value)| Ok((key.native_name(), value.convert_to_native(value_type)?)))
                .collect::<Result<IndexMap<_, _>, ConversionError>>()
                .map(NativeValue::Map),
            NativeType::Json => self
                .0
                .iter()
                .map(|(key, value)| match value.convert_to_native(&NativeType::Json)? {
                    NativeValue::Json(json) => Ok((key.native_name(), json)),
                    _ => Err(ConversionError::new(value.kind(), &NativeType::Json)),
                })
                .collect::<Result<serde_json::Map<_, _>, ConversionError>>()
                .map(|object| NativeValue::Json(serde_json::Value::Object(object))),
            NativeType::Value => Ok(NativeValue::Value(Value::Map(self.clone()))),
            _ => Err(ConversionError::new(Kind::Map, target)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MapValue {
        MapValue::new([
            (Value::string("a"), Value::Int(1)),
            (Value::Int(2), Value::string("two")),
        ])
        .unwrap()
    }

    #[test]
    fn test_find_distinguishes_absent_from_failed() {
        let map = sample();
        assert_eq!(map.find(&Value::string("a")), Lookup::Found(Value::Int(1)));
        assert_eq!(map.find(&Value::string("b")), Lookup::Absent);
        assert!(matches!(map.find(&Value::double(1.0)), Lookup::Failed(_)));
    }

    #[test]
    fn test_get_missing_key_is_error() {
        let map = Value::Map(sample());
        assert_eq!(map.get(&Value::Int(2)), Value::string("two"));
        let missing = map.get(&Value::string("zzz"));
        assert_eq!(missing, Value::error("no such key: \"zzz\""));
    }

    #[test]
    fn test_repeated_key_rejected() {
        let result = MapValue::new([
            (Value::string("a"), Value::Int(1)),
            (Value::string("a"), Value::Int(2)),
        ]);
        assert!(result.is_err());
        assert!(MapValue::new([(Value::list([]), Value::Null)]).is_err());
    }

    #[test]
    fn test_iterates_keys_in_insertion_order() {
        let keys: Vec<Value> = sample().iter().collect();
        assert_eq!(keys, vec![Value::string("a"), Value::Int(2)]);
    }

    #[test]
    fn test_equal_ignores_order() {
        let reversed = MapValue::new([
            (Value::Int(2), Value::string("two")),
            (Value::string("a"), Value::Int(1)),
        ])
        .unwrap();
        assert_eq!(sample().equal(&Value::Map(reversed)), Value::Bool(true));
    }

    #[test]
    fn test_convert_to_json() {
        let json = sample().convert_to_native(&NativeType::Json).unwrap();
        assert_eq!(
            json,
            NativeValue::Json(serde_json::json!({"a": 1, "2": "two"}))
        );
    }
}
