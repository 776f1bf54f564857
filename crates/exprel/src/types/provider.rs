//! Type registry and host value adaptation.

use indexmap::IndexMap;
use std::fmt;
use thiserror::Error;

use super::{NativeValue, Type, Value};

/// Resolves type names for the checker and the evaluator.
pub trait TypeProvider: fmt::Debug + Send + Sync {
    /// Type denoted by `name`, e.g. `int` or `google.protobuf.Timestamp`.
    fn find_type(&self, name: &str) -> Option<Type>;

    /// Value of an identifier that names a type, e.g. `int` evaluates to the
    /// type descriptor `int`.
    fn find_ident(&self, name: &str) -> Option<Value> {
        self.find_type(name).map(Value::Type)
    }
}

/// Converts host-native data into values.
pub trait TypeAdapter: fmt::Debug + Send + Sync {
    fn native_to_value(&self, native: NativeValue) -> Value;

    fn json_to_value(&self, json: serde_json::Value) -> Value {
        self.native_to_value(NativeValue::Json(json))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("type '{name}' is already registered as '{existing}'")]
    Conflict { name: String, existing: Type },
}

/// Default provider and adapter: the builtin type names plus whatever the
/// embedder registers.
#[derive(Debug, Clone)]
pub struct Registry {
    types: IndexMap<String, Type>,
}

impl Default for Registry {
    fn default() -> Self {
        let builtins = [
            Type::Bool,
            Type::Int,
            Type::Uint,
            Type::Double,
            Type::String,
            Type::Bytes,
            Type::Null,
            Type::type_type(),
            Type::Timestamp,
            Type::Duration,
        ];
        let mut types: IndexMap<String, Type> = builtins
            .into_iter()
            .map(|ty| (ty.kind().to_string(), ty))
            .collect();
        types.insert("list".to_string(), Type::list(Type::Dyn));
        types.insert("map".to_string(), Type::map(Type::Dyn, Type::Dyn));
        Self { types }
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `ty` under `name`. Registering the same pair twice is a no-op.
    pub fn register(&mut self, name: impl Into<String>, ty: Type) -> Result<(), RegistryError> {
        let name = name.into();
        match self.types.get(&name) {
            Some(existing) if *existing != ty => Err(RegistryError::Conflict {
                name,
                existing: existing.clone(),
            }),
            Some(_) => Ok(()),
            None => {
                self.types.insert(name, ty);
                Ok(())
            }
        }
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.types.keys().map(String::as_str)
    }
}

impl TypeProvider for Registry {
    fn find_type(&self, name: &str) -> Option<Type> {
        self.types.get(name).cloned()
    }
}

impl TypeAdapter for Registry {
    fn native_to_value(&self, native: NativeValue) -> Value {
        Value::from(native)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names() {
        let registry = Registry::new();
        assert_eq!(registry.find_type("int"), Some(Type::Int));
        assert_eq!(registry.find_type("null_type"), Some(Type::Null));
        assert_eq!(
            registry.find_type("google.protobuf.Timestamp"),
            Some(Type::Timestamp)
        );
        assert_eq!(registry.find_type("list"), Some(Type::list(Type::Dyn)));
        assert_eq!(registry.find_type("type"), Some(Type::type_type()));
        assert_eq!(registry.find_type("widget"), None);
        assert_eq!(registry.find_ident("int"), Some(Value::Type(Type::Int)));
    }

    #[test]
    fn test_register_conflict() {
        let mut registry = Registry::new();
        assert!(registry.register("ids", Type::list(Type::Int)).is_ok());
        assert!(registry.register("ids", Type::list(Type::Int)).is_ok());
        assert!(matches!(
            registry.register("int", Type::Uint),
            Err(RegistryError::Conflict { .. })
        ));
    }

    #[test]
    fn test_adapter_converts_json() {
        let value = Registry::new().json_to_value(serde_json::json!([1, "a"]));
        assert_eq!(value, Value::list([Value::Int(1), Value::string("a")]));
    }
}
