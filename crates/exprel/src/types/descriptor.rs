//! Type descriptors.
//!
//! A `Type` is both the static type the checker infers for an expression
//! and the runtime type a `Value` reports. Types are values too (`Value::Type`),
//! so `type(1) == int` compares two descriptors structurally.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Tag identifying which kind of datum a value or type describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Kind {
    Dyn,
    Null,
    Bool,
    Int,
    Uint,
    Double,
    String,
    Bytes,
    List,
    Map,
    Timestamp,
    Duration,
    Type,
    Error,
    Unknown,
    TypeParam,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Dyn => "dyn",
            Kind::Null => "null_type",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Uint => "uint",
            Kind::Double => "double",
            Kind::String => "string",
            Kind::Bytes => "bytes",
            Kind::List => "list",
            Kind::Map => "map",
            Kind::Timestamp => "google.protobuf.Timestamp",
            Kind::Duration => "google.protobuf.Duration",
            Kind::Type => "type",
            Kind::Error => "*error*",
            Kind::Unknown => "*unknown*",
            Kind::TypeParam => "type_param",
        };
        f.write_str(name)
    }
}

/// Structural type descriptor.
///
/// Parametric kinds carry their parameters; two descriptors are equal iff
/// kind and parameters match.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Type {
    Dyn,
    Null,
    Bool,
    Int,
    Uint,
    Double,
    String,
    Bytes,
    List(Arc<Type>),
    Map(Arc<Type>, Arc<Type>),
    Timestamp,
    Duration,
    /// The type of types. `Type(Some(int))` is the static type of the
    /// identifier `int`; runtime type values report `Type(None)`.
    Type(Option<Arc<Type>>),
    Error,
    Unknown,
    /// Placeholder bound during overload resolution, e.g. the `A` in
    /// `size(list(A)) -> int`.
    TypeParam(Arc<str>),
}

impl Type {
    pub fn list(elem: Type) -> Self {
        Type::List(Arc::new(elem))
    }

    pub fn map(key: Type, value: Type) -> Self {
        Type::Map(Arc::new(key), Arc::new(value))
    }

    pub fn type_of(ty: Type) -> Self {
        Type::Type(Some(Arc::new(ty)))
    }

    /// The universal type of types, used as a conversion target.
    pub fn type_type() -> Self {
        Type::Type(None)
    }

    pub fn param(name: impl Into<Arc<str>>) -> Self {
        Type::TypeParam(name.into())
    }

    pub fn kind(&self) -> Kind {
        match self {
            Type::Dyn => Kind::Dyn,
            Type::Null => Kind::Null,
            Type::Bool => Kind::Bool,
            Type::Int => Kind::Int,
            Type::Uint => Kind::Uint,
            Type::Double => Kind::Double,
            Type::String => Kind::String,
            Type::Bytes => Kind::Bytes,
            Type::List(_) => Kind::List,
            Type::Map(..) => Kind::Map,
            Type::Timestamp => Kind::Timestamp,
            Type::Duration => Kind::Duration,
            Type::Type(_) => Kind::Type,
            Type::Error => Kind::Error,
            Type::Unknown => Kind::Unknown,
            Type::TypeParam(_) => Kind::TypeParam,
        }
    }

    pub fn is_dyn(&self) -> bool {
        matches!(self, Type::Dyn)
    }

    /// Whether values of this type may be used as map keys.
    pub fn is_valid_map_key(&self) -> bool {
        matches!(
            self,
            Type::Bool | Type::Int | Type::Uint | Type::String | Type::Dyn | Type::TypeParam(_)
        )
    }

    /// Element type of a list, or `dyn` for anything else.
    pub fn elem_type(&self) -> Type {
        match self {
            Type::List(elem) => (**elem).clone(),
            _ => Type::Dyn,
        }
    }

    /// Replace type parameters using `lookup`; unbound parameters become `dyn`.
    pub fn substitute(&self, lookup: &impl Fn(&str) -> Option<Type>) -> Type {
        match self {
            Type::TypeParam(name) => lookup(name)
                .map(|bound| bound.substitute(lookup))
                .unwrap_or(Type::Dyn),
            Type::List(elem) => Type::list(elem.substitute(lookup)),
            Type::Map(key, value) => Type::map(key.substitute(lookup), value.substitute(lookup)),
            Type::Type(Some(param)) => Type::type_of(param.substitute(lookup)),
            other => other.clone(),
        }
    }

    /// Whether the type mentions a type parameter anywhere.
    pub fn has_params(&self) -> bool {
        match self {
            Type::TypeParam(_) => true,
            Type::List(elem) => elem.has_params(),
            Type::Map(key, value) => key.has_params() || value.has_params(),
            Type::Type(Some(param)) => param.has_params(),
            _ => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::List(elem) => write!(f, "list({elem})"),
            Type::Map(key, value) => write!(f, "map({key}, {value})"),
            Type::Type(Some(param)) => write!(f, "type({param})"),
            Type::TypeParam(name) => write!(f, "{name}"),
            other => write!(f, "{}", other.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality() {
        assert_eq!(Type::list(Type::Int), Type::list(Type::Int));
        assert_ne!(Type::list(Type::Int), Type::list(Type::String));
        assert_ne!(Type::map(Type::String, Type::Int), Type::map(Type::String, Type::Dyn));
        assert_ne!(Type::type_type(), Type::type_of(Type::Int));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Type::map(Type::String, Type::list(Type::Dyn)).to_string(),
            "map(string, list(dyn))"
        );
        assert_eq!(Type::type_of(Type::Int).to_string(), "type(int)");
        assert_eq!(Type::Timestamp.to_string(), "google.protobuf.Timestamp");
    }

    #[test]
    fn test_substitute_unbound_becomes_dyn() {
        let ty = Type::map(Type::param("K"), Type::param("V"));
        let bound = ty.substitute(&|name| (name == "K").then_some(Type::String));
        assert_eq!(bound, Type::map(Type::String, Type::Dyn));
    }
}
