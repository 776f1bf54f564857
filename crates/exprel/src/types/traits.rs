//! Capability traits.
//!
//! Each value kind implements the subset of these traits that makes sense
//! for it. Consumers (the evaluator, the standard function table) ask a
//! value for a capability through `Value::as_comparer()` and friends and are
//! written against the trait, never against a concrete kind.
//!
//! Every operation returns a `Value`. Failures are `Value::Error`, and an
//! Error (or Unknown) operand is returned unchanged.

use super::{ConversionError, ErrorValue, NativeType, NativeValue, Type, Value};

/// Boxed, lazily evaluated element sequence. Calling `Iterable::iter` again
/// restarts from the first element.
pub type ValueIter<'a> = Box<dyn Iterator<Item = Value> + 'a>;

/// Ordering between two values of the same kind.
pub trait Comparer {
    /// Returns Int -1, 0 or 1, or an Error when `other` is of another kind.
    fn compare(&self, other: &Value) -> Value;
}

/// Total equality. Values of different kinds are never equal.
pub trait Equaler {
    /// Returns Bool; only Error and Unknown operands produce anything else.
    fn equal(&self, other: &Value) -> Value;
}

/// Logical or arithmetic inverse.
pub trait Negater {
    fn negate(&self) -> Value;
}

/// Conversion to other value types and to host-native shapes.
pub trait Converter {
    /// Identity, `type`, `string` and `dyn` targets are always supported;
    /// anything unsupported yields an Error value.
    fn convert_to_type(&self, target: &Type) -> Value;

    /// Project the value onto a native shape. Leaving the value domain means
    /// failure is reported as a `ConversionError` rather than an Error value,
    /// unless the caller asked for `NativeType::Value`.
    fn convert_to_native(&self, target: &NativeType) -> Result<NativeValue, ConversionError>;
}

/// Aggregates with a size.
pub trait Sizer {
    fn size(&self) -> Value;
}

/// Element access by index or key.
pub trait Indexer {
    /// Out-of-range indexes and missing keys are Error values.
    fn get(&self, index: &Value) -> Value;
}

pub trait Iterable {
    fn iter(&self) -> ValueIter<'_>;
}

/// Membership test, consistent with `Equaler`.
pub trait Container {
    fn contains(&self, value: &Value) -> Value;
}

/// Result of `Mapper::find`.
#[derive(Clone, Debug, PartialEq)]
pub enum Lookup {
    Found(Value),
    /// The key is a valid key but has no entry.
    Absent,
    /// The lookup itself failed, e.g. a key of a kind maps cannot hold.
    Failed(ErrorValue),
}

impl Lookup {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn found(self) -> Option<Value> {
        match self {
            Lookup::Found(value) => Some(value),
            _ => None,
        }
    }
}

/// Map capabilities.
pub trait Mapper: Container + Indexer + Iterable + Sizer {
    /// Like `Indexer::get`, but absence is reported structurally instead of
    /// as an Error value.
    fn find(&self, key: &Value) -> Lookup;
}
