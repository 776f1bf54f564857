//! The standard function table.
//!
//! Implementations are written against the capability traits, so one entry
//! covers every overload of an operator. Each entry is also registered under
//! the overload ids the standard declarations use.

use time::{Duration, OffsetDateTime, UtcOffset};

use crate::program::Function;
use crate::types::{ErrorValue, Type, Value};

fn no_such_overload() -> Value {
    Value::Error(ErrorValue::no_such_overload())
}

fn overflow() -> Value {
    Value::error("integer overflow")
}

fn unary(name: &str, ids: &[&str], f: fn(&Value) -> Value) -> Function {
    Function::new(name, move |args| match args {
        [value] => f(value),
        _ => no_such_overload(),
    })
    .overloads(ids.iter().copied())
}

fn binary(name: &str, ids: &[&str], f: fn(&Value, &Value) -> Value) -> Function {
    Function::new(name, move |args| match args {
        [left, right] => f(left, right),
        _ => no_such_overload(),
    })
    .overloads(ids.iter().copied())
}

fn add(left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_add(*b)
            .map(Value::Int)
            .unwrap_or_else(overflow),
        (Value::Uint(a), Value::Uint(b)) => a
            .checked_add(*b)
            .map(Value::Uint)
            .unwrap_or_else(overflow),
        (Value::Double(a), Value::Double(b)) => Value::double(a.0 + b.0),
        (Value::String(a), Value::String(b)) => {
            Value::string(format!("{}{}", a.as_str(), b.as_str()))
        }
        (Value::Bytes(a), Value::Bytes(b)) => Value::bytes([a.as_slice(), b.as_slice()].concat()),
        (Value::List(a), Value::List(b)) => Value::List(a.concat(b)),
        (Value::Timestamp(t), Value::Duration(d)) | (Value::Duration(d), Value::Timestamp(t)) => t
            .checked_add(*d)
            .map(Value::Timestamp)
            .unwrap_or_else(|| Value::error("timestamp overflow")),
        (Value::Duration(a), Value::Duration(b)) => a
            .checked_add(*b)
            .map(Value::Duration)
            .unwrap_or_else(|| Value::error("duration overflow")),
        _ => no_such_overload(),
    }
}

fn subtract(left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_sub(*b)
            .map(Value::Int)
            .unwrap_or_else(overflow),
        (Value::Uint(a), Value::Uint(b)) => a
            .checked_sub(*b)
            .map(Value::Uint)
            .unwrap_or_else(overflow),
        (Value::Double(a), Value::Double(b)) => Value::double(a.0 - b.0),
        (Value::Timestamp(a), Value::Timestamp(b)) => Value::Duration(*a - *b),
        (Value::Timestamp(t), Value::Duration(d)) => t
            .checked_sub(*d)
            .map(Value::Timestamp)
            .unwrap_or_else(|| Value::error("timestamp overflow")),
        (Value::Duration(a), Value::Duration(b)) => a
            .checked_sub(*b)
            .map(Value::Duration)
            .unwrap_or_else(|| Value::error("duration overflow")),
        _ => no_such_overload(),
    }
}

fn multiply(left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_mul(*b)
            .map(Value::Int)
            .unwrap_or_else(overflow),
        (Value::Uint(a), Value::Uint(b)) => a
            .checked_mul(*b)
            .map(Value::Uint)
            .unwrap_or_else(overflow),
        (Value::Double(a), Value::Double(b)) => Value::double(a.0 * b.0),
        _ => no_such_overload(),
    }
}

fn divide(left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Int(_), Value::Int(0)) | (Value::Uint(_), Value::Uint(0)) => {
            Value::error("division by zero")
        }
        (Value::Int(a), Value::Int(b)) => a
            .checked_div(*b)
            .map(Value::Int)
            .unwrap_or_else(overflow),
        (Value::Uint(a), Value::Uint(b)) => Value::Uint(a / b),
        (Value::Double(a), Value::Double(b)) => Value::double(a.0 / b.0),
        _ => no_such_overload(),
    }
}

fn modulo(left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Int(_), Value::Int(0)) | (Value::Uint(_), Value::Uint(0)) => {
            Value::error("modulus by zero")
        }
        (Value::Int(a), Value::Int(b)) => a
            .checked_rem(*b)
            .map(Value::Int)
            .unwrap_or_else(overflow),
        (Value::Uint(a), Value::Uint(b)) => Value::Uint(a % b),
        _ => no_such_overload(),
    }
}

/// Apply `test` to the result of `compare`.
fn ordering(left: &Value, right: &Value, test: fn(i64) -> bool) -> Value {
    match left.compare(right) {
        Value::Int(order) => Value::Bool(test(order)),
        other => other,
    }
}

fn comparison(name: &str, prefix: &str, test: fn(i64) -> bool) -> Function {
    let ids: Vec<String> = [
        "bool", "int", "uint", "double", "string", "bytes", "timestamp", "duration",
    ]
    .iter()
    .map(|kind| format!("{prefix}_{kind}"))
    .collect();
    Function::new(name, move |args| match args {
        [left, right] => ordering(left, right, test),
        _ => no_such_overload(),
    })
    .overloads(ids)
}

fn conversion(name: &str, target: Type, sources: &[&str]) -> Function {
    let ids: Vec<String> = sources
        .iter()
        .map(|source| format!("{source}_to_{name}"))
        .collect();
    Function::new(name, move |args| match args {
        [value] => value.convert_to_type(&target),
        _ => no_such_overload(),
    })
    .overloads(ids)
}

fn strings(left: &Value, right: &Value, test: fn(&str, &str) -> bool) -> Value {
    match (left.as_str(), right.as_str()) {
        (Some(left), Some(right)) => Value::Bool(test(left, right)),
        _ => no_such_overload(),
    }
}

fn utc(timestamp: &OffsetDateTime) -> OffsetDateTime {
    timestamp.to_offset(UtcOffset::UTC)
}

fn timestamp_getter(
    name: &str,
    timestamp_id: &str,
    get: fn(&OffsetDateTime) -> i64,
    duration: Option<(&str, fn(&Duration) -> Option<i64>)>,
) -> Function {
    let duration_get = duration.map(|(_, get)| get);
    let mut ids = vec![timestamp_id.to_string()];
    ids.extend(duration.map(|(id, _)| id.to_string()));
    Function::new(name, move |args| match (args, duration_get) {
        ([Value::Timestamp(timestamp)], _) => Value::Int(get(&utc(timestamp))),
        ([Value::Duration(duration)], Some(get)) => get(duration).map_or_else(overflow, Value::Int),
        _ => no_such_overload(),
    })
    .overloads(ids)
}

fn whole_milliseconds(duration: &Duration) -> Option<i64> {
    i64::try_from(duration.whole_milliseconds()).ok()
}

/// Implementations of every function in the standard declarations.
pub fn standard_overloads() -> Vec<Function> {
    vec![
        unary("!_", &["logical_not"], |value| match value {
            Value::Bool(value) => Value::Bool(!value),
            _ => no_such_overload(),
        }),
        unary(
            "-_",
            &["negate_int", "negate_double", "negate_duration"],
            |value| match value {
                Value::Bool(_) => no_such_overload(),
                other => other.negate(),
            },
        ),
        // Errors and unknowns are "not strictly false" and keep a loop going.
        unary("@not_strictly_false", &["not_strictly_false"], |value| {
            Value::Bool(*value != Value::Bool(false))
        })
        .non_strict(),
        binary("_==_", &["equals"], |left, right| left.equal(right)),
        binary("_!=_", &["not_equals"], |left, right| match left.equal(right) {
            Value::Bool(equal) => Value::Bool(!equal),
            other => other,
        }),
        comparison("_<_", "less", |order| order < 0),
        comparison("_<=_", "less_equals", |order| order <= 0),
        comparison("_>_", "greater", |order| order > 0),
        comparison("_>=_", "greater_equals", |order| order >= 0),
        binary(
            "_+_",
            &[
                "add_int",
                "add_uint",
                "add_double",
                "add_string",
                "add_bytes",
                "add_list",
                "add_timestamp_duration",
                "add_duration_timestamp",
                "add_duration_duration",
            ],
            add,
        ),
        binary(
            "_-_",
            &[
                "subtract_int",
                "subtract_uint",
                "subtract_double",
                "subtract_timestamp_timestamp",
                "subtract_timestamp_duration",
                "subtract_duration_duration",
            ],
            subtract,
        ),
        binary(
            "_*_",
            &["multiply_int", "multiply_uint", "multiply_double"],
            multiply,
        ),
        binary("_/_", &["divide_int", "divide_uint", "divide_double"], divide),
        binary("_%_", &["modulo_int", "modulo_uint"], modulo),
        binary(
            "_[_]",
            &["index_list", "index_list_uint", "index_map"],
            |container, index| container.get(index),
        ),
        binary("@in", &["in_list", "in_map"], |value, container| {
            container.contains(value)
        }),
        unary(
            "size",
            &[
                "size_string",
                "size_bytes",
                "size_list",
                "size_map",
                "string_size",
                "bytes_size",
                "list_size",
                "map_size",
            ],
            Value::size,
        ),
        conversion(
            "int",
            Type::Int,
            &["int", "uint", "double", "string", "timestamp", "duration"],
        ),
        conversion("uint", Type::Uint, &["uint", "int", "double", "string"]),
        conversion("double", Type::Double, &["double", "int", "uint", "string"]),
        conversion(
            "string",
            Type::String,
            &[
                "string",
                "bool",
                "int",
                "uint",
                "double",
                "bytes",
                "timestamp",
                "duration",
            ],
        ),
        conversion("bytes", Type::Bytes, &["bytes", "string"]),
        conversion("bool", Type::Bool, &["bool", "string"]),
        conversion("timestamp", Type::Timestamp, &["timestamp", "string", "int"]),
        conversion("duration", Type::Duration, &["duration", "string"]),
        unary("type", &["type"], |value| Value::Type(value.type_of())),
        unary("dyn", &["to_dyn"], Value::clone),
        binary("contains", &["contains_string"], |s, sub| {
            strings(s, sub, |s, sub| s.contains(sub))
        }),
        binary("startsWith", &["starts_with_string"], |s, prefix| {
            strings(s, prefix, |s, prefix| s.starts_with(prefix))
        }),
        binary("endsWith", &["ends_with_string"], |s, suffix| {
            strings(s, suffix, |s, suffix| s.ends_with(suffix))
        }),
        timestamp_getter("getFullYear", "timestamp_to_year", |t| i64::from(t.year()), None),
        timestamp_getter(
            "getMonth",
            "timestamp_to_month",
            |t| i64::from(u8::from(t.month())) - 1,
            None,
        ),
        timestamp_getter(
            "getDayOfYear",
            "timestamp_to_day_of_year",
            |t| i64::from(t.ordinal()) - 1,
            None,
        ),
        timestamp_getter(
            "getDayOfMonth",
            "timestamp_to_day_of_month",
            |t| i64::from(t.day()) - 1,
            None,
        ),
        timestamp_getter("getDate", "timestamp_to_date", |t| i64::from(t.day()), None),
        timestamp_getter(
            "getDayOfWeek",
            "timestamp_to_day_of_week",
            |t| i64::from(t.weekday().number_days_from_sunday()),
            None,
        ),
        timestamp_getter(
            "getHours",
            "timestamp_to_hours",
            |t| i64::from(t.hour()),
            Some(("duration_to_hours", |d: &Duration| Some(d.whole_hours()))),
        ),
        timestamp_getter(
            "getMinutes",
            "timestamp_to_minutes",
            |t| i64::from(t.minute()),
            Some(("duration_to_minutes", |d: &Duration| Some(d.whole_minutes()))),
        ),
        timestamp_getter(
            "getSeconds",
            "timestamp_to_seconds",
            |t| i64::from(t.second()),
            Some(("duration_to_seconds", |d: &Duration| Some(d.whole_seconds()))),
        ),
        timestamp_getter(
            "getMilliseconds",
            "timestamp_to_milliseconds",
            |t| i64::from(t.millisecond()),
            Some(("duration_to_milliseconds", whole_milliseconds)),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::Dispatcher;
    use time::macros::datetime;

    fn call(name: &str, args: &[Value]) -> Value {
        let mut dispatcher = Dispatcher::new();
        dispatcher.extend(standard_overloads());
        dispatcher.find(name, &[]).unwrap().call(args)
    }

    #[test]
    fn test_integer_overflow_is_an_error() {
        assert_eq!(
            call("_+_", &[Value::Int(i64::MAX), Value::Int(1)]),
            Value::error("integer overflow")
        );
        assert_eq!(
            call("_-_", &[Value::Uint(0), Value::Uint(1)]),
            Value::error("integer overflow")
        );
        assert_eq!(
            call("_/_", &[Value::Int(i64::MIN), Value::Int(-1)]),
            Value::error("integer overflow")
        );
        assert_eq!(
            call("_/_", &[Value::Int(1), Value::Int(0)]),
            Value::error("division by zero")
        );
        assert_eq!(
            call("_%_", &[Value::Uint(1), Value::Uint(0)]),
            Value::error("modulus by zero")
        );
        assert!(call("-_", &[Value::Int(i64::MIN)]).is_error());
    }

    #[test]
    fn test_concatenation() {
        assert_eq!(
            call("_+_", &[Value::from("ab"), Value::from("cd")]),
            Value::from("abcd")
        );
        assert_eq!(
            call("_+_", &[Value::list([Value::Int(1)]), Value::list([Value::Int(2)])]),
            Value::list([Value::Int(1), Value::Int(2)])
        );
        assert!(call("_+_", &[Value::Int(1), Value::from("a")]).is_error());
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(call("_<_", &[Value::Int(1), Value::Int(2)]), Value::Bool(true));
        assert_eq!(
            call("_>=_", &[Value::from("b"), Value::from("a")]),
            Value::Bool(true)
        );
        assert_eq!(
            call("_<_", &[Value::Int(1), Value::from("a")]),
            Value::error("no such overload")
        );
        assert_eq!(call("_!=_", &[Value::Int(1), Value::from("a")]), Value::Bool(true));
    }

    #[test]
    fn test_not_strictly_false() {
        let not_strictly_false = |value: Value| call("@not_strictly_false", &[value]);
        assert_eq!(not_strictly_false(Value::Bool(false)), Value::Bool(false));
        assert_eq!(not_strictly_false(Value::error("boom")), Value::Bool(true));
        assert_eq!(not_strictly_false(Value::unknown(1)), Value::Bool(true));
    }

    #[test]
    fn test_negation() {
        assert_eq!(call("!_", &[Value::Bool(true)]), Value::Bool(false));
        assert!(call("!_", &[Value::Int(1)]).is_error());
        assert!(call("-_", &[Value::Bool(true)]).is_error());
        assert_eq!(call("-_", &[Value::double(1.5)]), Value::double(-1.5));
    }

    #[test]
    fn test_timestamp_getters_use_utc() {
        let timestamp = Value::Timestamp(datetime!(2024-03-01 23:30:15.250 -02:00));
        assert_eq!(call("getFullYear", &[timestamp.clone()]), Value::Int(2024));
        assert_eq!(call("getMonth", &[timestamp.clone()]), Value::Int(2));
        assert_eq!(call("getDate", &[timestamp.clone()]), Value::Int(2));
        assert_eq!(call("getDayOfMonth", &[timestamp.clone()]), Value::Int(1));
        assert_eq!(call("getHours", &[timestamp.clone()]), Value::Int(1));
        assert_eq!(call("getMilliseconds", &[timestamp]), Value::Int(250));
        let duration = Value::Duration(Duration::seconds(5400));
        assert_eq!(call("getHours", &[duration.clone()]), Value::Int(1));
        assert_eq!(call("getMinutes", &[duration]), Value::Int(90));
    }

    #[test]
    fn test_duration_milliseconds_overflow() {
        let duration = Value::Duration(Duration::seconds(i64::MAX));
        assert_eq!(
            call("getMilliseconds", &[duration]),
            Value::error("integer overflow")
        );
        let duration = Value::Duration(Duration::milliseconds(1500));
        assert_eq!(call("getMilliseconds", &[duration]), Value::Int(1500));
    }

    #[test]
    fn test_timestamp_arithmetic() {
        let start = Value::Timestamp(datetime!(2024-01-01 0:00 UTC));
        let hour = Value::Duration(Duration::hours(1));
        let later = call("_+_", &[start.clone(), hour.clone()]);
        assert_eq!(later, Value::Timestamp(datetime!(2024-01-01 1:00 UTC)));
        assert_eq!(call("_-_", &[later, start]), hour);
    }

    #[test]
    fn test_string_functions() {
        let hello = Value::from("hello");
        assert_eq!(
            call("startsWith", &[hello.clone(), Value::from("he")]),
            Value::Bool(true)
        );
        assert_eq!(
            call("contains", &[hello.clone(), Value::from("ll")]),
            Value::Bool(true)
        );
        assert_eq!(
            call("endsWith", &[hello, Value::from("x")]),
            Value::Bool(false)
        );
    }
}
