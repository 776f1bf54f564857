//! Declarations of the built-in operators and functions.
//!
//! Overload ids here are the keys the standard function table registers
//! implementations under.

use super::decls::{Decl, OverloadDecl};
use crate::types::Type;

const COMPARABLE: &[(&str, Type)] = &[
    ("bool", Type::Bool),
    ("int", Type::Int),
    ("uint", Type::Uint),
    ("double", Type::Double),
    ("string", Type::String),
    ("bytes", Type::Bytes),
    ("timestamp", Type::Timestamp),
    ("duration", Type::Duration),
];

const TIMESTAMP_GETTERS: &[(&str, &str)] = &[
    ("getFullYear", "year"),
    ("getMonth", "month"),
    ("getDayOfYear", "day_of_year"),
    ("getDayOfMonth", "day_of_month"),
    ("getDate", "date"),
    ("getDayOfWeek", "day_of_week"),
    ("getHours", "hours"),
    ("getMinutes", "minutes"),
    ("getSeconds", "seconds"),
    ("getMilliseconds", "milliseconds"),
];

const DURATION_GETTERS: &[(&str, &str)] = &[
    ("getHours", "hours"),
    ("getMinutes", "minutes"),
    ("getSeconds", "seconds"),
    ("getMilliseconds", "milliseconds"),
];

fn a() -> Type {
    Type::param("A")
}

fn b() -> Type {
    Type::param("B")
}

fn global(id: &str, params: Vec<Type>, result: Type) -> OverloadDecl {
    OverloadDecl::global(id, params, result)
}

fn member(id: &str, params: Vec<Type>, result: Type) -> OverloadDecl {
    OverloadDecl::member(id, params, result)
}

pub fn standard_declarations() -> Vec<Decl> {
    let mut decls = vec![
        Decl::function("!_", vec![global("logical_not", vec![Type::Bool], Type::Bool)]),
        Decl::function(
            "-_",
            vec![
                global("negate_int", vec![Type::Int], Type::Int),
                global("negate_double", vec![Type::Double], Type::Double),
                global("negate_duration", vec![Type::Duration], Type::Duration),
            ],
        ),
        Decl::function(
            "_&&_",
            vec![global("logical_and", vec![Type::Bool, Type::Bool], Type::Bool)],
        ),
        Decl::function(
            "_||_",
            vec![global("logical_or", vec![Type::Bool, Type::Bool], Type::Bool)],
        ),
        Decl::function(
            "_?_:_",
            vec![global("conditional", vec![Type::Bool, a(), a()], a())],
        ),
        Decl::function(
            "@not_strictly_false",
            vec![global("not_strictly_false", vec![Type::Bool], Type::Bool)],
        ),
        Decl::function("_==_", vec![global("equals", vec![a(), a()], Type::Bool)]),
        Decl::function("_!=_", vec![global("not_equals", vec![a(), a()], Type::Bool)]),
    ];

    for (function, prefix) in [
        ("_<_", "less"),
        ("_<=_", "less_equals"),
        ("_>_", "greater"),
        ("_>=_", "greater_equals"),
    ] {
        let overloads = COMPARABLE
            .iter()
            .map(|(name, ty)| {
                global(
                    &format!("{prefix}_{name}"),
                    vec![ty.clone(), ty.clone()],
                    Type::Bool,
                )
            })
            .collect();
        decls.push(Decl::function(function, overloads));
    }

    decls.extend([
        Decl::function(
            "_+_",
            vec![
                global("add_int", vec![Type::Int, Type::Int], Type::Int),
                global("add_uint", vec![Type::Uint, Type::Uint], Type::Uint),
                global("add_double", vec![Type::Double, Type::Double], Type::Double),
                global("add_string", vec![Type::String, Type::String], Type::String),
                global("add_bytes", vec![Type::Bytes, Type::Bytes], Type::Bytes),
                global(
                    "add_list",
                    vec![Type::list(a()), Type::list(a())],
                    Type::list(a()),
                ),
                global(
                    "add_timestamp_duration",
                    vec![Type::Timestamp, Type::Duration],
                    Type::Timestamp,
                ),
                global(
                    "add_duration_timestamp",
                    vec![Type::Duration, Type::Timestamp],
                    Type::Timestamp,
                ),
                global(
                    "add_duration_duration",
                    vec![Type::Duration, Type::Duration],
                    Type::Duration,
                ),
            ],
        ),
        Decl::function(
            "_-_",
            vec![
                global("subtract_int", vec![Type::Int, Type::Int], Type::Int),
                global("subtract_uint", vec![Type::Uint, Type::Uint], Type::Uint),
                global("subtract_double", vec![Type::Double, Type::Double], Type::Double),
                global(
                    "subtract_timestamp_timestamp",
                    vec![Type::Timestamp, Type::Timestamp],
                    Type::Duration,
                ),
                global(
                    "subtract_timestamp_duration",
                    vec![Type::Timestamp, Type::Duration],
                    Type::Timestamp,
                ),
                global(
                    "subtract_duration_duration",
                    vec![Type::Duration, Type::Duration],
                    Type::Duration,
                ),
            ],
        ),
        Decl::function(
            "_*_",
            vec![
                global("multiply_int", vec![Type::Int, Type::Int], Type::Int),
                global("multiply_uint", vec![Type::Uint, Type::Uint], Type::Uint),
                global("multiply_double", vec![Type::Double, Type::Double], Type::Double),
            ],
        ),
        Decl::function(
            "_/_",
            vec![
                global("divide_int", vec![Type::Int, Type::Int], Type::Int),
                global("divide_uint", vec![Type::Uint, Type::Uint], Type::Uint),
                global("divide_double", vec![Type::Double, Type::Double], Type::Double),
            ],
        ),
        Decl::function(
            "_%_",
            vec![
                global("modulo_int", vec![Type::Int, Type::Int], Type::Int),
                global("modulo_uint", vec![Type::Uint, Type::Uint], Type::Uint),
            ],
        ),
        Decl::function(
            "_[_]",
            vec![
                global("index_list", vec![Type::list(a()), Type::Int], a()),
                global("index_list_uint", vec![Type::list(a()), Type::Uint], a()),
                global("index_map", vec![Type::map(a(), b()), a()], b()),
            ],
        ),
        Decl::function(
            "@in",
            vec![
                global("in_list", vec![a(), Type::list(a())], Type::Bool),
                global("in_map", vec![a(), Type::map(a(), b())], Type::Bool),
            ],
        ),
        Decl::function(
            "size",
            vec![
                global("size_string", vec![Type::String], Type::Int),
                global("size_bytes", vec![Type::Bytes], Type::Int),
                global("size_list", vec![Type::list(a())], Type::Int),
                global("size_map", vec![Type::map(a(), b())], Type::Int),
                member("string_size", vec![Type::String], Type::Int),
                member("bytes_size", vec![Type::Bytes], Type::Int),
                member("list_size", vec![Type::list(a())], Type::Int),
                member("map_size", vec![Type::map(a(), b())], Type::Int),
            ],
        ),
        conversion(
            "int",
            Type::Int,
            &[
                ("int", Type::Int),
                ("uint", Type::Uint),
                ("double", Type::Double),
                ("string", Type::String),
                ("timestamp", Type::Timestamp),
                ("duration", Type::Duration),
            ],
        ),
        conversion(
            "uint",
            Type::Uint,
            &[
                ("uint", Type::Uint),
                ("int", Type::Int),
                ("double", Type::Double),
                ("string", Type::String),
            ],
        ),
        conversion(
            "double",
            Type::Double,
            &[
                ("double", Type::Double),
                ("int", Type::Int),
                ("uint", Type::Uint),
                ("string", Type::String),
            ],
        ),
        conversion(
            "string",
            Type::String,
            &[
                ("string", Type::String),
                ("bool", Type::Bool),
                ("int", Type::Int),
                ("uint", Type::Uint),
                ("double", Type::Double),
                ("bytes", Type::Bytes),
                ("timestamp", Type::Timestamp),
                ("duration", Type::Duration),
            ],
        ),
        conversion(
            "bytes",
            Type::Bytes,
            &[("bytes", Type::Bytes), ("string", Type::String)],
        ),
        conversion(
            "bool",
            Type::Bool,
            &[("bool", Type::Bool), ("string", Type::String)],
        ),
        conversion(
            "timestamp",
            Type::Timestamp,
            &[
                ("timestamp", Type::Timestamp),
                ("string", Type::String),
                ("int", Type::Int),
            ],
        ),
        conversion(
            "duration",
            Type::Duration,
            &[("duration", Type::Duration), ("string", Type::String)],
        ),
        Decl::function("type", vec![global("type", vec![a()], Type::type_of(a()))]),
        Decl::function("dyn", vec![global("to_dyn", vec![a()], Type::Dyn)]),
        Decl::function(
            "contains",
            vec![member("contains_string", vec![Type::String, Type::String], Type::Bool)],
        ),
        Decl::function(
            "startsWith",
            vec![member("starts_with_string", vec![Type::String, Type::String], Type::Bool)],
        ),
        Decl::function(
            "endsWith",
            vec![member("ends_with_string", vec![Type::String, Type::String], Type::Bool)],
        ),
    ]);

    for (function, suffix) in TIMESTAMP_GETTERS {
        let mut overloads = vec![member(
            &format!("timestamp_to_{suffix}"),
            vec![Type::Timestamp],
            Type::Int,
        )];
        if DURATION_GETTERS.iter().any(|(name, _)| name == function) {
            overloads.push(member(
                &format!("duration_to_{suffix}"),
                vec![Type::Duration],
                Type::Int,
            ));
        }
        decls.push(Decl::function(*function, overloads));
    }

    decls
}

fn conversion(function: &str, target: Type, sources: &[(&str, Type)]) -> Decl {
    let overloads = sources
        .iter()
        .map(|(name, source)| {
            global(
                &format!("{name}_to_{function}"),
                vec![source.clone()],
                target.clone(),
            )
        })
        .collect();
    Decl::function(function, overloads)
}
