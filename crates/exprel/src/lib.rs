//! An embeddable expression language.
//!
//! Expressions go through three stages: [`Env::parse`] builds an [`Ast`],
//! [`Env::check`] annotates it with references and types, and
//! [`Env::program`] binds it to a function table. The resulting [`Program`]
//! can be evaluated any number of times against an [`Activation`].
//!
//! ```
//! use exprel::{Decl, Env, ProgramOptions, Type, Value};
//! use std::collections::HashMap;
//!
//! let env = Env::builder()
//!     .declarations([Decl::ident("name", Type::String)])
//!     .build()?;
//! let (ast, issues) = env.compile("'Hello, ' + name + '!'");
//! let ast = ast.ok_or_else(|| issues.err().unwrap())?;
//! let program = env.program(&ast, ProgramOptions::new())?;
//!
//! let activation = HashMap::from([("name".to_string(), Value::string("world"))]);
//! assert_eq!(program.eval(&activation), Value::string("Hello, world!"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod ast;
pub mod checker;
pub mod env;
pub mod functions;
pub mod issues;
pub mod packages;
pub mod parser;
pub mod program;
pub mod types;

pub use ast::{Ast, Expr, ExprKind, Reference};
pub use checker::{Decl, FunctionDecl, IdentDecl, OverloadDecl};
pub use env::{Env, EnvBuilder, EnvError};
pub use issues::{Diagnostic, Issues, IssuesError, Severity};
pub use parser::{Macro, SourceCode};
pub use program::{
    Activation, EmptyActivation, Function, HierarchicalActivation, PartialActivation, Program,
    ProgramError, ProgramOptions,
};
pub use types::{Type, Value};
