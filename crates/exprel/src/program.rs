//! Evaluable programs.

use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

mod activation;
pub use activation::{Activation, EmptyActivation, HierarchicalActivation, PartialActivation};

mod dispatcher;
pub use dispatcher::{Dispatcher, Function, Implementation};

mod interpreter;
use interpreter::Interpreter;

use crate::ast::{Ast, ExprKind, Reference};
use crate::packages::Package;
use crate::types::{TypeProvider, Value};

/// Calls the evaluator handles itself rather than through the function table.
const SPECIAL_FORMS: &[&str] = &["_&&_", "_||_", "_?_:_"];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProgramError {
    #[error("no implementation for function '{function}' at offset {offset}")]
    UnknownFunction { function: String, offset: usize },
}

/// Per-program additions to the environment's function table and bindings.
#[derive(Debug, Clone, Default)]
pub struct ProgramOptions {
    functions: Vec<Function>,
    globals: IndexMap<String, Value>,
}

impl ProgramOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function; it replaces any earlier one with the same name
    /// or overload ids.
    pub fn function(mut self, function: Function) -> Self {
        self.functions.push(function);
        self
    }

    pub fn functions(mut self, functions: impl IntoIterator<Item = Function>) -> Self {
        self.functions.extend(functions);
        self
    }

    /// Bind a variable for every evaluation. The activation passed to
    /// [`Program::eval`] takes precedence.
    pub fn global(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.globals.insert(name.into(), value.into());
        self
    }
}

/// An Ast bound to a function table, ready to evaluate any number of times.
#[derive(Clone)]
pub struct Program {
    ast: Ast,
    dispatcher: Arc<Dispatcher>,
    globals: Arc<IndexMap<String, Value>>,
    package: Package,
    type_provider: Arc<dyn TypeProvider>,
}

impl Program {
    /// Assemble a program, failing when a call site has no implementation.
    pub(crate) fn plan(
        ast: &Ast,
        mut dispatcher: Dispatcher,
        options: ProgramOptions,
        package: Package,
        type_provider: Arc<dyn TypeProvider>,
    ) -> Result<Program, ProgramError> {
        dispatcher.extend(options.functions);

        let mut missing = None;
        ast.expr().walk(&mut |expr| {
            let ExprKind::Call {
                target, function, ..
            } = &expr.kind
            else {
                return;
            };
            if missing.is_some() || SPECIAL_FORMS.contains(&function.as_str()) {
                return;
            }
            let found = match ast.reference(expr.id) {
                Some(Reference::Function { name, overload_ids }) => {
                    dispatcher.contains(name, overload_ids)
                }
                _ => {
                    dispatcher.contains(function.trim_start_matches('.'), &[])
                        || target
                            .as_ref()
                            .and_then(|target| target.qualified_name())
                            .is_some_and(|prefix| {
                                package
                                    .candidates(&format!("{prefix}.{function}"))
                                    .iter()
                                    .any(|candidate| dispatcher.contains(candidate, &[]))
                            })
                }
            };
            if !found {
                missing = Some(ProgramError::UnknownFunction {
                    function: function.clone(),
                    offset: ast.source_info().offset(expr.id).unwrap_or_default(),
                });
            }
        });
        if let Some(error) = missing {
            return Err(error);
        }

        log::debug!(
            "planned program over {} functions, {} globals",
            dispatcher.len(),
            options.globals.len()
        );
        Ok(Program {
            ast: ast.clone(),
            dispatcher: Arc::new(dispatcher),
            globals: Arc::new(options.globals),
            package,
            type_provider,
        })
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    /// Evaluate against `activation`. Failures are Error values.
    pub fn eval(&self, activation: &dyn Activation) -> Value {
        let globals: &IndexMap<String, Value> = &self.globals;
        let scope = HierarchicalActivation::new(globals, activation);
        Interpreter {
            ast: &self.ast,
            dispatcher: &self.dispatcher,
            package: &self.package,
            type_provider: self.type_provider.as_ref(),
            activation: &scope,
        }
        .eval(self.ast.expr())
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("source", self.ast.source())
            .field("checked", &self.ast.is_checked())
            .field("functions", &self.dispatcher.len())
            .finish_non_exhaustive()
    }
}
