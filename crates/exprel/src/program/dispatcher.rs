use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::types::Value;

pub type Implementation = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// A native implementation of a function, registered under its name and
/// optionally under specific overload ids.
#[derive(Clone)]
pub struct Function {
    pub name: String,
    pub overload_ids: Vec<String>,
    pub implementation: Implementation,
    /// Strict functions never see Error or Unknown arguments; those are
    /// returned before the call.
    pub strict: bool,
}

impl Function {
    pub fn new(
        name: impl Into<String>,
        implementation: impl Fn(&[Value]) -> Value + Send + Sync + 'static,
    ) -> Self {
        Function {
            name: name.into(),
            overload_ids: Vec::new(),
            implementation: Arc::new(implementation),
            strict: true,
        }
    }

    pub fn overloads<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.overload_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn non_strict(mut self) -> Self {
        self.strict = false;
        self
    }

    pub fn call(&self, args: &[Value]) -> Value {
        if self.strict {
            if let Some(propagated) = Value::propagate(args) {
                return propagated;
            }
        }
        (self.implementation)(args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("overload_ids", &self.overload_ids)
            .field("strict", &self.strict)
            .finish_non_exhaustive()
    }
}

/// Function table consulted at call sites. Later registrations replace
/// earlier ones.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    by_name: HashMap<String, Function>,
    by_overload: HashMap<String, Function>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, function: Function) {
        if function.overload_ids.is_empty() {
            // A name-only registration supersedes every overload of that name.
            self.by_overload
                .retain(|_, registered| registered.name != function.name);
        }
        for id in &function.overload_ids {
            self.by_overload.insert(id.clone(), function.clone());
        }
        self.by_name.insert(function.name.clone(), function);
    }

    pub fn extend(&mut self, functions: impl IntoIterator<Item = Function>) {
        for function in functions {
            self.add(function);
        }
    }

    /// A call resolved to exactly one overload dispatches by its id when
    /// the table has it, otherwise by function name.
    pub fn find(&self, name: &str, overload_ids: &[String]) -> Option<&Function> {
        if let [id] = overload_ids {
            if let Some(function) = self.by_overload.get(id) {
                return Some(function);
            }
        }
        self.by_name.get(name)
    }

    pub fn contains(&self, name: &str, overload_ids: &[String]) -> bool {
        self.find(name, overload_ids).is_some()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(name: &str, value: i64) -> Function {
        Function::new(name, move |_| Value::Int(value))
    }

    #[test]
    fn test_find_by_overload_then_name() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.add(constant("f", 1).overloads(["f_int"]));
        dispatcher.add(constant("g", 2));
        let f = dispatcher.find("f", &["f_int".to_string()]).unwrap();
        assert_eq!(f.call(&[]), Value::Int(1));
        let g = dispatcher.find("g", &["g_unknown".to_string()]).unwrap();
        assert_eq!(g.call(&[]), Value::Int(2));
        assert!(dispatcher.find("h", &[]).is_none());
    }

    #[test]
    fn test_later_registrations_override() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.add(constant("f", 1).overloads(["f_int", "f_uint"]));
        dispatcher.add(constant("f", 2));
        let f = dispatcher.find("f", &["f_int".to_string()]).unwrap();
        assert_eq!(f.call(&[]), Value::Int(2));
    }

    #[test]
    fn test_strict_functions_propagate() {
        let f = constant("f", 1);
        assert!(f.call(&[Value::error("boom")]).is_error());
        assert!(f.call(&[Value::unknown(3)]).is_unknown());
        let lenient = constant("f", 1).non_strict();
        assert_eq!(lenient.call(&[Value::error("boom")]), Value::Int(1));
    }
}
