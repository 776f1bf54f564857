//! Tree-walking evaluation of an Ast.

use super::{Activation, Dispatcher};
use crate::ast::{Ast, Comprehension, Expr, ExprKind, MapEntry, Reference};
use crate::packages::Package;
use crate::types::{ErrorValue, Lookup, MapValue, Mapper, TypeProvider, UnknownValue, Value};

/// A comprehension variable, chained to the variables of enclosing loops.
struct Frame<'f> {
    parent: Option<&'f Frame<'f>>,
    name: &'f str,
    value: Value,
}

impl Frame<'_> {
    fn lookup<'f>(frame: Option<&'f Frame<'f>>, name: &str) -> Option<&'f Value> {
        let mut current = frame;
        while let Some(frame) = current {
            if frame.name == name {
                return Some(&frame.value);
            }
            current = frame.parent;
        }
        None
    }
}

pub(super) struct Interpreter<'p> {
    pub(super) ast: &'p Ast,
    pub(super) dispatcher: &'p Dispatcher,
    pub(super) package: &'p Package,
    pub(super) type_provider: &'p dyn TypeProvider,
    pub(super) activation: &'p dyn Activation,
}

impl Interpreter<'_> {
    pub(super) fn eval(&self, expr: &Expr) -> Value {
        self.eval_in(expr, None)
    }

    fn eval_in(&self, expr: &Expr, frame: Option<&Frame>) -> Value {
        match &expr.kind {
            ExprKind::Const(constant) => constant.to_value(),
            ExprKind::Ident { name } => self.eval_ident(expr, name, frame),
            ExprKind::Select {
                operand,
                field,
                test_only,
            } => self.eval_select(expr, operand, field, *test_only, frame),
            ExprKind::Call {
                target,
                function,
                args,
            } => self.eval_call(expr, target.as_deref(), function, args, frame),
            ExprKind::List { elements } => {
                let values: Vec<Value> = elements
                    .iter()
                    .map(|element| self.eval_in(element, frame))
                    .collect();
                Value::propagate(&values).unwrap_or_else(|| Value::list(values))
            }
            ExprKind::Map { entries } => self.eval_map(entries, frame),
            ExprKind::Comprehension(comprehension) => self.eval_comprehension(comprehension, frame),
        }
    }

    /// Value bound to a fully qualified name, or an Unknown when the
    /// activation marks it so.
    fn resolve(&self, id: i64, name: &str) -> Option<Value> {
        if self.activation.is_unknown(name) {
            return Some(Value::unknown(id));
        }
        self.activation
            .resolve(name)
            .or_else(|| self.type_provider.find_ident(name))
    }

    /// Resolve `name` as written, through the package's candidates.
    fn resolve_candidates(&self, id: i64, name: &str) -> Option<Value> {
        self.package
            .candidates(name)
            .iter()
            .find_map(|candidate| self.resolve(id, candidate))
    }

    fn eval_ident(&self, expr: &Expr, name: &str, frame: Option<&Frame>) -> Value {
        if let Some(value) = Frame::lookup(frame, name) {
            return value.clone();
        }
        let resolved = match self.ast.reference(expr.id) {
            Some(Reference::Ident { name }) => self.resolve(expr.id, name),
            _ => self.resolve_candidates(expr.id, name),
        };
        resolved.unwrap_or_else(|| Value::error(format!("no such attribute: {name}")))
    }

    fn eval_select(
        &self,
        expr: &Expr,
        operand: &Expr,
        field: &str,
        test_only: bool,
        frame: Option<&Frame>,
    ) -> Value {
        if !test_only {
            match self.ast.reference(expr.id) {
                Some(Reference::Ident { name }) => {
                    return self
                        .resolve(expr.id, name)
                        .unwrap_or_else(|| Value::error(format!("no such attribute: {name}")));
                }
                Some(_) => {}
                None => {
                    let qualified = expr.qualified_name().filter(|name| {
                        let root = name.split('.').next().unwrap_or_default();
                        Frame::lookup(frame, root).is_none()
                    });
                    if let Some(value) =
                        qualified.and_then(|name| self.resolve_candidates(expr.id, &name))
                    {
                        return value;
                    }
                }
            }
        }

        let operand = self.eval_in(operand, frame);
        let key = Value::string(field);
        match &operand {
            Value::Error(_) | Value::Unknown(_) => operand,
            Value::Map(map) => match map.find(&key) {
                Lookup::Found(value) if !test_only => value,
                Lookup::Found(_) => Value::Bool(true),
                Lookup::Absent if test_only => Value::Bool(false),
                Lookup::Absent => Value::Error(ErrorValue::no_such_key(&key)),
                Lookup::Failed(error) => Value::Error(error),
            },
            other => Value::error(format!(
                "type '{}' does not support field selection",
                other.type_of()
            )),
        }
    }

    fn eval_call(
        &self,
        expr: &Expr,
        target: Option<&Expr>,
        function: &str,
        args: &[Expr],
        frame: Option<&Frame>,
    ) -> Value {
        match (function, args) {
            ("_&&_", [left, right]) => return self.eval_logical(left, right, false, frame),
            ("_||_", [left, right]) => return self.eval_logical(left, right, true, frame),
            ("_?_:_", [condition, then, otherwise]) => {
                return match self.eval_in(condition, frame) {
                    Value::Bool(true) => self.eval_in(then, frame),
                    Value::Bool(false) => self.eval_in(otherwise, frame),
                    other => other.and_then(|_| Value::Error(ErrorValue::no_such_overload())),
                };
            }
            _ => {}
        }

        let (name, overload_ids, target) = match self.ast.reference(expr.id) {
            Some(Reference::Function { name, overload_ids }) => {
                // Resolved to a namespaced global: the target was only a prefix.
                let target = target.filter(|target| !self.is_namespace_of(target, function, name));
                (name.clone(), overload_ids.as_slice(), target)
            }
            _ => match target.and_then(|target| self.namespaced_function(target, function, frame)) {
                Some(name) => (name, &[][..], None),
                None => (function.trim_start_matches('.').to_string(), &[][..], target),
            },
        };

        let mut values = Vec::with_capacity(args.len() + 1);
        if let Some(target) = target {
            values.push(self.eval_in(target, frame));
        }
        values.extend(args.iter().map(|arg| self.eval_in(arg, frame)));

        match self.dispatcher.find(&name, overload_ids) {
            Some(implementation) => {
                log::trace!("dispatching '{name}' to {implementation:?}");
                implementation.call(&values)
            }
            None => Value::propagate(&values)
                .unwrap_or_else(|| Value::error(format!("no such overload: {name}"))),
        }
    }

    /// For an unchecked `a.b.f(x)`, the qualified name `a.b.f` when the
    /// function table knows it.
    fn namespaced_function(
        &self,
        target: &Expr,
        function: &str,
        frame: Option<&Frame>,
    ) -> Option<String> {
        let prefix = target.qualified_name()?;
        let root = prefix.split('.').next().unwrap_or_default();
        if Frame::lookup(frame, root).is_some() {
            return None;
        }
        self.package
            .candidates(&format!("{prefix}.{function}"))
            .into_iter()
            .find(|candidate| self.dispatcher.contains(candidate, &[]))
    }

    fn is_namespace_of(&self, target: &Expr, function: &str, resolved: &str) -> bool {
        target.qualified_name().is_some_and(|prefix| {
            self.package
                .candidates(&format!("{prefix}.{function}"))
                .iter()
                .any(|candidate| candidate == resolved)
        })
    }

    /// `&&` when `decisive` is false, `||` when it is true. Either side
    /// equal to `decisive` decides the result even if the other failed.
    fn eval_logical(
        &self,
        left: &Expr,
        right: &Expr,
        decisive: bool,
        frame: Option<&Frame>,
    ) -> Value {
        let left = self.eval_in(left, frame);
        if left == Value::Bool(decisive) {
            return left;
        }
        let right = self.eval_in(right, frame);
        if right == Value::Bool(decisive) {
            return right;
        }
        match (&left, &right) {
            (Value::Bool(_), Value::Bool(_)) => Value::Bool(!decisive),
            _ => {
                let unknowns: Option<UnknownValue> = [&left, &right]
                    .into_iter()
                    .filter_map(|value| match value {
                        Value::Unknown(unknown) => Some(unknown.clone()),
                        _ => None,
                    })
                    .reduce(|merged, next| merged.merge(&next));
                if let Some(unknown) = unknowns {
                    return Value::Unknown(unknown);
                }
                [left, right]
                    .into_iter()
                    .find(Value::is_error)
                    .unwrap_or(Value::Error(ErrorValue::no_such_overload()))
            }
        }
    }

    fn eval_map(&self, entries: &[MapEntry], frame: Option<&Frame>) -> Value {
        let mut pairs = Vec::with_capacity(entries.len());
        for entry in entries {
            let key = self.eval_in(&entry.key, frame);
            let value = self.eval_in(&entry.value, frame);
            if let Some(propagated) = Value::propagate([&key, &value]) {
                return propagated;
            }
            pairs.push((key, value));
        }
        match MapValue::new(pairs) {
            Ok(map) => Value::Map(map),
            Err(error) => Value::Error(error),
        }
    }

    fn eval_comprehension(&self, comprehension: &Comprehension, frame: Option<&Frame>) -> Value {
        let range = self.eval_in(&comprehension.iter_range, frame);
        let items: Vec<Value> = match &range {
            Value::Error(_) | Value::Unknown(_) => return range,
            Value::List(list) => list.items().to_vec(),
            Value::Map(_) => match range.as_iterable() {
                Some(iterable) => iterable.iter().collect(),
                None => Vec::new(),
            },
            other => {
                return Value::error(format!(
                    "expression of type '{}' cannot be the range of a comprehension",
                    other.type_of()
                ));
            }
        };

        let mut accumulator = self.eval_in(&comprehension.accu_init, frame);
        for item in items {
            let accu_frame = Frame {
                parent: frame,
                name: &comprehension.accu_var,
                value: accumulator.clone(),
            };
            let iter_frame = Frame {
                parent: Some(&accu_frame),
                name: &comprehension.iter_var,
                value: item,
            };
            if self.eval_in(&comprehension.loop_condition, Some(&iter_frame)) != Value::Bool(true) {
                break;
            }
            accumulator = self.eval_in(&comprehension.loop_step, Some(&iter_frame));
        }

        let result_frame = Frame {
            parent: frame,
            name: &comprehension.accu_var,
            value: accumulator,
        };
        self.eval_in(&comprehension.result, Some(&result_frame))
    }
}
