//! Static type checking.
//!
//! The checker walks an expression once, resolving every identifier and call
//! against a [`Scope`] and recording a type and a reference for every node.
//! Anything it cannot narrow statically is typed `dyn` rather than rejected.

use std::collections::HashMap;

mod decls;
pub use decls::{Decl, FunctionDecl, IdentDecl, OverloadDecl};

mod scope;
pub use scope::{DeclError, Scope};

mod standard;
pub use standard::standard_declarations;

use crate::ast::{
    Comprehension, Expr, ExprKind, MapEntry, Reference, ReferenceMap, SourceInfo, TypeMap,
};
use crate::issues::Diagnostic;
use crate::types::Type;

/// Annotations produced by a successful check. Both maps cover every node.
#[derive(Debug, Clone, Default)]
pub struct Checked {
    pub references: ReferenceMap,
    pub types: TypeMap,
}

pub fn check(
    expr: &Expr,
    source_info: &SourceInfo,
    scope: &Scope,
) -> Result<Checked, Vec<Diagnostic>> {
    let mut checker = Checker {
        scope,
        source_info,
        locals: Vec::new(),
        instantiations: 0,
        checked: Checked::default(),
        errors: Vec::new(),
    };
    checker.check(expr);
    if checker.errors.is_empty() {
        log::debug!(
            "checked {} nodes, result type {}",
            checker.checked.types.len(),
            checker.checked.types.get(&expr.id).unwrap_or(&Type::Dyn)
        );
        Ok(checker.checked)
    } else {
        Err(checker.errors)
    }
}

struct Checker<'s> {
    scope: &'s Scope,
    source_info: &'s SourceInfo,
    /// Comprehension variables, innermost last.
    locals: Vec<HashMap<String, Type>>,
    instantiations: usize,
    checked: Checked,
    errors: Vec<Diagnostic>,
}

impl Checker<'_> {
    fn check(&mut self, expr: &Expr) -> Type {
        let (ty, reference) = match &expr.kind {
            ExprKind::Const(constant) => (constant.type_of(), Reference::None),
            ExprKind::Ident { name } => self.check_ident(expr, name),
            ExprKind::Select {
                operand,
                field,
                test_only,
            } => self.check_select(expr, operand, field, *test_only),
            ExprKind::Call {
                target,
                function,
                args,
            } => self.check_call(expr, target.as_deref(), function, args),
            ExprKind::List { elements } => (self.check_list(elements), Reference::None),
            ExprKind::Map { entries } => (self.check_map(entries), Reference::None),
            ExprKind::Comprehension(comprehension) => {
                (self.check_comprehension(comprehension), Reference::None)
            }
        };
        self.record(expr.id, ty.clone(), reference);
        ty
    }

    fn record(&mut self, id: i64, ty: Type, reference: Reference) {
        self.checked.types.insert(id, ty);
        self.checked.references.insert(id, reference);
    }

    fn error(&mut self, id: i64, message: String) {
        let span = self.source_info.span(id).unwrap_or(0..0);
        self.errors.push(Diagnostic::error(message, span));
    }

    fn local(&self, name: &str) -> Option<&Type> {
        self.locals.iter().rev().find_map(|frame| frame.get(name))
    }

    /// Resolve a possibly qualified name to a declared variable or a type
    /// name, trying the package's candidates in order.
    fn resolve_ident(&self, name: &str) -> Option<(String, Type)> {
        let scope = self.scope;
        scope.package().candidates(name).into_iter().find_map(|candidate| {
            if let Some(ty) = scope.ident(&candidate) {
                return Some((candidate, ty.clone()));
            }
            let ty = scope.type_provider().find_type(&candidate)?;
            Some((candidate, Type::type_of(ty)))
        })
    }

    fn undeclared(&mut self, id: i64, name: &str) {
        let container = self.scope.package().name().to_string();
        self.error(
            id,
            format!("undeclared reference to '{name}' (in container '{container}')"),
        );
    }

    fn check_ident(&mut self, expr: &Expr, name: &str) -> (Type, Reference) {
        if let Some(ty) = self.local(name) {
            return (
                ty.clone(),
                Reference::Ident {
                    name: name.to_string(),
                },
            );
        }
        match self.resolve_ident(name) {
            Some((name, ty)) => (ty, Reference::Ident { name }),
            None => {
                self.undeclared(expr.id, name);
                (Type::Error, Reference::None)
            }
        }
    }

    /// A qualified name like `a.b.c` whose root is not a comprehension
    /// variable, so it may name a namespaced declaration.
    fn namespaced(&self, expr: &Expr) -> Option<String> {
        let name = expr.qualified_name()?;
        let root = name.split('.').next().unwrap_or_default();
        if !root.is_empty() && self.local(root).is_some() {
            return None;
        }
        Some(name)
    }

    /// Give the nodes of a subtree that was resolved as part of a qualified
    /// name their own (dyn, unresolved) entries.
    fn mark_absorbed(&mut self, expr: &Expr) {
        expr.walk(&mut |node| {
            self.checked.types.insert(node.id, Type::Dyn);
            self.checked.references.insert(node.id, Reference::None);
        });
    }

    fn check_select(
        &mut self,
        expr: &Expr,
        operand: &Expr,
        field: &str,
        test_only: bool,
    ) -> (Type, Reference) {
        if !test_only {
            if let Some((name, ty)) = self
                .namespaced(expr)
                .and_then(|name| self.resolve_ident(&name))
            {
                self.mark_absorbed(operand);
                return (ty, Reference::Ident { name });
            }
        }

        let operand_type = self.check(operand);
        let field_type = match &operand_type {
            Type::Map(key, value) if matches!(**key, Type::String | Type::Dyn) => (**value).clone(),
            Type::Dyn | Type::Error => Type::Dyn,
            other => {
                self.error(
                    expr.id,
                    format!("type '{other}' does not support field selection '.{field}'"),
                );
                Type::Error
            }
        };
        let ty = if test_only { Type::Bool } else { field_type };
        (ty, Reference::None)
    }

    fn check_call(
        &mut self,
        expr: &Expr,
        target: Option<&Expr>,
        function: &str,
        args: &[Expr],
    ) -> (Type, Reference) {
        // `a.b.f(x)` may be a call of the namespaced global `a.b.f`.
        if let Some(target) = target {
            let namespaced = self
                .namespaced(target)
                .and_then(|prefix| self.resolve_function(&format!("{prefix}.{function}")));
            if let Some(name) = namespaced {
                self.mark_absorbed(target);
                return self.resolve_overload(expr, &name, None, args);
            }
        }

        match self.resolve_function(function) {
            Some(name) => self.resolve_overload(expr, &name, target, args),
            None => {
                if let Some(target) = target {
                    self.check(target);
                }
                for arg in args {
                    self.check(arg);
                }
                self.undeclared(expr.id, function);
                (Type::Error, Reference::None)
            }
        }
    }

    fn resolve_function(&self, name: &str) -> Option<String> {
        self.scope
            .package()
            .candidates(name)
            .into_iter()
            .find(|candidate| self.scope.function(candidate).is_some())
    }

    fn resolve_overload(
        &mut self,
        expr: &Expr,
        name: &str,
        target: Option<&Expr>,
        args: &[Expr],
    ) -> (Type, Reference) {
        let mut arg_types = Vec::with_capacity(args.len() + 1);
        if let Some(target) = target {
            arg_types.push(self.check(target));
        }
        for arg in args {
            arg_types.push(self.check(arg));
        }

        let scope = self.scope;
        let Some(function) = scope.function(name) else {
            self.undeclared(expr.id, name);
            return (Type::Error, Reference::None);
        };

        let receiver_style = target.is_some();
        let mut matched: Vec<(String, Type)> = Vec::new();
        for overload in &function.overloads {
            if overload.receiver_style != receiver_style
                || overload.params.len() != arg_types.len()
            {
                continue;
            }
            self.instantiations += 1;
            let (params, result) = overload.instantiate(self.instantiations);
            let mut bindings = HashMap::new();
            let unified = params
                .iter()
                .zip(&arg_types)
                .all(|(param, arg)| unify(param, arg, &mut bindings));
            if unified {
                let result = result.substitute(&|param| bindings.get(param).cloned());
                matched.push((overload.id.clone(), result));
            }
        }

        if matched.is_empty() {
            let rendered = arg_types
                .iter()
                .map(|ty| ty.to_string())
                .collect::<Vec<_>>();
            let applied = if receiver_style {
                format!("{}.({})", rendered[0], rendered[1..].join(", "))
            } else {
                format!("({})", rendered.join(", "))
            };
            self.error(
                expr.id,
                format!("found no matching overload for '{name}' applied to '{applied}'"),
            );
            return (Type::Error, Reference::None);
        }

        let result = matched
            .iter()
            .skip(1)
            .try_fold(matched[0].1.clone(), |common, (_, ty)| {
                (common == *ty).then_some(common)
            })
            .unwrap_or(Type::Dyn);
        let overload_ids = matched.into_iter().map(|(id, _)| id).collect();
        (
            result,
            Reference::Function {
                name: name.to_string(),
                overload_ids,
            },
        )
    }

    fn check_list(&mut self, elements: &[Expr]) -> Type {
        let mut elem: Option<Type> = None;
        for element in elements {
            let ty = self.check(element);
            elem = Some(match elem {
                None => ty,
                Some(current) => self.join_literal(element.id, "list", current, ty),
            });
        }
        Type::list(elem.unwrap_or(Type::Dyn))
    }

    fn check_map(&mut self, entries: &[MapEntry]) -> Type {
        let mut key_type: Option<Type> = None;
        let mut value_type: Option<Type> = None;
        for entry in entries {
            let key = self.check(&entry.key);
            if !key.is_valid_map_key() && key != Type::Error {
                self.error(entry.key.id, format!("unsupported map key type: '{key}'"));
            }
            let value = self.check(&entry.value);
            key_type = Some(match key_type {
                None => key,
                Some(current) => self.join_literal(entry.key.id, "map", current, key),
            });
            value_type = Some(match value_type {
                None => value,
                Some(current) => self.join_literal(entry.value.id, "map", current, value),
            });
        }
        Type::map(
            key_type.unwrap_or(Type::Dyn),
            value_type.unwrap_or(Type::Dyn),
        )
    }

    /// Join two element types of an aggregate literal.
    fn join_literal(&mut self, id: i64, literal: &str, current: Type, next: Type) -> Type {
        if let Some(joined) = join(&current, &next) {
            return joined;
        }
        if self.scope.dynamic_aggregate_literals() {
            return Type::Dyn;
        }
        self.error(
            id,
            format!("type mismatch in {literal} literal: expected '{current}', found '{next}'"),
        );
        Type::Dyn
    }

    fn check_comprehension(&mut self, comprehension: &Comprehension) -> Type {
        let range = self.check(&comprehension.iter_range);
        let iter_type = match &range {
            Type::List(elem) => (**elem).clone(),
            Type::Map(key, _) => (**key).clone(),
            Type::Dyn | Type::Error => Type::Dyn,
            other => {
                self.error(
                    comprehension.iter_range.id,
                    format!(
                        "expression of type '{other}' cannot be the range of a comprehension (must be list, map, or dynamic)"
                    ),
                );
                Type::Dyn
            }
        };

        let accu_type = self.check(&comprehension.accu_init);
        self.locals.push(HashMap::from([(
            comprehension.accu_var.clone(),
            accu_type,
        )]));
        self.locals
            .push(HashMap::from([(comprehension.iter_var.clone(), iter_type)]));
        self.check(&comprehension.loop_condition);
        self.check(&comprehension.loop_step);
        self.locals.pop();
        let result = self.check(&comprehension.result);
        self.locals.pop();
        result
    }
}

/// Bind the type parameters of `param` so that it accepts `arg`. `dyn` and
/// error arguments match anything.
fn unify(param: &Type, arg: &Type, bindings: &mut HashMap<String, Type>) -> bool {
    match (param, arg) {
        (Type::TypeParam(name), _) => {
            let joined = match bindings.get(name.as_ref()) {
                Some(bound) => join(bound, arg),
                None => Some(arg.clone()),
            };
            match joined {
                Some(joined) => {
                    bindings.insert(name.to_string(), joined);
                    true
                }
                None => false,
            }
        }
        (_, Type::Dyn | Type::Error) | (Type::Dyn, _) => true,
        (Type::List(param), Type::List(arg)) => unify(param, arg, bindings),
        (Type::Map(param_key, param_value), Type::Map(arg_key, arg_value)) => {
            unify(param_key, arg_key, bindings) && unify(param_value, arg_value, bindings)
        }
        (Type::Type(Some(param)), Type::Type(Some(arg))) => unify(param, arg, bindings),
        (Type::Type(_), Type::Type(_)) => true,
        _ => param == arg,
    }
}

/// Least common type of two types, if they are compatible.
fn join(a: &Type, b: &Type) -> Option<Type> {
    if a == b {
        return Some(a.clone());
    }
    match (a, b) {
        (Type::Dyn | Type::Error, _) | (_, Type::Dyn | Type::Error) => Some(Type::Dyn),
        (Type::List(a), Type::List(b)) => join(a, b).map(Type::list),
        (Type::Map(ak, av), Type::Map(bk, bv)) => Some(Type::map(join(ak, bk)?, join(av, bv)?)),
        (Type::Type(_), Type::Type(_)) => Some(Type::type_type()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::Package;
    use crate::parser::{ALL_MACROS, SourceCode, parse};

    fn scope_with(decls: &[Decl]) -> Scope {
        let mut all = standard_declarations();
        all.extend_from_slice(decls);
        Scope::bind(&all).unwrap()
    }

    fn check_code(code: &str, scope: &Scope) -> Result<(Expr, Checked), Vec<Diagnostic>> {
        let (expr, info) = parse(&SourceCode::new(code), ALL_MACROS).unwrap();
        check(&expr, &info, scope).map(|checked| (expr, checked))
    }

    fn result_type(code: &str, scope: &Scope) -> Type {
        let (expr, checked) = check_code(code, scope).unwrap();
        checked.types[&expr.id].clone()
    }

    fn first_error(code: &str, scope: &Scope) -> String {
        check_code(code, scope).unwrap_err().remove(0).message
    }

    #[test]
    fn test_literals_and_operators() {
        let scope = scope_with(&[]);
        assert_eq!(result_type("true", &scope), Type::Bool);
        assert_eq!(result_type("1 + 2 * 3", &scope), Type::Int);
        assert_eq!(result_type("1u + 2u", &scope), Type::Uint);
        assert_eq!(result_type("'a' + 'b'", &scope), Type::String);
        assert_eq!(result_type("1 < 2 && 'a' != 'b'", &scope), Type::Bool);
        assert_eq!(result_type("true ? 1 : 2", &scope), Type::Int);
    }

    #[test]
    fn test_no_matching_overload() {
        let scope = scope_with(&[]);
        assert_eq!(
            first_error("1 < \"a\"", &scope),
            "found no matching overload for '_<_' applied to '(int, string)'"
        );
        assert_eq!(
            first_error("'abc'.startsWith(1)", &scope),
            "found no matching overload for 'startsWith' applied to 'string.(int)'"
        );
    }

    #[test]
    fn test_undeclared_reference() {
        let scope = scope_with(&[]).with_package(Package::new("a.b"));
        assert_eq!(
            first_error("x + 1", &scope),
            "undeclared reference to 'x' (in container 'a.b')"
        );
        assert_eq!(
            first_error("nope(1)", &scope),
            "undeclared reference to 'nope' (in container 'a.b')"
        );
    }

    #[test]
    fn test_every_node_is_annotated() {
        let scope = scope_with(&[Decl::ident("xs", Type::list(Type::Int))]);
        let (expr, checked) = check_code("xs.filter(x, x > 1).map(x, x * 2)", &scope).unwrap();
        let mut ids = Vec::new();
        expr.walk(&mut |node| ids.push(node.id));
        for id in ids {
            assert!(checked.types.contains_key(&id), "missing type for {id}");
            assert!(checked.references.contains_key(&id), "missing reference for {id}");
        }
        // The accumulator starts as an empty list, so elements widen to dyn.
        assert_eq!(checked.types[&expr.id], Type::list(Type::Dyn));
    }

    #[test]
    fn test_dyn_operands_match_anything() {
        let scope = scope_with(&[Decl::ident("d", Type::Dyn)]);
        assert_eq!(result_type("d + 1", &scope), Type::Int);
        assert_eq!(result_type("d < 'a'", &scope), Type::Bool);
        assert_eq!(result_type("d.field.other", &scope), Type::Dyn);
        // `_+_` has several overloads a dyn pair could dispatch to.
        let d2 = scope_with(&[Decl::ident("d", Type::Dyn), Decl::ident("e", Type::Dyn)]);
        assert_eq!(result_type("d + e", &d2), Type::Dyn);
    }

    #[test]
    fn test_type_params_bind() {
        let scope = scope_with(&[Decl::ident("m", Type::map(Type::String, Type::Double))]);
        assert_eq!(result_type("m['k']", &scope), Type::Double);
        assert_eq!(result_type("m.k", &scope), Type::Double);
        assert_eq!(result_type("[1, 2][0]", &scope), Type::Int);
        assert_eq!(result_type("[1] + [2]", &scope), Type::list(Type::Int));
        assert_eq!(result_type("'k' in m", &scope), Type::Bool);
        assert_eq!(result_type("has(m.k)", &scope), Type::Bool);
        assert_eq!(result_type("type(1)", &scope), Type::type_of(Type::Int));
        assert!(check_code("m[1]", &scope).is_err());
    }

    #[test]
    fn test_type_names_resolve_to_type_types() {
        let scope = scope_with(&[]);
        assert_eq!(result_type("int", &scope), Type::type_of(Type::Int));
        assert_eq!(result_type("type(1) == int", &scope), Type::Bool);
    }

    #[test]
    fn test_aggregate_literals() {
        let scope = scope_with(&[]);
        assert_eq!(result_type("[1, 2]", &scope), Type::list(Type::Int));
        assert_eq!(result_type("[]", &scope), Type::list(Type::Dyn));
        assert_eq!(result_type("[1, 'a']", &scope), Type::list(Type::Dyn));
        assert_eq!(
            result_type("{'a': 1, 'b': 2}", &scope),
            Type::map(Type::String, Type::Int)
        );

        let strict = scope_with(&[]).with_dynamic_aggregate_literals(false);
        assert_eq!(
            first_error("[1, 'a']", &strict),
            "type mismatch in list literal: expected 'int', found 'string'"
        );
        assert_eq!(
            first_error("{1.5: 'a'}", &strict),
            "unsupported map key type: 'double'"
        );
    }

    #[test]
    fn test_field_selection_on_scalar() {
        let scope = scope_with(&[Decl::ident("x", Type::Int)]);
        assert_eq!(
            first_error("x.y", &scope),
            "type 'int' does not support field selection '.y'"
        );
    }

    #[test]
    fn test_qualified_names_use_package() {
        let scope = scope_with(&[
            Decl::ident("a.b.x", Type::Int),
            Decl::ident("a.y", Type::String),
        ])
        .with_package(Package::new("a.b"));
        assert_eq!(result_type("x", &scope), Type::Int);
        assert_eq!(result_type("y", &scope), Type::String);
        assert_eq!(result_type("a.b.x", &scope), Type::Int);
        assert!(check_code(".x", &scope).is_err());

        let (expr, checked) = check_code("y", &scope).unwrap();
        assert_eq!(
            checked.references[&expr.id],
            Reference::Ident {
                name: "a.y".to_string()
            }
        );
    }

    #[test]
    fn test_namespaced_function() {
        let scope = scope_with(&[Decl::function(
            "math.greatest",
            vec![OverloadDecl::global(
                "math_greatest_int",
                vec![Type::Int, Type::Int],
                Type::Int,
            )],
        )]);
        let (expr, checked) = check_code("math.greatest(1, 2)", &scope).unwrap();
        assert_eq!(checked.types[&expr.id], Type::Int);
        assert!(matches!(
            &checked.references[&expr.id],
            Reference::Function { name, .. } if name == "math.greatest"
        ));
    }

    #[test]
    fn test_comprehension_variables_are_scoped() {
        let scope = scope_with(&[Decl::ident("m", Type::map(Type::String, Type::Int))]);
        assert_eq!(result_type("m.all(k, k.size() > 0)", &scope), Type::Bool);
        assert_eq!(result_type("[1, 2].exists_one(x, x == 2)", &scope), Type::Bool);
        assert!(check_code("[1].all(x, x > 0) && x > 0", &scope).is_err());
        assert_eq!(
            first_error("(1).all(x, true)", &scope),
            "expression of type 'int' cannot be the range of a comprehension (must be list, map, or dynamic)"
        );
    }

    #[test]
    fn test_join() {
        assert_eq!(join(&Type::Int, &Type::Int), Some(Type::Int));
        assert_eq!(join(&Type::Int, &Type::Dyn), Some(Type::Dyn));
        assert_eq!(
            join(&Type::list(Type::Int), &Type::list(Type::Dyn)),
            Some(Type::list(Type::Dyn))
        );
        assert_eq!(join(&Type::Int, &Type::String), None);
    }
}
