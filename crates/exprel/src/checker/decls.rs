use serde::Serialize;
use std::collections::BTreeSet;

use crate::types::Type;

/// A variable or function made visible to expressions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Decl {
    Ident(IdentDecl),
    Function(FunctionDecl),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentDecl {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDecl {
    pub name: String,
    pub overloads: Vec<OverloadDecl>,
}

/// One signature of a function. For receiver-style overloads the receiver is
/// `params[0]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverloadDecl {
    pub id: String,
    pub params: Vec<Type>,
    pub result: Type,
    pub receiver_style: bool,
    /// Names of the type parameters mentioned by `params` and `result`.
    pub type_params: Vec<String>,
}

impl Decl {
    pub fn ident(name: impl Into<String>, ty: Type) -> Self {
        Decl::Ident(IdentDecl {
            name: name.into(),
            ty,
        })
    }

    pub fn function(name: impl Into<String>, overloads: Vec<OverloadDecl>) -> Self {
        Decl::Function(FunctionDecl {
            name: name.into(),
            overloads,
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Decl::Ident(ident) => &ident.name,
            Decl::Function(function) => &function.name,
        }
    }
}

impl OverloadDecl {
    /// `f(params) -> result`
    pub fn global(id: impl Into<String>, params: Vec<Type>, result: Type) -> Self {
        Self::new(id.into(), params, result, false)
    }

    /// `params[0].f(params[1..]) -> result`
    pub fn member(id: impl Into<String>, params: Vec<Type>, result: Type) -> Self {
        Self::new(id.into(), params, result, true)
    }

    fn new(id: String, params: Vec<Type>, result: Type, receiver_style: bool) -> Self {
        let mut names = BTreeSet::new();
        for ty in params.iter().chain(std::iter::once(&result)) {
            collect_params(ty, &mut names);
        }
        OverloadDecl {
            id,
            params,
            result,
            receiver_style,
            type_params: names.into_iter().collect(),
        }
    }

    /// Copy of this overload with its type parameters renamed apart, so
    /// bindings from different overloads or call sites never collide.
    pub(crate) fn instantiate(&self, suffix: usize) -> (Vec<Type>, Type) {
        if self.type_params.is_empty() {
            return (self.params.clone(), self.result.clone());
        }
        let rename = |name: &str| Some(Type::param(format!("{name}#{suffix}")));
        let params = self
            .params
            .iter()
            .map(|param| rename_params(param, &rename))
            .collect();
        (params, rename_params(&self.result, &rename))
    }
}

fn rename_params(ty: &Type, rename: &impl Fn(&str) -> Option<Type>) -> Type {
    if ty.has_params() {
        ty.substitute(rename)
    } else {
        ty.clone()
    }
}

fn collect_params(ty: &Type, names: &mut BTreeSet<String>) {
    match ty {
        Type::TypeParam(name) => {
            names.insert(name.to_string());
        }
        Type::List(elem) => collect_params(elem, names),
        Type::Map(key, value) => {
            collect_params(key, names);
            collect_params(value, names);
        }
        Type::Type(Some(param)) => collect_params(param, names),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_params_are_collected() {
        let overload = OverloadDecl::global(
            "index_map",
            vec![Type::map(Type::param("K"), Type::param("V")), Type::param("K")],
            Type::param("V"),
        );
        assert_eq!(overload.type_params, vec!["K".to_string(), "V".to_string()]);
        assert!(!overload.receiver_style);
    }

    #[test]
    fn test_instantiate_renames_params() {
        let overload =
            OverloadDecl::member("size_list", vec![Type::list(Type::param("A"))], Type::Int);
        let (params, result) = overload.instantiate(3);
        assert_eq!(params, vec![Type::list(Type::param("A#3"))]);
        assert_eq!(result, Type::Int);
    }
}
