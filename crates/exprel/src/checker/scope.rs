use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use super::decls::{Decl, FunctionDecl, OverloadDecl};
use crate::packages::Package;
use crate::types::{Registry, Type, TypeProvider};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeclError {
    #[error("identifier '{name}' declared as both '{first}' and '{second}'")]
    DuplicateIdent {
        name: String,
        first: Type,
        second: Type,
    },
    #[error("overload '{id}' redeclared with a different signature in '{function}'")]
    OverloadRedefined { function: String, id: String },
    #[error("overload '{id}' of '{function}' overlaps with overload '{existing}'")]
    OverlappingOverload {
        function: String,
        id: String,
        existing: String,
    },
}

/// Everything the checker resolves names against: bound declarations, the
/// package that qualifies them and the type provider.
#[derive(Debug, Clone)]
pub struct Scope {
    idents: HashMap<String, Type>,
    functions: IndexMap<String, FunctionDecl>,
    package: Package,
    type_provider: Arc<dyn TypeProvider>,
    dynamic_aggregate_literals: bool,
}

impl Scope {
    /// Bind declarations in order. Functions declared more than once have
    /// their overloads merged.
    pub fn bind(decls: &[Decl]) -> Result<Scope, DeclError> {
        let mut idents: HashMap<String, Type> = HashMap::new();
        let mut functions: IndexMap<String, FunctionDecl> = IndexMap::new();
        let mut overload_owners: HashMap<String, String> = HashMap::new();

        for decl in decls {
            match decl {
                Decl::Ident(ident) => match idents.get(&ident.name) {
                    Some(existing) if *existing != ident.ty => {
                        return Err(DeclError::DuplicateIdent {
                            name: ident.name.clone(),
                            first: existing.clone(),
                            second: ident.ty.clone(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        idents.insert(ident.name.clone(), ident.ty.clone());
                    }
                },
                Decl::Function(function) => {
                    let merged = functions
                        .entry(function.name.clone())
                        .or_insert_with(|| FunctionDecl {
                            name: function.name.clone(),
                            overloads: Vec::new(),
                        });
                    for overload in &function.overloads {
                        add_overload(merged, overload, &mut overload_owners)?;
                    }
                }
            }
        }

        Ok(Scope {
            idents,
            functions,
            package: Package::root(),
            type_provider: Arc::new(Registry::default()),
            dynamic_aggregate_literals: true,
        })
    }

    pub fn with_package(mut self, package: Package) -> Self {
        self.package = package;
        self
    }

    pub fn with_type_provider(mut self, type_provider: Arc<dyn TypeProvider>) -> Self {
        self.type_provider = type_provider;
        self
    }

    pub fn with_dynamic_aggregate_literals(mut self, enabled: bool) -> Self {
        self.dynamic_aggregate_literals = enabled;
        self
    }

    pub fn ident(&self, name: &str) -> Option<&Type> {
        self.idents.get(name)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDecl> {
        self.functions.get(name)
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionDecl> {
        self.functions.values()
    }

    pub fn package(&self) -> &Package {
        &self.package
    }

    pub fn type_provider(&self) -> &dyn TypeProvider {
        self.type_provider.as_ref()
    }

    pub fn dynamic_aggregate_literals(&self) -> bool {
        self.dynamic_aggregate_literals
    }
}

fn add_overload(
    function: &mut FunctionDecl,
    overload: &OverloadDecl,
    owners: &mut HashMap<String, String>,
) -> Result<(), DeclError> {
    let redefined = || DeclError::OverloadRedefined {
        function: function.name.clone(),
        id: overload.id.clone(),
    };
    if let Some(owner) = owners.get(&overload.id) {
        if *owner != function.name {
            return Err(redefined());
        }
        return match function.overloads.iter().find(|o| o.id == overload.id) {
            Some(existing) if existing == overload => Ok(()),
            _ => Err(redefined()),
        };
    }
    if let Some(existing) = function.overloads.iter().find(|o| overlaps(o, overload)) {
        return Err(DeclError::OverlappingOverload {
            function: function.name.clone(),
            id: overload.id.clone(),
            existing: existing.id.clone(),
        });
    }
    owners.insert(overload.id.clone(), function.name.clone());
    function.overloads.push(overload.clone());
    Ok(())
}

/// Two overloads overlap when some call could match both.
fn overlaps(a: &OverloadDecl, b: &OverloadDecl) -> bool {
    a.receiver_style == b.receiver_style
        && a.params.len() == b.params.len()
        && a
            .params
            .iter()
            .zip(&b.params)
            .all(|(a, b)| types_overlap(a, b))
}

fn types_overlap(a: &Type, b: &Type) -> bool {
    match (a, b) {
        (Type::Dyn | Type::TypeParam(_), _) | (_, Type::Dyn | Type::TypeParam(_)) => true,
        (Type::List(a), Type::List(b)) => types_overlap(a, b),
        (Type::Map(ka, va), Type::Map(kb, vb)) => types_overlap(ka, kb) && types_overlap(va, vb),
        (Type::Type(Some(a)), Type::Type(Some(b))) => types_overlap(a, b),
        (Type::Type(_), Type::Type(_)) => true,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_functions_merge() {
        let scope = Scope::bind(&[
            Decl::function(
                "f",
                vec![OverloadDecl::global("f_int", vec![Type::Int], Type::Int)],
            ),
            Decl::function(
                "f",
                vec![OverloadDecl::global("f_string", vec![Type::String], Type::Int)],
            ),
        ])
        .unwrap();
        assert_eq!(scope.function("f").unwrap().overloads.len(), 2);
    }

    #[test]
    fn test_same_ident_twice_is_fine() {
        let scope =
            Scope::bind(&[Decl::ident("x", Type::Int), Decl::ident("x", Type::Int)]).unwrap();
        assert_eq!(scope.ident("x"), Some(&Type::Int));
    }

    #[test]
    fn test_ident_with_conflicting_type() {
        let error = Scope::bind(&[Decl::ident("x", Type::Int), Decl::ident("x", Type::String)])
            .unwrap_err();
        assert!(matches!(error, DeclError::DuplicateIdent { ref name, .. } if name == "x"));
    }

    #[test]
    fn test_overload_redefined() {
        let error = Scope::bind(&[
            Decl::function("f", vec![OverloadDecl::global("f_int", vec![Type::Int], Type::Int)]),
            Decl::function("f", vec![OverloadDecl::global("f_int", vec![Type::Uint], Type::Int)]),
        ])
        .unwrap_err();
        assert!(matches!(error, DeclError::OverloadRedefined { .. }));

        let same = OverloadDecl::global("f_int", vec![Type::Int], Type::Int);
        assert!(
            Scope::bind(&[
                Decl::function("f", vec![same.clone()]),
                Decl::function("f", vec![same]),
            ])
            .is_ok()
        );
    }

    #[test]
    fn test_overlapping_overloads() {
        let error = Scope::bind(&[Decl::function(
            "f",
            vec![
                OverloadDecl::global("f_list_int", vec![Type::list(Type::Int)], Type::Int),
                OverloadDecl::global("f_list_any", vec![Type::list(Type::param("A"))], Type::Int),
            ],
        )])
        .unwrap_err();
        assert!(matches!(
            error,
            DeclError::OverlappingOverload { ref existing, .. } if existing == "f_list_int"
        ));

        // Receiver style and arity keep signatures apart.
        assert!(
            Scope::bind(&[Decl::function(
                "f",
                vec![
                    OverloadDecl::global("f_dyn", vec![Type::Dyn], Type::Int),
                    OverloadDecl::member("dyn_f", vec![Type::Dyn], Type::Int),
                    OverloadDecl::global("f_dyn_dyn", vec![Type::Dyn, Type::Dyn], Type::Int),
                ],
            )])
            .is_ok()
        );
    }
}
