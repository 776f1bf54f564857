//! The environment: configuration shared by parsing, checking and program
//! planning.

use std::sync::Arc;
use thiserror::Error;

use crate::ast::Ast;
use crate::checker::{self, Decl, DeclError, Scope, standard_declarations};
use crate::functions::standard_overloads;
use crate::issues::Issues;
use crate::packages::Package;
use crate::parser::{self, ALL_MACROS, Macro, SourceCode};
use crate::program::{Dispatcher, Program, ProgramError, ProgramOptions};
use crate::types::{Registry, RegistryError, Type, TypeAdapter, TypeProvider};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvError {
    #[error(transparent)]
    Declaration(#[from] DeclError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("invalid container name '{0}'")]
    InvalidContainer(String),
}

/// Immutable configuration for compiling expressions. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Env {
    declarations: Arc<[Decl]>,
    macros: Arc<[Macro]>,
    package: Package,
    registry: Registry,
    type_provider: Option<Arc<dyn TypeProvider>>,
    type_adapter: Option<Arc<dyn TypeAdapter>>,
    builtins: bool,
    dynamic_aggregate_literals: bool,
    scope: Arc<Scope>,
}

/// Accumulates configuration for an [`Env`]. Nothing is validated until
/// [`EnvBuilder::build`].
#[derive(Debug, Clone)]
pub struct EnvBuilder {
    declarations: Vec<Decl>,
    macros: Vec<Macro>,
    container: String,
    registry: Registry,
    types: Vec<(String, Type)>,
    type_provider: Option<Arc<dyn TypeProvider>>,
    type_adapter: Option<Arc<dyn TypeAdapter>>,
    builtins: bool,
    dynamic_aggregate_literals: bool,
}

impl Default for EnvBuilder {
    fn default() -> Self {
        EnvBuilder {
            declarations: Vec::new(),
            macros: ALL_MACROS.to_vec(),
            container: String::new(),
            registry: Registry::default(),
            types: Vec::new(),
            type_provider: None,
            type_adapter: None,
            builtins: true,
            dynamic_aggregate_literals: true,
        }
    }
}

impl EnvBuilder {
    pub fn declarations(mut self, declarations: impl IntoIterator<Item = Decl>) -> Self {
        self.declarations.extend(declarations);
        self
    }

    pub fn clear_declarations(mut self) -> Self {
        self.declarations.clear();
        self
    }

    pub fn macros(mut self, macros: impl IntoIterator<Item = Macro>) -> Self {
        for new in macros {
            if !self.macros.contains(&new) {
                self.macros.push(new);
            }
        }
        self
    }

    pub fn clear_macros(mut self) -> Self {
        self.macros.clear();
        self
    }

    /// Namespace unqualified names are resolved in, e.g. `com.example`.
    pub fn container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }

    pub fn type_provider(mut self, type_provider: Arc<dyn TypeProvider>) -> Self {
        self.type_provider = Some(type_provider);
        self
    }

    pub fn type_adapter(mut self, type_adapter: Arc<dyn TypeAdapter>) -> Self {
        self.type_adapter = Some(type_adapter);
        self
    }

    /// Register extra named types with the built-in registry.
    pub fn types(mut self, types: impl IntoIterator<Item = (String, Type)>) -> Self {
        self.types.extend(types);
        self
    }

    /// Whether the standard declarations and functions are included.
    pub fn builtins(mut self, enabled: bool) -> Self {
        self.builtins = enabled;
        self
    }

    /// Whether mixed-type list and map literals are typed `dyn` instead of
    /// being rejected.
    pub fn dynamic_aggregate_literals(mut self, enabled: bool) -> Self {
        self.dynamic_aggregate_literals = enabled;
        self
    }

    pub fn build(self) -> Result<Env, EnvError> {
        let package = Package::new(self.container.as_str());
        if !package.is_valid() {
            return Err(EnvError::InvalidContainer(self.container));
        }

        let mut registry = self.registry;
        for (name, ty) in self.types {
            registry.register(name, ty)?;
        }
        let type_provider: Arc<dyn TypeProvider> = match &self.type_provider {
            Some(provider) => provider.clone(),
            None => Arc::new(registry.clone()),
        };

        let mut bound = if self.builtins {
            standard_declarations()
        } else {
            Vec::new()
        };
        bound.extend(self.declarations.iter().cloned());
        let scope = Scope::bind(&bound)?
            .with_package(package.clone())
            .with_type_provider(type_provider)
            .with_dynamic_aggregate_literals(self.dynamic_aggregate_literals);

        log::debug!(
            "built environment: {} declarations, {} macros, container '{}'",
            self.declarations.len(),
            self.macros.len(),
            package
        );
        Ok(Env {
            declarations: self.declarations.into(),
            macros: self.macros.into(),
            package,
            registry,
            type_provider: self.type_provider,
            type_adapter: self.type_adapter,
            builtins: self.builtins,
            dynamic_aggregate_literals: self.dynamic_aggregate_literals,
            scope: Arc::new(scope),
        })
    }
}

impl Env {
    /// An environment with the standard library and no extra declarations.
    pub fn new() -> Result<Env, EnvError> {
        EnvBuilder::default().build()
    }

    pub fn builder() -> EnvBuilder {
        EnvBuilder::default()
    }

    /// A builder seeded with this environment's configuration. The
    /// environment itself is left untouched.
    pub fn extend(&self) -> EnvBuilder {
        EnvBuilder {
            declarations: self.declarations.to_vec(),
            macros: self.macros.to_vec(),
            container: self.package.name().to_string(),
            registry: self.registry.clone(),
            types: Vec::new(),
            type_provider: self.type_provider.clone(),
            type_adapter: self.type_adapter.clone(),
            builtins: self.builtins,
            dynamic_aggregate_literals: self.dynamic_aggregate_literals,
        }
    }

    pub fn parse(&self, code: &str) -> (Option<Ast>, Issues) {
        self.parse_source(SourceCode::new(code))
    }

    pub fn parse_source(&self, source: SourceCode) -> (Option<Ast>, Issues) {
        match parser::parse(&source, &self.macros) {
            Ok((expr, source_info)) => (
                Some(Ast::new(expr, source.clone(), source_info)),
                Issues::new(source),
            ),
            Err(diagnostics) => (None, Issues::from_diagnostics(source, diagnostics)),
        }
    }

    /// Type-check `ast`, returning a new annotated Ast. `ast` is not
    /// modified.
    pub fn check(&self, ast: &Ast) -> (Option<Ast>, Issues) {
        let source = ast.source().clone();
        match checker::check(ast.expr(), ast.source_info(), &self.scope) {
            Ok(checked) => (
                Some(ast.annotated(checked.references, checked.types)),
                Issues::new(source),
            ),
            Err(diagnostics) => (None, Issues::from_diagnostics(source, diagnostics)),
        }
    }

    /// Parse then check.
    pub fn compile(&self, code: &str) -> (Option<Ast>, Issues) {
        let (ast, mut issues) = self.parse(code);
        let Some(ast) = ast else {
            return (None, issues);
        };
        let (checked, check_issues) = self.check(&ast);
        issues.append(check_issues);
        (checked, issues)
    }

    /// Bind `ast` to the function table: the standard functions when
    /// builtins are enabled, then the functions in `options`.
    pub fn program(&self, ast: &Ast, options: ProgramOptions) -> Result<Program, ProgramError> {
        let mut dispatcher = Dispatcher::new();
        if self.builtins {
            dispatcher.extend(standard_overloads());
        }
        Program::plan(
            ast,
            dispatcher,
            options,
            self.package.clone(),
            self.type_provider_arc(),
        )
    }

    fn type_provider_arc(&self) -> Arc<dyn TypeProvider> {
        match &self.type_provider {
            Some(provider) => provider.clone(),
            None => Arc::new(self.registry.clone()),
        }
    }

    pub fn type_provider(&self) -> &dyn TypeProvider {
        match &self.type_provider {
            Some(provider) => provider.as_ref(),
            None => &self.registry,
        }
    }

    pub fn type_adapter(&self) -> &dyn TypeAdapter {
        match &self.type_adapter {
            Some(adapter) => adapter.as_ref(),
            None => &self.registry,
        }
    }

    pub fn declarations(&self) -> &[Decl] {
        &self.declarations
    }

    pub fn macros(&self) -> &[Macro] {
        &self.macros
    }

    pub fn container(&self) -> &str {
        self.package.name()
    }

    pub fn builtins(&self) -> bool {
        self.builtins
    }

    pub fn dynamic_aggregate_literals(&self) -> bool {
        self.dynamic_aggregate_literals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    #[test]
    fn test_defaults() {
        let env = Env::new().unwrap();
        assert!(env.builtins());
        assert!(env.dynamic_aggregate_literals());
        assert_eq!(env.macros().len(), ALL_MACROS.len());
        assert_eq!(env.container(), "");
        assert!(env.type_provider().find_type("int").is_some());
    }

    #[test]
    fn test_extend_leaves_parent_untouched() {
        let parent = Env::builder()
            .declarations([Decl::ident("x", Type::Int)])
            .build()
            .unwrap();
        let child = parent
            .extend()
            .declarations([Decl::ident("y", Type::String)])
            .container("a.b")
            .build()
            .unwrap();
        assert_eq!(parent.declarations().len(), 1);
        assert_eq!(child.declarations().len(), 2);
        assert_eq!(parent.container(), "");

        // A failing extension leaves the parent usable too.
        let failed = parent
            .extend()
            .declarations([Decl::ident("x", Type::String)])
            .build();
        assert!(matches!(failed, Err(EnvError::Declaration(_))));
        assert!(parent.compile("x + 1").0.is_some());
    }

    #[test]
    fn test_invalid_container() {
        let error = Env::builder().container("a..b").build().unwrap_err();
        assert_eq!(error, EnvError::InvalidContainer("a..b".to_string()));
    }

    #[test]
    fn test_without_builtins() {
        let env = Env::builder().builtins(false).build().unwrap();
        let (ast, issues) = env.compile("1 + 2");
        assert!(ast.is_none());
        assert!(issues.has_errors());
    }

    #[test]
    fn test_registered_types() {
        let env = Env::builder()
            .types([("my.Money".to_string(), Type::map(Type::String, Type::Int))])
            .build()
            .unwrap();
        let (ast, issues) = env.compile("type({'a': 1}) == my.Money");
        assert!(issues.is_empty(), "{issues}");
        assert_eq!(ast.unwrap().result_type(), Type::Bool);
    }

    #[test]
    fn test_program_requires_implementations() {
        let env = Env::builder()
            .declarations([Decl::function(
                "double_it",
                vec![checker::OverloadDecl::global("double_it_int", vec![Type::Int], Type::Int)],
            )])
            .build()
            .unwrap();
        let (ast, _) = env.compile("double_it(2)");
        let ast = ast.unwrap();
        let error = env.program(&ast, ProgramOptions::new()).unwrap_err();
        assert!(matches!(
            error,
            ProgramError::UnknownFunction { ref function, .. } if function == "double_it"
        ));

        let options = ProgramOptions::new().function(
            crate::program::Function::new("double_it", |args| match args {
                [Value::Int(value)] => Value::Int(value * 2),
                _ => Value::error("no such overload"),
            }),
        );
        let program = env.program(&ast, options).unwrap();
        assert_eq!(program.eval(&crate::program::EmptyActivation), Value::Int(4));
    }
}
