//! Expression trees and their annotations.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::sync::Arc;

use crate::parser::SourceCode;
use crate::types::{Type, Value};

/// A node of the expression tree. Ids are unique within one Ast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expr {
    pub id: i64,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExprKind {
    Const(Constant),
    Ident {
        name: String,
    },
    /// `operand.field`, or `has(operand.field)` when `test_only` is set.
    Select {
        operand: Box<Expr>,
        field: String,
        test_only: bool,
    },
    /// Operators are calls too, e.g. `_+_` or `!_`.
    Call {
        target: Option<Box<Expr>>,
        function: String,
        args: Vec<Expr>,
    },
    List {
        elements: Vec<Expr>,
    },
    Map {
        entries: Vec<MapEntry>,
    },
    Comprehension(Box<Comprehension>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapEntry {
    pub key: Expr,
    pub value: Expr,
}

/// Bounded fold over a list or map, produced by macro expansion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comprehension {
    pub iter_var: String,
    pub iter_range: Expr,
    pub accu_var: String,
    pub accu_init: Expr,
    pub loop_condition: Expr,
    pub loop_step: Expr,
    pub result: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Constant {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Double(f64),
    String(Arc<str>),
    Bytes(Arc<[u8]>),
}

impl Constant {
    pub fn to_value(&self) -> Value {
        match self {
            Constant::Null => Value::Null,
            Constant::Bool(value) => Value::Bool(*value),
            Constant::Int(value) => Value::Int(*value),
            Constant::Uint(value) => Value::Uint(*value),
            Constant::Double(value) => Value::double(*value),
            Constant::String(value) => Value::string(value.clone()),
            Constant::Bytes(value) => Value::bytes(value.clone()),
        }
    }

    pub fn type_of(&self) -> Type {
        match self {
            Constant::Null => Type::Null,
            Constant::Bool(_) => Type::Bool,
            Constant::Int(_) => Type::Int,
            Constant::Uint(_) => Type::Uint,
            Constant::Double(_) => Type::Double,
            Constant::String(_) => Type::String,
            Constant::Bytes(_) => Type::Bytes,
        }
    }
}

impl Expr {
    pub fn new(id: i64, kind: ExprKind) -> Self {
        Expr { id, kind }
    }

    /// Visit this node and all of its descendants, parents first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expr)) {
        visit(self);
        match &self.kind {
            ExprKind::Const(_) | ExprKind::Ident { .. } => {}
            ExprKind::Select { operand, .. } => operand.walk(visit),
            ExprKind::Call { target, args, .. } => {
                if let Some(target) = target {
                    target.walk(visit);
                }
                for arg in args {
                    arg.walk(visit);
                }
            }
            ExprKind::List { elements } => {
                for element in elements {
                    element.walk(visit);
                }
            }
            ExprKind::Map { entries } => {
                for entry in entries {
                    entry.key.walk(visit);
                    entry.value.walk(visit);
                }
            }
            ExprKind::Comprehension(comprehension) => {
                comprehension.iter_range.walk(visit);
                comprehension.accu_init.walk(visit);
                comprehension.loop_condition.walk(visit);
                comprehension.loop_step.walk(visit);
                comprehension.result.walk(visit);
            }
        }
    }

    /// Dotted name for a chain of plain selects over an identifier, e.g.
    /// `a.b.c`.
    pub fn qualified_name(&self) -> Option<String> {
        match &self.kind {
            ExprKind::Ident { name } => Some(name.clone()),
            ExprKind::Select {
                operand,
                field,
                test_only: false,
            } => operand
                .qualified_name()
                .map(|prefix| format!("{prefix}.{field}")),
            _ => None,
        }
    }
}

/// Byte ranges of every node in the source text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceInfo {
    spans: BTreeMap<i64, (usize, usize)>,
}

impl SourceInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: i64, span: Range<usize>) {
        self.spans.insert(id, (span.start, span.end));
    }

    /// Start offset of node `id`.
    pub fn offset(&self, id: i64) -> Option<usize> {
        self.spans.get(&id).map(|(start, _)| *start)
    }

    pub fn span(&self, id: i64) -> Option<Range<usize>> {
        self.spans.get(&id).map(|(start, end)| *start..*end)
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

/// What a checked identifier, select or call resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Reference {
    /// The node needs no resolution (literals, aggregates, plain selects).
    None,
    /// A declared variable or type name, fully qualified.
    Ident { name: String },
    /// The overloads a call may dispatch to.
    Function {
        name: String,
        overload_ids: Vec<String>,
    },
}

pub type ReferenceMap = HashMap<i64, Reference>;
pub type TypeMap = HashMap<i64, Type>;

/// A parsed expression, optionally annotated by the checker.
#[derive(Debug, Clone)]
pub struct Ast {
    expr: Arc<Expr>,
    source: SourceCode,
    source_info: Arc<SourceInfo>,
    references: Option<Arc<ReferenceMap>>,
    types: Option<Arc<TypeMap>>,
}

impl Ast {
    pub fn new(expr: Expr, source: SourceCode, source_info: SourceInfo) -> Self {
        Ast {
            expr: Arc::new(expr),
            source,
            source_info: Arc::new(source_info),
            references: None,
            types: None,
        }
    }

    /// Assemble an Ast from parts; checked iff both maps are present.
    pub fn from_parts(
        expr: Expr,
        source: SourceCode,
        source_info: SourceInfo,
        references: Option<ReferenceMap>,
        types: Option<TypeMap>,
    ) -> Self {
        Ast {
            expr: Arc::new(expr),
            source,
            source_info: Arc::new(source_info),
            references: references.map(Arc::new),
            types: types.map(Arc::new),
        }
    }

    /// A new Ast sharing this one's tree and source, carrying the given
    /// annotations.
    pub(crate) fn annotated(&self, references: ReferenceMap, types: TypeMap) -> Self {
        Ast {
            expr: self.expr.clone(),
            source: self.source.clone(),
            source_info: self.source_info.clone(),
            references: Some(Arc::new(references)),
            types: Some(Arc::new(types)),
        }
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn source(&self) -> &SourceCode {
        &self.source
    }

    pub fn source_info(&self) -> &SourceInfo {
        &self.source_info
    }

    pub fn is_checked(&self) -> bool {
        self.references.is_some() && self.types.is_some()
    }

    /// Type of the root node, `dyn` until checked.
    pub fn result_type(&self) -> Type {
        if !self.is_checked() {
            return Type::Dyn;
        }
        self.type_of(self.expr.id).cloned().unwrap_or(Type::Dyn)
    }

    pub fn type_of(&self, id: i64) -> Option<&Type> {
        self.types.as_ref()?.get(&id)
    }

    pub fn reference(&self, id: i64) -> Option<&Reference> {
        self.references.as_ref()?.get(&id)
    }

    pub fn references(&self) -> Option<&ReferenceMap> {
        self.references.as_deref()
    }

    pub fn types(&self) -> Option<&TypeMap> {
        self.types.as_deref()
    }

    /// Whether `other` shares this Ast's tree and source text.
    pub fn shares_source_with(&self, other: &Ast) -> bool {
        Arc::ptr_eq(&self.expr, &other.expr) && Arc::ptr_eq(&self.source_info, &other.source_info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(id: i64, name: &str) -> Expr {
        Expr::new(id, ExprKind::Ident { name: name.to_string() })
    }

    fn sample() -> Ast {
        let expr = Expr::new(
            3,
            ExprKind::Select {
                operand: Box::new(Expr::new(
                    2,
                    ExprKind::Select {
                        operand: Box::new(ident(1, "a")),
                        field: "b".to_string(),
                        test_only: false,
                    },
                )),
                field: "c".to_string(),
                test_only: false,
            },
        );
        Ast::new(expr, SourceCode::new("a.b.c"), SourceInfo::new())
    }

    #[test]
    fn test_unchecked_result_type_is_dyn() {
        let ast = sample();
        assert!(!ast.is_checked());
        assert_eq!(ast.result_type(), Type::Dyn);
    }

    #[test]
    fn test_checked_requires_both_maps() {
        let ast = sample();
        let only_types = Ast::from_parts(
            ast.expr().clone(),
            ast.source().clone(),
            SourceInfo::new(),
            None,
            Some(TypeMap::from([(3, Type::Int)])),
        );
        assert!(!only_types.is_checked());
        assert_eq!(only_types.result_type(), Type::Dyn);

        let checked = ast.annotated(
            ReferenceMap::from([(3, Reference::Ident { name: "a.b.c".into() })]),
            TypeMap::from([(3, Type::Int)]),
        );
        assert!(checked.is_checked());
        assert_eq!(checked.result_type(), Type::Int);
        assert!(checked.shares_source_with(&ast));
        assert!(!ast.is_checked());
    }

    #[test]
    fn test_qualified_name_and_walk() {
        let ast = sample();
        assert_eq!(ast.expr().qualified_name().as_deref(), Some("a.b.c"));
        let mut ids = Vec::new();
        ast.expr().walk(&mut |expr| ids.push(expr.id));
        assert_eq!(ids, vec![3, 2, 1]);
    }
}
