//! Syntactic macros, expanded while the parse tree is lowered.
//!
//! Each comprehension macro turns into a bounded fold over its target:
//! `list.all(x, p)` becomes a comprehension whose accumulator starts `true`
//! and is and-ed with `p` for every element.

use std::ops::Range;

use super::Lowering;
use crate::ast::{Comprehension, Constant, Expr, ExprKind};

/// Name of the accumulator variable introduced by comprehension macros.
pub const ACCUMULATOR: &str = "__result__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Macro {
    /// `has(m.f)`
    Has,
    /// `r.all(x, p)`
    All,
    /// `r.exists(x, p)`
    Exists,
    /// `r.exists_one(x, p)`
    ExistsOne,
    /// `r.map(x, f)`
    Map,
    /// `r.map(x, p, f)`
    MapFilter,
    /// `r.filter(x, p)`
    Filter,
}

pub const ALL_MACROS: &[Macro] = &[
    Macro::Has,
    Macro::All,
    Macro::Exists,
    Macro::ExistsOne,
    Macro::Map,
    Macro::MapFilter,
    Macro::Filter,
];

impl Macro {
    pub fn function(self) -> &'static str {
        match self {
            Macro::Has => "has",
            Macro::All => "all",
            Macro::Exists => "exists",
            Macro::ExistsOne => "exists_one",
            Macro::Map | Macro::MapFilter => "map",
            Macro::Filter => "filter",
        }
    }

    pub fn arg_count(self) -> usize {
        match self {
            Macro::Has => 1,
            Macro::MapFilter => 3,
            _ => 2,
        }
    }

    pub fn receiver_style(self) -> bool {
        !matches!(self, Macro::Has)
    }

    /// Unique key, e.g. `map:3:true`.
    pub fn key(self) -> String {
        format!(
            "{}:{}:{}",
            self.function(),
            self.arg_count(),
            self.receiver_style()
        )
    }

    pub(super) fn matches(self, function: &str, arg_count: usize, receiver_style: bool) -> bool {
        self.function() == function
            && self.arg_count() == arg_count
            && self.receiver_style() == receiver_style
    }

    pub(super) fn expand(
        self,
        lowering: &mut Lowering,
        span: Range<usize>,
        target: Option<Expr>,
        mut args: Vec<Expr>,
    ) -> Result<Expr, String> {
        if self == Macro::Has {
            return match args.pop() {
                Some(Expr {
                    id,
                    kind:
                        ExprKind::Select {
                            operand,
                            field,
                            test_only: false,
                        },
                }) => Ok(Expr::new(
                    id,
                    ExprKind::Select {
                        operand,
                        field,
                        test_only: true,
                    },
                )),
                _ => Err("invalid argument to has() macro".to_string()),
            };
        }

        let Some(range) = target else {
            return Err(format!("{}() requires a receiver", self.function()));
        };
        let mut args = args.into_iter();
        let iter_var = match args.next() {
            Some(Expr {
                kind: ExprKind::Ident { name },
                ..
            }) if !name.starts_with('.') => name,
            _ => return Err("argument must be a simple name".to_string()),
        };
        let first = args.next();
        let second = args.next();

        let mut fold = Fold {
            lowering,
            span: span.clone(),
        };
        let (init, condition, step, result) = match (self, first, second) {
            (Macro::All, Some(predicate), None) => {
                let accumulator = fold.accumulator();
                let condition = fold.call("@not_strictly_false", vec![accumulator]);
                let accumulator = fold.accumulator();
                let step = fold.call("_&&_", vec![accumulator, predicate]);
                (fold.constant(Constant::Bool(true)), condition, step, fold.accumulator())
            }
            (Macro::Exists, Some(predicate), None) => {
                let accumulator = fold.accumulator();
                let negated = fold.call("!_", vec![accumulator]);
                let condition = fold.call("@not_strictly_false", vec![negated]);
                let accumulator = fold.accumulator();
                let step = fold.call("_||_", vec![accumulator, predicate]);
                (fold.constant(Constant::Bool(false)), condition, step, fold.accumulator())
            }
            (Macro::ExistsOne, Some(predicate), None) => {
                let accumulator = fold.accumulator();
                let one = fold.constant(Constant::Int(1));
                let incremented = fold.call("_+_", vec![accumulator, one]);
                let unchanged = fold.accumulator();
                let step = fold.call("_?_:_", vec![predicate, incremented, unchanged]);
                let accumulator = fold.accumulator();
                let one = fold.constant(Constant::Int(1));
                let result = fold.call("_==_", vec![accumulator, one]);
                (
                    fold.constant(Constant::Int(0)),
                    fold.constant(Constant::Bool(true)),
                    step,
                    result,
                )
            }
            (Macro::Map, Some(transform), None) => {
                let step = fold.append(transform);
                (fold.empty_list(), fold.constant(Constant::Bool(true)), step, fold.accumulator())
            }
            (Macro::MapFilter, Some(predicate), Some(transform)) => {
                let appended = fold.append(transform);
                let unchanged = fold.accumulator();
                let step = fold.call("_?_:_", vec![predicate, appended, unchanged]);
                (fold.empty_list(), fold.constant(Constant::Bool(true)), step, fold.accumulator())
            }
            (Macro::Filter, Some(predicate), None) => {
                let element = fold.ident(&iter_var);
                let appended = fold.append(element);
                let unchanged = fold.accumulator();
                let step = fold.call("_?_:_", vec![predicate, appended, unchanged]);
                (fold.empty_list(), fold.constant(Constant::Bool(true)), step, fold.accumulator())
            }
            _ => return Err(format!("wrong number of arguments to {}()", self.function())),
        };

        Ok(fold.expr(ExprKind::Comprehension(Box::new(Comprehension {
            iter_var,
            iter_range: range,
            accu_var: ACCUMULATOR.to_string(),
            accu_init: init,
            loop_condition: condition,
            loop_step: step,
            result,
        }))))
    }
}

/// Builds the synthetic nodes of one expansion, all located at the macro call.
struct Fold<'l, 'm> {
    lowering: &'l mut Lowering<'m>,
    span: Range<usize>,
}

impl Fold<'_, '_> {
    fn expr(&mut self, kind: ExprKind) -> Expr {
        let id = self.lowering.next_id(self.span.clone());
        Expr::new(id, kind)
    }

    fn ident(&mut self, name: &str) -> Expr {
        self.expr(ExprKind::Ident {
            name: name.to_string(),
        })
    }

    fn accumulator(&mut self) -> Expr {
        self.ident(ACCUMULATOR)
    }

    fn constant(&mut self, constant: Constant) -> Expr {
        self.expr(ExprKind::Const(constant))
    }

    fn empty_list(&mut self) -> Expr {
        self.expr(ExprKind::List {
            elements: Vec::new(),
        })
    }

    fn call(&mut self, function: &str, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Call {
            target: None,
            function: function.to_string(),
            args,
        })
    }

    /// `__result__ + [element]`
    fn append(&mut self, element: Expr) -> Expr {
        let accumulator = self.accumulator();
        let list = self.expr(ExprKind::List {
            elements: vec![element],
        });
        self.call("_+_", vec![accumulator, list])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_unique() {
        let mut keys: Vec<String> = ALL_MACROS.iter().map(|m| m.key()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), ALL_MACROS.len());
        assert_eq!(Macro::MapFilter.key(), "map:3:true");
    }

    #[test]
    fn test_matches_on_shape() {
        assert!(Macro::Has.matches("has", 1, false));
        assert!(!Macro::Has.matches("has", 1, true));
        assert!(Macro::Map.matches("map", 2, true));
        assert!(!Macro::Map.matches("map", 3, true));
    }
}
