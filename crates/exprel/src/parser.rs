use chumsky::{input::ValueInput, pratt::*, prelude::*};
use std::ops::Range;

mod lexer;
pub use lexer::{Token, lexer};

mod macros;
pub use macros::{ACCUMULATOR, ALL_MACROS, Macro};

mod source;
pub use source::{Location, SourceCode};

pub use chumsky::prelude::{Input, Parser};

use crate::ast::{Constant, Expr, ExprKind, MapEntry, SourceInfo};
use crate::issues::Diagnostic;

pub type Span = SimpleSpan;
pub type ParseError<'code, T> = Rich<'code, T, Span>;

/// Deepest operator and group nesting [`parse`] accepts.
pub const MAX_NESTING: usize = 250;

const NESTING_EXCEEDED: &str = "expression recursion limit exceeded";

#[derive(Debug, Clone)]
pub struct Spanned<T> {
    pub span: Span,
    pub node: T,
}

/// Parse tree straight out of the grammar. Borrowed from the source text and
/// lowered into an [`Expr`] once parsing succeeds.
#[derive(Debug, Clone)]
pub enum Syntax<'code> {
    Literal(Literal<'code>),
    /// `absolute` is set for a leading-dot name like `.a.b`.
    Ident {
        name: &'code str,
        absolute: bool,
    },
    Select {
        operand: Box<Spanned<Self>>,
        field: &'code str,
    },
    Call {
        target: Option<Box<Spanned<Self>>>,
        function: &'code str,
        absolute: bool,
        args: Vec<Spanned<Self>>,
    },
    List {
        elements: Vec<Spanned<Self>>,
    },
    Map {
        entries: Vec<(Spanned<Self>, Spanned<Self>)>,
    },
    /// Operators, indexing and the conditional, named like `_+_` or `_[_]`.
    Operator {
        function: &'static str,
        operands: Vec<Spanned<Self>>,
    },
}

/// Numeric literals keep their text until lowering so a preceding `-` can be
/// folded in before range checking.
#[derive(Debug, Clone)]
pub enum Literal<'code> {
    Int(&'code str),
    Uint(&'code str),
    Double(&'code str),
    String(String),
    Bytes(Vec<u8>),
    Bool(bool),
    Null,
}

fn operator<'code>(
    function: &'static str,
    operands: Vec<Spanned<Syntax<'code>>>,
    span: Span,
) -> Spanned<Syntax<'code>> {
    Spanned {
        span,
        node: Syntax::Operator { function, operands },
    }
}

pub fn parser<'code, I>()
-> impl Parser<'code, I, Spanned<Syntax<'code>>, extra::Err<ParseError<'code, Token<'code>>>>
where
    I: ValueInput<'code, Token = Token<'code>, Span = Span>,
{
    recursive(|expression| {
        let comma = just(Token::Comma);
        let dot = just(Token::Dot);

        let identifier = select! { Token::Identifier(identifier) => identifier };

        let arguments = expression
            .clone()
            .separated_by(comma.clone())
            .collect::<Vec<_>>()
            .delimited_by(just(Token::ParenOpen), just(Token::ParenClose));

        let literal = select! {
            Token::Int(digits) => Literal::Int(digits),
            Token::Uint(digits) => Literal::Uint(digits),
            Token::Double(digits) => Literal::Double(digits),
            Token::String(text) => Literal::String(text),
            Token::Bytes(bytes) => Literal::Bytes(bytes),
            Token::True => Literal::Bool(true),
            Token::False => Literal::Bool(false),
            Token::Null => Literal::Null,
        }
        .map(Syntax::Literal);

        let ident_or_call = dot
            .clone()
            .or_not()
            .map(|dot| dot.is_some())
            .then(identifier)
            .then(arguments.clone().or_not())
            .map(|((absolute, name), args)| match args {
                Some(args) => Syntax::Call {
                    target: None,
                    function: name,
                    absolute,
                    args,
                },
                None => Syntax::Ident { name, absolute },
            });

        let list = expression
            .clone()
            .separated_by(comma.clone())
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
            .map(|elements| Syntax::List { elements });

        let map = expression
            .clone()
            .then_ignore(just(Token::Colon))
            .then(expression.clone())
            .separated_by(comma)
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::BraceOpen), just(Token::BraceClose))
            .map(|entries| Syntax::Map { entries });

        let nested = expression
            .clone()
            .delimited_by(just(Token::ParenOpen), just(Token::ParenClose));

        let atom = choice((literal, ident_or_call, list, map))
            .map_with(|node, extra| Spanned {
                node,
                span: extra.span(),
            })
            .or(nested);

        let member = dot
            .ignore_then(identifier)
            .then(arguments.or_not());

        let index = expression
            .clone()
            .delimited_by(just(Token::BracketOpen), just(Token::BracketClose));

        let multiplicative = choice((
            just(Token::Asterisk).to("_*_"),
            just(Token::Slash).to("_/_"),
            just(Token::Percent).to("_%_"),
        ));

        let additive = choice((just(Token::Plus).to("_+_"), just(Token::Minus).to("_-_")));

        let relation = choice((
            just(Token::Equal).to("_==_"),
            just(Token::NotEqual).to("_!=_"),
            just(Token::LessOrEqual).to("_<=_"),
            just(Token::Less).to("_<_"),
            just(Token::GreaterOrEqual).to("_>=_"),
            just(Token::Greater).to("_>_"),
            just(Token::In).to("@in"),
        ));

        let unary = choice((just(Token::Not).to("!_"), just(Token::Minus).to("-_")));

        let branches = just(Token::Question)
            .ignore_then(expression.clone())
            .then_ignore(just(Token::Colon));

        atom.pratt((
            // Precedence 8 (highest): member access, member calls and indexing
            postfix(8, member, |operand, (field, args), extra| {
                let operand = Box::new(operand);
                Spanned {
                    span: extra.span(),
                    node: match args {
                        Some(args) => Syntax::Call {
                            target: Some(operand),
                            function: field,
                            absolute: false,
                            args,
                        },
                        None => Syntax::Select { operand, field },
                    },
                }
            }),
            postfix(8, index, |operand, index, extra| {
                operator("_[_]", vec![operand, index], extra.span())
            }),
            prefix(7, unary, |function, operand, extra| {
                operator(function, vec![operand], extra.span())
            }),
            infix(left(6), multiplicative, |l, function, r, extra| {
                operator(function, vec![l, r], extra.span())
            }),
            infix(left(5), additive, |l, function, r, extra| {
                operator(function, vec![l, r], extra.span())
            }),
            infix(left(4), relation, |l, function, r, extra| {
                operator(function, vec![l, r], extra.span())
            }),
            infix(left(3), just(Token::And), |l, _, r, extra| {
                operator("_&&_", vec![l, r], extra.span())
            }),
            infix(left(2), just(Token::Or), |l, _, r, extra| {
                operator("_||_", vec![l, r], extra.span())
            }),
            // Precedence 1 (lowest): `c ? a : b`, nesting to the right
            infix(right(1), branches, |condition, then, otherwise, extra| {
                operator("_?_:_", vec![condition, then, otherwise], extra.span())
            }),
        ))
    })
}

/// Lex, parse and lower `source`, expanding the given macros.
pub fn parse(source: &SourceCode, macros: &[Macro]) -> Result<(Expr, SourceInfo), Vec<Diagnostic>> {
    let code = source.as_str();

    let (tokens, errors) = lexer().parse(code).into_output_errors();
    let mut diagnostics: Vec<Diagnostic> = errors.iter().map(diagnostic).collect();
    let Some(mut tokens) = tokens else {
        return Err(diagnostics);
    };
    if !diagnostics.is_empty() {
        return Err(diagnostics);
    }
    tokens.retain(|token| !matches!(token.node, Token::Comment(_)));
    if let Some(span) = nesting_overflow(&tokens) {
        return Err(vec![Diagnostic::error(NESTING_EXCEEDED, span.into_range())]);
    }

    let end_of_input = Span::from(code.len()..code.len());
    let input = tokens.map(end_of_input, |Spanned { node, span }| (node, span));
    let (syntax, errors) = parser().parse(input).into_output_errors();
    diagnostics.extend(errors.iter().map(diagnostic));
    let Some(syntax) = syntax else {
        return Err(diagnostics);
    };
    if !diagnostics.is_empty() {
        return Err(diagnostics);
    }

    let mut lowering = Lowering::new(macros);
    let expr = lowering.lower(syntax);
    if !lowering.errors.is_empty() {
        return Err(lowering.errors);
    }
    log::trace!("parsed {} nodes from {:?}", lowering.info.len(), source);
    Ok((expr, lowering.info))
}

/// Upper bound on how deep the grammar recurses for `tokens`: open groups
/// plus operators applied within each group. Returns the span of the first
/// token that takes it past [`MAX_NESTING`].
fn nesting_overflow(tokens: &[Spanned<Token>]) -> Option<Span> {
    // Operator count per open group, the whole expression first.
    let mut groups: Vec<usize> = vec![0];
    let mut depth = 0usize;
    for token in tokens {
        match token.node {
            Token::ParenOpen | Token::BracketOpen | Token::BraceOpen => {
                groups.push(0);
                depth += 1;
            }
            Token::ParenClose | Token::BracketClose | Token::BraceClose => {
                if groups.len() > 1
                    && let Some(operators) = groups.pop()
                {
                    depth -= operators + 1;
                }
                // A closed group is one more level for the enclosing one.
                if let Some(operators) = groups.last_mut() {
                    *operators += 1;
                    depth += 1;
                }
            }
            Token::Comma => {
                if let Some(operators) = groups.last_mut() {
                    depth -= *operators;
                    *operators = 0;
                }
            }
            Token::Not
            | Token::Minus
            | Token::Plus
            | Token::Asterisk
            | Token::Slash
            | Token::Percent
            | Token::Equal
            | Token::NotEqual
            | Token::Less
            | Token::LessOrEqual
            | Token::Greater
            | Token::GreaterOrEqual
            | Token::In
            | Token::And
            | Token::Or
            | Token::Question
            | Token::Dot => {
                if let Some(operators) = groups.last_mut() {
                    *operators += 1;
                    depth += 1;
                }
            }
            _ => {}
        }
        if depth > MAX_NESTING {
            return Some(token.span);
        }
    }
    None
}

fn diagnostic<T: std::fmt::Display>(error: &ParseError<'_, T>) -> Diagnostic {
    Diagnostic::error(error.to_string(), error.span().into_range())
}

/// Turns [`Syntax`] into [`Expr`]: numbers every node, records its span,
/// checks literal ranges and expands macros.
pub(crate) struct Lowering<'m> {
    macros: &'m [Macro],
    last_id: i64,
    depth: usize,
    info: SourceInfo,
    errors: Vec<Diagnostic>,
}

impl<'m> Lowering<'m> {
    fn new(macros: &'m [Macro]) -> Self {
        Lowering {
            macros,
            last_id: 0,
            depth: 0,
            info: SourceInfo::new(),
            errors: Vec::new(),
        }
    }

    pub(crate) fn next_id(&mut self, span: Range<usize>) -> i64 {
        self.last_id += 1;
        self.info.insert(self.last_id, span);
        self.last_id
    }

    fn error(&mut self, message: impl Into<String>, span: Range<usize>) -> Expr {
        self.errors.push(Diagnostic::error(message, span.clone()));
        let id = self.next_id(span);
        Expr::new(id, ExprKind::Const(Constant::Null))
    }

    fn lower(&mut self, syntax: Spanned<Syntax>) -> Expr {
        if self.depth > MAX_NESTING {
            let span = syntax.span.into_range();
            if self.errors.iter().any(|error| error.message == NESTING_EXCEEDED) {
                let id = self.next_id(span);
                return Expr::new(id, ExprKind::Const(Constant::Null));
            }
            return self.error(NESTING_EXCEEDED, span);
        }
        self.depth += 1;
        let expr = self.lower_node(syntax);
        self.depth -= 1;
        expr
    }

    fn lower_node(&mut self, syntax: Spanned<Syntax>) -> Expr {
        let span = syntax.span.into_range();
        match syntax.node {
            Syntax::Literal(literal) => match self.constant(literal, false) {
                Ok(constant) => {
                    let id = self.next_id(span);
                    Expr::new(id, ExprKind::Const(constant))
                }
                Err(message) => self.error(message, span),
            },
            Syntax::Ident { name, absolute } => {
                let id = self.next_id(span);
                Expr::new(
                    id,
                    ExprKind::Ident {
                        name: qualify(name, absolute),
                    },
                )
            }
            Syntax::Select { operand, field } => {
                let id = self.next_id(span);
                let operand = self.lower(*operand);
                Expr::new(
                    id,
                    ExprKind::Select {
                        operand: Box::new(operand),
                        field: field.to_string(),
                        test_only: false,
                    },
                )
            }
            Syntax::Call {
                target,
                function,
                absolute,
                args,
            } => {
                let receiver_style = target.is_some();
                let expansion = (!absolute)
                    .then(|| {
                        self.macros
                            .iter()
                            .copied()
                            .find(|m| m.matches(function, args.len(), receiver_style))
                    })
                    .flatten();
                if let Some(expansion) = expansion {
                    let target = target.map(|target| self.lower(*target));
                    let args = args.into_iter().map(|arg| self.lower(arg)).collect();
                    return match expansion.expand(self, span.clone(), target, args) {
                        Ok(expr) => expr,
                        Err(message) => self.error(message, span),
                    };
                }
                let id = self.next_id(span);
                let target = target.map(|target| Box::new(self.lower(*target)));
                let args = args.into_iter().map(|arg| self.lower(arg)).collect();
                Expr::new(
                    id,
                    ExprKind::Call {
                        target,
                        function: qualify(function, absolute),
                        args,
                    },
                )
            }
            Syntax::List { elements } => {
                let id = self.next_id(span);
                let elements = elements
                    .into_iter()
                    .map(|element| self.lower(element))
                    .collect();
                Expr::new(id, ExprKind::List { elements })
            }
            Syntax::Map { entries } => {
                let id = self.next_id(span);
                let entries = entries
                    .into_iter()
                    .map(|(key, value)| MapEntry {
                        key: self.lower(key),
                        value: self.lower(value),
                    })
                    .collect();
                Expr::new(id, ExprKind::Map { entries })
            }
            Syntax::Operator {
                function: "-_",
                mut operands,
            } if matches!(
                operands.as_slice(),
                [Spanned {
                    node: Syntax::Literal(Literal::Int(_) | Literal::Double(_)),
                    ..
                }]
            ) =>
            {
                let Some(Spanned {
                    node: Syntax::Literal(literal),
                    ..
                }) = operands.pop()
                else {
                    return self.error("invalid negation", span);
                };
                match self.constant(literal, true) {
                    Ok(constant) => {
                        let id = self.next_id(span);
                        Expr::new(id, ExprKind::Const(constant))
                    }
                    Err(message) => self.error(message, span),
                }
            }
            Syntax::Operator { function, operands } => {
                let id = self.next_id(span);
                let args = operands
                    .into_iter()
                    .map(|operand| self.lower(operand))
                    .collect();
                Expr::new(
                    id,
                    ExprKind::Call {
                        target: None,
                        function: function.to_string(),
                        args,
                    },
                )
            }
        }
    }

    fn constant(&self, literal: Literal, negated: bool) -> Result<Constant, String> {
        let sign = if negated { "-" } else { "" };
        Ok(match literal {
            Literal::Int(digits) => {
                let parsed = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
                    Some(hex) => i64::from_str_radix(&format!("{sign}{hex}"), 16),
                    None => format!("{sign}{digits}").parse::<i64>(),
                };
                Constant::Int(parsed.map_err(|_| format!("invalid int literal: {sign}{digits}"))?)
            }
            Literal::Uint(digits) => {
                let parsed = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
                    Some(hex) => u64::from_str_radix(hex, 16),
                    None => digits.parse::<u64>(),
                };
                Constant::Uint(parsed.map_err(|_| format!("invalid uint literal: {digits}u"))?)
            }
            Literal::Double(digits) => {
                let value = digits
                    .parse::<f64>()
                    .map_err(|_| format!("invalid double literal: {digits}"))?;
                Constant::Double(if negated { -value } else { value })
            }
            Literal::String(text) => Constant::String(text.into()),
            Literal::Bytes(bytes) => Constant::Bytes(bytes.into()),
            Literal::Bool(value) => Constant::Bool(value),
            Literal::Null => Constant::Null,
        })
    }
}

fn qualify(name: &str, absolute: bool) -> String {
    if absolute {
        format!(".{name}")
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! parse_and_test {
        ($code:expr, $test:expr) => {{
            let source = SourceCode::new($code);
            let (expr, info) = parse(&source, ALL_MACROS).unwrap();
            $test(&expr, &info)
        }};
    }

    fn call_name(expr: &Expr) -> &str {
        match &expr.kind {
            ExprKind::Call { function, .. } => function,
            other => panic!("Expected Call, got {:?}", other),
        }
    }

    fn args(expr: &Expr) -> &[Expr] {
        match &expr.kind {
            ExprKind::Call { args, .. } => args,
            other => panic!("Expected Call, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        parse_and_test!("1 + 2 * 3 == 7 && !x || y", |expr: &Expr, _: &SourceInfo| {
            assert_eq!(call_name(expr), "_||_");
            let and = &args(expr)[0];
            assert_eq!(call_name(and), "_&&_");
            let equal = &args(and)[0];
            assert_eq!(call_name(equal), "_==_");
            let add = &args(equal)[0];
            assert_eq!(call_name(add), "_+_");
            assert_eq!(call_name(&args(add)[1]), "_*_");
            assert_eq!(call_name(&args(and)[1]), "!_");
        });
    }

    #[test]
    fn test_left_associative_subtraction() {
        parse_and_test!("10 - 4 - 3", |expr: &Expr, _: &SourceInfo| {
            assert_eq!(call_name(expr), "_-_");
            assert_eq!(call_name(&args(expr)[0]), "_-_");
            assert_eq!(args(expr)[1].kind, ExprKind::Const(Constant::Int(3)));
        });
    }

    #[test]
    fn test_conditional_nests_right() {
        parse_and_test!("a ? b : c ? d : e", |expr: &Expr, _: &SourceInfo| {
            assert_eq!(call_name(expr), "_?_:_");
            assert_eq!(args(expr).len(), 3);
            assert_eq!(call_name(&args(expr)[2]), "_?_:_");
        });
    }

    #[test]
    fn test_negative_literals_fold() {
        parse_and_test!("-9223372036854775808", |expr: &Expr, _: &SourceInfo| {
            assert_eq!(expr.kind, ExprKind::Const(Constant::Int(i64::MIN)));
        });
        parse_and_test!("-1.5", |expr: &Expr, _: &SourceInfo| {
            assert_eq!(expr.kind, ExprKind::Const(Constant::Double(-1.5)));
        });
        parse_and_test!("-x", |expr: &Expr, _: &SourceInfo| {
            assert_eq!(call_name(expr), "-_");
        });
    }

    #[test]
    fn test_int_out_of_range() {
        let errors = parse(&SourceCode::new("9223372036854775808"), &[]).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("invalid int literal"));
    }

    #[test]
    fn test_select_call_and_index() {
        parse_and_test!("a.b.c(1)[0]", |expr: &Expr, _: &SourceInfo| {
            assert_eq!(call_name(expr), "_[_]");
            let call = &args(expr)[0];
            match &call.kind {
                ExprKind::Call {
                    target: Some(target),
                    function,
                    args,
                } => {
                    assert_eq!(function, "c");
                    assert_eq!(args.len(), 1);
                    assert_eq!(target.qualified_name().as_deref(), Some("a.b"));
                }
                other => panic!("Expected member Call, got {:?}", other),
            }
        });
    }

    #[test]
    fn test_absolute_names() {
        parse_and_test!(".a.b", |expr: &Expr, _: &SourceInfo| {
            assert_eq!(expr.qualified_name().as_deref(), Some(".a.b"));
        });
    }

    #[test]
    fn test_aggregates() {
        parse_and_test!("[1, 2, 3,]", |expr: &Expr, _: &SourceInfo| {
            assert!(matches!(&expr.kind, ExprKind::List { elements } if elements.len() == 3));
        });
        parse_and_test!("{'a': 1, 'b': 2}", |expr: &Expr, _: &SourceInfo| {
            match &expr.kind {
                ExprKind::Map { entries } => {
                    assert_eq!(entries.len(), 2);
                    assert_eq!(entries[0].key.kind, ExprKind::Const(Constant::String("a".into())));
                }
                other => panic!("Expected Map, got {:?}", other),
            }
        });
    }

    #[test]
    fn test_ids_are_unique_and_located() {
        parse_and_test!("[1, 2].all(x, x > 0)", |expr: &Expr, info: &SourceInfo| {
            let mut ids = Vec::new();
            expr.walk(&mut |node| ids.push(node.id));
            let count = ids.len();
            ids.sort();
            ids.dedup();
            assert_eq!(ids.len(), count);
            assert!(ids.iter().all(|id| info.span(*id).is_some()));
        });
    }

    #[test]
    fn test_ids_are_pre_order() {
        parse_and_test!("a.f(b, g(c))", |expr: &Expr, _: &SourceInfo| {
            let mut ids = Vec::new();
            expr.walk(&mut |node| ids.push(node.id));
            assert_eq!(expr.id, 1);
            assert!(ids.windows(2).all(|pair| pair[0] < pair[1]), "{ids:?}");
        });
    }

    #[test]
    fn test_nesting_limit() {
        let code = format!("{}true", "!".repeat(MAX_NESTING + 1));
        let errors = parse(&SourceCode::new(&code), &[]).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "expression recursion limit exceeded");

        let code = format!("{}x", "-".repeat(MAX_NESTING / 2));
        assert!(parse(&SourceCode::new(&code), &[]).is_ok());
    }

    #[test]
    fn test_nesting_limit_counts_tree_depth() {
        // Each half fits on its own; together the tree is too deep.
        let half = vec!["x"; MAX_NESTING / 2 + 10].join(" + ");
        let code = format!("({half}) + {half}");
        let errors = parse(&SourceCode::new(&code), &[]).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "expression recursion limit exceeded");
    }

    #[test]
    fn test_leading_dot_double() {
        parse_and_test!(".5 + x", |expr: &Expr, _: &SourceInfo| {
            assert_eq!(args(expr)[0].kind, ExprKind::Const(Constant::Double(0.5)));
        });
        parse_and_test!("-.25e1", |expr: &Expr, _: &SourceInfo| {
            assert_eq!(expr.kind, ExprKind::Const(Constant::Double(-2.5)));
        });
    }

    #[test]
    fn test_all_macro_expands() {
        parse_and_test!("[1, 2].all(x, x > 0)", |expr: &Expr, _: &SourceInfo| {
            match &expr.kind {
                ExprKind::Comprehension(comprehension) => {
                    assert_eq!(comprehension.iter_var, "x");
                    assert_eq!(comprehension.accu_var, ACCUMULATOR);
                    assert_eq!(comprehension.accu_init.kind, ExprKind::Const(Constant::Bool(true)));
                    assert_eq!(call_name(&comprehension.loop_step), "_&&_");
                }
                other => panic!("Expected Comprehension, got {:?}", other),
            }
        });
    }

    #[test]
    fn test_has_macro() {
        parse_and_test!("has(m.f)", |expr: &Expr, _: &SourceInfo| {
            assert!(matches!(
                &expr.kind,
                ExprKind::Select { field, test_only: true, .. } if field == "f"
            ));
        });
        let errors = parse(&SourceCode::new("has(m)"), ALL_MACROS).unwrap_err();
        assert_eq!(errors[0].message, "invalid argument to has() macro");
    }

    #[test]
    fn test_macros_can_be_disabled() {
        let (expr, _) = parse(&SourceCode::new("l.all(x, x)"), &[]).unwrap();
        assert_eq!(call_name(&expr), "all");
    }

    #[test]
    fn test_macro_requires_simple_name() {
        let errors = parse(&SourceCode::new("l.exists(x.y, true)"), ALL_MACROS).unwrap_err();
        assert_eq!(errors[0].message, "argument must be a simple name");
    }

    #[test]
    fn test_syntax_errors_are_located() {
        let errors = parse(&SourceCode::new("1 + "), &[]).unwrap_err();
        assert!(!errors.is_empty());
        assert!(errors[0].start <= 4);
        assert!(parse(&SourceCode::new(""), &[]).is_err());
        assert!(parse(&SourceCode::new("(1"), &[]).is_err());
    }

    #[test]
    fn test_comments_are_ignored() {
        parse_and_test!("1 // one\n + 2", |expr: &Expr, _: &SourceInfo| {
            assert_eq!(call_name(expr), "_+_");
        });
    }
}
