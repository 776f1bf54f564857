use super::{ParseError, Spanned};
use chumsky::prelude::*;
use std::borrow::Cow;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token<'code> {
    ParenOpen,
    ParenClose,
    BracketOpen,
    BracketClose,
    BraceOpen,
    BraceClose,
    Comment(&'code str),
    /// Digits of an int literal, decimal or `0x` hex, without sign.
    Int(&'code str),
    /// Digits of a uint literal without the `u` suffix.
    Uint(&'code str),
    Double(&'code str),
    String(String),
    Bytes(Vec<u8>),
    Identifier(&'code str),
    True,
    False,
    Null,
    In,
    Question,
    Colon,
    Comma,
    Dot,
    Or,
    And,
    Not,
    Equal,
    NotEqual,
    LessOrEqual,
    Less,
    GreaterOrEqual,
    Greater,
    Plus,
    Minus,
    Asterisk,
    Slash,
    Percent,
}

impl<'code> Token<'code> {
    pub fn into_cow_str(self) -> Cow<'code, str> {
        match self {
            Self::ParenOpen => "(".into(),
            Self::ParenClose => ")".into(),
            Self::BracketOpen => "[".into(),
            Self::BracketClose => "]".into(),
            Self::BraceOpen => "{".into(),
            Self::BraceClose => "}".into(),
            Self::Comment(comment) => comment.into(),
            Self::Int(digits) => digits.into(),
            Self::Uint(digits) => format!("{digits}u").into(),
            Self::Double(digits) => digits.into(),
            Self::String(text) => format!("{text:?}").into(),
            Self::Bytes(bytes) => format!("b{:?}", String::from_utf8_lossy(&bytes)).into(),
            Self::Identifier(identifier) => identifier.into(),
            Self::True => "true".into(),
            Self::False => "false".into(),
            Self::Null => "null".into(),
            Self::In => "in".into(),
            Self::Question => "?".into(),
            Self::Colon => ":".into(),
            Self::Comma => ",".into(),
            Self::Dot => ".".into(),
            Self::Or => "||".into(),
            Self::And => "&&".into(),
            Self::Not => "!".into(),
            Self::Equal => "==".into(),
            Self::NotEqual => "!=".into(),
            Self::LessOrEqual => "<=".into(),
            Self::Less => "<".into(),
            Self::GreaterOrEqual => ">=".into(),
            Self::Greater => ">".into(),
            Self::Plus => "+".into(),
            Self::Minus => "-".into(),
            Self::Asterisk => "*".into(),
            Self::Slash => "/".into(),
            Self::Percent => "%".into(),
        }
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.clone().into_cow_str())
    }
}

/// Words the grammar keeps for future use; they can't be identifiers.
const RESERVED: &[&str] = &[
    "as", "break", "const", "continue", "else", "for", "function", "if", "import", "let", "loop",
    "package", "namespace", "return", "var", "void", "while",
];

pub fn lexer<'code>()
-> impl Parser<'code, &'code str, Vec<Spanned<Token<'code>>>, extra::Err<ParseError<'code, char>>> {
    let bracket = choice((
        just('(').to(Token::ParenOpen),
        just(')').to(Token::ParenClose),
        just('[').to(Token::BracketOpen),
        just(']').to(Token::BracketClose),
        just('{').to(Token::BraceOpen),
        just('}').to(Token::BraceClose),
    ));

    let operator = choice((
        just("||").to(Token::Or),
        just("&&").to(Token::And),
        just("==").to(Token::Equal),
        just("!=").to(Token::NotEqual),
        just("<=").to(Token::LessOrEqual),
        just(">=").to(Token::GreaterOrEqual),
        just('<').to(Token::Less),
        just('>').to(Token::Greater),
        just('!').to(Token::Not),
        just('+').to(Token::Plus),
        just('-').to(Token::Minus),
        just('*').to(Token::Asterisk),
        just('/').to(Token::Slash),
        just('%').to(Token::Percent),
        just('?').to(Token::Question),
        just(':').to(Token::Colon),
        just(',').to(Token::Comma),
        just('.').to(Token::Dot),
    ));

    let comment = just("//")
        .ignore_then(any().and_is(text::newline().not()).repeated())
        .to_slice()
        .map(Token::Comment);

    let hex = just('0')
        .then(one_of("xX"))
        .then(text::digits(16))
        .to_slice()
        .then(one_of("uU").or_not())
        .map(|(digits, unsigned): (&str, Option<char>)| match unsigned {
            Some(_) => Token::Uint(digits),
            None => Token::Int(digits),
        });

    let exponent = one_of("eE")
        .then(one_of("+-").or_not())
        .then(text::digits(10));

    let fraction = just('.')
        .then(text::digits(10))
        .then(exponent.clone().or_not())
        .ignored();

    let double = choice((
        text::digits(10)
            .then(choice((fraction.clone(), exponent.ignored())))
            .ignored(),
        fraction,
    ))
    .to_slice()
    .map(Token::Double);

    let decimal = text::digits(10)
        .to_slice()
        .then(one_of("uU").or_not())
        .map(|(digits, unsigned): (&str, Option<char>)| match unsigned {
            Some(_) => Token::Uint(digits),
            None => Token::Int(digits),
        });

    let number = choice((hex, double, decimal));

    let string = string_literal();

    let identifier = any()
        .filter(|character: &char| character.is_ascii_alphabetic() || *character == '_')
        .then(
            any()
                .filter(|character: &char| character.is_ascii_alphanumeric() || *character == '_')
                .repeated(),
        )
        .to_slice()
        .try_map(|identifier: &str, span| match identifier {
            "true" => Ok(Token::True),
            "false" => Ok(Token::False),
            "null" => Ok(Token::Null),
            "in" => Ok(Token::In),
            reserved if RESERVED.contains(&reserved) => Err(ParseError::custom(
                span,
                format!("reserved identifier: {reserved}"),
            )),
            _ => Ok(Token::Identifier(identifier)),
        });

    let token = choice((
        comment,
        string,
        number,
        identifier,
        bracket,
        operator,
    ));

    token
        .map_with(|token, extra| Spanned {
            node: token,
            span: extra.span(),
        })
        .padded()
        .recover_with(skip_then_retry_until(any().ignored(), end()))
        .repeated()
        .collect()
}

/// String and bytes literals in all quote styles, with optional `r` (raw)
/// and `b` (bytes) prefixes.
fn string_literal<'code>()
-> impl Parser<'code, &'code str, Token<'code>, extra::Err<ParseError<'code, char>>> + Clone {
    let escaped = |quote: char| {
        just('\\')
            .then(any())
            .ignored()
            .or(none_of(['\\', quote, '\n', '\r']).ignored())
            .repeated()
            .to_slice()
            .delimited_by(just(quote), just(quote))
    };
    let escaped_triple = |quote: &'static str| {
        just('\\')
            .then(any())
            .ignored()
            .or(any().and_is(just(quote).not()).ignored())
            .repeated()
            .to_slice()
            .delimited_by(just(quote), just(quote))
    };
    let raw = |quote: char| {
        none_of([quote, '\n', '\r'])
            .repeated()
            .to_slice()
            .delimited_by(just(quote), just(quote))
    };
    let raw_triple = |quote: &'static str| {
        any()
            .and_is(just(quote).not())
            .repeated()
            .to_slice()
            .delimited_by(just(quote), just(quote))
    };

    let cooked_body = choice((
        escaped_triple("\"\"\""),
        escaped_triple("'''"),
        escaped('"'),
        escaped('\''),
    ));
    let raw_body = choice((raw_triple("\"\"\""), raw_triple("'''"), raw('"'), raw('\'')));

    let bytes_prefix = one_of("bB").or_not().map(|prefix| prefix.is_some());
    let raw_prefix = one_of("rR");

    let raw_literal = bytes_prefix
        .clone()
        .then_ignore(raw_prefix)
        .then(bytes_prefix.clone())
        .then(raw_body)
        .try_map(|((bytes_before, bytes_after), body): ((bool, bool), &str), span| {
            if bytes_before && bytes_after {
                return Err(ParseError::custom(span, "invalid string prefix"));
            }
            Ok(literal_token(body.as_bytes().to_vec(), bytes_before || bytes_after))
        });

    let cooked_literal = bytes_prefix
        .then(cooked_body)
        .try_map(|(bytes, body): (bool, &str), span| {
            unescape(body, bytes)
                .map(|unescaped| literal_token(unescaped, bytes))
                .map_err(|message| ParseError::custom(span, message))
        });

    raw_literal.or(cooked_literal)
}

fn literal_token<'code>(content: Vec<u8>, bytes: bool) -> Token<'code> {
    if bytes {
        Token::Bytes(content)
    } else {
        // Sources are UTF-8 and escapes only produce valid scalar values.
        Token::String(String::from_utf8_lossy(&content).into_owned())
    }
}

/// Resolve escape sequences. In bytes literals `\x` and octal escapes denote
/// single bytes; in strings they denote code points.
fn unescape(body: &str, bytes: bool) -> Result<Vec<u8>, String> {
    let mut output = Vec::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(character) = chars.next() {
        if character != '\\' {
            let mut buffer = [0; 4];
            output.extend_from_slice(character.encode_utf8(&mut buffer).as_bytes());
            continue;
        }
        let Some(escape) = chars.next() else {
            return Err("unterminated escape sequence".to_string());
        };
        let simple = match escape {
            'a' => Some(b'\x07'),
            'b' => Some(b'\x08'),
            'f' => Some(b'\x0c'),
            'n' => Some(b'\n'),
            'r' => Some(b'\r'),
            't' => Some(b'\t'),
            'v' => Some(b'\x0b'),
            '\\' => Some(b'\\'),
            '\'' => Some(b'\''),
            '"' => Some(b'"'),
            '`' => Some(b'`'),
            '?' => Some(b'?'),
            _ => None,
        };
        if let Some(byte) = simple {
            output.push(byte);
            continue;
        }
        let (digits, radix) = match escape {
            'x' | 'X' => (2, 16),
            'u' => (4, 16),
            'U' => (8, 16),
            '0'..='3' => (2, 8),
            other => return Err(format!("invalid escape sequence: \\{other}")),
        };
        let mut text = String::new();
        if radix == 8 {
            text.push(escape);
        }
        for _ in 0..digits {
            match chars.next() {
                Some(digit) if digit.is_digit(radix) => text.push(digit),
                _ => return Err(format!("invalid escape sequence: \\{escape}{text}")),
            }
        }
        let code = u32::from_str_radix(&text, radix).map_err(|error| error.to_string())?;
        let single_byte = matches!(escape, 'x' | 'X' | '0'..='3');
        if bytes && single_byte {
            output.push(code as u8);
        } else {
            let Some(character) = char::from_u32(code) else {
                return Err(format!("invalid unicode code point: {code:#x}"));
            };
            let mut buffer = [0; 4];
            output.extend_from_slice(character.encode_utf8(&mut buffer).as_bytes());
        }
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chumsky::prelude::Parser;

    fn tokens(code: &str) -> Vec<Token<'_>> {
        lexer()
            .parse(code)
            .into_result()
            .unwrap()
            .into_iter()
            .map(|token| token.node)
            .collect()
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokens("1 2u 0x1F 0x1Fu 1.5 2e3 3.0e-2 .5 .5e2"),
            vec![
                Token::Int("1"),
                Token::Uint("2"),
                Token::Int("0x1F"),
                Token::Uint("0x1F"),
                Token::Double("1.5"),
                Token::Double("2e3"),
                Token::Double("3.0e-2"),
                Token::Double(".5"),
                Token::Double(".5e2"),
            ]
        );
    }

    #[test]
    fn test_dot_before_identifier_is_not_a_number() {
        assert_eq!(
            tokens("a.b"),
            vec![Token::Identifier("a"), Token::Dot, Token::Identifier("b")]
        );
    }

    #[test]
    fn test_operators_and_keywords() {
        assert_eq!(
            tokens("a.b in [x] && !c || d != null"),
            vec![
                Token::Identifier("a"),
                Token::Dot,
                Token::Identifier("b"),
                Token::In,
                Token::BracketOpen,
                Token::Identifier("x"),
                Token::BracketClose,
                Token::And,
                Token::Not,
                Token::Identifier("c"),
                Token::Or,
                Token::Identifier("d"),
                Token::NotEqual,
                Token::Null,
            ]
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            tokens(r#""a\tb" 'it\'s' r"\d+" """multi"line""" b"\xff" 'é'"#),
            vec![
                Token::String("a\tb".into()),
                Token::String("it's".into()),
                Token::String("\\d+".into()),
                Token::String("multi\"line".into()),
                Token::Bytes(vec![0xff]),
                Token::String("é".into()),
            ]
        );
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            tokens("1 // one\n+ 2"),
            vec![
                Token::Int("1"),
                Token::Comment("// one"),
                Token::Plus,
                Token::Int("2"),
            ]
        );
    }

    #[test]
    fn test_reserved_identifier_is_error() {
        let result = lexer().parse("if");
        assert!(result.has_errors());
    }

    #[test]
    fn test_invalid_escape_is_error() {
        let result = lexer().parse(r#""\q""#);
        assert!(result.has_errors());
    }
}
