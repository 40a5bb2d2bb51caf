use crate::diagnostic::{line_col, Diagnostic, Label, Span};
use crate::keywords::{Keyword, KeywordTable};
use crate::token::{SpannedToken, Token};
use chumsky::prelude::*;
use std::cmp::Reverse;
use thiserror::Error;

type Extra<'a> = extra::Err<Rich<'a, char>>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("Illegal character: {ch} (line {line}, column {column})")]
    IllegalCharacter {
        ch: char,
        line: usize,
        column: usize,
        span: Span,
    },
    #[error("number literal `{literal}` does not fit in a 64-bit integer")]
    InvalidNumber { literal: String, span: Span },
    #[error("could not tokenize input")]
    Malformed { span: Span },
}

impl LexError {
    pub fn span(&self) -> Span {
        match self {
            Self::IllegalCharacter { span, .. } => *span,
            Self::InvalidNumber { span, .. } => *span,
            Self::Malformed { span } => *span,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::IllegalCharacter { ch, span, .. } => {
                Diagnostic::error(format!("illegal character `{}`", ch.escape_debug()))
                    .with_code("E0001")
                    .with_label(Label::primary(*span, "no token starts with this character"))
            }
            Self::InvalidNumber { span, .. } => Diagnostic::error(self.to_string())
                .with_code("E0002")
                .with_label(Label::primary(*span, "integer literal out of range")),
            Self::Malformed { span } => Diagnostic::error(self.to_string())
                .with_code("E0001")
                .with_label(Label::primary(*span, "")),
        }
    }
}

/// One step of the scan. Everything the pattern table can produce, including
/// the catch-all, so the combinator below never fails on its own.
#[derive(Debug, Clone)]
enum Lexeme {
    Token(Token),
    Oversized(String),
    Mismatch(char),
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn keyword_literal<'a>(keyword: Keyword, spelling: &'a str) -> Boxed<'a, 'a, &'a str, Token, Extra<'a>> {
    let literal = just(spelling).to(keyword.token());
    if spelling.ends_with(is_word_char) {
        // "if" must not match the front of "iffy"
        literal
            .then_ignore(any().filter(|c: &char| is_word_char(*c)).not())
            .boxed()
    } else {
        literal.boxed()
    }
}

fn keyword_parser<'a>(keywords: &'a KeywordTable) -> Boxed<'a, 'a, &'a str, Token, Extra<'a>> {
    let mut entries: Vec<(Keyword, &'a str)> = keywords.iter().collect();
    entries.sort_by_key(|(_, spelling)| Reverse(spelling.len()));

    entries
        .into_iter()
        .map(|(keyword, spelling)| keyword_literal(keyword, spelling))
        .reduce(|acc, next| acc.or(next).boxed())
        // empty table: matches nothing
        .unwrap_or_else(|| any().filter(|_: &char| false).to(Token::End).boxed())
}

fn lexer<'a>(
    keywords: &'a KeywordTable,
) -> impl Parser<'a, &'a str, Vec<(Lexeme, SimpleSpan)>, Extra<'a>> {
    let keyword = keyword_parser(keywords).map(Lexeme::Token);

    let number = text::digits(10)
        .to_slice()
        .map(|digits: &str| match digits.parse::<i64>() {
            Ok(n) => Lexeme::Token(Token::Number(n)),
            Err(_) => Lexeme::Oversized(digits.to_string()),
        });

    let string = just('"')
        .then(none_of("\"\n").repeated())
        .then(just('"'))
        .to_slice()
        .map(|raw: &str| Lexeme::Token(Token::String(raw.to_string())));

    let ident = any()
        .filter(|c: &char| c.is_ascii_alphabetic() || *c == '_')
        .then(
            any()
                .filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_')
                .repeated(),
        )
        .to_slice()
        .map(|name: &str| Lexeme::Token(Token::Ident(name.to_string())));

    let op_double = choice((
        just("==").to(Token::EqEq),
        just("!=").to(Token::NotEq),
        just("<=").to(Token::LessEq),
        just(">=").to(Token::GreaterEq),
    ));

    let op_single = choice((
        just('+').to(Token::Plus),
        just('-').to(Token::Minus),
        just('*').to(Token::Star),
        just('/').to(Token::Slash),
        just('=').to(Token::Assign),
        just('<').to(Token::Less),
        just('>').to(Token::Greater),
        just('(').to(Token::LParen),
        just(')').to(Token::RParen),
        just(',').to(Token::Comma),
    ));

    let newline = choice((just("\r\n"), just("\n"))).to(Token::Newline);

    let symbol = op_double.or(op_single).or(newline).map(Lexeme::Token);

    let mismatch = any().map(Lexeme::Mismatch);

    let token = keyword
        .or(number)
        .or(string)
        .or(ident)
        .or(symbol)
        .or(mismatch)
        .map_with(|lexeme, e| (lexeme, e.span()));

    one_of(" \t")
        .repeated()
        .ignore_then(
            token
                .then_ignore(one_of(" \t").repeated())
                .repeated()
                .collect(),
        )
        .then_ignore(end())
}

/// Tokenizer bound to one keyword table.
#[derive(Debug, Clone, Default)]
pub struct Lexer {
    keywords: KeywordTable,
}

impl Lexer {
    pub fn new(keywords: KeywordTable) -> Self {
        Self { keywords }
    }

    pub fn keywords(&self) -> &KeywordTable {
        &self.keywords
    }

    /// Scans `source` left to right. The first character no pattern accepts
    /// aborts the whole call.
    pub fn tokenize(&self, source: &str) -> Result<Vec<SpannedToken>, LexError> {
        let lexemes = lexer(&self.keywords)
            .parse(source)
            .into_result()
            .map_err(|errors| {
                let span = errors
                    .first()
                    .map(|e| Span::new(e.span().start, e.span().end))
                    .unwrap_or_default();
                LexError::Malformed { span }
            })?;

        let mut tokens = Vec::with_capacity(lexemes.len());
        for (lexeme, simple_span) in lexemes {
            let span = Span::new(simple_span.start, simple_span.end);
            match lexeme {
                Lexeme::Token(token) => tokens.push(SpannedToken::new(token, span)),
                Lexeme::Oversized(literal) => {
                    return Err(LexError::InvalidNumber { literal, span });
                }
                Lexeme::Mismatch(ch) => {
                    let (line, column) = line_col(source, span.start);
                    return Err(LexError::IllegalCharacter { ch, line, column, span });
                }
            }
        }

        tracing::debug!(tokens = tokens.len(), bytes = source.len(), "tokenized source");
        Ok(tokens)
    }
}

pub fn tokenize(source: &str, keywords: &KeywordTable) -> Result<Vec<SpannedToken>, LexError> {
    Lexer::new(keywords.clone()).tokenize(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    fn lex(source: &str) -> Vec<Token> {
        Lexer::default()
            .tokenize(source)
            .expect("Lexer failed")
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    fn ident(name: &str) -> Token {
        Token::Ident(name.to_string())
    }

    fn table(pairs: &[(&str, &str)]) -> KeywordTable {
        let map: IndexMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        KeywordTable::from_map(&map).unwrap()
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            lex("if else while fn return import then end"),
            vec![
                Token::If,
                Token::Else,
                Token::While,
                Token::Fn,
                Token::Return,
                Token::Import,
                Token::Then,
                Token::End
            ]
        );
    }

    #[test]
    fn test_keyword_needs_word_boundary() {
        assert_eq!(lex("iffy"), vec![ident("iffy")]);
        assert_eq!(lex("end_"), vec![ident("end_")]);
        assert_eq!(lex("fn2"), vec![ident("fn2")]);
        assert_eq!(lex("if("), vec![Token::If, Token::LParen]);
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(lex("foo"), vec![ident("foo")]);
        assert_eq!(lex("_bar9"), vec![ident("_bar9")]);
        assert_eq!(lex("camelCase"), vec![ident("camelCase")]);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(lex("12"), vec![Token::Number(12)]);
        assert_eq!(lex("0"), vec![Token::Number(0)]);
        assert_eq!(lex("007"), vec![Token::Number(7)]);
        assert_eq!(lex("12abc"), vec![Token::Number(12), ident("abc")]);
    }

    #[test]
    fn test_float_literal_is_rejected_at_the_dot() {
        let err = Lexer::default().tokenize("3.5").unwrap_err();
        assert_eq!(
            err,
            LexError::IllegalCharacter { ch: '.', line: 1, column: 2, span: Span::new(1, 2) }
        );
    }

    #[test]
    fn test_oversized_number() {
        let err = Lexer::default().tokenize("99999999999999999999").unwrap_err();
        assert!(matches!(err, LexError::InvalidNumber { .. }));
    }

    #[test]
    fn test_strings_keep_quotes() {
        assert_eq!(lex(r#""hello""#), vec![Token::String("\"hello\"".to_string())]);
        assert_eq!(lex(r#""""#), vec![Token::String("\"\"".to_string())]);
        assert_eq!(
            lex(r#""a" "b""#),
            vec![Token::String("\"a\"".to_string()), Token::String("\"b\"".to_string())]
        );
    }

    #[test]
    fn test_unterminated_string_is_illegal_quote() {
        let err = Lexer::default().tokenize("x = \"abc").unwrap_err();
        assert!(matches!(err, LexError::IllegalCharacter { ch: '"', column: 5, .. }));

        // strings do not span lines
        let err = Lexer::default().tokenize("\"ab\ncd\"").unwrap_err();
        assert!(matches!(err, LexError::IllegalCharacter { ch: '"', line: 1, .. }));
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            lex("+ - * / = < >"),
            vec![
                Token::Plus,
                Token::Minus,
                Token::Star,
                Token::Slash,
                Token::Assign,
                Token::Less,
                Token::Greater
            ]
        );
    }

    #[test]
    fn test_two_char_operators_win_over_prefixes() {
        assert_eq!(
            lex("a == b != c <= d >= e"),
            vec![
                ident("a"),
                Token::EqEq,
                ident("b"),
                Token::NotEq,
                ident("c"),
                Token::LessEq,
                ident("d"),
                Token::GreaterEq,
                ident("e")
            ]
        );
        assert_eq!(lex("x==1"), vec![ident("x"), Token::EqEq, Token::Number(1)]);
    }

    #[test]
    fn test_newlines_and_blanks() {
        assert_eq!(
            lex("x = 1\n\ty\r\n"),
            vec![
                ident("x"),
                Token::Assign,
                Token::Number(1),
                Token::Newline,
                ident("y"),
                Token::Newline
            ]
        );
        assert_eq!(lex(" \t  "), vec![]);
        assert_eq!(lex(""), vec![]);
    }

    #[test]
    fn test_call_and_condition_shape() {
        assert_eq!(
            lex("print(a, 2)"),
            vec![
                ident("print"),
                Token::LParen,
                ident("a"),
                Token::Comma,
                Token::Number(2),
                Token::RParen
            ]
        );
    }

    #[test]
    fn test_illegal_character_position() {
        let err = Lexer::default().tokenize("x = 1\n  @").unwrap_err();
        assert_eq!(err.to_string(), "Illegal character: @ (line 2, column 3)");
        assert_eq!(err.span(), Span::new(8, 9));
    }

    #[test]
    fn test_configured_spellings() {
        let keywords = table(&[
            ("if", "se"),
            ("else", "senao"),
            ("while", "enquanto"),
            ("fn", "function"),
            ("return", "output"),
            ("import", "get"),
            ("then", "entao"),
            ("end", "fim"),
        ]);
        let tokens: Vec<Token> = tokenize("function f() entao output 1 fim if", &keywords)
            .unwrap()
            .into_iter()
            .map(|t| t.token)
            .collect();
        assert_eq!(
            tokens,
            vec![
                Token::Fn,
                ident("f"),
                Token::LParen,
                Token::RParen,
                Token::Then,
                Token::Return,
                Token::Number(1),
                Token::End,
                ident("if")
            ]
        );
    }

    #[test]
    fn test_symbolic_block_words() {
        let keywords = table(&[
            ("if", "if"),
            ("else", "else"),
            ("while", "while"),
            ("fn", "fn"),
            ("return", "return"),
            ("import", "import"),
            ("then", "{"),
            ("end", "}"),
        ]);
        let tokens: Vec<Token> = tokenize("if (x) {y}", &keywords)
            .unwrap()
            .into_iter()
            .map(|t| t.token)
            .collect();
        assert_eq!(
            tokens,
            vec![
                Token::If,
                Token::LParen,
                ident("x"),
                Token::RParen,
                Token::Then,
                ident("y"),
                Token::End
            ]
        );
    }

    #[test]
    fn test_tokenize_is_repeatable() {
        let lexer = Lexer::default();
        let source = "fn add(a b) then return a + b end\nprint(add(1 2))";
        assert_eq!(lexer.tokenize(source).unwrap(), lexer.tokenize(source).unwrap());
    }

    #[test]
    fn test_spans() {
        let tokens = Lexer::default().tokenize("ab == 10").unwrap();
        let spans: Vec<Span> = tokens.iter().map(|t| t.span).collect();
        assert_eq!(spans, vec![Span::new(0, 2), Span::new(3, 5), Span::new(6, 8)]);
    }
}
