use crate::diagnostic::Span;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords (spelling comes from the keyword table)
    If,
    Else,
    While,
    Fn,
    Return,
    Import,
    Then,
    End,

    // Literals and Identifiers
    Number(i64),
    /// Raw string literal, surrounding quotes included.
    String(String),
    Ident(String),

    // Arithmetic Operators
    Plus,
    Minus,
    Star,
    Slash,

    // Comparison Operators
    EqEq,
    NotEq,
    Less,
    Greater,
    LessEq,
    GreaterEq,

    Assign,

    // Delimiters
    LParen,
    RParen,
    Comma,
    Newline,
}

impl Token {
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            Token::If
                | Token::Else
                | Token::While
                | Token::Fn
                | Token::Return
                | Token::Import
                | Token::Then
                | Token::End
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::If => write!(f, "IF"),
            Token::Else => write!(f, "ELSE"),
            Token::While => write!(f, "WHILE"),
            Token::Fn => write!(f, "FN"),
            Token::Return => write!(f, "RETURN"),
            Token::Import => write!(f, "IMPORT"),
            Token::Then => write!(f, "THEN"),
            Token::End => write!(f, "END"),
            Token::Number(n) => write!(f, "NUMBER({})", n),
            Token::String(s) => write!(f, "STRING({})", s),
            Token::Ident(name) => write!(f, "IDENT({})", name),
            Token::Plus => write!(f, "PLUS"),
            Token::Minus => write!(f, "MINUS"),
            Token::Star => write!(f, "STAR"),
            Token::Slash => write!(f, "SLASH"),
            Token::EqEq => write!(f, "EQEQ"),
            Token::NotEq => write!(f, "NEQ"),
            Token::Less => write!(f, "LT"),
            Token::Greater => write!(f, "GT"),
            Token::LessEq => write!(f, "LE"),
            Token::GreaterEq => write!(f, "GE"),
            Token::Assign => write!(f, "EQ"),
            Token::LParen => write!(f, "LPAREN"),
            Token::RParen => write!(f, "RPAREN"),
            Token::Comma => write!(f, "COMMA"),
            Token::Newline => write!(f, "NEWLINE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

impl SpannedToken {
    pub fn new(token: Token, span: Span) -> Self {
        Self { token, span }
    }
}
