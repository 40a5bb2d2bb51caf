pub mod ast;
pub mod cli;
pub mod config;
pub mod diagnostic;
pub mod interpreter;
pub mod keywords;
pub mod lexer;
pub mod repl;
pub mod token;
pub mod value;

pub use ast::{Block, Expr, ExprKind, Stmt};
pub use interpreter::{Interpreter, ParseError, RuntimeError};
pub use keywords::{ConfigError, Keyword, KeywordTable};
pub use lexer::{LexError, Lexer};
pub use token::{SpannedToken, Token};
pub use value::Value;

use diagnostic::Diagnostic;
use thiserror::Error;

/// Any failure on the way from source text to a value.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Error::Lex(e) => e.to_diagnostic(),
            Error::Parse(e) => e.to_diagnostic(),
            Error::Runtime(e) => e.to_diagnostic(),
            Error::Config(e) => e.to_diagnostic(),
        }
    }
}

pub fn parse(tokens: Vec<SpannedToken>) -> Result<Block, ParseError> {
    interpreter::TokenParser::new(tokens).parse()
}

/// Tokenizes, parses and runs `source` on a fresh interpreter.
pub fn run_source(source: &str, keywords: &KeywordTable) -> Result<Value, Error> {
    Interpreter::with_keywords(keywords.clone()).run_source(source)
}
