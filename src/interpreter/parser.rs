use crate::ast::{BinaryOp, Block, Expr, ExprKind, FunctionDef, Stmt};
use crate::diagnostic::{Diagnostic, Label, Span};
use crate::token::{SpannedToken, Token};
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("{expected}, found {found}")]
    Expected {
        expected: &'static str,
        found: String,
        span: Span,
    },
    #[error("Unexpected token {found}")]
    UnexpectedToken { found: String, span: Span },
    #[error("invalid assignment")]
    InvalidAssignment { span: Span },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            Self::Expected { span, .. } => *span,
            Self::UnexpectedToken { span, .. } => *span,
            Self::InvalidAssignment { span } => *span,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::Expected { expected, found, span } => Diagnostic::error(*expected)
                .with_code("E0101")
                .with_label(Label::primary(*span, format!("found {}", found))),
            Self::UnexpectedToken { found, span } => Diagnostic::error(format!("unexpected token {}", found))
                .with_code("E0102")
                .with_label(Label::primary(*span, "cannot start an expression")),
            Self::InvalidAssignment { span } => Diagnostic::error("invalid assignment")
                .with_code("E0103")
                .with_label(Label::primary(*span, "only a plain variable can be assigned"))
                .with_help("write `name = value`"),
        }
    }
}

/// Recursive-descent parser over a lexed token stream.
///
/// Newline tokens are dropped up front; statement boundaries are implied by
/// the grammar alone.
pub struct TokenParser {
    tokens: Vec<SpannedToken>,
    current: usize,
}

impl TokenParser {
    pub fn new(tokens: Vec<SpannedToken>) -> Self {
        let tokens = tokens
            .into_iter()
            .filter(|t| t.token != Token::Newline)
            .collect();
        Self { tokens, current: 0 }
    }

    fn current_token(&self) -> Option<&Token> {
        self.tokens.get(self.current).map(|t| &t.token)
    }

    fn current_span(&self) -> Span {
        match self.tokens.get(self.current) {
            Some(t) => t.span,
            None => {
                let end = self.tokens.last().map(|t| t.span.end).unwrap_or(0);
                Span::new(end, end)
            }
        }
    }

    fn found(&self) -> String {
        match self.current_token() {
            Some(token) => token.to_string(),
            None => "end of input".to_string(),
        }
    }

    fn advance(&mut self) -> Option<SpannedToken> {
        let token = self.tokens.get(self.current).cloned();
        if token.is_some() {
            self.current += 1;
        }
        token
    }

    fn check(&self, expected: &Token) -> bool {
        self.current_token()
            .is_some_and(|token| std::mem::discriminant(token) == std::mem::discriminant(expected))
    }

    fn match_token(&mut self, expected: &Token) -> Option<SpannedToken> {
        if self.check(expected) {
            self.advance()
        } else {
            None
        }
    }

    fn skip_commas(&mut self) {
        while self.match_token(&Token::Comma).is_some() {}
    }

    fn expected(&self, message: &'static str) -> ParseError {
        ParseError::Expected {
            expected: message,
            found: self.found(),
            span: self.current_span(),
        }
    }

    fn expect(&mut self, expected: Token, message: &'static str) -> Result<SpannedToken, ParseError> {
        match self.match_token(&expected) {
            Some(token) => Ok(token),
            None => Err(self.expected(message)),
        }
    }

    fn expect_ident(&mut self, message: &'static str) -> Result<Rc<str>, ParseError> {
        let Some(Token::Ident(name)) = self.current_token() else {
            return Err(self.expected(message));
        };
        let name = Rc::from(name.as_str());
        self.advance();
        Ok(name)
    }

    pub fn parse(&mut self) -> Result<Block, ParseError> {
        let mut statements = Vec::new();
        while self.current_token().is_some() {
            statements.push(self.parse_statement()?);
        }
        tracing::debug!(statements = statements.len(), "parsed program");
        Ok(Block::new(statements))
    }

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        match self.current_token() {
            Some(Token::Import) => self.parse_import_statement(),
            Some(Token::Fn) => self.parse_function_statement(),
            Some(Token::If) => self.parse_if_statement(),
            Some(Token::While) => self.parse_while_statement(),
            Some(Token::Return) => self.parse_return_statement(),
            _ => Ok(Stmt::Expr(self.parse_expression()?)),
        }
    }

    /// Statements up to (not including) `end`, `else` or end of input.
    fn parse_block(&mut self) -> Result<Block, ParseError> {
        let mut statements = Vec::new();
        while !matches!(self.current_token(), Some(Token::End) | Some(Token::Else) | None) {
            statements.push(self.parse_statement()?);
        }
        Ok(Block::new(statements))
    }

    fn parse_import_statement(&mut self) -> Result<Stmt, ParseError> {
        let keyword = self.expect(Token::Import, "expected import")?;
        let Some(Token::String(raw)) = self.current_token() else {
            return Err(self.expected("expected library name"));
        };
        let name = Rc::from(raw.trim_matches('"'));
        let span = keyword.span.merge(self.current_span());
        self.advance();
        Ok(Stmt::Import { name, span })
    }

    fn parse_function_statement(&mut self) -> Result<Stmt, ParseError> {
        self.expect(Token::Fn, "expected fn")?;
        let name = self.expect_ident("expected function name")?;
        self.expect(Token::LParen, "expected (")?;

        let mut params = Vec::new();
        while self.match_token(&Token::RParen).is_none() {
            params.push(self.expect_ident("expected parameter")?);
            self.skip_commas();
        }

        self.expect(Token::Then, "expected then")?;
        let body = self.parse_block()?;
        self.expect(Token::End, "expected end")?;

        Ok(Stmt::Function(Rc::new(FunctionDef { name, params, body })))
    }

    fn parse_condition(&mut self) -> Result<Expr, ParseError> {
        self.expect(Token::LParen, "expected (")?;
        let condition = self.parse_expression()?;
        self.expect(Token::RParen, "expected )")?;
        Ok(condition)
    }

    fn parse_if_statement(&mut self) -> Result<Stmt, ParseError> {
        self.expect(Token::If, "expected if")?;
        let condition = self.parse_condition()?;
        self.expect(Token::Then, "expected then")?;
        let then_block = self.parse_block()?;

        let else_block = if self.match_token(&Token::Else).is_some() {
            self.expect(Token::Then, "expected then")?;
            Some(self.parse_block()?)
        } else {
            None
        };

        self.expect(Token::End, "expected end")?;
        Ok(Stmt::If {
            condition,
            then_block,
            else_block,
        })
    }

    fn parse_while_statement(&mut self) -> Result<Stmt, ParseError> {
        self.expect(Token::While, "expected while")?;
        let condition = self.parse_condition()?;
        self.expect(Token::Then, "expected then")?;
        let body = self.parse_block()?;
        self.expect(Token::End, "expected end")?;
        Ok(Stmt::While { condition, body })
    }

    fn parse_return_statement(&mut self) -> Result<Stmt, ParseError> {
        self.expect(Token::Return, "expected return")?;
        Ok(Stmt::Return(self.parse_expression()?))
    }

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        let target = self.parse_binary_expr()?;

        if self.match_token(&Token::Assign).is_some() {
            let value = self.parse_assignment()?;
            let span = target.span.merge(value.span);
            return match target.kind {
                ExprKind::Variable(name) => Ok(Expr::new(
                    ExprKind::Assign {
                        name,
                        value: Box::new(value),
                    },
                    span,
                )),
                _ => Err(ParseError::InvalidAssignment { span: target.span }),
            };
        }

        Ok(target)
    }

    fn token_to_binary_operator(token: &Token) -> Option<BinaryOp> {
        match token {
            Token::Plus => Some(BinaryOp::Add),
            Token::Minus => Some(BinaryOp::Sub),
            Token::Star => Some(BinaryOp::Mul),
            Token::Slash => Some(BinaryOp::Div),
            Token::EqEq => Some(BinaryOp::Eq),
            Token::NotEq => Some(BinaryOp::NotEq),
            Token::Less => Some(BinaryOp::Less),
            Token::Greater => Some(BinaryOp::Greater),
            Token::LessEq => Some(BinaryOp::LessEq),
            Token::GreaterEq => Some(BinaryOp::GreaterEq),
            _ => None,
        }
    }

    /// One flat level: every operator binds the same, left to right.
    fn parse_binary_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_primary()?;

        while let Some(op) = self.current_token().and_then(Self::token_to_binary_operator) {
            self.advance();
            let right = self.parse_primary()?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                span,
            );
        }

        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let span = self.current_span();
        let Some(token) = self.current_token().cloned() else {
            return Err(ParseError::UnexpectedToken {
                found: self.found(),
                span,
            });
        };

        match token {
            Token::Number(n) => {
                self.advance();
                Ok(Expr::new(ExprKind::Number(n), span))
            }
            Token::String(raw) => {
                self.advance();
                Ok(Expr::new(ExprKind::String(Rc::from(raw.as_str())), span))
            }
            Token::Ident(name) => {
                self.advance();
                let name: Rc<str> = Rc::from(name.as_str());

                if self.match_token(&Token::LParen).is_none() {
                    return Ok(Expr::new(ExprKind::Variable(name), span));
                }

                let mut args = Vec::new();
                let close = loop {
                    if let Some(close) = self.match_token(&Token::RParen) {
                        break close;
                    }
                    args.push(self.parse_expression()?);
                    self.skip_commas();
                };

                Ok(Expr::new(ExprKind::Call { name, args }, span.merge(close.span)))
            }
            other => Err(ParseError::UnexpectedToken {
                found: other.to_string(),
                span,
            }),
        }
    }
}
