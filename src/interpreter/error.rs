use crate::ast::BinaryOp;
use crate::diagnostic::{Diagnostic, Label, Span};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Undefined function: {name}")]
    UndefinedFunction { name: String, span: Span },
    #[error("Type error: {message}")]
    TypeError { message: String, span: Span },
    #[error("Division by zero")]
    DivisionByZero { span: Span },
    #[error("Integer overflow in `{op}`")]
    Overflow { op: BinaryOp, span: Span },
    #[error("Cannot read library `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        span: Span,
    },
    #[error("Cannot write output: {source}")]
    Output {
        #[source]
        source: std::io::Error,
        span: Span,
    },
    #[error("In library `{name}`: {source}")]
    Library {
        name: String,
        #[source]
        source: Box<crate::Error>,
        span: Span,
    },
}

impl RuntimeError {
    pub fn undefined_function_at(name: impl Into<String>, span: Span) -> Self {
        Self::UndefinedFunction { name: name.into(), span }
    }

    pub fn type_error_at(message: impl Into<String>, span: Span) -> Self {
        Self::TypeError { message: message.into(), span }
    }

    pub fn division_by_zero_at(span: Span) -> Self {
        Self::DivisionByZero { span }
    }

    pub fn overflow_at(op: BinaryOp, span: Span) -> Self {
        Self::Overflow { op, span }
    }

    /// Get the span associated with this error
    pub fn span(&self) -> Span {
        match self {
            Self::UndefinedFunction { span, .. } => *span,
            Self::TypeError { span, .. } => *span,
            Self::DivisionByZero { span } => *span,
            Self::Overflow { span, .. } => *span,
            Self::Io { span, .. } => *span,
            Self::Output { span, .. } => *span,
            Self::Library { span, .. } => *span,
        }
    }

    /// Convert to a diagnostic for pretty printing
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::UndefinedFunction { name, span } => {
                Diagnostic::error(format!("undefined function `{}`", name))
                    .with_code("E0201")
                    .with_label(Label::primary(*span, "no function or builtin with this name"))
            }
            Self::TypeError { message, span } => {
                Diagnostic::error(format!("type error: {}", message))
                    .with_code("E0202")
                    .with_label(Label::primary(*span, ""))
            }
            Self::DivisionByZero { span } => {
                Diagnostic::error("division by zero")
                    .with_code("E0203")
                    .with_label(Label::primary(*span, "division by zero here"))
            }
            Self::Overflow { op, span } => {
                Diagnostic::error(format!("integer overflow in `{}`", op))
                    .with_code("E0204")
                    .with_label(Label::primary(*span, "result does not fit in 64 bits"))
            }
            Self::Io { path, source, span } => {
                Diagnostic::error(format!("cannot read library `{}`", path.display()))
                    .with_code("E0205")
                    .with_label(Label::primary(*span, source.to_string()))
                    .with_help("check --lib-dir")
            }
            Self::Output { source, span } => {
                Diagnostic::error("cannot write output")
                    .with_code("E0207")
                    .with_label(Label::primary(*span, source.to_string()))
            }
            Self::Library { name, source, span } => {
                Diagnostic::error(format!("error in library `{}`", name))
                    .with_code("E0206")
                    .with_label(Label::primary(*span, "imported here"))
                    .with_note(source.to_string())
            }
        }
    }
}
