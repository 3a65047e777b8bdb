use std::fmt::{self, Display};

use thiserror::Error;

use crate::frontend::lexer::Ops;
use crate::frontend::location::SourceLocation;

pub type EvalResult<T> = Result<T, EvalError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Variable,
    Function,
}

impl Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingKind::Variable => f.write_str("variable"),
            BindingKind::Function => f.write_str("function"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    DuplicateDeclaration,
    UnsupportedConstruct,
    Runtime,
}

// Every error carries the range of the node that raised it so the
// reporter can frame the offending source.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("duplicate declaration of {binding} `{name}`")]
    DuplicateDeclaration {
        name: String,
        binding: BindingKind,
        loc: SourceLocation,
    },

    #[error("unsupported node kind: {kind}")]
    UnsupportedNodeKind {
        kind: &'static str,
        loc: SourceLocation,
    },

    #[error("unsupported operator: {operator}")]
    UnsupportedOperator { operator: Ops, loc: SourceLocation },

    #[error("{callee} is not a function")]
    NotCallable { callee: String, loc: SourceLocation },

    #[error("cannot read property `{property}` of {target}")]
    NotAnObject {
        property: String,
        target: &'static str,
        loc: SourceLocation,
    },

    #[error("expected a number, found {found}")]
    NotANumber {
        found: &'static str,
        loc: SourceLocation,
    },

    #[error("maximum call depth of {limit} exceeded")]
    CallDepthExceeded { limit: usize, loc: SourceLocation },

    #[error("expression nested deeper than {limit} levels")]
    NestingTooDeep { limit: usize, loc: SourceLocation },

    #[error("{function}: {message}")]
    Native {
        function: String,
        message: String,
        loc: SourceLocation,
    },
}

impl EvalError {
    pub fn loc(&self) -> SourceLocation {
        match self {
            EvalError::DuplicateDeclaration { loc, .. }
            | EvalError::UnsupportedNodeKind { loc, .. }
            | EvalError::UnsupportedOperator { loc, .. }
            | EvalError::NotCallable { loc, .. }
            | EvalError::NotAnObject { loc, .. }
            | EvalError::NotANumber { loc, .. }
            | EvalError::CallDepthExceeded { loc, .. }
            | EvalError::NestingTooDeep { loc, .. }
            | EvalError::Native { loc, .. } => *loc,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EvalError::DuplicateDeclaration { .. } => ErrorCategory::DuplicateDeclaration,
            EvalError::UnsupportedNodeKind { .. } | EvalError::UnsupportedOperator { .. } => {
                ErrorCategory::UnsupportedConstruct
            }
            _ => ErrorCategory::Runtime,
        }
    }
}
