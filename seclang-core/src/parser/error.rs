use std::rc::Rc;

use crate::{
    lexer::prelude::Token,
    utils::prelude::{ErrorKind, SeclangError, SourceFile, SrcSpan},
};

#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorType {
    UnexpectedToken {
        token: Token,
        expected: Vec<&'static str>,
    },
    TooDeep {
        max_depth: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub error: ParseErrorType,
    pub span: SrcSpan
}

impl ParseError {
    /// Backtracking must not retry past this failure.
    pub fn is_too_deep(&self) -> bool {
        matches!(self.error, ParseErrorType::TooDeep { .. })
    }

    pub fn details(&self) -> String {
        match &self.error {
            ParseErrorType::UnexpectedToken { expected, .. } => {
                format!("Expected {}", one_of(expected))
            },
            ParseErrorType::TooDeep { max_depth } => {
                format!("Nesting depth exceeds maximum of {max_depth} levels")
            },
        }
    }

    pub fn into_diagnostic(self, source: Rc<SourceFile>) -> SeclangError {
        SeclangError::new(ErrorKind::InvalidSyntax, self.details(), Some(self.span), source)
    }
}

// `a`, `a or b`, `a, b or c`
fn one_of(expected: &[&'static str]) -> String {
    match expected {
        [] => "nothing".to_string(),
        [only] => only.to_string(),
        [rest @ .., last] => format!("{} or {last}", rest.join(", ")),
    }
}
