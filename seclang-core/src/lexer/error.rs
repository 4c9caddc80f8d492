use std::rc::Rc;

use crate::utils::prelude::{ErrorKind, SeclangError, SourceFile, SrcSpan};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexicalErrorType {
    IllegalCharacter { ch: char },
    ExpectedCharacter { expected: char, after: char },
    UnterminatedString { quote: char },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexicalError {
    pub error: LexicalErrorType,
    pub location: SrcSpan,
}

impl LexicalError {
    pub fn kind(&self) -> ErrorKind {
        match self.error {
            LexicalErrorType::IllegalCharacter { .. } => ErrorKind::IllegalCharacter,
            LexicalErrorType::ExpectedCharacter { .. } => ErrorKind::ExpectedCharacter,
            LexicalErrorType::UnterminatedString { .. } => ErrorKind::UnterminatedString,
        }
    }

    pub fn details(&self) -> String {
        match self.error {
            LexicalErrorType::IllegalCharacter { ch } => format!("'{ch}'"),
            LexicalErrorType::ExpectedCharacter { expected, after } => {
                format!("'{expected}' (after '{after}')")
            },
            LexicalErrorType::UnterminatedString { quote } => {
                format!("missing closing {quote}")
            },
        }
    }

    pub fn into_diagnostic(self, source: Rc<SourceFile>) -> SeclangError {
        SeclangError::new(self.kind(), self.details(), Some(self.location), source)
    }
}
