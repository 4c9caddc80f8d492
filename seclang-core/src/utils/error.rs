use std::{fmt::Display, path::PathBuf, rc::Rc};

use termcolor::Buffer;

use crate::environment::prelude::Context;
use super::diagnostic::{Diagnostic, Label, Location};
use super::src_span::{SourceFile, SrcSpan};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    IllegalCharacter,
    ExpectedCharacter,
    UnterminatedString,
    InvalidSyntax,
    Runtime,
}

impl ErrorKind {
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::IllegalCharacter => "Illegal Character",
            ErrorKind::ExpectedCharacter => "Expected Character",
            ErrorKind::UnterminatedString => "Not closed string",
            ErrorKind::InvalidSyntax => "Invalid Syntax",
            ErrorKind::Runtime => "Runtime error",
        }
    }
}

/// A diagnostic reported back to the host. Exactly one is produced by a
/// failed run; it is never a control-flow signal.
#[derive(Debug, Clone)]
pub struct SeclangError {
    pub kind: ErrorKind,
    pub details: String,
    pub span: Option<SrcSpan>,
    pub source: Rc<SourceFile>,
    /// Frame the error was raised in. Only runtime errors have one.
    pub context: Option<Rc<Context>>,
}

impl SeclangError {
    pub fn new(
        kind: ErrorKind,
        details: impl Into<String>,
        span: Option<SrcSpan>,
        source: Rc<SourceFile>,
    ) -> Self {
        Self {
            kind,
            details: details.into(),
            span,
            source,
            context: None,
        }
    }

    pub fn runtime(details: impl Into<String>, span: Option<SrcSpan>, context: &Rc<Context>) -> Self {
        Self {
            kind: ErrorKind::Runtime,
            details: details.into(),
            span,
            source: context.source.clone(),
            context: Some(context.clone()),
        }
    }

    /// Named frames, outermost first, each with the line it was at.
    pub fn traceback(&self) -> Vec<(String, String, u32)> {
        let (Some(span), Some(context)) = (self.span, &self.context) else {
            return vec![];
        };

        let mut frames = vec![];
        let mut position = Some(span.start);
        let mut current = Some(context.clone());

        while let (Some(context), Some(pos)) = (current, position) {
            if let Some(name) = &context.display_name {
                frames.push((context.source.name.clone(), name.clone(), pos.line + 1));
                position = context.entry;
            }

            current = context.parent.clone();
        }

        frames.reverse();
        frames
    }

    fn write_pointer(&self, f: &mut std::fmt::Formatter<'_>, span: SrcSpan) -> std::fmt::Result {
        writeln!(f, "{}", self.source.line(span.start.line))?;

        let carets = span.end.col.saturating_sub(span.start.col).max(1) as usize;
        writeln!(f, "{}{}", " ".repeat(span.start.col as usize), "^".repeat(carets))
    }

    pub fn pretty_string(&self) -> String {
        let mut nocolor = Buffer::no_color();
        self.pretty(&mut nocolor);
        String::from_utf8(nocolor.into_inner()).expect("Error printing produced invalid utf8")
    }

    pub fn pretty(&self, buf: &mut Buffer) {
        use std::io::Write;

        self.to_diagnostic().write(buf);
        writeln!(buf).expect("write new line diagnostic");
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let location = self.span.map(|span| {
            let extra_labels = self.call_sites()
                .into_iter()
                .filter(|(source, _)| Rc::ptr_eq(source, &self.source))
                .map(|(_, span)| Label {
                    text: Some("called from here".into()),
                    span,
                })
                .collect();

            Location {
                src: &self.source.text,
                path: PathBuf::from(&self.source.name),
                label: Label {
                    text: Some(self.details.clone()),
                    span,
                },
                extra_labels,
            }
        });

        Diagnostic {
            title: self.kind.name().into(),
            text: if location.is_some() { String::new() } else { self.details.clone() },
            location,
        }
    }

    // Entry points of the enclosing calls, used as secondary labels.
    fn call_sites(&self) -> Vec<(Rc<SourceFile>, SrcSpan)> {
        let mut sites = vec![];
        let mut current = self.context.clone();

        while let Some(context) = current {
            if let (Some(entry), Some(parent)) = (context.entry, &context.parent) {
                sites.push((parent.source.clone(), SrcSpan::from(entry, entry)));
            }

            current = context.parent.clone();
        }

        sites
    }
}

impl Display for SeclangError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.kind, self.span) {
            (ErrorKind::Runtime, Some(span)) => {
                writeln!(f, "Traceback (most recent call last):")?;

                for (file, frame, line) in self.traceback() {
                    writeln!(f, "  File {file}, line {line}, in {frame}")?;
                }

                writeln!(f, "{}: {}", self.kind.name(), self.details)?;
                self.write_pointer(f, span)
            },
            (_, Some(span)) => {
                writeln!(f, "{}: {}", self.kind.name(), self.details)?;
                writeln!(f, "File {}, line {}", self.source.name, span.end.line + 1)?;
                self.write_pointer(f, span)
            },
            (_, None) => writeln!(f, "{}: {}", self.kind.name(), self.details),
        }
    }
}

impl std::error::Error for SeclangError {}

impl PartialEq for SeclangError {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.details == other.details
            && self.span == other.span
    }
}
