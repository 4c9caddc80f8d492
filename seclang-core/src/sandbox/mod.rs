pub mod convert;
pub mod globals;
pub mod output;

pub mod prelude {
    pub use super::{
        convert::*,
        globals::*,
        output::*,
        run, run_source, sandbox_run, Limits, Outcome, RunOptions, SandboxError, SandboxOutput,
    };
}

#[cfg(test)]
mod tests;

use std::{collections::BTreeMap, rc::Rc};

use crate::{
    environment::{
        collector,
        prelude::{Context, SymbolTable, Value, PROGRAM},
    },
    eval::prelude::{Abort, Governor, Interpreter},
    parser::prelude::parse_program,
    utils::prelude::{SeclangError, SourceFile},
};

use self::prelude::{Globals, OutputBuffer, OutputSink, Printer};

/// Ceilings for one run. `None` means unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Limits {
    pub max_instructions: Option<u64>,
    pub max_variables: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Name diagnostics report the program under.
    pub filename: String,
    pub limits: Limits,
    /// Echo printed lines to stdout as well as to the output sink.
    pub log_to_console: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            filename: PROGRAM.into(),
            limits: Limits::default(),
            log_to_console: true,
        }
    }
}

/// Result of a run that was not aborted.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Ok(Value),
    Failure(SeclangError),
}

impl Outcome {
    pub fn value(&self) -> Option<&Value> {
        match self {
            Outcome::Ok(value) => Some(value),
            Outcome::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&SeclangError> {
        match self {
            Outcome::Ok(_) => None,
            Outcome::Failure(error) => Some(error),
        }
    }

    pub fn into_result(self) -> Result<Value, SeclangError> {
        match self {
            Outcome::Ok(value) => Ok(value),
            Outcome::Failure(error) => Err(error),
        }
    }
}

/// Lexes, parses and evaluates `text`.
///
/// Diagnostics come back as [`Outcome::Failure`]; only the resource
/// ceilings end a run with `Err`. When `globals` is given, the program runs
/// in that scope, so its bindings survive for the next run. Cycles the run
/// left unreachable are collected before returning.
pub fn run(
    text: &str,
    options: &RunOptions,
    output: Option<&mut dyn OutputSink>,
    globals: Option<&Globals>,
) -> Result<Outcome, Abort> {
    let source = SourceFile::new(options.filename.clone(), text);

    run_source(&source, options, output, globals)
}

pub fn run_source(
    source: &Rc<SourceFile>,
    options: &RunOptions,
    output: Option<&mut dyn OutputSink>,
    globals: Option<&Globals>,
) -> Result<Outcome, Abort> {
    let program = match parse_program(source) {
        Ok(program) => program,
        Err(err) => return Ok(Outcome::Failure(err)),
    };

    tracing::debug!(file = %source.name, statements = program.nodes.len(), "parsed program");

    let builtins = SymbolTable::builtins(options.limits.max_variables)?;

    let scope = match globals {
        Some(globals) => {
            globals.scope().borrow_mut().reparent(builtins);
            globals.scope().clone()
        },
        None => builtins,
    };

    let context = Context::program(source.clone());
    let mut governor = Governor::new(options.limits.max_instructions);
    let mut printer = Printer::new(options.log_to_console, output);

    let result = Interpreter::new(&mut governor, &mut printer)
        .run_program(&program, &context, &scope);

    drop(scope);
    let freed = collector::collect_fresh();

    tracing::debug!(
        file = %source.name,
        executed = governor.executed(),
        aborted = result.is_err(),
        freed,
        "run finished"
    );

    Ok(match result? {
        Ok(value) => Outcome::Ok(value),
        Err(error) => Outcome::Failure(error),
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct SandboxOutput {
    pub stdout: Vec<String>,
    pub globals: BTreeMap<String, Value>,
    pub result: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// The program failed with a diagnostic, rendered as text.
    #[error("{0}")]
    Code(String),
    #[error(transparent)]
    Abort(#[from] Abort),
}

/// Runs `text` with host provided globals, console echo off and printed
/// lines captured.
pub fn sandbox_run<I, K, V>(
    text: &str,
    limits: Limits,
    environment: I,
) -> Result<SandboxOutput, SandboxError>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    let globals = Globals::new();

    for (name, value) in environment {
        globals.declare(name, value)?;
    }

    let options = RunOptions {
        limits,
        log_to_console: false,
        ..RunOptions::default()
    };

    let mut stdout = OutputBuffer::default();

    let result = run(text, &options, Some(&mut stdout), Some(&globals))?
        .into_result()
        .map_err(|error| SandboxError::Code(error.to_string()))?;

    let globals = globals.bindings()
        .into_iter()
        .collect();

    Ok(SandboxOutput {
        stdout: stdout.lines(),
        globals,
        result,
    })
}
