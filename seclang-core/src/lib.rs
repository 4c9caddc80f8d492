pub mod lexer;
pub mod parser;
pub mod environment;
pub mod eval;
pub mod sandbox;
pub mod utils;

pub use environment::{
    collector::collect,
    prelude::{Scope, SymbolTable, Value},
};
pub use eval::prelude::Abort;
pub use sandbox::prelude::{
    run, sandbox_run, Callable, Globals, HostValue, Limits, NullOutput, Outcome, OutputBuffer, OutputSink,
    RunOptions, SandboxError, SandboxOutput,
};
pub use utils::prelude::{SeclangError, SourceFile};
