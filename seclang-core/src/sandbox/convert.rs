use std::rc::Rc;

use crate::{
    environment::{
        collector,
        prelude::{Context, Elements, Value},
    },
    eval::prelude::{Abort, Governor, Interpreter, MAX_DEPTH},
    utils::prelude::{SeclangError, SourceFile, SrcSpan},
};

use super::prelude::OutputSink;

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::string(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::string(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::list(value.into_iter().map(Into::into).collect())
    }
}

impl From<HostValue> for Value {
    fn from(value: HostValue) -> Self {
        match value {
            HostValue::Null => Value::Null,
            HostValue::Number(value) => Value::number(value),
            HostValue::String(value) => Value::string(value),
            HostValue::List(elements) => elements.into(),
            HostValue::Callable(callable) => callable.function,
        }
    }
}

/// A runtime value detached from the interpreter. Lists are copied out;
/// functions stay callable. A list that contains itself, or one nested
/// deeper than the evaluator would go, is copied as null at that point.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    Null,
    Number(f64),
    String(String),
    List(Vec<HostValue>),
    Callable(Callable),
}

impl From<&Value> for HostValue {
    fn from(value: &Value) -> Self {
        detach(value, &mut vec![])
    }
}

/// `path` holds the lists enclosing `value`.
fn detach(value: &Value, path: &mut Vec<*const Elements>) -> HostValue {
    match value {
        Value::Null => HostValue::Null,
        Value::Number { value } => HostValue::Number(*value),
        Value::String { value } => HostValue::String(value.clone()),
        Value::List { elements } => {
            let id = Rc::as_ptr(elements);

            if path.len() >= MAX_DEPTH || path.contains(&id) {
                return HostValue::Null;
            }

            path.push(id);
            let list = elements.borrow().iter().map(|element| detach(element, path)).collect();
            path.pop();

            HostValue::List(list)
        },
        Value::Function { .. } | Value::Builtin { .. } => {
            HostValue::Callable(Callable { function: value.clone() })
        },
    }
}

impl From<Value> for HostValue {
    fn from(value: Value) -> Self {
        HostValue::from(&value)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("{0}")]
    Diagnostic(SeclangError),
    #[error(transparent)]
    Abort(#[from] Abort),
}

/// A script function the host can call back into.
#[derive(Debug, Clone, PartialEq)]
pub struct Callable {
    function: Value,
}

impl Callable {
    pub fn new(function: Value) -> Option<Self> {
        function.is_callable().then_some(Self { function })
    }

    pub fn function(&self) -> &Value {
        &self.function
    }

    /// Runs the function under its own instruction ceiling. A body that
    /// finishes without `return` gives null, and `break` or `continue`
    /// escaping the body is a diagnostic.
    pub fn call(
        &self,
        args: Vec<Value>,
        max_instructions: Option<u64>,
        output: &mut dyn OutputSink,
    ) -> Result<Value, CallError> {
        let source = match &self.function {
            Value::Function { function } => function.source.clone(),
            _ => SourceFile::new("<host>", ""),
        };

        let context = Context::program(source);
        let mut governor = Governor::new(max_instructions);
        let span = SrcSpan::default();

        let result = Interpreter::new(&mut governor, output)
            .invoke(&self.function, args, span, &context);

        tracing::debug!(function = %self.function, executed = governor.executed(), "host call finished");

        collector::collect_fresh();

        result?.map_err(CallError::Diagnostic)
    }
}

impl HostValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            HostValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_callable(&self) -> Option<&Callable> {
        match self {
            HostValue::Callable(callable) => Some(callable),
            _ => None,
        }
    }
}
