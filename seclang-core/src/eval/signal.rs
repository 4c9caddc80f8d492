use crate::{environment::prelude::Value, utils::prelude::SeclangError};

/// Outcome of evaluating one node. Anything but `Value` unwinds until a
/// loop, a call or the top level handles it.
#[derive(Debug, Clone)]
pub enum Signal {
    Value(Value),
    Error(SeclangError),
    Returning(Value),
    Breaking,
    Continuing,
}

impl Signal {
    pub fn null() -> Self {
        Self::Value(Value::Null)
    }
}

impl From<Value> for Signal {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<SeclangError> for Signal {
    fn from(error: SeclangError) -> Self {
        Self::Error(error)
    }
}

impl From<Result<Value, SeclangError>> for Signal {
    fn from(result: Result<Value, SeclangError>) -> Self {
        match result {
            Ok(value) => Self::Value(value),
            Err(error) => Self::Error(error),
        }
    }
}
