/// Fatal stop of a run. Never visible to scripts and never turned into a
/// diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Abort {
    #[error("Too many instructions. Force stop.")]
    InstructionLimit,
    #[error("Too many variables. Force stop.")]
    VariableLimit,
}

/// Deepest evaluation nesting followed. Recursing past it is a runtime
/// error rather than a native stack overflow.
pub const MAX_DEPTH: usize = 384;

/// Longest list `let a[n]` allocates.
pub const MAX_LIST_LENGTH: usize = 1 << 22;

/// Longest string, in bytes, that concatenation builds.
pub const MAX_STRING_LENGTH: usize = 1 << 24;

/// Counts visited nodes against an optional ceiling.
#[derive(Debug, Default)]
pub struct Governor {
    executed: u64,
    limit: Option<u64>,
}

impl Governor {
    pub fn new(limit: Option<u64>) -> Self {
        Self { executed: 0, limit }
    }

    pub fn tick(&mut self) -> Result<(), Abort> {
        self.executed += 1;

        match self.limit {
            Some(limit) if self.executed > limit => {
                tracing::warn!(executed = self.executed, limit, "instruction limit reached");
                Err(Abort::InstructionLimit)
            },
            _ => Ok(()),
        }
    }

    pub fn executed(&self) -> u64 {
        self.executed
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }
}
