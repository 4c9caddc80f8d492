use crate::{
    environment::{
        collector,
        prelude::{Scope, SymbolTable, Value},
    },
    eval::prelude::Abort,
};

/// Top level scope kept by the host between runs.
///
/// Functions a program defines hold on to this scope, which in turn binds
/// them. Dropping the handle frees whatever only those cycles kept alive;
/// a [`Callable`](super::prelude::Callable) the host still holds keeps its
/// scope usable.
pub struct Globals {
    scope: Scope,
}

impl Globals {
    pub fn new() -> Self {
        Self { scope: SymbolTable::scope(None) }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn declare(&self, name: impl Into<String>, value: impl Into<Value>) -> Result<(), Abort> {
        self.scope.borrow_mut().declare(name, value.into())
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.scope.borrow().get(name)
    }

    /// Own bindings, sorted by name. Built-ins are not included.
    pub fn bindings(&self) -> Vec<(String, Value)> {
        self.scope.borrow().bindings()
    }
}

impl Default for Globals {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Globals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Globals")
            .field("usage", &self.scope.borrow().usage())
            .finish()
    }
}

impl Drop for Globals {
    fn drop(&mut self) {
        let freed = collector::release(&self.scope);

        tracing::trace!(freed, "globals dropped");
    }
}
