use std::{cell::RefCell, collections::HashMap, rc::Rc};

use crate::eval::prelude::Abort;

use super::prelude::Value;

pub type Scope = Rc<RefCell<SymbolTable>>;

/// Bindings of one scope. Every table counts the slots its bindings take
/// and refuses declarations past its ceiling.
#[derive(Default, Debug)]
pub struct SymbolTable {
    symbols: HashMap<String, Value>,
    parent: Option<Scope>,
    usage: usize,
    limit: Option<usize>,
}

impl SymbolTable {
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            symbols: HashMap::new(),
            parent: None,
            usage: 0,
            limit,
        }
    }

    pub fn scope(limit: Option<usize>) -> Scope {
        Rc::new(RefCell::new(Self::new(limit)))
    }

    /// A nested scope whose ceiling is what the parent has left.
    pub fn child(parent: &Scope) -> Scope {
        let limit = parent.borrow().remaining();

        Rc::new(RefCell::new(Self {
            symbols: HashMap::new(),
            parent: Some(parent.clone()),
            usage: 0,
            limit,
        }))
    }

    pub fn remaining(&self) -> Option<usize> {
        self.limit.map(|limit| limit.saturating_sub(self.usage))
    }

    pub fn usage(&self) -> usize {
        self.usage
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn set_limit(&mut self, limit: Option<usize>) {
        self.limit = limit;
    }

    pub fn parent(&self) -> Option<&Scope> {
        self.parent.as_ref()
    }

    /// Hangs this table under `parent` and takes the parent's leftover
    /// capacity as the new ceiling.
    pub fn reparent(&mut self, parent: Scope) {
        self.limit = parent.borrow().remaining();
        self.parent = Some(parent);
    }

    /// Looks `name` up here and then in every ancestor.
    pub fn get(&self, name: &str) -> Option<Value> {
        match self.symbols.get(name) {
            Some(value) => Some(value.clone()),
            None => self.parent.as_ref()?.borrow().get(name),
        }
    }

    /// Only this table is checked, so shadowing an outer name is allowed.
    pub fn is_defined(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    pub fn declare(&mut self, name: impl Into<String>, value: Value) -> Result<(), Abort> {
        let name = name.into();
        let released = self.symbols.get(&name).map_or(0, Value::usage);
        let usage = self.usage.saturating_sub(released) + value.usage();

        if self.limit.is_some_and(|limit| usage > limit) {
            tracing::warn!(%name, usage, limit = ?self.limit, "variable limit reached");
            return Err(Abort::VariableLimit);
        }

        self.usage = usage;
        self.symbols.insert(name, value);
        Ok(())
    }

    /// Rebinds the nearest existing `name`. Returns false when no table in
    /// the chain has it.
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        if let Some(slot) = self.symbols.get_mut(name) {
            *slot = value;
            return true;
        }

        match &self.parent {
            Some(parent) => parent.borrow_mut().assign(name, value),
            None => false,
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let value = self.symbols.remove(name)?;
        self.usage = self.usage.saturating_sub(value.usage());

        Some(value)
    }

    /// Own bound values, in no particular order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.symbols.values()
    }

    /// Empties the table and detaches it from its parent, handing back what
    /// it held so the caller decides when it is dropped.
    pub fn clear(&mut self) -> (Vec<Value>, Option<Scope>) {
        self.usage = 0;

        let values = self.symbols.drain().map(|(_, value)| value).collect();

        (values, self.parent.take())
    }

    /// Own bindings, sorted by name.
    pub fn bindings(&self) -> Vec<(String, Value)> {
        let mut bindings: Vec<_> = self.symbols.iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        bindings.sort_by(|a, b| a.0.cmp(&b.0));
        bindings
    }
}
