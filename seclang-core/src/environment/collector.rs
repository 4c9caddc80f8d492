//! Reclaims scopes and lists that only reference cycles keep alive.
//!
//! A function holds the scope it was defined in, and that scope usually
//! binds the function, so counting references alone never frees either.
//! Scopes captured by a closure, and lists that had a list or a function
//! stored into them, are remembered as candidates. A collection walks
//! everything reachable from the candidates and counts how many references
//! to each object come from inside that graph. An object referenced from
//! anywhere else (the host, a running frame) is live together with all it
//! reaches. The rest is emptied, which breaks its cycles.

use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    rc::{Rc, Weak},
};

use super::prelude::{Elements, Scope, SymbolTable, UserFunction, Value};

const MIN_PRUNE: usize = 64;

enum Candidate {
    Scope(Weak<RefCell<SymbolTable>>),
    List(Weak<Elements>),
}

impl Candidate {
    fn is_alive(&self) -> bool {
        match self {
            Candidate::Scope(scope) => scope.strong_count() > 0,
            Candidate::List(list) => list.strong_count() > 0,
        }
    }

    fn upgrade(&self) -> Option<Object> {
        match self {
            Candidate::Scope(scope) => scope.upgrade().map(Object::Scope),
            Candidate::List(list) => list.upgrade().map(Object::List),
        }
    }
}

#[derive(Default)]
struct Candidates {
    entries: Vec<Candidate>,
    /// Tracked since the last collection.
    fresh: usize,
    prune_at: usize,
}

impl Candidates {
    fn push(&mut self, candidate: Candidate) {
        self.entries.push(candidate);
        self.fresh += 1;

        // a dead weak entry still pins its allocation
        if self.entries.len() >= self.prune_at.max(MIN_PRUNE) {
            self.entries.retain(Candidate::is_alive);
            self.prune_at = self.entries.len() * 2;
        }
    }
}

thread_local! {
    static CANDIDATES: RefCell<Candidates> = RefCell::new(Candidates::default());
}

/// Remembers a scope a closure captured.
pub fn track_scope(scope: &Scope) {
    CANDIDATES.with(|candidates| {
        candidates.borrow_mut().push(Candidate::Scope(Rc::downgrade(scope)))
    });
}

/// Remembers a list that had a list or a function stored into it.
pub fn track_list(list: &Rc<Elements>) {
    CANDIDATES.with(|candidates| {
        candidates.borrow_mut().push(Candidate::List(Rc::downgrade(list)))
    });
}

/// Frees every cycle nothing outside the cycles refers to. Returns how
/// many objects were emptied.
pub fn collect() -> usize {
    collect_with(None)
}

/// Collects only when cycles may have formed since the last collection.
pub fn collect_fresh() -> usize {
    let fresh = CANDIDATES.with(|candidates| candidates.borrow().fresh);

    if fresh == 0 {
        return 0;
    }

    collect()
}

/// Collects as if the caller's reference to `scope` were already gone.
pub fn release(scope: &Scope) -> usize {
    collect_with(Some(scope))
}

/// A reference counted allocation the collector can look into.
enum Object {
    Scope(Scope),
    List(Rc<Elements>),
    Function(Rc<UserFunction>),
}

impl Object {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::List { elements } => Some(Self::List(elements.clone())),
            Value::Function { function } => Some(Self::Function(function.clone())),
            _ => None,
        }
    }

    fn id(&self) -> *const () {
        match self {
            Self::Scope(scope) => Rc::as_ptr(scope).cast(),
            Self::List(list) => Rc::as_ptr(list).cast(),
            Self::Function(function) => Rc::as_ptr(function).cast(),
        }
    }

    fn strong_count(&self) -> usize {
        match self {
            Self::Scope(scope) => Rc::strong_count(scope),
            Self::List(list) => Rc::strong_count(list),
            Self::Function(function) => Rc::strong_count(function),
        }
    }

    /// One entry per reference this object holds, or `None` while it is
    /// mutably borrowed and cannot be looked into.
    fn references(&self) -> Option<Vec<Object>> {
        let mut references = vec![];

        match self {
            Self::Scope(scope) => {
                let table = scope.try_borrow().ok()?;

                references.extend(table.parent().cloned().map(Self::Scope));
                references.extend(table.values().filter_map(Self::of));
            },
            Self::List(list) => {
                let elements = list.try_borrow().ok()?;

                references.extend(elements.iter().filter_map(Self::of));
            },
            Self::Function(function) => references.push(Self::Scope(function.closure.clone())),
        }

        Some(references)
    }
}

struct Node {
    object: Object,
    /// References coming from other nodes.
    internal: usize,
    edges: Vec<*const ()>,
    opaque: bool,
}

impl Node {
    fn new(object: Object) -> Self {
        Self { object, internal: 0, edges: vec![], opaque: false }
    }
}

fn collect_with(releasing: Option<&Scope>) -> usize {
    // a handle dropped while the thread shuts down finds the registry gone
    let Ok(entries) = CANDIDATES.try_with(|candidates| {
        let mut candidates = candidates.borrow_mut();
        candidates.fresh = 0;

        std::mem::take(&mut candidates.entries)
    }) else {
        return 0;
    };

    let freed = sweep(&entries, releasing);

    tracing::debug!(candidates = entries.len(), freed, releasing = releasing.is_some(), "collected cycles");

    let _ = CANDIDATES.try_with(|candidates| {
        let mut candidates = candidates.borrow_mut();
        let mut entries = entries;

        entries.retain(Candidate::is_alive);
        entries.append(&mut candidates.entries);

        candidates.prune_at = entries.len() * 2;
        candidates.entries = entries;
    });

    freed
}

fn sweep(entries: &[Candidate], releasing: Option<&Scope>) -> usize {
    let released = releasing.map(|scope| Rc::as_ptr(scope).cast::<()>());

    let mut nodes: HashMap<*const (), Node> = HashMap::new();
    let mut queue = vec![];

    let seeds = entries.iter()
        .filter_map(Candidate::upgrade)
        .chain(releasing.cloned().map(Object::Scope));

    for object in seeds {
        let id = object.id();

        if !nodes.contains_key(&id) {
            nodes.insert(id, Node::new(object));
            queue.push(id);
        }
    }

    while let Some(id) = queue.pop() {
        let references = nodes.get(&id).and_then(|node| node.object.references());

        let Some(references) = references else {
            if let Some(node) = nodes.get_mut(&id) {
                node.opaque = true;
            }
            continue;
        };

        let mut edges = Vec::with_capacity(references.len());

        for object in references {
            let target = object.id();
            edges.push(target);

            nodes.entry(target)
                .or_insert_with(|| {
                    queue.push(target);
                    Node::new(object)
                })
                .internal += 1;
        }

        if let Some(node) = nodes.get_mut(&id) {
            node.edges = edges;
        }
    }

    // the graph holds one reference to every node itself
    let mut live: Vec<*const ()> = nodes.iter()
        .filter(|(id, node)| {
            let ignored = 1 + usize::from(Some(**id) == released);

            node.opaque || node.object.strong_count() > node.internal + ignored
        })
        .map(|(id, _)| *id)
        .collect();

    let mut marked = HashSet::new();

    while let Some(id) = live.pop() {
        if marked.insert(id) {
            if let Some(node) = nodes.get(&id) {
                live.extend(node.edges.iter().copied());
            }
        }
    }

    let mut values = vec![];
    let mut parents = vec![];
    let mut freed = 0;

    for (id, node) in &nodes {
        if marked.contains(id) {
            continue;
        }

        freed += 1;

        match &node.object {
            Object::Scope(scope) => {
                if let Ok(mut table) = scope.try_borrow_mut() {
                    let (bound, parent) = table.clear();

                    values.extend(bound);
                    parents.extend(parent);
                }
            },
            Object::List(list) => {
                if let Ok(mut elements) = list.try_borrow_mut() {
                    values.append(&mut elements);
                }
            },
            Object::Function(_) => {},
        }
    }

    // emptied objects go away with the graph's own references
    drop(values);
    drop(parents);
    drop(nodes);

    freed
}
