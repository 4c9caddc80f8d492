use std::rc::Rc;

use crate::utils::prelude::{Position, SourceFile};

pub const PROGRAM: &str = "<program>";
pub const ANONYMOUS: &str = "<anonymous>";

/// A frame of the diagnostic call chain. Only named frames show up in a
/// traceback; `if`/`while`/`for` bodies get unnamed ones.
#[derive(Debug)]
pub struct Context {
    pub display_name: Option<String>,
    pub parent: Option<Rc<Context>>,
    /// Where the parent frame was when this one was entered.
    pub entry: Option<Position>,
    pub source: Rc<SourceFile>,
}

impl Context {
    pub fn program(source: Rc<SourceFile>) -> Rc<Self> {
        Rc::new(Self {
            display_name: Some(PROGRAM.into()),
            parent: None,
            entry: None,
            source,
        })
    }

    pub fn block(parent: &Rc<Context>) -> Rc<Self> {
        Rc::new(Self {
            display_name: None,
            parent: Some(parent.clone()),
            entry: None,
            source: parent.source.clone(),
        })
    }

    pub fn call(
        name: &str,
        parent: &Rc<Context>,
        entry: Position,
        source: Rc<SourceFile>,
    ) -> Rc<Self> {
        Rc::new(Self {
            display_name: Some(name.into()),
            parent: Some(parent.clone()),
            entry: Some(entry),
            source,
        })
    }
}
