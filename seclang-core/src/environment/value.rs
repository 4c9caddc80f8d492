use std::{
    cell::RefCell,
    collections::HashSet,
    fmt::{Debug, Display},
    ops::Deref,
    rc::Rc,
};

use crate::{
    environment::prelude::{Scope, ANONYMOUS},
    parser::prelude::Node,
    sandbox::prelude::OutputSink,
    utils::prelude::SourceFile,
};

pub const TRUE: Value = Value::Number { value: 1.0 };
pub const FALSE: Value = Value::Number { value: 0.0 };

/// Runtime value. Cloning is cheap: lists and functions are shared, so a
/// cloned list aliases the original elements.
#[derive(Clone)]
pub enum Value {
    /// Numeric "no value" sentinel. Reads as zero, prints as `null`.
    Null,
    Number {
        value: f64,
    },
    String {
        value: String,
    },
    List {
        elements: Rc<Elements>,
    },
    Function {
        function: Rc<UserFunction>,
    },
    Builtin {
        function: Rc<BuiltinFunction>,
    },
}

impl Value {
    pub fn number(value: f64) -> Self {
        Self::Number { value }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::String { value: value.into() }
    }

    pub fn list(elements: Vec<Value>) -> Self {
        Self::List { elements: Rc::new(Elements::new(elements)) }
    }

    pub fn boolean(value: bool) -> Self {
        if value { TRUE } else { FALSE }
    }

    /// Wraps a host closure so scripts can call it.
    pub fn native<F>(name: impl Into<String>, arity: usize, func: F) -> Self
    where
        F: Fn(&[Value], &mut dyn OutputSink) -> Result<Value, String> + 'static,
    {
        Self::Builtin {
            function: Rc::new(BuiltinFunction {
                name: name.into(),
                arity,
                func: Box::new(func),
            }),
        }
    }

    pub fn is_true(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Number { value } => *value != 0.0,
            Self::String { value } => !value.is_empty(),
            Self::List { elements } => !elements.borrow().is_empty(),
            Self::Function { .. } | Self::Builtin { .. } => false,
        }
    }

    /// The numeric reading of numbers and null.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Null => Some(0.0),
            Self::Number { value } => Some(*value),
            _ => None,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Function { .. } | Self::Builtin { .. })
    }

    /// Whether storing this value somewhere can close a reference cycle.
    pub fn is_shared(&self) -> bool {
        matches!(self, Self::List { .. } | Self::Function { .. })
    }

    /// Slots a binding of this value takes from the variable ceiling.
    pub fn usage(&self) -> usize {
        1 + self.element_count()
    }

    /// Elements of every list reachable from this value. A list reached
    /// more than once, through aliasing or a cycle, is counted once.
    pub fn element_count(&self) -> usize {
        let Self::List { elements } = self else {
            return 0;
        };

        let mut seen = HashSet::from([Rc::as_ptr(elements)]);
        let mut pending = vec![elements.clone()];
        let mut count = 0;

        while let Some(list) = pending.pop() {
            let items = list.borrow();
            count += items.len();

            for item in items.iter() {
                if let Self::List { elements } = item {
                    if seen.insert(Rc::as_ptr(elements)) {
                        pending.push(elements.clone());
                    }
                }
            }
        }

        count
    }

    fn write_scalar(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Number { value } => write!(f, "{}", format_number(*value)),
            Self::String { value } => write!(f, "{value}"),
            Self::List { .. } => write!(f, "[...]"),
            Self::Function { function } => write!(f, "<function {}>", function.display_name()),
            Self::Builtin { function } => write!(f, "<function {}>", function.name),
        }
    }
}

/// Shared storage of a list.
///
/// Dropping the last handle releases nested lists one by one instead of
/// recursing, so arbitrarily deep nesting cannot exhaust the stack.
#[derive(Default)]
pub struct Elements(RefCell<Vec<Value>>);

impl Elements {
    pub fn new(elements: Vec<Value>) -> Self {
        Self(RefCell::new(elements))
    }
}

impl Deref for Elements {
    type Target = RefCell<Vec<Value>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Drop for Elements {
    fn drop(&mut self) {
        let mut pending = std::mem::take(self.0.get_mut());

        while let Some(value) = pending.pop() {
            if let Value::List { elements } = value {
                if let Ok(mut last) = Rc::try_unwrap(elements) {
                    pending.append(last.0.get_mut());
                }
            }
        }
    }
}

impl PartialEq for Value {
    /// Lists compare element-wise. A pair of lists already under
    /// comparison is assumed equal, which ends the walk on cycles.
    fn eq(&self, other: &Self) -> bool {
        let mut pending = vec![(self.clone(), other.clone())];
        let mut seen = HashSet::new();

        while let Some((left, right)) = pending.pop() {
            let (Self::List { elements: a }, Self::List { elements: b }) = (&left, &right) else {
                if !scalar_eq(&left, &right) {
                    return false;
                }
                continue;
            };

            if Rc::ptr_eq(a, b) || !seen.insert((Rc::as_ptr(a), Rc::as_ptr(b))) {
                continue;
            }

            let (a, b) = (a.borrow(), b.borrow());

            if a.len() != b.len() {
                return false;
            }

            pending.extend(a.iter().cloned().zip(b.iter().cloned()));
        }

        true
    }
}

fn scalar_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Number { value: a }, Value::Number { value: b }) => a == b,
        (Value::String { value: a }, Value::String { value: b }) => a == b,
        (Value::Function { function: a }, Value::Function { function: b }) => Rc::ptr_eq(a, b),
        (Value::Builtin { function: a }, Value::Builtin { function: b }) => Rc::ptr_eq(a, b),
        _ => false,
    }
}

impl Display for Value {
    /// A list that contains itself prints the inner occurrence as `[...]`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        enum Step {
            Value(Value),
            Separator,
            Close(*const Elements),
        }

        let mut open = HashSet::new();
        let mut steps = vec![Step::Value(self.clone())];

        while let Some(step) = steps.pop() {
            match step {
                Step::Separator => write!(f, ", ")?,
                Step::Close(list) => {
                    open.remove(&list);
                    write!(f, "]")?;
                },
                Step::Value(Value::List { elements }) if open.insert(Rc::as_ptr(&elements)) => {
                    write!(f, "[")?;
                    steps.push(Step::Close(Rc::as_ptr(&elements)));

                    for (i, element) in elements.borrow().iter().enumerate().rev() {
                        steps.push(Step::Value(element.clone()));

                        if i > 0 {
                            steps.push(Step::Separator);
                        }
                    }
                },
                Step::Value(value) => value.write_scalar(f)?,
            }
        }

        Ok(())
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Number { value } => write!(f, "Number({value:?})"),
            Self::String { value } => write!(f, "String({value:?})"),
            Self::List { .. } => write!(f, "List({self})"),
            Self::Function { function } => write!(f, "Function({})", function.display_name()),
            Self::Builtin { function } => write!(f, "Builtin({})", function.name),
        }
    }
}

/// Formats numbers the way scripts see them: integral values carry no
/// fraction, very large and very small magnitudes use an exponent.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".into();
    }

    if value.is_infinite() {
        return if value > 0.0 { "Infinity".into() } else { "-Infinity".into() };
    }

    if value == 0.0 {
        return "0".into();
    }

    let magnitude = value.abs();

    if magnitude >= 1e21 || magnitude < 1e-6 {
        let formatted = format!("{value:e}");

        return match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{mantissa}e+{exponent}")
            },
            _ => formatted,
        };
    }

    format!("{value}")
}

/// A function written in the language. It keeps the scope it was defined in.
pub struct UserFunction {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Rc<Node>,
    pub closure: Scope,
    pub source: Rc<SourceFile>,
}

impl UserFunction {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(ANONYMOUS)
    }
}

impl Debug for UserFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserFunction")
            .field("name", &self.display_name())
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

pub type NativeFn = dyn Fn(&[Value], &mut dyn OutputSink) -> Result<Value, String>;

/// A function implemented by the host. Errors come back as plain messages
/// and are reported at the call site.
pub struct BuiltinFunction {
    pub name: String,
    pub arity: usize,
    pub func: Box<NativeFn>,
}

impl Debug for BuiltinFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}
