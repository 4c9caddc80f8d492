pub mod governor;
pub mod operations;
pub mod signal;

pub mod prelude {
    pub use super::{
        governor::*,
        operations::*,
        signal::*,
        Interpreter,
    };
}

#[cfg(test)]
mod tests;

use std::rc::Rc;

use crate::{
    environment::{
        collector,
        prelude::{Context, Scope, SymbolTable, UserFunction, Value},
    },
    parser::prelude::{
        BinaryOp, Call, For, FunctionDef, If, IndexGet, IndexSet, ListDeclare, Node, Statements,
        UnaryOp, VarAssign, VarDeclare, While,
    },
    sandbox::prelude::OutputSink,
    utils::prelude::{SeclangError, SrcSpan},
};

use self::prelude::{
    binary, index_get, index_set, unary, Abort, Governor, Signal, MAX_DEPTH, MAX_LIST_LENGTH,
};

/// Unwraps a `Value` signal or returns any other signal to the caller.
macro_rules! propagate {
    ($signal:expr) => {
        match $signal? {
            Signal::Value(value) => value,
            signal => return Ok(signal),
        }
    };
}

fn check_arity(
    name: &str,
    arity: usize,
    args: &[Value],
    span: SrcSpan,
    context: &Rc<Context>,
) -> Result<(), SeclangError> {
    if args.len() == arity {
        return Ok(());
    }

    Err(SeclangError::runtime(
        format!("{name} function expected {arity} arguments but {} were passed", args.len()),
        Some(span),
        context,
    ))
}

fn fail(details: impl Into<String>, span: SrcSpan, context: &Rc<Context>) -> Result<Signal, Abort> {
    Ok(Signal::Error(SeclangError::runtime(details, Some(span), context)))
}

/// Tree walking evaluator. Child frames borrow the same governor and
/// output, so limits and printed lines are shared by the whole run.
pub struct Interpreter<'a> {
    governor: &'a mut Governor,
    output: &'a mut dyn OutputSink,
    depth: usize,
}

impl<'a> Interpreter<'a> {
    pub fn new(governor: &'a mut Governor, output: &'a mut dyn OutputSink) -> Self {
        Self { governor, output, depth: 0 }
    }

    /// Runs a whole program. Control flow escaping the top level becomes a
    /// diagnostic.
    pub fn run_program(
        &mut self,
        program: &Statements,
        context: &Rc<Context>,
        scope: &Scope,
    ) -> Result<Result<Value, SeclangError>, Abort> {
        let signal = self.visit_statements(program, context, scope)?;

        let details = match signal {
            Signal::Value(value) => return Ok(Ok(value)),
            Signal::Error(error) => return Ok(Err(error)),
            Signal::Returning(_) => "'return' not inside a function",
            Signal::Breaking => "'break' not inside a loop",
            Signal::Continuing => "'continue' not inside a loop",
        };

        Ok(Err(SeclangError::runtime(details, None, context)))
    }

    pub fn visit(&mut self, node: &Node, context: &Rc<Context>, scope: &Scope) -> Result<Signal, Abort> {
        self.governor.tick()?;

        if self.depth >= MAX_DEPTH {
            tracing::warn!(depth = self.depth, "evaluation depth reached");
            return fail("Maximum recursion depth exceeded", node.location(), context);
        }

        self.depth += 1;
        let signal = self.visit_node(node, context, scope);
        self.depth -= 1;

        signal
    }

    fn visit_node(&mut self, node: &Node, context: &Rc<Context>, scope: &Scope) -> Result<Signal, Abort> {
        match node {
            Node::Number(number) => Ok(Value::number(number.value).into()),
            Node::String(string) => Ok(Value::string(string.value.clone()).into()),
            Node::BinaryOp(op) => self.visit_binary(op, context, scope),
            Node::UnaryOp(op) => self.visit_unary(op, context, scope),
            Node::VarAccess(access) => match scope.borrow().get(&access.name) {
                Some(value) => Ok(value.into()),
                None => fail(format!("{} is not defined", access.name), access.location, context),
            },
            Node::VarAssign(assign) => self.visit_assign(assign, context, scope),
            Node::VarDeclare(declare) => self.visit_declare(declare, context, scope),
            Node::ListDeclare(declare) => self.visit_list_declare(declare, context, scope),
            Node::If(node) => self.visit_if(node, context, scope),
            Node::While(node) => self.visit_while(node, context, scope),
            Node::For(node) => self.visit_for(node, context, scope),
            Node::FunctionDef(def) => self.visit_function_def(def, context, scope),
            Node::Call(call) => self.visit_call(call, context, scope),
            Node::List(list) => {
                let mut elements = Vec::with_capacity(list.elements.len());

                for element in &list.elements {
                    elements.push(propagate!(self.visit(element, context, scope)));
                }

                Ok(Value::list(elements).into())
            },
            Node::IndexGet(get) => self.visit_index_get(get, context, scope),
            Node::IndexSet(set) => self.visit_index_set(set, context, scope),
            Node::Block(statements) => self.visit_statements(statements, context, scope),
            Node::Return(ret) => {
                let value = match &ret.value {
                    Some(value) => propagate!(self.visit(value, context, scope)),
                    None => Value::Null,
                };

                Ok(Signal::Returning(value))
            },
            Node::Break { .. } => Ok(Signal::Breaking),
            Node::Continue { .. } => Ok(Signal::Continuing),
            Node::Empty { .. } => Ok(Signal::null()),
        }
    }

    /// Evaluates statements in order; the last value is the result.
    pub fn visit_statements(
        &mut self,
        statements: &Statements,
        context: &Rc<Context>,
        scope: &Scope,
    ) -> Result<Signal, Abort> {
        let mut last = Value::Null;

        for node in &statements.nodes {
            last = propagate!(self.visit(node, context, scope));
        }

        Ok(last.into())
    }

    fn visit_binary(&mut self, op: &BinaryOp, context: &Rc<Context>, scope: &Scope) -> Result<Signal, Abort> {
        let left = propagate!(self.visit(&op.left, context, scope));
        let right = propagate!(self.visit(&op.right, context, scope));

        match binary(op.operator, &left, &right) {
            Ok(value) => Ok(value.into()),
            Err(err) if err.blames_right_operand() => {
                fail(err.to_string(), op.right.location(), context)
            },
            Err(err) => fail(err.to_string(), op.location, context),
        }
    }

    fn visit_unary(&mut self, op: &UnaryOp, context: &Rc<Context>, scope: &Scope) -> Result<Signal, Abort> {
        let operand = propagate!(self.visit(&op.operand, context, scope));

        match unary(op.operator, &operand) {
            Ok(value) => Ok(value.into()),
            Err(err) => fail(err.to_string(), op.location, context),
        }
    }

    fn visit_assign(&mut self, assign: &VarAssign, context: &Rc<Context>, scope: &Scope) -> Result<Signal, Abort> {
        let value = propagate!(self.visit(&assign.value, context, scope));

        if !scope.borrow_mut().assign(&assign.name, value.clone()) {
            return fail(format!("{} is not defined", assign.name), assign.location, context);
        }

        Ok(value.into())
    }

    fn visit_declare(&mut self, declare: &VarDeclare, context: &Rc<Context>, scope: &Scope) -> Result<Signal, Abort> {
        let value = match &declare.value {
            Some(value) => propagate!(self.visit(value, context, scope)),
            None => Value::Null,
        };

        if scope.borrow().is_defined(&declare.name) {
            return fail(format!("{} is already defined", declare.name), declare.location, context);
        }

        scope.borrow_mut().declare(declare.name.clone(), value.clone())?;
        Ok(value.into())
    }

    fn visit_list_declare(
        &mut self,
        declare: &ListDeclare,
        context: &Rc<Context>,
        scope: &Scope,
    ) -> Result<Signal, Abort> {
        if scope.borrow().is_defined(&declare.name) {
            return fail(format!("{} is already defined", declare.name), declare.location, context);
        }

        let length = propagate!(self.visit(&declare.length, context, scope));

        let Some(length) = length.as_number() else {
            return fail("list length should be a number", declare.location, context);
        };

        let length = if length > 0.0 { length.ceil() } else { 0.0 };

        // refuse before allocating a list that could never be declared
        if scope.borrow().remaining().is_some_and(|remaining| length >= remaining as f64) {
            tracing::warn!(name = %declare.name, length, "variable limit reached");
            return Err(Abort::VariableLimit);
        }

        let mut elements: Vec<Value> = vec![];

        if length > MAX_LIST_LENGTH as f64 || elements.try_reserve_exact(length as usize).is_err() {
            return fail("list length is too large", declare.location, context);
        }

        elements.resize(length as usize, Value::number(0.0));
        let list = Value::list(elements);

        scope.borrow_mut().declare(declare.name.clone(), list.clone())?;
        Ok(list.into())
    }

    fn visit_if(&mut self, node: &If, context: &Rc<Context>, scope: &Scope) -> Result<Signal, Abort> {
        let context = Context::block(context);
        let scope = SymbolTable::child(scope);

        let condition = propagate!(self.visit(&node.condition, &context, &scope));

        if condition.is_true() {
            return self.visit(&node.then_branch, &context, &scope);
        }

        match &node.else_branch {
            Some(else_branch) => self.visit(else_branch, &context, &scope),
            None => Ok(Signal::null()),
        }
    }

    fn visit_while(&mut self, node: &While, context: &Rc<Context>, scope: &Scope) -> Result<Signal, Abort> {
        let context = Context::block(context);
        let header = SymbolTable::child(scope);

        loop {
            let condition = propagate!(self.visit(&node.condition, &context, &header));

            if !condition.is_true() {
                break;
            }

            let body = SymbolTable::child(&header);

            match self.visit(&node.body, &context, &body)? {
                Signal::Breaking => break,
                Signal::Value(_) | Signal::Continuing => {},
                signal => return Ok(signal),
            }
        }

        Ok(Signal::null())
    }

    fn visit_for(&mut self, node: &For, context: &Rc<Context>, scope: &Scope) -> Result<Signal, Abort> {
        let context = Context::block(context);
        let header = SymbolTable::child(scope);

        propagate!(self.visit(&node.init, &context, &header));

        loop {
            let condition = propagate!(self.visit(&node.condition, &context, &header));

            if !condition.is_true() {
                break;
            }

            let body = SymbolTable::child(&header);

            match self.visit(&node.body, &context, &body)? {
                Signal::Breaking => break,
                Signal::Value(_) | Signal::Continuing => {},
                signal => return Ok(signal),
            }

            propagate!(self.visit(&node.step, &context, &header));
        }

        Ok(Signal::null())
    }

    fn visit_function_def(
        &mut self,
        def: &FunctionDef,
        context: &Rc<Context>,
        scope: &Scope,
    ) -> Result<Signal, Abort> {
        collector::track_scope(scope);

        let function = Value::Function {
            function: Rc::new(UserFunction {
                name: def.name.clone(),
                params: def.params.clone(),
                body: def.body.clone(),
                closure: scope.clone(),
                source: context.source.clone(),
            }),
        };

        if let Some(name) = &def.name {
            if scope.borrow().is_defined(name) {
                return fail(format!("{name} is already defined"), def.location, context);
            }

            scope.borrow_mut().declare(name.clone(), function.clone())?;
        }

        Ok(function.into())
    }

    fn visit_call(&mut self, call: &Call, context: &Rc<Context>, scope: &Scope) -> Result<Signal, Abort> {
        let callee = propagate!(self.visit(&call.callee, context, scope));

        if !callee.is_callable() {
            return fail(format!("{callee} is not a function"), call.location, context);
        }

        let mut args = Vec::with_capacity(call.args.len());

        for arg in &call.args {
            args.push(propagate!(self.visit(arg, context, scope)));
        }

        Ok(self.invoke(&callee, args, call.location, context)?.into())
    }

    /// Calls a function value. `span` is the call site inside `context`.
    /// Control flow never leaves a call, so only a value or a diagnostic
    /// comes back.
    pub fn invoke(
        &mut self,
        callee: &Value,
        args: Vec<Value>,
        span: SrcSpan,
        context: &Rc<Context>,
    ) -> Result<Result<Value, SeclangError>, Abort> {
        match callee {
            Value::Builtin { function } => {
                if let Err(error) = check_arity(&function.name, function.arity, &args, span, context) {
                    return Ok(Err(error));
                }

                Ok((function.func)(&args, &mut *self.output)
                    .map_err(|details| SeclangError::runtime(details, Some(span), context)))
            },
            Value::Function { function } => {
                if let Err(error) = check_arity(function.display_name(), function.params.len(), &args, span, context) {
                    return Ok(Err(error));
                }

                self.call_function(function, args, span, context)
            },
            other => Ok(Err(SeclangError::runtime(format!("{other} is not a function"), Some(span), context))),
        }
    }

    fn call_function(
        &mut self,
        function: &UserFunction,
        args: Vec<Value>,
        span: SrcSpan,
        context: &Rc<Context>,
    ) -> Result<Result<Value, SeclangError>, Abort> {
        let frame = Context::call(function.display_name(), context, span.start, function.source.clone());
        let scope = SymbolTable::child(&function.closure);

        for (param, arg) in function.params.iter().zip(args) {
            scope.borrow_mut().declare(param.clone(), arg)?;
        }

        let details = match self.visit(&function.body, &frame, &scope)? {
            Signal::Value(_) => return Ok(Ok(Value::Null)),
            Signal::Returning(value) => return Ok(Ok(value)),
            Signal::Error(error) => return Ok(Err(error)),
            Signal::Breaking => "'break' not inside a loop",
            Signal::Continuing => "'continue' not inside a loop",
        };

        Ok(Err(SeclangError::runtime(details, None, context)))
    }

    fn visit_index_get(&mut self, get: &IndexGet, context: &Rc<Context>, scope: &Scope) -> Result<Signal, Abort> {
        let target = propagate!(self.visit(&get.target, context, scope));

        if !matches!(target, Value::List { .. } | Value::String { .. }) {
            return fail(format!("{target} is not a list or a string"), get.location, context);
        }

        let index = propagate!(self.visit(&get.index, context, scope));
        let span = SrcSpan::from(get.location.start, get.index.location().end);

        match index_get(&target, &index) {
            Ok(value) => Ok(value.into()),
            Err(err) => fail(err.to_string(), span, context),
        }
    }

    fn visit_index_set(&mut self, set: &IndexSet, context: &Rc<Context>, scope: &Scope) -> Result<Signal, Abort> {
        let target = propagate!(self.visit(&set.target, context, scope));

        if !matches!(target, Value::List { .. }) {
            return fail(format!("{target} is not a list"), set.location, context);
        }

        let index = propagate!(self.visit(&set.index, context, scope));
        let value = propagate!(self.visit(&set.value, context, scope));
        let span = SrcSpan::from(set.location.start, set.index.location().end);

        if let (Value::List { elements }, true) = (&target, value.is_shared()) {
            collector::track_list(elements);
        }

        match index_set(&target, &index, value) {
            Ok(value) => Ok(value.into()),
            Err(err) => fail(err.to_string(), span, context),
        }
    }
}
