use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use indoc::indoc;
use pretty_assertions::assert_eq;

use super::prelude::*;
use crate::{
    environment::{
        collector,
        prelude::{SymbolTable, Value},
    },
    eval::prelude::Abort,
};

fn quiet() -> RunOptions {
    RunOptions { log_to_console: false, ..RunOptions::default() }
}

#[test]
fn test_output_buffer_keeps_latest_lines() {
    let mut buffer = OutputBuffer::new(3);

    for line in ["1", "2", "3", "4", "5"] {
        buffer.add_line(line);
    }

    assert_eq!(buffer.lines(), vec!["3", "4", "5"]);

    let mut empty = OutputBuffer::new(0);
    empty.add_line("dropped");
    assert!(empty.lines().is_empty());

    assert_eq!(OutputBuffer::default().capacity(), DEFAULT_CAPACITY);
}

#[test]
fn test_printed_lines_wrap_around() -> Result<(), Abort> {
    let mut buffer = OutputBuffer::default();
    let input = "for (let i = 0; i < 40; i += 1) print(i)";

    run(input, &quiet(), Some(&mut buffer), None)?;

    let lines = buffer.lines();
    assert_eq!(lines.len(), 30);
    assert_eq!(lines.first().map(String::as_str), Some("10"));
    assert_eq!(lines.last().map(String::as_str), Some("39"));

    Ok(())
}

#[test]
fn test_print_formats() -> Result<(), Abort> {
    let mut printed: Vec<String> = vec![];
    let input = indoc! {"
        print(1 / 4)
        print('text')
        print([1, 'a', [2.5]])
        print(print)
        print(-0)
    "};

    run(input, &quiet(), Some(&mut printed), None)?;

    assert_eq!(printed, vec!["0.25", "text", "[1, a, [2.5]]", "<function print>", "0"]);

    Ok(())
}

#[test]
fn test_globals_persist_between_runs() -> Result<(), Abort> {
    let globals = Globals::new();

    run("let x = 1", &quiet(), None, Some(&globals))?;

    let outcome = run("x = x + 1; x", &quiet(), None, Some(&globals))?;
    assert_eq!(outcome, Outcome::Ok(Value::number(2.0)));

    let outcome = run("let x = 5", &quiet(), None, Some(&globals))?;
    assert_eq!(outcome.error().map(|err| err.details.as_str()), Some("x is already defined"));

    // builtins can be shadowed from a globals scope
    let outcome = run("let len = 3; len", &quiet(), None, Some(&globals))?;
    assert_eq!(outcome, Outcome::Ok(Value::number(3.0)));

    Ok(())
}

#[test]
fn test_globals_share_the_variable_limit() {
    let globals = Globals::new();
    let options = RunOptions {
        limits: Limits { max_variables: Some(9), ..Limits::default() },
        ..quiet()
    };

    assert_eq!(
        run("let a = 1; let b = 2", &options, None, Some(&globals)),
        Ok(Outcome::Ok(Value::number(2.0)))
    );
    assert_eq!(globals.scope().borrow().limit(), Some(2));
    assert_eq!(run("let c = 3", &options, None, Some(&globals)), Err(Abort::VariableLimit));
}

#[test]
fn test_filename_in_diagnostics() -> Result<(), Abort> {
    let options = RunOptions { filename: "main.sl".into(), ..quiet() };

    let outcome = run("1 +", &options, None, None)?;
    let rendered = outcome.error().map(ToString::to_string).unwrap_or_default();

    assert!(rendered.starts_with("Invalid Syntax: "), "{rendered}");
    assert!(rendered.contains("File main.sl, line 1\n"), "{rendered}");

    Ok(())
}

fn double(args: &[Value], _: &mut dyn OutputSink) -> Result<Value, String> {
    match args {
        [Value::Number { value }] => Ok(Value::number(value * 2.0)),
        _ => Err("double expects a number".into()),
    }
}

#[test]
fn test_sandbox_run() -> Result<(), SandboxError> {
    let input = indoc! {"
        let total = 0
        for (let i = 0; i < len(items); i += 1) total += items[i]
        print(greeting + ' ' + total)
        double(total)
    "};

    let environment = vec![
        ("items", Value::from(vec![1.0, 2.0, 3.0])),
        ("greeting", Value::from("sum")),
        ("double", Value::native("double", 1, double)),
    ];

    let output = sandbox_run(input, Limits::default(), environment)?;

    assert_eq!(output.stdout, vec!["sum 6"]);
    assert_eq!(output.result, Value::number(12.0));
    assert_eq!(
        output.globals.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["double", "greeting", "items", "total"]
    );
    assert_eq!(output.globals.get("total"), Some(&Value::number(6.0)));

    Ok(())
}

#[test]
fn test_sandbox_errors() {
    let no_environment: Vec<(String, Value)> = vec![];

    match sandbox_run("double('x')", Limits::default(), vec![("double", Value::native("double", 1, double))]) {
        Err(SandboxError::Code(text)) => assert_eq!(text, indoc! {"
            Traceback (most recent call last):
              File <program>, line 1, in <program>
            Runtime error: double expects a number
            double('x')
            ^^^^^^^^^^^
        "}),
        other => panic!("unexpected {other:?}"),
    }

    let limits = Limits { max_instructions: Some(50), ..Limits::default() };

    match sandbox_run("while (1) {}", limits, no_environment) {
        Err(SandboxError::Abort(abort)) => {
            assert_eq!(abort.to_string(), "Too many instructions. Force stop.")
        },
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_host_values() {
    let value = Value::from(vec![Value::from(1.0), Value::from("a"), Value::Null]);

    assert_eq!(
        HostValue::from(&value),
        HostValue::List(vec![
            HostValue::Number(1.0),
            HostValue::String("a".into()),
            HostValue::Null,
        ])
    );

    assert_eq!(Value::from(HostValue::List(vec![HostValue::Number(2.0)])).to_string(), "[2]");
    assert!(HostValue::from(Value::native("f", 0, |_, _| Ok(Value::Null))).as_callable().is_some());
    assert!(Callable::new(Value::number(1.0)).is_none());
}

#[test]
fn test_callable() -> Result<(), SandboxError> {
    let input = indoc! {"
        function add(a, b) { return a + b }
        function shout(text) { print(text + '!') }
        function forever() { while (1) {} }
        function broken() { return 1 / 0 }
    "};

    let output = sandbox_run(input, Limits::default(), Vec::<(String, Value)>::new())?;
    let callable = |name: &str| {
        output.globals.get(name)
            .map(HostValue::from)
            .and_then(|value| value.as_callable().cloned())
            .expect("function should be a global")
    };

    let mut printed: Vec<String> = vec![];

    let sum = callable("add").call(vec![1.0.into(), 2.0.into()], None, &mut printed);
    assert_eq!(sum.ok(), Some(Value::number(3.0)));

    let shouted = callable("shout").call(vec!["hey".into()], None, &mut printed);
    assert_eq!(shouted.ok(), Some(Value::Null));
    assert_eq!(printed, vec!["hey!"]);

    match callable("forever").call(vec![], Some(100), &mut NullOutput) {
        Err(CallError::Abort(Abort::InstructionLimit)) => {},
        other => panic!("unexpected {other:?}"),
    }

    match callable("broken").call(vec![], None, &mut NullOutput) {
        Err(CallError::Diagnostic(err)) => assert_eq!(err.details, "Division by zero"),
        other => panic!("unexpected {other:?}"),
    }

    match callable("add").call(vec![1.0.into()], None, &mut NullOutput) {
        Err(CallError::Diagnostic(err)) => {
            assert_eq!(err.details, "add function expected 2 arguments but 1 were passed")
        },
        other => panic!("unexpected {other:?}"),
    }

    Ok(())
}

fn closure_of(function: &Value) -> Weak<RefCell<SymbolTable>> {
    match function {
        Value::Function { function } => Rc::downgrade(&function.closure),
        other => panic!("{other} is not a script function"),
    }
}

#[test]
fn test_dropping_globals_frees_its_functions() -> Result<(), Abort> {
    let globals = Globals::new();
    let input = indoc! {"
        function ping(n) { if (n > 0) return pong(n - 1); return 'done' }
        function pong(n) { return ping(n) }
        let handlers = [ping, pong]
        ping(3)
    "};

    let outcome = run(input, &quiet(), None, Some(&globals))?;
    assert_eq!(outcome, Outcome::Ok(Value::string("done")));

    let scope = Rc::downgrade(globals.scope());
    drop(globals);

    assert!(scope.upgrade().is_none());

    Ok(())
}

#[test]
fn test_callable_outlives_its_globals() -> Result<(), Abort> {
    let globals = Globals::new();
    run("let n = 2; function scale(x) { return x * n }", &quiet(), None, Some(&globals))?;

    let scale = globals.get("scale")
        .and_then(Callable::new)
        .expect("scale should be callable");
    let closure = closure_of(scale.function());

    drop(globals);

    let scaled = scale.call(vec![3.0.into()], None, &mut NullOutput);
    assert_eq!(scaled.ok(), Some(Value::number(6.0)));

    drop(scale);
    collector::collect();

    assert!(closure.upgrade().is_none());

    Ok(())
}

#[test]
fn test_call_scopes_are_freed_after_a_run() -> Result<(), Abort> {
    let closures: Rc<RefCell<Vec<Weak<RefCell<SymbolTable>>>>> = Rc::default();
    let seen = closures.clone();

    let globals = Globals::new();
    globals.declare("watch", Value::native("watch", 1, move |args: &[Value], _: &mut dyn OutputSink| {
        if let [function] = args {
            seen.borrow_mut().push(closure_of(function));
        }

        Ok(Value::Null)
    }))?;

    let input = indoc! {"
        function counter() {
            let count = 0
            let next = function () {
                count += 1
                return count
            }
            watch(next)
            return next() + next()
        }
        counter() + counter()
    "};

    let outcome = run(input, &quiet(), None, Some(&globals))?;
    assert_eq!(outcome, Outcome::Ok(Value::number(6.0)));

    let closures = closures.borrow();
    assert_eq!(closures.len(), 2);
    assert!(closures.iter().all(|scope| scope.upgrade().is_none()));

    // the globals themselves are still in use
    assert!(globals.get("counter").is_some());

    Ok(())
}

#[test]
fn test_callable_break_outside_a_loop() -> Result<(), SandboxError> {
    let input = "function stop() { break }";
    let output = sandbox_run(input, Limits::default(), Vec::<(String, Value)>::new())?;

    let stop = output.globals.get("stop")
        .cloned()
        .and_then(Callable::new)
        .expect("stop should be callable");

    match stop.call(vec![], None, &mut NullOutput) {
        Err(CallError::Diagnostic(err)) => assert_eq!(err.details, "'break' not inside a loop"),
        other => panic!("unexpected {other:?}"),
    }

    Ok(())
}

#[test]
fn test_cyclic_list_is_detached_once() {
    let list = Value::list(vec![Value::number(1.0)]);

    if let Value::List { elements } = &list {
        elements.borrow_mut().push(list.clone());
    }

    assert_eq!(
        HostValue::from(&list),
        HostValue::List(vec![HostValue::Number(1.0), HostValue::Null])
    );
}
