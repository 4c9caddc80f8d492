use indoc::indoc;
use pretty_assertions::assert_eq;

use super::prelude::{Abort, MAX_LIST_LENGTH};
use crate::{
    environment::prelude::Value,
    sandbox::prelude::{run, Limits, Outcome, RunOptions},
    utils::prelude::SeclangError,
};

fn eval_with(input: &str, limits: Limits) -> (Result<Outcome, Abort>, Vec<String>) {
    let options = RunOptions {
        limits,
        log_to_console: false,
        ..RunOptions::default()
    };

    let mut printed: Vec<String> = vec![];
    let outcome = run(input, &options, Some(&mut printed), None);

    (outcome, printed)
}

fn eval(input: &str) -> Value {
    match eval_with(input, Limits::default()).0 {
        Ok(Outcome::Ok(value)) => value,
        Ok(Outcome::Failure(err)) => panic!("unexpected failure:\n{err}"),
        Err(abort) => panic!("unexpected abort: {abort}"),
    }
}

fn eval_error(input: &str) -> SeclangError {
    match eval_with(input, Limits::default()).0 {
        Ok(Outcome::Failure(err)) => err,
        Ok(Outcome::Ok(value)) => panic!("expected an error, got {value}"),
        Err(abort) => panic!("unexpected abort: {abort}"),
    }
}

#[test]
fn test_arithmetic() {
    assert_eq!(eval("1 + 2 * 3"), Value::number(7.0));
    assert_eq!(eval("2 ** 3 ** 2"), Value::number(512.0));
    assert_eq!(eval("(1 + 2) * 3 - 10 / 4"), Value::number(6.5));
    assert_eq!(eval("7 % 3"), Value::number(1.0));
    assert_eq!(eval("-(2 + 3)"), Value::number(-5.0));
    assert_eq!(eval("+4"), Value::number(4.0));
}

#[test]
fn test_comparison_and_logic() {
    assert_eq!(eval("3 > 2"), Value::number(1.0));
    assert_eq!(eval("3 <= 2"), Value::number(0.0));
    assert_eq!(eval("1 == 1 && 2 != 2"), Value::number(0.0));
    assert_eq!(eval("0 || 2"), Value::number(1.0));
    assert_eq!(eval_error("0 || 'x'").details, "Illegal operation");
    assert_eq!(eval("!0"), Value::number(1.0));
}

#[test]
fn test_last_statement_is_the_result() {
    assert_eq!(eval("1; 2\n3"), Value::number(3.0));
    assert_eq!(eval(""), Value::Null);
}

#[test]
fn test_null() {
    assert_eq!(eval("let a; a"), Value::Null);
    assert_eq!(eval("let a; a + 1"), Value::number(1.0));
    assert_eq!(eval("let a; let b; a == b"), Value::number(1.0));
    assert_eq!(eval("let a; a == 0"), Value::number(0.0));
    assert_eq!(eval("print(1)"), Value::Null);
}

#[test]
fn test_strings() {
    assert_eq!(eval("'ab' + \"cd\""), Value::string("abcd"));
    assert_eq!(eval("'n = ' + 1.5"), Value::string("n = 1.5"));
    assert_eq!(eval("2 + 'x'"), Value::string("2x"));
    assert_eq!(eval("'abc'[1]"), Value::string("b"));
    assert_eq!(eval("len('héllo')"), Value::number(5.0));

    assert_eq!(eval_error("'a' - 1").details, "Illegal operation");
    assert_eq!(eval_error("'a' == 'a'").details, "Illegal operation");
    assert_eq!(eval_error("-'a'").details, "Illegal operation");
}

#[test]
fn test_illegal_operation_spans_both_operands() {
    let err = eval_error("1 + [2]");

    assert_eq!(err.details, "Illegal operation");
    assert_eq!(err.span.map(|span| (span.start.col, span.end.col)), Some((0, 7)));
}

#[test]
fn test_division_and_modulo_by_zero() {
    let err = eval_error("1 / 0");
    assert_eq!(err.details, "Division by zero");
    assert_eq!(err.span.map(|span| (span.start.col, span.end.col)), Some((4, 5)));

    let err = eval_error("1 % (2 - 2)");
    assert_eq!(err.details, "Modulo of zero");
    assert_eq!(err.span.map(|span| span.start.col), Some(5));
}

#[test]
fn test_declarations() {
    assert_eq!(eval_error("let x = 1; let x = 2").details, "x is already defined");
    assert_eq!(eval("let x = 1; if (true) { let x = 2 }; x"), Value::number(1.0));
    assert_eq!(eval("let x = 1; if (true) { x = 2 }; x"), Value::number(2.0));
    assert_eq!(eval_error("y").details, "y is not defined");
    assert_eq!(eval_error("y = 1").details, "y is not defined");
    assert_eq!(
        eval_error("function f() {}\nfunction f() {}").details,
        "f is already defined"
    );
}

#[test]
fn test_builtins_live_in_the_program_scope() {
    assert_eq!(eval_error("let print = 1").details, "print is already defined");
    assert_eq!(eval("if (1) { let print = 2; print }"), Value::number(2.0));
}

#[test]
fn test_lists() {
    assert_eq!(eval("let a[3]; a").to_string(), "[0, 0, 0]");
    assert_eq!(eval("let a[3]; a[1] = 9; a[1]"), Value::number(9.0));
    assert_eq!(eval("let a[2.5]; len(a)"), Value::number(3.0));
    assert_eq!(eval("let a[-1]; len(a)"), Value::number(0.0));
    assert_eq!(eval("let a = [1, 2]; let b = a; b[0] = 5; a[0]"), Value::number(5.0));
    assert_eq!(eval("let g = [[1, 2], [3]]; g[0][1] += 10; g").to_string(), "[[1, 12], [3]]");

    assert_eq!(eval_error("let a[3]; a[5]").details, "Out of bounds");
    assert_eq!(eval_error("let a[3]; a[-1]").details, "Out of bounds");
    assert_eq!(eval_error("let a[3]; a[0.5]").details, "Out of bounds");
    assert_eq!(eval_error("let a[3]; a['x']").details, "Illegal operation");
    assert_eq!(eval_error("5[0]").details, "5 is not a list or a string");
    assert_eq!(eval_error("let s = 'ab'; s[0] = 'c'").details, "ab is not a list");
    assert_eq!(eval_error("let a['x']").details, "list length should be a number");
}

#[test]
fn test_out_of_bounds_span() {
    let err = eval_error("let a[3]\na[5]");

    assert_eq!(
        err.span.map(|span| (span.start.line, span.start.col, span.end.col)),
        Some((1, 0, 3))
    );
}

#[test]
fn test_if_else() {
    let input = indoc! {"
        let r
        if (0) r = 'a'
        else if (1) {
            r = 'b'
        } else r = 'c'
        r
    "};

    assert_eq!(eval(input), Value::string("b"));
}

#[test]
fn test_while_loop() {
    let input = indoc! {"
        let i = 0
        let sum = 0
        while (i < 5) {
            i += 1
            if (i == 3) continue
            sum += i
        }
        sum
    "};

    assert_eq!(eval(input), Value::number(12.0));
}

#[test]
fn test_for_continue_break() {
    let input = indoc! {"
        for (let i = 0; i < 10; i += 1) {
            if (i == 2) continue
            if (i == 4) break
            print(i)
        }
    "};

    let (outcome, printed) = eval_with(input, Limits::default());

    assert_eq!(outcome, Ok(Outcome::Ok(Value::Null)));
    assert_eq!(printed, vec!["0", "1", "3"]);
}

#[test]
fn test_loop_scopes_are_fresh_per_iteration() {
    let input = indoc! {"
        let total = 0
        for (let i = 0; i < 3; i += 1) {
            let doubled = i * 2
            total += doubled
        }
        total
    "};

    assert_eq!(eval(input), Value::number(6.0));
    assert_eq!(eval_error("for (let i = 0; i < 1; i += 1) {}\ni").details, "i is not defined");
}

#[test]
fn test_functions() {
    let input = indoc! {"
        function add(a, b) {
            return a + b
        }
        add(2, 3)
    "};
    assert_eq!(eval(input), Value::number(5.0));

    assert_eq!(eval("function f() { return 1; return 2 }\nf()"), Value::number(1.0));
    assert_eq!(eval("function f() { 5 }\nf()"), Value::Null);
    assert_eq!(eval("function f() { return }\nf()"), Value::Null);
    assert_eq!(eval("let twice = function (x) return x * 2\ntwice(4)"), Value::number(8.0));
    assert_eq!(eval("function f() {}\nf").to_string(), "<function f>");
    assert_eq!(eval("function () {}").to_string(), "<function <anonymous>>");
}

#[test]
fn test_return_escapes_loops() {
    let input = indoc! {"
        function find(list, wanted) {
            for (let i = 0; i < len(list); i += 1) {
                while (1) {
                    if (list[i] == wanted) return i
                    break
                }
            }
            return -1
        }
        [find([4, 5, 6], 6), find([1], 9)]
    "};

    assert_eq!(eval(input).to_string(), "[2, -1]");
}

#[test]
fn test_recursion() {
    let input = indoc! {"
        function fib(n) {
            if (n < 2) return n
            return fib(n - 1) + fib(n - 2)
        }
        fib(15)
    "};

    assert_eq!(eval(input), Value::number(610.0));
}

#[test]
fn test_closures_capture_their_scope() {
    let input = indoc! {"
        function counter() {
            let count = 0
            return function () {
                count += 1
                return count
            }
        }
        let next = counter()
        next()
        next()
    "};

    assert_eq!(eval(input), Value::number(2.0));
}

#[test]
fn test_call_errors() {
    assert_eq!(eval_error("let x = 1\nx()").details, "1 is not a function");
    assert_eq!(
        eval_error("function f(a) {}\nf()").details,
        "f function expected 1 arguments but 0 were passed"
    );
    assert_eq!(
        eval_error("print(1, 2)").details,
        "print function expected 1 arguments but 2 were passed"
    );
}

#[test]
fn test_builtin_functions() {
    assert_eq!(eval("sqrt(16)"), Value::number(4.0));
    assert_eq!(eval("floor(2.7)"), Value::number(2.0));
    assert_eq!(eval("len([1, [2, 3]])"), Value::number(2.0));
    assert_eq!(eval("true + false"), Value::number(1.0));
    assert_eq!(eval("let r = random(); r >= 0 && r < 1"), Value::number(1.0));

    assert_eq!(eval_error("sqrt('x')").details, "sqrt accept argument of type number");
    assert_eq!(eval_error("len(1)").details, "len accept argument of only list and string types");
    assert_eq!(eval_error("floor([])").details, "Floor accept argument of type number");
}

#[test]
fn test_control_flow_outside_its_construct() {
    let err = eval_error("return 1");
    assert_eq!(err.details, "'return' not inside a function");
    assert_eq!(err.to_string(), "Runtime error: 'return' not inside a function\n");

    assert_eq!(eval_error("break").details, "'break' not inside a loop");
    assert_eq!(eval_error("if (1) continue").details, "'continue' not inside a loop");
    assert_eq!(eval_error("function f() { break }\nf()").details, "'break' not inside a loop");
}

#[test]
fn test_traceback() {
    let input = indoc! {"
        function inner() {
          return 1 / 0
        }
        function outer() {
          return inner()
        }
        outer()
    "};

    let err = eval_error(input);

    assert_eq!(err.to_string(), indoc! {"
        Traceback (most recent call last):
          File <program>, line 7, in <program>
          File <program>, line 5, in outer
          File <program>, line 2, in inner
        Runtime error: Division by zero
          return 1 / 0
                     ^
    "});
}

#[test]
fn test_instruction_limit() {
    let limits = Limits { max_instructions: Some(1), ..Limits::default() };
    assert_eq!(eval_with("1 + 2", limits).0, Err(Abort::InstructionLimit));

    let limits = Limits { max_instructions: Some(1000), ..Limits::default() };
    assert_eq!(eval_with("while (1) {}", limits).0, Err(Abort::InstructionLimit));

    let limits = Limits { max_instructions: Some(3), ..Limits::default() };
    assert_eq!(eval_with("1 + 2", limits).0, Ok(Outcome::Ok(Value::number(3.0))));
}

#[test]
fn test_variable_limit() {
    let limits = Limits { max_variables: Some(8), ..Limits::default() };

    assert_eq!(eval_with("let a = 1", limits).0, Ok(Outcome::Ok(Value::number(1.0))));
    assert_eq!(eval_with("let a = 1; let b = 2", limits).0, Err(Abort::VariableLimit));
    assert_eq!(eval_with("let a[5]", limits).0, Err(Abort::VariableLimit));
    assert_eq!(eval_with("let a[1e12]", limits).0, Err(Abort::VariableLimit));

    let input = indoc! {"
        function f(a, b) { return a + b }
        f(1, 2)
    "};
    assert_eq!(eval_with(input, limits).0, Err(Abort::VariableLimit));
}

/// Runs `test` with the stack size a main thread gets.
fn on_main_sized_stack(test: impl FnOnce() + Send + 'static) {
    std::thread::Builder::new()
        .stack_size(8 << 20)
        .spawn(test)
        .and_then(|handle| handle.join().map_err(|_| std::io::Error::other("test panicked")))
        .expect("test thread should finish");
}

#[test]
fn test_runaway_recursion_is_an_error() {
    on_main_sized_stack(|| {
        let err = eval_error(indoc! {"
            function down(n) { return down(n + 1) }
            down(0)
        "});

        assert_eq!(err.details, "Maximum recursion depth exceeded");
    });
}

#[test]
fn test_mutual_recursion_with_a_base_case_runs() {
    on_main_sized_stack(|| {
        let input = indoc! {"
            function even(n) { if (n == 0) return 1; return odd(n - 1) }
            function odd(n) { if (n == 0) return 0; return even(n - 1) }
            even(40)
        "};

        assert_eq!(eval(input), Value::number(1.0));
    });
}

#[test]
fn test_self_containing_list() {
    let (outcome, printed) = eval_with(indoc! {"
        let a = [1]
        a[0] = a
        let b = a
        print(a)
        len(b[0][0])
    "}, Limits::default());

    assert_eq!(outcome, Ok(Outcome::Ok(Value::number(1.0))));
    assert_eq!(printed, vec!["[[...]]"]);
}

#[test]
fn test_deeply_nested_list_is_dropped() {
    let input = indoc! {"
        let a = []
        for (let i = 0; i < 100000; i += 1) a = [a]
        a
    "};

    let nested = eval(input);
    assert_eq!(nested.usage(), 100_001);
}

#[test]
fn test_oversized_list_declaration() {
    assert_eq!(eval_error("let a[10 ** 300]").details, "list length is too large");
    assert_eq!(eval_error(&format!("let a[{}]", MAX_LIST_LENGTH + 1)).details, "list length is too large");
    assert_eq!(eval("let a[-3]; len(a)"), Value::number(0.0));
}

#[test]
fn test_string_growth_is_capped() {
    let err = eval_error("let s = 'ab'\nwhile (1) s = s + s");

    assert_eq!(err.details, "String is too long");
}

#[test]
fn test_math_builtins_read_null_as_zero() {
    assert_eq!(eval("let n; sqrt(n)"), Value::number(0.0));
    assert_eq!(eval("let n; floor(n)"), Value::number(0.0));
}
