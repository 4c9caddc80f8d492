use rand::Rng;

use crate::{eval::prelude::Abort, sandbox::prelude::OutputSink};

use super::prelude::{Scope, SymbolTable, Value, FALSE, TRUE};

impl SymbolTable {
    /// The root scope every run starts from. The built-in bindings are
    /// counted but never refused; `limit` applies to what comes after them.
    pub fn builtins(limit: Option<usize>) -> Result<Scope, Abort> {
        let scope = SymbolTable::scope(None);

        {
            let mut table = scope.borrow_mut();

            table.declare("true", TRUE)?;
            table.declare("false", FALSE)?;
            table.declare("print", Value::native("print", 1, print))?;
            table.declare("sqrt", Value::native("sqrt", 1, sqrt))?;
            table.declare("len", Value::native("len", 1, len))?;
            table.declare("floor", Value::native("floor", 1, floor))?;
            table.declare("random", Value::native("random", 0, random))?;
            table.set_limit(limit);
        }

        Ok(scope)
    }
}

fn print(args: &[Value], output: &mut dyn OutputSink) -> Result<Value, String> {
    if let [value] = args {
        output.add_line(&value.to_string());
    }

    Ok(Value::Null)
}

fn sqrt(args: &[Value], _: &mut dyn OutputSink) -> Result<Value, String> {
    match args.first().and_then(Value::as_number) {
        Some(value) => Ok(Value::number(value.sqrt())),
        None => Err("sqrt accept argument of type number".into()),
    }
}

fn len(args: &[Value], _: &mut dyn OutputSink) -> Result<Value, String> {
    match args {
        [Value::List { elements }] => Ok(Value::number(elements.borrow().len() as f64)),
        [Value::String { value }] => Ok(Value::number(value.chars().count() as f64)),
        _ => Err("len accept argument of only list and string types".into()),
    }
}

fn floor(args: &[Value], _: &mut dyn OutputSink) -> Result<Value, String> {
    match args.first().and_then(Value::as_number) {
        Some(value) => Ok(Value::number(value.floor())),
        None => Err("Floor accept argument of type number".into()),
    }
}

fn random(_: &[Value], _: &mut dyn OutputSink) -> Result<Value, String> {
    let mut rng = rand::thread_rng();

    Ok(Value::number(rng.r#gen::<f64>()))
}
