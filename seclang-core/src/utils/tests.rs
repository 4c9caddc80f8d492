use std::io::Cursor;

use indoc::indoc;
use pretty_assertions::assert_eq;

use super::prelude::{ErrorKind, Position, SeclangError, SourceFile, SrcSpan};
use crate::{
    parser::prelude::parse_program,
    sandbox::prelude::{run, Outcome, RunOptions},
};

fn syntax_error(input: &str) -> SeclangError {
    match parse_program(&SourceFile::new("<program>", input)) {
        Ok(parsed) => panic!("expected an error, parsed `{parsed}`"),
        Err(err) => err,
    }
}

fn runtime_error(input: &str) -> SeclangError {
    let options = RunOptions { log_to_console: false, ..RunOptions::default() };

    match run(input, &options, None, None) {
        Ok(Outcome::Failure(err)) => err,
        other => panic!("expected a runtime error, got {other:?}"),
    }
}

#[test]
fn test_position_advance() {
    let mut position = Position::default();

    for ch in "ab\ncé".chars() {
        position.advance(ch);
    }

    assert_eq!(position, Position::new(6, 1, 2));
    assert_eq!(position.to_string(), "2:3");
}

#[test]
fn test_source_lines() {
    let source = SourceFile::new("f", "one\r\ntwo\nthree");

    assert_eq!(source.line(0), "one");
    assert_eq!(source.line(2), "three");
    assert_eq!(source.line(7), "");
}

#[test]
fn test_source_from_reader() -> std::io::Result<()> {
    let mut reader = Cursor::new("print('ß')\n".as_bytes());
    let source = SourceFile::from_reader("stream", &mut reader)?;

    assert_eq!(source.name, "stream");
    assert_eq!(source.text, "print('ß')\n");

    Ok(())
}

#[test]
fn test_lexical_error_display() {
    let err = syntax_error("let a = 1 $");

    assert_eq!(err.kind, ErrorKind::IllegalCharacter);
    assert_eq!(err.to_string(), indoc! {"
        Illegal Character: '$'
        File <program>, line 1
        let a = 1 $
                  ^
    "});
}

#[test]
fn test_unterminated_string_display() {
    let err = syntax_error("x = 'abc");

    assert_eq!(err.kind, ErrorKind::UnterminatedString);
    assert_eq!(err.details, "missing closing '");
    assert!(err.to_string().starts_with("Not closed string: missing closing '\nFile <program>, line 1\n"));
}

#[test]
fn test_syntax_error_display() {
    let err = syntax_error("let = 5");

    assert_eq!(err.to_string(), indoc! {"
        Invalid Syntax: Expected variable name
        File <program>, line 1
        let = 5
            ^
    "});
}

#[test]
fn test_error_without_span() {
    let err = SeclangError::new(
        ErrorKind::InvalidSyntax,
        "Expected ')'",
        None,
        SourceFile::new("<program>", ""),
    );

    assert_eq!(err.to_string(), "Invalid Syntax: Expected ')'\n");
    assert!(err.traceback().is_empty());
}

#[test]
fn test_traceback_skips_unnamed_frames() {
    let input = indoc! {"
        function check(n) {
            if (n > 1) {
                while (1) {
                    return missing
                }
            }
        }
        check(2)
    "};

    let err = runtime_error(input);

    assert_eq!(err.details, "missing is not defined");
    assert_eq!(err.traceback(), vec![
        ("<program>".to_string(), "<program>".to_string(), 8),
        ("<program>".to_string(), "check".to_string(), 4),
    ]);
}

#[test]
fn test_pretty_string() {
    let err = runtime_error("function f() { return [1][2] }\nf()");
    let pretty = err.pretty_string();

    assert!(pretty.starts_with("error: Runtime error"), "{pretty}");
    assert!(pretty.contains("Out of bounds"), "{pretty}");
    assert!(pretty.contains("called from here"), "{pretty}");

    let bare = SeclangError::new(ErrorKind::Runtime, "'break' not inside a loop", None, SourceFile::new("x", ""));
    let pretty = bare.pretty_string();

    assert!(pretty.starts_with("error: Runtime error\n\n"), "{pretty}");
    assert!(pretty.contains("'break' not inside a loop"), "{pretty}");
}

#[test]
fn test_span_join() {
    let a = SrcSpan::from(Position::new(0, 0, 0), Position::new(1, 0, 1));
    let b = SrcSpan::from(Position::new(4, 0, 4), Position::new(6, 0, 6));

    assert_eq!(a.to(b), SrcSpan::from(a.start, b.end));
    assert_eq!(a.to(b).to_string(), "0..6");
}
