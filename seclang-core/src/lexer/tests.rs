use pretty_assertions::assert_eq;

use super::prelude::{tokenize, Lexer, LexicalError, LexicalErrorType, Token};
use crate::utils::prelude::Position;

fn kinds(input: &str) -> Result<Vec<Token>, LexicalError> {
    Ok(tokenize(input)?
        .into_iter()
        .map(|(_, token, _)| token)
        .collect())
}

#[test]
fn test_numbers() -> std::result::Result<(), LexicalError> {
    let tokens = kinds("10 1.5 .25 7. 1.2.3")?;

    assert_eq!(tokens, vec![
        Token::Int(10.0),
        Token::Float(1.5),
        Token::Float(0.25),
        Token::Float(7.0),
        Token::Float(1.2),
        Token::Float(0.3),
        Token::Eof,
    ]);

    Ok(())
}

#[test]
fn test_lone_period_is_nan() -> std::result::Result<(), LexicalError> {
    let tokens = kinds(".")?;

    assert!(matches!(tokens[0], Token::Float(value) if value.is_nan()));

    Ok(())
}

#[test]
fn test_keywords_and_identifiers() -> std::result::Result<(), LexicalError> {
    let tokens = kinds("let if else while for function continue break return _x1 lets")?;

    assert_eq!(tokens, vec![
        Token::Let,
        Token::If,
        Token::Else,
        Token::While,
        Token::For,
        Token::Function,
        Token::Continue,
        Token::Break,
        Token::Return,
        Token::Ident("_x1".into()),
        Token::Ident("lets".into()),
        Token::Eof,
    ]);

    Ok(())
}

#[test]
fn test_operators() -> std::result::Result<(), LexicalError> {
    let tokens = kinds("+ += - -= * ** / % = == ! != < <= > >= && || ( ) { } [ ] ; ,")?;

    assert_eq!(tokens, vec![
        Token::Plus,
        Token::PlusAssign,
        Token::Minus,
        Token::MinusAssign,
        Token::Asterisk,
        Token::Power,
        Token::Slash,
        Token::Percent,
        Token::Assign,
        Token::Equal,
        Token::Bang,
        Token::NotEqual,
        Token::LessThan,
        Token::LessThanOrEqual,
        Token::GreaterThan,
        Token::GreaterThanOrEqual,
        Token::And,
        Token::Or,
        Token::LParen,
        Token::RParen,
        Token::LCurly,
        Token::RCurly,
        Token::LSBracket,
        Token::RSBracket,
        Token::Semicolon,
        Token::Comma,
        Token::Eof,
    ]);

    Ok(())
}

#[test]
fn test_strings() -> std::result::Result<(), LexicalError> {
    let tokens = kinds(r#""a\tb\n" 'it"s' "q\"x" '\z'"#)?;

    assert_eq!(tokens, vec![
        Token::String("a\tb\n".into()),
        Token::String("it\"s".into()),
        Token::String("q\"x".into()),
        Token::String("z".into()),
        Token::Eof,
    ]);

    Ok(())
}

#[test]
fn test_comments_and_newlines() -> std::result::Result<(), LexicalError> {
    let input = "a // trailing\r\n/* block\n comment */ b\n/* never closed";

    assert_eq!(kinds(input)?, vec![
        Token::Ident("a".into()),
        Token::Newline,
        Token::Ident("b".into()),
        Token::Newline,
        Token::Eof,
    ]);

    Ok(())
}

#[test]
fn test_positions() -> std::result::Result<(), LexicalError> {
    let tokens = tokenize("let x\n  x**2")?;

    let (start, token, end) = &tokens[4];
    assert_eq!(*token, Token::Power);
    assert_eq!(*start, Position::new(9, 1, 3));
    assert_eq!(*end, Position::new(11, 1, 5));

    let (start, token, end) = tokens.last().unwrap();
    assert_eq!(*token, Token::Eof);
    assert_eq!(start, end);

    Ok(())
}

#[test]
fn test_eof_is_emitted_once() {
    let mut lexer = Lexer::new("".chars());

    assert!(matches!(lexer.next(), Some(Ok((_, Token::Eof, _)))));
    assert!(lexer.next().is_none());
}

#[test]
fn test_illegal_character() {
    let err = tokenize("let a = 1 # 2").unwrap_err();

    assert_eq!(err.error, LexicalErrorType::IllegalCharacter { ch: '#' });
    assert_eq!(err.details(), "'#'");
    assert_eq!(err.location.start.col, 10);
    assert_eq!(err.location.end.col, 11);
}

#[test]
fn test_single_ampersand() {
    let err = tokenize("a & b").unwrap_err();

    assert_eq!(err.error, LexicalErrorType::ExpectedCharacter { expected: '&', after: '&' });
    assert_eq!(err.details(), "'&' (after '&')");
    assert_eq!(err.location.start.col, 2);
    assert_eq!(err.location.end.col, 4);

    let err = tokenize("a | b").unwrap_err();
    assert_eq!(err.details(), "'|' (after '|')");
}

#[test]
fn test_unterminated_string() {
    let err = tokenize("print(\"abc").unwrap_err();

    assert_eq!(err.error, LexicalErrorType::UnterminatedString { quote: '"' });
    assert_eq!(err.location.start.col, 6);
    assert_eq!(err.location.end.col, 10);
}
