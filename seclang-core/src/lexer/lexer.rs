use std::fmt::Display;

use super::error::{LexicalError, LexicalErrorType};
use super::token::{str_to_keyword, Token};
use crate::utils::prelude::{Position, SrcSpan};

pub type Spanned = (Position, Token, Position);
pub type LexResult = std::result::Result<Spanned, LexicalError>;

#[derive(Debug)]
pub struct Lexer<T: Iterator<Item = char>> {
	position: Position,
	ch: Option<char>,
	next_ch: Option<char>,
	input: T,
	finished: bool,
}

impl<T: Iterator<Item = char>> Display for Lexer<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f,
			"Lexer {{\n\tposition: {},\n\tch: {:?}, next_ch: {:?}\n}}",
			self.position, self.ch, self.next_ch
		)
	}
}

impl<T: Iterator<Item = char>> Lexer<T> {
	pub fn new(mut input: T) -> Self {
		let ch = input.next();
		let next_ch = input.next();

		Self {
			position: Position::default(),
			ch,
			next_ch,
			input,
			finished: false,
		}
	}

	pub fn next_token(&mut self) -> LexResult {
		self.skip_trivia();

		let start_pos = self.position;

		let ch = match self.ch {
			Some(ch) => ch,
			None => return Ok((start_pos, Token::Eof, start_pos)),
		};

		let spanned = match ch {
			'0'..='9' | '.' => self.lex_number(),
			'a'..='z' | 'A'..='Z' | '_' => self.lex_ident(),
			'"' | '\'' => return self.lex_string(ch),
			'\n' => self.eat_one_char(Token::Newline),
			'+' => self.eat_with_assign(Token::Plus, Token::PlusAssign),
			'-' => self.eat_with_assign(Token::Minus, Token::MinusAssign),
			'!' => self.eat_with_assign(Token::Bang, Token::NotEqual),
			'=' => self.eat_with_assign(Token::Assign, Token::Equal),
			'<' => self.eat_with_assign(Token::LessThan, Token::LessThanOrEqual),
			'>' => self.eat_with_assign(Token::GreaterThan, Token::GreaterThanOrEqual),
			'*' => match self.next_ch {
				Some('*') => self.eat_two_chars(Token::Power),
				_ => self.eat_one_char(Token::Asterisk),
			},
			'&' => return self.lex_doubled('&', Token::And),
			'|' => return self.lex_doubled('|', Token::Or),
			'/' => self.eat_one_char(Token::Slash),
			'%' => self.eat_one_char(Token::Percent),
			'(' => self.eat_one_char(Token::LParen),
			')' => self.eat_one_char(Token::RParen),
			'{' => self.eat_one_char(Token::LCurly),
			'}' => self.eat_one_char(Token::RCurly),
			'[' => self.eat_one_char(Token::LSBracket),
			']' => self.eat_one_char(Token::RSBracket),
			';' => self.eat_one_char(Token::Semicolon),
			',' => self.eat_one_char(Token::Comma),
			c => {
				return Err(LexicalError {
					error: LexicalErrorType::IllegalCharacter { ch: c },
					location: SrcSpan::from(start_pos, start_pos.advanced(c)),
				});
			}
		};

		Ok(spanned)
	}

	fn next_char(&mut self) -> Option<char> {
		let ch = self.ch;

		if let Some(ch) = ch {
			self.position.advance(ch);
		}

		self.ch = self.next_ch;
		self.next_ch = self.input.next();

		ch
	}

	// Whitespace other than line breaks, and both comment forms.
	fn skip_trivia(&mut self) {
		loop {
			match (self.ch, self.next_ch) {
				(Some(' ' | '\t' | '\r'), _) => {
					self.next_char();
				},
				(Some('/'), Some('/')) => {
					while !matches!(self.ch, None | Some('\n')) {
						self.next_char();
					}
				},
				(Some('/'), Some('*')) => {
					self.next_char();
					self.next_char();

					// an unclosed block comment runs to the end of input
					loop {
						match (self.ch, self.next_ch) {
							(None, _) => break,
							(Some('*'), Some('/')) => {
								self.next_char();
								self.next_char();
								break;
							},
							_ => {
								self.next_char();
							}
						}
					}
				},
				_ => break,
			}
		}
	}

	fn eat_one_char(&mut self, token: Token) -> Spanned {
		let start_pos = self.position;
		self.next_char();
		let end_pos = self.position;

		(start_pos, token, end_pos)
	}

	fn eat_two_chars(&mut self, token: Token) -> Spanned {
		let start_pos = self.position;
		self.next_char();
		self.next_char();
		let end_pos = self.position;

		(start_pos, token, end_pos)
	}

	fn eat_with_assign(&mut self, single: Token, with_assign: Token) -> Spanned {
		match self.next_ch {
			Some('=') => self.eat_two_chars(with_assign),
			_ => self.eat_one_char(single),
		}
	}

	fn lex_doubled(&mut self, ch: char, token: Token) -> LexResult {
		if self.next_ch == Some(ch) {
			return Ok(self.eat_two_chars(token));
		}

		let start_pos = self.position;
		self.next_char();
		self.next_char();

		Err(LexicalError {
			error: LexicalErrorType::ExpectedCharacter { expected: ch, after: ch },
			location: SrcSpan::from(start_pos, self.position),
		})
	}

	fn lex_ident(&mut self) -> Spanned {
		let start_pos = self.position;
		let mut ident = String::new();

		while let Some(ch) = self.ch {
			if !(ch.is_ascii_alphanumeric() || ch == '_') {
				break;
			}

			ident.push(ch);
			self.next_char();
		}

		let end_pos = self.position;

		match str_to_keyword(&ident) {
			Some(keyword) => (start_pos, keyword, end_pos),
			None => (start_pos, Token::Ident(ident), end_pos),
		}
	}

	// Digits and at most one period. A second period ends the literal, so
	// `1.2.3` becomes `1.2` followed by `.3`.
	fn lex_number(&mut self) -> Spanned {
		let start_pos = self.position;
		let mut value = String::new();
		let mut has_period = false;

		while let Some(ch) = self.ch {
			match ch {
				'0'..='9' => {},
				'.' if !has_period => has_period = true,
				_ => break,
			}

			value.push(ch);
			self.next_char();
		}

		let end_pos = self.position;

		// a lone `.` has no digits to read
		let number = value.parse::<f64>().unwrap_or(f64::NAN);

		let token = if has_period {
			Token::Float(number)
		} else {
			Token::Int(number)
		};

		(start_pos, token, end_pos)
	}

	fn lex_string(&mut self, quote: char) -> LexResult {
		let start_pos = self.position;
		self.next_char();

		let mut value = String::new();
		let mut escaped = false;

		loop {
			match self.ch {
				None => {
					return Err(LexicalError {
						error: LexicalErrorType::UnterminatedString { quote },
						location: SrcSpan::from(start_pos, self.position),
					});
				},
				Some(ch) if ch == quote && !escaped => break,
				Some('\\') if !escaped => escaped = true,
				Some(ch) => {
					if escaped {
						value.push(match ch {
							'n' => '\n',
							't' => '\t',
							other => other,
						});
					} else {
						value.push(ch);
					}

					escaped = false;
				},
			}

			self.next_char();
		}

		self.next_char();

		Ok((start_pos, Token::String(value), self.position))
	}
}

impl<T: Iterator<Item = char>> Iterator for Lexer<T> {
	type Item = LexResult;

	fn next(&mut self) -> Option<Self::Item> {
		if self.finished {
			return None;
		}

		let token = self.next_token();

		if matches!(token, Ok((_, Token::Eof, _)) | Err(_)) {
			self.finished = true;
		}

		Some(token)
	}
}

/// Lexes the whole input. The last token is always `Token::Eof`.
pub fn tokenize(src: &str) -> Result<Vec<Spanned>, LexicalError> {
	Lexer::new(src.chars()).collect()
}
