use std::{fmt::Display, io::BufRead, rc::Rc};

use utf8_chars::BufReadCharsExt;

/// A point in the source text. `offset` is a byte offset, `line` and `col`
/// are zero based (the column counts characters, not bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
	pub offset: u32,
	pub line: u32,
	pub col: u32,
}

impl Position {
	pub fn new(offset: u32, line: u32, col: u32) -> Self {
		Self { offset, line, col }
	}

	/// Moves past `ch`. A newline bumps the line and resets the column.
	pub fn advance(&mut self, ch: char) {
		self.offset += ch.len_utf8() as u32;

		if ch == '\n' {
			self.line += 1;
			self.col = 0;
		} else {
			self.col += 1;
		}
	}

	pub fn advanced(mut self, ch: char) -> Self {
		self.advance(ch);
		self
	}
}

impl Display for Position {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}:{}", self.line + 1, self.col + 1)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SrcSpan {
	pub start: Position,
	pub end: Position,
}

impl SrcSpan {
	pub fn from(start: Position, end: Position) -> Self {
		Self { start, end }
	}

	/// Span covering both `self` and `other`.
	pub fn to(&self, other: SrcSpan) -> Self {
		Self { start: self.start, end: other.end }
	}
}

impl Display for SrcSpan {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}..{}", self.start.offset, self.end.offset)
	}
}

/// Program text together with the name it is reported under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
	pub name: String,
	pub text: String,
}

impl SourceFile {
	pub fn new(name: impl Into<String>, text: impl Into<String>) -> Rc<Self> {
		Rc::new(Self { name: name.into(), text: text.into() })
	}

	pub fn from_reader(name: impl Into<String>, reader: &mut impl BufRead) -> std::io::Result<Rc<Self>> {
		let mut text = String::new();

		for ch in reader.chars() {
			text.push(ch?);
		}

		Ok(Self::new(name, text))
	}

	/// The text of the zero based line `line`, without its terminator.
	pub fn line(&self, line: u32) -> &str {
		self.text
			.split('\n')
			.nth(line as usize)
			.map(|line| line.strip_suffix('\r').unwrap_or(line))
			.unwrap_or_default()
	}
}
