#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    // digits without a period
    Int(f64),
    // digits with one period
    Float(f64),
    String(String),

    // Keywords
    Let,
    If,
    Else,
    While,
    For,
    Function,
    Continue,
    Break,
    Return,

    // Arithmetic
    Plus,      // +
    Minus,     // -
    Asterisk,  // *
    Slash,     // /
    Percent,   // %
    Power,     // **
    PlusAssign,  // +=
    MinusAssign, // -=

    // Comparison and logic
    Assign,             // =
    Equal,              // ==
    NotEqual,           // !=
    LessThan,           // <
    GreaterThan,        // >
    LessThanOrEqual,    // <=
    GreaterThanOrEqual, // >=
    And,                // &&
    Or,                 // ||
    Bang,               // !

    // Delimiters
    LParen,    // (
    RParen,    // )
    LCurly,    // {
    RCurly,    // }
    LSBracket, // [
    RSBracket, // ]
    Semicolon, // ;
    Comma,     // ,

    Newline,
    Eof,
}

impl Token {
    /// `;` and a line break are interchangeable statement separators.
    pub fn is_separator(&self) -> bool {
        matches!(self, Token::Newline | Token::Semicolon)
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Token::Equal
            | Token::NotEqual
            | Token::LessThan
            | Token::GreaterThan
            | Token::LessThanOrEqual
            | Token::GreaterThanOrEqual
        )
    }
}

pub fn str_to_keyword(word: &str) -> Option<Token> {
    Some(match word {
        "let" => Token::Let,
        "if" => Token::If,
        "else" => Token::Else,
        "while" => Token::While,
        "for" => Token::For,
        "function" => Token::Function,
        "continue" => Token::Continue,
        "break" => Token::Break,
        "return" => Token::Return,
        _ => return None,
    })
}
