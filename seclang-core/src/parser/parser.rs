use std::rc::Rc;

use crate::{
    lexer::prelude::{tokenize, Spanned, Token},
    utils::prelude::{Position, SeclangError, SourceFile, SrcSpan},
};
use super::error::{ParseError, ParseErrorType};
use super::ast::{
    BinaryOp, BinaryOperator, Call, FunctionDef, IndexGet, IndexSet, ListDeclare, ListLit,
    Node, NumberLit, Return, Statements, StringLit, UnaryOp, UnaryOperator, VarAccess,
    VarAssign, VarDeclare,
};

pub trait Parse
    where Self: Sized,
{
    fn parse(parser: &mut Parser) -> Result<Self, ParseError>;
}

const EXPRESSION_START: &[&str] = &[
    "'let'", "'function'", "'!'", "'+'", "'-'", "'('", "'['", "identifier", "int", "float", "string",
];

const ATOM_START: &[&str] = &[
    "'function'", "'('", "'['", "identifier", "int", "float", "string",
];

/// Deepest nesting of statements, parentheses, unary operators and
/// operator chains the parser accepts.
pub const MAX_NESTING: usize = 100;

const OPERATORS: &[&str] = &[
    "'+'", "'-'", "'*'", "'/'", "'%'", "'**'", "'&&'", "'||'",
    "'=='", "'!='", "'<'", "'>'", "'<='", "'>='",
];

/// Recursive descent over a lexed token slice. The cursor is a plain index,
/// so a failed attempt is undone by restoring a checkpoint.
pub struct Parser<'t> {
    tokens: &'t [Spanned],
    idx: usize,
    eof: Spanned,
    depth: usize,
}

impl<'t> Parser<'t> {
    pub fn new(tokens: &'t [Spanned]) -> Self {
        let end = tokens.last()
            .map(|(_, _, end)| *end)
            .unwrap_or_default();

        Self {
            tokens,
            idx: 0,
            eof: (end, Token::Eof, end),
            depth: 0,
        }
    }

    pub fn current(&self) -> &Spanned {
        self.tokens.get(self.idx).unwrap_or(&self.eof)
    }

    pub fn current_token(&self) -> &Token {
        &self.current().1
    }

    pub fn current_start(&self) -> Position {
        self.current().0
    }

    pub fn step(&mut self) {
        if self.idx < self.tokens.len() {
            self.idx += 1;
        }
    }

    pub fn checkpoint(&self) -> usize {
        self.idx
    }

    pub fn rewind(&mut self, checkpoint: usize) {
        self.idx = checkpoint;
    }

    pub fn skip_newline(&mut self) {
        while matches!(self.current_token(), Token::Newline) {
            self.step();
        }
    }

    pub fn skip_separators(&mut self) {
        while self.current_token().is_separator() {
            self.step();
        }
    }

    pub fn unexpected<T>(&self, expected: &[&'static str]) -> Result<T, ParseError> {
        let (start, token, end) = self.current();

        parse_error(
            ParseErrorType::UnexpectedToken {
                token: token.clone(),
                expected: expected.to_vec(),
            },
            SrcSpan::from(*start, *end)
        )
    }

    /// Replaces a failure of a rule that consumed nothing with the broader
    /// set of tokens the caller would have accepted here.
    pub fn recover<T>(
        &self,
        start: usize,
        result: Result<T, ParseError>,
        expected: &[&'static str]
    ) -> Result<T, ParseError> {
        match result {
            Err(err) if self.idx == start && !err.is_too_deep() => self.unexpected(expected),
            result => result,
        }
    }

    /// Runs `rule` one nesting level deeper. Levels taken inside `rule` are
    /// given back when it returns, whether it failed or not.
    pub fn nested<T>(
        &mut self,
        rule: impl FnOnce(&mut Self) -> Result<T, ParseError>
    ) -> Result<T, ParseError> {
        let depth = self.depth;
        let result = match self.descend() {
            Ok(()) => rule(self),
            Err(err) => Err(err),
        };

        self.depth = depth;
        result
    }

    /// Takes one more nesting level, failing past `MAX_NESTING`.
    fn descend(&mut self) -> Result<(), ParseError> {
        if self.depth >= MAX_NESTING {
            let (start, _, end) = self.current();

            return parse_error(
                ParseErrorType::TooDeep { max_depth: MAX_NESTING },
                SrcSpan::from(*start, *end)
            );
        }

        self.depth += 1;
        Ok(())
    }

    pub fn expect_one(&mut self, token: Token) -> Result<(Position, Position), ParseError> {
        let (start, current, end) = self.current();

        if *current == token {
            let span = (*start, *end);
            self.step();
            return Ok(span);
        }

        let expected = match token {
            Token::LParen => "'('",
            Token::RParen => "')'",
            Token::LCurly => "'{'",
            Token::RCurly => "'}'",
            Token::RSBracket => "']'",
            Token::Semicolon => "';'",
            Token::If => "'if'",
            Token::While => "'while'",
            Token::For => "'for'",
            Token::Function => "'function'",
            Token::LSBracket => "'['",
            _ => "token",
        };

        self.unexpected(&[expected])
    }

    pub fn expect_ident(&mut self, what: &'static str) -> Result<(Position, String, Position), ParseError> {
        match self.current() {
            (start, Token::Ident(value), end) => {
                let ident = (*start, value.clone(), *end);
                self.step();
                Ok(ident)
            },
            _ => self.unexpected(&[what]),
        }
    }

    // inline statement -> break | continue | return [<expression>] | <expression>
    pub fn parse_inline_statement(&mut self) -> Result<Node, ParseError> {
        let (start, token, end) = self.current().clone();

        match token {
            Token::Break => {
                self.step();
                Ok(Node::Break { location: SrcSpan::from(start, end) })
            },
            Token::Continue => {
                self.step();
                Ok(Node::Continue { location: SrcSpan::from(start, end) })
            },
            Token::Return => {
                self.step();

                let checkpoint = self.checkpoint();
                let value = match self.parse_expression() {
                    Ok(value) => Some(Box::new(value)),
                    Err(err) if err.is_too_deep() => return Err(err),
                    Err(_) => {
                        self.rewind(checkpoint);
                        None
                    }
                };

                let end = value.as_ref()
                    .map(|value| value.location().end)
                    .unwrap_or(end);

                Ok(Node::Return(Return {
                    value,
                    location: SrcSpan::from(start, end)
                }))
            },
            _ => self.parse_expression(),
        }
    }

    // expression -> let <identifier> ( [ <expression> ] | = <expression> | )
    //             | <identifier> ( = | += | -= ) <expression>
    //             | <or>
    pub fn parse_expression(&mut self) -> Result<Node, ParseError> {
        self.nested(|parser| {
            if matches!(parser.current_token(), Token::Let) {
                return parser.parse_declaration();
            }

            if let Some(assignment) = parser.try_parse_assignment()? {
                return Ok(assignment);
            }

            let start = parser.checkpoint();
            let result = parser.parse_or();

            parser.recover(start, result, EXPRESSION_START)
        })
    }

    fn parse_declaration(&mut self) -> Result<Node, ParseError> {
        let (start, _) = self.expect_one(Token::Let)?;
        let (_, name, name_end) = self.expect_ident("variable name")?;

        match self.current_token() {
            Token::LSBracket => {
                self.step();
                let length = self.parse_expression()?;
                let (_, end) = self.expect_one(Token::RSBracket)?;

                Ok(Node::ListDeclare(ListDeclare {
                    name,
                    length: Box::new(length),
                    location: SrcSpan::from(start, end)
                }))
            },
            Token::Assign => {
                self.step();
                let value = self.parse_expression()?;
                let end = value.location().end;

                Ok(Node::VarDeclare(VarDeclare {
                    name,
                    value: Some(Box::new(value)),
                    location: SrcSpan::from(start, end)
                }))
            },
            _ => Ok(Node::VarDeclare(VarDeclare {
                name,
                value: None,
                location: SrcSpan::from(start, name_end)
            })),
        }
    }

    // An identifier is only an assignment target when an assignment operator
    // follows it; otherwise the cursor goes back and it is read as an operand.
    fn try_parse_assignment(&mut self) -> Result<Option<Node>, ParseError> {
        let checkpoint = self.checkpoint();

        let (start, name, end) = match self.current() {
            (start, Token::Ident(name), end) => (*start, name.clone(), *end),
            _ => return Ok(None),
        };
        self.step();

        let operator = match self.current_token() {
            Token::Assign => None,
            Token::PlusAssign => Some(BinaryOperator::Add),
            Token::MinusAssign => Some(BinaryOperator::Sub),
            _ => {
                self.rewind(checkpoint);
                return Ok(None);
            }
        };
        self.step();

        let value = self.parse_expression()?;
        let value = desugar_compound(
            Node::VarAccess(VarAccess { name: name.clone(), location: SrcSpan::from(start, end) }),
            operator,
            value,
        );
        let location = SrcSpan::from(start, value.location().end);

        Ok(Some(Node::VarAssign(VarAssign {
            name,
            value: Box::new(value),
            location
        })))
    }

    // or -> <and> { || <and> }
    fn parse_or(&mut self) -> Result<Node, ParseError> {
        self.parse_chain(Self::parse_and, |token| matches!(token, Token::Or))
    }

    // and -> <comparison> { && <comparison> }
    fn parse_and(&mut self) -> Result<Node, ParseError> {
        self.parse_chain(Self::parse_comparison, |token| matches!(token, Token::And))
    }

    // comparison -> <not> { ( == | != | < | > | <= | >= ) <not> }
    fn parse_comparison(&mut self) -> Result<Node, ParseError> {
        self.parse_chain(Self::parse_not, Token::is_comparison)
    }

    // not -> ! <not> | <arith>
    fn parse_not(&mut self) -> Result<Node, ParseError> {
        let start = self.current_start();

        match self.current_token() {
            Token::Bang => {
                self.step();
                self.unary(start, UnaryOperator::Not, Self::parse_not)
            },
            _ => self.parse_arith(),
        }
    }

    // arith -> <term> { ( + | - ) <term> }
    fn parse_arith(&mut self) -> Result<Node, ParseError> {
        self.parse_chain(Self::parse_term, |token| matches!(token, Token::Plus | Token::Minus))
    }

    // term -> <factor> { ( * | / | % ) <factor> }
    fn parse_term(&mut self) -> Result<Node, ParseError> {
        self.parse_chain(
            Self::parse_factor,
            |token| matches!(token, Token::Asterisk | Token::Slash | Token::Percent)
        )
    }

    /// Left associative operator chain. Every operator folded in nests the
    /// result one level deeper.
    fn parse_chain(
        &mut self,
        operand: fn(&mut Self) -> Result<Node, ParseError>,
        continues: fn(&Token) -> bool
    ) -> Result<Node, ParseError> {
        let depth = self.depth;
        let mut left = operand(self)?;

        while continues(self.current_token()) {
            self.descend()?;

            let operator = self.binary_operator()?;
            let right = operand(self)?;
            left = Node::BinaryOp(BinaryOp::new(left, operator, right));
        }

        self.depth = depth;
        Ok(left)
    }

    // factor -> ( + | - ) <factor> | <power>
    fn parse_factor(&mut self) -> Result<Node, ParseError> {
        let start = self.current_start();

        let operator = match self.current_token() {
            Token::Plus => UnaryOperator::Plus,
            Token::Minus => UnaryOperator::Minus,
            _ => return self.parse_power(),
        };
        self.step();

        self.unary(start, operator, Self::parse_factor)
    }

    // power -> <postfix> [ ** <factor> ]
    fn parse_power(&mut self) -> Result<Node, ParseError> {
        let left = self.parse_postfix()?;

        if !matches!(self.current_token(), Token::Power) {
            return Ok(left);
        }
        self.step();

        let right = self.nested(Self::parse_factor)?;

        Ok(Node::BinaryOp(BinaryOp::new(left, BinaryOperator::Pow, right)))
    }

    // postfix -> <atom> { ( <args> ) | [ <expression> ] } [ ( = | += | -= ) <expression> ]
    fn parse_postfix(&mut self) -> Result<Node, ParseError> {
        let depth = self.depth;
        let node = self.parse_postfix_chain();

        self.depth = depth;
        node
    }

    fn parse_postfix_chain(&mut self) -> Result<Node, ParseError> {
        let mut node = self.parse_atom()?;

        loop {
            if matches!(self.current_token(), Token::LParen | Token::LSBracket) {
                self.descend()?;
            }

            match self.current_token() {
                Token::LParen => {
                    self.step();
                    let (args, end) = self.parse_arguments(Token::RParen)?;
                    let location = SrcSpan::from(node.location().start, end);

                    node = Node::Call(Call {
                        callee: Box::new(node),
                        args,
                        location
                    });
                },
                Token::LSBracket => {
                    self.step();
                    let index = self.parse_expression()?;
                    let (_, end) = self.expect_one(Token::RSBracket)?;
                    let location = SrcSpan::from(node.location().start, end);

                    let operator = match self.current_token() {
                        Token::Assign => None,
                        Token::PlusAssign => Some(BinaryOperator::Add),
                        Token::MinusAssign => Some(BinaryOperator::Sub),
                        _ => {
                            node = Node::IndexGet(IndexGet {
                                target: Box::new(node),
                                index: Box::new(index),
                                location
                            });
                            continue;
                        }
                    };
                    self.step();

                    let value = self.parse_expression()?;
                    let current = Node::IndexGet(IndexGet {
                        target: Box::new(node.clone()),
                        index: Box::new(index.clone()),
                        location
                    });
                    let value = desugar_compound(current, operator, value);
                    let location = location.to(value.location());

                    return Ok(Node::IndexSet(IndexSet {
                        target: Box::new(node),
                        index: Box::new(index),
                        value: Box::new(value),
                        location
                    }));
                },
                _ => return Ok(node),
            }
        }
    }

    // atom -> <number> | <string> | <identifier> | ( <expression> ) | <list> | <function>
    fn parse_atom(&mut self) -> Result<Node, ParseError> {
        let (start, token, end) = self.current().clone();
        let location = SrcSpan::from(start, end);

        match token {
            Token::Int(value) | Token::Float(value) => {
                self.step();
                Ok(Node::Number(NumberLit { value, location }))
            },
            Token::String(value) => {
                self.step();
                Ok(Node::String(StringLit { value, location }))
            },
            Token::Ident(name) => {
                self.step();
                Ok(Node::VarAccess(VarAccess { name, location }))
            },
            Token::LParen => {
                self.step();
                let expression = self.parse_expression()?;
                self.expect_one(Token::RParen)?;

                Ok(expression)
            },
            Token::LSBracket => Ok(Node::List(ListLit::parse(self)?)),
            Token::Function => Ok(Node::FunctionDef(FunctionDef::parse(self)?)),
            _ => self.unexpected(ATOM_START),
        }
    }

    /// Comma separated expressions up to `terminator`, which is consumed.
    pub fn parse_arguments(&mut self, terminator: Token) -> Result<(Vec<Node>, Position), ParseError> {
        let mut args = vec![];

        if *self.current_token() != terminator {
            args.push(self.parse_expression()?);

            while matches!(self.current_token(), Token::Comma) {
                self.step();
                args.push(self.parse_expression()?);
            }
        }

        match self.current() {
            (_, token, end) if *token == terminator => {
                let end = *end;
                self.step();
                Ok((args, end))
            },
            _ => {
                let closing = match terminator {
                    Token::RParen => "')'",
                    _ => "']'",
                };

                self.unexpected(&["','", closing])
            }
        }
    }

    fn binary_operator(&mut self) -> Result<BinaryOperator, ParseError> {
        match BinaryOperator::from_token(self.current_token()) {
            Some(operator) => {
                self.step();
                Ok(operator)
            },
            None => self.unexpected(OPERATORS),
        }
    }

    fn unary(
        &mut self,
        start: Position,
        operator: UnaryOperator,
        operand: fn(&mut Self) -> Result<Node, ParseError>
    ) -> Result<Node, ParseError> {
        let operand = self.nested(operand)?;
        let location = SrcSpan::from(start, operand.location().end);

        Ok(Node::UnaryOp(UnaryOp {
            operator,
            operand: Box::new(operand),
            location
        }))
    }
}

fn desugar_compound(current: Node, operator: Option<BinaryOperator>, value: Node) -> Node {
    match operator {
        Some(operator) => Node::BinaryOp(BinaryOp::new(current, operator, value)),
        None => value,
    }
}

/// Parses a whole token stream. Anything left after the statement list is
/// reported as a missing operator.
pub fn parse(tokens: &[Spanned]) -> Result<Statements, ParseError> {
    let mut parser = Parser::new(tokens);
    let statements = Statements::parse(&mut parser)?;

    if !matches!(parser.current_token(), Token::Eof) {
        return parser.unexpected(OPERATORS);
    }

    Ok(statements)
}

/// Lexes and parses `source`, turning failures into diagnostics.
pub fn parse_program(source: &Rc<SourceFile>) -> Result<Statements, SeclangError> {
    let tokens = tokenize(&source.text)
        .map_err(|err| err.into_diagnostic(source.clone()))?;

    tracing::debug!(file = %source.name, tokens = tokens.len(), "lexed program");

    parse(&tokens).map_err(|err| err.into_diagnostic(source.clone()))
}

pub fn parse_error<T>(error: ParseErrorType, span: SrcSpan) -> Result<T, ParseError> {
    Err(ParseError { error, span })
}
