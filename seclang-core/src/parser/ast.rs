use std::{fmt::Display, rc::Rc};

use crate::{
    lexer::prelude::Token,
    parser::prelude::{Parse, ParseError, Parser},
    utils::prelude::SrcSpan,
};

const STATEMENT_START: &[&str] = &[
    "'if'", "'while'", "'for'", "'return'", "'break'", "'continue'",
    "'let'", "'function'", "'!'", "'('", "'['", "identifier", "int", "float", "string",
];

const BODY_START: &[&str] = &[
    "'{'", "'return'", "'break'", "'continue'",
    "'let'", "'function'", "'!'", "'('", "'['", "identifier", "int", "float", "string",
];

// statements -> { <separator> } [ <statement> { <separator> { <separator> } <statement> } ]
#[derive(Debug, Clone, PartialEq)]
pub struct Statements {
    pub nodes: Vec<Node>,
    pub location: SrcSpan
}

impl Parse for Statements {
    fn parse(parser: &mut Parser) -> Result<Self, ParseError> {
        let start = parser.current_start();
        let mut nodes = vec![];

        parser.skip_separators();

        while !matches!(parser.current_token(), Token::Eof | Token::RCurly) {
            nodes.push(Node::parse(parser)?);

            if !parser.current_token().is_separator() {
                break;
            }

            parser.skip_separators();
        }

        let end = match nodes.last() {
            Some(node) => node.location().end,
            None => start,
        };

        Ok(Self {
            nodes,
            location: SrcSpan::from(start, end)
        })
    }
}

impl Display for Statements {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let nodes = self.nodes.iter()
            .map(|node| format!("{node}"))
            .collect::<Vec<String>>();

        write!(f, "{}", nodes.join("; "))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Number(NumberLit),
    String(StringLit),
    BinaryOp(BinaryOp),
    UnaryOp(UnaryOp),
    VarAccess(VarAccess),
    VarAssign(VarAssign),
    VarDeclare(VarDeclare),
    ListDeclare(ListDeclare),
    If(If),
    While(While),
    For(For),
    FunctionDef(FunctionDef),
    Call(Call),
    List(ListLit),
    IndexGet(IndexGet),
    IndexSet(IndexSet),
    Block(Statements),
    Return(Return),
    Break { location: SrcSpan },
    Continue { location: SrcSpan },
    Empty { location: SrcSpan },
}

// statement -> <if> | <while> | <for> | <inline statement>
impl Parse for Node {
    fn parse(parser: &mut Parser) -> Result<Self, ParseError> {
        match parser.current_token() {
            Token::If => parser.nested(|parser| Ok(Node::If(If::parse(parser)?))),
            Token::While => parser.nested(|parser| Ok(Node::While(While::parse(parser)?))),
            Token::For => parser.nested(|parser| Ok(Node::For(For::parse(parser)?))),
            _ => {
                let start = parser.checkpoint();
                let result = parser.parse_inline_statement();

                parser.recover(start, result, STATEMENT_START)
            }
        }
    }
}

impl Node {
    pub fn location(&self) -> SrcSpan {
        match self {
            Self::Number(node) => node.location,
            Self::String(node) => node.location,
            Self::BinaryOp(node) => node.location,
            Self::UnaryOp(node) => node.location,
            Self::VarAccess(node) => node.location,
            Self::VarAssign(node) => node.location,
            Self::VarDeclare(node) => node.location,
            Self::ListDeclare(node) => node.location,
            Self::If(node) => node.location,
            Self::While(node) => node.location,
            Self::For(node) => node.location,
            Self::FunctionDef(node) => node.location,
            Self::Call(node) => node.location,
            Self::List(node) => node.location,
            Self::IndexGet(node) => node.location,
            Self::IndexSet(node) => node.location,
            Self::Block(node) => node.location,
            Self::Return(node) => node.location,
            Self::Break { location }
            | Self::Continue { location }
            | Self::Empty { location } => *location,
        }
    }

    pub fn empty_at(parser: &Parser) -> Self {
        let start = parser.current_start();

        Self::Empty { location: SrcSpan::from(start, start) }
    }
}

impl Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(node) => write!(f, "{node}"),
            Self::String(node) => write!(f, "{node}"),
            Self::BinaryOp(node) => write!(f, "{node}"),
            Self::UnaryOp(node) => write!(f, "{node}"),
            Self::VarAccess(node) => write!(f, "{node}"),
            Self::VarAssign(node) => write!(f, "{node}"),
            Self::VarDeclare(node) => write!(f, "{node}"),
            Self::ListDeclare(node) => write!(f, "{node}"),
            Self::If(node) => write!(f, "{node}"),
            Self::While(node) => write!(f, "{node}"),
            Self::For(node) => write!(f, "{node}"),
            Self::FunctionDef(node) => write!(f, "{node}"),
            Self::Call(node) => write!(f, "{node}"),
            Self::List(node) => write!(f, "{node}"),
            Self::IndexGet(node) => write!(f, "{node}"),
            Self::IndexSet(node) => write!(f, "{node}"),
            Self::Block(node) => write!(f, "{{ {node} }}"),
            Self::Return(node) => write!(f, "{node}"),
            Self::Break { .. } => write!(f, "break"),
            Self::Continue { .. } => write!(f, "continue"),
            Self::Empty { .. } => write!(f, "<empty>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberLit {
    pub value: f64,
    pub location: SrcSpan
}

impl Display for NumberLit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringLit {
    pub value: String,
    pub location: SrcSpan
}

impl Display for StringLit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
    And,
    Or,
}

impl BinaryOperator {
    pub fn from_token(token: &Token) -> Option<Self> {
        Some(match token {
            Token::Plus => Self::Add,
            Token::Minus => Self::Sub,
            Token::Asterisk => Self::Mul,
            Token::Slash => Self::Div,
            Token::Percent => Self::Mod,
            Token::Power => Self::Pow,
            Token::Equal => Self::Equal,
            Token::NotEqual => Self::NotEqual,
            Token::LessThan => Self::LessThan,
            Token::GreaterThan => Self::GreaterThan,
            Token::LessThanOrEqual => Self::LessThanOrEqual,
            Token::GreaterThanOrEqual => Self::GreaterThanOrEqual,
            Token::And => Self::And,
            Token::Or => Self::Or,
            _ => return None,
        })
    }
}

impl Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let operator = match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Pow => "**",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::LessThan => "<",
            Self::GreaterThan => ">",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThanOrEqual => ">=",
            Self::And => "&&",
            Self::Or => "||",
        };

        write!(f, "{operator}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryOp {
    pub left: Box<Node>,
    pub operator: BinaryOperator,
    pub right: Box<Node>,
    pub location: SrcSpan
}

impl BinaryOp {
    pub fn new(left: Node, operator: BinaryOperator, right: Node) -> Self {
        let location = left.location().to(right.location());

        Self {
            left: Box::new(left),
            operator,
            right: Box::new(right),
            location
        }
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} {} {})", self.left, self.operator, self.right)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Plus,
    Minus,
    Not,
}

impl Display for UnaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plus => write!(f, "+"),
            Self::Minus => write!(f, "-"),
            Self::Not => write!(f, "!"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryOp {
    pub operator: UnaryOperator,
    pub operand: Box<Node>,
    pub location: SrcSpan
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}{})", self.operator, self.operand)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarAccess {
    pub name: String,
    pub location: SrcSpan
}

impl Display for VarAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// `name = value`. Compound assignments arrive here already desugared.
#[derive(Debug, Clone, PartialEq)]
pub struct VarAssign {
    pub name: String,
    pub value: Box<Node>,
    pub location: SrcSpan
}

impl Display for VarAssign {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = {}", self.name, self.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclare {
    pub name: String,
    pub value: Option<Box<Node>>,
    pub location: SrcSpan
}

impl Display for VarDeclare {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            Some(value) => write!(f, "let {} = {}", self.name, value),
            None => write!(f, "let {}", self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListDeclare {
    pub name: String,
    pub length: Box<Node>,
    pub location: SrcSpan
}

impl Display for ListDeclare {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "let {}[{}]", self.name, self.length)
    }
}

// if -> if ( <expression> ) <body> [ else ( <block> | <statement> ) ]
#[derive(Debug, Clone, PartialEq)]
pub struct If {
    pub condition: Box<Node>,
    pub then_branch: Box<Node>,
    pub else_branch: Option<Box<Node>>,
    pub location: SrcSpan
}

impl Parse for If {
    fn parse(parser: &mut Parser) -> Result<Self, ParseError> {
        let (start, _) = parser.expect_one(Token::If)?;

        let condition = parse_header_expression(parser)?;
        let then_branch = parse_body(parser)?;
        let mut end = then_branch.location().end;

        let checkpoint = parser.checkpoint();
        parser.skip_newline();

        let else_branch = match parser.current_token() {
            Token::Else => {
                parser.step();
                parser.skip_newline();

                let alternative = match parser.current_token() {
                    Token::LCurly => parse_block(parser)?,
                    _ => Node::parse(parser)?,
                };

                end = alternative.location().end;

                Some(Box::new(alternative))
            },
            _ => {
                // give the line breaks back to the enclosing statement list
                parser.rewind(checkpoint);
                None
            }
        };

        Ok(Self {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch,
            location: SrcSpan::from(start, end)
        })
    }
}

impl Display for If {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.else_branch {
            Some(alternative) => write!(
                f, "if ({}) {} else {}",
                self.condition, self.then_branch, alternative
            ),
            None => write!(f, "if ({}) {}", self.condition, self.then_branch),
        }
    }
}

// while -> while ( <expression> ) <body>
#[derive(Debug, Clone, PartialEq)]
pub struct While {
    pub condition: Box<Node>,
    pub body: Box<Node>,
    pub location: SrcSpan
}

impl Parse for While {
    fn parse(parser: &mut Parser) -> Result<Self, ParseError> {
        let (start, _) = parser.expect_one(Token::While)?;

        let condition = parse_header_expression(parser)?;
        let body = parse_body(parser)?;
        let end = body.location().end;

        Ok(Self {
            condition: Box::new(condition),
            body: Box::new(body),
            location: SrcSpan::from(start, end)
        })
    }
}

impl Display for While {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "while ({}) {}", self.condition, self.body)
    }
}

// for -> for ( [<expression>] ; [<expression>] ; [<expression>] ) <body>
#[derive(Debug, Clone, PartialEq)]
pub struct For {
    pub init: Box<Node>,
    pub condition: Box<Node>,
    pub step: Box<Node>,
    pub body: Box<Node>,
    pub location: SrcSpan
}

impl Parse for For {
    fn parse(parser: &mut Parser) -> Result<Self, ParseError> {
        let (start, _) = parser.expect_one(Token::For)?;
        parser.expect_one(Token::LParen)?;

        let init = parse_clause(parser, Token::Semicolon)?;
        parser.expect_one(Token::Semicolon)?;

        let condition = parse_clause(parser, Token::Semicolon)?;
        parser.expect_one(Token::Semicolon)?;

        let step = parse_clause(parser, Token::RParen)?;
        parser.expect_one(Token::RParen)?;

        let body = parse_body(parser)?;
        let end = body.location().end;

        Ok(Self {
            init: Box::new(init),
            condition: Box::new(condition),
            step: Box::new(step),
            body: Box::new(body),
            location: SrcSpan::from(start, end)
        })
    }
}

impl Display for For {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f, "for ({}; {}; {}) {}",
            self.init, self.condition, self.step, self.body
        )
    }
}

// function -> function [<identifier>] ( [<identifier> { , <identifier> }] ) <body>
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Rc<Node>,
    pub location: SrcSpan
}

impl Parse for FunctionDef {
    fn parse(parser: &mut Parser) -> Result<Self, ParseError> {
        let (start, _) = parser.expect_one(Token::Function)?;

        let name = match parser.current_token() {
            Token::Ident(name) => {
                let name = name.clone();
                parser.step();
                Some(name)
            },
            _ => None
        };

        if !matches!(parser.current_token(), Token::LParen) {
            return match name {
                Some(_) => parser.unexpected(&["'('"]),
                None => parser.unexpected(&["identifier", "'('"]),
            };
        }
        parser.step();

        let mut params = vec![];

        if !matches!(parser.current_token(), Token::RParen) {
            params.push(parser.expect_ident("argument name")?.1);

            while matches!(parser.current_token(), Token::Comma) {
                parser.step();
                params.push(parser.expect_ident("argument name")?.1);
            }

            if !matches!(parser.current_token(), Token::RParen) {
                return parser.unexpected(&["','", "')'"]);
            }
        }
        parser.step();

        let body = parse_body(parser)?;
        let end = body.location().end;

        Ok(Self {
            name,
            params,
            body: Rc::new(body),
            location: SrcSpan::from(start, end)
        })
    }
}

impl Display for FunctionDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f, "function {}({}) {}",
            self.name.as_deref().unwrap_or_default(),
            self.params.join(", "),
            self.body
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub callee: Box<Node>,
    pub args: Vec<Node>,
    pub location: SrcSpan
}

impl Display for Call {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let args = self.args.iter()
            .map(|arg| format!("{arg}"))
            .collect::<Vec<String>>();

        write!(f, "{}({})", self.callee, args.join(", "))
    }
}

// list -> [ [<expression> { , <expression> }] ]
#[derive(Debug, Clone, PartialEq)]
pub struct ListLit {
    pub elements: Vec<Node>,
    pub location: SrcSpan
}

impl Parse for ListLit {
    fn parse(parser: &mut Parser) -> Result<Self, ParseError> {
        let (start, _) = parser.expect_one(Token::LSBracket)?;
        let (elements, end) = parser.parse_arguments(Token::RSBracket)?;

        Ok(Self {
            elements,
            location: SrcSpan::from(start, end)
        })
    }
}

impl Display for ListLit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let elements = self.elements.iter()
            .map(|element| format!("{element}"))
            .collect::<Vec<String>>();

        write!(f, "[{}]", elements.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexGet {
    pub target: Box<Node>,
    pub index: Box<Node>,
    pub location: SrcSpan
}

impl Display for IndexGet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]", self.target, self.index)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexSet {
    pub target: Box<Node>,
    pub index: Box<Node>,
    pub value: Box<Node>,
    pub location: SrcSpan
}

impl Display for IndexSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}] = {}", self.target, self.index, self.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Return {
    pub value: Option<Box<Node>>,
    pub location: SrcSpan
}

impl Display for Return {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            Some(value) => write!(f, "return {value}"),
            None => write!(f, "return"),
        }
    }
}

fn parse_header_expression(parser: &mut Parser) -> Result<Node, ParseError> {
    parser.expect_one(Token::LParen)?;
    let expression = parser.parse_expression()?;
    parser.expect_one(Token::RParen)?;

    Ok(expression)
}

fn parse_clause(parser: &mut Parser, terminator: Token) -> Result<Node, ParseError> {
    if *parser.current_token() == terminator {
        return Ok(Node::empty_at(parser));
    }

    parser.parse_expression()
}

fn parse_block(parser: &mut Parser) -> Result<Node, ParseError> {
    let (start, _) = parser.expect_one(Token::LCurly)?;
    let statements = Statements::parse(parser)?;
    let (_, end) = parser.expect_one(Token::RCurly)?;

    Ok(Node::Block(Statements {
        nodes: statements.nodes,
        location: SrcSpan::from(start, end)
    }))
}

// body -> { <newline> } ( <block> | <inline statement> )
fn parse_body(parser: &mut Parser) -> Result<Node, ParseError> {
    parser.skip_newline();

    if matches!(parser.current_token(), Token::LCurly) {
        return parse_block(parser);
    }

    let start = parser.checkpoint();
    let result = parser.parse_inline_statement();

    parser.recover(start, result, BODY_START)
}
