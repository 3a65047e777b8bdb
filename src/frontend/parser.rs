use std::collections::HashMap;
use std::iter::Peekable;
use std::rc::Rc;

use lazy_static::lazy_static;
use thiserror::Error;

use crate::frontend::{
    ast::{DeclarationKind, Node, NodeKind},
    lexer::{Lex, Ops, Spanned, Token, Tokens},
    location::{Position, SourceLocation},
};

// Binding power of each binary operator, higher binds tighter. Tokens that
// are not operators get -1 so precedence climbing stops on them.
lazy_static! {
    static ref OP_PRECEDENCE: HashMap<Ops, i32> = {
        let mut map = HashMap::new();
        map.insert(Ops::Eq, 5);
        map.insert(Ops::NotEq, 5);
        map.insert(Ops::StrictEq, 5);
        map.insert(Ops::StrictNotEq, 5);
        map.insert(Ops::Less, 10);
        map.insert(Ops::Greater, 10);
        map.insert(Ops::LessEq, 10);
        map.insert(Ops::GreaterEq, 10);
        map.insert(Ops::Plus, 20);
        map.insert(Ops::Minus, 20);
        map.insert(Ops::Mult, 40);
        map.insert(Ops::Div, 40);
        map.insert(Ops::Mod, 40);
        map
    };
}

#[derive(Error, PartialEq, Debug)]
pub enum ParserError<'src> {
    #[error("Unexpected token: {token:?}")]
    UnexpectedToken {
        token: Token<'src>,
        loc: SourceLocation,
    },

    #[error("Reached end of input expecting more")]
    UnexpectedEOI { loc: SourceLocation },

    #[error("Expected {expected}, found {found:?}")]
    ExpectedToken {
        expected: &'static str,
        found: Token<'src>,
        loc: SourceLocation,
    },

    #[error("Unterminated string literal")]
    UnterminatedString { loc: SourceLocation },

    #[error("Invalid character: {text}")]
    InvalidCharacter {
        text: &'src str,
        loc: SourceLocation,
    },

    #[error("'return' outside of function")]
    IllegalReturn { loc: SourceLocation },
}

impl<'src> ParserError<'src> {
    pub fn loc(&self) -> SourceLocation {
        match self {
            ParserError::UnexpectedToken { loc, .. }
            | ParserError::UnexpectedEOI { loc }
            | ParserError::ExpectedToken { loc, .. }
            | ParserError::UnterminatedString { loc }
            | ParserError::InvalidCharacter { loc, .. }
            | ParserError::IllegalReturn { loc } => *loc,
        }
    }

    fn unexpected(spanned: Spanned<'src>) -> Self {
        match spanned.token {
            Token::UnterminatedString(_) => ParserError::UnterminatedString { loc: spanned.loc },
            Token::Unknown(text) => ParserError::InvalidCharacter {
                text,
                loc: spanned.loc,
            },
            token => ParserError::UnexpectedToken {
                token,
                loc: spanned.loc,
            },
        }
    }
}

type ParseResult<'src, T> = Result<T, ParserError<'src>>;

/// Parses a whole source text into a `Program` node.
pub fn parse_program(src: &str) -> ParseResult<'_, Node> {
    Parser::new(src).parse_program()
}

pub struct Parser<'src> {
    tokens: Peekable<Tokens<'src>>,
    eoi: SourceLocation,
    function_depth: usize,
}

fn end_of(src: &str) -> Position {
    let line = src.matches('\n').count() + 1;
    let column = src.rsplit('\n').next().map_or(0, |last| last.chars().count());
    Position::new(line, column)
}

impl<'src> Parser<'src> {
    pub fn new(src: &'src str) -> Self {
        let end = end_of(src);

        Self {
            tokens: src.lex().peekable(),
            eoi: SourceLocation::new(end, end),
            function_depth: 0,
        }
    }

    fn peek_token(&mut self) -> Option<Token<'src>> {
        self.tokens.peek().map(|spanned| spanned.token)
    }

    fn next_or_eoi(&mut self) -> ParseResult<'src, Spanned<'src>> {
        self.tokens
            .next()
            .ok_or(ParserError::UnexpectedEOI { loc: self.eoi })
    }

    fn expect(&mut self, expected: Token<'static>, what: &'static str) -> ParseResult<'src, Spanned<'src>> {
        let spanned = self.next_or_eoi()?;

        if spanned.token == expected {
            Ok(spanned)
        } else {
            Err(ParserError::ExpectedToken {
                expected: what,
                found: spanned.token,
                loc: spanned.loc,
            })
        }
    }

    fn expect_identifier(&mut self) -> ParseResult<'src, Node> {
        let spanned = self.next_or_eoi()?;

        match spanned.token {
            Token::Identifier(name) => Ok(Node::identifier(name, spanned.loc)),
            found => Err(ParserError::ExpectedToken {
                expected: "identifier",
                found,
                loc: spanned.loc,
            }),
        }
    }

    // Statements may end in an optional semicolon, extends loc when present
    fn eat_semicolon(&mut self, loc: SourceLocation) -> SourceLocation {
        match self.tokens.next_if(|spanned| spanned.token == Token::Semicolon) {
            Some(semi) => loc.to(semi.loc),
            None => loc,
        }
    }

    /// program ::= statement*
    pub fn parse_program(mut self) -> ParseResult<'src, Node> {
        let mut body = vec![];

        while self.tokens.peek().is_some() {
            if let Some(statement) = self.parse_statement()? {
                body.push(statement);
            }
        }

        let loc = SourceLocation::new(Position::new(1, 0), self.eoi.end);
        Ok(Node::new(NodeKind::Program { body }, loc))
    }

    /// statement
    ///   ::= vardecl
    ///   ::= functiondecl
    ///   ::= return
    ///   ::= block
    ///   ::= ';'
    ///   ::= expression ';'?
    fn parse_statement(&mut self) -> ParseResult<'src, Option<Node>> {
        let statement = match self.peek_token() {
            Some(Token::Const | Token::Let | Token::Var) => self.parse_variable_declaration()?,
            Some(Token::Function) => self.parse_function_declaration()?,
            Some(Token::Return) => self.parse_return()?,
            Some(Token::OpenBrace) => self.parse_block()?,
            Some(Token::Semicolon) => {
                let _semi = self.tokens.next();
                return Ok(None);
            }
            Some(_) => {
                let expression = self.parse_expression()?;
                let loc = self.eat_semicolon(expression.loc);
                Node::new(
                    NodeKind::ExpressionStatement {
                        expression: Box::new(expression),
                    },
                    loc,
                )
            }
            None => return Err(ParserError::UnexpectedEOI { loc: self.eoi }),
        };

        Ok(Some(statement))
    }

    /// vardecl ::= ('const' | 'let' | 'var') declarator (',' declarator)* ';'?
    fn parse_variable_declaration(&mut self) -> ParseResult<'src, Node> {
        let keyword = self.next_or_eoi()?;
        let kind = match keyword.token {
            Token::Const => DeclarationKind::Const,
            Token::Let => DeclarationKind::Let,
            Token::Var => DeclarationKind::Var,
            _ => return Err(ParserError::unexpected(keyword)),
        };

        let mut declarations = vec![self.parse_declarator()?];
        while self
            .tokens
            .next_if(|spanned| spanned.token == Token::Comma)
            .is_some()
        {
            declarations.push(self.parse_declarator()?);
        }

        let last = declarations.last().map_or(keyword.loc, |node| node.loc);
        let loc = self.eat_semicolon(keyword.loc.to(last));

        Ok(Node::new(
            NodeKind::VariableDeclaration { kind, declarations },
            loc,
        ))
    }

    /// declarator ::= identifier ('=' expression)?
    fn parse_declarator(&mut self) -> ParseResult<'src, Node> {
        let id = self.expect_identifier()?;

        let init = match self.tokens.next_if(|spanned| spanned.token == Token::Assign) {
            Some(_assign) => Some(Box::new(self.parse_expression()?)),
            None => None,
        };

        let loc = init.as_ref().map_or(id.loc, |init| id.loc.to(init.loc));

        Ok(Node::new(
            NodeKind::VariableDeclarator {
                id: Box::new(id),
                init,
            },
            loc,
        ))
    }

    /// functiondecl ::= 'function' identifier '(' (identifier (',' identifier)*)? ')' block
    fn parse_function_declaration(&mut self) -> ParseResult<'src, Node> {
        let keyword = self.expect(Token::Function, "'function'")?;
        let id = self.expect_identifier()?;

        self.expect(Token::OpenParen, "'('")?;

        let mut params = vec![];
        if self
            .tokens
            .next_if(|spanned| spanned.token == Token::ClosedParen)
            .is_none()
        {
            loop {
                let param = self.expect_identifier()?;
                params.extend(param.as_identifier().map(str::to_string));

                let separator = self.next_or_eoi()?;
                match separator.token {
                    Token::Comma => continue,
                    Token::ClosedParen => break,
                    found => {
                        return Err(ParserError::ExpectedToken {
                            expected: "',' or ')'",
                            found,
                            loc: separator.loc,
                        })
                    }
                }
            }
        }

        self.function_depth += 1;
        let body = self.parse_block();
        self.function_depth -= 1;
        let body = body?;

        let loc = keyword.loc.to(body.loc);

        Ok(Node::new(
            NodeKind::FunctionDeclaration {
                id: Box::new(id),
                params,
                body: Rc::new(body),
            },
            loc,
        ))
    }

    /// return ::= 'return' expression? ';'?
    fn parse_return(&mut self) -> ParseResult<'src, Node> {
        let keyword = self.expect(Token::Return, "'return'")?;

        if self.function_depth == 0 {
            return Err(ParserError::IllegalReturn { loc: keyword.loc });
        }

        let argument = match self.peek_token() {
            None | Some(Token::Semicolon | Token::ClosedBrace) => None,
            Some(_) => Some(Box::new(self.parse_expression()?)),
        };

        let loc = argument
            .as_ref()
            .map_or(keyword.loc, |argument| keyword.loc.to(argument.loc));
        let loc = self.eat_semicolon(loc);

        Ok(Node::new(NodeKind::ReturnStatement { argument }, loc))
    }

    /// block ::= '{' statement* '}'
    fn parse_block(&mut self) -> ParseResult<'src, Node> {
        let open = self.expect(Token::OpenBrace, "'{'")?;

        let mut body = vec![];
        loop {
            if let Some(close) = self
                .tokens
                .next_if(|spanned| spanned.token == Token::ClosedBrace)
            {
                let loc = open.loc.to(close.loc);
                return Ok(Node::new(NodeKind::BlockStatement { body }, loc));
            }

            if let Some(statement) = self.parse_statement()? {
                body.push(statement);
            }
        }
    }

    /// expression
    ///   ::= postfix binoprhs
    pub fn parse_expression(&mut self) -> ParseResult<'src, Node> {
        let lhs = self.parse_postfix()?;

        self.parse_binop_rhs(lhs, 0)
    }

    fn peek_precedence(&mut self) -> i32 {
        match self.peek_token() {
            Some(Token::Operator(op)) => OP_PRECEDENCE.get(&op).copied().unwrap_or(-1),
            _ => -1,
        }
    }

    /// binoprhs
    ///   ::= (binop postfix)*
    fn parse_binop_rhs(&mut self, mut lhs: Node, expr_prec: i32) -> ParseResult<'src, Node> {
        loop {
            let tok_prec = self.peek_precedence();

            if tok_prec < expr_prec {
                return Ok(lhs);
            }

            let operator = self.next_or_eoi()?;
            let Token::Operator(op) = operator.token else {
                return Err(ParserError::unexpected(operator));
            };

            let mut rhs = self.parse_postfix()?;

            let next_prec = self.peek_precedence();

            if tok_prec < next_prec {
                rhs = self.parse_binop_rhs(rhs, tok_prec + 1)?;
            }

            let loc = lhs.loc.to(rhs.loc);
            lhs = Node::new(
                NodeKind::BinaryExpression {
                    operator: op,
                    left: Box::new(lhs),
                    right: Box::new(rhs),
                },
                loc,
            );
        }
    }

    /// postfix
    ///   ::= primary ('.' identifier | '(' arguments ')')*
    fn parse_postfix(&mut self) -> ParseResult<'src, Node> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.peek_token() {
                Some(Token::Dot) => {
                    let _dot = self.tokens.next();
                    let property = self.expect_identifier()?;
                    let loc = expr.loc.to(property.loc);

                    expr = Node::new(
                        NodeKind::MemberExpression {
                            object: Box::new(expr),
                            property: Box::new(property),
                        },
                        loc,
                    );
                }
                Some(Token::OpenParen) => {
                    let _open_paren = self.tokens.next();
                    let (arguments, close) = self.parse_arguments()?;
                    let loc = expr.loc.to(close);

                    expr = Node::new(
                        NodeKind::CallExpression {
                            callee: Box::new(expr),
                            arguments,
                        },
                        loc,
                    );
                }
                _ => return Ok(expr),
            }
        }
    }

    /// arguments ::= (expression (',' expression)*)? ')'
    fn parse_arguments(&mut self) -> ParseResult<'src, (Vec<Node>, SourceLocation)> {
        let mut args = vec![];

        if let Some(close) = self
            .tokens
            .next_if(|spanned| spanned.token == Token::ClosedParen)
        {
            return Ok((args, close.loc));
        }

        loop {
            args.push(self.parse_expression()?);

            let separator = self.next_or_eoi()?;
            match separator.token {
                Token::Comma => continue,
                Token::ClosedParen => return Ok((args, separator.loc)),
                found => {
                    return Err(ParserError::ExpectedToken {
                        expected: "',' or ')'",
                        found,
                        loc: separator.loc,
                    })
                }
            }
        }
    }

    /// primary
    ///   ::= number
    ///   ::= string
    ///   ::= identifier
    ///   ::= '(' expression ')'
    fn parse_primary(&mut self) -> ParseResult<'src, Node> {
        let spanned = self.next_or_eoi()?;

        match spanned.token {
            Token::Number(value) => Ok(Node::number(value, spanned.loc)),

            Token::Str(raw) => Ok(Node::new(
                NodeKind::StringLiteral {
                    value: unescape(raw),
                },
                spanned.loc,
            )),

            Token::Identifier(name) => Ok(Node::identifier(name, spanned.loc)),

            Token::OpenParen => {
                let expr = self.parse_expression()?;
                self.expect(Token::ClosedParen, "')'")?;
                Ok(expr)
            }

            _ => Err(ParserError::unexpected(spanned)),
        }
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}
