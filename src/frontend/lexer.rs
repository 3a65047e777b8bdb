use std::collections::HashMap;
use std::fmt::{self, Display};
use std::iter::Peekable;
use std::str::CharIndices;

use once_cell::sync::Lazy;

use crate::frontend::location::{Position, SourceLocation};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token<'src> {
    // Keywords
    Const,
    Let,
    Var,
    Function,
    Return,

    Identifier(&'src str),
    Number(f64),
    // Raw contents between the quotes, escapes still in place
    Str(&'src str),
    Operator(Ops),

    Assign,
    OpenParen,
    ClosedParen,
    OpenBrace,
    ClosedBrace,
    Comma,
    Semicolon,
    Dot,

    UnterminatedString(&'src str),
    Unknown(&'src str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ops {
    Plus,
    Minus,
    Mult,
    Div,
    Mod,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    Eq,
    StrictEq,
    NotEq,
    StrictNotEq,
}

impl Ops {
    pub fn symbol(self) -> &'static str {
        match self {
            Ops::Plus => "+",
            Ops::Minus => "-",
            Ops::Mult => "*",
            Ops::Div => "/",
            Ops::Mod => "%",
            Ops::Less => "<",
            Ops::Greater => ">",
            Ops::LessEq => "<=",
            Ops::GreaterEq => ">=",
            Ops::Eq => "==",
            Ops::StrictEq => "===",
            Ops::NotEq => "!=",
            Ops::StrictNotEq => "!==",
        }
    }
}

impl Display for Ops {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

static KEYWORDS: Lazy<HashMap<&'static str, Token<'static>>> = Lazy::new(|| {
    HashMap::from([
        ("const", Token::Const),
        ("let", Token::Let),
        ("var", Token::Var),
        ("function", Token::Function),
        ("return", Token::Return),
    ])
});

/// A token together with the range of source it was read from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spanned<'src> {
    pub token: Token<'src>,
    pub loc: SourceLocation,
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[derive(Debug)]
pub struct Tokens<'src> {
    src: &'src str,
    chars: Peekable<CharIndices<'src>>,
    line: usize,
    column: usize,
}

impl<'src> Tokens<'src> {
    pub fn new(src: &'src str) -> Self {
        Self {
            src,
            chars: src.char_indices().peekable(),
            line: 1,
            column: 0,
        }
    }

    fn here(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn offset(&mut self) -> usize {
        self.chars.peek().map_or(self.src.len(), |&(idx, _)| idx)
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn rest(&mut self) -> &'src str {
        let offset = self.offset();
        &self.src[offset..]
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        let (idx, c) = self.chars.next()?;

        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }

        Some((idx, c))
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) -> usize {
        while self.peek_char().is_some_and(&pred) {
            self.bump();
        }
        self.offset()
    }

    // Whitespace, line comments and block comments
    fn skip_trivia(&mut self) {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.rest().starts_with("//") => {
                    self.eat_while(|c| c != '\n');
                }
                Some('/') if self.rest().starts_with("/*") => {
                    self.bump();
                    self.bump();
                    while !self.rest().is_empty() && !self.rest().starts_with("*/") {
                        self.bump();
                    }
                    self.bump();
                    self.bump();
                }
                _ => return,
            }
        }
    }

    fn number(&mut self, start: usize, leading_dot: bool) -> Token<'src> {
        self.eat_while(|c| c.is_ascii_digit());

        if !leading_dot && self.peek_char() == Some('.') {
            self.bump();
            self.eat_while(|c| c.is_ascii_digit());
        }

        let rest = self.rest().as_bytes();
        let has_exponent = match rest {
            [b'e' | b'E', b'+' | b'-', d, ..] | [b'e' | b'E', d, ..] => d.is_ascii_digit(),
            _ => false,
        };
        if has_exponent {
            self.bump();
            if matches!(self.peek_char(), Some('+' | '-')) {
                self.bump();
            }
            self.eat_while(|c| c.is_ascii_digit());
        }

        let end = self.offset();
        let text = &self.src[start..end];

        match text.parse::<f64>() {
            Ok(num) => Token::Number(num),
            Err(_) => Token::Unknown(text),
        }
    }

    fn string(&mut self, start: usize, quote: char) -> Token<'src> {
        loop {
            match self.peek_char() {
                None | Some('\n') => {
                    let end = self.offset();
                    return Token::UnterminatedString(&self.src[start..end]);
                }
                Some('\\') => {
                    self.bump();
                    self.bump();
                }
                Some(c) if c == quote => {
                    let end = self.offset();
                    self.bump();
                    return Token::Str(&self.src[start + 1..end]);
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    fn identifier(&mut self, start: usize) -> Token<'src> {
        let end = self.eat_while(is_ident_continue);
        let text = &self.src[start..end];

        match KEYWORDS.get(text) {
            Some(&keyword) => keyword,
            None => Token::Identifier(text),
        }
    }
}

impl<'src> Iterator for Tokens<'src> {
    type Item = Spanned<'src>;

    fn next(&mut self) -> Option<Self::Item> {
        use Token::*;

        self.skip_trivia();

        let start = self.here();
        let (offset, c) = self.bump()?;

        let token = match c {
            '(' => OpenParen,
            ')' => ClosedParen,
            '{' => OpenBrace,
            '}' => ClosedBrace,
            ',' => Comma,
            ';' => Semicolon,

            '+' => Operator(Ops::Plus),
            '-' => Operator(Ops::Minus),
            '*' => Operator(Ops::Mult),
            '/' => Operator(Ops::Div),
            '%' => Operator(Ops::Mod),
            '<' if self.eat('=') => Operator(Ops::LessEq),
            '<' => Operator(Ops::Less),
            '>' if self.eat('=') => Operator(Ops::GreaterEq),
            '>' => Operator(Ops::Greater),
            '=' if self.eat('=') => {
                if self.eat('=') {
                    Operator(Ops::StrictEq)
                } else {
                    Operator(Ops::Eq)
                }
            }
            '=' => Assign,
            '!' if self.eat('=') => {
                if self.eat('=') {
                    Operator(Ops::StrictNotEq)
                } else {
                    Operator(Ops::NotEq)
                }
            }

            '"' | '\'' => self.string(offset, c),
            '.' if self.peek_char().is_some_and(|c| c.is_ascii_digit()) => self.number(offset, true),
            '.' => Dot,
            c if c.is_ascii_digit() => self.number(offset, false),
            c if is_ident_start(c) => self.identifier(offset),

            other => Unknown(&self.src[offset..offset + other.len_utf8()]),
        };

        Some(Spanned {
            token,
            loc: SourceLocation::new(start, self.here()),
        })
    }
}

pub trait Lex {
    fn lex(&self) -> Tokens<'_>;
}

impl Lex for str {
    fn lex(&self) -> Tokens<'_> {
        Tokens::new(self)
    }
}
