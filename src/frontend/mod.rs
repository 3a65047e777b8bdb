pub mod ast;
pub mod lexer;
pub mod location;
pub mod parser;
