pub mod ast;
pub mod builtins;
pub mod errors;
pub mod lexer;
pub mod parser;
pub mod span;
