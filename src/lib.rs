pub mod analysis;
pub mod config;
pub mod error;
pub mod formatter;
pub mod language;
pub mod rewrite;
pub mod runtime;
pub mod tools;

pub use error::{JudgeError, Result};
pub use language::{ast::Program, parser::parse_program};

#[cfg(test)]
mod tests;
