use crate::{config::ConfigError, language::errors::SyntaxError, runtime::error::RuntimeError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JudgeError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("I/O error: {source} (path: {})", path.display())]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("{0}")]
    Usage(String),
}

pub type Result<T> = std::result::Result<T, JudgeError>;

impl JudgeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        JudgeError::Io {
            source,
            path: path.into(),
        }
    }
}
