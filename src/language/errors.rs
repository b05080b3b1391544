use crate::language::span::Span;
use miette::SourceSpan;
use std::fmt;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("Syntax error: {message}{}", Context(.context.as_deref()))]
pub struct SyntaxError {
    pub message: String,
    pub span: Span,
    pub help: Option<String>,
    /// Text of the offending token, when the error is tied to one.
    pub token: Option<String>,
    /// Head keyword of the enclosing construct (`set`, `for`, a call name, ...).
    pub context: Option<String>,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            help: None,
            token: None,
            context: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Attaches the enclosing construct unless an inner one was already recorded.
    pub fn within(mut self, construct: &str) -> Self {
        if self.context.is_none() {
            self.context = Some(construct.to_string());
        }
        self
    }

    pub fn label(&self) -> String {
        match &self.token {
            Some(token) if !token.is_empty() => format!("unexpected `{token}`"),
            _ => "here".to_string(),
        }
    }

    pub fn to_source_span(&self) -> SourceSpan {
        self.span.into()
    }
}

struct Context<'a>(Option<&'a str>);

impl fmt::Display for Context<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(construct) => write!(f, " (in `{construct}`)"),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_innermost_context() {
        let err = SyntaxError::new("Invalid identifier: 1x", Span::new(3, 5))
            .with_token("1x")
            .within("set")
            .within("block");
        assert_eq!(
            err.to_string(),
            "Syntax error: Invalid identifier: 1x (in `set`)"
        );
        assert_eq!(err.label(), "unexpected `1x`");
    }
}
