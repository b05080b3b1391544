use crate::{language::errors::SyntaxError, runtime::error::RuntimeError};
use miette::{Diagnostic, NamedSource, Report, SourceSpan};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic, Clone)]
#[error("{message}")]
pub struct SyntaxDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("{label}")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
    message: String,
    label: String,
}

impl SyntaxDiagnostic {
    pub fn from_error(src: NamedSource<String>, err: &SyntaxError) -> Self {
        let message = match &err.context {
            Some(construct) => format!("{} (in `{construct}`)", err.message),
            None => err.message.clone(),
        };
        Self {
            src,
            span: err.to_source_span(),
            help: err.help.clone(),
            message,
            label: err.label(),
        }
    }
}

/// Renders a syntax error against the text it came from.
pub fn render_syntax_error(name: &str, source: &str, err: &SyntaxError) -> String {
    let src = NamedSource::new(name, source.to_string());
    format!("{:?}", Report::new(SyntaxDiagnostic::from_error(src, err)))
}

pub fn emit_syntax_error(name: &str, source: &str, err: &SyntaxError) {
    eprintln!("{}", render_syntax_error(name, source, err));
}

pub fn report_runtime_error(error: &RuntimeError) {
    eprintln!("Runtime error: {error}");
}

pub fn report_io_error(path: &Path, error: &std::io::Error) {
    eprintln!("Failed to access {}: {}", path.display(), error);
}
