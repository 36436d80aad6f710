//! Error types for parsing and streaming
//!
//! Every diagnostic carries a [`NamedSource`] and a labeled span so miette
//! can point at the offending spot in the template.

use miette::{Diagnostic, NamedSource, SourceSpan};
use std::sync::Arc;
use thiserror::Error;

/// A span in the template source (re-export from miette)
pub type Span = SourceSpan;

/// Create a span from offset and length
pub fn span(offset: usize, len: usize) -> Span {
    SourceSpan::new(offset.into(), len)
}

/// Template name plus shared source text, for building error diagnostics
#[derive(Debug, Clone)]
pub struct TemplateSource {
    name: String,
    source: Arc<String>,
}

impl TemplateSource {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: Arc::new(source.into()),
        }
    }

    /// The template name (file path or caller-supplied label)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The full source text
    pub fn text(&self) -> &str {
        &self.source
    }

    /// Build a `NamedSource` for attaching to a diagnostic
    pub fn named_source(&self) -> NamedSource<String> {
        NamedSource::new(&self.name, self.source.as_ref().clone())
    }
}

/// A `{{` was opened but the input ended before any `}` was found.
#[derive(Debug, Error, Diagnostic)]
#[error("unterminated token starting on line {line} of template")]
#[diagnostic(
    code(pochoir::unterminated_token),
    help("every '{{{{' must be closed by '}}}}'")
)]
pub struct UnterminatedTokenError {
    pub line: usize,
    #[label("this token is never closed")]
    pub span: Span,
    #[source_code]
    pub src: NamedSource<String>,
}

/// A token's first `}` was not immediately followed by a second `}`.
#[derive(Debug, Error, Diagnostic)]
#[error("token on line {line}: found one closing brace, but not the second")]
#[diagnostic(
    code(pochoir::half_closed_token),
    help("tokens are closed with '}}}}', not a single '}}'")
)]
pub struct HalfClosedTokenError {
    pub line: usize,
    #[label("token closed with a single '}}'")]
    pub span: Span,
    #[source_code]
    pub src: NamedSource<String>,
}

/// A control command was dispatched with the wrong number of arguments.
#[derive(Debug, Error, Diagnostic)]
#[error("{command} on line {line} expects {expected} argument(s), found {found}")]
#[diagnostic(code(pochoir::command_arity))]
pub struct CommandArityError {
    pub command: String,
    pub expected: usize,
    pub found: usize,
    pub line: usize,
    #[label("in this command")]
    pub span: Span,
    #[source_code]
    pub src: NamedSource<String>,
}
