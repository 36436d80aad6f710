//! pochoir - a streaming token-substitution template engine
//!
//! Templates are plain text with tokens delimited by `{{` and `}}`. A token
//! whose first word starts with `!` selects a control command; anything else
//! is a substitution name handed to a pluggable [`TokenResolver`]. Parsing
//! is a single pass into a chunk list; streaming is one forward walk that
//! writes chunk by chunk into an `io::Write` sink.
//!
//! # Syntax Overview
//!
//! ```text
//! {{name}}                 - Substitution (resolver-encoded output)
//! {{!RAW name}}            - Substitution without output encoding
//! {{!DATE name format}}    - Date value rendered through a strftime format
//! {{!LOOP id path}}...{{!ENDLOOP}}  - Repeat the body, binding id per pass
//! {{!IF path}}...{{!ELSE}}...{{!ENDIF}} - Conditional on path truthiness
//! {{!DEBUG}}               - Dump resolvable names to the output
//! ```
//!
//! There is no escape for a literal `{{`: it always opens a token. A single
//! `{` is ordinary text. Missing `{{!ENDLOOP}}` / `{{!ENDIF}}` terminators
//! are tolerated; the block runs to the end of the template.
//!
//! # Example
//!
//! ```ignore
//! use pochoir::{stream_template, Value, ValueResolver};
//!
//! let mut resolver = ValueResolver::new(Value::from(data));
//! let mut out = Vec::new();
//! stream_template(&mut out, "Hello, {{user.name}}!", &mut resolver)?;
//! ```

pub mod error;
pub mod lexer;
pub mod render;
pub mod resolver;
pub mod value;

pub use error::{
    CommandArityError, HalfClosedTokenError, Span, TemplateSource, UnterminatedTokenError,
};
pub use lexer::{Chunk, ChunkKind, Lexer};
pub use render::{stream_template, stream_template_file, Command, Template};
pub use resolver::{html_escape, TokenResolver, ValueResolver};
pub use value::Value;
