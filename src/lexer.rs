//! Chunk scanner for the template source
//!
//! Splits raw template text into an ordered list of chunks: literal text and
//! tokens delimited by `{{` / `}}`. The scan is lossless: re-wrapping token
//! chunks in their delimiters and concatenating everything in order
//! reconstructs the source byte for byte.
//!
//! There is no escape for a literal `{{`; it always opens a token. A single
//! `{` is ordinary text.

use crate::error::{span, HalfClosedTokenError, Span, TemplateSource, UnterminatedTokenError};
use miette::Result;
use std::sync::Arc;

/// What a chunk holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// Literal text, emitted verbatim
    Text,
    /// Token content (everything between `{{` and `}}`, exclusive)
    Token,
}

/// A parsed span of template source
#[derive(Debug, Clone)]
pub struct Chunk {
    pub kind: ChunkKind,
    pub text: String,
    /// 1-based line where the chunk began (for error reporting)
    pub line: usize,
    /// Span in the source; for tokens this covers `{{` through `}}`
    pub span: Span,
}

impl Chunk {
    pub fn is_token(&self) -> bool {
        self.kind == ChunkKind::Token
    }
}

/// Lexer state (owns the source string via Arc for cheap cloning)
pub struct Lexer {
    source: Arc<String>,
    src: TemplateSource,
    /// Current byte position in source
    pos: usize,
    /// Current 1-based line number
    line: usize,
}

impl Lexer {
    pub fn new(source: Arc<String>, src: TemplateSource) -> Self {
        Self {
            source,
            src,
            pos: 0,
            line: 1,
        }
    }

    /// Peek at the next character without consuming
    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    /// Peek at the character after the next one
    fn peek2(&self) -> Option<char> {
        let mut chars = self.source[self.pos..].chars();
        chars.next();
        chars.next()
    }

    /// Advance by one character and return it, tracking line numbers
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    /// Scan the whole source into a chunk list
    ///
    /// The final literal buffer is always flushed, even when empty, as is the
    /// buffer before every token. Parsing any source therefore ends with a
    /// `Text` chunk.
    pub fn lex(mut self) -> Result<Vec<Chunk>> {
        let mut chunks = Vec::new();
        let mut buf = String::new();
        let mut buf_start = self.pos;
        let mut buf_line = self.line;

        loop {
            match self.peek() {
                None => {
                    chunks.push(Chunk {
                        kind: ChunkKind::Text,
                        text: buf,
                        line: buf_line,
                        span: span(buf_start, self.pos - buf_start),
                    });
                    return Ok(chunks);
                }
                Some('{') if self.peek2() == Some('{') => {
                    chunks.push(Chunk {
                        kind: ChunkKind::Text,
                        text: std::mem::take(&mut buf),
                        line: buf_line,
                        span: span(buf_start, self.pos - buf_start),
                    });
                    chunks.push(self.lex_token()?);
                    buf_start = self.pos;
                    buf_line = self.line;
                }
                Some('{') => {
                    // A single '{' never opens a token: keep it and the
                    // character after it, then continue scanning.
                    buf.push('{');
                    self.advance();
                    if let Some(c) = self.advance() {
                        buf.push(c);
                    }
                }
                Some(_) => {
                    if let Some(c) = self.advance() {
                        buf.push(c);
                    }
                }
            }
        }
    }

    /// Scan one token: `{{` content `}}`
    fn lex_token(&mut self) -> Result<Chunk> {
        let start = self.pos;
        let line = self.line;
        self.advance(); // {
        self.advance(); // {

        let mut text = String::new();
        loop {
            match self.advance() {
                None => Err(UnterminatedTokenError {
                    line,
                    span: span(start, 2),
                    src: self.src.named_source(),
                })?,
                Some('}') => break,
                Some(c) => text.push(c),
            }
        }

        // The first '}' must be immediately followed by a second one.
        match self.advance() {
            Some('}') => {}
            _ => Err(HalfClosedTokenError {
                line,
                span: span(start, self.pos - start),
                src: self.src.named_source(),
            })?,
        }

        Ok(Chunk {
            kind: ChunkKind::Token,
            text,
            line,
            span: span(start, self.pos - start),
        })
    }
}
