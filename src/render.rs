//! Stream evaluator
//!
//! Walks a parsed chunk list with a single forward cursor, writing literal
//! chunks to the sink and dispatching tokens: plain substitution through the
//! resolver, plus the `!LOOP` / `!IF` / `!RAW` / `!DATE` / `!DEBUG` control
//! commands. This is the main public API for the engine.
//!
//! `!LOOP` and `!IF` handlers return the index of their own terminator chunk,
//! so nested blocks are matched by the nearest enclosing unclosed opener
//! rather than by counting keywords. Missing terminators are not errors: the
//! block simply extends to the end of the template.

use crate::error::{CommandArityError, TemplateSource};
use crate::lexer::{Chunk, ChunkKind, Lexer};
use crate::resolver::TokenResolver;
use camino::Utf8Path;
use miette::{IntoDiagnostic, Result, WrapErr};
use std::io;
use std::sync::Arc;

/// The closed set of control commands, selected by a token's first
/// space-separated word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Loop,
    EndLoop,
    If,
    Else,
    EndIf,
    Raw,
    Date,
    Debug,
}

impl Command {
    /// Recognize a command word by exact match (case-sensitive)
    ///
    /// Anything else, `!LOOPY` included, is a plain substitution token.
    pub fn from_word(word: &str) -> Option<Command> {
        match word {
            "!LOOP" => Some(Command::Loop),
            "!ENDLOOP" => Some(Command::EndLoop),
            "!IF" => Some(Command::If),
            "!ELSE" => Some(Command::Else),
            "!ENDIF" => Some(Command::EndIf),
            "!RAW" => Some(Command::Raw),
            "!DATE" => Some(Command::Date),
            "!DEBUG" => Some(Command::Debug),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Command::Loop => "!LOOP",
            Command::EndLoop => "!ENDLOOP",
            Command::If => "!IF",
            Command::Else => "!ELSE",
            Command::EndIf => "!ENDIF",
            Command::Raw => "!RAW",
            Command::Date => "!DATE",
            Command::Debug => "!DEBUG",
        }
    }
}

/// Split a command token into words on runs of spaces, trimming the final
/// word of surrounding whitespace
///
/// The first word is the command; the rest are its arguments. A command
/// followed only by whitespace yields zero arguments.
fn split_words(text: &str) -> Vec<&str> {
    let mut words: Vec<&str> = text.split(' ').filter(|w| !w.is_empty()).collect();
    if let Some(last) = words.pop() {
        let trimmed = last.trim();
        if !trimmed.is_empty() {
            words.push(trimmed);
        }
    }
    words
}

/// The command a chunk dispatches, if any
fn chunk_command(chunk: &Chunk) -> Option<Command> {
    if chunk.kind != ChunkKind::Token {
        return None;
    }
    split_words(&chunk.text)
        .first()
        .and_then(|w| Command::from_word(w))
}

/// A parsed template ready for streaming
///
/// Parse once, stream many: each [`stream`](Template::stream) call walks the
/// chunk list with its own cursor, so one parsed template can serve
/// concurrent streams into distinct sinks and resolvers.
#[derive(Debug, Clone)]
pub struct Template {
    chunks: Vec<Chunk>,
    source: TemplateSource,
}

impl Template {
    /// Parse a template from source
    pub fn parse(name: impl Into<String>, source: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let source_str: String = source.into();
        let template_source = TemplateSource::new(&name, &source_str);

        let lexer = Lexer::new(Arc::new(source_str), template_source.clone());
        let chunks = lexer.lex()?;

        Ok(Self {
            chunks,
            source: template_source,
        })
    }

    /// The parsed chunk list
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Stream the template into `out`, resolving tokens through `resolver`
    ///
    /// Output written before a failure stays written; callers needing
    /// atomicity must buffer the sink themselves.
    pub fn stream(
        &self,
        out: &mut dyn io::Write,
        resolver: &mut dyn TokenResolver,
    ) -> Result<()> {
        let mut renderer = Renderer {
            chunks: &self.chunks,
            out,
            resolver,
            source: &self.source,
        };
        renderer.stream_all()
    }
}

/// Parse and stream in one call: the sole externally invoked operation
pub fn stream_template(
    out: &mut dyn io::Write,
    source: &str,
    resolver: &mut dyn TokenResolver,
) -> Result<()> {
    Template::parse("template", source)?.stream(out, resolver)
}

/// Read a template file (UTF-8) and stream it
///
/// The template is named after the path in diagnostics.
pub fn stream_template_file(
    out: &mut dyn io::Write,
    path: &Utf8Path,
    resolver: &mut dyn TokenResolver,
) -> Result<()> {
    let source = std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read template file {path}"))?;
    tracing::debug!(path = %path, bytes = source.len(), "loaded template file");
    Template::parse(path.as_str(), source)?.stream(out, resolver)
}

/// Internal evaluator state: one cursor walk over the chunk list
struct Renderer<'a> {
    chunks: &'a [Chunk],
    out: &'a mut dyn io::Write,
    resolver: &'a mut dyn TokenResolver,
    source: &'a TemplateSource,
}

impl<'a> Renderer<'a> {
    fn stream_all(&mut self) -> Result<()> {
        let mut i = 0;
        while i < self.chunks.len() {
            i = self.dispatch(i, true)? + 1;
        }
        Ok(())
    }

    /// Wrap a resolver or sink failure with the originating chunk's line
    fn at_line<T>(&self, result: Result<T>, line: usize) -> Result<T> {
        result.wrap_err_with(|| format!("problem on line {line} of template"))
    }

    /// Dispatch the chunk at `i`; returns the index of the last chunk the
    /// dispatch consumed (the chunk itself, or a block's terminator)
    ///
    /// When `show` is false all literal and substitution output is
    /// suppressed, but loop bookkeeping, condition tests, and `!DEBUG` still
    /// run so cursor advancement and resolver state stay correct.
    fn dispatch(&mut self, i: usize, show: bool) -> Result<usize> {
        let chunk = &self.chunks[i];
        if chunk.kind == ChunkKind::Text {
            if show {
                let write = self
                    .out
                    .write_all(chunk.text.as_bytes())
                    .into_diagnostic();
                self.at_line(write, chunk.line)?;
            }
            return Ok(i);
        }

        let words = split_words(&chunk.text);
        match words.first().and_then(|w| Command::from_word(w)) {
            None => {
                // Substitution: the entire untrimmed token text is the name.
                if show {
                    let write = self.resolver.write_value(self.out, &chunk.text);
                    self.at_line(write, chunk.line)?;
                }
                Ok(i)
            }
            Some(Command::Raw) => {
                let args = self.require_args(chunk, Command::Raw, &words, 1)?;
                if show {
                    let write = self.resolver.write_value_raw(self.out, args[0]);
                    self.at_line(write, chunk.line)?;
                }
                Ok(i)
            }
            Some(Command::Date) => {
                let args = self.require_args(chunk, Command::Date, &words, 2)?;
                if show {
                    let write = self.resolver.write_date(self.out, args[0], args[1]);
                    self.at_line(write, chunk.line)?;
                }
                Ok(i)
            }
            Some(Command::Debug) => {
                // !DEBUG fires even inside a suppressed branch.
                let dump = self.resolver.debug_dump(self.out);
                self.at_line(dump, chunk.line)?;
                Ok(i)
            }
            Some(Command::Loop) => self.eval_loop(i, &words, show),
            Some(Command::If) => self.eval_if(i, &words, show),
            Some(cmd @ (Command::EndLoop | Command::EndIf | Command::Else)) => {
                // Only meaningful as scan targets inside an open block.
                tracing::warn!(
                    command = cmd.as_str(),
                    line = chunk.line,
                    "ignoring terminator with no matching opener"
                );
                Ok(i)
            }
        }
    }

    /// Validate argument count; `!LOOP` and `!IF` take an exact count, the
    /// output commands take a minimum (extras are ignored)
    fn require_args<'w>(
        &self,
        chunk: &Chunk,
        cmd: Command,
        words: &[&'w str],
        expected: usize,
    ) -> Result<Vec<&'w str>> {
        let args = &words[1..];
        let exact = matches!(cmd, Command::Loop | Command::If);
        if args.len() < expected || (exact && args.len() != expected) {
            Err(CommandArityError {
                command: cmd.as_str().to_string(),
                expected,
                found: args.len(),
                line: chunk.line,
                span: chunk.span,
                src: self.source.named_source(),
            })?;
        }
        Ok(args.to_vec())
    }

    /// Handle `!LOOP id path` at `at`; returns the index of the matching
    /// `!ENDLOOP`, or of the final chunk if none exists
    fn eval_loop(&mut self, at: usize, words: &[&str], show: bool) -> Result<usize> {
        let chunk = &self.chunks[at];
        let line = chunk.line;
        let args = self.require_args(chunk, Command::Loop, words, 2)?;
        let (id, path) = (args[0], args[1]);

        let init = self.resolver.init_loop(id, path);
        let count = self.at_line(init, line)?;

        let end = if count == 0 {
            // Zero passes: find the terminator structurally, dispatching
            // nothing, so the body has no side effects at all.
            self.skip_block(at + 1, Command::EndLoop)
        } else {
            let mut end = at;
            for pass in 0..count {
                let set = self.resolver.set_iteration(id, pass);
                self.at_line(set, line)?;
                end = self.stream_block(at + 1, Command::EndLoop, show)?;
            }
            end
        };

        let close = self.resolver.close_loop(id);
        self.at_line(close, line)?;
        Ok(end)
    }

    /// Handle `!IF path` at `at`; returns the index of the matching
    /// `!ENDIF`, or of the final chunk if none exists
    fn eval_if(&mut self, at: usize, words: &[&str], show: bool) -> Result<usize> {
        let chunk = &self.chunks[at];
        let line = chunk.line;
        let args = self.require_args(chunk, Command::If, words, 1)?;

        // The condition is tested exactly once per dispatch, visible or not.
        let test = self.resolver.if_value(args[0]);
        let mut has_value = self.at_line(test, line)?;

        let mut i = at + 1;
        while i < self.chunks.len() {
            match chunk_command(&self.chunks[i]) {
                Some(Command::EndIf) => return Ok(i),
                Some(Command::Else) => {
                    // Every !ELSE at this level flips the branch; a second
                    // one flips back. No validation, by design.
                    has_value = !has_value;
                    i += 1;
                }
                _ => {
                    i = self.dispatch(i, show && has_value)? + 1;
                }
            }
        }
        Ok(self.chunks.len() - 1)
    }

    /// Locate a block terminator without dispatching anything, recursing
    /// into nested blocks so matching stays nearest-enclosing
    fn skip_block(&self, start: usize, end_cmd: Command) -> usize {
        let mut i = start;
        while i < self.chunks.len() {
            match chunk_command(&self.chunks[i]) {
                Some(cmd) if cmd == end_cmd => return i,
                Some(Command::Loop) => {
                    i = self.skip_block(i + 1, Command::EndLoop) + 1;
                }
                Some(Command::If) => {
                    i = self.skip_block(i + 1, Command::EndIf) + 1;
                }
                _ => i += 1,
            }
        }
        self.chunks.len() - 1
    }

    /// Stream chunks from `start` until the terminator, dispatching each one;
    /// returns the terminator's index, or the final chunk index if none exists
    fn stream_block(&mut self, start: usize, end_cmd: Command, show: bool) -> Result<usize> {
        let mut i = start;
        while i < self.chunks.len() {
            if chunk_command(&self.chunks[i]) == Some(end_cmd) {
                return Ok(i);
            }
            i = self.dispatch(i, show)? + 1;
        }
        Ok(self.chunks.len() - 1)
    }
}
