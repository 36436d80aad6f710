//! Token value resolution
//!
//! [`TokenResolver`] is the engine's only collaborator seam: the evaluator
//! calls back into it for every substitution, loop bound, loop pass,
//! conditional test, and debug dump. [`ValueResolver`] is the in-tree
//! reference implementation, resolving dotted paths against a [`Value`] tree
//! with a stack of active loop frames.

use crate::value::Value;
use chrono::{DateTime, TimeZone, Utc};
use miette::{IntoDiagnostic, Result};
use std::fmt::Write as _;
use std::io;

/// The collaborator that supplies substitution values and loop/conditional
/// semantics
///
/// Methods take `&mut self` because loop bookkeeping (`init_loop` /
/// `set_iteration` / `close_loop`) is resolver state. The resolver owns all
/// output encoding: `write_value` may escape, `write_value_raw` must not.
pub trait TokenResolver {
    /// Write the value for a substitution token, applying whatever output
    /// encoding the resolver wants
    fn write_value(&mut self, out: &mut dyn io::Write, name: &str) -> Result<()>;

    /// Write the value without any output encoding (`!RAW`)
    fn write_value_raw(&mut self, out: &mut dyn io::Write, name: &str) -> Result<()>;

    /// Write a date value rendered through `format` (`!DATE`)
    fn write_date(&mut self, out: &mut dyn io::Write, name: &str, format: &str) -> Result<()>;

    /// Register `id` as an active loop over `path`; returns the pass count
    fn init_loop(&mut self, id: &str, path: &str) -> Result<usize>;

    /// Position the loop `id` at pass `pass` (0-based)
    fn set_iteration(&mut self, id: &str, pass: usize) -> Result<()>;

    /// Release the loop identifier `id`
    fn close_loop(&mut self, id: &str) -> Result<()>;

    /// Test a path for the `!IF` command: present, non-empty, non-zero,
    /// non-false for single values; at least one entry for lists
    fn if_value(&mut self, path: &str) -> Result<bool>;

    /// Write a diagnostic listing of currently resolvable names (`!DEBUG`)
    fn debug_dump(&mut self, out: &mut dyn io::Write) -> Result<()>;
}

/// An active loop binding: the resolved items and the current pass
#[derive(Debug, Clone)]
struct LoopFrame {
    id: String,
    items: Vec<Value>,
    index: usize,
}

/// Reference resolver over an in-memory [`Value`] tree
///
/// Dotted paths (`user.name`, `items.0.title`) navigate the tree. Loop
/// frames bind their id to the current element, innermost frame first, so
/// nested loops may shadow. Plain substitution HTML-escapes the rendered
/// value; `!RAW` does not.
pub struct ValueResolver {
    root: Value,
    frames: Vec<LoopFrame>,
}

impl ValueResolver {
    pub fn new(root: impl Into<Value>) -> Self {
        Self {
            root: root.into(),
            frames: Vec::new(),
        }
    }

    /// Resolve a name: loop frames first (innermost wins), then the root tree
    ///
    /// Names are trimmed before lookup; the engine passes token text raw.
    fn resolve(&self, name: &str) -> Option<Value> {
        let name = name.trim();
        let (head, rest) = match name.split_once('.') {
            Some((h, r)) => (h, Some(r)),
            None => (name, None),
        };
        for frame in self.frames.iter().rev() {
            if frame.id == head {
                let element = frame.items.get(frame.index)?;
                return match rest {
                    Some(rest) => element.lookup(rest).cloned(),
                    None => Some(element.clone()),
                };
            }
        }
        self.root.lookup(name).cloned()
    }

    fn resolve_or_fail(&self, name: &str) -> Result<Value> {
        self.resolve(name)
            .ok_or_else(|| miette::miette!("no value for token '{}'", name.trim()))
    }

    fn frame_position(&self, id: &str) -> Result<usize> {
        self.frames
            .iter()
            .rposition(|f| f.id == id)
            .ok_or_else(|| miette::miette!("no active loop with id '{id}'"))
    }
}

impl TokenResolver for ValueResolver {
    fn write_value(&mut self, out: &mut dyn io::Write, name: &str) -> Result<()> {
        let value = self.resolve_or_fail(name)?;
        out.write_all(html_escape(&value.render_to_string()).as_bytes())
            .into_diagnostic()
    }

    fn write_value_raw(&mut self, out: &mut dyn io::Write, name: &str) -> Result<()> {
        let value = self.resolve_or_fail(name)?;
        out.write_all(value.render_to_string().as_bytes())
            .into_diagnostic()
    }

    fn write_date(&mut self, out: &mut dyn io::Write, name: &str, format: &str) -> Result<()> {
        let value = self.resolve_or_fail(name)?;
        let date: DateTime<Utc> = match &value {
            Value::Int(secs) => Utc
                .timestamp_opt(*secs, 0)
                .single()
                .ok_or_else(|| miette::miette!("timestamp {secs} is out of range"))?,
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .map_err(|e| miette::miette!("cannot parse '{s}' as an RFC 3339 date: {e}"))?
                .with_timezone(&Utc),
            other => {
                return Err(miette::miette!(
                    "token '{}' is a {}, expected a timestamp or date string",
                    name.trim(),
                    other.type_name()
                ));
            }
        };
        // Formatting is lazy in chrono; a bad format string surfaces here.
        let mut rendered = String::new();
        write!(rendered, "{}", date.format(format))
            .map_err(|_| miette::miette!("invalid date format '{format}'"))?;
        out.write_all(rendered.as_bytes()).into_diagnostic()
    }

    fn init_loop(&mut self, id: &str, path: &str) -> Result<usize> {
        let items = match self.resolve(path) {
            None | Some(Value::None) => Vec::new(),
            Some(Value::List(items)) => items,
            // A single value loops once, over itself.
            Some(single) => vec![single],
        };
        let count = items.len();
        self.frames.push(LoopFrame {
            id: id.to_string(),
            items,
            index: 0,
        });
        Ok(count)
    }

    fn set_iteration(&mut self, id: &str, pass: usize) -> Result<()> {
        let pos = self.frame_position(id)?;
        self.frames[pos].index = pass;
        Ok(())
    }

    fn close_loop(&mut self, id: &str) -> Result<()> {
        let pos = self.frame_position(id)?;
        self.frames.remove(pos);
        Ok(())
    }

    fn if_value(&mut self, path: &str) -> Result<bool> {
        Ok(self.resolve(path).is_some_and(|v| v.is_truthy()))
    }

    fn debug_dump(&mut self, out: &mut dyn io::Write) -> Result<()> {
        let mut listing = String::from("-- resolvable names --\n");
        match &self.root {
            Value::Dict(dict) => {
                let mut names: Vec<&String> = dict.keys().collect();
                names.sort();
                for name in names {
                    let value = &dict[name];
                    match value {
                        Value::List(l) => {
                            let _ = writeln!(listing, "  {name}: list({})", l.len());
                        }
                        other => {
                            let _ = writeln!(listing, "  {name}: {}", other.type_name());
                        }
                    }
                }
            }
            other => {
                let _ = writeln!(listing, "  (root): {}", other.type_name());
            }
        }
        if !self.frames.is_empty() {
            listing.push_str("-- active loops --\n");
            for frame in &self.frames {
                let _ = writeln!(
                    listing,
                    "  {}: pass {} of {}",
                    frame.id,
                    frame.index + 1,
                    frame.items.len()
                );
            }
        }
        out.write_all(listing.as_bytes()).into_diagnostic()
    }
}

/// HTML escape a string
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
