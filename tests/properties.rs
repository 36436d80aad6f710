//! Property-based tests for the chunk scanner and evaluator
//!
//! These verify invariants that must hold for ANY input, not just crafted
//! examples: the scanner is lossless and total, token-free templates stream
//! through unchanged, and nothing panics on arbitrary input.

use pochoir::{stream_template, Chunk, ChunkKind, Template, TokenResolver};
use proptest::prelude::*;
use std::io;

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: 200,
        ..ProptestConfig::default()
    }
}

// =============================================================================
// Test Helpers
// =============================================================================

/// Re-wrap tokens in their delimiters and concatenate all chunk text
fn reconstruct(chunks: &[Chunk]) -> String {
    let mut out = String::new();
    for chunk in chunks {
        match chunk.kind {
            ChunkKind::Text => out.push_str(&chunk.text),
            ChunkKind::Token => {
                out.push_str("{{");
                out.push_str(&chunk.text);
                out.push_str("}}");
            }
        }
    }
    out
}

/// A resolver that must never be consulted
struct UnreachableResolver;

impl TokenResolver for UnreachableResolver {
    fn write_value(&mut self, _out: &mut dyn io::Write, name: &str) -> miette::Result<()> {
        panic!("write_value called for {name}");
    }
    fn write_value_raw(&mut self, _out: &mut dyn io::Write, _name: &str) -> miette::Result<()> {
        panic!("write_value_raw called");
    }
    fn write_date(&mut self, _o: &mut dyn io::Write, _n: &str, _f: &str) -> miette::Result<()> {
        panic!("write_date called");
    }
    fn init_loop(&mut self, _id: &str, _path: &str) -> miette::Result<usize> {
        panic!("init_loop called");
    }
    fn set_iteration(&mut self, _id: &str, _pass: usize) -> miette::Result<()> {
        panic!("set_iteration called");
    }
    fn close_loop(&mut self, _id: &str) -> miette::Result<()> {
        panic!("close_loop called");
    }
    fn if_value(&mut self, _path: &str) -> miette::Result<bool> {
        panic!("if_value called");
    }
    fn debug_dump(&mut self, _out: &mut dyn io::Write) -> miette::Result<()> {
        panic!("debug_dump called");
    }
}

/// A resolver that answers everything without output, for panic-safety runs
struct QuietResolver;

impl TokenResolver for QuietResolver {
    fn write_value(&mut self, _out: &mut dyn io::Write, _name: &str) -> miette::Result<()> {
        Ok(())
    }
    fn write_value_raw(&mut self, _out: &mut dyn io::Write, _name: &str) -> miette::Result<()> {
        Ok(())
    }
    fn write_date(&mut self, _o: &mut dyn io::Write, _n: &str, _f: &str) -> miette::Result<()> {
        Ok(())
    }
    fn init_loop(&mut self, _id: &str, _path: &str) -> miette::Result<usize> {
        Ok(1)
    }
    fn set_iteration(&mut self, _id: &str, _pass: usize) -> miette::Result<()> {
        Ok(())
    }
    fn close_loop(&mut self, _id: &str) -> miette::Result<()> {
        Ok(())
    }
    fn if_value(&mut self, _path: &str) -> miette::Result<bool> {
        Ok(true)
    }
    fn debug_dump(&mut self, _out: &mut dyn io::Write) -> miette::Result<()> {
        Ok(())
    }
}

// =============================================================================
// Property: Token-Free Round Trip
// =============================================================================

proptest! {
    #![proptest_config(config())]

    /// A template with no "{{" streams through byte for byte, and the
    /// resolver is never consulted.
    #[test]
    fn token_free_templates_stream_unchanged(source in "[^{]*\\{?[^{]*") {
        prop_assume!(!source.contains("{{"));
        let mut out = Vec::new();
        stream_template(&mut out, &source, &mut UnreachableResolver).unwrap();
        prop_assert_eq!(String::from_utf8(out).unwrap(), source);
    }
}

// =============================================================================
// Property: Lossless Scanning
// =============================================================================

proptest! {
    #![proptest_config(config())]

    /// Whenever parsing succeeds, re-wrapping the token chunks reconstructs
    /// the source exactly.
    #[test]
    fn scanner_is_lossless(source in ".{0,300}") {
        if let Ok(template) = Template::parse("prop", source.as_str()) {
            prop_assert_eq!(reconstruct(template.chunks()), source);
        }
    }

    /// Chunk lines are 1-based and non-decreasing in source order.
    #[test]
    fn chunk_lines_are_monotonic(source in "[a-z{}\\n]{0,200}") {
        if let Ok(template) = Template::parse("prop", source.as_str()) {
            let mut last = 1;
            for chunk in template.chunks() {
                prop_assert!(chunk.line >= last);
                last = chunk.line;
            }
        }
    }
}

// =============================================================================
// Property: Never Panics
// =============================================================================

proptest! {
    #![proptest_config(config())]

    /// Parsing arbitrary input never panics; it either yields chunks or a
    /// syntax error.
    #[test]
    fn parse_never_panics(source in ".{0,500}") {
        let _ = Template::parse("prop", source.as_str());
    }

    /// Streaming brace-heavy input through a permissive resolver never
    /// panics, whatever the nesting looks like.
    #[test]
    fn stream_never_panics(source in "[ab{}! ]{0,120}") {
        let mut out = Vec::new();
        let _ = stream_template(&mut out, &source, &mut QuietResolver);
    }
}
