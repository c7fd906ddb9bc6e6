//! Span-addressed text edits.
//!
//! The rewriters never print a whole syntax tree. They record replacements
//! keyed by the original source span of each modified statement and splice
//! them into the source text, so every unmodified region is reproduced
//! byte-for-byte.

use log::warn;
use oxc_span::Span;

/// A single replacement of the byte range `start..end` in the original text.
#[derive(Debug, Clone)]
pub struct TextEdit {
    pub start: u32,
    pub end: u32,
    pub replacement: String,
}

impl TextEdit {
    pub fn replace(span: Span, replacement: String) -> Self {
        TextEdit { start: span.start, end: span.end, replacement }
    }

    pub fn insert(offset: u32, text: impl Into<String>) -> Self {
        TextEdit { start: offset, end: offset, replacement: text.into() }
    }

    pub fn delete(span: Span) -> Self {
        TextEdit { start: span.start, end: span.end, replacement: String::new() }
    }
}

/// Apply a batch of edits to `source`, returning the rewritten text.
///
/// Edits are applied in span order. Overlapping edits indicate a rewriter
/// bug; the later edit is dropped with a warning rather than producing
/// corrupted output.
pub fn apply_edits(source: &str, mut edits: Vec<TextEdit>) -> String {
    edits.sort_by_key(|e| (e.start, e.end));

    let mut out = String::with_capacity(source.len());
    let mut cursor = 0usize;
    for edit in &edits {
        let (start, end) = (edit.start as usize, edit.end as usize);
        if start < cursor {
            warn!("Dropping overlapping edit at {}..{}", start, end);
            continue;
        }
        out.push_str(&source[cursor..start]);
        out.push_str(&edit.replacement);
        cursor = end;
    }
    out.push_str(&source[cursor..]);
    out
}

/// Extend a statement span past an immediately following semicolon, so a
/// replacement swallows the old statement terminator along with the
/// statement. A no-op when the parser already included it in the span.
pub fn span_with_semicolon(source: &str, span: Span) -> Span {
    let mut end = span.end as usize;
    if source[end..].starts_with(';') {
        end += 1;
    }
    Span::new(span.start, end as u32)
}

/// Expand a statement span to the full line(s) it occupies, including the
/// trailing newline, so deleting the statement leaves no blank husk behind.
pub fn full_line_span(source: &str, span: Span) -> Span {
    let span = span_with_semicolon(source, span);
    let start = source[..span.start as usize].rfind('\n').map_or(0, |i| i + 1);
    // Only eat back to the line start if nothing but whitespace precedes the
    // statement on its line.
    let start = if source[start..span.start as usize].chars().all(|c| c.is_whitespace()) {
        start
    } else {
        span.start as usize
    };
    let mut end = span.end as usize;
    while end < source.len() && source[end..].starts_with([' ', '\t']) {
        end += 1;
    }
    if source[end..].starts_with("\r\n") {
        end += 2;
    } else if source[end..].starts_with('\n') {
        end += 1;
    }
    Span::new(start as u32, end as u32)
}
