//! Core utilities for the esmify codemod.
//!
//! This crate provides the shared machinery for rewriting CommonJS modules
//! to ES module syntax, including:
//! - Parsing JS sources and matching `require`/`module.exports` patterns
//! - Span-addressed text edits that preserve unmodified source byte-for-byte
//! - Resolving require specifiers (relative paths, node_modules)
//! - Loading dependency source through per-extension transpilers

mod constants;
mod edit;
mod error;
mod parser;
mod resolver;
mod transpile;
mod types;

// Re-export public API
pub use constants::{INDEX_FILES, JS_EXTENSIONS, RESOLVE_EXTENSIONS};
pub use edit::{TextEdit, apply_edits, full_line_span, span_with_semicolon};
pub use error::Error;
pub use parser::{
    collect_requires, exports_assignment, object_as_name_map, parse, require_specifier,
    requires_for, source_type_for,
};
pub use resolver::{resolve, resolve_from_dir};
pub use transpile::{TranspileFn, TranspilerRegistry};
pub use types::{ExportShape, ExportShapeMap};
