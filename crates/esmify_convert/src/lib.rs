//! Conversion of CommonJS modules to ES module syntax.
//!
//! This crate rewrites top-level `require(...)` calls into `import`
//! declarations, optionally rewrites `module.exports` assignments into
//! `export` declarations, and normalizes the resulting import statements
//! into sorted vendor / same-package / same-directory blocks. Unmodified
//! code is reproduced byte-for-byte.
//!
//! # Examples
//!
//! ## Basic Usage
//!
//! ```no_run
//! use esmify_convert::{Config, run_convert};
//!
//! # fn main() -> anyhow::Result<()> {
//! let cfg = Config {
//!     paths: vec![],
//!     root: Some(std::path::PathBuf::from("/path/to/project")),
//!     entry_glob: Some("src/".to_string()),
//!     exports: true,
//!     write: true,
//!     warn_skipped: false,
//!     shape_overrides: None,
//!     extensions: vec!["js".to_string(), "coffee".to_string()],
//! };
//!
//! let result = run_convert(cfg)?;
//! println!("{} converted, {} failed", result.files_converted, result.files_failed);
//! # Ok(())
//! # }
//! ```

mod classify;
mod collector;
mod config;
mod exports;
mod imports;
mod pipeline;
mod reporter;
mod sort;
mod types;

// Re-export public API
pub use classify::{classify_dependencies, detect_export_shape};
pub use collector::collect_sources;
pub use config::{Config, find_git_root, load_shape_overrides};
pub use exports::rewrite_exports;
pub use imports::rewrite_imports;
pub use pipeline::{run_convert, run_convert_with};
pub use reporter::{print_outcomes, print_summary};
pub use sort::normalize_import_layout;
pub use types::{ConvertResult, FileOutcome, FileStatus};
