//! Loading module source for classification, transpiling non-JS sources
//! through caller-registered compile functions.

use anyhow::{Context, Result};
use log::trace;
use std::{collections::HashMap, fs, path::Path};

use crate::constants::JS_EXTENSIONS;
use crate::error::Error;

/// A function compiling one non-JS source text to the target grammar.
pub type TranspileFn = Box<dyn Fn(&str) -> Result<String> + Send + Sync>;

/// Per-extension transpile functions supplied by the embedding tool.
///
/// Dependencies whose extension is already JavaScript are read as-is. For
/// anything else a registered transpiler is required; without one,
/// [`load_source`](TranspilerRegistry::load_source) fails with
/// [`Error::TranspileUnavailable`] and the caller falls back to a
/// conservative default-export classification.
#[derive(Default)]
pub struct TranspilerRegistry {
    transpilers: HashMap<String, TranspileFn>,
}

impl TranspilerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transpiler for an extension (without the leading dot).
    pub fn register<F>(&mut self, extension: &str, f: F)
    where
        F: Fn(&str) -> Result<String> + Send + Sync + 'static,
    {
        self.transpilers.insert(extension.to_string(), Box::new(f));
    }

    pub fn has(&self, extension: &str) -> bool {
        self.transpilers.contains_key(extension)
    }

    /// Return JavaScript source for a module, reading it directly if it is
    /// already JavaScript and transpiling it otherwise.
    pub fn load_source(&self, path: &Path) -> Result<String> {
        let code = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if JS_EXTENSIONS.contains(&ext) {
            return Ok(code);
        }

        match self.transpilers.get(ext) {
            Some(f) => {
                trace!("Transpiling {} via .{} transpiler", path.display(), ext);
                f(&code).with_context(|| format!("Failed to transpile {}", path.display()))
            }
            None => Err(Error::TranspileUnavailable {
                extension: ext.to_string(),
                path: path.to_path_buf(),
            }
            .into()),
        }
    }
}
