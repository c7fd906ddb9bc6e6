use std::{collections::HashMap, path::PathBuf};

/// The public surface of a module, as seen by code importing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportShape {
    /// The module exports a single opaque value (`import foo from '...'`).
    Default,
    /// The module exports a fixed set of `(exported name, local binding)`
    /// pairs, each independently importable (`import * as foo from '...'`).
    Named(Vec<(String, String)>),
}

impl ExportShape {
    pub fn is_default(&self) -> bool {
        matches!(self, ExportShape::Default)
    }
}

/// Export shape per absolute dependency path. Built once per run, before any
/// import is rewritten, and only read afterwards.
pub type ExportShapeMap = HashMap<PathBuf, ExportShape>;
