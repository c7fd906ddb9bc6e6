use anyhow::Result;
use ignore::WalkBuilder;
use log::{debug, trace};
use std::path::PathBuf;

use esmify_core::JS_EXTENSIONS;

use crate::config::Config;

/// Collect the source files to convert by walking the configured root.
///
/// Only JavaScript sources are candidates; dependencies in other grammars
/// are classified but never rewritten. `node_modules` is always skipped.
pub fn collect_sources(cfg: &Config) -> Result<Vec<PathBuf>> {
    let root = cfg.root.as_deref().expect("root must be resolved before collecting");
    debug!("Walking directory tree from root: {}", root.display());

    let mut files: Vec<PathBuf> = Vec::new();
    let walker = WalkBuilder::new(root).hidden(false).ignore(true).git_ignore(true).build();

    for res in walker {
        let dent = res?;
        let p = dent.path();
        if !p.is_file() {
            continue;
        }

        let path_str = p.to_string_lossy();
        if path_str.contains("/node_modules/") {
            trace!("Skipping vendored file: {}", path_str);
            continue;
        }

        let Some(ext) = p.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if !JS_EXTENSIONS.contains(&ext) {
            continue;
        }

        if let Some(gl) = &cfg.entry_glob {
            if let Ok(rel_path) = p.strip_prefix(root) {
                let rel_str = rel_path.to_string_lossy();
                if rel_str.contains(gl) {
                    trace!("Matched source file with glob '{}': {}", gl, rel_str);
                    files.push(p.to_path_buf());
                }
            }
        } else {
            trace!("Found source file: {}", p.display());
            files.push(p.to_path_buf());
        }
    }

    // Walk order is filesystem-dependent; keep the batch deterministic.
    files.sort();
    debug!("Collected {} source files", files.len());
    Ok(files)
}
