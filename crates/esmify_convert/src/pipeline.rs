//! The batch conversion pipeline.
//!
//! Ordering is a hard precondition, not an optimization: rewriting imports
//! for file A may depend on the classification of file B, so every
//! dependency is classified (and overrides applied) before any import is
//! rewritten.

use anyhow::{Context, Result, anyhow};
use dashmap::DashMap;
use log::{debug, info, warn};
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use esmify_core::{
    ExportShapeMap, TranspilerRegistry, requires_for, resolve, resolve_from_dir, source_type_for,
};

use crate::{
    classify::classify_dependencies,
    collector::collect_sources,
    config::{Config, find_git_root, load_shape_overrides},
    exports::rewrite_exports,
    imports::rewrite_imports,
    sort::normalize_import_layout,
    types::{ConvertResult, FileOutcome, FileStatus},
};

/// Run a conversion batch with no transpilers registered.
pub fn run_convert(cfg: Config) -> Result<ConvertResult> {
    run_convert_with(cfg, &TranspilerRegistry::new())
}

/// Run a conversion batch, loading non-JS dependencies through `registry`.
pub fn run_convert_with(mut cfg: Config, registry: &TranspilerRegistry) -> Result<ConvertResult> {
    info!("Starting CommonJS to ES module conversion");

    let root = if let Some(r) = cfg.root.take() {
        debug!("Using provided root directory: {:?}", r);
        r.canonicalize().unwrap_or(r)
    } else {
        debug!("No root provided, searching for git root");
        find_git_root()?
    };
    info!("Using root directory: {}", root.display());
    cfg.root = Some(root.clone());

    let sources: Vec<PathBuf> = if cfg.paths.is_empty() {
        collect_sources(&cfg)?
    } else {
        cfg.paths.iter().map(|p| p.canonicalize().unwrap_or_else(|_| p.clone())).collect()
    };
    if sources.is_empty() {
        return Err(anyhow!("No source files found under {}", root.display()));
    }
    info!("Found {} source files", sources.len());

    let requires_cache: DashMap<PathBuf, Vec<String>> = DashMap::new();
    let resolve_cache: DashMap<(PathBuf, String), Option<PathBuf>> = DashMap::new();

    // Step 1: find the modules required by the files we are converting.
    let mut deps: HashSet<PathBuf> = HashSet::new();
    for src in &sources {
        let specs = match requires_for(src, &requires_cache) {
            Ok(s) => s,
            Err(e) => {
                warn!("Could not scan {}: {}", src.display(), e);
                continue;
            }
        };
        for spec in specs {
            match resolve(src, &spec, &cfg.extensions, &resolve_cache) {
                Ok(p) => {
                    deps.insert(p);
                }
                Err(e) => warn!("{}", e),
            }
        }
    }
    info!("Discovered {} unique dependencies", deps.len());

    // Step 2: classify the exports of every dependency. This must complete
    // before any import rewrite begins.
    let mut shapes = classify_dependencies(&deps, registry);

    // Step 3: configuration-supplied overrides win over computed shapes.
    if let Some(path) = &cfg.shape_overrides {
        for (specifier, shape) in load_shape_overrides(path)? {
            match resolve_from_dir(&root, &specifier, &cfg.extensions, &resolve_cache) {
                Ok(p) => {
                    debug!("Overriding shape of '{}' ({})", specifier, p.display());
                    shapes.insert(p, shape);
                }
                Err(e) => warn!("Could not resolve override '{}': {}", specifier, e),
            }
        }
    }

    // Step 4: rewrite each source file. Per-file failures are recorded and
    // the batch carries on; output is only produced when the whole per-file
    // pipeline succeeded, so there is never a partial write.
    let mut outcomes: Vec<FileOutcome> = Vec::new();
    let (mut converted, mut unchanged, mut failed) = (0usize, 0usize, 0usize);

    for src in &sources {
        match convert_file(src, &cfg, &shapes, &resolve_cache) {
            Ok(Some(text)) => {
                converted += 1;
                if cfg.write {
                    match fs::write(src, &text) {
                        Ok(()) => {
                            debug!("Wrote {}", src.display());
                            outcomes.push(FileOutcome {
                                path: src.clone(),
                                status: FileStatus::Converted,
                                output: None,
                            });
                        }
                        Err(e) => {
                            warn!("Failed to write {}: {}", src.display(), e);
                            converted -= 1;
                            failed += 1;
                            outcomes.push(FileOutcome {
                                path: src.clone(),
                                status: FileStatus::Failed(e.to_string()),
                                output: None,
                            });
                        }
                    }
                } else {
                    outcomes.push(FileOutcome {
                        path: src.clone(),
                        status: FileStatus::Converted,
                        output: Some(text),
                    });
                }
            }
            Ok(None) => {
                unchanged += 1;
                outcomes.push(FileOutcome {
                    path: src.clone(),
                    status: FileStatus::Unchanged,
                    output: None,
                });
            }
            Err(e) => {
                warn!("Failed to convert {}: {:#}", src.display(), e);
                failed += 1;
                outcomes.push(FileOutcome {
                    path: src.clone(),
                    status: FileStatus::Failed(format!("{:#}", e)),
                    output: None,
                });
            }
        }
    }

    info!("Conversion complete: {} converted, {} unchanged, {} failed", converted, unchanged, failed);
    Ok(ConvertResult {
        outcomes,
        files_converted: converted,
        files_unchanged: unchanged,
        files_failed: failed,
    })
}

/// Run the whole per-file pipeline, returning the transformed text or
/// `None` when nothing changed.
fn convert_file(
    path: &Path,
    cfg: &Config,
    shapes: &ExportShapeMap,
    resolve_cache: &DashMap<(PathBuf, String), Option<PathBuf>>,
) -> Result<Option<String>> {
    let source =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let rewritten = rewrite_imports(
        &source,
        path,
        shapes,
        &cfg.extensions,
        resolve_cache,
        cfg.warn_skipped,
    )?;
    let rewritten =
        if cfg.exports { rewrite_exports(&rewritten, source_type_for(path)) } else { rewritten };
    let rewritten = normalize_import_layout(&rewritten);

    if rewritten == source { Ok(None) } else { Ok(Some(rewritten)) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, path: &str, content: &str) -> PathBuf {
        let file_path = dir.join(path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&file_path, content).expect("Failed to write test file");
        file_path
    }

    fn config_for(root: &Path) -> Config {
        Config {
            paths: vec![],
            root: Some(root.to_path_buf()),
            entry_glob: None,
            exports: false,
            write: false,
            warn_skipped: false,
            shape_overrides: None,
            extensions: vec!["js".to_string(), "coffee".to_string()],
        }
    }

    #[test]
    fn test_end_to_end_write_back() {
        let temp_dir = TempDir::new().unwrap();
        create_test_file(
            temp_dir.path(),
            "src/named.js",
            "var foo = 1;\nmodule.exports = { foo };\n",
        );
        create_test_file(
            temp_dir.path(),
            "src/single.js",
            "module.exports = function() {};\n",
        );
        let main = create_test_file(
            temp_dir.path(),
            "src/main.js",
            "var single = require('./single');\nvar named = require('./named');\n",
        );

        let mut cfg = config_for(temp_dir.path());
        cfg.write = true;
        let result = run_convert(cfg).unwrap();

        assert_eq!(result.files_failed, 0);
        assert!(result.files_converted >= 1);

        let converted = fs::read_to_string(&main).unwrap();
        // Same-directory imports, sorted by specifier.
        assert_eq!(
            converted,
            "import * as named from './named';\nimport single from './single';\n"
        );
    }

    #[test]
    fn test_stdout_mode_carries_output_and_leaves_files() {
        let temp_dir = TempDir::new().unwrap();
        create_test_file(temp_dir.path(), "src/dep.js", "module.exports = function() {};\n");
        let src = "var dep = require('./dep');\n";
        let main = create_test_file(temp_dir.path(), "src/main.js", src);

        let result = run_convert(config_for(temp_dir.path())).unwrap();

        let outcome = result
            .outcomes
            .iter()
            .find(|o| o.path.file_name().unwrap() == "main.js")
            .unwrap();
        assert_eq!(outcome.status, FileStatus::Converted);
        assert_eq!(outcome.output.as_deref(), Some("import dep from './dep';\n"));
        // Source untouched without --write.
        assert_eq!(fs::read_to_string(&main).unwrap(), src);
    }

    #[test]
    fn test_per_file_failure_does_not_abort_batch() {
        let temp_dir = TempDir::new().unwrap();
        create_test_file(temp_dir.path(), "src/dep.js", "module.exports = 1;\n");
        // Unresolvable require: this file fails.
        create_test_file(temp_dir.path(), "src/broken.js", "var x = require('./missing');\n");
        let ok = create_test_file(temp_dir.path(), "src/ok.js", "var dep = require('./dep');\n");

        let mut cfg = config_for(temp_dir.path());
        cfg.write = true;
        let result = run_convert(cfg).unwrap();

        assert_eq!(result.files_failed, 1);
        assert_eq!(result.files_converted, 1);
        assert_eq!(fs::read_to_string(&ok).unwrap(), "import dep from './dep';\n");
    }

    #[test]
    fn test_failed_file_is_never_partially_written() {
        let temp_dir = TempDir::new().unwrap();
        create_test_file(temp_dir.path(), "src/dep.js", "module.exports = 1;\n");
        // First require converts, second one fails to resolve; the whole
        // file must be left as it was.
        let src = "var dep = require('./dep');\nvar x = require('./missing');\n";
        let broken = create_test_file(temp_dir.path(), "src/broken.js", src);

        let mut cfg = config_for(temp_dir.path());
        cfg.write = true;
        let result = run_convert(cfg).unwrap();

        assert_eq!(result.files_failed, 1);
        assert_eq!(fs::read_to_string(&broken).unwrap(), src);
    }

    #[test]
    fn test_unchanged_files_are_counted() {
        let temp_dir = TempDir::new().unwrap();
        create_test_file(temp_dir.path(), "src/plain.js", "var a = 1;\n");

        let result = run_convert(config_for(temp_dir.path())).unwrap();
        assert_eq!(result.files_unchanged, 1);
        assert_eq!(result.files_converted, 0);
    }

    #[test]
    fn test_overrides_beat_computed_classification() {
        let temp_dir = TempDir::new().unwrap();
        // Structurally a named-export module...
        create_test_file(
            temp_dir.path(),
            "src/lib.js",
            "var foo = 1;\nmodule.exports = { foo };\n",
        );
        let main =
            create_test_file(temp_dir.path(), "src/main.js", "var lib = require('./lib');\n");
        let overrides =
            create_test_file(temp_dir.path(), "overrides.json", r#"{ "./src/lib.js": true }"#);

        let mut cfg = config_for(temp_dir.path());
        cfg.write = true;
        cfg.shape_overrides = Some(overrides);
        let result = run_convert(cfg).unwrap();

        assert_eq!(result.files_failed, 0);
        // ...but the override says it has a default export.
        assert_eq!(fs::read_to_string(&main).unwrap(), "import lib from './lib';\n");
    }

    #[test]
    fn test_exports_flag_converts_exports_too() {
        let temp_dir = TempDir::new().unwrap();
        let lib = create_test_file(
            temp_dir.path(),
            "src/lib.js",
            "function foo() {}\nmodule.exports = { foo };\n",
        );

        let mut cfg = config_for(temp_dir.path());
        cfg.write = true;
        cfg.exports = true;
        let result = run_convert(cfg).unwrap();

        assert_eq!(result.files_failed, 0);
        assert_eq!(fs::read_to_string(&lib).unwrap(), "export function foo() {}\n");
    }

    #[test]
    fn test_explicit_paths_limit_the_batch() {
        let temp_dir = TempDir::new().unwrap();
        create_test_file(temp_dir.path(), "src/dep.js", "module.exports = 1;\n");
        let a = create_test_file(temp_dir.path(), "src/a.js", "var dep = require('./dep');\n");
        let b = create_test_file(temp_dir.path(), "src/b.js", "var dep = require('./dep');\n");

        let mut cfg = config_for(temp_dir.path());
        cfg.write = true;
        cfg.paths = vec![a.clone()];
        let result = run_convert(cfg).unwrap();

        assert_eq!(result.files_converted, 1);
        assert_eq!(fs::read_to_string(&a).unwrap(), "import dep from './dep';\n");
        assert_eq!(fs::read_to_string(&b).unwrap(), "var dep = require('./dep');\n");
    }

    #[test]
    fn test_converted_output_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        create_test_file(temp_dir.path(), "src/dep.js", "module.exports = 1;\n");
        create_test_file(
            temp_dir.path(),
            "src/main.js",
            "var b = require('./dep');\nrequire('./dep');\n",
        );

        let mut cfg = config_for(temp_dir.path());
        cfg.write = true;
        let result = run_convert(cfg.clone()).unwrap();
        assert_eq!(result.files_failed, 0);

        // A second run finds nothing left to convert.
        let again = run_convert(cfg).unwrap();
        assert_eq!(again.files_converted, 0);
        assert_eq!(again.files_failed, 0);
    }
}
