use dashmap::DashMap;
use log::{debug, trace};
use path_clean::clean;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::constants::INDEX_FILES;
use crate::error::Error;

/// Resolve a require specifier relative to the file that contains it.
///
/// Mirrors conventional Node resolution: relative specifiers are joined to
/// the caller's directory and tried as-is, then with each extension in
/// `extensions`, then as a directory index. Bare specifiers walk up the
/// directory tree looking for `node_modules/<pkg>`. Resolution is a pure
/// function of the arguments and the filesystem, so repeated calls with the
/// same `(caller, specifier)` pair are idempotent.
pub fn resolve(
    from_file: &Path,
    specifier: &str,
    extensions: &[String],
    cache: &DashMap<(PathBuf, String), Option<PathBuf>>,
) -> Result<PathBuf, Error> {
    assert!(!from_file.as_os_str().is_empty(), "caller path must be a non-empty string");
    let dir = from_file.parent().unwrap_or_else(|| Path::new("."));
    resolve_from_dir(dir, specifier, extensions, cache)
}

/// Like [`resolve`], but starting from a directory rather than a file.
///
/// Used for configuration-supplied override specifiers, which are resolved
/// relative to the project root rather than any particular module.
pub fn resolve_from_dir(
    dir: &Path,
    specifier: &str,
    extensions: &[String],
    cache: &DashMap<(PathBuf, String), Option<PathBuf>>,
) -> Result<PathBuf, Error> {
    assert!(!specifier.is_empty(), "specifier must be a non-empty string");

    let key = (dir.to_path_buf(), specifier.to_string());
    if let Some(v) = cache.get(&key) {
        trace!("Cache hit for resolve: '{}' from {}", specifier, dir.display());
        return v.clone().ok_or_else(|| Error::Resolution {
            specifier: specifier.to_string(),
            from: dir.to_path_buf(),
        });
    }
    trace!("Resolving: '{}' from {}", specifier, dir.display());

    let resolved = if specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier.starts_with('/')
    {
        let candidate = clean(dir.join(specifier));
        resolve_file(&candidate, extensions)
    } else {
        resolve_node_module_from_dir(dir, specifier, extensions)
    };

    cache.insert(key, resolved.clone());
    match resolved {
        Some(p) => {
            debug!("Resolved '{}' from {} to {}", specifier, dir.display(), p.display());
            Ok(p)
        }
        None => Err(Error::Resolution {
            specifier: specifier.to_string(),
            from: dir.to_path_buf(),
        }),
    }
}

fn resolve_file(p: &Path, extensions: &[String]) -> Option<PathBuf> {
    // Try exact path first
    if p.is_file() {
        return Some(p.canonicalize().unwrap_or_else(|_| p.to_path_buf()));
    }

    // Try adding extensions, in configured order
    for ext in extensions {
        let candidate = PathBuf::from(format!("{}.{}", p.display(), ext));
        if candidate.is_file() {
            return Some(candidate.canonicalize().unwrap_or(candidate));
        }
    }

    // Try index files when the specifier names a directory
    if p.is_dir() {
        for index_file in INDEX_FILES {
            let candidate = p.join(index_file);
            if candidate.is_file() {
                return Some(candidate.canonicalize().unwrap_or(candidate));
            }
        }
    }

    None
}

fn resolve_node_module_from_dir(
    start_dir: &Path,
    pkg: &str,
    extensions: &[String],
) -> Option<PathBuf> {
    trace!("Walking up from {:?} to find node_modules for '{}'", start_dir, pkg);
    let mut current_dir = start_dir;

    loop {
        let result = resolve_node_module(current_dir, pkg, extensions);
        if result.is_some() {
            return result;
        }

        current_dir = current_dir.parent()?;
    }
}

fn resolve_node_module(root: &Path, pkg: &str, extensions: &[String]) -> Option<PathBuf> {
    // Handles scoped packages like @scope/pkg via the join
    let nm = root.join("node_modules").join(pkg);
    if !nm.exists() {
        return None;
    }
    trace!("Checking node_modules at: {:?}", nm);

    let pkg_json = nm.join("package.json");
    if pkg_json.exists()
        && let Ok(txt) = fs::read_to_string(&pkg_json)
        && let Ok(v) = serde_json::from_str::<serde_json::Value>(&txt)
    {
        // Prefer the ESM entry point, then the CJS one
        for field in ["module", "main"] {
            if let Some(s) = v.get(field).and_then(|x| x.as_str()) {
                let p = nm.join(s);
                if let Some(resolved) = resolve_file(&p, extensions) {
                    return Some(resolved);
                }
            }
        }
    }

    // Fallback to common index files
    for index_file in INDEX_FILES {
        let p = nm.join(index_file);
        if p.is_file() {
            return Some(p.canonicalize().unwrap_or(p));
        }
    }

    None
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

    fn exts() -> Vec<String> {
        vec!["js".to_string(), "coffee".to_string()]
    }

    #[test]
    fn test_resolve_exact_relative_path() {
        let temp_dir = TempDir::new().unwrap();
        let dep = create_test_file(temp_dir.path(), "src/util.js", "");
        let caller = create_test_file(temp_dir.path(), "src/main.js", "");
        let cache = DashMap::new();

        let resolved = resolve(&caller, "./util.js", &exts(), &cache).unwrap();
        assert_eq!(resolved, dep.canonicalize().unwrap());
    }

    #[test]
    fn test_resolve_appends_extensions_in_order() {
        let temp_dir = TempDir::new().unwrap();
        // Both a .js and a .coffee candidate exist: .js must win.
        let js = create_test_file(temp_dir.path(), "src/util.js", "");
        create_test_file(temp_dir.path(), "src/util.coffee", "");
        let caller = create_test_file(temp_dir.path(), "src/main.js", "");
        let cache = DashMap::new();

        let resolved = resolve(&caller, "./util", &exts(), &cache).unwrap();
        assert_eq!(resolved, js.canonicalize().unwrap());
    }

    #[test]
    fn test_resolve_coffee_when_no_js() {
        let temp_dir = TempDir::new().unwrap();
        let coffee = create_test_file(temp_dir.path(), "src/util.coffee", "");
        let caller = create_test_file(temp_dir.path(), "src/main.js", "");
        let cache = DashMap::new();

        let resolved = resolve(&caller, "./util", &exts(), &cache).unwrap();
        assert_eq!(resolved, coffee.canonicalize().unwrap());
    }

    #[test]
    fn test_resolve_parent_relative() {
        let temp_dir = TempDir::new().unwrap();
        let dep = create_test_file(temp_dir.path(), "lib/helpers.js", "");
        let caller = create_test_file(temp_dir.path(), "src/main.js", "");
        let cache = DashMap::new();

        let resolved = resolve(&caller, "../lib/helpers", &exts(), &cache).unwrap();
        assert_eq!(resolved, dep.canonicalize().unwrap());
    }

    #[test]
    fn test_resolve_directory_index() {
        let temp_dir = TempDir::new().unwrap();
        let index = create_test_file(temp_dir.path(), "src/widgets/index.js", "");
        let caller = create_test_file(temp_dir.path(), "src/main.js", "");
        let cache = DashMap::new();

        let resolved = resolve(&caller, "./widgets", &exts(), &cache).unwrap();
        assert_eq!(resolved, index.canonicalize().unwrap());
    }

    #[test]
    fn test_resolve_node_module_main_field() {
        let temp_dir = TempDir::new().unwrap();
        let entry = create_test_file(temp_dir.path(), "node_modules/commander/lib/cli.js", "");
        create_test_file(
            temp_dir.path(),
            "node_modules/commander/package.json",
            r#"{ "main": "lib/cli.js" }"#,
        );
        let caller = create_test_file(temp_dir.path(), "src/main.js", "");
        let cache = DashMap::new();

        let resolved = resolve(&caller, "commander", &exts(), &cache).unwrap();
        assert_eq!(resolved, entry.canonicalize().unwrap());
    }

    #[test]
    fn test_resolve_node_module_prefers_module_field() {
        let temp_dir = TempDir::new().unwrap();
        let esm = create_test_file(temp_dir.path(), "node_modules/lib/esm.js", "");
        create_test_file(temp_dir.path(), "node_modules/lib/cjs.js", "");
        create_test_file(
            temp_dir.path(),
            "node_modules/lib/package.json",
            r#"{ "main": "cjs.js", "module": "esm.js" }"#,
        );
        let caller = create_test_file(temp_dir.path(), "src/main.js", "");
        let cache = DashMap::new();

        let resolved = resolve(&caller, "lib", &exts(), &cache).unwrap();
        assert_eq!(resolved, esm.canonicalize().unwrap());
    }

    #[test]
    fn test_resolve_scoped_package_index() {
        let temp_dir = TempDir::new().unwrap();
        let index = create_test_file(temp_dir.path(), "node_modules/@scope/pkg/index.js", "");
        let caller = create_test_file(temp_dir.path(), "src/main.js", "");
        let cache = DashMap::new();

        let resolved = resolve(&caller, "@scope/pkg", &exts(), &cache).unwrap();
        assert_eq!(resolved, index.canonicalize().unwrap());
    }

    #[test]
    fn test_resolve_missing_is_resolution_error() {
        let temp_dir = TempDir::new().unwrap();
        let caller = create_test_file(temp_dir.path(), "src/main.js", "");
        let cache = DashMap::new();

        let err = resolve(&caller, "./does-not-exist", &exts(), &cache).unwrap_err();
        assert!(matches!(err, Error::Resolution { .. }));
    }

    #[test]
    fn test_resolve_is_idempotent_and_cached() {
        let temp_dir = TempDir::new().unwrap();
        create_test_file(temp_dir.path(), "src/util.js", "");
        let caller = create_test_file(temp_dir.path(), "src/main.js", "");
        let cache = DashMap::new();

        let first = resolve(&caller, "./util", &exts(), &cache).unwrap();
        let second = resolve(&caller, "./util", &exts(), &cache).unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_resolve_failure_is_cached_and_still_errors() {
        let temp_dir = TempDir::new().unwrap();
        let caller = create_test_file(temp_dir.path(), "src/main.js", "");
        let cache = DashMap::new();

        assert!(resolve(&caller, "./missing", &exts(), &cache).is_err());
        // Second lookup hits the cached failure and reports the same error.
        assert!(resolve(&caller, "./missing", &exts(), &cache).is_err());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    #[should_panic(expected = "specifier must be a non-empty string")]
    fn test_empty_specifier_is_a_programmer_error() {
        let cache = DashMap::new();
        let _ = resolve(Path::new("/tmp/a.js"), "", &exts(), &cache);
    }
}
