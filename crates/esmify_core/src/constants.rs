//! Extension lists used when resolving and loading modules.

/// Extensions tried, in order, when a require specifier does not name an
/// existing file directly.
pub const RESOLVE_EXTENSIONS: &[&str] = &["js", "coffee"];

/// Index file names tried when a specifier resolves to a directory.
pub const INDEX_FILES: &[&str] = &["index.js"];

/// Extensions that are already in the target grammar and need no transpile
/// step before classification.
pub const JS_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_extensions_order() {
        // The search order matters: plain JS wins over transpiled sources.
        assert_eq!(RESOLVE_EXTENSIONS, &["js", "coffee"]);
    }

    #[test]
    fn test_js_extensions_are_not_transpiled() {
        assert!(JS_EXTENSIONS.contains(&"js"));
        assert!(JS_EXTENSIONS.contains(&"cjs"));
        assert!(!JS_EXTENSIONS.contains(&"coffee"));
    }
}
