use std::path::PathBuf;
use thiserror::Error;

/// Failures the conversion pipeline distinguishes by how far they propagate.
///
/// Classification-phase errors are caught per-dependency and only degrade the
/// resulting import form. Rewrite-phase errors abort the current file's
/// transform and nothing else.
#[derive(Debug, Error)]
pub enum Error {
    /// A require specifier could not be resolved to a file on disk.
    #[error("Unable to resolve '{specifier}' from {}", from.display())]
    Resolution { specifier: String, from: PathBuf },

    /// A destructuring pattern is too complex to convert to an import list.
    #[error("Unsupported object pattern syntax for \"{specifier}\" require")]
    UnsupportedSyntax { specifier: String },

    /// A dependency is not JavaScript and no transpiler covers its extension.
    #[error("Unable to compile {} to JavaScript (no transpiler for .{extension})", path.display())]
    TranspileUnavailable { extension: String, path: PathBuf },
}
