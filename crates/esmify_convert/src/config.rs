use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::{debug, trace};
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    env, fs,
    path::{Path, PathBuf},
};

use esmify_core::{ExportShape, RESOLVE_EXTENSIONS};

#[derive(Debug, Clone, Parser)]
#[command(name = "convert")]
#[command(about = "Convert CommonJS require/module.exports to ES module syntax")]
pub struct Config {
    /// Source files to convert (defaults to walking the root)
    pub paths: Vec<PathBuf>,

    /// Root directory of the project (defaults to git root)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Substring filter applied to source paths found under the root
    #[arg(long)]
    pub entry_glob: Option<String>,

    /// Also convert module.exports assignments to export declarations
    #[arg(long)]
    pub exports: bool,

    /// Write converted output back to the source files instead of stdout
    #[arg(long)]
    pub write: bool,

    /// Log require() calls that look convertible but were left untouched
    #[arg(long)]
    pub warn_skipped: bool,

    /// JSON file mapping specifiers to an export shape override
    #[arg(long)]
    pub shape_overrides: Option<PathBuf>,

    /// Extensions tried, in order, when resolving a specifier
    #[arg(long, value_delimiter = ',', default_values_t = default_extensions())]
    pub extensions: Vec<String>,
}

fn default_extensions() -> Vec<String> {
    RESOLVE_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}

pub fn find_git_root() -> Result<PathBuf> {
    debug!("Searching for git root");
    let mut current_dir = env::current_dir()?;
    trace!("Starting search from: {:?}", current_dir);

    loop {
        let git_dir = current_dir.join(".git");
        trace!("Checking for .git at: {:?}", git_dir);
        if git_dir.exists() {
            debug!("Found git root at: {:?}", current_dir);
            return Ok(current_dir);
        }

        match current_dir.parent() {
            Some(parent) => current_dir = parent.to_path_buf(),
            None => {
                return Err(anyhow!("Could not find .git directory in any parent folder"));
            }
        }
    }
}

/// One override value as written in the JSON file: either a boolean
/// ("has a default export") or a `"default"`/`"named"` tag.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ShapeOverride {
    HasDefault(bool),
    Tag(String),
}

/// Load configuration-supplied export shape overrides.
///
/// The file is a JSON object mapping specifiers to override values.
/// Overrides always win over computed classification; the pipeline resolves
/// each specifier relative to the project root before applying it.
pub fn load_shape_overrides(path: &Path) -> Result<Vec<(String, ExportShape)>> {
    debug!("Loading export shape overrides from {}", path.display());
    let txt = fs::read_to_string(path)
        .with_context(|| format!("Failed to read overrides file {}", path.display()))?;
    // BTreeMap keeps the application order deterministic.
    let raw: BTreeMap<String, ShapeOverride> = serde_json::from_str(&txt)
        .with_context(|| format!("Invalid overrides file {}", path.display()))?;

    let mut overrides = Vec::with_capacity(raw.len());
    for (specifier, value) in raw {
        let shape = match value {
            ShapeOverride::HasDefault(true) => ExportShape::Default,
            ShapeOverride::HasDefault(false) => ExportShape::Named(vec![]),
            ShapeOverride::Tag(tag) => match tag.as_str() {
                "default" => ExportShape::Default,
                "named" => ExportShape::Named(vec![]),
                other => {
                    return Err(anyhow!(
                        "Invalid override '{}' for '{}': expected true/false or \"default\"/\"named\"",
                        other,
                        specifier
                    ));
                }
            },
        };
        trace!("Override: '{}' -> {:?}", specifier, shape);
        overrides.push((specifier, shape));
    }
    Ok(overrides)
}
