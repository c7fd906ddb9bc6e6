//! Line-based grouping and sorting of import statements.
//!
//! This is the one pass that deliberately works on printed text rather than
//! a syntax tree: it runs after the rewriters, when the import block layout
//! needs cleanup that span-preserving edits do not perform themselves.
//! Within each contiguous run of import (and blank) lines, imports are
//! bucketed as vendor / same-package / same-directory, each bucket sorted
//! lexicographically by specifier, with exactly one blank line between
//! non-empty buckets. All other lines are left untouched.

use log::trace;
use regex::Regex;
use std::sync::LazyLock;

static BLANK_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*$").unwrap());
static IMPORT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*import .* from ['"](.*)['"];?"#).unwrap());
// Runs of zero or more blank lines, then an import line, then any mix of
// blank/import lines, over the one-letter-per-line classification string.
static IMPORT_GROUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"B*I[BI]*").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Vendor,
    SamePackage,
    SameDir,
}

fn category(specifier: &str) -> Category {
    if specifier.starts_with("./") {
        Category::SameDir
    } else if specifier.starts_with("../") {
        Category::SamePackage
    } else {
        Category::Vendor
    }
}

/// Extract the module specifier from an ES `import` statement line.
fn import_specifier(line: &str) -> Option<&str> {
    IMPORT_LINE.captures(line).map(|c| c.get(1).unwrap().as_str())
}

/// Sort one run of import lines into vendor / same-package / same-directory
/// sections, dropping intra-run blank lines and separating non-empty
/// sections with exactly one blank line.
fn sort_and_group(lines: &[&str]) -> Vec<String> {
    let mut vendor: Vec<&str> = Vec::new();
    let mut same_package: Vec<&str> = Vec::new();
    let mut same_dir: Vec<&str> = Vec::new();

    for line in lines {
        let Some(specifier) = import_specifier(line) else {
            // Skip blank lines.
            continue;
        };
        match category(specifier) {
            Category::Vendor => vendor.push(line),
            Category::SamePackage => same_package.push(line),
            Category::SameDir => same_dir.push(line),
        }
    }

    let mut sorted: Vec<String> = Vec::new();
    for bucket in [&mut vendor, &mut same_package, &mut same_dir] {
        // Stable sort: duplicate specifiers keep their relative order.
        bucket.sort_by_key(|line| import_specifier(line).unwrap_or("").to_string());
        if !bucket.is_empty() {
            if !sorted.is_empty() {
                sorted.push(String::new());
            }
            sorted.extend(bucket.iter().map(|l| l.to_string()));
        }
    }
    sorted
}

/// Normalize the layout of every contiguous import block in `source`.
///
/// Non-import lines are preserved verbatim in their original relative order;
/// only contiguous blank+import runs are rewritten. Total non-blank line
/// count is preserved and no specifier is altered or deduplicated.
pub fn normalize_import_layout(source: &str) -> String {
    let had_final_newline = source.ends_with('\n');
    let lines: Vec<&str> = source.split('\n').collect();

    // One classification letter per line, so the run regex's byte offsets
    // are line indices.
    let line_types: String = lines
        .iter()
        .map(|line| {
            if BLANK_LINE.is_match(line) {
                'B'
            } else if IMPORT_LINE.is_match(line) {
                'I'
            } else {
                'O'
            }
        })
        .collect();

    let groups: Vec<(usize, usize)> =
        IMPORT_GROUP.find_iter(&line_types).map(|m| (m.start(), m.end() - 1)).collect();
    if groups.is_empty() {
        return source.to_string();
    }
    trace!("Found {} import groups", groups.len());

    let mut output: Vec<String> = Vec::new();
    let mut prev_end: Option<usize> = None;

    for &(start, end) in &groups {
        match prev_end {
            Some(prev) => {
                // Non-import lines between two groups, padded with one blank
                // line on each side.
                output.push(String::new());
                output.extend(lines[prev + 1..start].iter().map(|l| l.to_string()));
                output.push(String::new());
            }
            None if start > 0 => {
                // Lines before the first group are preserved as-is.
                output.extend(lines[..start].iter().map(|l| l.to_string()));
                output.push(String::new());
            }
            None => {}
        }
        output.extend(sort_and_group(&lines[start..=end]));
        prev_end = Some(end);
    }

    // Non-import lines after the final group.
    let prev = prev_end.unwrap();
    if prev + 1 < lines.len() {
        output.push(String::new());
        output.extend(lines[prev + 1..].iter().map(|l| l.to_string()));
    }

    let mut result = output.join("\n");
    // A group at the very bottom swallows the final newline; put it back
    // without inventing a blank boundary line.
    if had_final_newline && !result.ends_with('\n') {
        result.push('\n');
    }
    result
}
