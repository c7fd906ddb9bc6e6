//! Export shape analysis for the modules a source file depends on.
//!
//! Import rewriting needs to know whether `var foo = require('x')` should
//! become a default or a namespace import, so every discovered dependency is
//! classified before any import is rewritten.

use dashmap::DashMap;
use log::{debug, warn};
use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_span::SourceType;
use rayon::prelude::*;
use std::{collections::HashSet, path::PathBuf};

use esmify_core::{
    ExportShape, ExportShapeMap, TranspilerRegistry, exports_assignment, object_as_name_map,
    parse, source_type_for,
};

/// Decide how a module's public surface should be imported.
///
/// An ES `export default` anywhere in the file forces [`ExportShape::Default`].
/// Otherwise the first top-level `module.exports`/`exports` assignment is
/// inspected: an object literal mapping names to plain local identifiers is a
/// named-export set, anything else is treated as a single opaque value. Later
/// assignments to the same target are not merged.
pub fn detect_export_shape(source: &str, source_type: SourceType) -> ExportShape {
    let allocator = Allocator::default();
    let program = parse(&allocator, source, source_type);

    if program.body.iter().any(|s| matches!(s, Statement::ExportDefaultDeclaration(_))) {
        return ExportShape::Default;
    }

    for stmt in &program.body {
        let Some(assign) = exports_assignment(stmt) else {
            continue;
        };
        if let Expression::ObjectExpression(obj) = &assign.right
            && let Some(pairs) = object_as_name_map(obj)
        {
            return ExportShape::Named(pairs);
        }
        // Anything other than a simple identifier map is opaque.
        return ExportShape::Default;
    }

    ExportShape::Default
}

/// Classify every dependency in `deps`, in parallel.
///
/// Per-dependency failures (unreadable file, missing transpiler) are logged
/// and fall back to a conservative [`ExportShape::Default`]; they never abort
/// the run. The returned map is complete: every path in `deps` has an entry.
pub fn classify_dependencies(
    deps: &HashSet<PathBuf>,
    registry: &TranspilerRegistry,
) -> ExportShapeMap {
    debug!("Classifying {} dependencies on {} threads", deps.len(), rayon::current_num_threads());

    let shapes: DashMap<PathBuf, ExportShape> = DashMap::new();
    deps.par_iter().for_each(|dep| {
        let shape = match registry.load_source(dep) {
            Ok(code) => detect_export_shape(&code, source_type_for(dep)),
            Err(e) => {
                warn!("Could not classify {}: {}", dep.display(), e);
                ExportShape::Default
            }
        };
        shapes.insert(dep.clone(), shape);
    });

    shapes.into_iter().collect()
}
