//! Rewriting of top-level `require(...)` call forms into `import`
//! declarations.
//!
//! Exactly three statement shapes are recognized, mirroring what a codebase
//! written in conventional CommonJS actually contains:
//!
//! a) `require('foo');` (or `ident = require('foo');`)
//! b) `var foo = require('foo');`
//! c) `var { foo } = require('foo');`
//!
//! Anything else (conditional requires, requires inside function bodies,
//! non-literal arguments) is left completely untouched. Replacement happens
//! at the original statement's span, so surrounding code, comments and
//! position are all preserved; the grouping pass runs afterwards to
//! normalize ordering.

use anyhow::Result;
use dashmap::DashMap;
use log::warn;
use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_syntax::operator::AssignmentOperator;
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use esmify_core::{
    Error, ExportShape, ExportShapeMap, TextEdit, apply_edits, collect_requires, parse,
    require_specifier, resolve, source_type_for, span_with_semicolon,
};

/// Convert top-level CommonJS requires in `source` to ES import declarations.
///
/// `shapes` must already cover every dependency the file requires at top
/// level; a resolved path missing from the map is imported as a namespace.
/// Fails with [`Error::Resolution`] when a converted require's specifier
/// cannot be resolved, and with [`Error::UnsupportedSyntax`] when a
/// destructuring pattern is too complex to express as an import list. Either
/// aborts this file's rewrite only.
pub fn rewrite_imports(
    source: &str,
    module_path: &Path,
    shapes: &ExportShapeMap,
    extensions: &[String],
    resolve_cache: &DashMap<(PathBuf, String), Option<PathBuf>>,
    warn_skipped: bool,
) -> Result<String> {
    let allocator = Allocator::default();
    let program = parse(&allocator, source, source_type_for(module_path));

    let mut edits: Vec<TextEdit> = Vec::new();
    for stmt in &program.body {
        match stmt {
            Statement::ExpressionStatement(es) => {
                if let Some(lit) = side_effect_require(&es.expression) {
                    // The identifier binding, if any, is dropped.
                    let span = span_with_semicolon(source, es.span);
                    edits.push(TextEdit::replace(span, format!("import '{}';", lit.value)));
                } else if warn_skipped {
                    log_skipped(&es.expression, module_path);
                }
            }
            Statement::VariableDeclaration(vd) => {
                if let Some(edit) = rewrite_declaration(
                    source,
                    vd,
                    module_path,
                    shapes,
                    extensions,
                    resolve_cache,
                )? {
                    edits.push(edit);
                } else if warn_skipped {
                    for decl in &vd.declarations {
                        if let Some(init) = &decl.init {
                            log_skipped(init, module_path);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    Ok(apply_edits(source, edits))
}

/// Match `require('x')` or `ident = require('x')` as a bare expression.
fn side_effect_require<'a, 'b>(expr: &'b Expression<'a>) -> Option<&'b StringLiteral<'a>> {
    match expr {
        Expression::CallExpression(ce) => require_specifier(ce),
        Expression::AssignmentExpression(ae)
            if ae.operator == AssignmentOperator::Assign
                && matches!(&ae.left, AssignmentTarget::AssignmentTargetIdentifier(_)) =>
        {
            match &ae.right {
                Expression::CallExpression(ce) => require_specifier(ce),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Rewrite a `var/let/const ... = require('x')` declaration, returning the
/// replacement edit or `None` if the declaration is not a convertible form.
fn rewrite_declaration(
    source: &str,
    vd: &VariableDeclaration<'_>,
    module_path: &Path,
    shapes: &ExportShapeMap,
    extensions: &[String],
    resolve_cache: &DashMap<(PathBuf, String), Option<PathBuf>>,
) -> Result<Option<TextEdit>> {
    // Multi-declarator statements are left untouched rather than partially
    // rewritten.
    if vd.declarations.len() != 1 {
        return Ok(None);
    }
    let decl = &vd.declarations[0];
    let Some(Expression::CallExpression(ce)) = &decl.init else {
        return Ok(None);
    };
    let Some(lit) = require_specifier(ce) else {
        return Ok(None);
    };
    let specifier = lit.value.as_str();

    let bindings = match &decl.id.kind {
        BindingPatternKind::BindingIdentifier(ident) => {
            // The statement shape depends on the dependency's export shape,
            // so the specifier must resolve.
            let resolved = resolve(module_path, specifier, extensions, resolve_cache)?;
            if matches!(shapes.get(&resolved), Some(ExportShape::Default)) {
                ident.name.to_string()
            } else {
                format!("* as {}", ident.name)
            }
        }
        BindingPatternKind::ObjectPattern(pattern) => named_bindings(pattern, specifier)?,
        // Array patterns and such are never requires we can convert.
        _ => return Ok(None),
    };

    let span = span_with_semicolon(source, vd.span);
    Ok(Some(TextEdit::replace(span, format!("import {} from '{}';", bindings, specifier))))
}

/// Render the binding list for a destructured require.
///
/// A key literally named `default` becomes the default binding. Every
/// pattern element must be a plain identifier-to-identifier mapping.
fn named_bindings(pattern: &ObjectPattern<'_>, specifier: &str) -> Result<String> {
    let unsupported = || -> anyhow::Error {
        Error::UnsupportedSyntax { specifier: specifier.to_string() }.into()
    };

    if pattern.rest.is_some() {
        return Err(unsupported());
    }

    let mut default_binding: Option<String> = None;
    let mut named: Vec<(String, String)> = Vec::new();
    let mut locals: HashSet<String> = HashSet::new();

    for prop in &pattern.properties {
        if prop.computed {
            return Err(unsupported());
        }
        let PropertyKey::StaticIdentifier(key) = &prop.key else {
            return Err(unsupported());
        };
        let BindingPatternKind::BindingIdentifier(local) = &prop.value.kind else {
            // Nested patterns and default values both land here.
            return Err(unsupported());
        };
        // Import statements, unlike var destructuring, require each local
        // binding to be unique.
        if !locals.insert(local.name.to_string()) {
            return Err(unsupported());
        }

        if key.name == "default" {
            if default_binding.is_some() {
                return Err(unsupported());
            }
            default_binding = Some(local.name.to_string());
        } else {
            named.push((key.name.to_string(), local.name.to_string()));
        }
    }

    let mut parts: Vec<String> = Vec::new();
    if let Some(d) = default_binding {
        parts.push(d);
    }
    if !named.is_empty() || parts.is_empty() {
        let list: Vec<String> = named
            .iter()
            .map(|(name, local)| {
                if name == local {
                    name.clone()
                } else {
                    format!("{} as {}", name, local)
                }
            })
            .collect();
        if list.is_empty() {
            parts.push("{}".to_string());
        } else {
            parts.push(format!("{{ {} }}", list.join(", ")));
        }
    }
    Ok(parts.join(", "))
}

fn log_skipped(expr: &Expression<'_>, module_path: &Path) {
    let mut specs = Vec::new();
    collect_requires(expr, &mut specs);
    for spec in specs {
        warn!(
            "Skipped require('{}') in {}: not a convertible top-level form",
            spec,
            module_path.display()
        );
    }
}
