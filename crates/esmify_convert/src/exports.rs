//! Rewriting of `module.exports`/`exports` assignments into ES `export`
//! declarations.
//!
//! Wherever an exported name is bound to a top-level function or class
//! declaration, the declaration itself gains an `export` (or
//! `export default`) modifier in place and the assignment disappears.
//! Everything else becomes an `export { ... }` list or an
//! `export default <expr>;` statement at the assignment's original
//! position. The rewrite never fails: unmatched right-hand sides fall
//! through to the default-export-expression case.

use log::trace;
use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_span::{GetSpan, SourceType, Span};
use std::collections::{HashMap, HashSet};

use esmify_core::{
    TextEdit, apply_edits, exports_assignment, full_line_span, object_as_name_map, parse,
    span_with_semicolon,
};

/// Convert every top-level CommonJS exports assignment in `source`.
pub fn rewrite_exports(source: &str, source_type: SourceType) -> String {
    let allocator = Allocator::default();
    let program = parse(&allocator, source, source_type);

    // Top-level function and class declarations by name. These are the
    // bindings an `export` modifier can be attached to directly.
    let mut decls: HashMap<&str, Span> = HashMap::new();
    for stmt in &program.body {
        match stmt {
            Statement::FunctionDeclaration(f) => {
                if let Some(id) = &f.id {
                    decls.insert(id.name.as_str(), f.span);
                }
            }
            Statement::ClassDeclaration(c) => {
                if let Some(id) = &c.id {
                    decls.insert(id.name.as_str(), c.span);
                }
            }
            _ => {}
        }
    }

    let mut edits: Vec<TextEdit> = Vec::new();
    // Declarations that already received an export modifier; a second
    // assignment naming the same binding must not insert another.
    let mut exported: HashSet<u32> = HashSet::new();

    for stmt in &program.body {
        let Some(assign) = exports_assignment(stmt) else {
            continue;
        };
        let stmt_span = stmt.span();

        if let Expression::ObjectExpression(obj) = &assign.right
            && let Some(pairs) = object_as_name_map(obj)
        {
            // List of (exported name, local name) pairs that cannot be
            // handled by exporting the original declaration in place.
            let mut list: Vec<(String, String)> = Vec::new();

            for (name, local) in pairs {
                let in_place = if name == local { decls.get(local.as_str()).copied() } else { None };
                match in_place {
                    Some(span) => {
                        if exported.insert(span.start) {
                            trace!("Exporting declaration of '{}' in place", local);
                            edits.push(TextEdit::insert(span.start, "export "));
                        }
                    }
                    None => list.push((name, local)),
                }
            }

            if list.is_empty() {
                // Everything was exported at its declaration; the assignment
                // statement leaves no trace behind.
                edits.push(TextEdit::delete(full_line_span(source, stmt_span)));
            } else {
                let rendered: Vec<String> = list
                    .iter()
                    .map(|(name, local)| {
                        if name == local {
                            name.clone()
                        } else {
                            format!("{} as {}", local, name)
                        }
                    })
                    .collect();
                edits.push(TextEdit::replace(
                    span_with_semicolon(source, stmt_span),
                    format!("export {{ {} }};", rendered.join(", ")),
                ));
            }
        } else if let Expression::Identifier(ident) = &assign.right
            && let Some(&span) = decls.get(ident.name.as_str())
            && !exported.contains(&span.start)
        {
            // `module.exports = <local function or class>`: put
            // `export default` in front of the original declaration.
            exported.insert(span.start);
            edits.push(TextEdit::insert(span.start, "export default "));
            edits.push(TextEdit::delete(full_line_span(source, stmt_span)));
        } else {
            // Any other value becomes a default export of the expression,
            // at the assignment's position.
            let rhs = assign.right.span();
            let rhs_text = &source[rhs.start as usize..rhs.end as usize];
            edits.push(TextEdit::replace(
                span_with_semicolon(source, stmt_span),
                format!("export default {};", rhs_text),
            ));
        }
    }

    apply_edits(source, edits)
}
