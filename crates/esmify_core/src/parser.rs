//! Parsing façade over oxc plus the syntax patterns shared by the
//! classifier and both rewriters.

use anyhow::{Context, Result};
use dashmap::DashMap;
use log::{debug, trace};
use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_parser::{Parser as OxcParser, ParserReturn};
use oxc_span::SourceType;
use oxc_syntax::operator::AssignmentOperator;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Parse `source` into an oxc program.
///
/// The parser is error tolerant: on malformed input it still returns the
/// statements it could recover, which is what we want for a codemod that
/// must never lose source text.
pub fn parse<'a>(
    allocator: &'a Allocator,
    source: &'a str,
    source_type: SourceType,
) -> Program<'a> {
    let ParserReturn { program, .. } = OxcParser::new(allocator, source, source_type).parse();
    program
}

/// Pick a source type for a module path.
///
/// Everything is parsed in module mode: converted sources contain `import`
/// declarations after the first rewrite pass, and plain CommonJS parses the
/// same either way.
pub fn source_type_for(path: &Path) -> SourceType {
    let ext = path.extension().and_then(|e| e.to_str());
    SourceType::default().with_module(true).with_jsx(matches!(ext, Some("jsx")))
}

/// Match a `require(...)` call with a bare `require` callee and exactly one
/// string-literal argument, returning the argument literal.
pub fn require_specifier<'a, 'b>(call: &'b CallExpression<'a>) -> Option<&'b StringLiteral<'a>> {
    if let Expression::Identifier(callee) = &call.callee
        && callee.name == "require"
        && call.arguments.len() == 1
        && let Some(Expression::StringLiteral(lit)) = call.arguments[0].as_expression()
    {
        Some(lit)
    } else {
        None
    }
}

/// Match a statement of the form `module.exports = ...` or `exports = ...`
/// and return the assignment expression.
pub fn exports_assignment<'a, 'b>(
    stmt: &'b Statement<'a>,
) -> Option<&'b AssignmentExpression<'a>> {
    if let Statement::ExpressionStatement(es) = stmt
        && let Expression::AssignmentExpression(assign) = &es.expression
        && assign.operator == AssignmentOperator::Assign
        && is_exports_target(&assign.left)
    {
        Some(assign)
    } else {
        None
    }
}

fn is_exports_target(target: &AssignmentTarget) -> bool {
    match target {
        AssignmentTarget::AssignmentTargetIdentifier(ident) => ident.name == "exports",
        AssignmentTarget::StaticMemberExpression(member) => {
            member.property.name == "exports"
                && matches!(&member.object, Expression::Identifier(obj) if obj.name == "module")
        }
        _ => false,
    }
}

/// If every property of an object literal is a plain `name: identifier` pair
/// (shorthand included), return the `(exported name, local name)` pairs.
/// Computed keys, string keys, spreads, methods and non-identifier values
/// all disqualify the literal.
pub fn object_as_name_map(object: &ObjectExpression<'_>) -> Option<Vec<(String, String)>> {
    let mut pairs = Vec::with_capacity(object.properties.len());
    for prop in &object.properties {
        let ObjectPropertyKind::ObjectProperty(prop) = prop else {
            return None;
        };
        if prop.computed || prop.method {
            return None;
        }
        let PropertyKey::StaticIdentifier(key) = &prop.key else {
            return None;
        };
        let Expression::Identifier(value) = &prop.value else {
            return None;
        };
        pairs.push((key.name.to_string(), value.name.to_string()));
    }
    Some(pairs)
}

/// Collect the specifiers of every `require()` call in a source file.
///
/// Used by the pipeline to discover the dependency set before classification.
/// The scan covers top-level statements and the expressions nested inside
/// them; requires buried in function bodies are never rewritten, so they do
/// not need classifying either.
pub fn requires_for(file: &Path, cache: &DashMap<PathBuf, Vec<String>>) -> Result<Vec<String>> {
    let file_buf = file.to_path_buf();
    if let Some(v) = cache.get(&file_buf) {
        trace!("Cache hit for requires: {}", file.display());
        return Ok(v.clone());
    }
    trace!("Parsing file for requires: {}", file.display());
    let src =
        fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;

    let st = source_type_for(file);
    let allocator = Allocator::default();
    let program = parse(&allocator, &src, st);

    let mut specs: Vec<String> = Vec::new();
    for stmt in &program.body {
        match stmt {
            Statement::ExpressionStatement(es) => {
                collect_requires(&es.expression, &mut specs);
            }
            Statement::VariableDeclaration(vd) => {
                for decl in &vd.declarations {
                    if let Some(init) = &decl.init {
                        collect_requires(init, &mut specs);
                    }
                }
            }
            _ => {}
        }
    }

    debug!("Found {} require specifiers in {}", specs.len(), file.display());
    cache.insert(file_buf, specs.clone());
    Ok(specs)
}

/// Recursively extract `require()` specifiers from an expression.
pub fn collect_requires(expr: &Expression<'_>, specs: &mut Vec<String>) {
    match expr {
        Expression::CallExpression(ce) => {
            if let Some(lit) = require_specifier(ce) {
                trace!("Found require() call: '{}'", lit.value);
                specs.push(lit.value.to_string());
            }
            for arg in &ce.arguments {
                if let Some(arg_expr) = arg.as_expression() {
                    collect_requires(arg_expr, specs);
                }
            }
            collect_requires(&ce.callee, specs);
        }
        Expression::ArrayExpression(ae) => {
            for elem in &ae.elements {
                if let Some(expr) = elem.as_expression() {
                    collect_requires(expr, specs);
                }
            }
        }
        Expression::ObjectExpression(oe) => {
            for prop in &oe.properties {
                if let Some(prop) = prop.as_property() {
                    collect_requires(&prop.value, specs);
                }
            }
        }
        Expression::ConditionalExpression(ce) => {
            collect_requires(&ce.test, specs);
            collect_requires(&ce.consequent, specs);
            collect_requires(&ce.alternate, specs);
        }
        Expression::AssignmentExpression(ae) => {
            collect_requires(&ae.right, specs);
        }
        Expression::ParenthesizedExpression(pe) => {
            collect_requires(&pe.expression, specs);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let file_path = dir.join(name);
        fs::write(&file_path, content).expect("Failed to write test file");
        file_path
    }

    #[test]
    fn test_top_level_require() {
        let temp_dir = TempDir::new().unwrap();
        let cache = DashMap::new();
        let file = create_test_file(temp_dir.path(), "test.js", "const fs = require('fs');");
        let specs = requires_for(&file, &cache).unwrap();
        assert_eq!(specs, vec!["fs"]);
    }

    #[test]
    fn test_require_in_expression() {
        let temp_dir = TempDir::new().unwrap();
        let cache = DashMap::new();
        let file = create_test_file(
            temp_dir.path(),
            "test.js",
            "const config = loadConfig(require('./config'));",
        );
        let specs = requires_for(&file, &cache).unwrap();
        assert_eq!(specs, vec!["./config"]);
    }

    #[test]
    fn test_require_in_conditional() {
        let temp_dir = TempDir::new().unwrap();
        let cache = DashMap::new();
        let file = create_test_file(
            temp_dir.path(),
            "test.js",
            "const mod = condition ? require('./a') : require('./b');",
        );
        let specs = requires_for(&file, &cache).unwrap();
        assert_eq!(specs, vec!["./a", "./b"]);
    }

    #[test]
    fn test_non_literal_require_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let cache = DashMap::new();
        let file = create_test_file(temp_dir.path(), "test.js", "const m = require(name);");
        let specs = requires_for(&file, &cache).unwrap();
        assert!(specs.is_empty());
    }

    #[test]
    fn test_cache_behavior() {
        let temp_dir = TempDir::new().unwrap();
        let cache = DashMap::new();
        let file = create_test_file(temp_dir.path(), "test.js", "var a = require('./a');");

        let first = requires_for(&file, &cache).unwrap();
        let second = requires_for(&file, &cache).unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_exports_assignment_detection() {
        let allocator = Allocator::default();
        let src = "module.exports = { a };\nexports = b;\nmodule.exports.c = 1;\nfoo = bar;";
        let program = parse(&allocator, src, SourceType::default().with_module(true));
        let matches: Vec<bool> =
            program.body.iter().map(|s| exports_assignment(s).is_some()).collect();
        assert_eq!(matches, vec![true, true, false, false]);
    }

    #[test]
    fn test_object_as_name_map() {
        let allocator = Allocator::default();
        let src = "module.exports = { foo, bar: wibble };";
        let program = parse(&allocator, src, SourceType::default().with_module(true));
        let assign = exports_assignment(&program.body[0]).unwrap();
        let Expression::ObjectExpression(obj) = &assign.right else {
            panic!("expected object literal");
        };
        let pairs = object_as_name_map(obj).unwrap();
        assert_eq!(
            pairs,
            vec![
                ("foo".to_string(), "foo".to_string()),
                ("bar".to_string(), "wibble".to_string())
            ]
        );
    }

    #[test]
    fn test_object_with_non_identifier_value_is_not_a_name_map() {
        let allocator = Allocator::default();
        let src = "module.exports = { foo: 'abc' };";
        let program = parse(&allocator, src, SourceType::default().with_module(true));
        let assign = exports_assignment(&program.body[0]).unwrap();
        let Expression::ObjectExpression(obj) = &assign.right else {
            panic!("expected object literal");
        };
        assert!(object_as_name_map(obj).is_none());
    }
}
