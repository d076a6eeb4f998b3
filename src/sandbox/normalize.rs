//! Module-syntax normalizer: rewrites ECMAScript-module syntax into the
//! `require`/`module.exports` form the sandbox can execute.
//!
//! The loaders treat this as a service behind the `Normalizer` trait;
//! failure is reported by returning `None`, never by panicking.

use std::collections::HashSet;

use crate::diagnostics::position::Span;
use crate::syntax::expression::Expression;
use crate::syntax::formatter::format_program;
use crate::syntax::parse_source;
use crate::syntax::program::Program;
use crate::syntax::statement::{
    ExportDeclaration, ImportDeclaration, ImportSpecifier, ImportedName, Statement,
};

pub trait Normalizer {
    /// Equivalent loadable source, or `None` when the input cannot be
    /// normalized (e.g. it does not parse).
    fn normalize(&self, source: &str, file: &str) -> Option<String>;
}

#[derive(Debug, Default)]
pub struct EsmNormalizer;

impl Normalizer for EsmNormalizer {
    fn normalize(&self, source: &str, file: &str) -> Option<String> {
        let program = parse_source(source, file).ok()?;
        let lowered = lower_module(&program);
        Some(format_program(&lowered))
    }
}

fn lower_module(program: &Program) -> Program {
    let mut used_names = HashSet::new();
    collect_declared_names(program, &mut used_names);

    let mut statements = Vec::new();
    for statement in &program.statements {
        match statement {
            Statement::Import(decl) => lower_import(decl, &mut statements, &mut used_names),
            Statement::Export(decl) => lower_export(decl, &mut statements),
            other => statements.push(other.clone()),
        }
    }

    Program {
        statements,
        span: program.span,
    }
}

fn collect_declared_names(program: &Program, names: &mut HashSet<String>) {
    for statement in &program.statements {
        match statement {
            Statement::Declaration { declarators, .. } => {
                names.extend(declarators.iter().map(|d| d.name.clone()));
            }
            Statement::Function { name, .. } => {
                names.insert(name.clone());
            }
            Statement::Import(decl) => {
                names.extend(decl.specifiers.iter().map(|s| s.local.clone()));
            }
            _ => {}
        }
    }
}

fn lower_import(
    decl: &ImportDeclaration,
    out: &mut Vec<Statement>,
    used_names: &mut HashSet<String>,
) {
    let span = decl.span;
    let require = require_call(&decl.source, span);

    match decl.specifiers.as_slice() {
        [] => out.push(Statement::Expression {
            expression: require,
            span,
        }),
        [only] => out.push(binding_from(only, require, span)),
        specifiers => {
            let temp = temp_name(&decl.source, used_names);
            out.push(var_statement(&temp, require, span));
            let temp_ref = identifier(&temp, span);
            for specifier in specifiers {
                out.push(binding_from(specifier, temp_ref.clone(), span));
            }
        }
    }
}

/// `var local = <module>;` / `var local = <module>.name;` /
/// `var local = __interopDefault(<module>);`
fn binding_from(specifier: &ImportSpecifier, module: Expression, span: Span) -> Statement {
    let init = match &specifier.imported {
        ImportedName::Namespace => module,
        ImportedName::Default => Expression::Call {
            callee: Box::new(identifier("__interopDefault", span)),
            arguments: vec![module],
            span,
        },
        ImportedName::Named(name) => Expression::Member {
            object: Box::new(module),
            property: name.clone(),
            span,
        },
    };
    var_statement(&specifier.local, init, span)
}

fn lower_export(decl: &ExportDeclaration, out: &mut Vec<Statement>) {
    match decl {
        ExportDeclaration::Default { value, span } => {
            out.push(export_assign("default", value.clone(), *span));
        }
        ExportDeclaration::Declaration { declaration, span } => {
            out.push((**declaration).clone());
            match &**declaration {
                Statement::Declaration { declarators, .. } => {
                    for declarator in declarators {
                        out.push(export_assign(
                            &declarator.name,
                            identifier(&declarator.name, *span),
                            *span,
                        ));
                    }
                }
                Statement::Function { name, .. } => {
                    out.push(export_assign(name, identifier(name, *span), *span));
                }
                _ => {}
            }
        }
        ExportDeclaration::Named { specifiers, span } => {
            for specifier in specifiers {
                out.push(export_assign(
                    &specifier.exported,
                    identifier(&specifier.local, *span),
                    *span,
                ));
            }
        }
    }
}

/// `exports.<name> = <value>;`
fn export_assign(name: &str, value: Expression, span: Span) -> Statement {
    let target = Expression::Member {
        object: Box::new(identifier("exports", span)),
        property: name.to_string(),
        span,
    };
    Statement::Expression {
        expression: Expression::Assign {
            target: Box::new(target),
            value: Box::new(value),
            span,
        },
        span,
    }
}

fn require_call(source: &str, span: Span) -> Expression {
    Expression::Call {
        callee: Box::new(identifier("require", span)),
        arguments: vec![Expression::String {
            value: source.to_string(),
            span,
        }],
        span,
    }
}

fn identifier(name: &str, span: Span) -> Expression {
    Expression::Identifier {
        name: name.to_string(),
        span,
    }
}

fn var_statement(name: &str, init: Expression, span: Span) -> Statement {
    Statement::Declaration {
        kind: crate::syntax::statement::DeclarationKind::Var,
        declarators: vec![crate::syntax::statement::Declarator {
            name: name.to_string(),
            init: Some(init),
            span,
        }],
        span,
    }
}

/// A fresh binding name derived from the source specifier.
fn temp_name(source: &str, used_names: &mut HashSet<String>) -> String {
    let mut base = String::from("_");
    for ch in source.chars() {
        if ch.is_ascii_alphanumeric() {
            base.push(ch);
        } else {
            base.push('_');
        }
    }

    let mut candidate = base.clone();
    let mut counter = 1;
    while used_names.contains(&candidate) {
        candidate = format!("{}{}", base, counter);
        counter += 1;
    }
    used_names.insert(candidate.clone());
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(source: &str) -> String {
        EsmNormalizer
            .normalize(source, "mod.js")
            .expect("normalized")
    }

    #[test]
    fn test_export_const_lowering() {
        assert_eq!(
            normalize("export const tau = 6.28;"),
            "const tau = 6.28;\nexports.tau = tau;\n"
        );
    }

    #[test]
    fn test_export_default_lowering() {
        assert_eq!(normalize("export default 1;"), "exports.default = 1;\n");
    }

    #[test]
    fn test_export_function_lowering() {
        assert_eq!(
            normalize("export function id(x) { return x; }"),
            "function id(x) {\n    return x;\n}\nexports.id = id;\n"
        );
    }

    #[test]
    fn test_named_import_lowering() {
        assert_eq!(
            normalize("import { a, b as c } from './m';"),
            "var ___m = require(\"./m\");\nvar a = ___m.a;\nvar c = ___m.b;\n"
        );
    }

    #[test]
    fn test_default_import_lowering() {
        assert_eq!(
            normalize("import d from './m';"),
            "var d = __interopDefault(require(\"./m\"));\n"
        );
    }

    #[test]
    fn test_namespace_import_lowering() {
        assert_eq!(
            normalize("import * as ns from './m';"),
            "var ns = require(\"./m\");\n"
        );
    }

    #[test]
    fn test_side_effect_import_lowering() {
        assert_eq!(normalize("import './setup';"), "require(\"./setup\");\n");
    }

    #[test]
    fn test_export_named_list_lowering() {
        assert_eq!(
            normalize("const a = 1; export { a as b };"),
            "const a = 1;\nexports.b = a;\n"
        );
    }

    #[test]
    fn test_unparseable_source_returns_none() {
        assert!(EsmNormalizer.normalize("export const = ;", "bad.js").is_none());
    }

    #[test]
    fn test_temp_name_avoids_collisions() {
        let mut used = HashSet::from(["___m".to_string()]);
        assert_eq!(temp_name("./m", &mut used), "___m1");
    }
}
