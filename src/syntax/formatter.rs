//! Deterministic printer for the AST. The fold pass mutates the tree in
//! place and prints the whole program back out through this module, so the
//! output style is fixed: one statement per line, four-space indentation,
//! double-quoted strings, semicolon-terminated statements.

use crate::syntax::expression::{Expression, Property};
use crate::syntax::program::Program;
use crate::syntax::statement::{
    ExportDeclaration, ImportDeclaration, ImportedName, Statement,
};

const INDENT: &str = "    ";

pub fn format_program(program: &Program) -> String {
    let mut out = String::new();
    for statement in &program.statements {
        write_statement(&mut out, statement, 0);
        out.push('\n');
    }
    out
}

pub fn format_statement(statement: &Statement) -> String {
    let mut out = String::new();
    write_statement(&mut out, statement, 0);
    out
}

pub fn format_expression(expression: &Expression) -> String {
    let mut out = String::new();
    write_expression(&mut out, expression, 0, 0);
    out
}

fn push_indent(out: &mut String, indent: usize) {
    for _ in 0..indent {
        out.push_str(INDENT);
    }
}

fn write_statement(out: &mut String, statement: &Statement, indent: usize) {
    push_indent(out, indent);
    match statement {
        Statement::Import(decl) => write_import(out, decl),
        Statement::Export(decl) => write_export(out, decl, indent),
        Statement::Declaration {
            kind, declarators, ..
        } => {
            out.push_str(&kind.to_string());
            out.push(' ');
            for (i, declarator) in declarators.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&declarator.name);
                if let Some(init) = &declarator.init {
                    out.push_str(" = ");
                    write_expression(out, init, 1, indent);
                }
            }
            out.push(';');
        }
        Statement::Function {
            name,
            parameters,
            body,
            ..
        } => {
            out.push_str("function ");
            out.push_str(name);
            out.push('(');
            out.push_str(&parameters.join(", "));
            out.push_str(") ");
            write_block(out, &body.statements, indent);
        }
        Statement::Return { value, .. } => {
            out.push_str("return");
            if let Some(value) = value {
                out.push(' ');
                write_expression(out, value, 1, indent);
            }
            out.push(';');
        }
        Statement::If {
            condition,
            consequence,
            alternative,
            ..
        } => {
            write_if(out, condition, &consequence.statements, alternative.as_ref(), indent);
        }
        Statement::Expression { expression, .. } => {
            write_expression(out, expression, 0, indent);
            out.push(';');
        }
    }
}

fn write_if(
    out: &mut String,
    condition: &Expression,
    consequence: &[Statement],
    alternative: Option<&crate::syntax::block::Block>,
    indent: usize,
) {
    out.push_str("if (");
    write_expression(out, condition, 0, indent);
    out.push_str(") ");
    write_block(out, consequence, indent);
    if let Some(alternative) = alternative {
        out.push_str(" else ");
        // `else if` chains are represented as a single nested `if`.
        if let [
            Statement::If {
                condition,
                consequence,
                alternative,
                ..
            },
        ] = alternative.statements.as_slice()
        {
            write_if(
                out,
                condition,
                &consequence.statements,
                alternative.as_ref(),
                indent,
            );
        } else {
            write_block(out, &alternative.statements, indent);
        }
    }
}

fn write_block(out: &mut String, statements: &[Statement], indent: usize) {
    if statements.is_empty() {
        out.push_str("{}");
        return;
    }
    out.push_str("{\n");
    for statement in statements {
        write_statement(out, statement, indent + 1);
        out.push('\n');
    }
    push_indent(out, indent);
    out.push('}');
}

fn write_import(out: &mut String, decl: &ImportDeclaration) {
    out.push_str("import ");
    if decl.specifiers.is_empty() {
        write_string(out, &decl.source);
        out.push(';');
        return;
    }

    let mut named_open = false;
    for (i, specifier) in decl.specifiers.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        match &specifier.imported {
            ImportedName::Default => out.push_str(&specifier.local),
            ImportedName::Namespace => {
                out.push_str("* as ");
                out.push_str(&specifier.local);
            }
            ImportedName::Named(imported) => {
                if !named_open {
                    out.push_str("{ ");
                    named_open = true;
                }
                out.push_str(imported);
                if imported != &specifier.local {
                    out.push_str(" as ");
                    out.push_str(&specifier.local);
                }
                let last_named = decl
                    .specifiers
                    .get(i + 1)
                    .is_none_or(|next| !matches!(next.imported, ImportedName::Named(_)));
                if last_named {
                    out.push_str(" }");
                    named_open = false;
                }
            }
        }
    }

    out.push_str(" from ");
    write_string(out, &decl.source);
    out.push(';');
}

fn write_export(out: &mut String, decl: &ExportDeclaration, indent: usize) {
    match decl {
        ExportDeclaration::Default { value, .. } => {
            out.push_str("export default ");
            write_expression(out, value, 1, indent);
            out.push(';');
        }
        ExportDeclaration::Declaration { declaration, .. } => {
            out.push_str("export ");
            let mut inner = String::new();
            write_statement(&mut inner, declaration, indent);
            out.push_str(inner.trim_start());
        }
        ExportDeclaration::Named { specifiers, .. } => {
            out.push_str("export { ");
            for (i, specifier) in specifiers.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&specifier.local);
                if specifier.exported != specifier.local {
                    out.push_str(" as ");
                    out.push_str(&specifier.exported);
                }
            }
            out.push_str(" };");
        }
    }
}

/// Binding strength used to decide where parentheses are required when
/// printing. Mirrors the parser's precedence table.
fn binding_power(expression: &Expression) -> u8 {
    match expression {
        Expression::Assign { .. } => 1,
        Expression::Infix { operator, .. } => match operator.as_str() {
            "||" => 2,
            "&&" => 3,
            "==" | "!=" | "===" | "!==" => 4,
            "<" | ">" | "<=" | ">=" => 5,
            "+" | "-" => 6,
            _ => 7,
        },
        Expression::Prefix { .. } => 8,
        Expression::Function { .. } => 1,
        _ => 9,
    }
}

fn write_expression(out: &mut String, expression: &Expression, min_power: u8, indent: usize) {
    let power = binding_power(expression);
    let needs_parens = power < min_power;
    if needs_parens {
        out.push('(');
    }

    match expression {
        Expression::Identifier { name, .. } => out.push_str(name),
        Expression::Number { value, .. } => out.push_str(&format_number(*value)),
        Expression::String { value, .. } => write_string(out, value),
        Expression::Boolean { value, .. } => {
            out.push_str(if *value { "true" } else { "false" })
        }
        Expression::Null { .. } => out.push_str("null"),
        Expression::Array { elements, .. } => {
            out.push('[');
            for (i, element) in elements.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_expression(out, element, 1, indent);
            }
            out.push(']');
        }
        Expression::Object { properties, .. } => {
            if properties.is_empty() {
                out.push_str("{}");
            } else {
                out.push_str("{ ");
                for (i, property) in properties.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write_property(out, property, indent);
                }
                out.push_str(" }");
            }
        }
        Expression::Function {
            name,
            parameters,
            body,
            ..
        } => {
            out.push_str("function ");
            if let Some(name) = name {
                out.push_str(name);
            }
            out.push('(');
            out.push_str(&parameters.join(", "));
            out.push_str(") ");
            write_block(out, &body.statements, indent);
        }
        Expression::Prefix {
            operator, right, ..
        } => {
            out.push_str(operator);
            write_expression(out, right, 8, indent);
        }
        Expression::Infix {
            left,
            operator,
            right,
            ..
        } => {
            write_expression(out, left, power, indent);
            out.push(' ');
            out.push_str(operator);
            out.push(' ');
            write_expression(out, right, power + 1, indent);
        }
        Expression::Assign { target, value, .. } => {
            write_expression(out, target, 9, indent);
            out.push_str(" = ");
            write_expression(out, value, 1, indent);
        }
        Expression::Member {
            object, property, ..
        } => {
            write_expression(out, object, 9, indent);
            out.push('.');
            out.push_str(property);
        }
        Expression::Index { object, index, .. } => {
            write_expression(out, object, 9, indent);
            out.push('[');
            write_expression(out, index, 1, indent);
            out.push(']');
        }
        Expression::Call {
            callee, arguments, ..
        } => {
            write_expression(out, callee, 9, indent);
            out.push('(');
            for (i, argument) in arguments.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_expression(out, argument, 1, indent);
            }
            out.push(')');
        }
    }

    if needs_parens {
        out.push(')');
    }
}

fn write_property(out: &mut String, property: &Property, indent: usize) {
    if is_identifier_name(&property.key) {
        out.push_str(&property.key);
    } else {
        write_string(out, &property.key);
    }
    out.push_str(": ");
    write_expression(out, &property.value, 1, indent);
}

fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_' || first == '$') {
        return false;
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '$')
}

pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    if value.fract() == 0.0 && value.abs() < 9e15 {
        return format!("{}", value as i64);
    }
    format!("{}", value)
}

fn write_string(out: &mut String, value: &str) {
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            ch if (ch as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", ch as u32));
            }
            ch => out.push(ch),
        }
    }
    out.push('"');
}
