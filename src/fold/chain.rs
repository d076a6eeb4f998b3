//! Call/chain evaluator: narrows a module value through the member and call
//! steps read from a reference's syntax position, invoking real functions
//! along the way, and serializes the final result.
//!
//! Outcomes are typed rather than thrown: `Retained` is the ordinary
//! "argument not statically known" case; hard errors are reserved for
//! contract violations (missing member, uncallable target, unsupported
//! shape).

use crate::diagnostics::Diagnostic;
use crate::diagnostics::codes::{MISSING_MEMBER, NOT_CALLABLE, UNSUPPORTED_REFERENCE};
use crate::diagnostics::position::Span;
use crate::fold::resolve::{StaticScope, resolve_argument};
use crate::fold::serialize::serialize_value;
use crate::runtime::interpreter::Interpreter;
use crate::runtime::value::Value;
use crate::syntax::expression::Expression;

#[derive(Debug)]
pub enum ChainOutcome {
    /// The replacement literal for the whole chain expression.
    Folded(Expression),
    /// Some argument was not statically known; leave the reference alone.
    Retained,
}

enum Step<'e> {
    Member { name: &'e str, span: Span },
    Call { arguments: &'e [Expression], span: Span },
}

/// Decompose an expression into its base identifier and the member/call
/// steps applied to it, outermost last. `None` means the expression is not
/// a plain chain (e.g. a computed index is involved).
pub fn chain_base(expression: &Expression) -> Option<&str> {
    let mut current = expression;
    loop {
        match current {
            Expression::Identifier { name, .. } => return Some(name),
            Expression::Member { object, .. } => current = object,
            Expression::Call { callee, .. } => current = callee,
            _ => return None,
        }
    }
}

fn collect_steps(expression: &Expression) -> Vec<Step<'_>> {
    let mut steps = Vec::new();
    let mut current = expression;
    loop {
        match current {
            Expression::Identifier { .. } => break,
            Expression::Member {
                object,
                property,
                span,
            } => {
                steps.push(Step::Member {
                    name: property,
                    span: *span,
                });
                current = object;
            }
            Expression::Call {
                callee,
                arguments,
                span,
            } => {
                steps.push(Step::Call {
                    arguments,
                    span: *span,
                });
                current = callee;
            }
            _ => break,
        }
    }
    steps.reverse();
    steps
}

/// Evaluate the chain at `expression` against `base_value`.
///
/// `value_position` marks the one shape where a call-free chain may fold: a
/// variable declarator's initializer, which is replaced by the serialized
/// module value itself.
pub fn evaluate_chain(
    expression: &Expression,
    base_value: &Value,
    local: &str,
    scope: &StaticScope,
    interpreter: &Interpreter,
    value_position: bool,
) -> Result<ChainOutcome, Box<Diagnostic>> {
    let steps = collect_steps(expression);
    let mut current = base_value.clone();
    let mut saw_call = false;

    for step in steps {
        match step {
            Step::Member { name, span } => {
                current = current.get_member(name).ok_or_else(|| {
                    Box::new(Diagnostic::make_error(
                        &MISSING_MEMBER,
                        &[name, current.type_name()],
                        interpreter.file(),
                        span,
                    ))
                })?;
            }
            Step::Call { arguments, span } => {
                let mut resolved = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    match resolve_argument(argument, scope) {
                        Some(value) => resolved.push(value),
                        None => return Ok(ChainOutcome::Retained),
                    }
                }
                if !current.is_callable() {
                    return Err(Box::new(Diagnostic::make_error(
                        &NOT_CALLABLE,
                        &[current.type_name()],
                        interpreter.file(),
                        span,
                    )));
                }
                current = interpreter.call(&current, &resolved, span)?;
                saw_call = true;
            }
        }
    }

    if !saw_call && !value_position {
        return Err(Box::new(Diagnostic::make_error(
            &UNSUPPORTED_REFERENCE,
            &[local],
            interpreter.file(),
            expression.span(),
        )));
    }

    let replacement = serialize_value(&current, expression.span(), interpreter.file())?;
    Ok(ChainOutcome::Folded(replacement))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::builtins;
    use crate::runtime::value::ObjectMap;
    use crate::syntax::formatter::format_expression;
    use crate::syntax::parse_source;
    use crate::syntax::program::Program;
    use crate::syntax::statement::Statement;

    /// Exports object built by really executing module source.
    fn exports_of(module_source: &str) -> Value {
        let program = parse_source(module_source, "mod.js").expect("parse module");
        let env = builtins::global_env();
        let exports = Value::object(ObjectMap::new());
        env.define("exports", exports.clone());
        Interpreter::new("mod.js")
            .run_program(&program, &env)
            .expect("run module");
        exports
    }

    fn evaluate(
        module_source: &str,
        use_source: &str,
        value_position: bool,
    ) -> Result<ChainOutcome, Box<Diagnostic>> {
        let exports = exports_of(module_source);
        let program: Program = parse_source(use_source, "use.js").expect("parse use");
        let scope = StaticScope::from_program(&program);
        let Statement::Expression { expression, .. } = program.statements.last().unwrap() else {
            panic!("expected trailing expression statement");
        };
        let base = chain_base(expression).expect("chain");
        let interpreter = Interpreter::new("use.js");
        evaluate_chain(expression, &exports, base, &scope, &interpreter, value_position)
    }

    fn folded_text(module_source: &str, use_source: &str) -> String {
        match evaluate(module_source, use_source, false).expect("evaluate") {
            ChainOutcome::Folded(expression) => format_expression(&expression),
            ChainOutcome::Retained => panic!("unexpectedly retained"),
        }
    }

    #[test]
    fn test_simple_call_fold() {
        let module = "exports.double = (x) => x * 2;";
        assert_eq!(folded_text(module, "m.double(21);"), "42");
    }

    #[test]
    fn test_chained_calls_fold_in_one_pass() {
        let module = "\
exports.a = function () {\n\
    return { b: function (s) { return { c: 'got ' + s }; } };\n\
};";
        assert_eq!(folded_text(module, "m.a().b('x').c;"), "\"got x\"");
    }

    #[test]
    fn test_arguments_resolved_through_bindings() {
        let module = "exports.rgba = (hex, alpha) => hex + '/' + alpha;";
        assert_eq!(
            folded_text(module, "const base = '#fff';\nm.rgba(base, 0.5);"),
            "\"#fff/0.5\""
        );
    }

    #[test]
    fn test_unknown_argument_retains() {
        let module = "exports.rgba = (hex, alpha) => hex + '/' + alpha;";
        let outcome = evaluate(module, "m.rgba(someRuntimeValue, 0.5);", false).expect("evaluate");
        assert!(matches!(outcome, ChainOutcome::Retained));
    }

    #[test]
    fn test_missing_member_is_fatal() {
        let module = "exports.a = 1;";
        let err = evaluate(module, "m.missing();", false).unwrap_err();
        assert_eq!(err.code(), Some("E015"));
    }

    #[test]
    fn test_calling_non_function_is_fatal() {
        let module = "exports.a = 1;";
        let err = evaluate(module, "m.a();", false).unwrap_err();
        assert_eq!(err.code(), Some("E016"));
    }

    #[test]
    fn test_call_free_chain_needs_value_position() {
        let module = "exports.a = { b: 7 };";
        let err = evaluate(module, "m.a.b;", false).unwrap_err();
        assert_eq!(err.code(), Some("E017"));

        let outcome = evaluate(module, "m.a.b;", true).expect("evaluate");
        let ChainOutcome::Folded(expression) = outcome else {
            panic!("expected fold");
        };
        assert_eq!(format_expression(&expression), "7");
    }
}
