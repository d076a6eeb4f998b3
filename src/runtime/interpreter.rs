//! Tree-walking evaluator for module code.
//!
//! Both load paths execute modules through this interpreter, and the fold
//! pass calls back into it to invoke real exported functions. Statements
//! run in document order; function declarations are hoisted within their
//! block.

use std::cell::Cell;
use std::rc::Rc;

use crate::diagnostics::codes::{
    BAD_ASSIGN_TARGET, BAD_INDEX, BAD_MEMBER_TARGET, BAD_OPERAND, BAD_UNARY_OPERAND,
    CALL_DEPTH_EXCEEDED, MODULE_SYNTAX_IN_SCRIPT, NOT_A_FUNCTION, UNDEFINED_VARIABLE,
};
use crate::diagnostics::position::Span;
use crate::diagnostics::{Diagnostic, ErrorCode};
use crate::runtime::env::Env;
use crate::runtime::value::{FunctionValue, ObjectMap, Value};
use crate::syntax::block::Block;
use crate::syntax::expression::Expression;
use crate::syntax::program::Program;
use crate::syntax::statement::Statement;

const MAX_CALL_DEPTH: usize = 256;

enum Flow {
    Next,
    Return(Value),
}

pub struct Interpreter {
    file: String,
    depth: Cell<usize>,
}

impl Interpreter {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            depth: Cell::new(0),
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    fn error(&self, spec: &'static ErrorCode, values: &[&str], span: Span) -> Box<Diagnostic> {
        Box::new(Diagnostic::make_error(spec, values, self.file.clone(), span))
    }

    pub fn run_program(&self, program: &Program, env: &Env) -> Result<(), Box<Diagnostic>> {
        self.run_statements(&program.statements, env)?;
        Ok(())
    }

    fn run_statements(&self, statements: &[Statement], env: &Env) -> Result<Flow, Box<Diagnostic>> {
        for statement in statements {
            if let Statement::Function {
                name,
                parameters,
                body,
                ..
            } = statement
            {
                let function = Value::Function(Rc::new(FunctionValue {
                    name: Some(name.clone()),
                    parameters: parameters.clone(),
                    body: body.clone(),
                    env: env.clone(),
                }));
                env.define(name.clone(), function);
            }
        }

        for statement in statements {
            match self.exec_statement(statement, env)? {
                Flow::Next => {}
                flow @ Flow::Return(_) => return Ok(flow),
            }
        }
        Ok(Flow::Next)
    }

    fn exec_statement(&self, statement: &Statement, env: &Env) -> Result<Flow, Box<Diagnostic>> {
        match statement {
            Statement::Import(decl) => {
                Err(self.error(&MODULE_SYNTAX_IN_SCRIPT, &["import"], decl.span))
            }
            Statement::Export(decl) => {
                Err(self.error(&MODULE_SYNTAX_IN_SCRIPT, &["export"], decl.span()))
            }
            Statement::Declaration { declarators, .. } => {
                for declarator in declarators {
                    let value = match &declarator.init {
                        Some(init) => self.eval(init, env)?,
                        None => Value::Undefined,
                    };
                    env.define(declarator.name.clone(), value);
                }
                Ok(Flow::Next)
            }
            Statement::Function { .. } => Ok(Flow::Next),
            Statement::Return { value, .. } => {
                let result = match value {
                    Some(value) => self.eval(value, env)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(result))
            }
            Statement::If {
                condition,
                consequence,
                alternative,
                ..
            } => {
                let test = self.eval(condition, env)?;
                if test.is_truthy() {
                    self.run_block(consequence, env)
                } else if let Some(alternative) = alternative {
                    self.run_block(alternative, env)
                } else {
                    Ok(Flow::Next)
                }
            }
            Statement::Expression { expression, .. } => {
                self.eval(expression, env)?;
                Ok(Flow::Next)
            }
        }
    }

    fn run_block(&self, block: &Block, env: &Env) -> Result<Flow, Box<Diagnostic>> {
        let scope = env.child();
        self.run_statements(&block.statements, &scope)
    }

    pub fn eval(&self, expression: &Expression, env: &Env) -> Result<Value, Box<Diagnostic>> {
        match expression {
            Expression::Identifier { name, span } => env
                .get(name)
                .ok_or_else(|| self.error(&UNDEFINED_VARIABLE, &[name], *span)),
            Expression::Number { value, .. } => Ok(Value::Number(*value)),
            Expression::String { value, .. } => Ok(Value::String(value.clone())),
            Expression::Boolean { value, .. } => Ok(Value::Boolean(*value)),
            Expression::Null { .. } => Ok(Value::Null),
            Expression::Array { elements, .. } => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.eval(element, env)?);
                }
                Ok(Value::array(values))
            }
            Expression::Object { properties, .. } => {
                let mut map = ObjectMap::new();
                for property in properties {
                    let value = self.eval(&property.value, env)?;
                    map.insert(property.key.clone(), value);
                }
                Ok(Value::object(map))
            }
            Expression::Function {
                name,
                parameters,
                body,
                ..
            } => Ok(Value::Function(Rc::new(FunctionValue {
                name: name.clone(),
                parameters: parameters.clone(),
                body: body.clone(),
                env: env.clone(),
            }))),
            Expression::Prefix {
                operator,
                right,
                span,
            } => {
                let value = self.eval(right, env)?;
                match (operator.as_str(), &value) {
                    ("!", value) => Ok(Value::Boolean(!value.is_truthy())),
                    ("-", Value::Number(number)) => Ok(Value::Number(-number)),
                    (op, value) => {
                        Err(self.error(&BAD_UNARY_OPERAND, &[op, value.type_name()], *span))
                    }
                }
            }
            Expression::Infix {
                left,
                operator,
                right,
                span,
            } => self.eval_infix(left, operator, right, *span, env),
            Expression::Assign {
                target,
                value,
                span,
            } => self.eval_assign(target, value, *span, env),
            Expression::Member {
                object,
                property,
                span,
            } => {
                let target = self.eval(object, env)?;
                match &target {
                    Value::Undefined | Value::Null => Err(self.error(
                        &BAD_MEMBER_TARGET,
                        &[property, target.type_name()],
                        *span,
                    )),
                    _ => Ok(target.get_member(property).unwrap_or(Value::Undefined)),
                }
            }
            Expression::Index {
                object,
                index,
                span,
            } => {
                let target = self.eval(object, env)?;
                let key = self.eval(index, env)?;
                self.eval_index(&target, &key, *span)
            }
            Expression::Call {
                callee,
                arguments,
                span,
            } => {
                let function = self.eval(callee, env)?;
                let mut values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.eval(argument, env)?);
                }
                self.call(&function, &values, *span)
            }
        }
    }

    fn eval_infix(
        &self,
        left: &Expression,
        operator: &str,
        right: &Expression,
        span: Span,
        env: &Env,
    ) -> Result<Value, Box<Diagnostic>> {
        if operator == "&&" {
            let lhs = self.eval(left, env)?;
            return if lhs.is_truthy() {
                self.eval(right, env)
            } else {
                Ok(lhs)
            };
        }
        if operator == "||" {
            let lhs = self.eval(left, env)?;
            return if lhs.is_truthy() {
                Ok(lhs)
            } else {
                self.eval(right, env)
            };
        }

        let lhs = self.eval(left, env)?;
        let rhs = self.eval(right, env)?;

        let result = match (operator, &lhs, &rhs) {
            ("+", Value::Number(a), Value::Number(b)) => Value::Number(a + b),
            ("+", Value::String(_), _) | ("+", _, Value::String(_)) => {
                let mut text = concat_operand(&lhs);
                text.push_str(&concat_operand(&rhs));
                Value::String(text)
            }
            ("-", Value::Number(a), Value::Number(b)) => Value::Number(a - b),
            ("*", Value::Number(a), Value::Number(b)) => Value::Number(a * b),
            ("/", Value::Number(a), Value::Number(b)) => Value::Number(a / b),
            ("%", Value::Number(a), Value::Number(b)) => Value::Number(a % b),
            ("<", Value::Number(a), Value::Number(b)) => Value::Boolean(a < b),
            (">", Value::Number(a), Value::Number(b)) => Value::Boolean(a > b),
            ("<=", Value::Number(a), Value::Number(b)) => Value::Boolean(a <= b),
            (">=", Value::Number(a), Value::Number(b)) => Value::Boolean(a >= b),
            ("<", Value::String(a), Value::String(b)) => Value::Boolean(a < b),
            (">", Value::String(a), Value::String(b)) => Value::Boolean(a > b),
            ("<=", Value::String(a), Value::String(b)) => Value::Boolean(a <= b),
            (">=", Value::String(a), Value::String(b)) => Value::Boolean(a >= b),
            ("==" | "===", _, _) => Value::Boolean(lhs == rhs),
            ("!=" | "!==", _, _) => Value::Boolean(lhs != rhs),
            _ => {
                return Err(self.error(
                    &BAD_OPERAND,
                    &[operator, lhs.type_name(), rhs.type_name()],
                    span,
                ));
            }
        };
        Ok(result)
    }

    fn eval_assign(
        &self,
        target: &Expression,
        value: &Expression,
        span: Span,
        env: &Env,
    ) -> Result<Value, Box<Diagnostic>> {
        let new_value = self.eval(value, env)?;
        match target {
            Expression::Identifier { name, span } => {
                if !env.assign(name, new_value.clone()) {
                    return Err(self.error(&UNDEFINED_VARIABLE, &[name], *span));
                }
            }
            Expression::Member {
                object,
                property,
                span,
            } => {
                let target_value = self.eval(object, env)?;
                match target_value {
                    Value::Object(map) => {
                        map.borrow_mut().insert(property.clone(), new_value.clone());
                    }
                    other => {
                        return Err(self.error(
                            &BAD_MEMBER_TARGET,
                            &[property, other.type_name()],
                            *span,
                        ));
                    }
                }
            }
            Expression::Index {
                object,
                index,
                span,
            } => {
                let target_value = self.eval(object, env)?;
                let key = self.eval(index, env)?;
                match (&target_value, &key) {
                    (Value::Object(map), Value::String(key)) => {
                        map.borrow_mut().insert(key.clone(), new_value.clone());
                    }
                    (Value::Array(elements), Value::Number(index)) => {
                        let mut elements = elements.borrow_mut();
                        let index = *index as usize;
                        if index < elements.len() {
                            elements[index] = new_value.clone();
                        } else if index == elements.len() {
                            elements.push(new_value.clone());
                        } else {
                            return Err(self.error(
                                &BAD_INDEX,
                                &[target_value.type_name(), &key.to_string()],
                                *span,
                            ));
                        }
                    }
                    _ => {
                        return Err(self.error(
                            &BAD_INDEX,
                            &[target_value.type_name(), key.type_name()],
                            *span,
                        ));
                    }
                }
            }
            _ => return Err(self.error(&BAD_ASSIGN_TARGET, &[], span)),
        }
        Ok(new_value)
    }

    fn eval_index(&self, target: &Value, key: &Value, span: Span) -> Result<Value, Box<Diagnostic>> {
        match (target, key) {
            (Value::Array(elements), Value::Number(index)) => {
                let elements = elements.borrow();
                if *index >= 0.0 && index.fract() == 0.0 {
                    Ok(elements
                        .get(*index as usize)
                        .cloned()
                        .unwrap_or(Value::Undefined))
                } else {
                    Ok(Value::Undefined)
                }
            }
            (Value::Object(map), Value::String(key)) => {
                Ok(map.borrow().get(key).cloned().unwrap_or(Value::Undefined))
            }
            (Value::String(text), Value::Number(index)) => {
                if *index >= 0.0 && index.fract() == 0.0 {
                    Ok(text
                        .chars()
                        .nth(*index as usize)
                        .map(|ch| Value::String(ch.to_string()))
                        .unwrap_or(Value::Undefined))
                } else {
                    Ok(Value::Undefined)
                }
            }
            _ => Err(self.error(&BAD_INDEX, &[target.type_name(), key.type_name()], span)),
        }
    }

    /// Invoke a callable with already-evaluated arguments. Missing arguments
    /// are bound to `undefined`.
    pub fn call(
        &self,
        callee: &Value,
        arguments: &[Value],
        span: Span,
    ) -> Result<Value, Box<Diagnostic>> {
        match callee {
            Value::Function(function) => {
                let depth = self.depth.get();
                if depth >= MAX_CALL_DEPTH {
                    return Err(self.error(
                        &CALL_DEPTH_EXCEEDED,
                        &[&MAX_CALL_DEPTH.to_string()],
                        span,
                    ));
                }
                self.depth.set(depth + 1);

                let scope = function.env.child();
                if let Some(name) = &function.name {
                    scope.define(name.clone(), callee.clone());
                }
                for (i, parameter) in function.parameters.iter().enumerate() {
                    let value = arguments.get(i).cloned().unwrap_or(Value::Undefined);
                    scope.define(parameter.clone(), value);
                }

                let result = self.run_statements(&function.body.statements, &scope);
                self.depth.set(depth);

                match result? {
                    Flow::Return(value) => Ok(value),
                    Flow::Next => Ok(Value::Undefined),
                }
            }
            Value::Native(native) => (native.func)(arguments),
            other => Err(self.error(&NOT_A_FUNCTION, &[other.type_name()], span)),
        }
    }
}

fn concat_operand(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_source;

    fn run(source: &str) -> Env {
        let program = parse_source(source, "test.js").expect("parse");
        let env = crate::runtime::builtins::global_env();
        let interpreter = Interpreter::new("test.js");
        interpreter.run_program(&program, &env).expect("run");
        env
    }

    fn run_err(source: &str) -> Box<Diagnostic> {
        let program = parse_source(source, "test.js").expect("parse");
        let env = crate::runtime::builtins::global_env();
        let interpreter = Interpreter::new("test.js");
        interpreter.run_program(&program, &env).expect_err("error")
    }

    #[test]
    fn test_arithmetic_and_bindings() {
        let env = run("const a = 2; let b = a * 3 + 1;");
        assert_eq!(env.get("b"), Some(Value::Number(7.0)));
    }

    #[test]
    fn test_string_concat() {
        let env = run("const s = 'a' + 1 + true;");
        assert_eq!(env.get("s"), Some(Value::String("a1true".to_string())));
    }

    #[test]
    fn test_function_call_and_closure() {
        let env = run(
            "function add(a, b) { return a + b; }\nconst inc = (x) => add(x, 1);\nconst r = inc(41);",
        );
        assert_eq!(env.get("r"), Some(Value::Number(42.0)));
    }

    #[test]
    fn test_function_hoisting() {
        let env = run("const r = twice(3); function twice(x) { return x * 2; }");
        assert_eq!(env.get("r"), Some(Value::Number(6.0)));
    }

    #[test]
    fn test_if_else_and_short_circuit() {
        let env = run(
            "let out = 0; if (1 < 2 && 'x') { out = 1; } else { out = 2; }\nconst keep = null || 'fallback';",
        );
        assert_eq!(env.get("out"), Some(Value::Number(1.0)));
        assert_eq!(env.get("keep"), Some(Value::String("fallback".to_string())));
    }

    #[test]
    fn test_object_mutation_through_member_assign() {
        let env = run("const box = {}; box.a = 1; box['b'] = 2;");
        let Some(Value::Object(map)) = env.get("box") else {
            panic!("expected object");
        };
        assert_eq!(map.borrow().get("a"), Some(&Value::Number(1.0)));
        assert_eq!(map.borrow().get("b"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn test_missing_property_reads_undefined() {
        let env = run("const v = ({ a: 1 }).b;");
        assert_eq!(env.get("v"), Some(Value::Undefined));
    }

    #[test]
    fn test_member_of_null_is_error() {
        let err = run_err("const v = null.x;");
        assert_eq!(err.code(), Some("E043"));
    }

    #[test]
    fn test_undefined_variable_error() {
        let err = run_err("missing();");
        assert_eq!(err.code(), Some("E040"));
    }

    #[test]
    fn test_import_statement_is_module_syntax_error() {
        let err = run_err("import x from 'y';");
        assert_eq!(err.code(), Some("E046"));
    }

    #[test]
    fn test_call_depth_guard() {
        let err = run_err("function loop() { return loop(); } loop();");
        assert_eq!(err.code(), Some("E048"));
    }

    #[test]
    fn test_named_function_expression_recurses() {
        let env = run(
            "const fact = function f(n) { if (n <= 1) { return 1; } return n * f(n - 1); };\nconst r = fact(5);",
        );
        assert_eq!(env.get("r"), Some(Value::Number(120.0)));
    }
}
