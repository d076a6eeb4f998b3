//! Static reference resolver: decides whether an expression provably
//! denotes a compile-time literal at its use site.
//!
//! Resolution never executes code. It reads literals directly, follows an
//! identifier to its single un-reassigned declarator, and walks named
//! property chains off literal object initializers. Everything else is
//! "unknown", which the caller treats as a reason to retain, not to fail.

use std::collections::HashMap;

use crate::runtime::value::{ObjectMap, Value};
use crate::syntax::block::Block;
use crate::syntax::expression::Expression;
use crate::syntax::program::Program;
use crate::syntax::statement::{ExportDeclaration, Statement};

#[derive(Debug, Clone, Default)]
pub struct StaticBinding {
    pub init: Option<Expression>,
    pub assigned: bool,
}

type Frame = HashMap<String, StaticBinding>;

/// The lexical scope in force at the expression being resolved. Frame 0 is
/// the file's top level; the rewrite walk pushes a frame per function or
/// block it descends into.
#[derive(Debug, Default)]
pub struct StaticScope {
    frames: Vec<Frame>,
}

impl StaticScope {
    pub fn from_program(program: &Program) -> Self {
        let mut frame = Frame::new();
        collect_declarations(&program.statements, &mut frame);
        scan_statements_for_assignments(&program.statements, &mut frame);
        Self {
            frames: vec![frame],
        }
    }

    pub fn push_function_scope(&mut self, parameters: &[String], body: &Block) {
        let mut frame = Frame::new();
        for parameter in parameters {
            frame.insert(parameter.clone(), StaticBinding::default());
        }
        collect_declarations(&body.statements, &mut frame);
        scan_statements_for_assignments(&body.statements, &mut frame);
        self.frames.push(frame);
    }

    pub fn push_block_scope(&mut self, block: &Block) {
        let mut frame = Frame::new();
        collect_declarations(&block.statements, &mut frame);
        scan_statements_for_assignments(&block.statements, &mut frame);
        self.frames.push(frame);
    }

    pub fn pop_scope(&mut self) {
        self.frames.pop();
    }

    /// True when an inner scope declares `name`, hiding the top-level
    /// binding of the same name.
    pub fn shadowed(&self, name: &str) -> bool {
        self.frames
            .iter()
            .skip(1)
            .any(|frame| frame.contains_key(name))
    }

    pub fn lookup(&self, name: &str) -> Option<&StaticBinding> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }
}

fn collect_declarations(statements: &[Statement], frame: &mut Frame) {
    for statement in statements {
        match statement {
            Statement::Declaration { declarators, .. } => {
                for declarator in declarators {
                    if frame.contains_key(&declarator.name) {
                        // Redeclaration: no single unambiguous initializer.
                        frame.insert(declarator.name.clone(), StaticBinding::default());
                    } else {
                        frame.insert(
                            declarator.name.clone(),
                            StaticBinding {
                                init: declarator.init.clone(),
                                assigned: false,
                            },
                        );
                    }
                }
            }
            Statement::Function { name, .. } => {
                frame.insert(name.clone(), StaticBinding::default());
            }
            Statement::Import(decl) => {
                for specifier in &decl.specifiers {
                    frame.insert(specifier.local.clone(), StaticBinding::default());
                }
            }
            Statement::Export(ExportDeclaration::Declaration { declaration, .. }) => {
                collect_declarations(std::slice::from_ref(declaration.as_ref()), frame);
            }
            _ => {}
        }
    }
}

/// Marks bindings that are written anywhere in the subtree, including from
/// nested functions. Over-approximate on purpose: a shadowed inner write
/// still poisons the name, which only ever retains more.
fn scan_statements_for_assignments(statements: &[Statement], frame: &mut Frame) {
    for statement in statements {
        match statement {
            Statement::Declaration { declarators, .. } => {
                for declarator in declarators {
                    if let Some(init) = &declarator.init {
                        scan_expression_for_assignments(init, frame);
                    }
                }
            }
            Statement::Function { body, .. } => {
                scan_statements_for_assignments(&body.statements, frame);
            }
            Statement::Return { value: Some(value), .. } => {
                scan_expression_for_assignments(value, frame);
            }
            Statement::Return { value: None, .. } => {}
            Statement::If {
                condition,
                consequence,
                alternative,
                ..
            } => {
                scan_expression_for_assignments(condition, frame);
                scan_statements_for_assignments(&consequence.statements, frame);
                if let Some(alternative) = alternative {
                    scan_statements_for_assignments(&alternative.statements, frame);
                }
            }
            Statement::Expression { expression, .. } => {
                scan_expression_for_assignments(expression, frame);
            }
            Statement::Export(ExportDeclaration::Default { value, .. }) => {
                scan_expression_for_assignments(value, frame);
            }
            Statement::Export(ExportDeclaration::Declaration { declaration, .. }) => {
                scan_statements_for_assignments(std::slice::from_ref(declaration.as_ref()), frame);
            }
            Statement::Export(ExportDeclaration::Named { .. }) => {}
            Statement::Import(_) => {}
        }
    }
}

fn scan_expression_for_assignments(expression: &Expression, frame: &mut Frame) {
    match expression {
        Expression::Assign { target, value, .. } => {
            if let Expression::Identifier { name, .. } = target.as_ref()
                && let Some(binding) = frame.get_mut(name)
            {
                binding.assigned = true;
            }
            scan_expression_for_assignments(target, frame);
            scan_expression_for_assignments(value, frame);
        }
        Expression::Array { elements, .. } => {
            for element in elements {
                scan_expression_for_assignments(element, frame);
            }
        }
        Expression::Object { properties, .. } => {
            for property in properties {
                scan_expression_for_assignments(&property.value, frame);
            }
        }
        Expression::Function { body, .. } => {
            scan_statements_for_assignments(&body.statements, frame);
        }
        Expression::Prefix { right, .. } => scan_expression_for_assignments(right, frame),
        Expression::Infix { left, right, .. } => {
            scan_expression_for_assignments(left, frame);
            scan_expression_for_assignments(right, frame);
        }
        Expression::Member { object, .. } => scan_expression_for_assignments(object, frame),
        Expression::Index { object, index, .. } => {
            scan_expression_for_assignments(object, frame);
            scan_expression_for_assignments(index, frame);
        }
        Expression::Call {
            callee, arguments, ..
        } => {
            scan_expression_for_assignments(callee, frame);
            for argument in arguments {
                scan_expression_for_assignments(argument, frame);
            }
        }
        _ => {}
    }
}

/// Resolve a call argument to a literal value, or `None` for "unknown".
pub fn resolve_argument(expression: &Expression, scope: &StaticScope) -> Option<Value> {
    match expression {
        Expression::Identifier { name, .. } => {
            let binding = scope.lookup(name)?;
            if binding.assigned {
                return None;
            }
            literal_value(binding.init.as_ref()?)
        }
        Expression::Member { .. } => resolve_member(expression, scope),
        other => literal_value(other),
    }
}

/// Strictly literal expressions only: no identifiers, no calls, no member
/// reads. Unary minus and bang fold into their operand.
pub fn literal_value(expression: &Expression) -> Option<Value> {
    match expression {
        Expression::Number { value, .. } => Some(Value::Number(*value)),
        Expression::String { value, .. } => Some(Value::String(value.clone())),
        Expression::Boolean { value, .. } => Some(Value::Boolean(*value)),
        Expression::Null { .. } => Some(Value::Null),
        Expression::Prefix {
            operator, right, ..
        } => match (operator.as_str(), literal_value(right)?) {
            ("-", Value::Number(number)) => Some(Value::Number(-number)),
            ("!", value) => Some(Value::Boolean(!value.is_truthy())),
            _ => None,
        },
        Expression::Array { elements, .. } => {
            let mut values = Vec::with_capacity(elements.len());
            for element in elements {
                values.push(literal_value(element)?);
            }
            Some(Value::array(values))
        }
        Expression::Object { properties, .. } => {
            let mut map = ObjectMap::new();
            for property in properties {
                map.insert(property.key.clone(), literal_value(&property.value)?);
            }
            Some(Value::object(map))
        }
        _ => None,
    }
}

/// `a.b.c` resolves by reducing `a` to a literal object initializer and
/// reading the property chain off of it.
fn resolve_member(expression: &Expression, scope: &StaticScope) -> Option<Value> {
    let mut path = Vec::new();
    let mut current = expression;
    while let Expression::Member {
        object, property, ..
    } = current
    {
        path.push(property.as_str());
        current = object;
    }

    let Expression::Identifier { name, .. } = current else {
        return None;
    };
    let binding = scope.lookup(name)?;
    if binding.assigned {
        return None;
    }

    let mut node = binding.init.as_ref()?;
    for property in path.iter().rev() {
        let Expression::Object { properties, .. } = node else {
            return None;
        };
        node = &properties
            .iter()
            .find(|candidate| candidate.key == *property)?
            .value;
    }
    literal_value(node)
}
