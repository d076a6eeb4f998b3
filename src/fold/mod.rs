//! Import folding driver.
//!
//! Visits each import declaration in document order, matches its source
//! against the configured patterns, obtains the module's real exports, and
//! drives the chain evaluator over every reference of every specifier.
//! Specifiers whose references all folded are deleted; declarations with no
//! specifiers left are deleted entirely.
//!
//! Failure is asymmetric on purpose: structural surprises (missing exports,
//! unrecognized reference shapes) abort the whole pass, while arguments
//! that are simply not statically known retain their reference and move on.

pub mod chain;
pub mod module;
pub mod pattern;
pub mod resolve;
pub mod serialize;

use std::path::Path;
use std::rc::Rc;

use crate::config::FoldConfig;
use crate::diagnostics::Diagnostic;
use crate::diagnostics::codes::{MISSING_EXPORT, MISSING_FOLD_PATTERN, UNSUPPORTED_REFERENCE};
use crate::diagnostics::position::Span;
use crate::fold::chain::{ChainOutcome, chain_base, evaluate_chain};
use crate::fold::module::{ModuleRecord, ModuleResolver};
use crate::fold::pattern::any_match;
use crate::fold::resolve::StaticScope;
use crate::runtime::interpreter::Interpreter;
use crate::runtime::value::Value;
use crate::sandbox::normalize::{EsmNormalizer, Normalizer};
use crate::syntax::block::Block;
use crate::syntax::expression::Expression;
use crate::syntax::program::Program;
use crate::syntax::statement::{ExportDeclaration, ImportedName, Statement};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FoldOutcome {
    pub folded_references: usize,
    pub retained_references: usize,
    pub removed_specifiers: usize,
    pub removed_declarations: usize,
}

pub fn fold_program(
    program: &mut Program,
    config: &FoldConfig,
    base_dir: &Path,
    file: &str,
) -> Result<FoldOutcome, Box<Diagnostic>> {
    fold_program_with(program, config, base_dir, file, Rc::new(EsmNormalizer))
}

/// Entry point with an explicit normalizer service, used by the CLI's
/// default path and by tests that need to fail normalization on purpose.
pub fn fold_program_with(
    program: &mut Program,
    config: &FoldConfig,
    base_dir: &Path,
    file: &str,
    normalizer: Rc<dyn Normalizer>,
) -> Result<FoldOutcome, Box<Diagnostic>> {
    if config.patterns.is_empty() {
        return Err(Box::new(Diagnostic::make_error(
            &MISSING_FOLD_PATTERN,
            &[],
            file,
            Span::default(),
        )));
    }

    let resolver = ModuleResolver::new(config.module_roots.clone(), normalizer);
    let interpreter = Interpreter::new(file);
    let mut outcome = FoldOutcome::default();
    let mut removed_indices = Vec::new();

    for index in 0..program.statements.len() {
        let decl = match &program.statements[index] {
            Statement::Import(decl) if any_match(&config.patterns, &decl.source) => decl.clone(),
            _ => continue,
        };

        // Obtaining the real exports is all-or-nothing for a matched import.
        let record = resolver.resolve(&decl.source, base_dir, file, decl.span)?;

        let mut retained_specifiers = Vec::with_capacity(decl.specifiers.len());
        for specifier in &decl.specifiers {
            let target = specifier_value(&record, &specifier.imported, &decl.source, file, specifier.span)?;
            let stats = rewrite_references(
                program,
                index,
                &specifier.local,
                &target,
                &interpreter,
            )?;
            outcome.folded_references += stats.folded;
            outcome.retained_references += stats.retained;
            retained_specifiers.push(stats.retained > 0);
        }

        let Statement::Import(live) = &mut program.statements[index] else {
            unreachable!("import declarations are not rewritten");
        };
        let mut keep = retained_specifiers.iter();
        live.specifiers
            .retain(|_| *keep.next().expect("one flag per specifier"));
        outcome.removed_specifiers += retained_specifiers.iter().filter(|kept| !**kept).count();

        if live.specifiers.is_empty() {
            removed_indices.push(index);
            outcome.removed_declarations += 1;
        }
    }

    let mut index = 0;
    program.statements.retain(|_| {
        let keep = !removed_indices.contains(&index);
        index += 1;
        keep
    });

    Ok(outcome)
}

/// The value a specifier narrows the module to: namespace and default
/// specifiers take the unwrapped module, named specifiers look up their
/// export name (raw exports first, then through the unwrapped default).
fn specifier_value(
    record: &ModuleRecord,
    imported: &ImportedName,
    source: &str,
    file: &str,
    span: Span,
) -> Result<Value, Box<Diagnostic>> {
    match imported {
        ImportedName::Default | ImportedName::Namespace => Ok(record.resolved.clone()),
        ImportedName::Named(name) => record
            .exports
            .get_member(name)
            .or_else(|| record.resolved.get_member(name))
            .ok_or_else(|| {
                Box::new(Diagnostic::make_error(
                    &MISSING_EXPORT,
                    &[source, name],
                    file,
                    span,
                ))
            }),
    }
}

struct RefStats {
    folded: usize,
    retained: usize,
}

fn rewrite_references(
    program: &mut Program,
    import_index: usize,
    local: &str,
    value: &Value,
    interpreter: &Interpreter,
) -> Result<RefStats, Box<Diagnostic>> {
    // Frames clone initializers, so the scope snapshot is independent of
    // the mutations below and reflects any earlier folds in this pass.
    let mut scope = StaticScope::from_program(program);
    let mut rewriter = Rewriter {
        local,
        value,
        interpreter,
        stats: RefStats {
            folded: 0,
            retained: 0,
        },
    };

    for (index, statement) in program.statements.iter_mut().enumerate() {
        if index == import_index {
            continue;
        }
        rewriter.rewrite_statement(statement, &mut scope)?;
    }

    Ok(rewriter.stats)
}

struct Rewriter<'a> {
    local: &'a str,
    value: &'a Value,
    interpreter: &'a Interpreter,
    stats: RefStats,
}

impl Rewriter<'_> {
    fn rewrite_statement(
        &mut self,
        statement: &mut Statement,
        scope: &mut StaticScope,
    ) -> Result<(), Box<Diagnostic>> {
        match statement {
            Statement::Import(_) => Ok(()),
            Statement::Export(export) => match export {
                ExportDeclaration::Default { value, .. } => {
                    self.rewrite_expression(value, scope, true)
                }
                ExportDeclaration::Declaration { declaration, .. } => {
                    self.rewrite_statement(declaration, scope)
                }
                ExportDeclaration::Named { specifiers, span } => {
                    // Re-exporting the binding cannot be folded in place.
                    if let Some(specifier) = specifiers
                        .iter()
                        .find(|specifier| specifier.local == self.local)
                        && !scope.shadowed(self.local)
                    {
                        return Err(Box::new(Diagnostic::make_error(
                            &UNSUPPORTED_REFERENCE,
                            &[&specifier.local],
                            self.interpreter.file(),
                            *span,
                        )));
                    }
                    Ok(())
                }
            },
            Statement::Declaration { declarators, .. } => {
                for declarator in declarators.iter_mut() {
                    if let Some(init) = &mut declarator.init {
                        self.rewrite_expression(init, scope, true)?;
                    }
                }
                Ok(())
            }
            Statement::Function {
                parameters, body, ..
            } => {
                scope.push_function_scope(parameters, body);
                let result = self.rewrite_statements(&mut body.statements, scope);
                scope.pop_scope();
                result
            }
            Statement::Return { value, .. } => match value {
                Some(value) => self.rewrite_expression(value, scope, false),
                None => Ok(()),
            },
            Statement::If {
                condition,
                consequence,
                alternative,
                ..
            } => {
                self.rewrite_expression(condition, scope, false)?;
                self.rewrite_block(consequence, scope)?;
                if let Some(alternative) = alternative {
                    self.rewrite_block(alternative, scope)?;
                }
                Ok(())
            }
            Statement::Expression { expression, .. } => {
                self.rewrite_expression(expression, scope, false)
            }
        }
    }

    fn rewrite_statements(
        &mut self,
        statements: &mut [Statement],
        scope: &mut StaticScope,
    ) -> Result<(), Box<Diagnostic>> {
        for statement in statements.iter_mut() {
            self.rewrite_statement(statement, scope)?;
        }
        Ok(())
    }

    fn rewrite_block(
        &mut self,
        block: &mut Block,
        scope: &mut StaticScope,
    ) -> Result<(), Box<Diagnostic>> {
        scope.push_block_scope(block);
        let result = self.rewrite_statements(&mut block.statements, scope);
        scope.pop_scope();
        result
    }

    /// `value_position` is true exactly where a call-free reference may be
    /// replaced by the serialized module value (a declarator initializer or
    /// default export).
    fn rewrite_expression(
        &mut self,
        expression: &mut Expression,
        scope: &mut StaticScope,
        value_position: bool,
    ) -> Result<(), Box<Diagnostic>> {
        if self.is_target_chain(expression, scope) {
            let outcome = evaluate_chain(
                expression,
                self.value,
                self.local,
                scope,
                self.interpreter,
                value_position,
            )?;
            match outcome {
                ChainOutcome::Folded(replacement) => {
                    *expression = replacement;
                    self.stats.folded += 1;
                }
                ChainOutcome::Retained => {
                    self.stats.retained += 1;
                    // The chain stays, but its arguments may hold further
                    // foldable references.
                    self.descend_chain_arguments(expression, scope)?;
                }
            }
            return Ok(());
        }

        match expression {
            Expression::Identifier { .. }
            | Expression::Number { .. }
            | Expression::String { .. }
            | Expression::Boolean { .. }
            | Expression::Null { .. } => Ok(()),
            Expression::Array { elements, .. } => {
                for element in elements.iter_mut() {
                    self.rewrite_expression(element, scope, false)?;
                }
                Ok(())
            }
            Expression::Object { properties, .. } => {
                for property in properties.iter_mut() {
                    self.rewrite_expression(&mut property.value, scope, false)?;
                }
                Ok(())
            }
            Expression::Function {
                parameters, body, ..
            } => {
                scope.push_function_scope(parameters, body);
                let result = self.rewrite_statements(&mut body.statements, scope);
                scope.pop_scope();
                result
            }
            Expression::Prefix { right, .. } => self.rewrite_expression(right, scope, false),
            Expression::Infix { left, right, .. } => {
                self.rewrite_expression(left, scope, false)?;
                self.rewrite_expression(right, scope, false)
            }
            Expression::Assign { target, value, .. } => {
                self.rewrite_expression(target, scope, false)?;
                self.rewrite_expression(value, scope, false)
            }
            Expression::Member { object, .. } => self.rewrite_expression(object, scope, false),
            Expression::Index { object, index, .. } => {
                self.rewrite_expression(object, scope, false)?;
                self.rewrite_expression(index, scope, false)
            }
            Expression::Call {
                callee, arguments, ..
            } => {
                self.rewrite_expression(callee, scope, false)?;
                for argument in arguments.iter_mut() {
                    self.rewrite_expression(argument, scope, false)?;
                }
                Ok(())
            }
        }
    }

    fn is_target_chain(&self, expression: &Expression, scope: &StaticScope) -> bool {
        chain_base(expression) == Some(self.local) && !scope.shadowed(self.local)
    }

    /// Walk a retained chain's call arguments without touching the chain
    /// spine itself.
    fn descend_chain_arguments(
        &mut self,
        expression: &mut Expression,
        scope: &mut StaticScope,
    ) -> Result<(), Box<Diagnostic>> {
        match expression {
            Expression::Member { object, .. } => self.descend_chain_arguments(object, scope),
            Expression::Call {
                callee, arguments, ..
            } => {
                self.descend_chain_arguments(callee, scope)?;
                for argument in arguments.iter_mut() {
                    self.rewrite_expression(argument, scope, false)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
