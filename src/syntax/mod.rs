pub mod block;
pub mod expression;
pub mod formatter;
pub mod lexer;
pub mod parser;
pub mod program;
pub mod statement;
pub mod token;
pub mod token_type;

pub type Identifier = String;

pub use crate::diagnostics::position;

use crate::diagnostics::Diagnostic;
use crate::syntax::lexer::Lexer;
use crate::syntax::parser::Parser;
use crate::syntax::program::Program;

/// Parse a whole source file, attributing any diagnostics to `file`.
pub fn parse_source(source: &str, file: &str) -> Result<Program, Vec<Diagnostic>> {
    let mut parser = Parser::new(Lexer::new(source));
    let program = parser.parse_program();

    if parser.errors.is_empty() {
        Ok(program)
    } else {
        let mut diagnostics = parser.errors;
        for diagnostic in &mut diagnostics {
            diagnostic.set_file(file);
        }
        Err(diagnostics)
    }
}
