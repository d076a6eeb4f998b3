//! Recursive-descent / Pratt parser for the supported subset.

use crate::diagnostics::codes::{UNEXPECTED_TOKEN, UNTERMINATED_STRING};
use crate::diagnostics::position::Span;
use crate::diagnostics::{Diagnostic, Position};
use crate::syntax::lexer::Lexer;
use crate::syntax::program::Program;
use crate::syntax::token::Token;
use crate::syntax::token_type::TokenType;

mod expression;
mod statement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(super) enum Precedence {
    Lowest,
    Assign,
    Or,
    And,
    Equality,
    Comparison,
    Sum,
    Product,
    Prefix,
    Call,
}

pub(super) fn precedence_of(token_type: TokenType) -> Precedence {
    match token_type {
        TokenType::Assign => Precedence::Assign,
        TokenType::Or => Precedence::Or,
        TokenType::And => Precedence::And,
        TokenType::Eq | TokenType::NotEq | TokenType::StrictEq | TokenType::StrictNotEq => {
            Precedence::Equality
        }
        TokenType::Lt | TokenType::Gt | TokenType::LtEq | TokenType::GtEq => Precedence::Comparison,
        TokenType::Plus | TokenType::Minus => Precedence::Sum,
        TokenType::Star | TokenType::Slash | TokenType::Percent => Precedence::Product,
        TokenType::LParen | TokenType::Dot | TokenType::LBracket => Precedence::Call,
        _ => Precedence::Lowest,
    }
}

pub struct Parser {
    pub(super) lexer: Lexer,
    pub(super) current_token: Token,
    pub(super) peek_token: Token,
    pub errors: Vec<Diagnostic>,
}

impl Parser {
    pub fn new(lexer: Lexer) -> Self {
        let mut parser = Parser {
            lexer,
            current_token: Token::eof(Position::default()),
            peek_token: Token::eof(Position::default()),
            errors: Vec::new(),
        };
        parser.next_token();
        parser.next_token();
        parser
    }

    pub fn parse_program(&mut self) -> Program {
        let start = self.current_token.position;
        let mut program = Program::new();

        while !self.current_is(TokenType::Eof) {
            if let Some(statement) = self.parse_statement() {
                program.statements.push(statement);
            }
            self.next_token();
        }

        program.span = Span::new(start, self.current_token.end_position);
        program
    }

    pub(super) fn next_token(&mut self) {
        self.current_token = std::mem::replace(&mut self.peek_token, self.lexer.next_token());
    }

    pub(super) fn current_is(&self, token_type: TokenType) -> bool {
        self.current_token.token_type == token_type
    }

    pub(super) fn peek_is(&self, token_type: TokenType) -> bool {
        self.peek_token.token_type == token_type
    }

    /// Advance when the next token matches; report and stay put otherwise.
    pub(super) fn expect_peek(&mut self, token_type: TokenType, context: &str) -> bool {
        if self.peek_is(token_type) {
            self.next_token();
            true
        } else {
            self.error_at_peek(context);
            false
        }
    }

    /// Like `expect_peek` for any token usable as a name (`default`,
    /// `from`, and the other keywords are valid property and binding names).
    pub(super) fn expect_peek_name(&mut self, context: &str) -> bool {
        if self.peek_token.token_type.is_name_like() {
            self.next_token();
            true
        } else {
            self.error_at_peek(context);
            false
        }
    }

    pub(super) fn error_at_peek(&mut self, context: &str) {
        let token = self.peek_token.clone();
        self.error_at(&token, context);
    }

    pub(super) fn error_at(&mut self, token: &Token, context: &str) {
        let diag = if token.token_type == TokenType::UnterminatedString {
            Diagnostic::make_error(&UNTERMINATED_STRING, &[], "", token.span())
        } else {
            let shown = if token.token_type == TokenType::Eof {
                "<eof>"
            } else {
                token.literal.as_str()
            };
            Diagnostic::make_error(&UNEXPECTED_TOKEN, &[shown, context], "", token.span())
        };
        self.errors.push(diag);
    }

    /// After an error, drop tokens until a plausible statement boundary so
    /// one mistake does not cascade.
    pub(super) fn synchronize(&mut self) {
        while !self.current_is(TokenType::Eof) && !self.current_is(TokenType::Semicolon) {
            if self.peek_is(TokenType::RBrace) {
                break;
            }
            self.next_token();
        }
    }

    pub(super) fn eat_optional_semicolon(&mut self) {
        if self.peek_is(TokenType::Semicolon) {
            self.next_token();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::statement::{ImportedName, Statement};

    fn parse(source: &str) -> Program {
        let mut parser = Parser::new(Lexer::new(source));
        let program = parser.parse_program();
        assert!(parser.errors.is_empty(), "parser errors: {:?}", parser.errors);
        program
    }

    fn parse_with_errors(source: &str) -> Vec<Diagnostic> {
        let mut parser = Parser::new(Lexer::new(source));
        parser.parse_program();
        parser.errors
    }

    #[test]
    fn test_import_default() {
        let program = parse("import v from 'mod';");
        let Statement::Import(decl) = &program.statements[0] else {
            panic!("expected import");
        };
        assert_eq!(decl.source, "mod");
        assert_eq!(decl.specifiers.len(), 1);
        assert_eq!(decl.specifiers[0].local, "v");
        assert_eq!(decl.specifiers[0].imported, ImportedName::Default);
    }

    #[test]
    fn test_import_named_with_alias() {
        let program = parse("import { rgba, mix as blend } from 'colors'");
        let Statement::Import(decl) = &program.statements[0] else {
            panic!("expected import");
        };
        assert_eq!(decl.specifiers.len(), 2);
        assert_eq!(decl.specifiers[0].local, "rgba");
        assert_eq!(
            decl.specifiers[0].imported,
            ImportedName::Named("rgba".to_string())
        );
        assert_eq!(decl.specifiers[1].local, "blend");
        assert_eq!(
            decl.specifiers[1].imported,
            ImportedName::Named("mix".to_string())
        );
    }

    #[test]
    fn test_import_namespace() {
        let program = parse("import * as m from './m.js';");
        let Statement::Import(decl) = &program.statements[0] else {
            panic!("expected import");
        };
        assert_eq!(decl.specifiers[0].imported, ImportedName::Namespace);
        assert_eq!(decl.specifiers[0].local, "m");
    }

    #[test]
    fn test_import_default_and_named() {
        let program = parse("import d, { a } from 'mod';");
        let Statement::Import(decl) = &program.statements[0] else {
            panic!("expected import");
        };
        assert_eq!(decl.specifiers.len(), 2);
        assert_eq!(decl.specifiers[0].imported, ImportedName::Default);
        assert_eq!(
            decl.specifiers[1].imported,
            ImportedName::Named("a".to_string())
        );
    }

    #[test]
    fn test_unexpected_token_reported() {
        let errors = parse_with_errors("import from;");
        assert!(!errors.is_empty());
        assert_eq!(errors[0].code(), Some("E030"));
    }

    #[test]
    fn test_unterminated_string_reported() {
        let errors = parse_with_errors("const x = 'oops");
        assert!(errors.iter().any(|e| e.code() == Some("E031")));
    }
}
