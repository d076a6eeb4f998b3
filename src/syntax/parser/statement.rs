use crate::diagnostics::position::Span;
use crate::syntax::block::Block;
use crate::syntax::parser::{Parser, Precedence};
use crate::syntax::statement::{
    DeclarationKind, Declarator, ExportDeclaration, ExportSpecifier, ImportDeclaration,
    ImportSpecifier, ImportedName, Statement,
};
use crate::syntax::token_type::TokenType;

impl Parser {
    /// Parses with `current_token` on the first token of the statement and
    /// returns with it on the last (the caller advances past it).
    pub(super) fn parse_statement(&mut self) -> Option<Statement> {
        match self.current_token.token_type {
            TokenType::Import => self.parse_import_declaration(),
            TokenType::Export => self.parse_export_declaration(),
            TokenType::Const => self.parse_variable_declaration(DeclarationKind::Const),
            TokenType::Let => self.parse_variable_declaration(DeclarationKind::Let),
            TokenType::Var => self.parse_variable_declaration(DeclarationKind::Var),
            TokenType::Function => self.parse_function_declaration(),
            TokenType::Return => self.parse_return_statement(),
            TokenType::If => self.parse_if_statement(),
            TokenType::Semicolon => None,
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_import_declaration(&mut self) -> Option<Statement> {
        let start = self.current_token.position;
        let mut specifiers = Vec::new();

        if self.peek_is(TokenType::String) {
            // Side-effect import: no bindings.
            self.next_token();
        } else {
            if self.peek_is(TokenType::Star) {
                specifiers.push(self.parse_namespace_specifier()?);
            } else if self.peek_is(TokenType::LBrace) {
                self.next_token();
                self.parse_named_specifiers(&mut specifiers)?;
            } else if self.peek_token.token_type.is_name_like() {
                self.next_token();
                let span = self.current_token.span();
                specifiers.push(ImportSpecifier {
                    local: self.current_token.literal.clone(),
                    imported: ImportedName::Default,
                    span,
                });
                if self.peek_is(TokenType::Comma) {
                    self.next_token();
                    if self.peek_is(TokenType::Star) {
                        specifiers.push(self.parse_namespace_specifier()?);
                    } else if self.expect_peek(TokenType::LBrace, "expected `{` or `*` after `,`") {
                        self.parse_named_specifiers(&mut specifiers)?;
                    } else {
                        self.synchronize();
                        return None;
                    }
                }
            } else {
                self.error_at_peek("expected import bindings");
                self.synchronize();
                return None;
            }

            if !self.expect_peek(TokenType::From, "expected `from`") {
                self.synchronize();
                return None;
            }
            if !self.expect_peek(TokenType::String, "expected module specifier string") {
                self.synchronize();
                return None;
            }
        }

        let source = self.current_token.literal.clone();
        let mut span = Span::new(start, self.current_token.end_position);
        self.eat_optional_semicolon();
        span.end = self.current_token.end_position;

        Some(Statement::Import(ImportDeclaration {
            specifiers,
            source,
            span,
        }))
    }

    fn parse_namespace_specifier(&mut self) -> Option<ImportSpecifier> {
        let start = self.peek_token.position;
        self.next_token();
        if !self.expect_peek(TokenType::As, "expected `as` after `*`") {
            self.synchronize();
            return None;
        }
        if !self.expect_peek_name("expected namespace binding name") {
            self.synchronize();
            return None;
        }
        Some(ImportSpecifier {
            local: self.current_token.literal.clone(),
            imported: ImportedName::Namespace,
            span: Span::new(start, self.current_token.end_position),
        })
    }

    /// `current_token` is on `{`; returns with it on `}`.
    fn parse_named_specifiers(&mut self, specifiers: &mut Vec<ImportSpecifier>) -> Option<()> {
        loop {
            if self.peek_is(TokenType::RBrace) {
                self.next_token();
                return Some(());
            }
            if !self.expect_peek_name("expected import name") {
                self.synchronize();
                return None;
            }
            let start = self.current_token.position;
            let imported = self.current_token.literal.clone();
            let mut local = imported.clone();
            if self.peek_is(TokenType::As) {
                self.next_token();
                if !self.expect_peek_name("expected binding name after `as`") {
                    self.synchronize();
                    return None;
                }
                local = self.current_token.literal.clone();
            }
            specifiers.push(ImportSpecifier {
                local,
                imported: ImportedName::Named(imported),
                span: Span::new(start, self.current_token.end_position),
            });
            if self.peek_is(TokenType::Comma) {
                self.next_token();
            } else if !self.expect_peek(TokenType::RBrace, "expected `,` or `}`") {
                self.synchronize();
                return None;
            } else {
                return Some(());
            }
        }
    }

    fn parse_export_declaration(&mut self) -> Option<Statement> {
        let start = self.current_token.position;

        if self.peek_is(TokenType::Default) {
            self.next_token();
            self.next_token();
            let value = self.parse_expression(Precedence::Lowest)?;
            let mut span = Span::new(start, self.current_token.end_position);
            self.eat_optional_semicolon();
            span.end = self.current_token.end_position;
            return Some(Statement::Export(ExportDeclaration::Default { value, span }));
        }

        if self.peek_is(TokenType::Const)
            || self.peek_is(TokenType::Let)
            || self.peek_is(TokenType::Var)
            || self.peek_is(TokenType::Function)
        {
            self.next_token();
            let declaration = self.parse_statement()?;
            let span = Span::new(start, self.current_token.end_position);
            return Some(Statement::Export(ExportDeclaration::Declaration {
                declaration: Box::new(declaration),
                span,
            }));
        }

        if !self.expect_peek(TokenType::LBrace, "expected export bindings") {
            self.synchronize();
            return None;
        }

        let mut specifiers = Vec::new();
        loop {
            if self.peek_is(TokenType::RBrace) {
                self.next_token();
                break;
            }
            if !self.expect_peek_name("expected export name") {
                self.synchronize();
                return None;
            }
            let spec_start = self.current_token.position;
            let local = self.current_token.literal.clone();
            let mut exported = local.clone();
            if self.peek_is(TokenType::As) {
                self.next_token();
                if !self.expect_peek_name("expected name after `as`") {
                    self.synchronize();
                    return None;
                }
                exported = self.current_token.literal.clone();
            }
            specifiers.push(ExportSpecifier {
                local,
                exported,
                span: Span::new(spec_start, self.current_token.end_position),
            });
            if self.peek_is(TokenType::Comma) {
                self.next_token();
            } else if !self.expect_peek(TokenType::RBrace, "expected `,` or `}`") {
                self.synchronize();
                return None;
            } else {
                break;
            }
        }

        let mut span = Span::new(start, self.current_token.end_position);
        self.eat_optional_semicolon();
        span.end = self.current_token.end_position;
        Some(Statement::Export(ExportDeclaration::Named { specifiers, span }))
    }

    fn parse_variable_declaration(&mut self, kind: DeclarationKind) -> Option<Statement> {
        let start = self.current_token.position;
        let mut declarators = Vec::new();

        loop {
            if !self.expect_peek_name("expected binding name") {
                self.synchronize();
                return None;
            }
            let name = self.current_token.literal.clone();
            let name_span = self.current_token.span();

            let init = if self.peek_is(TokenType::Assign) {
                self.next_token();
                self.next_token();
                Some(self.parse_expression(Precedence::Lowest)?)
            } else {
                None
            };

            let end = init
                .as_ref()
                .map(|expr| expr.span().end)
                .unwrap_or(name_span.end);
            declarators.push(Declarator {
                name,
                init,
                span: Span::new(name_span.start, end),
            });

            if self.peek_is(TokenType::Comma) {
                self.next_token();
            } else {
                break;
            }
        }

        let mut span = Span::new(start, self.current_token.end_position);
        self.eat_optional_semicolon();
        span.end = self.current_token.end_position;

        Some(Statement::Declaration {
            kind,
            declarators,
            span,
        })
    }

    fn parse_function_declaration(&mut self) -> Option<Statement> {
        let start = self.current_token.position;
        if !self.expect_peek_name("expected function name") {
            self.synchronize();
            return None;
        }
        let name = self.current_token.literal.clone();
        if !self.expect_peek(TokenType::LParen, "expected `(`") {
            self.synchronize();
            return None;
        }
        let parameters = self.parse_parameter_list()?;
        if !self.expect_peek(TokenType::LBrace, "expected function body") {
            self.synchronize();
            return None;
        }
        let body = self.parse_block()?;

        Some(Statement::Function {
            name,
            parameters,
            body,
            span: Span::new(start, self.current_token.end_position),
        })
    }

    /// `current_token` is on `(`; returns with it on `)`.
    pub(super) fn parse_parameter_list(&mut self) -> Option<Vec<String>> {
        let mut parameters = Vec::new();
        loop {
            if self.peek_is(TokenType::RParen) {
                self.next_token();
                return Some(parameters);
            }
            if !self.expect_peek_name("expected parameter name") {
                self.synchronize();
                return None;
            }
            parameters.push(self.current_token.literal.clone());
            if self.peek_is(TokenType::Comma) {
                self.next_token();
            } else if !self.expect_peek(TokenType::RParen, "expected `,` or `)`") {
                self.synchronize();
                return None;
            } else {
                return Some(parameters);
            }
        }
    }

    /// `current_token` is on `{`; returns with it on `}`.
    pub(super) fn parse_block(&mut self) -> Option<Block> {
        let start = self.current_token.position;
        let mut statements = Vec::new();
        self.next_token();

        while !self.current_is(TokenType::RBrace) && !self.current_is(TokenType::Eof) {
            if let Some(statement) = self.parse_statement() {
                statements.push(statement);
            }
            self.next_token();
        }

        if !self.current_is(TokenType::RBrace) {
            let token = self.current_token.clone();
            self.error_at(&token, "expected `}` to close block");
            return None;
        }

        Some(Block::new(
            statements,
            Span::new(start, self.current_token.end_position),
        ))
    }

    fn parse_return_statement(&mut self) -> Option<Statement> {
        let start = self.current_token.position;

        if self.peek_is(TokenType::Semicolon) {
            self.next_token();
            return Some(Statement::Return {
                value: None,
                span: Span::new(start, self.current_token.end_position),
            });
        }
        if self.peek_is(TokenType::RBrace) || self.peek_is(TokenType::Eof) {
            return Some(Statement::Return {
                value: None,
                span: Span::new(start, self.current_token.end_position),
            });
        }

        self.next_token();
        let value = self.parse_expression(Precedence::Lowest)?;
        let mut span = Span::new(start, self.current_token.end_position);
        self.eat_optional_semicolon();
        span.end = self.current_token.end_position;

        Some(Statement::Return {
            value: Some(value),
            span,
        })
    }

    fn parse_if_statement(&mut self) -> Option<Statement> {
        let start = self.current_token.position;
        if !self.expect_peek(TokenType::LParen, "expected `(` after `if`") {
            self.synchronize();
            return None;
        }
        self.next_token();
        let condition = self.parse_expression(Precedence::Lowest)?;
        if !self.expect_peek(TokenType::RParen, "expected `)` after condition") {
            self.synchronize();
            return None;
        }
        if !self.expect_peek(TokenType::LBrace, "expected `{`") {
            self.synchronize();
            return None;
        }
        let consequence = self.parse_block()?;

        let alternative = if self.peek_is(TokenType::Else) {
            self.next_token();
            if self.peek_is(TokenType::If) {
                self.next_token();
                let nested = self.parse_if_statement()?;
                let nested_span = nested.span();
                Some(Block::new(vec![nested], nested_span))
            } else if self.expect_peek(TokenType::LBrace, "expected `{` after `else`") {
                Some(self.parse_block()?)
            } else {
                self.synchronize();
                return None;
            }
        } else {
            None
        };

        Some(Statement::If {
            condition,
            consequence,
            alternative,
            span: Span::new(start, self.current_token.end_position),
        })
    }

    fn parse_expression_statement(&mut self) -> Option<Statement> {
        let expression = self.parse_expression(Precedence::Lowest)?;
        let mut span = expression.span();
        if self.peek_is(TokenType::Semicolon) {
            self.next_token();
            span.end = self.current_token.end_position;
        }

        Some(Statement::Expression { expression, span })
    }
}
