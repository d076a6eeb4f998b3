use crate::diagnostics::position::Span;
use crate::syntax::block::Block;
use crate::syntax::expression::{Expression, Property};
use crate::syntax::parser::{Parser, Precedence, precedence_of};
use crate::syntax::statement::Statement;
use crate::syntax::token_type::TokenType;

impl Parser {
    pub(super) fn parse_expression(&mut self, precedence: Precedence) -> Option<Expression> {
        let mut left = self.parse_prefix()?;

        while !self.peek_is(TokenType::Semicolon)
            && precedence < precedence_of(self.peek_token.token_type)
        {
            left = match self.peek_token.token_type {
                TokenType::LParen => {
                    self.next_token();
                    self.parse_call(left)?
                }
                TokenType::Dot => {
                    self.next_token();
                    self.parse_member(left)?
                }
                TokenType::LBracket => {
                    self.next_token();
                    self.parse_index(left)?
                }
                TokenType::Assign => {
                    self.next_token();
                    self.parse_assign(left)?
                }
                _ => {
                    self.next_token();
                    self.parse_infix(left)?
                }
            };
        }

        Some(left)
    }

    fn parse_prefix(&mut self) -> Option<Expression> {
        let span = self.current_token.span();
        match self.current_token.token_type {
            TokenType::Ident => {
                let name = self.current_token.literal.clone();
                if self.peek_is(TokenType::Arrow) {
                    self.next_token();
                    return self.parse_arrow_body(vec![name], span.start);
                }
                Some(Expression::Identifier { name, span })
            }
            TokenType::Number => {
                let literal = self.current_token.literal.clone();
                match literal.parse::<f64>() {
                    Ok(value) => Some(Expression::Number { value, span }),
                    Err(_) => {
                        let token = self.current_token.clone();
                        self.error_at(&token, "invalid number literal");
                        None
                    }
                }
            }
            TokenType::String => Some(Expression::String {
                value: self.current_token.literal.clone(),
                span,
            }),
            TokenType::True => Some(Expression::Boolean { value: true, span }),
            TokenType::False => Some(Expression::Boolean { value: false, span }),
            TokenType::Null => Some(Expression::Null { span }),
            TokenType::Bang | TokenType::Minus => {
                let operator = self.current_token.literal.clone();
                self.next_token();
                let right = self.parse_expression(Precedence::Prefix)?;
                let full = Span::new(span.start, right.span().end);
                Some(Expression::Prefix {
                    operator,
                    right: Box::new(right),
                    span: full,
                })
            }
            TokenType::LParen => self.parse_grouped_or_arrow(),
            TokenType::LBracket => self.parse_array(),
            TokenType::LBrace => self.parse_object(),
            TokenType::Function => self.parse_function_expression(),
            _ => {
                let token = self.current_token.clone();
                self.error_at(&token, "expected an expression");
                None
            }
        }
    }

    fn parse_infix(&mut self, left: Expression) -> Option<Expression> {
        let operator = self.current_token.literal.clone();
        let precedence = precedence_of(self.current_token.token_type);
        self.next_token();
        let right = self.parse_expression(precedence)?;
        let span = left.span().merge(right.span());
        Some(Expression::Infix {
            left: Box::new(left),
            operator,
            right: Box::new(right),
            span,
        })
    }

    fn parse_assign(&mut self, target: Expression) -> Option<Expression> {
        if !matches!(
            target,
            Expression::Identifier { .. } | Expression::Member { .. } | Expression::Index { .. }
        ) {
            let token = self.current_token.clone();
            self.error_at(&token, "invalid assignment target");
            return None;
        }
        self.next_token();
        let value = self.parse_expression(Precedence::Lowest)?;
        let span = target.span().merge(value.span());
        Some(Expression::Assign {
            target: Box::new(target),
            value: Box::new(value),
            span,
        })
    }

    /// `current_token` is on `(` following the callee.
    fn parse_call(&mut self, callee: Expression) -> Option<Expression> {
        let mut arguments = Vec::new();
        loop {
            if self.peek_is(TokenType::RParen) {
                self.next_token();
                break;
            }
            self.next_token();
            arguments.push(self.parse_expression(Precedence::Lowest)?);
            if self.peek_is(TokenType::Comma) {
                self.next_token();
            } else if !self.expect_peek(TokenType::RParen, "expected `,` or `)`") {
                return None;
            } else {
                break;
            }
        }
        let span = Span::new(callee.span().start, self.current_token.end_position);
        Some(Expression::Call {
            callee: Box::new(callee),
            arguments,
            span,
        })
    }

    fn parse_member(&mut self, object: Expression) -> Option<Expression> {
        if !self.expect_peek_name("expected property name after `.`") {
            return None;
        }
        let property = self.current_token.literal.clone();
        let span = Span::new(object.span().start, self.current_token.end_position);
        Some(Expression::Member {
            object: Box::new(object),
            property,
            span,
        })
    }

    fn parse_index(&mut self, object: Expression) -> Option<Expression> {
        self.next_token();
        let index = self.parse_expression(Precedence::Lowest)?;
        if !self.expect_peek(TokenType::RBracket, "expected `]`") {
            return None;
        }
        let span = Span::new(object.span().start, self.current_token.end_position);
        Some(Expression::Index {
            object: Box::new(object),
            index: Box::new(index),
            span,
        })
    }

    /// Disambiguates `(expr)` from `(a, b) => ...` by parsing the
    /// parenthesized list first and reinterpreting it when `=>` follows.
    fn parse_grouped_or_arrow(&mut self) -> Option<Expression> {
        let start = self.current_token.position;

        if self.peek_is(TokenType::RParen) {
            self.next_token();
            if !self.expect_peek(TokenType::Arrow, "expected `=>` after `()`") {
                return None;
            }
            return self.parse_arrow_body(Vec::new(), start);
        }

        let mut items = Vec::new();
        loop {
            self.next_token();
            items.push(self.parse_expression(Precedence::Lowest)?);
            if self.peek_is(TokenType::Comma) {
                self.next_token();
            } else if !self.expect_peek(TokenType::RParen, "expected `,` or `)`") {
                return None;
            } else {
                break;
            }
        }

        if self.peek_is(TokenType::Arrow) {
            let mut parameters = Vec::new();
            for item in &items {
                match item {
                    Expression::Identifier { name, .. } => parameters.push(name.clone()),
                    _ => {
                        let token = self.current_token.clone();
                        self.error_at(&token, "arrow parameters must be plain names");
                        return None;
                    }
                }
            }
            self.next_token();
            return self.parse_arrow_body(parameters, start);
        }

        if items.len() == 1 {
            return items.pop();
        }

        let token = self.current_token.clone();
        self.error_at(&token, "expected `=>` after parenthesized list");
        None
    }

    /// `current_token` is on `=>`. Arrows lower to function expressions;
    /// an expression body becomes a single `return`.
    fn parse_arrow_body(
        &mut self,
        parameters: Vec<String>,
        start: crate::diagnostics::Position,
    ) -> Option<Expression> {
        self.next_token();

        let body = if self.current_is(TokenType::LBrace) {
            self.parse_block()?
        } else {
            let value = self.parse_expression(Precedence::Lowest)?;
            let span = value.span();
            Block::new(
                vec![Statement::Return {
                    value: Some(value),
                    span,
                }],
                span,
            )
        };

        let span = Span::new(start, self.current_token.end_position);
        Some(Expression::Function {
            name: None,
            parameters,
            body,
            span,
        })
    }

    fn parse_array(&mut self) -> Option<Expression> {
        let start = self.current_token.position;
        let mut elements = Vec::new();

        loop {
            if self.peek_is(TokenType::RBracket) {
                self.next_token();
                break;
            }
            self.next_token();
            elements.push(self.parse_expression(Precedence::Lowest)?);
            if self.peek_is(TokenType::Comma) {
                self.next_token();
            } else if !self.expect_peek(TokenType::RBracket, "expected `,` or `]`") {
                return None;
            } else {
                break;
            }
        }

        Some(Expression::Array {
            elements,
            span: Span::new(start, self.current_token.end_position),
        })
    }

    fn parse_object(&mut self) -> Option<Expression> {
        let start = self.current_token.position;
        let mut properties = Vec::new();

        loop {
            if self.peek_is(TokenType::RBrace) {
                self.next_token();
                break;
            }

            let key = if self.peek_token.token_type.is_name_like()
                || self.peek_is(TokenType::String)
                || self.peek_is(TokenType::Number)
            {
                self.next_token();
                self.current_token.literal.clone()
            } else {
                self.error_at_peek("expected property key");
                return None;
            };
            let key_token_type = self.current_token.token_type;
            let key_span = self.current_token.span();

            let value = if self.peek_is(TokenType::Colon) {
                self.next_token();
                self.next_token();
                self.parse_expression(Precedence::Lowest)?
            } else if key_token_type.is_name_like() {
                Expression::Identifier {
                    name: key.clone(),
                    span: key_span,
                }
            } else {
                self.error_at_peek("expected `:` after property key");
                return None;
            };

            let span = Span::new(key_span.start, value.span().end);
            properties.push(Property { key, value, span });

            if self.peek_is(TokenType::Comma) {
                self.next_token();
            } else if !self.expect_peek(TokenType::RBrace, "expected `,` or `}`") {
                return None;
            } else {
                break;
            }
        }

        Some(Expression::Object {
            properties,
            span: Span::new(start, self.current_token.end_position),
        })
    }

    fn parse_function_expression(&mut self) -> Option<Expression> {
        let start = self.current_token.position;

        let name = if self.peek_token.token_type.is_name_like() {
            self.next_token();
            Some(self.current_token.literal.clone())
        } else {
            None
        };

        if !self.expect_peek(TokenType::LParen, "expected `(`") {
            return None;
        }
        let parameters = self.parse_parameter_list()?;
        if !self.expect_peek(TokenType::LBrace, "expected function body") {
            return None;
        }
        let body = self.parse_block()?;

        Some(Expression::Function {
            name,
            parameters,
            body,
            span: Span::new(start, self.current_token.end_position),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::lexer::Lexer;
    use crate::syntax::program::Program;

    fn parse(source: &str) -> Program {
        let mut parser = Parser::new(Lexer::new(source));
        let program = parser.parse_program();
        assert!(parser.errors.is_empty(), "parser errors: {:?}", parser.errors);
        program
    }

    fn first_expression(source: &str) -> Expression {
        let program = parse(source);
        match program.statements.into_iter().next() {
            Some(Statement::Expression { expression, .. }) => expression,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        let expr = first_expression("1 + 2 * 3;");
        assert_eq!(expr.to_string(), "1 + 2 * 3");
        let expr = first_expression("(1 + 2) * 3;");
        assert_eq!(expr.to_string(), "(1 + 2) * 3");
    }

    #[test]
    fn test_member_call_chain() {
        let expr = first_expression("mod.a(1).b('x').c;");
        let Expression::Member { object, property, .. } = expr else {
            panic!("expected member");
        };
        assert_eq!(property, "c");
        assert!(matches!(*object, Expression::Call { .. }));
    }

    #[test]
    fn test_object_literal_shorthand_and_keyword_keys() {
        let expr = first_expression("x = { a, default: 1, 'b c': 2 };");
        let Expression::Assign { value, .. } = expr else {
            panic!("expected assign");
        };
        let Expression::Object { properties, .. } = *value else {
            panic!("expected object");
        };
        let keys: Vec<&str> = properties.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "default", "b c"]);
        assert!(matches!(properties[0].value, Expression::Identifier { .. }));
    }

    #[test]
    fn test_arrow_function_lowering() {
        let expr = first_expression("(a, b) => a + b;");
        let Expression::Function {
            name,
            parameters,
            body,
            ..
        } = expr
        else {
            panic!("expected function");
        };
        assert_eq!(name, None);
        assert_eq!(parameters, vec!["a", "b"]);
        assert!(matches!(body.statements[0], Statement::Return { .. }));
    }

    #[test]
    fn test_single_param_arrow() {
        let expr = first_expression("x => x * 2;");
        let Expression::Function { parameters, .. } = expr else {
            panic!("expected function");
        };
        assert_eq!(parameters, vec!["x"]);
    }

    #[test]
    fn test_empty_arrow_params() {
        let expr = first_expression("() => 1;");
        assert!(matches!(expr, Expression::Function { .. }));
    }

    #[test]
    fn test_keyword_member_property() {
        let expr = first_expression("exports.default = 1;");
        let Expression::Assign { target, .. } = expr else {
            panic!("expected assign");
        };
        let Expression::Member { property, .. } = *target else {
            panic!("expected member");
        };
        assert_eq!(property, "default");
    }

    #[test]
    fn test_unary_and_logic() {
        let expr = first_expression("!a && -b || c;");
        assert_eq!(expr.to_string(), "!a && -b || c");
    }

    #[test]
    fn test_index_expression() {
        let expr = first_expression("xs[1 + 2];");
        assert!(matches!(expr, Expression::Index { .. }));
    }
}
