use crate::diagnostics::position::{Position, Span};
use crate::syntax::token_type::TokenType;

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub literal: String,
    pub position: Position,
    pub end_position: Position,
}

impl Token {
    pub fn new(
        token_type: TokenType,
        literal: impl Into<String>,
        position: Position,
        end_position: Position,
    ) -> Self {
        Self {
            token_type,
            literal: literal.into(),
            position,
            end_position,
        }
    }

    pub fn eof(position: Position) -> Self {
        Self::new(TokenType::Eof, "", position, position)
    }

    pub fn span(&self) -> Span {
        Span::new(self.position, self.end_position)
    }
}
