//! Fold target patterns: which import sources the engine is allowed to
//! evaluate away.

use std::fmt;

use regex::Regex;

use crate::diagnostics::Diagnostic;
use crate::diagnostics::codes::INVALID_FOLD_PATTERN;
use crate::diagnostics::position::Span;

/// `/.../ ` is a regular expression; anything else is an exact prefix.
#[derive(Debug, Clone)]
pub enum FoldPattern {
    Prefix(String),
    Regex(Regex),
}

impl FoldPattern {
    pub fn parse(text: &str) -> Result<Self, Box<Diagnostic>> {
        if let Some(body) = text
            .strip_prefix('/')
            .and_then(|rest| rest.strip_suffix('/'))
            && !body.is_empty()
        {
            let regex = Regex::new(body).map_err(|err| {
                Box::new(Diagnostic::make_error(
                    &INVALID_FOLD_PATTERN,
                    &[text, &err.to_string()],
                    "<config>",
                    Span::default(),
                ))
            })?;
            return Ok(FoldPattern::Regex(regex));
        }
        Ok(FoldPattern::Prefix(text.to_string()))
    }

    pub fn matches(&self, specifier: &str) -> bool {
        match self {
            FoldPattern::Prefix(prefix) => specifier.starts_with(prefix.as_str()),
            FoldPattern::Regex(regex) => regex.is_match(specifier),
        }
    }
}

impl fmt::Display for FoldPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FoldPattern::Prefix(prefix) => write!(f, "{}", prefix),
            FoldPattern::Regex(regex) => write!(f, "/{}/", regex.as_str()),
        }
    }
}

pub fn any_match(patterns: &[FoldPattern], specifier: &str) -> bool {
    patterns.iter().any(|pattern| pattern.matches(specifier))
}
