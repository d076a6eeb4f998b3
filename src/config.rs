//! Configuration surface: the `name` fold patterns plus module roots for
//! bare specifiers. Loadable from a JSON file or built up from CLI flags.

use std::path::PathBuf;

use serde::Deserialize;

use crate::diagnostics::Diagnostic;
use crate::diagnostics::codes::INVALID_CONFIG;
use crate::diagnostics::position::Span;
use crate::fold::pattern::FoldPattern;

#[derive(Debug, Default)]
pub struct FoldConfig {
    pub patterns: Vec<FoldPattern>,
    pub module_roots: Vec<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    name: Option<OneOrMany>,
    #[serde(default, rename = "moduleRoots")]
    module_roots: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl FoldConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from pattern strings, e.g. CLI `--name` values.
    pub fn from_patterns<I, S>(patterns: I) -> Result<Self, Box<Diagnostic>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = Self::new();
        for pattern in patterns {
            config.add_pattern(pattern.as_ref())?;
        }
        Ok(config)
    }

    /// Parse the JSON config surface:
    /// `{"name": "prefix" | ["prefix", "/re/"], "moduleRoots": [...]}`.
    pub fn from_json(text: &str, file: &str) -> Result<Self, Box<Diagnostic>> {
        let raw: RawConfig = serde_json::from_str(text).map_err(|err| {
            Box::new(Diagnostic::make_error(
                &INVALID_CONFIG,
                &[file, &err.to_string()],
                file,
                Span::default(),
            ))
        })?;

        let mut config = Self::new();
        match raw.name {
            Some(OneOrMany::One(pattern)) => config.add_pattern(&pattern)?,
            Some(OneOrMany::Many(patterns)) => {
                for pattern in &patterns {
                    config.add_pattern(pattern)?;
                }
            }
            None => {}
        }
        config.module_roots = raw.module_roots.into_iter().map(PathBuf::from).collect();
        Ok(config)
    }

    pub fn add_pattern(&mut self, text: &str) -> Result<(), Box<Diagnostic>> {
        self.patterns.push(FoldPattern::parse(text)?);
        Ok(())
    }

    pub fn add_module_root(&mut self, root: impl Into<PathBuf>) {
        self.module_roots.push(root.into());
    }
}
