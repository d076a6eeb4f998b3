pub mod config;
pub mod diagnostics;
pub mod fold;
pub mod runtime;
pub mod sandbox;
pub mod syntax;

use std::path::Path;

use crate::config::FoldConfig;
use crate::diagnostics::Diagnostic;
use crate::fold::FoldOutcome;
use crate::syntax::formatter::format_program;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformed {
    pub code: String,
    pub outcome: FoldOutcome,
}

/// Parse `source`, fold every matched import in place, and print the
/// result. `base_dir` anchors relative module specifiers (usually the
/// processed file's directory). A fatal diagnostic means no output: the
/// pass is all-or-nothing per file.
pub fn transform_source(
    source: &str,
    file: &str,
    base_dir: &Path,
    config: &FoldConfig,
) -> Result<Transformed, Vec<Diagnostic>> {
    let mut program = syntax::parse_source(source, file)?;
    let outcome = fold::fold_program(&mut program, config, base_dir, file)
        .map_err(|diagnostic| vec![*diagnostic])?;

    Ok(Transformed {
        code: format_program(&program),
        outcome,
    })
}
