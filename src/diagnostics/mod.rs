//! Diagnostics: error codes, the `Diagnostic` value, and terminal rendering.

pub mod codes;
pub mod position;

pub use codes::{ErrorCode, format_message};
pub use position::{Position, Span};

use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    Config,
    Parse,
    Transform,
    Runtime,
}

impl ErrorType {
    fn label(self) -> &'static str {
        match self {
            ErrorType::Config => "Config error",
            ErrorType::Parse => "Parse error",
            ErrorType::Transform => "Transform error",
            ErrorType::Runtime => "Runtime error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub title: String,
    pub code: Option<String>,
    pub error_type: Option<ErrorType>,
    pub message: Option<String>,
    pub file: Option<String>,
    pub span: Option<Span>,
    pub hints: Vec<String>,
}

impl Diagnostic {
    pub fn error(title: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            title: title.into(),
            code: None,
            error_type: None,
            message: None,
            file: None,
            span: None,
            hints: Vec::new(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_error_type(mut self, error_type: ErrorType) -> Self {
        self.error_type = Some(error_type);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    /// Builder from an `ErrorCode` specification.
    pub fn make_error(
        err_spec: &'static ErrorCode,
        values: &[&str],
        file: impl Into<String>,
        span: Span,
    ) -> Self {
        let message = format_message(err_spec.message, values);

        let mut diag = Diagnostic::error(err_spec.title)
            .with_code(err_spec.code)
            .with_error_type(err_spec.error_type)
            .with_file(file)
            .with_span(span)
            .with_message(message);

        if let Some(hint) = err_spec.hint {
            diag = diag.with_hint(hint);
        }

        diag
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn set_file(&mut self, file: impl Into<String>) {
        self.file = Some(file.into());
    }

    /// Render for a terminal. Carets under the span when `source` is given.
    /// Color is suppressed when NO_COLOR is set.
    pub fn render(&self, source: Option<&str>) -> String {
        let mut out = String::new();
        let use_color = env::var_os("NO_COLOR").is_none();
        let yellow = "\u{1b}[33m";
        let red = "\u{1b}[31m";
        let reset = "\u{1b}[0m";

        let code = self.code.as_deref().unwrap_or("E000");
        let label = self
            .error_type
            .map(ErrorType::label)
            .unwrap_or(match self.severity {
                Severity::Error => "Error",
                Severity::Warning => "Warning",
            });

        if use_color {
            out.push_str(yellow);
        }
        out.push_str(&format!(
            "-- {}: {} [{}]\n",
            label,
            self.title.to_lowercase(),
            code
        ));
        if use_color {
            out.push_str(reset);
        }

        if let Some(message) = &self.message {
            out.push('\n');
            out.push_str(message);
            out.push('\n');
        }

        if let Some(span) = self.span {
            let file = self.file.as_deref().unwrap_or("<unknown>");
            out.push('\n');
            out.push_str(&format!(
                "  --> {}:{}:{}\n",
                file,
                span.start.line,
                span.start.column + 1
            ));

            if let Some(line_text) = source.and_then(|src| source_line(src, span.start.line)) {
                let line_no = span.start.line;
                let width = line_no.to_string().len();
                let line_len = line_text.len();
                let caret_start = span.start.column.min(line_len);
                let caret_end = if span.end.line == span.start.line {
                    span.end.column.min(line_len).max(caret_start + 1)
                } else {
                    line_len.max(caret_start + 1)
                };

                out.push_str(&format!("{:>width$} |\n", "", width = width));
                out.push_str(&format!("{:>width$} | {}\n", line_no, line_text, width = width));
                out.push_str(&format!(
                    "{:>width$} | {}",
                    "",
                    " ".repeat(caret_start),
                    width = width
                ));
                if use_color {
                    out.push_str(red);
                }
                out.push_str(&"^".repeat(caret_end - caret_start));
                if use_color {
                    out.push_str(reset);
                }
                out.push('\n');
            }
        }

        if !self.hints.is_empty() {
            out.push_str("\nHint:\n");
            for hint in &self.hints {
                out.push_str(&format!("  {}\n", hint));
            }
        }

        out
    }
}

pub fn render_diagnostics(diagnostics: &[Diagnostic], source: Option<&str>) -> String {
    diagnostics
        .iter()
        .map(|diag| diag.render(source))
        .collect::<Vec<_>>()
        .join("\n")
}

fn source_line(source: &str, line: usize) -> Option<&str> {
    if line == 0 {
        return None;
    }
    source.lines().nth(line - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_error_fills_template() {
        let diag = Diagnostic::make_error(
            &codes::MISSING_EXPORT,
            &["colors", "rgba"],
            "app.js",
            Span::default(),
        );
        assert_eq!(diag.code(), Some("E014"));
        assert_eq!(
            diag.message.as_deref(),
            Some("Module `colors` has no export named `rgba`.")
        );
        assert_eq!(diag.error_type, Some(ErrorType::Transform));
        assert_eq!(diag.file.as_deref(), Some("app.js"));
    }

    #[test]
    fn test_render_without_source_still_names_location() {
        let span = Span::new(Position::new(2, 4), Position::new(2, 9));
        let diag = Diagnostic::make_error(&codes::MODULE_NOT_FOUND, &["./x"], "main.js", span);
        let rendered = diag.render(None);
        assert!(rendered.contains("main.js:2:5"));
        assert!(rendered.contains("[E010]"));
    }
}
