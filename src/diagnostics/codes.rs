//! Registry of every error the engine can report.
//!
//! Message templates use `{}` placeholders filled in order by
//! `format_message`. Codes are stable; new errors get new codes.

use super::ErrorType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCode {
    pub code: &'static str,
    pub title: &'static str,
    pub error_type: ErrorType,
    pub message: &'static str,
    pub hint: Option<&'static str>,
}

pub const MISSING_FOLD_PATTERN: ErrorCode = ErrorCode {
    code: "E001",
    title: "MISSING FOLD PATTERN",
    error_type: ErrorType::Config,
    message: "No fold target pattern is configured.",
    hint: Some(
        "Pass at least one pattern with --name, or set \"name\" in the config file. A pattern is a source-specifier prefix, or a regular expression written /like-this/.",
    ),
};

pub const INVALID_FOLD_PATTERN: ErrorCode = ErrorCode {
    code: "E002",
    title: "INVALID FOLD PATTERN",
    error_type: ErrorType::Config,
    message: "Cannot parse fold pattern `{}`: {}.",
    hint: Some("Regular-expression patterns must be valid regex syntax between the slashes."),
};

pub const INVALID_CONFIG: ErrorCode = ErrorCode {
    code: "E003",
    title: "INVALID CONFIG",
    error_type: ErrorType::Config,
    message: "Cannot read configuration from `{}`: {}.",
    hint: Some("The config file must be JSON, e.g. {\"name\": [\"colors/\"], \"moduleRoots\": [\"vendor\"]}."),
};

pub const MODULE_NOT_FOUND: ErrorCode = ErrorCode {
    code: "E010",
    title: "MODULE NOT FOUND",
    error_type: ErrorType::Transform,
    message: "Cannot resolve module `{}` to a file.",
    hint: Some(
        "Relative specifiers resolve against the importing file; bare specifiers are probed under the configured module roots as `name`, `name.js`, or `name/index.js`.",
    ),
};

pub const MODULE_LOAD_FAILED: ErrorCode = ErrorCode {
    code: "E011",
    title: "MODULE LOAD FAILED",
    error_type: ErrorType::Transform,
    message: "Module `{}` produced no exports: {}.",
    hint: Some("Both the direct load and the sandboxed fallback failed; folding is all-or-nothing for a matched import."),
};

pub const MODULE_READ_FAILED: ErrorCode = ErrorCode {
    code: "E012",
    title: "MODULE READ FAILED",
    error_type: ErrorType::Transform,
    message: "Cannot read module source `{}`: {}.",
    hint: None,
};

pub const MODULE_NORMALIZE_FAILED: ErrorCode = ErrorCode {
    code: "E013",
    title: "MODULE NORMALIZE FAILED",
    error_type: ErrorType::Transform,
    message: "Cannot normalize module source `{}` into loadable form.",
    hint: Some("The module-syntax normalizer returned nothing; the source may not parse."),
};

pub const MISSING_EXPORT: ErrorCode = ErrorCode {
    code: "E014",
    title: "MISSING EXPORT",
    error_type: ErrorType::Transform,
    message: "Module `{}` has no export named `{}`.",
    hint: Some("Matched modules must export every name the import declaration binds."),
};

pub const MISSING_MEMBER: ErrorCode = ErrorCode {
    code: "E015",
    title: "MISSING MEMBER",
    error_type: ErrorType::Transform,
    message: "Property `{}` does not exist on the {} being narrowed.",
    hint: Some("Every member step in a folded access chain must name a real property of the current value."),
};

pub const NOT_CALLABLE: ErrorCode = ErrorCode {
    code: "E016",
    title: "NOT CALLABLE",
    error_type: ErrorType::Transform,
    message: "Cannot call a {}; the access chain expected a function here.",
    hint: None,
};

pub const UNSUPPORTED_REFERENCE: ErrorCode = ErrorCode {
    code: "E017",
    title: "UNSUPPORTED REFERENCE",
    error_type: ErrorType::Transform,
    message: "Import binding `{}` is used in a shape the folder does not recognize.",
    hint: Some(
        "Supported shapes are member/call chains (`mod.a(1).b`) and variable initializers (`const x = mod`). Anything else aborts the pass rather than risk a wrong fold.",
    ),
};

pub const UNSERIALIZABLE_VALUE: ErrorCode = ErrorCode {
    code: "E018",
    title: "UNSERIALIZABLE VALUE",
    error_type: ErrorType::Transform,
    message: "A folded result of type {} cannot be written back as a literal.",
    hint: Some("Folded calls must produce plain data: strings, finite numbers, booleans, null, arrays, or objects."),
};

pub const REQUIRE_DEPTH_EXCEEDED: ErrorCode = ErrorCode {
    code: "E019",
    title: "REQUIRE DEPTH EXCEEDED",
    error_type: ErrorType::Transform,
    message: "Sandboxed require chain exceeded {} nested loads while loading `{}`.",
    hint: Some("Module loads are not memoized, so a require cycle cannot terminate."),
};

pub const INVALID_REQUIRE_ARGUMENT: ErrorCode = ErrorCode {
    code: "E020",
    title: "INVALID REQUIRE ARGUMENT",
    error_type: ErrorType::Transform,
    message: "require() expects a string specifier, got {}.",
    hint: None,
};

pub const UNEXPECTED_TOKEN: ErrorCode = ErrorCode {
    code: "E030",
    title: "UNEXPECTED TOKEN",
    error_type: ErrorType::Parse,
    message: "Unexpected token `{}`: {}.",
    hint: None,
};

pub const UNTERMINATED_STRING: ErrorCode = ErrorCode {
    code: "E031",
    title: "UNTERMINATED STRING",
    error_type: ErrorType::Parse,
    message: "String literal is never closed.",
    hint: None,
};

pub const UNDEFINED_VARIABLE: ErrorCode = ErrorCode {
    code: "E040",
    title: "UNDEFINED VARIABLE",
    error_type: ErrorType::Runtime,
    message: "`{}` is not defined.",
    hint: None,
};

pub const NOT_A_FUNCTION: ErrorCode = ErrorCode {
    code: "E041",
    title: "NOT A FUNCTION",
    error_type: ErrorType::Runtime,
    message: "Cannot call a value of type {}.",
    hint: None,
};

pub const BAD_OPERAND: ErrorCode = ErrorCode {
    code: "E042",
    title: "BAD OPERAND",
    error_type: ErrorType::Runtime,
    message: "Cannot apply `{}` to {} and {}.",
    hint: None,
};

pub const BAD_MEMBER_TARGET: ErrorCode = ErrorCode {
    code: "E043",
    title: "BAD MEMBER TARGET",
    error_type: ErrorType::Runtime,
    message: "Cannot read property `{}` of {}.",
    hint: None,
};

pub const BAD_ASSIGN_TARGET: ErrorCode = ErrorCode {
    code: "E044",
    title: "BAD ASSIGN TARGET",
    error_type: ErrorType::Runtime,
    message: "Invalid assignment target.",
    hint: None,
};

pub const BAD_INDEX: ErrorCode = ErrorCode {
    code: "E045",
    title: "BAD INDEX",
    error_type: ErrorType::Runtime,
    message: "Cannot index a {} with {}.",
    hint: None,
};

pub const BAD_UNARY_OPERAND: ErrorCode = ErrorCode {
    code: "E047",
    title: "BAD UNARY OPERAND",
    error_type: ErrorType::Runtime,
    message: "Cannot apply unary `{}` to {}.",
    hint: None,
};

pub const CALL_DEPTH_EXCEEDED: ErrorCode = ErrorCode {
    code: "E048",
    title: "CALL DEPTH EXCEEDED",
    error_type: ErrorType::Runtime,
    message: "Call stack exceeded {} frames.",
    hint: None,
};

pub const MODULE_SYNTAX_IN_SCRIPT: ErrorCode = ErrorCode {
    code: "E046",
    title: "MODULE SYNTAX IN SCRIPT",
    error_type: ErrorType::Runtime,
    message: "Direct load hit `{}` syntax; the module is only usable as ECMAScript-module source.",
    hint: None,
};

/// Fill `{}` placeholders in a template, in order. Extra values are ignored;
/// missing values leave the placeholder in place.
pub fn format_message(template: &str, values: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut index = 0;

    while let Some(at) = rest.find("{}") {
        out.push_str(&rest[..at]);
        match values.get(index) {
            Some(value) => out.push_str(value),
            None => out.push_str("{}"),
        }
        index += 1;
        rest = &rest[at + 2..];
    }
    out.push_str(rest);
    out
}
