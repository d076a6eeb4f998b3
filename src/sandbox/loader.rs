//! Sandboxed module loading: executes normalized module source in an
//! isolated context, with a `require` that resolves further relative
//! imports the same way. Used when the ordinary synchronous load fails.

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::diagnostics::Diagnostic;
use crate::diagnostics::codes::{
    INVALID_REQUIRE_ARGUMENT, MODULE_NOT_FOUND, MODULE_NORMALIZE_FAILED, MODULE_READ_FAILED,
    REQUIRE_DEPTH_EXCEEDED,
};
use crate::diagnostics::position::Span;
use crate::runtime::interpreter::Interpreter;
use crate::runtime::value::{NativeFunction, Value};
use crate::sandbox::context::ModuleContext;
use crate::sandbox::normalize::Normalizer;
use crate::syntax::parse_source;

/// Loads are not memoized, so a require cycle would re-execute forever;
/// the guard turns that into a module-resolution failure.
const MAX_REQUIRE_DEPTH: usize = 32;

pub struct SandboxLoader {
    state: Rc<LoaderState>,
}

struct LoaderState {
    normalizer: Rc<dyn Normalizer>,
    depth: Cell<usize>,
}

impl SandboxLoader {
    pub fn new(normalizer: Rc<dyn Normalizer>) -> Self {
        Self {
            state: Rc::new(LoaderState {
                normalizer,
                depth: Cell::new(0),
            }),
        }
    }

    /// Execute the module at `path` and return its exports value.
    pub fn load(&self, path: &Path) -> Result<Value, Box<Diagnostic>> {
        load_module(&self.state, path)
    }
}

fn load_module(state: &Rc<LoaderState>, path: &Path) -> Result<Value, Box<Diagnostic>> {
    let depth = state.depth.get();
    if depth >= MAX_REQUIRE_DEPTH {
        return Err(Box::new(Diagnostic::make_error(
            &REQUIRE_DEPTH_EXCEEDED,
            &[&MAX_REQUIRE_DEPTH.to_string(), &path.display().to_string()],
            path.display().to_string(),
            Span::default(),
        )));
    }
    state.depth.set(depth + 1);
    let result = execute_module(state, path);
    state.depth.set(depth);
    result
}

fn execute_module(state: &Rc<LoaderState>, path: &Path) -> Result<Value, Box<Diagnostic>> {
    let file = path.display().to_string();

    let source = fs::read_to_string(path).map_err(|err| {
        Box::new(Diagnostic::make_error(
            &MODULE_READ_FAILED,
            &[&file, &err.to_string()],
            file.clone(),
            Span::default(),
        ))
    })?;

    let normalized = state.normalizer.normalize(&source, &file).ok_or_else(|| {
        Box::new(Diagnostic::make_error(
            &MODULE_NORMALIZE_FAILED,
            &[&file],
            file.clone(),
            Span::default(),
        ))
    })?;

    let program =
        parse_source(&normalized, &file).map_err(|mut diagnostics| Box::new(diagnostics.remove(0)))?;

    // Fresh context per load; nested requires build their own.
    let context = ModuleContext::new(sandbox_require(state, path)).with_interop();
    let interpreter = Interpreter::new(file);
    interpreter.run_program(&program, &context.env)?;

    Ok(context.exports())
}

fn sandbox_require(state: &Rc<LoaderState>, path: &Path) -> NativeFunction {
    let state = state.clone();
    let base_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
    let file = path.display().to_string();

    NativeFunction::new("require", move |arguments| {
        let specifier = match arguments.first() {
            Some(Value::String(specifier)) => specifier.clone(),
            other => {
                let shown = other.map(Value::type_name).unwrap_or("nothing");
                return Err(Box::new(Diagnostic::make_error(
                    &INVALID_REQUIRE_ARGUMENT,
                    &[shown],
                    file.clone(),
                    Span::default(),
                )));
            }
        };

        if !is_relative(&specifier) {
            return Err(Box::new(Diagnostic::make_error(
                &MODULE_NOT_FOUND,
                &[&specifier],
                file.clone(),
                Span::default(),
            )));
        }

        let target = resolve_relative(&base_dir, &specifier).ok_or_else(|| {
            Box::new(Diagnostic::make_error(
                &MODULE_NOT_FOUND,
                &[&specifier],
                file.clone(),
                Span::default(),
            ))
        })?;

        load_module(&state, &target)
    })
}

pub(crate) fn is_relative(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../")
}

pub(crate) fn resolve_relative(base_dir: &Path, specifier: &str) -> Option<PathBuf> {
    probe_candidates(base_dir.join(specifier))
}

/// Probe `name`, `name.js`, `name/index.js`, in that order.
pub(crate) fn probe_candidates(stem: PathBuf) -> Option<PathBuf> {
    if stem.is_file() {
        return Some(stem);
    }
    // Append rather than `with_extension`, which would clobber a dotted stem.
    let mut appended = stem.clone().into_os_string();
    appended.push(".js");
    let with_extension = PathBuf::from(appended);
    if with_extension.is_file() {
        return Some(with_extension);
    }
    let index = stem.join("index.js");
    if index.is_file() {
        return Some(index);
    }
    None
}
