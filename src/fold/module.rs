//! Module resolver: obtains a matched module's real exports.
//!
//! The ordinary synchronous load executes the file as
//! `require`/`module.exports` code. When that fails (the conventional
//! signal being ECMAScript-module syntax in the source), the resolver
//! normalizes the module and retries through the sandbox loader. Records
//! are rebuilt per import declaration; nothing is cached.

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::diagnostics::Diagnostic;
use crate::diagnostics::codes::{
    INVALID_REQUIRE_ARGUMENT, MODULE_LOAD_FAILED, MODULE_NOT_FOUND, MODULE_READ_FAILED,
    REQUIRE_DEPTH_EXCEEDED,
};
use crate::diagnostics::position::Span;
use crate::runtime::interpreter::Interpreter;
use crate::runtime::value::{NativeFunction, Value};
use crate::sandbox::SandboxLoader;
use crate::sandbox::context::ModuleContext;
use crate::sandbox::loader::{is_relative, probe_candidates, resolve_relative};
use crate::sandbox::normalize::Normalizer;

const MAX_REQUIRE_DEPTH: usize = 32;

/// One resolved module. `resolved` is the default-unwrapped form used for
/// namespace/default narrowing; `exports` is the raw exports value.
#[derive(Debug)]
pub struct ModuleRecord {
    pub path: PathBuf,
    pub exports: Value,
    pub resolved: Value,
}

pub struct ModuleResolver {
    module_roots: Rc<Vec<PathBuf>>,
    normalizer: Rc<dyn Normalizer>,
}

impl ModuleResolver {
    pub fn new(module_roots: Vec<PathBuf>, normalizer: Rc<dyn Normalizer>) -> Self {
        Self {
            module_roots: Rc::new(module_roots),
            normalizer,
        }
    }

    /// Resolve `specifier` to a file and produce its exports, or the fatal
    /// diagnostic that aborts the import's fold. `file`/`span` locate the
    /// import declaration being processed.
    pub fn resolve(
        &self,
        specifier: &str,
        base_dir: &Path,
        file: &str,
        span: Span,
    ) -> Result<ModuleRecord, Box<Diagnostic>> {
        let path = self.resolve_path(specifier, base_dir).ok_or_else(|| {
            Box::new(Diagnostic::make_error(
                &MODULE_NOT_FOUND,
                &[specifier],
                file,
                span,
            ))
        })?;

        let exports = match self.direct_load(&path) {
            Ok(exports) => exports,
            Err(direct_error) => {
                let loader = SandboxLoader::new(self.normalizer.clone());
                loader.load(&path).map_err(|sandbox_error| {
                    Box::new(
                        Diagnostic::make_error(
                            &MODULE_LOAD_FAILED,
                            &[specifier, &summary(&sandbox_error)],
                            file,
                            span,
                        )
                        .with_hint(format!("direct load failed: {}", summary(&direct_error))),
                    )
                })?
            }
        };

        let resolved = exports.unwrap_default();
        Ok(ModuleRecord {
            path,
            exports,
            resolved,
        })
    }

    fn resolve_path(&self, specifier: &str, base_dir: &Path) -> Option<PathBuf> {
        if is_relative(specifier) {
            resolve_relative(base_dir, specifier)
        } else {
            self.module_roots
                .iter()
                .find_map(|root| probe_candidates(root.join(specifier)))
        }
    }

    fn direct_load(&self, path: &Path) -> Result<Value, Box<Diagnostic>> {
        let state = Rc::new(DirectState {
            module_roots: self.module_roots.clone(),
            depth: Cell::new(0),
        });
        direct_load_module(&state, path)
    }
}

struct DirectState {
    module_roots: Rc<Vec<PathBuf>>,
    depth: Cell<usize>,
}

fn direct_load_module(state: &Rc<DirectState>, path: &Path) -> Result<Value, Box<Diagnostic>> {
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
    let result = direct_execute(state, path);
    state.depth.set(depth);
    result
}

fn direct_execute(state: &Rc<DirectState>, path: &Path) -> Result<Value, Box<Diagnostic>> {
    let file = path.display().to_string();

    let source = fs::read_to_string(path).map_err(|err| {
        Box::new(Diagnostic::make_error(
            &MODULE_READ_FAILED,
            &[&file, &err.to_string()],
            file.clone(),
            Span::default(),
        ))
    })?;

    let program = crate::syntax::parse_source(&source, &file)
        .map_err(|mut diagnostics| Box::new(diagnostics.remove(0)))?;

    let context = ModuleContext::new(direct_require(state, path));
    let interpreter = Interpreter::new(file);
    // Module syntax in the source errors out here, which is the signal to
    // fall back to the sandbox.
    interpreter.run_program(&program, &context.env)?;

    Ok(context.exports())
}

fn direct_require(state: &Rc<DirectState>, path: &Path) -> NativeFunction {
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

        let target = if is_relative(&specifier) {
            resolve_relative(&base_dir, &specifier)
        } else {
            state
                .module_roots
                .iter()
                .find_map(|root| probe_candidates(root.join(&specifier)))
        };
        let target = target.ok_or_else(|| {
            Box::new(Diagnostic::make_error(
                &MODULE_NOT_FOUND,
                &[&specifier],
                file.clone(),
                Span::default(),
            ))
        })?;

        direct_load_module(&state, &target)
    })
}

fn summary(diagnostic: &Diagnostic) -> String {
    diagnostic
        .message
        .clone()
        .unwrap_or_else(|| diagnostic.title.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::EsmNormalizer;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_root(label: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let root = std::env::temp_dir().join(format!("prefold_module_{}_{}", label, nanos));
        fs::create_dir_all(&root).expect("create temp root");
        root
    }

    fn resolver() -> ModuleResolver {
        ModuleResolver::new(Vec::new(), Rc::new(EsmNormalizer))
    }

    #[test]
    fn test_direct_load_of_commonjs_module() {
        let root = temp_root("cjs");
        fs::write(root.join("m.js"), "module.exports = { a: 1 };").unwrap();
        let record = resolver()
            .resolve("./m", &root, "app.js", Span::default())
            .expect("resolve");
        assert_eq!(
            record.exports.get_member("a"),
            Some(Value::Number(1.0))
        );
    }

    #[test]
    fn test_esm_module_falls_back_to_sandbox() {
        let root = temp_root("esm");
        fs::write(root.join("m.js"), "export const a = 2;").unwrap();
        let record = resolver()
            .resolve("./m.js", &root, "app.js", Span::default())
            .expect("resolve");
        assert_eq!(
            record.exports.get_member("a"),
            Some(Value::Number(2.0))
        );
    }

    #[test]
    fn test_default_unwrap_at_module_root() {
        let root = temp_root("default");
        fs::write(root.join("m.js"), "export default { k: 3 };").unwrap();
        let record = resolver()
            .resolve("./m", &root, "app.js", Span::default())
            .expect("resolve");
        assert_eq!(record.resolved.get_member("k"), Some(Value::Number(3.0)));
    }

    #[test]
    fn test_missing_module_is_not_found() {
        let root = temp_root("missing");
        let err = resolver()
            .resolve("./absent", &root, "app.js", Span::default())
            .unwrap_err();
        assert_eq!(err.code(), Some("E010"));
    }

    #[test]
    fn test_bare_specifier_uses_module_roots() {
        let root = temp_root("roots");
        let vendor = root.join("vendor");
        fs::create_dir_all(vendor.join("units")).unwrap();
        fs::write(vendor.join("units/index.js"), "exports.m = 1000;").unwrap();
        let resolver = ModuleResolver::new(vec![vendor], Rc::new(EsmNormalizer));
        let record = resolver
            .resolve("units", &root, "app.js", Span::default())
            .expect("resolve");
        assert_eq!(record.exports.get_member("m"), Some(Value::Number(1000.0)));
    }

    #[test]
    fn test_unreadable_chain_is_load_failure() {
        let root = temp_root("chain");
        fs::write(root.join("m.js"), "import { x } from './gone';\nexport const a = x;").unwrap();
        let err = resolver()
            .resolve("./m", &root, "app.js", Span::default())
            .unwrap_err();
        assert_eq!(err.code(), Some("E011"));
    }

    #[test]
    fn test_require_cycle_hits_depth_guard() {
        let root = temp_root("cycle");
        fs::write(root.join("a.js"), "import { b } from './b';\nexport const a = 1;").unwrap();
        fs::write(root.join("b.js"), "import { a } from './a';\nexport const b = 2;").unwrap();
        let err = resolver()
            .resolve("./a", &root, "app.js", Span::default())
            .unwrap_err();
        assert_eq!(err.code(), Some("E011"));
        assert!(
            err.message
                .as_deref()
                .unwrap_or_default()
                .contains("exceeded")
        );
    }
}
