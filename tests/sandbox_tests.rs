use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use prefold::config::FoldConfig;
use prefold::fold::fold_program_with;
use prefold::runtime::Value;
use prefold::sandbox::{EsmNormalizer, Normalizer, SandboxLoader};
use prefold::syntax::formatter::format_program;
use prefold::syntax::parse_source;

fn temp_root(label: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let root = std::env::temp_dir().join(format!("prefold_sandbox_tests_{}_{}", label, nanos));
    fs::create_dir_all(&root).expect("create temp root");
    root
}

fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    fs::write(path, contents).expect("write file");
}

fn loader() -> SandboxLoader {
    SandboxLoader::new(Rc::new(EsmNormalizer))
}

#[test]
fn esm_only_module_loads_through_sandbox() {
    let root = temp_root("esm_exports");
    write_file(
        &root.join("palette.js"),
        "\
export const main = '#222';
export function shade(name) { return main + '/' + name; }",
    );

    let exports = loader().load(&root.join("palette.js")).expect("load");
    assert_eq!(
        exports.get_member("main"),
        Some(Value::String("#222".to_string()))
    );
    assert!(exports.get_member("shade").is_some());
}

#[test]
fn nested_relative_imports_load_recursively() {
    let root = temp_root("nested");
    write_file(&root.join("base.js"), "export const unit = 8;");
    write_file(
        &root.join("spacing.js"),
        "\
import { unit } from './base';
export function gap(n) { return n * unit; }
export const doubled = unit * 2;",
    );

    let exports = loader().load(&root.join("spacing.js")).expect("load");
    assert_eq!(exports.get_member("doubled"), Some(Value::Number(16.0)));
}

#[test]
fn default_import_unwraps_nested_default_export() {
    let root = temp_root("interop");
    write_file(&root.join("config.js"), "export default { size: 4 };");
    write_file(
        &root.join("entry.js"),
        "\
import config from './config';
export const size = config.size;",
    );

    let exports = loader().load(&root.join("entry.js")).expect("load");
    assert_eq!(exports.get_member("size"), Some(Value::Number(4.0)));
}

#[test]
fn module_exports_reassignment_wins() {
    let root = temp_root("reassign");
    // Normalized ESM never reassigns module.exports, but hand-written
    // loadable source may; the sandbox honors it.
    write_file(&root.join("m.js"), "module.exports = { only: true };");

    let exports = loader().load(&root.join("m.js")).expect("load");
    assert_eq!(exports.get_member("only"), Some(Value::Boolean(true)));
}

#[test]
fn contexts_do_not_leak_between_loads() {
    let root = temp_root("isolation");
    write_file(&root.join("a.js"), "var shared = 1;\nexport const a = shared;");
    write_file(&root.join("b.js"), "export const b = typeofShared();");

    let sandbox = loader();
    let first = sandbox.load(&root.join("a.js")).expect("load a");
    assert_eq!(first.get_member("a"), Some(Value::Number(1.0)));

    // `b.js` cannot see `shared` from the previous load; it fails on its
    // own missing helper instead of observing leaked state.
    let err = sandbox.load(&root.join("b.js")).unwrap_err();
    assert_eq!(err.code(), Some("E040"));
}

#[test]
fn sibling_loads_with_same_names_stay_independent() {
    let root = temp_root("independent");
    write_file(&root.join("x.js"), "var shared = 'x';\nexport const tag = shared;");
    write_file(&root.join("y.js"), "var shared = 'y';\nexport const tag = shared;");
    write_file(
        &root.join("entry.js"),
        "\
import { tag as xTag } from './x';
import { tag as yTag } from './y';
export const combined = xTag + yTag;",
    );

    let exports = loader().load(&root.join("entry.js")).expect("load");
    assert_eq!(
        exports.get_member("combined"),
        Some(Value::String("xy".to_string()))
    );
}

#[test]
fn unreadable_entry_is_read_failure() {
    let root = temp_root("unreadable");
    let err = loader().load(&root.join("missing.js")).unwrap_err();
    assert_eq!(err.code(), Some("E012"));
}

#[test]
fn bare_specifier_inside_sandbox_is_not_resolved() {
    let root = temp_root("bare");
    write_file(&root.join("m.js"), "import { x } from 'some-package';\nexport const a = x;");
    let err = loader().load(&root.join("m.js")).unwrap_err();
    assert_eq!(err.code(), Some("E010"));
}

#[test]
fn self_require_cycle_hits_depth_guard() {
    let root = temp_root("self_cycle");
    write_file(&root.join("m.js"), "import { a } from './m';\nexport const a = 1;");
    let err = loader().load(&root.join("m.js")).unwrap_err();
    assert_eq!(err.code(), Some("E019"));
}

/// A normalizer that always declines, to pin down the failure mode when a
/// module can be neither directly loaded nor normalized.
struct NullNormalizer;

impl Normalizer for NullNormalizer {
    fn normalize(&self, _source: &str, _file: &str) -> Option<String> {
        None
    }
}

#[test]
fn normalizer_failure_is_a_module_load_failure() {
    let root = temp_root("null_normalizer");
    write_file(&root.join("m.js"), "export const a = 1;");

    let mut program =
        parse_source("import { a } from './m';\nconst x = a;\n", "app.js").expect("parse");
    let config = FoldConfig::from_patterns(["./m"]).expect("patterns");
    let err = fold_program_with(&mut program, &config, &root, "app.js", Rc::new(NullNormalizer))
        .expect_err("must fail");

    assert_eq!(err.code(), Some("E011"));
    assert!(err.hints.iter().any(|hint| hint.contains("direct load failed")));
}

#[test]
fn esm_module_folds_identically_to_loadable_module() {
    let root = temp_root("parity");
    write_file(
        &root.join("esm.js"),
        "export function rem(px) { return px / 16 + 'rem'; }",
    );
    write_file(
        &root.join("cjs.js"),
        "exports.rem = function (px) { return px / 16 + 'rem'; };",
    );

    let fold = |module: &str| {
        let source = format!("import {{ rem }} from './{}';\nconst v = rem(40);\n", module);
        let mut program = parse_source(&source, "app.js").expect("parse");
        let config = FoldConfig::from_patterns([format!("./{}", module)]).expect("patterns");
        prefold::fold::fold_program(&mut program, &config, &root, "app.js").expect("fold");
        format_program(&program)
    };

    assert_eq!(fold("esm"), fold("cjs"));
    assert_eq!(fold("esm"), "const v = \"2.5rem\";\n");
}
