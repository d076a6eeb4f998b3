use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use prefold::config::FoldConfig;
use prefold::diagnostics::codes::MISSING_EXPORT;
use prefold::diagnostics::{Diagnostic, Position, Span};
use prefold::sandbox::{EsmNormalizer, Normalizer};
use prefold::syntax::formatter::format_program;
use prefold::syntax::parse_source;
use prefold::transform_source;

fn temp_root(label: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let root = std::env::temp_dir().join(format!("prefold_snapshot_tests_{}_{}", label, nanos));
    fs::create_dir_all(&root).expect("create temp root");
    root
}

fn strip_ansi(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\u{1b}' && chars.peek() == Some(&'[') {
            chars.next();
            for c in chars.by_ref() {
                if ('@'..='~').contains(&c) {
                    break;
                }
            }
            continue;
        }
        out.push(ch);
    }

    out
}

#[test]
fn formatter_output() {
    let source = "\
import d, { a as b } from 'mod'
const theme = { colors: { main: '#fff' }, sizes: [1, 2, 3] }
function pick(name) {
    if (name === 'main') { return theme.colors.main } else { return null }
}
export default pick
";
    let program = parse_source(source, "snap.js").expect("parse");
    insta::assert_snapshot!("formatter_output", format_program(&program));
}

#[test]
fn normalizer_output() {
    let source = "\
import base, { unit as u } from './base';
import * as helpers from './helpers';
export const gap = u * 2;
export default function spacing(n) { return n * u; }
";
    let normalized = EsmNormalizer.normalize(source, "mod.js").expect("normalize");
    insta::assert_snapshot!("normalizer_output", normalized);
}

#[test]
fn missing_export_diagnostic() {
    let span = Span::new(Position::new(2, 9), Position::new(2, 13));
    let diagnostic = Diagnostic::make_error(&MISSING_EXPORT, &["./colors", "rgba"], "app.js", span);
    insta::assert_snapshot!(
        "missing_export_diagnostic",
        strip_ansi(&diagnostic.render(None))
    );
}

#[test]
fn folded_program_output() {
    let root = temp_root("folded_program");
    fs::write(
        root.join("units.js"),
        "\
export const base = 8;
export function gap(n) { return n * base + 'px'; }
export function pair(a, b) { return { x: a * base, y: b * base }; }
",
    )
    .expect("write module");

    let source = "\
import { gap, pair } from './units';
const small = gap(1);
const frame = pair(2, 3);
function custom(n) {
    return gap(n);
}
";
    let transformed = transform_source(source, "app.js", Path::new(&root), &FoldConfig::from_patterns(["./units"]).expect("patterns"))
        .expect("transform");
    insta::assert_snapshot!("folded_program_output", transformed.code);
}
