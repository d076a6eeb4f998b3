use std::fmt::Write;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use std::{env, fs};

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use prefold::config::FoldConfig;
use prefold::transform_source;

fn fixture_root() -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let root = env::temp_dir().join(format!("prefold_bench_{}", nanos));
    fs::create_dir_all(&root).expect("create bench root");
    fs::write(
        root.join("units.js"),
        "\
export const base = 8;
export function gap(n) { return n * base + 'px'; }
export function pair(a, b) { return { x: a * base, y: b * base }; }
",
    )
    .expect("write bench module");
    root
}

fn build_source(references: usize) -> String {
    let mut source = String::from("import { gap, pair } from './units';\n");
    for i in 0..references {
        let _ = writeln!(source, "const g_{i} = gap({});", i % 50);
        let _ = writeln!(source, "const p_{i} = pair({}, {});", i % 10, i % 7);
    }
    source
}

fn bench_fold_pass(c: &mut Criterion) {
    let root = fixture_root();
    let config = FoldConfig::from_patterns(["./units"]).expect("patterns");
    let source = build_source(100);

    c.bench_function("fold_200_references", |b| {
        b.iter(|| {
            let transformed =
                transform_source(black_box(&source), "bench.js", &root, &config).expect("fold");
            black_box(transformed.code.len())
        })
    });
}

criterion_group!(benches, bench_fold_pass);
criterion_main!(benches);
