use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::{env, fs};

use prefold::config::FoldConfig;
use prefold::diagnostics::render_diagnostics;
use prefold::transform_source;

fn main() -> ExitCode {
    let mut args: Vec<String> = env::args().skip(1).collect();

    let verbose = args.iter().any(|arg| arg == "--verbose");
    let write_in_place = args.iter().any(|arg| arg == "--write");
    args.retain(|arg| arg != "--verbose" && arg != "--write");

    let names = match extract_values(&mut args, "--name") {
        Some(values) => values,
        None => return ExitCode::FAILURE,
    };
    let module_roots = match extract_values(&mut args, "--module-root") {
        Some(values) => values,
        None => return ExitCode::FAILURE,
    };
    let config_path = match extract_single(&mut args, "--config") {
        Ok(value) => value,
        Err(()) => return ExitCode::FAILURE,
    };
    let output_path = match extract_single(&mut args, "-o") {
        Ok(value) => value,
        Err(()) => return ExitCode::FAILURE,
    };

    let [input] = args.as_slice() else {
        print_help();
        return ExitCode::FAILURE;
    };
    let input = PathBuf::from(input);

    let mut config = if let Some(config_path) = &config_path {
        let text = match fs::read_to_string(config_path) {
            Ok(text) => text,
            Err(err) => {
                eprintln!("error: cannot read config `{}`: {}", config_path, err);
                return ExitCode::FAILURE;
            }
        };
        match FoldConfig::from_json(&text, config_path) {
            Ok(config) => config,
            Err(diagnostic) => {
                eprintln!("{}", diagnostic.render(None));
                return ExitCode::FAILURE;
            }
        }
    } else {
        FoldConfig::new()
    };

    for name in &names {
        if let Err(diagnostic) = config.add_pattern(name) {
            eprintln!("{}", diagnostic.render(None));
            return ExitCode::FAILURE;
        }
    }
    for root in module_roots {
        config.add_module_root(root);
    }

    let source = match fs::read_to_string(&input) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: cannot read `{}`: {}", input.display(), err);
            return ExitCode::FAILURE;
        }
    };

    let file = input.display().to_string();
    let base_dir = input.parent().unwrap_or(Path::new("."));

    match transform_source(&source, &file, base_dir, &config) {
        Ok(transformed) => {
            if verbose {
                eprintln!(
                    "{}: folded {} reference(s), retained {}, removed {} specifier(s) and {} import(s)",
                    file,
                    transformed.outcome.folded_references,
                    transformed.outcome.retained_references,
                    transformed.outcome.removed_specifiers,
                    transformed.outcome.removed_declarations,
                );
            }
            let destination = if write_in_place {
                Some(input.clone())
            } else {
                output_path.map(PathBuf::from)
            };
            match destination {
                Some(path) => {
                    if let Err(err) = fs::write(&path, transformed.code) {
                        eprintln!("error: cannot write `{}`: {}", path.display(), err);
                        return ExitCode::FAILURE;
                    }
                }
                None => print!("{}", transformed.code),
            }
            ExitCode::SUCCESS
        }
        Err(diagnostics) => {
            eprintln!("{}", render_diagnostics(&diagnostics, Some(&source)));
            ExitCode::FAILURE
        }
    }
}

/// Collect every `--flag value` pair, removing both from `args`.
fn extract_values(args: &mut Vec<String>, flag: &str) -> Option<Vec<String>> {
    let mut values = Vec::new();
    while let Some(at) = args.iter().position(|arg| arg == flag) {
        if at + 1 >= args.len() {
            eprintln!("error: {} expects a value", flag);
            return None;
        }
        values.push(args.remove(at + 1));
        args.remove(at);
    }
    Some(values)
}

fn extract_single(args: &mut Vec<String>, flag: &str) -> Result<Option<String>, ()> {
    let mut values = match extract_values(args, flag) {
        Some(values) => values,
        None => return Err(()),
    };
    if values.len() > 1 {
        eprintln!("error: {} given more than once", flag);
        return Err(());
    }
    Ok(values.pop())
}

fn print_help() {
    eprintln!("Usage: prefold <file.js> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --name <pattern>       fold target pattern: a source-specifier prefix,");
    eprintln!("                         or a regular expression written /like-this/");
    eprintln!("                         (repeatable)");
    eprintln!("  --config <file>        JSON config: {{\"name\": [...], \"moduleRoots\": [...]}}");
    eprintln!("  --module-root <dir>    directory probed for bare specifiers (repeatable)");
    eprintln!("  -o <file>              write output here instead of stdout");
    eprintln!("  --write                rewrite the input file in place");
    eprintln!("  --verbose              fold statistics on stderr");
}
