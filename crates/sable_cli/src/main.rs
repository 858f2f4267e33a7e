//! Sable CLI — the command-line driver for the SystemVerilog front-end.
//!
//! Parses and elaborates the given source files, printing diagnostics in a
//! rustc-style format. Exits 0 when compilation produced no errors, 1 when
//! any error-severity diagnostic was emitted, and 2 on usage errors.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use sable_common::Interner;
use sable_diagnostics::{DiagnosticRenderer, DiagnosticSink, Severity, TerminalRenderer};
use sable_elaborate::{Compilation, CompilationOptions};
use sable_source::SourceDb;
use sable_syntax::{PreprocessorOptions, SyntaxTree};

/// Sable — a SystemVerilog front-end.
#[derive(Parser, Debug)]
#[command(name = "sable", version, about = "Sable SystemVerilog front-end")]
struct Cli {
    /// Source files to compile.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Add a directory to the include search path.
    #[arg(short = 'I', long = "include-dir", value_name = "DIR")]
    include_dirs: Vec<PathBuf>,

    /// Predefine a macro (`NAME` or `NAME=VALUE`).
    #[arg(short = 'D', long = "define", value_name = "NAME[=VALUE]")]
    defines: Vec<String>,

    /// Write the parsed syntax trees as JSON to the given file.
    #[arg(long = "ast-json", value_name = "FILE")]
    ast_json: Option<PathBuf>,

    /// Maximum depth of the instance hierarchy.
    #[arg(long, value_name = "DEPTH", default_value_t = 128)]
    max_instance_depth: u32,

    /// Maximum depth of nested include files.
    #[arg(long, value_name = "DEPTH", default_value_t = 32)]
    max_include_depth: u32,

    /// Stop at the first file that fails to parse (fuzzing mode).
    #[arg(long)]
    fail_fast: bool,

    /// Suppress diagnostic output; only the exit code reports status.
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut source_db = SourceDb::new();
    for dir in &cli.include_dirs {
        source_db.add_user_dir(dir);
    }

    let predefines = cli
        .defines
        .iter()
        .map(|define| match define.split_once('=') {
            Some((name, value)) => (name.to_string(), value.to_string()),
            None => (define.clone(), "1".to_string()),
        })
        .collect::<Vec<_>>();

    let interner = Interner::new();
    let sink = DiagnosticSink::new();

    let mut trees = Vec::new();
    for path in &cli.files {
        let file = match source_db.load_file(path) {
            Ok(file) => file,
            Err(err) => {
                eprintln!("error: cannot read {}: {err}", path.display());
                return ExitCode::from(1);
            }
        };
        let options = PreprocessorOptions {
            max_include_depth: cli.max_include_depth,
            predefines: predefines.clone(),
        };
        let tree = SyntaxTree::from_file(file, &mut source_db, &interner, &sink, options);
        let failed = sink.has_errors();
        trees.push(tree);
        if cli.fail_fast && failed {
            break;
        }
    }

    if let Some(path) = &cli.ast_json {
        let roots: Vec<_> = trees.iter().map(|tree| &tree.root).collect();
        match serde_json::to_string_pretty(&roots) {
            Ok(json) => {
                if let Err(err) = std::fs::write(path, json) {
                    eprintln!("error: cannot write {}: {err}", path.display());
                    return ExitCode::from(1);
                }
            }
            Err(err) => {
                eprintln!("error: cannot serialize AST: {err}");
                return ExitCode::from(1);
            }
        }
    }

    let options = CompilationOptions {
        max_instance_depth: cli.max_instance_depth,
    };
    let mut compilation = Compilation::new(&interner, &source_db, &sink, options);
    for tree in &trees {
        compilation.add_tree(tree);
    }
    compilation.root_instances();

    let diagnostics = sink.take_all();
    if !cli.quiet {
        let renderer = TerminalRenderer::new();
        for diag in &diagnostics {
            eprint!("{}", renderer.render(diag, &source_db));
        }
        let errors = diagnostics
            .iter()
            .filter(|d| d.severity >= Severity::Error)
            .count();
        let warnings = diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count();
        if errors > 0 || warnings > 0 {
            eprintln!("{errors} error(s), {warnings} warning(s)");
        }
    }

    if diagnostics.iter().any(|d| d.severity >= Severity::Error) {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}
