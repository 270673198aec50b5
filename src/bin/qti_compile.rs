//! QTI Compile CLI
//!
//! Commands: compile, validate, expand, widgets
//! Documents and reports go to stdout, logs go to stderr.
//! Returns 2 on item failure, 1 on usage or I/O failure.

use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use qti_compiler::equivalence::matching_rules;
use qti_compiler::{expand, AssessmentItem, CompilerConfig, ItemCompiler, WidgetRegistry};

#[derive(Parser)]
#[command(name = "qti-compile")]
#[command(about = "QTI Compiler - declarative assessment items to QTI 3.0 XML")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile an item to a QTI document
    Compile {
        /// Item JSON file, or - for stdin
        #[arg(short, long)]
        input: PathBuf,

        /// Compiler config JSON
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Emit a JSON manifest with hashes instead of bare XML
        #[arg(long)]
        manifest: bool,
    },

    /// Validate an item without producing output
    Validate {
        /// Item JSON file, or - for stdin
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Show the accepted spellings of an answer
    Expand {
        value: String,
    },

    /// List registered widget types
    Widgets,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("qti_compiler=info,qti_compile=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn read_input(path: &Path) -> std::io::Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path)
    }
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("failed to encode output: {e}"),
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Compile { input, config, manifest } => {
            let config = match config {
                Some(path) => match CompilerConfig::load(&path) {
                    Ok(c) => c,
                    Err(e) => {
                        tracing::error!(path = %path.display(), error = %e, "failed to load config");
                        return ExitCode::FAILURE;
                    }
                },
                None => CompilerConfig::default(),
            };

            let json = match read_input(&input) {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!(input = %input.display(), error = %e, "failed to read item");
                    return ExitCode::FAILURE;
                }
            };

            let compiler = ItemCompiler::with_config(config);
            let result = AssessmentItem::from_json(&json).and_then(|item| {
                if manifest {
                    let compiled = compiler.compile_manifest(&item)?;
                    Ok(serde_json::to_string_pretty(&compiled)?)
                } else {
                    compiler.compile(&item)
                }
            });

            match result {
                Ok(out) => {
                    println!("{out}");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    print_json(&serde_json::json!({ "success": false, "error": e.to_string() }));
                    ExitCode::from(2)
                }
            }
        }

        Commands::Validate { input } => {
            let json = match read_input(&input) {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!(input = %input.display(), error = %e, "failed to read item");
                    return ExitCode::FAILURE;
                }
            };

            let compiler = ItemCompiler::new();
            match AssessmentItem::from_json(&json).and_then(|item| compiler.validate_item(&item)) {
                Ok(widgets) => {
                    print_json(&serde_json::json!({
                        "valid": true,
                        "widgets": widgets.keys().collect::<Vec<_>>(),
                    }));
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    print_json(&serde_json::json!({ "valid": false, "error": e.to_string() }));
                    ExitCode::from(2)
                }
            }
        }

        Commands::Expand { value } => {
            print_json(&serde_json::json!({
                "value": value,
                "rules": matching_rules(&value),
                "variants": expand(&value),
            }));
            ExitCode::SUCCESS
        }

        Commands::Widgets => {
            let widgets: Vec<_> = WidgetRegistry::global()
                .list()
                .iter()
                .map(|d| serde_json::json!({ "type": d.kind, "output": d.output }))
                .collect();
            print_json(&serde_json::Value::Array(widgets));
            ExitCode::SUCCESS
        }
    }
}
