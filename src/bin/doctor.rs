//! Schema Doctor CLI
//!
//! Thin file-based front end over the consistency engine: reads a schema
//! document, runs one operation or the full pipeline, writes the result.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use schema_doctor::{ConsistencyEngine, EngineConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-doctor")]
#[command(about = "Validate, report on, repair and de-duplicate schema documents")]
struct Cli {
    /// Configuration file (layered over schema-doctor.toml and SCHEMA_DOCTOR__*)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report undefined slot and enum references
    Validate {
        file: PathBuf,
    },

    /// Print completeness counts as JSON
    Report {
        file: PathBuf,
    },

    /// Add commonly omitted slot definitions
    Repair {
        file: PathBuf,
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rename colliding slot definitions
    Dedupe {
        file: PathBuf,
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run dedupe, validation and repair in sequence
    Check {
        file: PathBuf,
        /// Output file for the processed document
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print a unified diff of the changes
        #[arg(long)]
        diff: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(2);
        }
    }
}

/// Returns whether the resulting document is valid
fn run(cli: Cli) -> Result<bool> {
    let config_path = cli.config.as_deref().map(|p| p.to_string_lossy().into_owned());
    let config = EngineConfig::load_from(config_path.as_deref()).context("loading configuration")?;
    let engine = ConsistencyEngine::new(&config);

    match cli.command {
        Commands::Validate { file } => {
            let outcome = engine.validate(&read(&file)?);
            if outcome.is_valid {
                println!("✅ {} - valid", file.display());
            } else {
                println!("❌ {} - {} error(s)", file.display(), outcome.errors.len());
                for error in &outcome.errors {
                    println!("   └─ {}", error);
                }
            }
            Ok(outcome.is_valid)
        }

        Commands::Report { file } => {
            let record = engine.report(&read(&file)?);
            println!("{}", record.to_json()?);
            Ok(record.report().is_some())
        }

        Commands::Repair { file, output } => {
            let text = read(&file)?;
            let outcome = engine.repair(&text);
            for entry in &outcome.log {
                eprintln!("🔧 {}", entry.description);
            }
            write(output.as_deref(), &outcome.text)?;
            Ok(engine.validate(&outcome.text).is_valid)
        }

        Commands::Dedupe { file, output } => {
            let outcome = engine.dedupe(&read(&file)?);
            for rename in &outcome.renames {
                eprintln!(
                    "🔧 line {}: '{}' -> '{}'",
                    rename.line, rename.original, rename.renamed
                );
            }
            write(output.as_deref(), &outcome.text)?;
            Ok(true)
        }

        Commands::Check { file, output, diff } => {
            let outcome = engine.process(&read(&file)?);

            println!("🔍 {}", file.display());
            for rename in &outcome.renames {
                println!(
                    "  renamed '{}' -> '{}' (line {})",
                    rename.original, rename.renamed, rename.line
                );
            }
            for entry in &outcome.repairs {
                println!("  {}", entry.description);
            }
            if outcome.is_valid() {
                println!("✅ valid");
            } else {
                println!("❌ {} error(s) remain", outcome.validation.errors.len());
                for error in &outcome.validation.errors {
                    println!("   └─ {}", error);
                }
            }

            if diff && outcome.changed() {
                println!();
                print!("{}", outcome.diff());
            }
            if let Some(path) = output {
                std::fs::write(&path, &outcome.text)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("✅ Written to {:?}", path);
            }
            Ok(outcome.is_valid())
        }
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn write(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, text).with_context(|| format!("writing {}", path.display())),
        None => {
            print!("{}", text);
            Ok(())
        }
    }
}
