//! Mapping Compiler CLI
//!
//! Reads a mapping document, compiles it and writes the IR as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use schema_mapper::{Compiler, MappingDocument, MapperConfig, OutputFormat};
use serde_json::json;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mapping-compile")]
#[command(about = "Compile a mapping document into the mapping IR")]
struct Cli {
    /// Mapping document (JSON)
    input: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Config file, layered over mapper.toml and MAPPER__* variables
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write compact JSON
    #[arg(long)]
    compact: bool,

    /// Include diagnostics and unbuilt nodes in the output
    #[arg(long)]
    diagnostics: bool,

    /// Disable shared-value hoisting
    #[arg(long)]
    no_hoist: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = MapperConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
    if cli.compact {
        config.output.format = OutputFormat::Compact;
    }
    if cli.diagnostics {
        config.output.include_diagnostics = true;
    }
    if cli.no_hoist {
        config.compiler.hoist_shared = false;
    }

    let document = MappingDocument::load(&cli.input)
        .with_context(|| format!("reading {}", cli.input.display()))?;

    let compilation = Compiler::with_options(config.compiler.clone()).compile(&document);

    if !compilation.diagnostics.is_empty() {
        eprint!("{}", compilation.diagnostics);
    }

    let rendered = if config.output.include_diagnostics {
        config.output.format.render(&compilation)?
    } else {
        config.output.format.render(&compilation.output)?
    };

    match &cli.output {
        Some(path) => {
            std::fs::write(path, rendered).with_context(|| format!("writing {}", path.display()))?;
            let summary = json!({
                "mappings": compilation.output.mappings.len(),
                "sharedExpressions": compilation.output.shared_expressions.len(),
                "unbuilt": compilation.unbuilt.len(),
            });
            println!("✅ Compiled {} -> {} {}", cli.input.display(), path.display(), summary);
        }
        None => println!("{}", rendered),
    }

    Ok(())
}
