use clap::Parser;
use restringer_core::{DeobfuscateOptions, EngineError, Restringer};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Restringer - a JavaScript deobfuscator
#[derive(Parser, Debug)]
#[command(name = "restringer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Obfuscated script to process
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Run a dead-code elimination pass after deobfuscation
    #[arg(short, long)]
    clean: bool,

    /// Suppress banners; print the result to stdout only when no
    /// output file is given
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Emit debug-level diagnostics
    #[arg(short, long)]
    verbose: bool,

    /// Write the result to a file (defaults to <input>-deob.js)
    #[arg(short, long, value_name = "FILE", num_args = 0..=1, default_missing_value = "")]
    output: Option<String>,

    /// Maximum number of rewrite passes
    #[arg(short, long, value_name = "N", value_parser = parse_positive)]
    max_iterations: Option<usize>,
}

fn parse_positive(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("'{value}' is not a positive integer")),
    }
}

fn default_output_name(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());
    input.with_file_name(format!("{stem}-deob.js"))
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else if cli.quiet {
        tracing::Level::ERROR
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(default_level.into()))
        .with_writer(std::io::stderr)
        .init();

    let source = match std::fs::read_to_string(&cli.input) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: cannot read {}: {err}", cli.input.display());
            std::process::exit(1);
        }
    };
    info!(
        file = %cli.input.display(),
        bytes = source.len(),
        "loaded input script"
    );

    let mut options = DeobfuscateOptions {
        clean: cli.clean,
        ..DeobfuscateOptions::default()
    };
    if let Some(max_iterations) = cli.max_iterations {
        options.max_iterations = max_iterations;
    }

    let mut restringer = Restringer::with_options(source, options);
    let changed = match restringer.deobfuscate() {
        Ok(changed) => changed,
        Err(EngineError::Parse(err)) => {
            eprintln!("error: input is not parseable JavaScript: {err}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };
    if restringer.budget_exhausted() {
        info!("iteration budget was exhausted before reaching a fixpoint");
    }
    debug!(changed, "pipeline finished");

    if !cli.quiet {
        if changed {
            println!("Deobfuscated {}", cli.input.display());
        } else {
            println!("No obfuscation patterns resolved in {}", cli.input.display());
        }
    }

    match &cli.output {
        Some(path) => {
            let path = if path.is_empty() {
                default_output_name(&cli.input)
            } else {
                PathBuf::from(path)
            };
            if let Err(err) = std::fs::write(&path, restringer.script()) {
                eprintln!("error: cannot write {}: {err}", path.display());
                std::process::exit(1);
            }
            if !cli.quiet {
                println!("Wrote {}", path.display());
            }
        }
        None => {
            // Quiet mode prints the script itself; otherwise a labeled dump.
            if cli.quiet {
                print!("{}", restringer.script());
            } else {
                println!("{}", restringer.script());
            }
        }
    }
}
