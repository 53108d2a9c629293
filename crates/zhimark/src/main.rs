//! zhimark CLI - markdown to Zhihu article HTML.
//!
//! Provides commands for:
//! - `render`: Render a note to platform HTML, uploading its images
//! - `localize`: Download a note's web images into the vault
//! - `typst-version`: Check the configured typesetter

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{LocalizeArgs, RenderArgs, TypstVersionArgs};
use output::Output;

/// zhimark - Markdown to Zhihu article HTML.
#[derive(Parser)]
#[command(name = "zhimark", version, about)]
struct Cli {
    /// Enable verbose output (stage and upload logs).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a markdown note to platform HTML.
    Render(RenderArgs),
    /// Save the web images of a note into the vault and embed the copies.
    Localize(LocalizeArgs),
    /// Print the version of the configured typesetter.
    TypstVersion(TypstVersionArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Render(args) => args.execute(),
        Commands::Localize(args) => args.execute(),
        Commands::TypstVersion(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
