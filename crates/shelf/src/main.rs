//! shelf CLI - static documentation site tooling.
//!
//! Provides commands for:
//! - `sidebar`: Print sidebars generated from outlines
//! - `build`: Write the theme config consumed by the site framework
//! - `diagrams`: Render diagrams and keep them in sync with the site theme

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{BuildArgs, DiagramsArgs, SidebarArgs};
use error::CliError;
use output::Output;

/// shelf - static documentation site tooling.
#[derive(Parser)]
#[command(name = "shelf", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print generated sidebars as JSON.
    Sidebar(SidebarArgs),
    /// Write the theme config JSON.
    Build(BuildArgs),
    /// Render diagrams and re-render them on theme or content changes.
    Diagrams(DiagramsArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    let verbose = matches!(&cli.command, Commands::Diagrams(args) if args.verbose);

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Sidebar(args) => args.execute(),
        Commands::Build(args) => args.execute(),
        Commands::Diagrams(args) => run_async(args),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}

fn run_async(args: DiagramsArgs) -> Result<(), CliError> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(args.execute())
}
