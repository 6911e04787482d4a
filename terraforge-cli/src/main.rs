//! Terraforge CLI - Command-line interface
//!
//! This binary drives the terraforge library's documented surface: it
//! submits a polygon as a terrain job and polls the job store until the
//! artifacts are written.

use clap::{Parser, Subcommand};

mod commands;
mod error;

#[derive(Debug, Parser)]
#[command(name = "terraforge", version, about = "Textured 3D terrain models from drawn ground polygons")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate terrain artifacts for a polygon
    Generate(commands::generate::GenerateArgs),
    /// Print the supported service region and limits
    Region,
}

#[tokio::main]
async fn main() {
    terraforge::telemetry::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Generate(args) => commands::generate::run(args).await,
        Commands::Region => commands::region::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
