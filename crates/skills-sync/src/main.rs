//! `skills-sync`: compiles canonical resources into client-native skill
//! packages and tracks drift against a per-client manifest (§4.10, §6).

use anyhow::Result;
use clap::{Parser, Subcommand};

mod adapter;
mod client;
mod commands;
mod config;
mod diff;
mod ir;
mod manifest;
mod output;
mod pipeline;
mod pull;
mod resources;
mod template;

use commands::{diff as diff_cmd, export, pull as pull_cmd};

#[derive(Parser)]
#[command(name = "skills-sync")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compiles canonical resources into client-native skill packages", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render canonical resources into one or more clients' skill format.
    Export(export::ExportArgs),
    /// Compare current registry + adapter output against saved manifests.
    Diff(diff_cmd::DiffArgs),
    /// Write patch + summary artifacts capturing local downstream edits.
    Pull(pull_cmd::PullArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Export(args) => export::run(args).await,
        Commands::Diff(args) => diff_cmd::run(args).await,
        Commands::Pull(args) => pull_cmd::run(args).await,
    };

    match exit_code {
        Ok(code) => {
            std::process::exit(code);
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    }
}
