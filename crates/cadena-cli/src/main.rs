//! Cadena CLI - build, inspect, render and run signal chains.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cadena")]
#[command(author, version, about = "Cadena signal-chain CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available modules and their controls
    Modules(commands::modules::ModulesArgs),

    /// Show a chain's topology, ports and latency
    Info(commands::info::InfoArgs),

    /// Render a chain offline to a WAV file
    Render(commands::render::RenderArgs),

    /// Run a chain on the audio devices
    Realtime(commands::realtime::RealtimeArgs),

    /// List audio devices
    Devices(commands::devices::DevicesArgs),
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so `--json` output stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Modules(args) => commands::modules::run(args),
        Commands::Info(args) => commands::info::run(args),
        Commands::Render(args) => commands::render::run(args),
        Commands::Realtime(args) => commands::realtime::run(args),
        Commands::Devices(args) => commands::devices::run(args),
    }
}
