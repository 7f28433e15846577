//! CLI application for household food basket report extraction.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{Preset, batch, config, extract, fetch, tables};

/// Household food basket - Extract per-area food prices from monthly PDF reports
#[derive(Parser)]
#[command(name = "basket")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Built-in configuration used when no config file is found
    #[arg(long, global = true, value_enum, default_value = "default")]
    preset: Preset,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract basket records from a single report
    Extract(extract::ExtractArgs),

    /// Extract records from many reports in parallel
    Batch(batch::BatchArgs),

    /// List every table detected in a report with its score
    Tables(tables::TablesArgs),

    /// Download the latest report from the publisher
    Fetch(fetch::FetchArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Extract(args) => extract::run(args, config::load(config_path, cli.preset)?).await,
        Commands::Batch(args) => batch::run(args, config::load(config_path, cli.preset)?).await,
        Commands::Tables(args) => tables::run(args, config::load(config_path, cli.preset)?).await,
        Commands::Fetch(args) => fetch::run(args, config::load(config_path, cli.preset)?).await,
        Commands::Config(args) => config::run(args, cli.preset).await,
    }
}
