//! CLI application for schema-driven document field extraction.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use commands::{batch, config, correct, process, schema};

/// docfields - Extract typed, confidence-scored fields from OCR output
#[derive(Parser)]
#[command(name = "docfields")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract fields from a single document
    Process(process::ProcessArgs),

    /// Extract fields from many documents
    Batch(batch::BatchArgs),

    /// Apply human corrections to a stored result
    Correct(correct::CorrectArgs),

    /// Inspect and validate field schemas
    Schema(schema::SchemaArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // API keys may live in a .env file
    dotenvy::dotenv().ok();

    init_logging(cli.verbose, cli.log_format)?;

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Process(args) => process::run(args, config_path).await,
        Commands::Batch(args) => batch::run(args, config_path).await,
        Commands::Correct(args) => correct::run(args, config_path),
        Commands::Schema(args) => schema::run(args, config_path),
        Commands::Config(args) => config::run(args, config_path),
    }
}

/// `RUST_LOG` wins over the `-v` count.
fn init_logging(verbose: u8, format: LogFormat) -> anyhow::Result<()> {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish())?,
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
    }
    Ok(())
}
