use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "homescout-cli")]
#[command(about = "Extract normalized property records from listing URLs and addresses")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract one listing and print its record as JSON
    Extract {
        /// Listing URL or free-text street address
        input: String,
        /// Override the overall deadline for this extraction
        #[arg(long)]
        deadline_secs: Option<u64>,
        /// Print the per-strategy attempt trace alongside the record
        #[arg(long)]
        report: bool,
    },
    /// Extract every input in a file (one per line) and print JSON lines
    Batch {
        /// Input file; blank lines and lines starting with `#` are skipped
        file: PathBuf,
        /// Maximum extractions in flight (defaults to the configured pool size)
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Show the address parts recoverable from a listing URL alone
    ParseUrl {
        url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = homescout_core::load_app_config_from_env()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Extract {
            input,
            deadline_secs,
            report,
        }) => commands::run_extract(&config, &input, deadline_secs, report).await?,
        Some(Commands::Batch { file, concurrency }) => {
            commands::run_batch(&config, &file, concurrency).await?;
        }
        Some(Commands::ParseUrl { url }) => commands::run_parse_url(&url)?,
        None => println!("homescout-cli: run with --help to list commands"),
    }

    Ok(())
}
