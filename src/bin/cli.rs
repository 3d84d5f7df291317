//! Games collector CLI
//!
//! Local execution entry point.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use collector::{
    error::Result,
    models::Config,
    pipeline::{self, ReportFormat, RunOptions},
    services::GitHubClient,
    storage::LocalStorage,
    utils::http::{self, HttpFetcher},
};

/// Collects open-source games from curated lists
#[derive(Parser, Debug)]
#[command(
    name = "collector",
    version,
    about = "Open-source games collector"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch sources and merge new games into the dataset
    Collect {
        /// Only run this source (repeatable)
        #[arg(long = "source", value_name = "ID")]
        sources: Vec<String>,

        /// Maximum new entries accepted per source
        #[arg(long, value_name = "N")]
        max_new: Option<usize>,

        /// Do not look up repository metadata
        #[arg(long)]
        skip_enrichment: bool,

        /// Dataset to read and write (default: paths.dataset_file)
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Extra dataset whose entries count as already known
        #[arg(long, value_name = "PATH")]
        dataset: Option<PathBuf>,

        /// Fail if a dataset is missing or unreadable
        #[arg(long)]
        require_dataset: bool,

        /// Write a run report to this path
        #[arg(long, value_name = "PATH")]
        report: Option<PathBuf>,

        /// Report format: json or markdown
        #[arg(long, default_value = "json")]
        report_format: ReportFormat,
    },

    /// Validate the configuration file
    Validate,

    /// Show current dataset info
    Info {
        /// Dataset to inspect (default: paths.dataset_file)
        #[arg(long, value_name = "PATH")]
        dataset: Option<PathBuf>,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let storage = LocalStorage::new(std::env::current_dir()?);

    match cli.command {
        Command::Collect {
            sources,
            max_new,
            skip_enrichment,
            output,
            dataset,
            require_dataset,
            report,
            report_format,
        } => {
            let config = Config::load_or_default(&cli.config)?;
            config.validate()?;
            log::info!("Loaded configuration from {}", cli.config.display());

            let client = http::create_async_client(&config.crawler)?;
            let pages = HttpFetcher::new(client.clone());
            let api = GitHubClient::from_config(client, &config.github);

            let options = RunOptions {
                sources,
                max_new_per_source: max_new,
                skip_enrichment,
                output,
                dedup_dataset: dataset,
                require_dataset,
                report,
                report_format,
            };
            let outcome =
                pipeline::run_collector(&config, &options, &storage, &pages, &api).await?;

            log::info!(
                "Added {} games; dataset now holds {}",
                outcome.added.len(),
                outcome.dataset.count
            );
        }

        Command::Validate => {
            pipeline::run_validate(&cli.config)?;
            log::info!("All validations passed!");
        }

        Command::Info { dataset } => {
            let config = Config::load_or_default(&cli.config)?;
            let path = dataset.unwrap_or_else(|| PathBuf::from(&config.paths.dataset_file));
            pipeline::run_info(&storage, &path).await?;
        }
    }

    log::info!("Done!");

    Ok(())
}
