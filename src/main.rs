//! Listing Harvester main entry point
//!
//! This is the command-line interface for the incremental listing crawler.

use anyhow::Context;
use clap::Parser;
use listing_harvester::config::{load_config_with_hash, validate, Config};
use listing_harvester::crawler::{self, RunMode};
use listing_harvester::output::{compute_statistics, print_run_report, print_statistics};
use listing_harvester::store::{Dataset, DedupKey};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Listing Harvester: an incremental crawler for filterable listings
///
/// Walks a paginated, filterable results listing in a headless browser and
/// keeps a deduplicated CSV dataset up to date across runs.
#[derive(Parser, Debug)]
#[command(name = "harvest")]
#[command(version = "1.0.0")]
#[command(about = "An incremental crawler for paginated listings", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Run mode: catalog, tags or details
    #[arg(long, default_value = "catalog")]
    mode: RunMode,

    /// Override the dataset read at startup
    #[arg(long, value_name = "PATH")]
    input: Option<String>,

    /// Override the dataset written by the run
    #[arg(long, value_name = "PATH")]
    output: Option<String>,

    /// Override the dedup key: url or name+url
    #[arg(long, value_name = "KEY")]
    dedup_key: Option<DedupKey>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the effective settings without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics for the dataset and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e).context("invalid configuration");
        }
    };
    let config = apply_overrides(config, &cli)?;

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config, cli.mode);
        Ok(())
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_run(config, cli.mode).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("listing_harvester=info,warn"),
            1 => EnvFilter::new("listing_harvester=debug,info"),
            2 => EnvFilter::new("listing_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Applies command-line overrides and re-validates the result
fn apply_overrides(mut config: Config, cli: &Cli) -> anyhow::Result<Config> {
    if let Some(input) = &cli.input {
        config.storage.input_path = input.clone();
    }
    if let Some(output) = &cli.output {
        config.storage.output_path = output.clone();
    }
    if let Some(dedup_key) = cli.dedup_key {
        config.storage.dedup_key = dedup_key;
    }
    validate(&config).context("invalid command-line override")?;
    Ok(config)
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config, mode: RunMode) {
    println!("=== Listing Harvester Dry Run ===\n");

    println!("Run mode: {}", mode);

    println!("\nCrawler:");
    println!("  Base URL: {}", config.crawler.base_url);
    println!("  Max retries: {}", config.crawler.max_retries);
    println!(
        "  Inter-request delay: {}s",
        config.crawler.inter_request_delay_seconds
    );
    println!("  User agent: {}", config.crawler.user_agent);

    println!("\nBrowser:");
    println!(
        "  Viewport: {}x{}",
        config.browser.window_width, config.browser.window_height
    );
    println!(
        "  Page load timeout: {}s",
        config.browser.page_load_timeout_seconds
    );
    println!("  Script timeout: {}s", config.browser.script_timeout_seconds);
    println!("  Element wait: {}s", config.browser.element_wait_seconds);

    println!("\nStorage:");
    println!("  Input: {}", config.storage.input_path);
    println!("  Output: {}", config.storage.output_path);
    println!("  Dedup key: {}", config.storage.dedup_key);

    println!("\nFilter Groups ({}):", config.filter_groups.len());
    for group in &config.filter_groups {
        println!("  - {} ({} tags)", group.name, group.tags.len());
        for tag in &group.tags {
            println!("    * {} <- #{}", tag.name, tag.control_id);
        }
    }

    println!("\n✓ Configuration is valid");
    match mode {
        RunMode::Catalog => println!("✓ Would walk the listing once with every status enabled"),
        RunMode::Tags => println!(
            "✓ Would walk the listing {} times, once per tag",
            config.tag_names().len()
        ),
        RunMode::Details => println!("✓ Would fetch detail pages for records without details"),
    }
}

/// Handles the --stats mode: shows statistics for the dataset
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let path = Path::new(&config.storage.output_path);
    println!("Dataset: {}\n", path.display());

    let dataset = Dataset::load(path)
        .with_context(|| format!("failed to read dataset {}", path.display()))?;
    print_statistics(&compute_statistics(&dataset));

    Ok(())
}

/// Handles the main harvest operation
async fn handle_run(config: Config, mode: RunMode) -> anyhow::Result<()> {
    tracing::info!(
        "Starting {} run: {} -> {}",
        mode,
        config.storage.input_path,
        config.storage.output_path
    );

    match crawler::run(config, mode).await {
        Ok(outcome) => {
            tracing::info!("Run completed successfully");
            print_run_report(&outcome);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            Err(e.into())
        }
    }
}
