//! Crawler module for listing harvesting
//!
//! This module contains the crawling logic, including:
//! - Filter panel automation and forward pagination
//! - The page-loop coordinator with bounded recovery
//! - The HTTP detail enrichment pass

mod coordinator;
mod details;
mod fetcher;
mod filters;
mod pagination;

pub use coordinator::{Coordinator, CrawlReport};
pub use details::{DetailPass, DetailReport};
pub use fetcher::{build_http_client, fetch_page, FetchResult};
pub use filters::{FilterController, FilterTarget};
pub use pagination::PaginationWalker;

use crate::config::Config;
use crate::session::ChromiumFactory;
use crate::store::IncrementalStore;
use crate::Result;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Which kind of run to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Merge every listed record into the dataset
    #[default]
    Catalog,
    /// Flag records by filter tag
    Tags,
    /// Fill detail columns from each record's page
    Details,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Catalog => write!(f, "catalog"),
            RunMode::Tags => write!(f, "tags"),
            RunMode::Details => write!(f, "details"),
        }
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "catalog" => Ok(RunMode::Catalog),
            "tags" => Ok(RunMode::Tags),
            "details" => Ok(RunMode::Details),
            other => Err(format!(
                "unknown mode '{}' (expected catalog, tags or details)",
                other
            )),
        }
    }
}

/// Outcome of any run mode
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Crawl(CrawlReport),
    Details(DetailReport),
}

/// Opens the configured dataset
pub fn open_store(config: &Config) -> Result<IncrementalStore> {
    Ok(IncrementalStore::open(
        Path::new(&config.storage.input_path),
        Path::new(&config.storage.output_path),
        config.storage.dedup_key,
    )?)
}

/// Runs one harvest against the live site
///
/// This is the main entry point. Browser modes launch Chromium through
/// [`ChromiumFactory`]; the detail mode only uses HTTP.
///
/// # Example
///
/// ```no_run
/// use listing_harvester::config::load_config;
/// use listing_harvester::crawler::{run, RunMode};
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// run(config, RunMode::Catalog).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run(config: Config, mode: RunMode) -> Result<RunOutcome> {
    let mut store = open_store(&config)?;

    match mode {
        RunMode::Details => {
            let pass = DetailPass::new(&config)?;
            Ok(RunOutcome::Details(pass.run(&mut store).await?))
        }
        RunMode::Catalog | RunMode::Tags => {
            let factory = Box::new(ChromiumFactory);
            let mut coordinator = Coordinator::new(config, factory, store)?;
            let report = if mode == RunMode::Tags {
                coordinator.run_tags().await?
            } else {
                coordinator.run_catalog().await?
            };
            Ok(RunOutcome::Crawl(report))
        }
    }
}
