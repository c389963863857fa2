//! Listing Harvester: an incremental crawler for paginated, filterable listings
//!
//! This crate drives a headless browser through a filterable results listing,
//! extracts one record per listing item, and maintains a deduplicated,
//! append-only CSV dataset across repeated runs.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod session;
pub mod state;
pub mod store;
pub mod url;

use thiserror::Error;

/// Main error type for harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Initial session setup failed: {0}")]
    FatalSetup(session::SessionFault),

    #[error("Giving up on page {page} after {attempts} attempts: {source}")]
    RetriesExhausted {
        page: u32,
        attempts: u32,
        source: session::SessionFault,
    },

    #[error("Persistence error: {0}")]
    Persistence(#[from] store::StoreError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },
}

/// Result type alias for harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use state::{CrawlPhase, CrawlState};
pub use store::{Dataset, DedupKey, IncrementalStore, ListingRecord};
