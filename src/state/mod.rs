//! State module for tracking crawl progress
//!
//! - `CrawlPhase`: the orchestrator's position in the page loop
//! - `CrawlState`: per-run counters, rebuilt on every run

mod crawl_state;

pub use crawl_state::{CrawlPhase, CrawlState};
