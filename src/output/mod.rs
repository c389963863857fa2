//! Output module for run reports and dataset statistics
//!
//! This module handles:
//! - Printing the end-of-run report
//! - Computing and printing dataset statistics

pub mod stats;

pub use stats::{compute_statistics, print_statistics, DatasetStatistics};

use crate::crawler::RunOutcome;

/// Prints a short end-of-run report to stdout
pub fn print_run_report(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Crawl(report) => {
            let elapsed = report.finished_at - report.started_at;
            println!("=== Crawl Report ===\n");
            println!("  Passes: {}", report.passes);
            println!("  Pages processed: {}", report.pages_processed);
            println!("  New entries: {}", report.new_records);
            println!("  Duration: {}s", elapsed.num_seconds());
        }
        RunOutcome::Details(report) => {
            let elapsed = report.finished_at - report.started_at;
            println!("=== Detail Report ===\n");
            println!("  Pending records: {}", report.pending);
            println!("  Enriched: {}", report.enriched);
            println!("  Unrecognised pages: {}", report.unrecognized);
            println!("  Failed fetches: {}", report.failed);
            println!("  Duration: {}s", elapsed.num_seconds());
        }
    }
}
