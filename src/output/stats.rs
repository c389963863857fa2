//! Statistics generation from the dataset
//!
//! This module provides functionality for summarising a dataset file
//! and displaying the result.

use crate::store::Dataset;
use std::collections::BTreeMap;

/// Dataset statistics summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetStatistics {
    /// Total number of records
    pub total_records: usize,

    /// Lowest and highest id, if any records exist
    pub id_range: Option<(u64, u64)>,

    /// Count of records by status
    pub records_by_status: BTreeMap<String, usize>,

    /// Records with a real detail link
    pub records_with_url: usize,

    /// Flag count per tag column, in column order
    pub tag_counts: Vec<(String, usize)>,

    /// Records whose detail columns are filled
    pub records_with_details: usize,
}

/// Computes statistics for a dataset
pub fn compute_statistics(dataset: &Dataset) -> DatasetStatistics {
    let records = &dataset.records;

    let id_range = records
        .iter()
        .map(|r| r.id)
        .min()
        .zip(records.iter().map(|r| r.id).max());

    let mut records_by_status = BTreeMap::new();
    for record in records {
        *records_by_status.entry(record.status.clone()).or_insert(0) += 1;
    }

    let tag_counts = dataset
        .tag_columns
        .iter()
        .map(|tag| {
            let count = records.iter().filter(|r| r.has_tag(tag)).count();
            (tag.clone(), count)
        })
        .collect();

    DatasetStatistics {
        total_records: records.len(),
        id_range,
        records_by_status,
        records_with_url: records.iter().filter(|r| r.has_url()).count(),
        tag_counts,
        records_with_details: records.iter().filter(|r| r.details.is_some()).count(),
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &DatasetStatistics) {
    println!("=== Dataset Statistics ===\n");

    println!("Overview:");
    println!("  Total records: {}", stats.total_records);
    match stats.id_range {
        Some((low, high)) => println!("  Id range: {}..={}", low, high),
        None => println!("  Id range: (empty)"),
    }
    println!(
        "  Records with a detail link: {} ({:.1}%)",
        stats.records_with_url,
        percentage(stats.records_with_url, stats.total_records)
    );
    println!();

    if !stats.records_by_status.is_empty() {
        println!("Records by Status:");
        let mut status_counts: Vec<_> = stats.records_by_status.iter().collect();
        status_counts.sort_by(|a, b| b.1.cmp(a.1));
        for (status, count) in status_counts {
            println!(
                "  {}: {} ({:.1}%)",
                status,
                count,
                percentage(*count, stats.total_records)
            );
        }
        println!();
    }

    if !stats.tag_counts.is_empty() {
        println!("Tags ({}):", stats.tag_counts.len());
        for (tag, count) in &stats.tag_counts {
            println!("  {}: {}", tag, count);
        }
        println!();
    }

    println!(
        "Detail coverage: {:.1}% ({} / {} records)",
        percentage(stats.records_with_details, stats.total_records),
        stats.records_with_details,
        stats.total_records
    );
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole > 0 {
        (part as f64 / whole as f64) * 100.0
    } else {
        0.0
    }
}
