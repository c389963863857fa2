//! Incremental CSV dataset
//!
//! This module owns the dataset file:
//! - loading an existing dataset (a missing file is an empty dataset)
//! - merging scraped records with deduplication and id assignment
//! - monotonic tag enrichment
//! - atomic persistence (temp file, fsync, rename)

mod dataset;
mod record;

pub use dataset::Dataset;
pub use record::{
    DedupKey, DetailFields, ListingRecord, BASE_COLUMNS, DETAIL_COLUMNS, NOT_AVAILABLE,
    NOT_SPECIFIED,
};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while reading or writing the dataset
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed dataset at line {line}: {message}")]
    MalformedRow { line: usize, message: String },
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Dataset bound to its output file
///
/// Every mutating operation persists before returning, so an abort never
/// loses a page that was already reported as merged.
#[derive(Debug)]
pub struct IncrementalStore {
    output_path: PathBuf,
    dedup: DedupKey,
    dataset: Dataset,
}

impl IncrementalStore {
    /// Loads `input` and binds the result to `output`
    pub fn open(input: &Path, output: &Path, dedup: DedupKey) -> StoreResult<Self> {
        let dataset = Dataset::load(input)?;
        tracing::info!(
            "Opened dataset {} with {} records (dedup by {})",
            input.display(),
            dataset.len(),
            dedup
        );
        Ok(Self {
            output_path: output.to_path_buf(),
            dedup,
            dataset,
        })
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Merges scraped records and persists; returns the number of new records
    pub fn merge(&mut self, records: Vec<ListingRecord>) -> StoreResult<usize> {
        let added = self.dataset.merge_records(records, self.dedup);
        self.persist()?;
        Ok(added)
    }

    /// Flags every record whose url is in `urls` with `tag` and persists
    pub fn tag<S: AsRef<str>>(&mut self, urls: &[S], tag: &str) -> StoreResult<usize> {
        let newly_set = self.dataset.apply_tag(urls, tag);
        self.persist()?;
        Ok(newly_set)
    }

    pub fn ensure_tag_columns<S: AsRef<str>>(&mut self, names: &[S]) {
        self.dataset.ensure_tag_columns(names);
    }

    /// Positions and urls of records that still need a detail fetch
    pub fn pending_details(&self) -> Vec<(usize, String)> {
        self.dataset
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.has_url() && r.details.is_none())
            .map(|(position, r)| (position, r.url.clone()))
            .collect()
    }

    pub fn set_details(&mut self, position: usize, fields: DetailFields) {
        self.dataset.set_details(position, fields);
    }

    pub fn persist(&self) -> StoreResult<()> {
        self.dataset.persist(&self.output_path)
    }
}
