//! Detail enrichment pass
//!
//! Fetches each stored record's detail page over HTTP and fills the detail
//! columns. Per-URL failures are logged and skipped; the dataset is
//! checkpointed periodically so an interrupted pass keeps its progress.

use super::fetcher::{build_http_client, fetch_page, FetchResult};
use crate::config::Config;
use crate::extract::DetailExtractor;
use crate::store::IncrementalStore;
use crate::{HarvestError, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::time::Duration;

/// Outcome of a detail pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailReport {
    /// Records with a url and no detail columns yet
    pub pending: usize,
    pub enriched: usize,
    /// Pages fetched but matching neither layout
    pub unrecognized: usize,
    pub failed: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

pub struct DetailPass {
    client: Client,
    extractor: DetailExtractor,
    delay: Duration,
    checkpoint_every: usize,
}

impl DetailPass {
    pub fn new(config: &Config) -> Result<Self> {
        let client = build_http_client(&config.crawler, &config.detail)?;
        let extractor = DetailExtractor::new(&config.detail).map_err(|e| {
            HarvestError::Config(crate::ConfigError::Validation(e.to_string()))
        })?;
        Ok(Self {
            client,
            extractor,
            delay: config.crawler.inter_request_delay(),
            checkpoint_every: config.detail.checkpoint_every.max(1),
        })
    }

    /// Enriches every pending record in `store`
    pub async fn run(&self, store: &mut IncrementalStore) -> Result<DetailReport> {
        let started_at = Utc::now();
        let pending = store.pending_details();
        let total = pending.len();
        tracing::info!("Fetching detail pages for {} records", total);

        let mut enriched = 0;
        let mut unrecognized = 0;
        let mut failed = 0;

        for (done, (position, url)) in pending.into_iter().enumerate() {
            if done > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            match fetch_page(&self.client, &url).await {
                FetchResult::Success { body, .. } => match self.extractor.extract(&body) {
                    Some(found) => {
                        tracing::debug!("{} matched the {} layout", url, found.layout);
                        store.set_details(position, found.fields);
                        enriched += 1;
                    }
                    None => {
                        tracing::warn!("No detail content recognised at {}", url);
                        unrecognized += 1;
                    }
                },
                other => {
                    tracing::warn!("Failed to fetch {}: {}", url, other.describe());
                    failed += 1;
                }
            }

            let processed = done + 1;
            if processed % self.checkpoint_every == 0 {
                store.persist()?;
                tracing::info!(
                    processed,
                    total,
                    enriched,
                    "Detail checkpoint saved"
                );
            }
        }

        store.persist()?;
        tracing::info!(
            "Detail pass complete: {} enriched, {} unrecognised, {} failed of {}",
            enriched,
            unrecognized,
            failed,
            total
        );

        Ok(DetailReport {
            pending: total,
            enriched,
            unrecognized,
            failed,
            started_at,
            finished_at: Utc::now(),
        })
    }
}
