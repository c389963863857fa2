//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the page loop that drives every browser-based run:
//! - Starting the session and loading the listing
//! - Applying the pass's filters
//! - Extracting, persisting and advancing page by page
//! - Recovering from session faults with a bounded retry budget

use crate::config::Config;
use crate::crawler::filters::{FilterController, FilterTarget};
use crate::crawler::pagination::PaginationWalker;
use crate::extract::ListingExtractor;
use crate::session::{DriverFactory, DriverResult, Session, SessionFault};
use crate::state::{CrawlPhase, CrawlState};
use crate::store::{IncrementalStore, ListingRecord};
use crate::{ConfigError, HarvestError, Result};
use chrono::{DateTime, Utc};

/// How a pass writes what it finds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassKind {
    /// Merge records into the dataset
    Catalog,
    /// Set a tag flag on records already in the dataset
    Tag,
}

/// One filtered walk through the listing
#[derive(Debug, Clone)]
struct CrawlPass {
    kind: PassKind,
    target: FilterTarget,
}

impl CrawlPass {
    fn catalog() -> Self {
        Self {
            kind: PassKind::Catalog,
            target: FilterTarget::Status,
        }
    }

    fn tags(config: &Config) -> Vec<Self> {
        config
            .filter_groups
            .iter()
            .flat_map(|group| {
                group.tags.iter().map(move |tag| Self {
                    kind: PassKind::Tag,
                    target: FilterTarget::Tag {
                        group: group.clone(),
                        tag: tag.clone(),
                    },
                })
            })
            .collect()
    }

    fn tag_name(&self) -> Option<&str> {
        match &self.target {
            FilterTarget::Tag { tag, .. } => Some(&tag.name),
            FilterTarget::Status => None,
        }
    }
}

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    pub passes: usize,
    pub pages_processed: u32,
    /// New records for catalog runs, newly set flags for tag runs
    pub new_records: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Main crawler coordinator structure
///
/// Exclusively owns the browser session and the dataset for one run.
pub struct Coordinator {
    config: Config,
    session: Session,
    store: IncrementalStore,
    extractor: ListingExtractor,
    state: CrawlState,
}

impl Coordinator {
    /// Creates a coordinator; nothing is launched until a run starts
    pub fn new(
        config: Config,
        factory: Box<dyn DriverFactory>,
        store: IncrementalStore,
    ) -> Result<Self> {
        let site_root = config.site_root()?;
        let extractor = ListingExtractor::new(&config.selectors, site_root)
            .map_err(|e| HarvestError::Config(ConfigError::Validation(e.to_string())))?;
        let session = Session::new(factory, config.browser.clone());

        Ok(Self {
            config,
            session,
            store,
            extractor,
            state: CrawlState::new(),
        })
    }

    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    pub fn store(&self) -> &IncrementalStore {
        &self.store
    }

    /// Hands the dataset back once the run is over
    pub fn into_store(self) -> IncrementalStore {
        self.store
    }

    /// Walks the listing with every status enabled and merges new records
    pub async fn run_catalog(&mut self) -> Result<CrawlReport> {
        self.run(vec![CrawlPass::catalog()]).await
    }

    /// Walks the listing once per configured tag and flags matching records
    pub async fn run_tags(&mut self) -> Result<CrawlReport> {
        let tag_names = self.config.tag_names();
        self.store.ensure_tag_columns(&tag_names);
        self.store.persist()?;
        self.run(CrawlPass::tags(&self.config)).await
    }

    async fn run(&mut self, passes: Vec<CrawlPass>) -> Result<CrawlReport> {
        let started_at = Utc::now();
        self.state = CrawlState::new();

        let outcome = self.run_passes(&passes).await;
        self.session.stop().await;
        outcome?;

        let report = CrawlReport {
            passes: passes.len(),
            pages_processed: self.state.pages_processed,
            new_records: self.state.total_new,
            started_at,
            finished_at: Utc::now(),
        };
        tracing::info!(
            "Crawl completed: {} pages in {} passes, {} new",
            report.pages_processed,
            report.passes,
            report.new_records
        );
        Ok(report)
    }

    async fn run_passes(&mut self, passes: &[CrawlPass]) -> Result<()> {
        self.init().await?;

        for (index, pass) in passes.iter().enumerate() {
            if index > 0 {
                let pause = self.config.delays.between_tags();
                if !pause.is_zero() {
                    tokio::time::sleep(pause).await;
                }
            }
            tracing::info!(
                "Starting pass {}/{}: {}",
                index + 1,
                passes.len(),
                pass.target.label()
            );
            let before = self.state.total_new;
            self.run_pass(pass).await?;
            tracing::info!(
                filter = %pass.target.label(),
                new_records = self.state.total_new - before,
                "Pass finished"
            );
        }
        Ok(())
    }

    /// Starts the browser and loads the listing; any failure is fatal
    async fn init(&mut self) -> Result<()> {
        tracing::info!("Starting browser session");
        self.session
            .start()
            .await
            .map_err(HarvestError::FatalSetup)?;
        self.session
            .navigate(&self.config.crawler.base_url)
            .await
            .map_err(HarvestError::FatalSetup)?;
        Ok(())
    }

    async fn run_pass(&mut self, pass: &CrawlPass) -> Result<()> {
        self.state.begin_pass();

        match self.apply_filters(pass).await {
            Ok(()) => self.state.enter(CrawlPhase::Extracting),
            Err(fault) => self.recover(pass, fault, CrawlPhase::Extracting).await?,
        }

        loop {
            if self.state.phase == CrawlPhase::Extracting {
                let records = match self.extract_page().await {
                    Ok(records) => records,
                    Err(fault) => {
                        self.recover(pass, fault, CrawlPhase::Extracting).await?;
                        continue;
                    }
                };

                self.state.enter(CrawlPhase::Persisting);
                let found = records.len();
                let new = self.persist(pass, records)?;
                self.state.page_succeeded(found, new);
                tracing::info!(
                    page = self.state.page,
                    found,
                    new_records = new,
                    "Page processed"
                );
                self.state.enter(CrawlPhase::Advancing);
            }

            let walker = PaginationWalker::new(
                &self.config.selectors.next_page,
                self.config.delays.page_advance(),
            );
            match walker.advance(&self.session).await {
                Ok(true) => {
                    self.state.advanced();
                    self.state.enter(CrawlPhase::Extracting);
                }
                Ok(false) => {
                    tracing::debug!("No next page after page {}", self.state.page);
                    self.state.enter(CrawlPhase::Done);
                    return Ok(());
                }
                Err(fault) => self.recover(pass, fault, CrawlPhase::Advancing).await?,
            }
        }
    }

    async fn apply_filters(&self, pass: &CrawlPass) -> DriverResult<()> {
        FilterController::new(&self.config.selectors, &self.config.delays)
            .apply_target(&self.session, &pass.target)
            .await
    }

    /// Reads every listing item on the current page
    ///
    /// Items that fail extraction are logged and skipped.
    async fn extract_page(&self) -> DriverResult<Vec<ListingRecord>> {
        let selectors = &self.config.selectors;
        self.session.wait_for(&selectors.results_container).await?;
        let items = self.session.query(&selectors.listing_item).await?;

        let mut records = Vec::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            let html = item.outer_html().await?;
            match self.extractor.extract(&html) {
                Ok(record) => records.push(record),
                Err(fault) => tracing::warn!(
                    "Skipping item {} on page {}: {}",
                    position + 1,
                    self.state.page,
                    fault
                ),
            }
        }
        Ok(records)
    }

    fn persist(&mut self, pass: &CrawlPass, records: Vec<ListingRecord>) -> Result<usize> {
        let written = match (pass.kind, pass.tag_name()) {
            (PassKind::Tag, Some(tag)) => {
                let urls: Vec<&str> = records
                    .iter()
                    .filter(|r| r.has_url())
                    .map(|r| r.url.as_str())
                    .collect();
                self.store.tag(&urls, tag)?
            }
            _ => self.store.merge(records)?,
        };
        Ok(written)
    }

    /// Counts the fault and rebuilds the session until it works or the
    /// retry budget runs out, then continues in `resume`
    async fn recover(
        &mut self,
        pass: &CrawlPass,
        mut fault: SessionFault,
        resume: CrawlPhase,
    ) -> Result<()> {
        loop {
            self.state.enter(CrawlPhase::Recovering);
            let attempts = self.state.record_fault();
            let max_retries = self.config.crawler.max_retries;

            if attempts >= max_retries {
                tracing::error!(
                    "Giving up on page {} after {} attempts: {}",
                    self.state.page,
                    attempts,
                    fault
                );
                return Err(HarvestError::RetriesExhausted {
                    page: self.state.page,
                    attempts,
                    source: fault,
                });
            }

            tracing::warn!(
                "Fault on page {} (attempt {}/{}): {}",
                self.state.page,
                attempts,
                max_retries,
                fault
            );

            match self.reestablish(pass).await {
                Ok(()) => {
                    self.state.enter(resume);
                    return Ok(());
                }
                Err(next) => fault = next,
            }
        }
    }

    /// Fresh browser, listing reloaded, filters reapplied, back on the
    /// current page
    async fn reestablish(&mut self, pass: &CrawlPass) -> DriverResult<()> {
        self.session.restart().await?;
        self.session.navigate(&self.config.crawler.base_url).await?;
        self.apply_filters(pass).await?;

        let walker = PaginationWalker::new(
            &self.config.selectors.next_page,
            self.config.delays.page_advance(),
        );
        walker
            .fast_forward(&self.session, self.state.page.saturating_sub(1))
            .await
    }
}
