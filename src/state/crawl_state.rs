/// Crawl phase and progress counters
///
/// The orchestrator walks `Init → Filtering → Extracting → Persisting →
/// (Advancing → Extracting)* → Done`, entering `Recovering` on session faults.
use std::fmt;

/// Represents the orchestrator's current phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Browser session starting and loading the base URL
    Init,

    /// Applying the pass's filters on page 1
    Filtering,

    /// Reading listing items from the current page
    Extracting,

    /// Writing the page's records to the dataset
    Persisting,

    /// Moving to the next results page
    Advancing,

    /// Restarting the session after a fault
    Recovering,

    /// Pass finished
    Done,
}

impl CrawlPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Filtering => "filtering",
            Self::Extracting => "extracting",
            Self::Persisting => "persisting",
            Self::Advancing => "advancing",
            Self::Recovering => "recovering",
            Self::Done => "done",
        }
    }

    /// Returns true if a session fault in this phase leads to `Recovering`
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Filtering | Self::Extracting | Self::Advancing | Self::Recovering
        )
    }

    /// Returns true if the orchestrator may move from `self` to `next`
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        use CrawlPhase::*;
        match (self, next) {
            (Init, Filtering) | (Done, Filtering) => true,
            (Filtering, Extracting) => true,
            (Extracting, Persisting) => true,
            (Persisting, Advancing) => true,
            (Advancing, Extracting) | (Advancing, Done) => true,
            (Recovering, Extracting) | (Recovering, Advancing) => true,
            (Recovering, Recovering) => true,
            (from, Recovering) => from.is_recoverable(),
            _ => false,
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Progress of a crawl run
///
/// Page-scoped fields (`page`, `records_on_page`, `retries`) reset on every
/// pass; the totals accumulate across passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlState {
    pub phase: CrawlPhase,
    /// 1-based results page
    pub page: u32,
    pub records_on_page: usize,
    pub total_new: usize,
    /// Faults on the current page
    pub retries: u32,
    pub pages_processed: u32,
    pub advances: u32,
}

impl Default for CrawlState {
    fn default() -> Self {
        Self::new()
    }
}

impl CrawlState {
    pub fn new() -> Self {
        Self {
            phase: CrawlPhase::Init,
            page: 1,
            records_on_page: 0,
            total_new: 0,
            retries: 0,
            pages_processed: 0,
            advances: 0,
        }
    }

    /// Moves to `next`, logging the transition
    pub fn enter(&mut self, next: CrawlPhase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "invalid phase transition {} -> {}",
            self.phase,
            next
        );
        tracing::trace!("Phase {} -> {} (page {})", self.phase, next, self.page);
        self.phase = next;
    }

    /// Starts a new pass on page 1
    pub fn begin_pass(&mut self) {
        self.enter(CrawlPhase::Filtering);
        self.page = 1;
        self.records_on_page = 0;
        self.retries = 0;
    }

    /// Records a fully processed page and clears the fault counter
    pub fn page_succeeded(&mut self, found: usize, new: usize) {
        self.records_on_page = found;
        self.total_new += new;
        self.pages_processed += 1;
        self.retries = 0;
    }

    pub fn advanced(&mut self) {
        self.page += 1;
        self.advances += 1;
        self.records_on_page = 0;
    }

    /// Counts a fault on the current page and returns the new count
    pub fn record_fault(&mut self) -> u32 {
        self.retries += 1;
        self.retries
    }
}
