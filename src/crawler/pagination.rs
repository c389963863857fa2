//! Forward-only result pagination

use crate::session::{DriverResult, Session, SessionFault};
use std::time::Duration;

/// Walks the results pager one page at a time
///
/// The absence of the next-page control is the only end-of-results signal.
pub struct PaginationWalker<'a> {
    next_selector: &'a str,
    settle: Duration,
}

impl<'a> PaginationWalker<'a> {
    pub fn new(next_selector: &'a str, settle: Duration) -> Self {
        Self {
            next_selector,
            settle,
        }
    }

    pub async fn has_next(&self, session: &Session) -> DriverResult<bool> {
        Ok(session.find(self.next_selector).await?.is_some())
    }

    /// Clicks through to the next page; `false` when there is none
    pub async fn advance(&self, session: &Session) -> DriverResult<bool> {
        let Some(next) = session.find(self.next_selector).await? else {
            return Ok(false);
        };
        next.scroll_into_view().await?;
        next.click().await?;
        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }
        Ok(true)
    }

    /// Replays `pages` advances without extracting anything
    pub async fn fast_forward(&self, session: &Session, pages: u32) -> DriverResult<()> {
        for skipped in 0..pages {
            if !self.advance(session).await? {
                tracing::warn!(
                    "Pager ended after {} of {} pages while fast-forwarding",
                    skipped,
                    pages
                );
                return Err(SessionFault::ElementMissing {
                    selector: self.next_selector.to_string(),
                });
            }
        }
        Ok(())
    }
}
