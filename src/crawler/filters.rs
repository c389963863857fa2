//! Filter panel automation
//!
//! The listing site keeps filters in collapsible groups of checkboxes.
//! Selecting a filter means: expand its group, tick the box, press apply.

use crate::config::{DelayConfig, FilterGroup, SelectorConfig, TagFilter};
use crate::session::{DriverResult, PageElement, Session, SessionFault};
use std::time::Duration;

/// What a crawl pass filters the listing by
#[derive(Debug, Clone)]
pub enum FilterTarget {
    /// Every configured status control ("open" and "closed")
    Status,

    /// A single tag of a filter group
    Tag { group: FilterGroup, tag: TagFilter },
}

impl FilterTarget {
    pub fn label(&self) -> String {
        match self {
            FilterTarget::Status => "status".to_string(),
            FilterTarget::Tag { group, tag } => format!("{}/{}", group.name, tag.name),
        }
    }
}

/// Drives the filter panel through a `Session`
pub struct FilterController<'a> {
    selectors: &'a SelectorConfig,
    delays: &'a DelayConfig,
}

impl<'a> FilterController<'a> {
    pub fn new(selectors: &'a SelectorConfig, delays: &'a DelayConfig) -> Self {
        Self { selectors, delays }
    }

    /// Applies whatever `target` asks for
    pub async fn apply_target(&self, session: &Session, target: &FilterTarget) -> DriverResult<()> {
        match target {
            FilterTarget::Status => self.apply_status_filters(session).await,
            FilterTarget::Tag { group, tag } => self.apply_tag(session, group, tag).await,
        }
    }

    /// Clicks "remove all filters"
    ///
    /// The site re-enables its default "open" status afterwards.
    pub async fn clear_all(&self, session: &Session) -> DriverResult<()> {
        let button = required(session, &self.selectors.clear_button).await?;
        button.scroll_into_view().await?;
        button.click().await?;
        settle(self.delays.filter_apply()).await;
        Ok(())
    }

    /// Expands a collapsed filter group
    pub async fn open_group(&self, session: &Session, panel: &str, toggle: &str) -> DriverResult<()> {
        let panel_element = session.wait_for(panel).await?;
        let class = panel_element.attribute("class").await?.unwrap_or_default();
        if class.split_whitespace().any(|c| c == "show") {
            tracing::trace!("Filter group {} already open", panel);
            return Ok(());
        }

        let toggle_element = required(session, toggle).await?;
        toggle_element.scroll_into_view().await?;
        toggle_element.click().await?;
        settle(self.delays.group_open()).await;
        Ok(())
    }

    /// Ticks a checkbox unless it is already checked
    pub async fn enable(&self, session: &Session, control_id: &str) -> DriverResult<()> {
        let control = session.wait_for(&format!("#{}", control_id)).await?;
        control.scroll_into_view().await?;
        settle(self.delays.scroll_settle()).await;

        if control.is_checked().await? {
            tracing::debug!("Filter {} already enabled", control_id);
        } else {
            control.click().await?;
            tracing::debug!("Enabled filter {}", control_id);
        }
        settle(self.delays.filter_toggle()).await;
        Ok(())
    }

    /// Presses the apply button
    pub async fn apply(&self, session: &Session) -> DriverResult<()> {
        let button = required(session, &self.selectors.apply_button).await?;
        button.scroll_into_view().await?;
        button.click().await?;
        settle(self.delays.filter_apply()).await;
        Ok(())
    }

    /// Shows listings in every configured status
    pub async fn apply_status_filters(&self, session: &Session) -> DriverResult<()> {
        self.open_group(session, &self.selectors.status_panel, &self.selectors.status_toggle)
            .await?;
        for control in &self.selectors.status_controls {
            self.enable(session, control).await?;
        }
        self.apply(session).await
    }

    /// Shows only listings carrying one tag
    pub async fn apply_tag(
        &self,
        session: &Session,
        group: &FilterGroup,
        tag: &TagFilter,
    ) -> DriverResult<()> {
        self.open_group(session, &group.panel_selector, &group.menu_selector)
            .await?;
        self.clear_all(session).await?;
        self.enable(session, &tag.control_id).await?;
        self.apply(session).await
    }
}

async fn required(session: &Session, selector: &str) -> DriverResult<Box<dyn PageElement>> {
    session
        .find(selector)
        .await?
        .ok_or_else(|| SessionFault::ElementMissing {
            selector: selector.to_string(),
        })
}

async fn settle(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
