//! Summary text cleaning
//!
//! Summaries come from the first paragraph of a listing item. Some carry a
//! promotional banner and inline links; both are dropped before the text is
//! collected. Removing anchors leaves quote/dash fragments behind, which are
//! stripped afterwards.

use super::{compile, ExtractionFault};
use crate::config::SelectorConfig;
use crate::store::NOT_AVAILABLE;
use scraper::{Html, Selector};
use std::collections::HashSet;

/// Cleans summary HTML into plain text
#[derive(Debug, Clone)]
pub struct SummaryCleaner {
    banner: Selector,
    marker: String,
    anchor: Selector,
    artifacts: Vec<String>,
}

impl SummaryCleaner {
    pub fn new(selectors: &SelectorConfig) -> Result<Self, ExtractionFault> {
        Ok(Self {
            banner: compile(&selectors.promo_banner)?,
            marker: selectors.promo_marker.clone(),
            anchor: compile("a")?,
            artifacts: selectors.summary_artifacts.clone(),
        })
    }

    /// Returns the cleaned text, or `"not available"` when nothing is left
    pub fn clean(&self, html: &str) -> String {
        if html.trim().is_empty() {
            return NOT_AVAILABLE.to_string();
        }

        let fragment = Html::parse_fragment(html);

        // Banners are only promotional when they carry the marker phrase
        let mut pruned = HashSet::new();
        for banner in fragment.select(&self.banner) {
            if banner.text().collect::<String>().contains(&self.marker) {
                pruned.insert(banner.id());
            }
        }
        for anchor in fragment.select(&self.anchor) {
            pruned.insert(anchor.id());
        }

        let mut text = String::new();
        for node in fragment.tree.root().descendants() {
            if let Some(chunk) = node.value().as_text() {
                if node.ancestors().any(|a| pruned.contains(&a.id())) {
                    continue;
                }
                text.push_str(chunk);
            }
        }

        for artifact in &self.artifacts {
            text = text.replace(artifact.as_str(), "");
        }

        let text = text.trim();
        if text.is_empty() {
            NOT_AVAILABLE.to_string()
        } else {
            text.to_string()
        }
    }
}
