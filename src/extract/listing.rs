//! Listing item extraction

use super::{collapsed_text, compile, try_extract, ExtractionFault, SummaryCleaner};
use crate::config::SelectorConfig;
use crate::store::{ListingRecord, NOT_AVAILABLE, NOT_SPECIFIED};
use crate::url::canonicalize_link;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Turns one listing-item fragment into a `ListingRecord`
///
/// Only the name is required. Every other field goes through
/// [`try_extract`] and falls back to its default when missing.
#[derive(Debug, Clone)]
pub struct ListingExtractor {
    name: Selector,
    opens_at: Selector,
    closes_at: Selector,
    summary: Selector,
    link: Selector,
    scope_label: String,
    status_label: String,
    cleaner: SummaryCleaner,
    site_root: Url,
}

impl ListingExtractor {
    pub fn new(selectors: &SelectorConfig, site_root: Url) -> Result<Self, ExtractionFault> {
        Ok(Self {
            name: compile(&selectors.name)?,
            opens_at: compile(&selectors.opens_at)?,
            closes_at: compile(&selectors.closes_at)?,
            summary: compile(&selectors.summary)?,
            link: compile(&selectors.link)?,
            scope_label: selectors.scope_label.clone(),
            status_label: selectors.status_label.clone(),
            cleaner: SummaryCleaner::new(selectors)?,
            site_root,
        })
    }

    /// Extracts a record; the id is left at 0 until the store assigns one
    pub fn extract(&self, fragment_html: &str) -> Result<ListingRecord, ExtractionFault> {
        let fragment = Html::parse_fragment(fragment_html);

        let name = first_text(&fragment, &self.name, "name")?;
        let mut record = ListingRecord::new(name, NOT_AVAILABLE);

        record.opens_at = try_extract("opensAt", NOT_AVAILABLE, || {
            first_text(&fragment, &self.opens_at, "opensAt")
        });
        record.closes_at = try_extract("closesAt", NOT_AVAILABLE, || {
            first_text(&fragment, &self.closes_at, "closesAt")
        });
        record.scope = try_extract("scope", NOT_SPECIFIED, || {
            labelled_text(&fragment, &self.scope_label, "scope")
        });
        record.status = try_extract("status", NOT_SPECIFIED, || {
            labelled_text(&fragment, &self.status_label, "status")
        });
        record.summary = try_extract("summary", NOT_AVAILABLE, || {
            let paragraph = fragment
                .select(&self.summary)
                .next()
                .ok_or(ExtractionFault::MissingField("summary"))?;
            Ok(self.cleaner.clean(&paragraph.inner_html()))
        });
        record.url = try_extract("url", NOT_AVAILABLE, || self.link_url(&fragment));

        Ok(record)
    }

    /// Absolute url of the item's detail link
    pub fn link_url(&self, fragment: &Html) -> Result<String, ExtractionFault> {
        fragment
            .select(&self.link)
            .filter_map(|link| link.value().attr("href"))
            .find_map(|href| canonicalize_link(href, &self.site_root))
            .ok_or(ExtractionFault::MissingField("url"))
    }
}

fn first_text(
    fragment: &Html,
    selector: &Selector,
    field: &'static str,
) -> Result<String, ExtractionFault> {
    fragment
        .select(selector)
        .map(|element| collapsed_text(&element))
        .find(|text| !text.is_empty())
        .ok_or(ExtractionFault::MissingField(field))
}

/// Finds the first element whose own text contains `label` and returns its
/// full text with the label removed.
fn labelled_text(
    fragment: &Html,
    label: &str,
    field: &'static str,
) -> Result<String, ExtractionFault> {
    fragment
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|element| {
            element
                .children()
                .filter_map(|child| child.value().as_text())
                .any(|text| text.contains(label))
        })
        .map(|element| collapsed_text(&element).replace(label, "").trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(ExtractionFault::MissingField(field))
}
