//! Field extraction from listing fragments and detail pages
//!
//! Every optional field is extracted independently: a missing field falls
//! back to its documented default instead of failing the whole record.

mod detail;
mod listing;
mod summary;

pub use detail::{CurrentLayout, DetailExtractor, DetailLayout, DetailMatch, LegacyLayout};
pub use listing::ListingExtractor;
pub use summary::SummaryCleaner;

use scraper::{ElementRef, Selector};
use thiserror::Error;

/// A field or record that could not be extracted
///
/// Always absorbed: field-level faults become defaults, record-level faults
/// drop the single record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionFault {
    #[error("Required field '{0}' is missing")]
    MissingField(&'static str),

    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// Runs one field extraction, substituting `default` on failure
pub fn try_extract<F>(field: &'static str, default: &str, extract: F) -> String
where
    F: FnOnce() -> Result<String, ExtractionFault>,
{
    match extract() {
        Ok(value) => value,
        Err(fault) => {
            tracing::trace!("Using default for {}: {}", field, fault);
            default.to_string()
        }
    }
}

/// Compiles a CSS selector
pub(crate) fn compile(selector: &str) -> Result<Selector, ExtractionFault> {
    Selector::parse(selector).map_err(|e| ExtractionFault::InvalidSelector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// Text of an element with whitespace runs collapsed to single spaces
pub(crate) fn collapsed_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
