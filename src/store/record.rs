//! Dataset record types

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Default for missing dates, summary, url and detail fields
pub const NOT_AVAILABLE: &str = "not available";

/// Default for missing scope and status
pub const NOT_SPECIFIED: &str = "not specified";

/// Leading columns of every dataset file, in order
pub const BASE_COLUMNS: [&str; 8] = [
    "id", "name", "opensAt", "closesAt", "scope", "status", "summary", "url",
];

/// Trailing columns written once the detail pass has run
pub const DETAIL_COLUMNS: [&str; 4] = ["detail", "benefit", "eligibility", "results"];

/// One listing item as stored in the dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRecord {
    /// Assigned by the store; 0 until merged
    pub id: u64,
    pub name: String,
    pub opens_at: String,
    pub closes_at: String,
    pub scope: String,
    pub status: String,
    pub summary: String,
    pub url: String,
    pub tags: BTreeMap<String, bool>,
    pub details: Option<DetailFields>,
}

impl ListingRecord {
    /// Creates a record with every optional field at its default
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            opens_at: NOT_AVAILABLE.to_string(),
            closes_at: NOT_AVAILABLE.to_string(),
            scope: NOT_SPECIFIED.to_string(),
            status: NOT_SPECIFIED.to_string(),
            summary: NOT_AVAILABLE.to_string(),
            url: url.into(),
            tags: BTreeMap::new(),
            details: None,
        }
    }

    /// Whether the url is a real link rather than the placeholder
    pub fn has_url(&self) -> bool {
        self.url != NOT_AVAILABLE
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.get(tag).copied().unwrap_or(false)
    }

    /// Overwrites the listing fields with those of a newer sighting.
    /// Id, tags and details are kept.
    pub(crate) fn refresh_from(&mut self, newer: ListingRecord) {
        self.opens_at = newer.opens_at;
        self.closes_at = newer.closes_at;
        self.scope = newer.scope;
        self.status = newer.status;
        self.summary = newer.summary;
    }
}

/// Fields scraped from a record's detail page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailFields {
    pub detail: String,
    pub benefit: String,
    pub eligibility: String,
    pub results: String,
}

impl Default for DetailFields {
    fn default() -> Self {
        Self {
            detail: NOT_AVAILABLE.to_string(),
            benefit: NOT_AVAILABLE.to_string(),
            eligibility: NOT_AVAILABLE.to_string(),
            results: NOT_AVAILABLE.to_string(),
        }
    }
}

impl DetailFields {
    /// Number of fields holding something other than the default
    pub fn populated(&self) -> usize {
        self.values()
            .into_iter()
            .filter(|value| *value != NOT_AVAILABLE)
            .count()
    }

    pub fn values(&self) -> [&str; 4] {
        [
            self.detail.as_str(),
            self.benefit.as_str(),
            self.eligibility.as_str(),
            self.results.as_str(),
        ]
    }
}

/// Identity used to decide whether a scraped record is already stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum DedupKey {
    /// Url alone; the first stored sighting wins
    #[default]
    #[serde(rename = "url")]
    Url,

    /// Name and url together; later sightings overwrite stored fields
    #[serde(rename = "name+url")]
    NameUrl,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum RecordKey {
    Url(String),
    NameUrl(String, String),
}

impl DedupKey {
    pub(crate) fn key_of(&self, record: &ListingRecord) -> RecordKey {
        match self {
            DedupKey::Url if record.has_url() => RecordKey::Url(record.url.clone()),
            _ => RecordKey::NameUrl(record.name.clone(), record.url.clone()),
        }
    }

    /// Whether a repeated key overwrites the stored record
    pub fn last_write_wins(&self) -> bool {
        matches!(self, DedupKey::NameUrl)
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DedupKey::Url => write!(f, "url"),
            DedupKey::NameUrl => write!(f, "name+url"),
        }
    }
}

impl FromStr for DedupKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "url" => Ok(DedupKey::Url),
            "name+url" => Ok(DedupKey::NameUrl),
            other => Err(format!(
                "unknown dedup key '{}' (expected 'url' or 'name+url')",
                other
            )),
        }
    }
}
