//! Detail page extraction
//!
//! Program detail pages exist in two markup generations. Each generation is a
//! [`DetailLayout`]; the extractor runs both and keeps whichever populated
//! more fields.

use super::{collapsed_text, compile, ExtractionFault};
use crate::config::{DetailConfig, LayoutSelectors};
use crate::store::{DetailFields, NOT_AVAILABLE};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// One detail-page markup generation
pub trait DetailLayout: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(&self, document: &Html) -> DetailFields;
}

/// Compiled selectors shared by both layouts
#[derive(Debug, Clone)]
struct CompiledSelectors {
    container: Option<Selector>,
    detail: Selector,
    benefit: Selector,
    eligibility: Selector,
    results: Selector,
}

impl CompiledSelectors {
    fn new(selectors: &LayoutSelectors) -> Result<Self, ExtractionFault> {
        Ok(Self {
            container: selectors.container.as_deref().map(compile).transpose()?,
            detail: compile(&selectors.detail)?,
            benefit: compile(&selectors.benefit)?,
            eligibility: compile(&selectors.eligibility)?,
            results: compile(&selectors.results)?,
        })
    }
}

fn joined<'a>(matches: impl Iterator<Item = ElementRef<'a>>) -> String {
    let parts: Vec<String> = matches
        .map(|element| collapsed_text(&element))
        .filter(|text| !text.is_empty())
        .collect();
    if parts.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        parts.join(" ")
    }
}

fn first<'a>(mut matches: impl Iterator<Item = ElementRef<'a>>) -> String {
    matches
        .find_map(|element| Some(collapsed_text(&element)).filter(|text| !text.is_empty()))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Older pages: everything lives inside one content column
#[derive(Debug, Clone)]
pub struct LegacyLayout {
    selectors: CompiledSelectors,
}

impl LegacyLayout {
    pub fn new(selectors: &LayoutSelectors) -> Result<Self, ExtractionFault> {
        Ok(Self {
            selectors: CompiledSelectors::new(selectors)?,
        })
    }
}

impl DetailLayout for LegacyLayout {
    fn name(&self) -> &'static str {
        "legacy"
    }

    fn extract(&self, document: &Html) -> DetailFields {
        let s = &self.selectors;
        let scope = match &s.container {
            Some(container) => match document.select(container).next() {
                Some(scope) => scope,
                None => return DetailFields::default(),
            },
            None => document.root_element(),
        };

        DetailFields {
            detail: joined(scope.select(&s.detail)),
            benefit: joined(scope.select(&s.benefit)),
            eligibility: joined(scope.select(&s.eligibility)),
            results: joined(scope.select(&s.results)),
        }
    }
}

/// Current pages: fields are spread over dedicated blocks
#[derive(Debug, Clone)]
pub struct CurrentLayout {
    selectors: CompiledSelectors,
}

impl CurrentLayout {
    pub fn new(selectors: &LayoutSelectors) -> Result<Self, ExtractionFault> {
        Ok(Self {
            selectors: CompiledSelectors::new(selectors)?,
        })
    }
}

impl DetailLayout for CurrentLayout {
    fn name(&self) -> &'static str {
        "current"
    }

    fn extract(&self, document: &Html) -> DetailFields {
        let s = &self.selectors;
        let scope = s
            .container
            .as_ref()
            .and_then(|container| document.select(container).next())
            .unwrap_or_else(|| document.root_element());

        DetailFields {
            detail: joined(scope.select(&s.detail)),
            benefit: joined(scope.select(&s.benefit)),
            eligibility: joined(scope.select(&s.eligibility)),
            // repeated result blocks duplicate the first one
            results: first(scope.select(&s.results)),
        }
    }
}

/// Fields extracted from one detail page and the layout that produced them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailMatch {
    pub layout: &'static str,
    pub fields: DetailFields,
}

pub struct DetailExtractor {
    current: CurrentLayout,
    legacy: LegacyLayout,
    heading: Regex,
}

impl DetailExtractor {
    pub fn new(config: &DetailConfig) -> Result<Self, ExtractionFault> {
        let heading =
            Regex::new(&config.heading_pattern).map_err(|e| ExtractionFault::InvalidPattern {
                pattern: config.heading_pattern.clone(),
                message: e.to_string(),
            })?;
        Ok(Self {
            current: CurrentLayout::new(&config.current)?,
            legacy: LegacyLayout::new(&config.legacy)?,
            heading,
        })
    }

    /// Returns `None` when neither layout populated any field
    pub fn extract(&self, html: &str) -> Option<DetailMatch> {
        let document = Html::parse_document(html);

        let current = self.current.extract(&document);
        let legacy = self.legacy.extract(&document);

        let (layout, mut fields) = if legacy.populated() > current.populated() {
            (self.legacy.name(), legacy)
        } else {
            (self.current.name(), current)
        };

        if fields.populated() == 0 {
            return None;
        }

        if fields.detail != NOT_AVAILABLE {
            let stripped = self.heading.replace(&fields.detail, "").trim().to_string();
            fields.detail = if stripped.is_empty() {
                NOT_AVAILABLE.to_string()
            } else {
                stripped
            };
        }

        Some(DetailMatch { layout, fields })
    }
}
