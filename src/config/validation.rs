use crate::config::types::{
    Config, CrawlerConfig, DetailConfig, FilterGroup, LayoutSelectors, SelectorConfig,
    StorageConfig,
};
use crate::store::{BASE_COLUMNS, DETAIL_COLUMNS};
use crate::ConfigError;
use scraper::Selector;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_storage_config(&config.storage)?;
    validate_crawler_config(&config.crawler)?;
    validate_browser_config(config)?;
    validate_selectors(&config.selectors)?;
    validate_filter_groups(&config.filter_groups)?;
    validate_detail_config(&config.detail)?;
    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.input_path.is_empty() {
        return Err(ConfigError::Validation(
            "input_path cannot be empty".to_string(),
        ));
    }

    if config.output_path.is_empty() {
        return Err(ConfigError::Validation(
            "output_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_http_url("base_url", &config.base_url)?;

    if let Some(root) = &config.site_root {
        validate_http_url("site_root", root)?;
    }

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_browser_config(config: &Config) -> Result<(), ConfigError> {
    let browser = &config.browser;

    if browser.page_load_timeout_seconds < 1 {
        return Err(ConfigError::Validation(
            "page_load_timeout_seconds must be >= 1".to_string(),
        ));
    }

    if browser.script_timeout_seconds < 1 {
        return Err(ConfigError::Validation(
            "script_timeout_seconds must be >= 1".to_string(),
        ));
    }

    if browser.window_width < 320 || browser.window_height < 240 {
        return Err(ConfigError::Validation(format!(
            "window size must be at least 320x240, got {}x{}",
            browser.window_width, browser.window_height
        )));
    }

    Ok(())
}

fn validate_selectors(selectors: &SelectorConfig) -> Result<(), ConfigError> {
    for selector in [
        &selectors.results_container,
        &selectors.listing_item,
        &selectors.name,
        &selectors.opens_at,
        &selectors.closes_at,
        &selectors.summary,
        &selectors.link,
        &selectors.next_page,
        &selectors.apply_button,
        &selectors.clear_button,
        &selectors.status_panel,
        &selectors.status_toggle,
        &selectors.promo_banner,
    ] {
        validate_selector(selector)?;
    }

    if selectors.scope_label.is_empty() || selectors.status_label.is_empty() {
        return Err(ConfigError::Validation(
            "scope_label and status_label cannot be empty".to_string(),
        ));
    }

    if selectors.status_controls.is_empty() {
        return Err(ConfigError::Validation(
            "status_controls must name at least one control".to_string(),
        ));
    }

    Ok(())
}

/// Validates filter groups: tag names become CSV columns, so they must be
/// unique and must not shadow the fixed columns.
fn validate_filter_groups(groups: &[FilterGroup]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for group in groups {
        if group.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "filter group name cannot be empty".to_string(),
            ));
        }

        validate_selector(&group.menu_selector)?;
        validate_selector(&group.panel_selector)?;

        if group.tags.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Filter group '{}' must have at least one tag",
                group.name
            )));
        }

        for tag in &group.tags {
            if tag.name.trim().is_empty() || tag.control_id.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "Filter group '{}' has a tag with an empty name or control id",
                    group.name
                )));
            }

            if BASE_COLUMNS.contains(&tag.name.as_str())
                || DETAIL_COLUMNS.contains(&tag.name.as_str())
            {
                return Err(ConfigError::Validation(format!(
                    "Tag name '{}' collides with a fixed dataset column",
                    tag.name
                )));
            }

            if !seen.insert(tag.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "Tag name '{}' is used more than once",
                    tag.name
                )));
            }
        }
    }

    Ok(())
}

fn validate_detail_config(config: &DetailConfig) -> Result<(), ConfigError> {
    if config.checkpoint_every < 1 {
        return Err(ConfigError::Validation(
            "checkpoint_every must be >= 1".to_string(),
        ));
    }

    if config.request_timeout_seconds < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_seconds must be >= 1".to_string(),
        ));
    }

    regex::Regex::new(&config.heading_pattern).map_err(|e| {
        ConfigError::Validation(format!("Invalid heading_pattern: {}", e))
    })?;

    validate_layout(&config.legacy)?;
    validate_layout(&config.current)?;

    Ok(())
}

fn validate_layout(layout: &LayoutSelectors) -> Result<(), ConfigError> {
    if let Some(container) = &layout.container {
        validate_selector(container)?;
    }
    for selector in [
        &layout.detail,
        &layout.benefit,
        &layout.eligibility,
        &layout.results,
    ] {
        validate_selector(selector)?;
    }
    Ok(())
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {}: {}", field, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            field, value
        )));
    }

    Ok(())
}

fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector {
            selector: selector.to_string(),
            message: e.to_string(),
        })
}
