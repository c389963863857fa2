//! URL canonicalization for listing links
//!
//! Listing items link to their detail pages with a mix of relative and
//! absolute hrefs. Stored urls are always absolute so they can serve as the
//! dedup key across runs.

use url::Url;

/// Resolves a link href against the site root
///
/// Returns None when the href cannot identify a detail page:
/// - empty or fragment-only hrefs
/// - javascript:, mailto:, tel: and data: links
/// - anything that does not resolve to an HTTP(S) URL
///
/// Fragments are dropped.
///
/// # Examples
///
/// ```
/// use listing_harvester::url::canonicalize_link;
/// use url::Url;
///
/// let root = Url::parse("https://example.com").unwrap();
/// assert_eq!(
///     canonicalize_link("/programs/seed-fund", &root).as_deref(),
///     Some("https://example.com/programs/seed-fund")
/// );
/// ```
pub fn canonicalize_link(href: &str, site_root: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match site_root.join(href) {
        Ok(mut absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            absolute.set_fragment(None);
            Some(absolute.to_string())
        }
        _ => None,
    }
}
