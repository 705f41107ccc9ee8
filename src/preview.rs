//! Bypass link construction and preview-card rendering. Pure, no I/O.

use crate::metadata::PageMetadata;

/// The external URL-rewriting service. Used only as a string template
/// target, never called directly.
pub const BYPASS_BASE_URL: &str = "https://removepaywalls.com";

/// Card title when the page offered none.
pub const FALLBACK_TITLE: &str = "Read Article";

/// Fixed footer attribution.
pub const ATTRIBUTION: &str = "via removepaywalls.com";

/// Rendered link preview. Optional fields stay absent when the scraped
/// metadata had nothing for them; rendering layers must omit them rather
/// than show empty strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewCard {
    pub title: String,
    pub link: String,
    pub description: Option<String>,
    pub site_name: Option<String>,
    pub thumbnail: Option<String>,
    pub footer: &'static str,
}

/// Bypass-service URL for an article: base + `/` + the original URL
/// verbatim, existing percent-encoding preserved as-is.
pub fn bypass_url(url: &str) -> String {
    format!("{BYPASS_BASE_URL}/{url}")
}

/// Map scraped metadata onto a card. Presence or absence of each optional
/// metadata field controls the corresponding card field exactly.
pub fn render_preview(url: &str, metadata: &PageMetadata) -> PreviewCard {
    PreviewCard {
        title: metadata
            .title
            .clone()
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| FALLBACK_TITLE.to_string()),
        link: bypass_url(url),
        description: metadata.description.clone(),
        site_name: metadata.site_name.clone(),
        thumbnail: metadata.image.clone(),
        footer: ATTRIBUTION,
    }
}
