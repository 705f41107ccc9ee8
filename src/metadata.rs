//! Best-effort Open Graph metadata scraping under strict size and time
//! bounds.
//!
//! Extraction is two ordered regex attempts per field (attribute order
//! varies across real-world pages), deliberately not a full HTML parser.

use std::sync::LazyLock;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use regex::{Regex, RegexBuilder};

/// Combined connect + read budget for a single fetch.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Meta tags live near the document head; reading more only costs memory
/// and regex time on arbitrarily large pages.
pub const MAX_BODY_BYTES: usize = 50_000;

/// Generic crawler identity so targets serve shareable markup instead of
/// bot-blocking pages.
const USER_AGENT: &str = "Mozilla/5.0 (compatible; Googlebot/2.1)";

/// Preview fields scraped from a page. All optional; produced fresh per
/// fetch and never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub site_name: Option<String>,
}

struct FieldPatterns {
    /// `property="og:<field>" ... content="<value>"`
    primary: Regex,
    /// Reversed attribute order: `content="<value>" ... property="og:<field>"`
    fallback: Regex,
}

fn field_patterns(field: &str) -> FieldPatterns {
    let compile = |pattern: String| {
        RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .build()
            .expect("og meta pattern must compile")
    };
    FieldPatterns {
        primary: compile(format!(
            r#"<meta[^>]*property=["']og:{field}["'][^>]*content=["']([^"']*)["']"#
        )),
        fallback: compile(format!(
            r#"<meta[^>]*content=["']([^"']*)["'][^>]*property=["']og:{field}["']"#
        )),
    }
}

struct OgPatterns {
    title: FieldPatterns,
    description: FieldPatterns,
    image: FieldPatterns,
    site_name: FieldPatterns,
}

static OG_PATTERNS: LazyLock<OgPatterns> = LazyLock::new(|| OgPatterns {
    title: field_patterns("title"),
    description: field_patterns("description"),
    image: field_patterns("image"),
    site_name: field_patterns("site_name"),
});

fn first_capture(html: &str, patterns: &FieldPatterns) -> Option<String> {
    patterns
        .primary
        .captures(html)
        .or_else(|| patterns.fallback.captures(html))
        .and_then(|captures| captures.get(1))
        .map(|value| value.as_str().trim().to_string())
}

/// Pull the four preview fields out of raw markup. First occurrence in
/// document order wins; values are whitespace-trimmed.
pub fn extract_metadata(html: &str) -> PageMetadata {
    let patterns = &*OG_PATTERNS;
    PageMetadata {
        title: first_capture(html, &patterns.title),
        description: first_capture(html, &patterns.description),
        image: first_capture(html, &patterns.image),
        site_name: first_capture(html, &patterns.site_name),
    }
}

/// Seam between the dispatch pipeline and the network, so handlers can be
/// driven by a stub in tests.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    /// Never fails: any network-level problem degrades to an all-absent
    /// record.
    async fn fetch(&self, url: &str) -> PageMetadata;
}

/// Real fetcher: one bounded request, no retries.
pub struct HttpMetadataFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpMetadataFetcher {
    pub fn new() -> Self {
        Self::with_timeout(FETCH_TIMEOUT)
    }

    /// Timeout override for tests that simulate slow upstreams.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    async fn fetch_html(&self, url: &str) -> anyhow::Result<String> {
        let mut response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .timeout(self.timeout)
            .send()
            .await
            .context("request page")?;

        if !response.status().is_success() {
            anyhow::bail!("unexpected status {}", response.status());
        }

        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await.context("read page body")? {
            let remaining = MAX_BODY_BYTES - body.len();
            if chunk.len() >= remaining {
                body.extend_from_slice(&chunk[..remaining]);
                break;
            }
            body.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

impl Default for HttpMetadataFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataFetcher for HttpMetadataFetcher {
    async fn fetch(&self, url: &str) -> PageMetadata {
        match self.fetch_html(url).await {
            Ok(html) => extract_metadata(&html),
            Err(error) => {
                tracing::debug!(url, "metadata fetch failed: {error:#}");
                PageMetadata::default()
            }
        }
    }
}
