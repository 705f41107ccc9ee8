//! URL extraction from free text and registrable-domain derivation.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use url::{Host, Url};

/// Matches http(s)://... up to whitespace or an HTML/text delimiter.
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r#"https?://[^\s<>"']+"#)
        .case_insensitive(true)
        .build()
        .expect("URL pattern must compile")
});

/// Public suffixes that span two labels; anything else is treated as a
/// single-label TLD. Covers the country-code registries news sites
/// actually publish under.
const TWO_LABEL_SUFFIXES: &[&str] = &[
    "ac.uk", "co.uk", "gov.uk", "org.uk", "co.jp", "ne.jp", "or.jp", "com.au", "net.au", "org.au",
    "co.nz", "org.nz", "com.br", "com.mx", "com.ar", "co.in", "co.kr", "com.sg", "com.hk", "com.tw",
    "co.za", "com.tr", "com.cn",
];

/// Yield every syntactically valid URL substring in order of first
/// appearance. Lazy, finite, not deduplicated.
pub fn extract_urls(text: &str) -> impl Iterator<Item = &str> {
    URL_PATTERN.find_iter(text).map(|m| m.as_str())
}

/// Derive the registrable second-level label of a URL's host, lowercased:
/// `https://www.nytimes.com/foo` → `nytimes`, `https://bbc.co.uk` → `bbc`.
///
/// Returns `None` for anything that does not parse as an http(s) URL with a
/// named host, or whose host is nothing but a public suffix. IP literals
/// have no registrable domain.
pub fn registrable_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    let host = match parsed.host()? {
        Host::Domain(name) => name.to_ascii_lowercase(),
        Host::Ipv4(_) | Host::Ipv6(_) => return None,
    };
    let host = host.trim_matches('.');

    let suffix_labels = TWO_LABEL_SUFFIXES
        .iter()
        .find(|suffix| host == **suffix || host.ends_with(&format!(".{suffix}")))
        .map_or(1, |suffix| suffix.split('.').count());

    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= suffix_labels {
        return None;
    }
    labels
        .get(labels.len() - suffix_labels - 1)
        .map(|label| (*label).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_urls_in_order_of_appearance() {
        let text = "see https://a.example.com/1 and http://b.example.org/2?q=3";
        let urls: Vec<&str> = extract_urls(text).collect();
        assert_eq!(
            urls,
            vec!["https://a.example.com/1", "http://b.example.org/2?q=3"]
        );
    }

    #[test]
    fn extraction_stops_at_delimiters() {
        let urls: Vec<&str> = extract_urls(r#"<a href="https://example.com/x">link</a>"#).collect();
        assert_eq!(urls, vec!["https://example.com/x"]);

        let urls: Vec<&str> = extract_urls("('https://example.com/y')").collect();
        assert_eq!(urls, vec!["https://example.com/y"]);
    }

    #[test]
    fn extraction_is_case_insensitive_on_scheme() {
        let urls: Vec<&str> = extract_urls("HTTPS://EXAMPLE.COM/path").collect();
        assert_eq!(urls, vec!["HTTPS://EXAMPLE.COM/path"]);
    }

    #[test]
    fn extraction_is_idempotent() {
        let text = "one http://x.test/a two http://x.test/a";
        let first: Vec<&str> = extract_urls(text).collect();
        let second: Vec<&str> = extract_urls(text).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn no_urls_yields_empty_sequence() {
        assert_eq!(extract_urls("nothing to see here").count(), 0);
    }

    #[test]
    fn subdomain_is_stripped() {
        assert_eq!(
            registrable_domain("https://sub.example.com/path").as_deref(),
            Some("example")
        );
        assert_eq!(
            registrable_domain("https://www.nytimes.com/2024/article").as_deref(),
            Some("nytimes")
        );
    }

    #[test]
    fn bare_registrable_host_keeps_its_label() {
        assert_eq!(
            registrable_domain("http://nytimes.com/foo").as_deref(),
            Some("nytimes")
        );
    }

    #[test]
    fn two_label_suffixes_are_recognized() {
        assert_eq!(
            registrable_domain("https://www.thetimes.co.uk/article").as_deref(),
            Some("thetimes")
        );
        assert_eq!(
            registrable_domain("https://afr.com.au/markets").as_deref(),
            Some("afr")
        );
    }

    #[test]
    fn domain_is_lowercased() {
        assert_eq!(
            registrable_domain("https://WWW.NYTimes.COM/a").as_deref(),
            Some("nytimes")
        );
    }

    #[test]
    fn hosts_without_registrable_domain_yield_none() {
        assert!(registrable_domain("https://localhost/admin").is_none());
        assert!(registrable_domain("https://co.uk/").is_none());
        assert!(registrable_domain("http://192.168.0.1/page").is_none());
        assert!(registrable_domain("http://[::1]/page").is_none());
    }

    #[test]
    fn non_http_schemes_yield_none() {
        assert!(registrable_domain("ftp://example.com/file").is_none());
        assert!(registrable_domain("not a url").is_none());
    }
}
