//! Fetcher behavior against a local mock server: happy path, bot-blocking
//! status codes, and slow upstreams.

use std::time::Duration;

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use paywall_sentry::metadata::{HttpMetadataFetcher, MetadataFetcher, PageMetadata};

const ARTICLE_HTML: &str = r#"
<!DOCTYPE html>
<html><head>
<meta property="og:title" content="Big Story" />
<meta content="A tale of two paywalls" property="og:description" />
<meta property="og:image" content="https://cdn.example.com/lead.jpg" />
<meta property="og:site_name" content="The Daily" />
</head><body>article body</body></html>
"#;

#[tokio::test]
async fn fetches_metadata_from_page_markup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/story"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ARTICLE_HTML))
        .mount(&server)
        .await;

    let fetcher = HttpMetadataFetcher::new();
    let metadata = fetcher.fetch(&format!("{}/story", server.uri())).await;

    assert_eq!(metadata.title.as_deref(), Some("Big Story"));
    assert_eq!(
        metadata.description.as_deref(),
        Some("A tale of two paywalls")
    );
    assert_eq!(
        metadata.image.as_deref(),
        Some("https://cdn.example.com/lead.jpg")
    );
    assert_eq!(metadata.site_name.as_deref(), Some("The Daily"));
}

#[tokio::test]
async fn sends_a_crawler_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/story"))
        .and(header("user-agent", "Mozilla/5.0 (compatible; Googlebot/2.1)"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ARTICLE_HTML))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = HttpMetadataFetcher::new();
    let metadata = fetcher.fetch(&format!("{}/story", server.uri())).await;
    assert_eq!(metadata.title.as_deref(), Some("Big Story"));
}

#[tokio::test]
async fn non_success_status_degrades_to_empty_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/story"))
        .respond_with(ResponseTemplate::new(403).set_body_string(ARTICLE_HTML))
        .mount(&server)
        .await;

    let fetcher = HttpMetadataFetcher::new();
    let metadata = fetcher.fetch(&format!("{}/story", server.uri())).await;
    assert_eq!(metadata, PageMetadata::default());
}

#[tokio::test]
async fn timeout_degrades_to_empty_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/story"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(ARTICLE_HTML)
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let fetcher = HttpMetadataFetcher::with_timeout(Duration::from_millis(100));
    let metadata = fetcher.fetch(&format!("{}/story", server.uri())).await;
    assert_eq!(metadata, PageMetadata::default());
}

#[tokio::test]
async fn connection_refused_degrades_to_empty_metadata() {
    // Nothing is listening on this port.
    let fetcher = HttpMetadataFetcher::with_timeout(Duration::from_millis(500));
    let metadata = fetcher.fetch("http://127.0.0.1:9/unreachable").await;
    assert_eq!(metadata, PageMetadata::default());
}

#[tokio::test]
async fn oversized_body_is_truncated_not_fatal() {
    // Tags past the 50 kB read limit are invisible to extraction.
    let mut body = String::with_capacity(120_000);
    body.push_str(r#"<meta property="og:title" content="Near The Head">"#);
    body.push_str(&"x".repeat(100_000));
    body.push_str(r#"<meta property="og:site_name" content="Too Far Down">"#);

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/big"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let fetcher = HttpMetadataFetcher::new();
    let metadata = fetcher.fetch(&format!("{}/big", server.uri())).await;

    assert_eq!(metadata.title.as_deref(), Some("Near The Head"));
    assert!(metadata.site_name.is_none());
}
