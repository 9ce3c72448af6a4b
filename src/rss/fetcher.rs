//! Feed retrieval: one HTTP fetch plus parse per source, never failing upward.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header;
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

use super::client::{create_http_client, fetch_with_fallback};
use super::parser::parse_feed;
use super::types::{FeedOutcome, FetchError, Source, REQUEST_TIMEOUT};
use super::util::{is_valid_url, try_decompressions};
use crate::TARGET_WEB_REQUEST;

/// Anything that can turn a [`Source`] into a [`FeedOutcome`].
///
/// Implementations must absorb every failure into [`FeedOutcome::Failed`].
#[async_trait]
pub trait FeedRetriever: Send + Sync {
    async fn retrieve(&self, source: &Source) -> FeedOutcome;
}

/// Fetches feeds over HTTP and parses them with `feed-rs`.
#[derive(Clone)]
pub struct FeedFetcher {
    client: reqwest::Client,
    request_timeout: Duration,
}

impl FeedFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(REQUEST_TIMEOUT)
    }

    pub fn with_timeout(request_timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_http_client(request_timeout)?,
            request_timeout,
        })
    }

    async fn fetch(&self, source: &Source) -> Result<FeedOutcome, FetchError> {
        let url = source.url.trim();
        if !is_valid_url(url) {
            return Err(FetchError::InvalidUrl(source.url.clone()));
        }

        let (response, browser_emulation_used) =
            fetch_with_fallback(&self.client, url, self.request_timeout).await?;
        if browser_emulation_used {
            info!(target: TARGET_WEB_REQUEST, "Browser emulation was required for {}", source.name);
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .map(|s| s.to_lowercase());
        debug!(target: TARGET_WEB_REQUEST, "Response Content-Type from {}: {:?}", url, content_type);

        let bytes = response.bytes().await.map_err(|err| {
            if err.is_timeout() {
                FetchError::Timeout(self.request_timeout)
            } else {
                FetchError::Body(err.to_string())
            }
        })?;
        let bytes = try_decompressions(&bytes, url);

        parse_feed(&bytes, content_type.as_deref(), url)
    }
}

#[async_trait]
impl FeedRetriever for FeedFetcher {
    async fn retrieve(&self, source: &Source) -> FeedOutcome {
        info!(target: TARGET_WEB_REQUEST, "Fetching feed for: {} ({})", source.name, source.url);

        match self.fetch(source).await {
            Ok(outcome) => {
                if let FeedOutcome::Malformed { reason, .. } = &outcome {
                    warn!(target: TARGET_WEB_REQUEST, "Feed parser encountered issues with {}: {}", source.name, reason);
                }
                info!(target: TARGET_WEB_REQUEST, "Processing {} entries for {}", outcome.entries().len(), source.name);
                outcome
            }
            Err(err) => {
                error!(target: TARGET_WEB_REQUEST, "Error fetching or parsing feed for {}: {}", source.name, err);
                FeedOutcome::Failed(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::Aggregator;
    use crate::config::SearchConfig;
    use crate::filter::KeywordQuery;
    use crate::rss::FeedStatus;
    use axum::{routing::get, Router};
    use std::io;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    const BROKEN_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Business</title>
    <item>
      <title>AT&T Earnings</title>
      <link>https://news.example.com/att</link>
      <description>Quarterly earnings beat estimates</description>
    </item>
    <item>
      <title>Local Weather</title>
    </item>
  </channel>
</rss>"#;

    /// Serve `body` as an RSS document on a loopback port and return its URL.
    async fn serve_feed(body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route(
            "/rss.xml",
            get(move || async move { ([(header::CONTENT_TYPE, "application/rss+xml")], body) }),
        );
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/rss.xml", addr)
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[tokio::test]
    async fn test_malformed_feed_is_kept_and_logged() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let url = serve_feed(BROKEN_RSS).await;
        let fetcher = FeedFetcher::with_timeout(Duration::from_secs(5)).unwrap();
        let outcome = fetcher.retrieve(&Source::new("Local", url)).await;

        assert_eq!(outcome.status(), FeedStatus::Malformed);
        let entries = outcome.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title.as_deref(), Some("AT&T Earnings"));

        let output = logs.contents();
        assert!(output.contains("WARN"));
        assert!(output.contains("Feed parser encountered issues with Local"));
        assert!(output.contains("unescaped ampersand"));
    }

    #[tokio::test]
    async fn test_malformed_status_reaches_search_results() {
        let url = serve_feed(BROKEN_RSS).await;
        let config = SearchConfig::with_sources(vec![
            Source::new("Local", url),
            Source::new("Offline", "http://127.0.0.1:9/rss.xml"),
        ]);
        let fetcher = FeedFetcher::with_timeout(Duration::from_secs(5)).unwrap();
        let aggregator = Aggregator::new(config, fetcher);

        let results = aggregator.aggregate(&KeywordQuery::parse("earnings")).await;
        let statuses: Vec<_> = results.iter().map(|r| r.status).collect();
        assert_eq!(statuses, vec![FeedStatus::Malformed, FeedStatus::Failed]);

        let local = results.get("Local").unwrap();
        assert_eq!(local.len(), 1);
        assert_eq!(local[0].title, "AT&T Earnings");
        assert_eq!(local[0].link, "https://news.example.com/att");
        assert!(results.get("Offline").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_url_is_failed_outcome() {
        let fetcher = FeedFetcher::new().unwrap();
        let outcome = fetcher
            .retrieve(&Source::new("Broken", "not-a-url"))
            .await;
        assert_eq!(outcome.status(), FeedStatus::Failed);
        assert!(outcome.entries().is_empty());
        assert!(matches!(outcome, FeedOutcome::Failed(FetchError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_failed_outcome() {
        let fetcher = FeedFetcher::with_timeout(Duration::from_secs(2)).unwrap();
        // Nothing listens on port 9 of the loopback interface.
        let outcome = fetcher
            .retrieve(&Source::new("Offline", "http://127.0.0.1:9/rss.xml"))
            .await;
        assert!(outcome.entries().is_empty());
        assert!(matches!(outcome, FeedOutcome::Failed(_)));
    }
}
