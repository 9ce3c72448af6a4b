//! HTTP client creation and request handling for RSS feeds.

use anyhow::Result;
use reqwest::{cookie::Jar, header};
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{debug, info};

use super::types::{FetchError, BROWSER_USER_AGENT, STANDARD_USER_AGENT};
use crate::TARGET_WEB_REQUEST;

/// Create a client whose requests are bounded by `request_timeout`
pub fn create_http_client(request_timeout: Duration) -> Result<reqwest::Client> {
    let cookie_store = Jar::default();
    reqwest::Client::builder()
        .cookie_store(true)
        .cookie_provider(Arc::new(cookie_store))
        .gzip(true)
        .brotli(true)
        .timeout(request_timeout)
        .redirect(reqwest::redirect::Policy::default())
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))
}

fn classify(err: reqwest::Error, request_timeout: Duration) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(request_timeout)
    } else {
        FetchError::Request(err.to_string())
    }
}

/// Request `url` with plain feed-reader headers, retrying once with browser
/// headers when the first attempt fails. Returns the response and whether the
/// browser emulation was needed.
pub async fn fetch_with_fallback(
    client: &reqwest::Client,
    url: &str,
    request_timeout: Duration,
) -> Result<(reqwest::Response, bool), FetchError> {
    debug!(target: TARGET_WEB_REQUEST, "Attempting standard request to {}", url);

    let standard_result = client
        .get(url)
        .header(header::USER_AGENT, STANDARD_USER_AGENT)
        .header(header::ACCEPT, "application/rss+xml, application/atom+xml, application/feed+json, application/xml, text/xml, */*;q=0.9")
        .send()
        .await;

    let first_error = match standard_result {
        Ok(resp) if resp.status().is_success() => {
            debug!(target: TARGET_WEB_REQUEST, "Standard request to {} succeeded", url);
            return Ok((resp, false));
        }
        Ok(resp) => FetchError::Status(resp.status()),
        // A host that is down will not answer the second attempt either.
        Err(err) if err.is_connect() || err.is_timeout() => {
            return Err(classify(err, request_timeout));
        }
        Err(err) => classify(err, request_timeout),
    };

    debug!(target: TARGET_WEB_REQUEST, "Standard request to {} failed ({}), trying browser emulation", url, first_error);

    match client
        .get(url)
        .header(header::USER_AGENT, BROWSER_USER_AGENT)
        .header(header::ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
        .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.5")
        .header("DNT", "1")
        .header("Upgrade-Insecure-Requests", "1")
        .header("Sec-Fetch-Dest", "document")
        .header("Sec-Fetch-Mode", "navigate")
        .header("Sec-Fetch-Site", "none")
        .header("Sec-Fetch-User", "?1")
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => {
            info!(target: TARGET_WEB_REQUEST, "Browser emulation request to {} succeeded", url);
            Ok((resp, true))
        }
        Ok(resp) => Err(FetchError::Status(resp.status())),
        Err(err) => Err(classify(err, request_timeout)),
    }
}
