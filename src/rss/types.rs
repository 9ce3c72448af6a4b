//! Type definitions for the RSS module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Duration;

/// A configured feed. Identity is `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    pub url: String,
}

impl Source {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// One entry as recovered from a feed document. Any field may be absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEntry {
    pub title: Option<String>,
    pub summary: Option<String>,
    /// Text of the first content block, if the entry has one.
    pub content: Option<String>,
    pub link: Option<String>,
    pub published: Option<DateTime<Utc>>,
}

/// Why a fetch produced no entries.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid feed URL: {0}")]
    InvalidUrl(String),
    #[error("request timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),
    #[error("request failed: {0}")]
    Request(String),
    #[error("HTTP error: {0}")]
    Status(reqwest::StatusCode),
    #[error("failed to read response body: {0}")]
    Body(String),
    #[error("failed to parse feed: {0}")]
    Parse(String),
}

/// Per-source fetch status reported alongside the matched articles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedStatus {
    Ok,
    Malformed,
    Failed,
    TimedOut,
}

/// Result of fetching one source. Never an error the caller has to propagate:
/// a failed fetch simply yields no entries.
#[derive(Debug)]
pub enum FeedOutcome {
    Parsed(Vec<RawEntry>),
    /// The document deviated from strict syntax; `entries` is what could be recovered.
    Malformed { entries: Vec<RawEntry>, reason: String },
    Failed(FetchError),
}

impl FeedOutcome {
    pub fn entries(&self) -> &[RawEntry] {
        match self {
            FeedOutcome::Parsed(entries) | FeedOutcome::Malformed { entries, .. } => entries,
            FeedOutcome::Failed(_) => &[],
        }
    }

    pub fn status(&self) -> FeedStatus {
        match self {
            FeedOutcome::Parsed(_) => FeedStatus::Ok,
            FeedOutcome::Malformed { .. } => FeedStatus::Malformed,
            FeedOutcome::Failed(FetchError::Timeout(_)) => FeedStatus::TimedOut,
            FeedOutcome::Failed(_) => FeedStatus::Failed,
        }
    }
}

// Constants
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const STANDARD_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:138.0) Gecko/20100101 Firefox/138.0";
