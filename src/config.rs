//! Search configuration: which feeds to query and how to present results.

use std::collections::HashSet;
use tokio::time::Duration;
use tracing::warn;

use crate::environment::{get_env_var_as_vec, get_env_var_or};
use crate::filter::MAX_SUMMARY_LENGTH;
use crate::rss::Source;

pub const FEEDS_ENV: &str = "FEEDS";
pub const MAX_SUMMARY_LENGTH_ENV: &str = "MAX_SUMMARY_LENGTH";
pub const SOURCE_TIMEOUT_ENV: &str = "SOURCE_TIMEOUT_SECS";

pub const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(20);

/// Built-in list of news sources, in display order.
pub const DEFAULT_FEEDS: &[(&str, &str)] = &[
    ("ABC News", "https://www.abc.net.au/news/feed/2942460/rss.xml"),
    (
        "Associated Press (AP)",
        "https://rsshub.app/apnews/topics/apf-topnews",
    ),
    (
        "Reuters",
        "https://www.reutersagency.com/feed/?best-topics=world-news&post_type=best",
    ),
    ("BBC News", "http://feeds.bbci.co.uk/news/world/rss.xml"),
    ("NPR", "https://feeds.npr.org/1001/rss.xml"),
    ("Al Jazeera", "https://www.aljazeera.com/xml/rss/all.xml"),
];

/// Immutable settings handed to the aggregator at construction.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub sources: Vec<Source>,
    pub max_summary_length: usize,
    /// Upper bound on one source's fetch, after which it counts as failed.
    pub source_timeout: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            sources: DEFAULT_FEEDS
                .iter()
                .map(|(name, url)| Source::new(*name, *url))
                .collect(),
            max_summary_length: MAX_SUMMARY_LENGTH,
            source_timeout: DEFAULT_SOURCE_TIMEOUT,
        }
    }
}

impl SearchConfig {
    pub fn with_sources(sources: Vec<Source>) -> Self {
        Self {
            sources,
            ..Self::default()
        }
    }

    /// Build the configuration from `FEEDS`, `MAX_SUMMARY_LENGTH` and
    /// `SOURCE_TIMEOUT_SECS`, keeping defaults for anything unset.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        let feeds = get_env_var_as_vec(FEEDS_ENV, ';');
        if feeds.iter().any(|feed| !feed.is_empty()) {
            let sources = parse_sources(&feeds);
            if sources.is_empty() {
                warn!("{} did not contain any usable feeds, using defaults", FEEDS_ENV);
            } else {
                config.sources = sources;
            }
        }

        config.max_summary_length = get_env_var_or(MAX_SUMMARY_LENGTH_ENV, MAX_SUMMARY_LENGTH);
        config.source_timeout = Duration::from_secs(get_env_var_or(
            SOURCE_TIMEOUT_ENV,
            DEFAULT_SOURCE_TIMEOUT.as_secs(),
        ));

        config
    }
}

/// Parse `Name|url` pairs, skipping malformed entries and repeated names.
pub fn parse_sources(entries: &[String]) -> Vec<Source> {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();

    for entry in entries.iter().filter(|e| !e.trim().is_empty()) {
        let Some((name, url)) = entry.split_once('|') else {
            warn!("Skipping feed without a name|url separator: {}", entry);
            continue;
        };
        let (name, url) = (name.trim(), url.trim());
        if name.is_empty() || url.is_empty() {
            warn!("Skipping feed with an empty name or URL: {}", entry);
            continue;
        }
        if !seen.insert(name.to_string()) {
            warn!("Skipping duplicate feed name: {}", name);
            continue;
        }
        sources.push(Source::new(name, url));
    }

    sources
}
