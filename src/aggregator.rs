//! Concurrent fan-out of fetch + filter over every configured source.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{error, info};

use crate::config::SearchConfig;
use crate::filter::{filter_entries, KeywordQuery, MatchedArticle};
use crate::rss::{FeedOutcome, FeedRetriever, FeedStatus, FetchError, Source};
use crate::TARGET_SEARCH;

/// Matches from one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceResult {
    pub source: String,
    pub status: FeedStatus,
    pub articles: Vec<MatchedArticle>,
}

/// Per-source results in configuration order, one entry per source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSet {
    sources: Vec<SourceResult>,
}

impl ResultSet {
    pub fn get(&self, source: &str) -> Option<&[MatchedArticle]> {
        self.sources
            .iter()
            .find(|result| result.source == source)
            .map(|result| result.articles.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceResult> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn total_matches(&self) -> usize {
        self.sources.iter().map(|result| result.articles.len()).sum()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a SourceResult;
    type IntoIter = std::slice::Iter<'a, SourceResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.sources.iter()
    }
}

/// What the presentation layer gets back for one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// The submitted text, trimmed, for redisplay.
    pub keywords: String,
    pub search_attempted: bool,
    /// `None` when the submission held no keywords and nothing was fetched.
    pub results: Option<ResultSet>,
}

impl SearchResponse {
    /// State before anything has been submitted.
    pub fn idle() -> Self {
        Self {
            keywords: String::new(),
            search_attempted: false,
            results: None,
        }
    }
}

pub struct Aggregator<R> {
    config: SearchConfig,
    retriever: R,
}

impl<R: FeedRetriever> Aggregator<R> {
    pub fn new(config: SearchConfig, retriever: R) -> Self {
        Self { config, retriever }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Tokenize `keywords` and search every source.
    pub async fn search(&self, keywords: &str) -> SearchResponse {
        let keywords = keywords.trim();
        let query = KeywordQuery::parse(keywords);

        let results = if query.is_empty() {
            info!(target: TARGET_SEARCH, "Empty keyword search submitted");
            None
        } else {
            info!(target: TARGET_SEARCH, "Search initiated for keywords: {:?}", query.tokens());
            Some(self.aggregate(&query).await)
        };

        SearchResponse {
            keywords: keywords.to_string(),
            search_attempted: true,
            results,
        }
    }

    /// Run fetch + filter for all sources concurrently. The result holds one
    /// entry per configured source, in configuration order, whatever each
    /// source's outcome. An empty query fetches nothing.
    pub async fn aggregate(&self, query: &KeywordQuery) -> ResultSet {
        if query.is_empty() {
            return ResultSet::default();
        }

        let pipelines = self
            .config
            .sources
            .iter()
            .map(|source| self.search_source(source, query));

        ResultSet {
            sources: join_all(pipelines).await,
        }
    }

    async fn search_source(&self, source: &Source, query: &KeywordQuery) -> SourceResult {
        let outcome = match timeout(self.config.source_timeout, self.retriever.retrieve(source)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                error!(target: TARGET_SEARCH, "Fetching {} timed out after {:?}", source.name, self.config.source_timeout);
                FeedOutcome::Failed(FetchError::Timeout(self.config.source_timeout))
            }
        };

        let articles = filter_entries(outcome.entries(), query, self.config.max_summary_length);
        info!(target: TARGET_SEARCH, "Found {} matching articles for {}", articles.len(), source.name);

        SourceResult {
            source: source.name.clone(),
            status: outcome.status(),
            articles,
        }
    }
}
