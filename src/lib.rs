pub mod aggregator;
pub mod config;
pub mod environment;
pub mod filter;
pub mod logging;
pub mod rss;
pub mod web;

pub use aggregator::{Aggregator, ResultSet, SearchResponse, SourceResult};
pub use config::SearchConfig;
pub use filter::{KeywordQuery, MatchedArticle};

pub const TARGET_WEB_REQUEST: &str = "web_request";
pub const TARGET_SEARCH: &str = "search";
