//! RSS feed retrieval for feedsift.
//!
//! This module handles the fetching and parsing of RSS, Atom and JSON feeds
//! into raw entries, isolating network and parse faults per source.

mod client;
mod fetcher;
mod parser;
mod types;
mod util;

pub use self::types::*;

pub use self::client::*;
pub use self::fetcher::{FeedFetcher, FeedRetriever};
pub use self::parser::parse_feed;
pub use self::util::*;
