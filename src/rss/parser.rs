//! Feed parsing logic for RSS, Atom, and JSON formats.

use feed_rs::model::Entry;
use feed_rs::parser;
use std::io::Cursor;
use tracing::debug;

use super::types::{FeedOutcome, FetchError, RawEntry};
use super::util::{cleanup_xml, decode_body};
use crate::TARGET_WEB_REQUEST;

impl From<Entry> for RawEntry {
    fn from(entry: Entry) -> Self {
        RawEntry {
            title: entry.title.map(|t| t.content),
            summary: entry.summary.map(|s| s.content),
            content: entry.content.and_then(|c| c.body),
            link: entry.links.into_iter().next().map(|link| link.href),
            published: entry.published.or(entry.updated),
        }
    }
}

/// Parse a feed document into raw entries.
///
/// The body is decoded and run through [`cleanup_xml`] before parsing, since
/// `feed-rs` silently drops fields it cannot read. Any repair needed along the
/// way makes the result [`FeedOutcome::Malformed`], with the repairs as the
/// reason; the recovered entries are still returned. A document that cannot be
/// parsed at all is a [`FetchError::Parse`].
pub fn parse_feed(
    bytes: &[u8],
    content_type: Option<&str>,
    url: &str,
) -> Result<FeedOutcome, FetchError> {
    let decoded = decode_body(bytes, content_type);

    // JSON Feed goes to feed-rs as is
    if decoded.text.trim_start().starts_with('{') {
        let feed = parser::parse(Cursor::new(decoded.text.as_bytes()))
            .map_err(|err| FetchError::Parse(err.to_string()))?;
        let entries = feed.entries.into_iter().map(RawEntry::from).collect();
        return Ok(match decoded.issue {
            Some(reason) => FeedOutcome::Malformed { entries, reason },
            None => FeedOutcome::Parsed(entries),
        });
    }

    let cleaned = cleanup_xml(&decoded.text);
    let issues: Vec<String> = decoded.issue.into_iter().chain(cleaned.issues).collect();

    match parser::parse(Cursor::new(cleaned.xml.as_bytes())) {
        Ok(feed) => {
            debug!(target: TARGET_WEB_REQUEST, "Parsed feed from {} with {} entries", url, feed.entries.len());
            let entries = feed.entries.into_iter().map(RawEntry::from).collect();
            if issues.is_empty() {
                Ok(FeedOutcome::Parsed(entries))
            } else {
                debug!(target: TARGET_WEB_REQUEST, "Feed from {} needed repairs: {:?}", url, issues);
                Ok(FeedOutcome::Malformed {
                    entries,
                    reason: issues.join("; "),
                })
            }
        }
        Err(err) if !looks_like_feed(&cleaned.xml) => {
            let text = decoded.text;
            let preview = if text.chars().all(|c| !c.is_control() || c.is_whitespace()) {
                text.chars().take(100).collect::<String>()
            } else {
                "[binary data]".to_string()
            };
            Err(FetchError::Parse(format!(
                "document doesn't appear to be RSS or Atom ({}). Content preview: {}",
                err, preview
            )))
        }
        Err(err) if issues.is_empty() => Err(FetchError::Parse(err.to_string())),
        Err(err) => Err(FetchError::Parse(format!(
            "{} (after repairing: {})",
            err,
            issues.join("; ")
        ))),
    }
}

fn looks_like_feed(xml: &str) -> bool {
    xml.contains("<rss") || xml.contains("<feed") || xml.contains("<rdf:RDF")
}
