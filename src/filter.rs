//! Keyword matching and summary cleanup for feed entries.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::rss::RawEntry;

pub const MAX_SUMMARY_LENGTH: usize = 250;
pub const ELLIPSIS: &str = "...";
pub const NO_SUMMARY: &str = "No summary available.";
pub const NO_TITLE: &str = "No Title";
pub const NO_LINK: &str = "#";

// `<` followed by at least one non-`<` character, up to the nearest `>`.
static TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^<]+?>").expect("tag pattern is a valid regex"));

/// Normalized search tokens: lowercased, trimmed, never empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeywordQuery {
    tokens: Vec<String>,
}

impl KeywordQuery {
    /// Split free-form input on whitespace into lowercase tokens.
    pub fn parse(input: &str) -> Self {
        Self {
            tokens: input
                .split_whitespace()
                .map(|token| token.trim().to_lowercase())
                .filter(|token| !token.is_empty())
                .collect(),
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// A query with no tokens means no search is performed.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    fn all_in(&self, haystack: &str) -> bool {
        self.tokens.iter().all(|token| haystack.contains(token.as_str()))
    }
}

/// An entry that matched a query, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedArticle {
    pub title: String,
    pub link: String,
    pub summary: String,
    pub published: Option<DateTime<Utc>>,
}

/// Remove anything that looks like an HTML tag.
///
/// This is a lossy text transform, not an HTML parser: entities are left
/// untouched and a lone `<` without a closing `>` survives.
pub fn strip_tags(raw: &str) -> String {
    TAG_PATTERN.replace_all(raw, "").into_owned()
}

/// Cut `text` to at most `max_len` characters, appending an ellipsis when
/// anything was removed.
pub fn truncate_summary(text: &str, max_len: usize) -> String {
    match text.char_indices().nth(max_len) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}

/// Whether every token occurs in the title, or failing that, every token
/// occurs in the summary plus first content block.
pub fn matches_keywords(entry: &RawEntry, query: &KeywordQuery) -> bool {
    let title = entry.title.as_deref().unwrap_or_default().to_lowercase();
    if query.all_in(&title) {
        return true;
    }

    let mut full_text = entry.summary.as_deref().unwrap_or_default().to_lowercase();
    if let Some(content) = entry.content.as_deref() {
        full_text.push(' ');
        full_text.push_str(&content.to_lowercase());
    }
    query.all_in(&full_text)
}

/// Build the display record for a matched entry.
pub fn summarize(entry: &RawEntry, max_summary_length: usize) -> MatchedArticle {
    let raw_summary = entry.summary.as_deref().unwrap_or(NO_SUMMARY);
    let clean_summary = strip_tags(raw_summary);

    MatchedArticle {
        title: entry.title.clone().unwrap_or_else(|| NO_TITLE.to_string()),
        link: entry.link.clone().unwrap_or_else(|| NO_LINK.to_string()),
        summary: truncate_summary(&clean_summary, max_summary_length),
        published: entry.published,
    }
}

/// Select the entries matching `query`, in feed order.
pub fn filter_entries(
    entries: &[RawEntry],
    query: &KeywordQuery,
    max_summary_length: usize,
) -> Vec<MatchedArticle> {
    entries
        .iter()
        .filter(|entry| matches_keywords(entry, query))
        .map(|entry| summarize(entry, max_summary_length))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, summary: &str) -> RawEntry {
        RawEntry {
            title: Some(title.to_string()),
            summary: Some(summary.to_string()),
            content: None,
            link: Some(format!("https://example.com/{}", title.len())),
            published: None,
        }
    }

    #[test]
    fn test_keyword_query_parse() {
        let query = KeywordQuery::parse("  Global   MARKETS\tRally ");
        assert_eq!(query.tokens(), &["global", "markets", "rally"]);
        assert!(KeywordQuery::parse("   \t\n ").is_empty());
        assert!(KeywordQuery::parse("").is_empty());
    }

    #[test]
    fn test_title_match_is_case_insensitive() {
        let query = KeywordQuery::parse("global markets");
        assert!(matches_keywords(&entry("Global Markets Rally", ""), &query));
    }

    #[test]
    fn test_falls_back_to_summary() {
        let query = KeywordQuery::parse("global markets");
        assert!(matches_keywords(
            &entry("Weather Report", "markets rally today amid global uncertainty"),
            &query
        ));
        assert!(!matches_keywords(
            &entry("Local Weather", "sunny all week"),
            &query
        ));
    }

    #[test]
    fn test_tokens_are_not_split_across_fields() {
        let query = KeywordQuery::parse("global markets");
        assert!(!matches_keywords(
            &entry("Global outlook", "markets are calm"),
            &query
        ));
    }

    #[test]
    fn test_content_joins_summary() {
        let query = KeywordQuery::parse("election results");
        let mut raw = entry("Evening briefing", "Election night coverage");
        assert!(!matches_keywords(&raw, &query));

        raw.content = Some("<p>Full results by district</p>".to_string());
        assert!(matches_keywords(&raw, &query));
    }

    #[test]
    fn test_missing_fields_do_not_match_or_panic() {
        let query = KeywordQuery::parse("anything");
        assert!(!matches_keywords(&RawEntry::default(), &query));
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(
            strip_tags("<p>Markets <b>rally</b> today</p>"),
            "Markets rally today"
        );
        assert_eq!(strip_tags("a <> b"), "a <> b");
        assert_eq!(strip_tags("1 < 2"), "1 < 2");
        assert_eq!(strip_tags("<<b>bold"), "<bold");
        assert_eq!(strip_tags("<a href=\"x\">link</a>"), "link");
    }

    #[test]
    fn test_truncate_summary() {
        let long = "a".repeat(300);
        let truncated = truncate_summary(&long, MAX_SUMMARY_LENGTH);
        assert_eq!(truncated.chars().count(), 253);
        assert!(truncated.ends_with(ELLIPSIS));

        let short = "b".repeat(100);
        assert_eq!(truncate_summary(&short, MAX_SUMMARY_LENGTH), short);

        let exact = "c".repeat(MAX_SUMMARY_LENGTH);
        assert_eq!(truncate_summary(&exact, MAX_SUMMARY_LENGTH), exact);
    }

    #[test]
    fn test_truncate_counts_characters() {
        let text = "é".repeat(5);
        assert_eq!(truncate_summary(&text, 3), "ééé...");
    }

    #[test]
    fn test_summarize_defaults() {
        let article = summarize(&RawEntry::default(), MAX_SUMMARY_LENGTH);
        assert_eq!(article.title, NO_TITLE);
        assert_eq!(article.link, NO_LINK);
        assert_eq!(article.summary, NO_SUMMARY);
    }

    #[test]
    fn test_summarize_keeps_empty_summary() {
        let article = summarize(&entry("Title", ""), MAX_SUMMARY_LENGTH);
        assert_eq!(article.summary, "");
    }

    #[test]
    fn test_filter_preserves_feed_order() {
        let entries = vec![
            entry("Markets open higher", ""),
            entry("Local Weather", "sunny all week"),
            entry("Sports", "markets for tickets"),
            entry("MARKETS close", "<b>Stocks</b> end the day"),
        ];
        let query = KeywordQuery::parse("markets");
        let matched = filter_entries(&entries, &query, MAX_SUMMARY_LENGTH);

        let titles: Vec<_> = matched.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Markets open higher", "Sports", "MARKETS close"]);
        assert_eq!(matched[2].summary, "Stocks end the day");
    }

    #[test]
    fn test_filter_empty_input() {
        let query = KeywordQuery::parse("markets");
        assert!(filter_entries(&[], &query, MAX_SUMMARY_LENGTH).is_empty());
    }
}
