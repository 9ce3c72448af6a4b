//! HTTP front end: a search form plus a JSON endpoint over the aggregator.

use anyhow::Result;
use axum::{
    extract::{Query, State},
    response::Html,
    routing::get,
    Form, Json, Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::aggregator::{Aggregator, SearchResponse};
use crate::rss::{FeedRetriever, FeedStatus};

#[derive(Debug, Default, Deserialize)]
pub struct SearchForm {
    #[serde(default)]
    pub keywords: String,
}

pub fn router<R: FeedRetriever + 'static>(aggregator: Arc<Aggregator<R>>) -> Router {
    Router::new()
        .route("/", get(index).post(search_form::<R>))
        .route("/api/search", get(search_api::<R>))
        .with_state(aggregator)
}

pub async fn serve<R: FeedRetriever + 'static>(
    aggregator: Arc<Aggregator<R>>,
    addr: SocketAddr,
) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", addr, e))?;

    info!("Server running on http://{}", addr);

    axum::serve(listener, router(aggregator).into_make_service()).await?;
    Ok(())
}

async fn index() -> Html<String> {
    Html(render_page(&SearchResponse::idle()))
}

async fn search_form<R: FeedRetriever + 'static>(
    State(aggregator): State<Arc<Aggregator<R>>>,
    Form(form): Form<SearchForm>,
) -> Html<String> {
    Html(render_page(&aggregator.search(&form.keywords).await))
}

async fn search_api<R: FeedRetriever + 'static>(
    State(aggregator): State<Arc<Aggregator<R>>>,
    Query(form): Query<SearchForm>,
) -> Json<SearchResponse> {
    Json(aggregator.search(&form.keywords).await)
}

/// Escape text for use in HTML element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn status_note(status: FeedStatus) -> Option<&'static str> {
    match status {
        FeedStatus::Ok | FeedStatus::Malformed => None,
        FeedStatus::Failed => Some("feed unavailable"),
        FeedStatus::TimedOut => Some("feed timed out"),
    }
}

/// Render the search page for `response`.
pub fn render_page(response: &SearchResponse) -> String {
    let mut page = String::new();
    page.push_str(&format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>News Keyword Search</title>
</head>
<body>
<h1>News Keyword Search</h1>
<form method="post" action="/">
<input type="text" name="keywords" value="{}" placeholder="Enter keywords">
<button type="submit">Search</button>
</form>
"#,
        escape_html(&response.keywords)
    ));

    if response.search_attempted {
        match &response.results {
            None => page.push_str("<p>Please enter one or more keywords.</p>\n"),
            Some(results) => {
                page.push_str(&format!(
                    "<h2>Results for &quot;{}&quot;</h2>\n",
                    escape_html(&response.keywords)
                ));
                if results.total_matches() == 0 {
                    page.push_str("<p>No articles matched your keywords.</p>\n");
                }
                for result in results {
                    page.push_str(&format!("<section>\n<h3>{}", escape_html(&result.source)));
                    if let Some(note) = status_note(result.status) {
                        page.push_str(&format!(" <small>({})</small>", note));
                    }
                    page.push_str("</h3>\n");

                    if result.articles.is_empty() {
                        page.push_str("<p>No matching articles.</p>\n");
                    } else {
                        page.push_str("<ul>\n");
                        for article in &result.articles {
                            page.push_str(&format!(
                                "<li><a href=\"{}\" target=\"_blank\">{}</a>",
                                escape_html(&article.link),
                                escape_html(&article.title)
                            ));
                            if let Some(published) = article.published {
                                page.push_str(&format!(
                                    " <small>{}</small>",
                                    published.format("%Y-%m-%d %H:%M UTC")
                                ));
                            }
                            page.push_str(&format!("<p>{}</p></li>\n", escape_html(&article.summary)));
                        }
                        page.push_str("</ul>\n");
                    }
                    page.push_str("</section>\n");
                }
            }
        }
    }

    page.push_str("</body>\n</html>\n");
    page
}
