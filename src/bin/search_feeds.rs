use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use feedsift::config::SearchConfig;
use feedsift::logging;
use feedsift::rss::{FeedFetcher, FeedStatus};
use feedsift::Aggregator;

/// Run a single keyword search against the configured feeds and print the matches.
#[derive(Parser, Debug)]
#[clap(name = "search_feeds", about = "Search the configured news feeds once")]
struct Args {
    /// Keywords; every keyword must appear in the title, or in the summary and content
    #[clap(required = true)]
    keywords: Vec<String>,

    /// Print the result as JSON
    #[clap(long)]
    json: bool,

    /// Enable debug logging
    #[clap(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::configure_logging(args.debug);

    let config = SearchConfig::from_env();
    let fetcher = FeedFetcher::new()?;
    let aggregator = Aggregator::new(config, fetcher);

    let response = aggregator.search(&args.keywords.join(" ")).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    let Some(results) = response.results else {
        println!("{}", "No keywords given, nothing to search.".bright_yellow());
        return Ok(());
    };

    println!("\n{}", "═".repeat(80).bright_blue());
    println!(
        "{}  {}",
        "RESULTS FOR".bright_blue(),
        response.keywords.bright_yellow()
    );
    println!("{}", "═".repeat(80).bright_blue());

    for result in &results {
        let status = match result.status {
            FeedStatus::Ok => "".normal(),
            FeedStatus::Malformed => " (malformed feed)".bright_yellow(),
            FeedStatus::Failed => " (unavailable)".bright_red(),
            FeedStatus::TimedOut => " (timed out)".bright_red(),
        };
        println!(
            "\n{} [{}]{}",
            result.source.bright_magenta(),
            result.articles.len(),
            status
        );
        println!("{}", "─".repeat(80).dimmed());

        if result.articles.is_empty() {
            println!("  {}", "No matching articles".dimmed());
            continue;
        }
        for article in &result.articles {
            println!("  {} {}", "•".bright_green(), article.title.bold());
            println!("    {}", article.link.underline());
            if !article.summary.is_empty() {
                println!("    {}", article.summary);
            }
        }
    }

    println!(
        "\n{}: {}",
        "Total matches".bright_blue(),
        results.total_matches()
    );
    Ok(())
}
