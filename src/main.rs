use anyhow::Result;
use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::info;

use feedsift::config::SearchConfig;
use feedsift::logging;
use feedsift::rss::FeedFetcher;
use feedsift::{web, Aggregator};

/// Search several news feeds for articles matching keywords.
#[derive(Parser, Debug)]
#[clap(name = "feedsift", about = "Keyword search across news feeds")]
struct Args {
    /// Address to listen on
    #[clap(long, env = "HOST", default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port to listen on
    #[clap(long, env = "PORT", default_value = "5001")]
    port: u16,

    /// Enable debug logging
    #[clap(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::configure_logging(args.debug);

    let config = SearchConfig::from_env();
    info!(
        "Searching {} sources (summary limit {} characters, source timeout {:?})",
        config.sources.len(),
        config.max_summary_length,
        config.source_timeout
    );

    let fetcher = FeedFetcher::new()?;
    let aggregator = Arc::new(Aggregator::new(config, fetcher));

    web::serve(aggregator, SocketAddr::new(args.host, args.port)).await
}
