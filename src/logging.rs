use std::io;
use tracing_appender::rolling;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Install stdout and daily file logging. `RUST_LOG` overrides the stdout filter.
pub fn configure_logging(debug: bool) {
    let default_filter = if debug {
        "debug,web_request=debug,search=debug,hyper=info,reqwest=info"
    } else {
        "info,web_request=info,search=info,hyper=warn,reqwest=warn"
    };

    let stdout_log = fmt::layer().with_writer(io::stdout).with_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
    );

    let file_appender = rolling::daily("logs", "feedsift.log");
    let file_log = fmt::layer()
        .with_ansi(false)
        .with_writer(file_appender)
        .with_filter(EnvFilter::new("info,web_request=debug,search=debug"));

    tracing_subscriber::Registry::default()
        .with(stdout_log)
        .with(file_log)
        .init();
}
