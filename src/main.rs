//! Command-line entry point: one invocation, one report.
//!
//! ```sh
//! TWITTER_V2_BEARER_TOKEN=... breaking_news -o ./out
//! ```
//!
//! Logs go to stderr so the JSON report can be piped from stdout.

use breaking_news::cli::Cli;
use breaking_news::config::Config;
use breaking_news::fetch::HttpFetcher;
use breaking_news::outputs::json;
use breaking_news::{aggregate, build_sources, version_tag};
use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("breaking_news starting up");

    let args = Cli::parse();
    debug!(config = ?args.config, output_dir = ?args.output_dir, "Parsed CLI arguments");

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let config = args.apply_overrides(config);
    config.validate()?;

    let fetcher = Arc::new(HttpFetcher::new(&config.http)?);
    let sources = build_sources(&config, fetcher);

    let report = match aggregate(&sources, config.aggregate_timeout()).await {
        Ok(report) => report.with_version(version_tag()),
        Err(e) => {
            error!(error = %e, "Could not build a news report");
            return Err(e.into());
        }
    };

    match &args.output_dir {
        Some(dir) => {
            json::write_report(&report, dir).await?;
        }
        None => println!("{}", json::to_json(&report)?),
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        items = report.items.len(),
        version = %report.version,
        "Execution complete"
    );

    Ok(())
}
