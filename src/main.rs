//! # Emerging Risk News
//!
//! Batch jobs for an emerging-risk monitoring pipeline: scrape food-safety
//! news links and RSS feeds, fetch and clean article bodies, summarize them
//! with an LLM, and model the topics of the resulting corpus.
//!
//! ## Usage
//!
//! ```sh
//! emerging_risk_news links
//! emerging_risk_news feeds --repeat-hours 24
//! emerging_risk_news articles -i food_safety_links.json
//! emerging_risk_news summarize -i food_safety_links_20250609_output.json
//! emerging_risk_news topics -i data.json
//! ```
//!
//! ## Architecture
//!
//! Every subcommand is an independent job. Jobs hand data to each other
//! through files only:
//! 1. **Links** / **Feeds**: discover article URLs (JSON / CSV)
//! 2. **Articles**: fetch article text for a URL list
//! 3. **Summarize**: LLM summaries, checkpointed after every record
//! 4. **Topics**: topic assignments plus HTML charts

use awful_aj::{config, config_dir, template};
use chrono::Utc;
use clap::Parser;
use reqwest::Client;
use std::error::Error;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod http;
mod models;
mod outputs;
mod scrapers;
mod settings;
mod summarize;
mod topics;
mod utils;

use api::LlmClient;
use cli::{ArticlesArgs, Cli, Commands, FeedsArgs, LinksArgs, SummarizeArgs, TopicsArgs};
use scrapers::{article, newsbrief, rss};
use settings::Settings;
use summarize::SummarizeOptions;
use summarize::chunk::TextTokenizer;
use topics::TopicsOptions;
use utils::ensure_writable_dir;

/// Sleep between repeated sessions; saturates instead of overflowing.
fn session_pause(hours: u64) -> Duration {
    Duration::from_secs(hours.saturating_mul(3600))
}

/// Run `session` once, or forever with `repeat_hours` of sleep in between.
///
/// A failed session ends a one-off run; a repeating run logs it and waits
/// for the next session.
async fn run_sessions<F, Fut>(repeat_hours: Option<u64>, mut session: F) -> Result<(), Box<dyn Error>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), Box<dyn Error>>>,
{
    let Some(hours) = repeat_hours else {
        return session().await;
    };
    loop {
        if let Err(e) = session().await {
            error!(error = %e, "Session failed");
        }
        info!(hours, "Sleeping until the next session");
        tokio::time::sleep(session_pause(hours)).await;
    }
}

#[instrument(level = "info", skip_all, fields(output = %args.output))]
async fn links_session(client: &Client, settings: &Settings, args: &LinksArgs) -> Result<(), Box<dyn Error>> {
    let links = newsbrief::scrape_all_pages_until_empty(client, settings).await?;
    if links.is_empty() {
        info!("No new links found");
    }
    let merge = outputs::json::save_links_to_json(&links, &args.output).await?;
    info!(
        new_records = merge.new_records,
        total_records = merge.total_records,
        "Saved links"
    );
    Ok(())
}

#[instrument(level = "info", skip_all, fields(output = %args.output))]
async fn feeds_session(client: &Client, settings: &Settings, args: &FeedsArgs) -> Result<(), Box<dyn Error>> {
    let today = Utc::now().date_naive();
    let rss_urls = rss::generate_rss_urls(settings, today);
    let entries = rss::parse_rss_feeds(client, &rss_urls).await;
    info!(%today, count = entries.len(), "Fetched feed entries");
    let written = outputs::csv::save_feed_entries_to_csv(&entries, &args.output)?;
    info!(written, "Saved feed entries");
    Ok(())
}

async fn run_articles(client: &Client, args: &ArticlesArgs) -> Result<(), Box<dyn Error>> {
    let input = Path::new(&args.input);
    if input.is_dir() {
        let reports = article::process_csv_directory(client, &args.input).await?;
        info!(files = reports.len(), "Processed CSV directory");
        return Ok(());
    }

    ensure_writable_dir(&args.output_dir).await?;
    let report = if input.extension().is_some_and(|ext| ext == "csv") {
        article::process_csv_file(client, &args.input, &args.output_dir).await?
    } else {
        article::process_json_file(client, &args.input, &args.output_dir).await?
    };
    info!(
        output = %report.output_path.display(),
        errors = %report.error_path.display(),
        scraped = report.scraped,
        failed = report.failed,
        "Scraped articles"
    );
    Ok(())
}

async fn run_summarize(args: &SummarizeArgs) -> Result<(), Box<dyn Error>> {
    let template = template::load_template(&args.template).await?;
    info!(template = %args.template, "Loaded template");

    let conf_file = match &args.config {
        Some(path) => Path::new(path).to_path_buf(),
        None => config_dir()?.join("config.yaml"),
    };
    let config_path = conf_file.to_str().ok_or("Not a valid config filename")?;
    let config = config::load_config(config_path)?;
    info!(config_path, "Loaded configuration");

    let tokenizer = TextTokenizer::load(args.tokenizer.as_deref())?;
    let llm = LlmClient::new(&config, &template);
    let options = SummarizeOptions {
        max_tokens: args.max_tokens,
        timeout: Duration::from_secs(args.timeout_secs),
    };

    match summarize::process_json_file(&llm, &tokenizer, options, &args.input, &args.output, args.start_index).await? {
        Some(path) => info!(path = %path.display(), "Summaries saved"),
        None => error!(input = %args.input, "Nothing summarized"),
    }
    Ok(())
}

async fn run_topics(args: TopicsArgs) -> Result<(), Box<dyn Error>> {
    let opts = TopicsOptions {
        input: args.input,
        output: args.output,
        charts_dir: args.charts_dir,
        min_cluster_size: args.min_cluster_size,
        nr_bins: args.nr_bins,
        search: args.search,
    };
    let report = topics::run(&opts).await?;
    if let Some(path) = &report.csv_path {
        info!(path = %path.display(), "Saved topic CSV");
    }
    info!(
        records = report.records,
        fitted = report.fitted,
        topics = report.topics,
        charts = report.charts.len(),
        output = %report.output_path.display(),
        "Topic modeling complete"
    );
    Ok(())
}

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
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("emerging_risk_news starting up");

    let args = Cli::parse();
    debug!(?args.settings, ?args.command, "Parsed CLI arguments");

    let settings = Settings::load(args.settings.as_deref()).await?;

    match args.command {
        Commands::Links(links_args) => {
            let client = http::build_client(&settings)?;
            run_sessions(links_args.repeat_hours, || links_session(&client, &settings, &links_args)).await?;
        }
        Commands::Feeds(feeds_args) => {
            let client = http::build_client(&settings)?;
            run_sessions(feeds_args.repeat_hours, || feeds_session(&client, &settings, &feeds_args)).await?;
        }
        Commands::Articles(articles_args) => {
            let client = http::build_client(&settings)?;
            run_articles(&client, &articles_args).await?;
        }
        Commands::Summarize(summarize_args) => run_summarize(&summarize_args).await?,
        Commands::Topics(topics_args) => run_topics(topics_args).await?,
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[tokio::test]
    async fn test_single_session_propagates_error() {
        let calls = Cell::new(0);
        let result = run_sessions(None, || {
            calls.set(calls.get() + 1);
            async { Err::<(), Box<dyn Error>>("listing page unavailable".into()) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_session_pause_saturates() {
        assert_eq!(session_pause(2), Duration::from_secs(7200));
        assert_eq!(session_pause(u64::MAX), Duration::from_secs(u64::MAX));
    }

    #[tokio::test]
    async fn test_single_session_ok() {
        let result = run_sessions(None, || async { Ok(()) }).await;
        assert!(result.is_ok());
    }
}
