//! Command-line interface definitions for the emerging-risk pipeline.
//!
//! Each pipeline job is a subcommand. Jobs only share files, so they can be
//! chained by hand or scheduled independently from cron. Most options can
//! also be set through environment variables.

use clap::{Args, Parser, Subcommand};

/// Command-line arguments for the emerging-risk news pipeline.
///
/// # Examples
///
/// ```sh
/// # Collect today's food-safety links once
/// emerging_risk_news links -o food_safety_links.json
///
/// # Poll RSS feeds every 24 hours
/// emerging_risk_news feeds -o news_data.csv --repeat-hours 24
///
/// # Fetch article bodies, summarize them, then model topics
/// emerging_risk_news articles -i food_safety_links.json
/// emerging_risk_news summarize -i food_safety_links_20250609_output.json -o data.json
/// emerging_risk_news topics -i data.json --charts-dir charts
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML settings file overriding scraper defaults
    #[arg(short, long, global = true, env = "EMERGING_RISK_SETTINGS")]
    pub settings: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scrape listing pages for article links and merge them into a JSON file
    Links(LinksArgs),
    /// Poll the RSS search feeds for today and append new entries to a CSV file
    Feeds(FeedsArgs),
    /// Fetch and clean article bodies for a JSON or CSV link list (or a directory of CSVs)
    Articles(ArticlesArgs),
    /// Summarize article bodies with the LLM
    Summarize(SummarizeArgs),
    /// Fit the topic model and write assignments and charts
    Topics(TopicsArgs),
}

#[derive(Args, Debug)]
pub struct LinksArgs {
    /// JSON file the links are merged into
    #[arg(short, long, default_value = "food_safety_links.json")]
    pub output: String,

    /// Run forever, sleeping this many hours between sessions
    #[arg(long)]
    pub repeat_hours: Option<u64>,
}

#[derive(Args, Debug)]
pub struct FeedsArgs {
    /// CSV file new feed entries are appended to
    #[arg(short, long, default_value = "news_data.csv")]
    pub output: String,

    /// Run forever, sleeping this many hours between sessions
    #[arg(long)]
    pub repeat_hours: Option<u64>,
}

#[derive(Args, Debug)]
pub struct ArticlesArgs {
    /// Link list (`.json` or `.csv`) or a directory of CSV files
    #[arg(short, long, default_value = "food_safety_links.json")]
    pub input: String,

    /// Directory for the output and error files (JSON and single-CSV modes)
    #[arg(short, long, default_value = "./")]
    pub output_dir: String,
}

#[derive(Args, Debug)]
pub struct SummarizeArgs {
    /// JSON file of scraped articles
    #[arg(short, long)]
    pub input: String,

    /// JSON file the summarized records are written to
    #[arg(short, long, default_value = "data.json")]
    pub output: String,

    /// Index of the first record to summarize (resume point)
    #[arg(long, default_value_t = 0)]
    pub start_index: usize,

    /// Optional path to the LLM config.yaml file
    #[arg(short, long, env = "AWFUL_AJ_CONFIG")]
    pub config: Option<String>,

    /// Name of the chat template used for summaries
    #[arg(short, long, default_value = "risk_summarizer")]
    pub template: String,

    /// Optional tokenizer.json used to measure chunks (default: whitespace words)
    #[arg(long, env = "SUMMARIZER_TOKENIZER")]
    pub tokenizer: Option<String>,

    /// Maximum tokens per chunk sent to the model
    #[arg(long, default_value_t = 4096)]
    pub max_tokens: usize,

    /// Seconds allowed for summarizing one article
    #[arg(long, default_value_t = 60)]
    pub timeout_secs: u64,
}

#[derive(Args, Debug)]
pub struct TopicsArgs {
    /// Summarized records (`.json`) or a `url,date,content` CSV
    #[arg(short, long, default_value = "data.json")]
    pub input: String,

    /// JSON file with topic assignments
    #[arg(short, long, default_value = "input_with_topics.json")]
    pub output: String,

    /// Directory the HTML charts are written to
    #[arg(long, default_value = ".")]
    pub charts_dir: String,

    /// Smallest group of documents that forms a topic
    #[arg(long, default_value_t = 3)]
    pub min_cluster_size: usize,

    /// Number of time bins for the topics-over-time chart
    #[arg(long, default_value_t = 40)]
    pub nr_bins: usize,

    /// Log the topics most similar to this query
    #[arg(long)]
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links_defaults() {
        let cli = Cli::parse_from(["emerging_risk_news", "links"]);
        match cli.command {
            Commands::Links(args) => {
                assert_eq!(args.output, "food_safety_links.json");
                assert_eq!(args.repeat_hours, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_feeds_repeat_hours() {
        let cli = Cli::parse_from(["emerging_risk_news", "feeds", "--repeat-hours", "24", "-o", "/tmp/feed.csv"]);
        match cli.command {
            Commands::Feeds(args) => {
                assert_eq!(args.repeat_hours, Some(24));
                assert_eq!(args.output, "/tmp/feed.csv");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_settings_after_subcommand() {
        let cli = Cli::parse_from(["emerging_risk_news", "articles", "--settings", "s.yaml", "-i", "links.csv"]);
        assert_eq!(cli.settings.as_deref(), Some("s.yaml"));
        match cli.command {
            Commands::Articles(args) => {
                assert_eq!(args.input, "links.csv");
                assert_eq!(args.output_dir, "./");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_summarize_requires_input() {
        assert!(Cli::try_parse_from(["emerging_risk_news", "summarize"]).is_err());
        let cli = Cli::parse_from(["emerging_risk_news", "summarize", "-i", "in.json", "--start-index", "7"]);
        match cli.command {
            Commands::Summarize(args) => {
                assert_eq!(args.start_index, 7);
                assert_eq!(args.output, "data.json");
                assert_eq!(args.template, "risk_summarizer");
                assert_eq!(args.max_tokens, 4096);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_topics_defaults() {
        let cli = Cli::parse_from(["emerging_risk_news", "topics", "--search", "food security"]);
        match cli.command {
            Commands::Topics(args) => {
                assert_eq!(args.output, "input_with_topics.json");
                assert_eq!(args.min_cluster_size, 3);
                assert_eq!(args.nr_bins, 40);
                assert_eq!(args.search.as_deref(), Some("food security"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
