//! NewsBrief RSS search feeds.
//!
//! One UTC day is fetched as four six-hour search windows. Items carry the
//! publisher URL in `<link>` and an RFC 2822 `<pubDate>`.

use crate::models::{FeedEntry, NO_DATE};
use crate::settings::Settings;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::error::Error;
use tracing::{debug, info, instrument, warn};

/// Six-hour windows covering a UTC day, as (from, to) clock times.
const WINDOWS: [(&str, &str); 4] = [
    ("00:00:00", "05:59:59"),
    ("06:00:00", "11:59:59"),
    ("12:00:00", "17:59:59"),
    ("18:00:00", "23:59:59"),
];

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    link: Option<String>,
    #[serde(rename = "pubDate", default)]
    pub_date: Option<String>,
}

/// Search feed URLs for the four windows of `date`.
pub fn generate_rss_urls(settings: &Settings, date: NaiveDate) -> Vec<String> {
    let base = settings.newsbrief_base_url.trim_end_matches('/');
    WINDOWS
        .iter()
        .map(|(from, to)| {
            let date_to = format!("{date}T{to}Z");
            let date_from = format!("{date}T{from}Z");
            format!(
                "{base}/rss/rss?language={}&type=search&mode=advanced&dateto={}&datefrom={}&category={}",
                urlencoding::encode(&settings.language),
                urlencoding::encode(&date_to),
                urlencoding::encode(&date_from),
                urlencoding::encode(&settings.category),
            )
        })
        .collect()
}

/// Parse one RSS document into feed entries.
///
/// Items without a link are dropped; items without a `pubDate` get
/// [`NO_DATE`].
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>, Box<dyn Error>> {
    let rss: Rss = quick_xml::de::from_str(xml)?;
    let entries = rss
        .channel
        .items
        .into_iter()
        .filter_map(|item| {
            let url = item.link.map(|l| l.trim().to_string()).filter(|l| !l.is_empty())?;
            let date = item
                .pub_date
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| NO_DATE.to_string());
            Some(FeedEntry { url, date })
        })
        .collect();
    Ok(entries)
}

/// Fetch and parse every feed, skipping feeds that fail.
#[instrument(level = "info", skip_all, fields(feeds = rss_urls.len()))]
pub async fn parse_rss_feeds(client: &Client, rss_urls: &[String]) -> Vec<FeedEntry> {
    let mut news_data = Vec::new();
    for url in rss_urls {
        match fetch_feed(client, url).await {
            Ok(entries) => {
                debug!(%url, count = entries.len(), "Parsed feed");
                news_data.extend(entries);
            }
            Err(e) => warn!(%url, error = %e, "Feed fetch failed; skipping"),
        }
    }
    info!(count = news_data.len(), "Collected feed entries");
    news_data
}

async fn fetch_feed(client: &Client, url: &str) -> Result<Vec<FeedEntry>, Box<dyn Error>> {
    let xml = client.get(url).send().await?.error_for_status()?.text().await?;
    parse_feed(&xml)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>NewsBrief search</title>
    <link>https://emm.newsbrief.eu</link>
    <item>
      <title>Listeria recall</title>
      <link>https://news.example.com/listeria?id=1&amp;lang=en</link>
      <pubDate>Mon, 09 Jun 2025 04:12:00 +0200</pubDate>
    </item>
    <item>
      <title>No date</title>
      <link>https://news.example.com/nodate</link>
    </item>
    <item>
      <title>No link</title>
      <pubDate>Mon, 09 Jun 2025 05:00:00 +0200</pubDate>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_generate_rss_urls_covers_day() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 9).unwrap();
        let urls = generate_rss_urls(&Settings::default(), date);
        assert_eq!(urls.len(), 4);
        assert_eq!(
            urls[0],
            "https://emm.newsbrief.eu/rss/rss?language=en&type=search&mode=advanced\
             &dateto=2025-06-09T05%3A59%3A59Z&datefrom=2025-06-09T00%3A00%3A00Z&category=FoodSafety"
        );
        assert!(urls[3].contains("dateto=2025-06-09T23%3A59%3A59Z"));
        assert!(urls[3].contains("datefrom=2025-06-09T18%3A00%3A00Z"));
    }

    #[test]
    fn test_parse_feed() {
        let entries = parse_feed(FEED).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].url, "https://news.example.com/listeria?id=1&lang=en");
        assert_eq!(entries[0].date, "Mon, 09 Jun 2025 04:12:00 +0200");
        assert_eq!(entries[1].date, NO_DATE);
    }

    #[test]
    fn test_parse_feed_without_items() {
        let xml = "<rss><channel><title>empty</title></channel></rss>";
        assert!(parse_feed(xml).unwrap().is_empty());
    }

    #[test]
    fn test_parse_feed_rejects_garbage() {
        assert!(parse_feed("<html><body><p>not a feed</p></body></html>").is_err());
    }

    #[tokio::test]
    async fn test_parse_rss_feeds_skips_failing_feeds() {
        let mut server = mockito::Server::new_async().await;
        let _good = server
            .mock("GET", "/good")
            .with_status(200)
            .with_header("content-type", "application/rss+xml")
            .with_body(FEED)
            .create_async()
            .await;
        let _down = server
            .mock("GET", "/down")
            .with_status(503)
            .create_async()
            .await;
        let _html = server
            .mock("GET", "/html")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html><body>maintenance</body></html>")
            .create_async()
            .await;

        let urls: Vec<String> = ["/down", "/good", "/html"]
            .iter()
            .map(|p| format!("{}{p}", server.url()))
            .collect();
        let entries = parse_rss_feeds(&Client::new(), &urls).await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].url, "https://news.example.com/nodate");
    }
}
