//! Data models for the records handed from one pipeline stage to the next.
//!
//! Every stage reads the previous stage's file and writes its own, so these
//! structs double as the on-disk schema:
//! - [`LinkRecord`]: discovered article URL (`links` output)
//! - [`FeedEntry`]: RSS item (`feeds` output, CSV)
//! - [`ArticleRecord`] / [`ScrapeFailure`]: fetched article text and errors
//! - [`SummarizedArticle`]: article plus its LLM summary
//! - [`TopicAssignedArticle`]: summarized article plus its topic assignment
//!
//! Field names are renamed to the column headers the files have always used
//! (`URL`, `Scrape Date`, ...), so older artifacts keep loading.

use serde::{Deserialize, Serialize};

/// A discovered article link and the local time it was scraped.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LinkRecord {
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Scrape Date", default)]
    pub scrape_date: String,
}

/// Link record as read from an arbitrary input file, where `URL` may be
/// missing or null.
#[derive(Debug, Clone, Deserialize)]
pub struct RawLinkRecord {
    #[serde(rename = "URL", default)]
    pub url: Option<String>,
    #[serde(rename = "Scrape Date", default)]
    pub scrape_date: Option<String>,
}

/// One RSS item: article URL and its publication date string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FeedEntry {
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Date")]
    pub date: String,
}

/// Placeholder written when an RSS item carries no `pubDate`.
pub const NO_DATE: &str = "No date available";

/// Cleaned article body text for one URL.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ArticleRecord {
    #[serde(rename = "URL", default)]
    pub url: String,
    #[serde(rename = "Scrape Date", default)]
    pub scrape_date: String,
    #[serde(rename = "Content", default)]
    pub content: String,
}

/// A URL that could not be scraped, with the reason.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ScrapeFailure {
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Scrape Date")]
    pub scrape_date: String,
    #[serde(rename = "Error")]
    pub error: String,
}

/// Row of the CSV input consumed by the CSV article scraper.
#[derive(Debug, Clone, Deserialize)]
pub struct CsvLinkRow {
    pub url: String,
    pub date: String,
}

/// Row of the CSV article output.
#[derive(Debug, Clone, Serialize)]
pub struct CsvArticleRow<'a> {
    pub url: &'a str,
    pub date: &'a str,
    pub content: &'a str,
}

/// Row of the CSV error log.
#[derive(Debug, Clone, Serialize)]
pub struct CsvErrorRow<'a> {
    pub url: &'a str,
    pub date: &'a str,
    pub error: &'a str,
}

/// Row of a CSV corpus fed straight into topic modeling.
#[derive(Debug, Clone, Deserialize)]
pub struct CsvCorpusRow {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub content: String,
}

/// An article after summarization.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SummarizedArticle {
    #[serde(flatten)]
    pub article: ArticleRecord,
    #[serde(rename = "Summary", default)]
    pub summary: String,
}

/// A summarized article with the topic the model assigned it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TopicAssignedArticle {
    #[serde(flatten)]
    pub summarized: SummarizedArticle,
    #[serde(rename = "Assigned_Topic")]
    pub assigned_topic: i32,
    #[serde(rename = "Topic_Probability")]
    pub topic_probability: f64,
    #[serde(rename = "Topic_Keywords")]
    pub topic_keywords: Vec<String>,
    /// The document's own keyphrases, independent of its topic.
    #[serde(rename = "Keyphrases", default)]
    pub keyphrases: Vec<String>,
}

/// Row of the topic CSV written for CSV corpora.
#[derive(Debug, Clone, Serialize)]
pub struct CsvTopicRow<'a> {
    #[serde(rename = "Document")]
    pub document: &'a str,
    #[serde(rename = "Topic_ID")]
    pub topic_id: i32,
    #[serde(rename = "Keyphrases")]
    pub keyphrases: String,
    pub url: &'a str,
    #[serde(rename = "Date")]
    pub date: &'a str,
}

impl From<CsvCorpusRow> for SummarizedArticle {
    fn from(row: CsvCorpusRow) -> Self {
        SummarizedArticle {
            article: ArticleRecord {
                url: row.url,
                scrape_date: row.date,
                content: row.content.clone(),
            },
            summary: row.content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_record_uses_file_headers() {
        let link = LinkRecord {
            url: "https://example.com/a".to_string(),
            scrape_date: "2025-06-09 10:00:00".to_string(),
        };
        let json = serde_json::to_string(&link).unwrap();
        assert!(json.contains("\"URL\""));
        assert!(json.contains("\"Scrape Date\""));
    }

    #[test]
    fn test_raw_link_record_tolerates_missing_url() {
        let raw: Vec<RawLinkRecord> =
            serde_json::from_str(r#"[{"Scrape Date": "x"}, {"URL": null}, {"URL": "u"}]"#).unwrap();
        assert!(raw[0].url.is_none());
        assert!(raw[1].url.is_none());
        assert_eq!(raw[2].url.as_deref(), Some("u"));
    }

    #[test]
    fn test_summarized_article_flattens_fields() {
        let json = r#"{
            "URL": "https://example.com",
            "Scrape Date": "2025-06-09 10:00:00",
            "Content": "Listeria found in cheese.",
            "Summary": "Cheese recalled."
        }"#;
        let rec: SummarizedArticle = serde_json::from_str(json).unwrap();
        assert_eq!(rec.article.url, "https://example.com");
        assert_eq!(rec.summary, "Cheese recalled.");
    }

    #[test]
    fn test_summary_defaults_to_empty() {
        let rec: SummarizedArticle =
            serde_json::from_str(r#"{"URL": "u", "Content": "c"}"#).unwrap();
        assert_eq!(rec.summary, "");
        assert_eq!(rec.article.scrape_date, "");
    }

    #[test]
    fn test_topic_assigned_article_serialization() {
        let rec = TopicAssignedArticle {
            summarized: SummarizedArticle {
                article: ArticleRecord {
                    url: "u".to_string(),
                    scrape_date: "d".to_string(),
                    content: "c".to_string(),
                },
                summary: "s".to_string(),
            },
            assigned_topic: -1,
            topic_probability: 0.0,
            topic_keywords: vec![],
            keyphrases: vec!["s".to_string()],
        };
        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["Assigned_Topic"], -1);
        assert_eq!(value["Keyphrases"][0], "s");
        assert_eq!(value["Summary"], "s");
        assert_eq!(value["URL"], "u");
    }

    #[test]
    fn test_csv_corpus_row_into_summarized() {
        let rec: SummarizedArticle = CsvCorpusRow {
            url: "u".to_string(),
            date: "2024-01-01".to_string(),
            content: "text".to_string(),
        }
        .into();
        assert_eq!(rec.summary, "text");
        assert_eq!(rec.article.scrape_date, "2024-01-01");
    }
}
