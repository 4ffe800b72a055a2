//! CSV artifacts.
//!
//! The feed file only ever grows: each run reads the URLs already present in
//! the first column and appends entries it has not seen. The topic CSV is
//! rewritten on every `topics` run over a CSV corpus.

use crate::models::{CsvTopicRow, FeedEntry, TopicAssignedArticle};
use crate::topics::keyphrases::join_keyphrases;
use std::collections::HashSet;
use std::error::Error;
use std::fs::OpenOptions;
use std::path::Path;
use tracing::{info, instrument};

/// URLs already recorded in the first column of `path` (header skipped).
fn seen_urls(path: &Path) -> Result<HashSet<String>, Box<dyn Error>> {
    let mut seen = HashSet::new();
    if !path.exists() {
        return Ok(seen);
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    for record in reader.records() {
        if let Some(url) = record?.get(0) {
            seen.insert(url.to_string());
        }
    }
    Ok(seen)
}

/// Append unseen `entries` to the CSV at `path`, returning how many were written.
///
/// A `URL,Date` header is written when the file is new or empty.
#[instrument(level = "info", skip(entries), fields(entries = entries.len()))]
pub fn save_feed_entries_to_csv(entries: &[FeedEntry], path: &str) -> Result<usize, Box<dyn Error>> {
    let path = Path::new(path);
    let mut seen = seen_urls(path)?;

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let is_empty = file.metadata()?.len() == 0;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    if is_empty {
        writer.write_record(["URL", "Date"])?;
    }

    let mut written = 0;
    for entry in entries {
        if seen.insert(entry.url.clone()) {
            writer.write_record([&entry.url, &entry.date])?;
            written += 1;
        }
    }
    writer.flush()?;

    info!(written, known = seen.len(), "Appended feed entries");
    Ok(written)
}

/// Write `Document,Topic_ID,Keyphrases,url,Date` rows for every record,
/// replacing `path`. Returns the number of rows written.
#[instrument(level = "info", skip(records), fields(records = records.len()))]
pub fn save_topic_assignments_to_csv(
    records: &[TopicAssignedArticle],
    path: &Path,
) -> Result<usize, Box<dyn Error>> {
    let mut writer = csv::Writer::from_path(path)?;
    for rec in records {
        writer.serialize(CsvTopicRow {
            document: &rec.summarized.summary,
            topic_id: rec.assigned_topic,
            keyphrases: join_keyphrases(&rec.keyphrases),
            url: &rec.summarized.article.url,
            date: &rec.summarized.article.scrape_date,
        })?;
    }
    writer.flush()?;
    info!(path = %path.display(), "Saved topic CSV");
    Ok(records.len())
}
