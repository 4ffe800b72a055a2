//! Utility functions for timestamps, string cleanup, and file system checks.
//!
//! - Timestamp formatting shared by every stage's output
//! - Whitespace normalization and log truncation
//! - URL deduplication that keeps the first occurrence
//! - Output directory and file name helpers

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use itertools::Itertools;
use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Timestamp format written into `Scrape Date` fields.
pub const SCRAPE_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time in [`SCRAPE_DATE_FORMAT`].
pub fn scrape_timestamp() -> String {
    Local::now().format(SCRAPE_DATE_FORMAT).to_string()
}

/// Today's local date as `YYYYMMDD`, used to stamp output file names.
pub fn today_stamp() -> String {
    Local::now().format("%Y%m%d").to_string()
}

/// Parse the date strings found in pipeline files.
///
/// Accepts our own `Scrape Date` format, RFC 3339, RFC 2822 (RSS `pubDate`)
/// and bare `YYYY-MM-DD`. Returns `None` for anything else, including the
/// "No date available" placeholder.
pub fn parse_loose_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, SCRAPE_DATE_FORMAT) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.naive_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Render a unix timestamp (seconds) back into [`SCRAPE_DATE_FORMAT`], UTC.
pub fn format_timestamp(secs: i64) -> String {
    chrono::Utc
        .timestamp_opt(secs, 0)
        .single()
        .map(|dt| dt.format(SCRAPE_DATE_FORMAT).to_string())
        .unwrap_or_default()
}

/// Collapse every run of whitespace into a single space and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().join(" ")
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut at the last char boundary at or before `max` bytes
/// and get a `"…(+N bytes)"` marker.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Keep the first record for every key, preserving input order.
pub fn dedup_by_key<T, K, F>(items: Vec<T>, key: F) -> Vec<T>
where
    K: Eq + std::hash::Hash,
    F: FnMut(&T) -> K,
{
    items.into_iter().unique_by(key).collect()
}

/// File name without directory and extension (`"a/b/links.json"` -> `"links"`).
pub fn file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string())
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
