//! JSON artifact writers.
//!
//! All JSON handoff files are pretty-printed arrays with non-ASCII text kept
//! as-is. The link list is the only file merged across runs: new links are
//! appended to whatever an earlier session saved and deduplicated by URL.

use crate::models::LinkRecord;
use crate::utils::dedup_by_key;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument, warn};

/// Totals reported after merging links into the link file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkMerge {
    /// Links scraped in this session (before dedup).
    pub new_records: usize,
    /// Records in the file after the merge.
    pub total_records: usize,
}

/// Serialize `value` as pretty JSON to `path`, creating parent directories.
pub async fn write_pretty<T, P>(path: P, value: &T) -> Result<(), Box<dyn Error>>
where
    T: Serialize + ?Sized,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).await?;
    Ok(())
}

/// Read a JSON array from `path`.
pub async fn read_records<T, P>(path: P) -> Result<Vec<T>, Box<dyn Error>>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let raw = fs::read_to_string(path).await?;
    let records = serde_json::from_str(&raw)?;
    Ok(records)
}

/// Merge `links` into the JSON link file at `path`.
///
/// A missing, empty or syntactically broken file starts empty. Earlier
/// records win over later duplicates.
///
/// # Errors
///
/// A file that parses as JSON but not as a link list is left untouched and
/// reported, so accumulated history is never overwritten.
#[instrument(level = "info", skip(links), fields(new = links.len()))]
pub async fn save_links_to_json(
    links: &[LinkRecord],
    path: &str,
) -> Result<LinkMerge, Box<dyn Error>> {
    let existing: Vec<LinkRecord> = if Path::new(path).exists() {
        let raw = fs::read_to_string(path).await?;
        match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(e) if e.is_syntax() || e.is_eof() => {
                warn!(error = %e, "Existing link file is not valid JSON; starting fresh");
                Vec::new()
            }
            Err(e) => {
                return Err(format!("Existing link file {path} has unexpected records: {e}").into());
            }
        }
    } else {
        Vec::new()
    };

    let combined = existing.into_iter().chain(links.iter().cloned()).collect();
    let deduped = dedup_by_key(combined, |l: &LinkRecord| l.url.clone());
    write_pretty(path, &deduped).await?;

    let merge = LinkMerge {
        new_records: links.len(),
        total_records: deduped.len(),
    };
    info!(
        new = merge.new_records,
        total = merge.total_records,
        "Saved link records"
    );
    Ok(merge)
}
