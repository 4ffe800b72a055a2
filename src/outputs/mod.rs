//! Artifact writers for each job.
//!
//! - [`json`]: pretty JSON handoff files and the merged link list
//! - [`csv`]: the append-only RSS feed file
//! - [`charts`]: plotly HTML pages for the topic model

pub mod charts;
pub mod csv;
pub mod json;
