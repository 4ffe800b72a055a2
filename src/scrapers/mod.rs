//! Scrapers for discovering article URLs and fetching their text.
//!
//! The pipeline starts with two discovery jobs and one fetch job:
//!
//! | Stage | Module | Method | Output |
//! |-------|--------|--------|--------|
//! | Listing pages | [`newsbrief`] | HTML scraping, page by page | JSON `[{URL, Scrape Date}]` |
//! | RSS search | [`rss`] | Four six-hour search feeds per day | CSV `URL,Date` |
//! | Article bodies | [`article`] | HTML fetch + text cleanup | JSON or CSV with content |
//!
//! Scrapers share one `reqwest::Client` (see [`crate::http`]), log and skip
//! per-URL failures, and never abort a batch because of a single bad page.

pub mod article;
pub mod newsbrief;
pub mod rss;
