//! Scraper settings loaded from an optional YAML file.
//!
//! Every field has a default, so a settings file only needs the keys it
//! wants to override:
//!
//! ```yaml
//! category: AnimalHealth
//! max_pages: 10
//! ```

use serde::Deserialize;
use std::error::Error;
use tokio::fs;
use tracing::{info, instrument};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36";

/// Where and how the scrapers talk to the news aggregator.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root of the NewsBrief aggregator, without trailing slash.
    pub newsbrief_base_url: String,
    /// Article language filter.
    pub language: String,
    /// Aggregator category (the `option` / `category` query parameter).
    pub category: String,
    /// Hard limit on listing pages visited per session.
    pub max_pages: u32,
    pub user_agent: String,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            newsbrief_base_url: "https://emm.newsbrief.eu".to_string(),
            language: "en".to_string(),
            category: "FoodSafety".to_string(),
            max_pages: 5,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl Settings {
    /// Parse settings from YAML text.
    pub fn from_yaml(yaml: &str) -> Result<Self, Box<dyn Error>> {
        let settings: Settings = serde_yaml::from_str(yaml)?;
        Ok(settings)
    }

    /// Load settings from `path`, or return defaults when no path is given.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&str>) -> Result<Self, Box<dyn Error>> {
        match path {
            Some(p) => {
                let yaml = fs::read_to_string(p).await?;
                let settings = Self::from_yaml(&yaml)?;
                info!(path = p, category = %settings.category, "Loaded settings");
                Ok(settings)
            }
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.category, "FoodSafety");
        assert_eq!(s.max_pages, 5);
        assert_eq!(s.request_timeout_secs, 10);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let s = Settings::from_yaml("category: AnimalHealth\nmax_pages: 2\n").unwrap();
        assert_eq!(s.category, "AnimalHealth");
        assert_eq!(s.max_pages, 2);
        assert_eq!(s.language, "en");
        assert_eq!(s.newsbrief_base_url, "https://emm.newsbrief.eu");
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        assert!(Settings::from_yaml("max_pages: [not, a, number]").is_err());
    }

    #[tokio::test]
    async fn test_load_without_path() {
        let s = Settings::load(None).await.unwrap();
        assert_eq!(s.language, "en");
    }
}
