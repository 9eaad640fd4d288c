//! Application configuration structures.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

use super::CrawlParams;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Engine behavior settings
    #[serde(default)]
    pub crawl: CrawlConfig,

    /// Address pattern used by the CLI when none is given on the command line
    #[serde(default)]
    pub address: Option<String>,

    /// Row selectors for the CLI's CSS extractor
    #[serde(default)]
    pub selectors: Option<PageSelectors>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        self.crawl.validate()?;
        if let Some(selectors) = &self.selectors {
            selectors.validate()?;
        }
        Ok(())
    }
}

/// Engine behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Consecutive-failure ceiling before the crawl gives up
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Headers sent with every request
    #[serde(default = "defaults::headers")]
    pub headers: BTreeMap<String, String>,

    /// Outbound proxy address, if any
    #[serde(default)]
    pub proxy: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Fixed delay between successive pages, in milliseconds
    #[serde(default)]
    pub page_delay_ms: u64,

    /// Paging defaults filled into the seed at start
    #[serde(default)]
    pub defaults: CrawlParams,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_retries: defaults::max_retries(),
            headers: defaults::headers(),
            proxy: None,
            timeout_secs: defaults::timeout(),
            page_delay_ms: 0,
            defaults: CrawlParams::default(),
        }
    }
}

impl CrawlConfig {
    /// Validate engine settings.
    pub fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(AppError::validation("crawl.max_retries must be > 0"));
        }
        if self.timeout_secs == 0 {
            return Err(AppError::validation("crawl.timeout_secs must be > 0"));
        }
        if self.defaults.window_size == 0 {
            return Err(AppError::validation(
                "crawl.defaults.window_size must be > 0",
            ));
        }
        Ok(())
    }
}

/// CSS selectors describing one page of item rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSelectors {
    /// CSS selector for item rows
    pub row: String,

    /// CSS selector for the title element within a row
    pub title: String,

    /// Optional link selector (if different from the title element)
    #[serde(default)]
    pub link: Option<String>,

    /// Optional date selector
    #[serde(default)]
    pub date: Option<String>,

    /// HTML attribute carrying the link target
    #[serde(default = "defaults::link_attr")]
    pub attr: String,

    /// Base URL for resolving relative links
    #[serde(default)]
    pub base_url: Option<String>,

    /// Row count at or above which a page counts as full and the crawl
    /// continues; 0 disables continuation
    #[serde(default)]
    pub full_page: usize,
}

impl PageSelectors {
    fn validate(&self) -> Result<()> {
        if self.row.trim().is_empty() {
            return Err(AppError::validation("selectors.row is empty"));
        }
        if self.title.trim().is_empty() {
            return Err(AppError::validation("selectors.title is empty"));
        }
        Ok(())
    }
}

mod defaults {
    use std::collections::BTreeMap;

    pub fn max_retries() -> u32 {
        100
    }

    pub fn timeout() -> u64 {
        30
    }

    pub fn headers() -> BTreeMap<String, String> {
        BTreeMap::from([(
            "User-Agent".to_string(),
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
             Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
        )])
    }

    pub fn link_attr() -> String {
        "href".into()
    }
}
