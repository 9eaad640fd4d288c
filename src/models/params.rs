// src/models/params.rs

//! Paging cursor and per-crawl counters.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Paging cursor for one crawl instance.
///
/// Only the engine mutates it: once per successful page with continuation,
/// by `offset += window_size`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlParams {
    /// Index of the first item on the next page
    #[serde(default)]
    pub offset: u64,

    /// Number of items requested per page
    #[serde(default = "defaults::window_size")]
    pub window_size: u64,

    /// Site-specific fields, substituted into address templates by key
    #[serde(default)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for CrawlParams {
    fn default() -> Self {
        Self {
            offset: 0,
            window_size: defaults::window_size(),
            extra: BTreeMap::new(),
        }
    }
}

/// Caller-supplied starting point for a crawl.
///
/// Every field is optional; `resolve` overlays it on the configured defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlSeed {
    #[serde(default)]
    pub offset: Option<u64>,

    #[serde(default)]
    pub window_size: Option<u64>,

    #[serde(default)]
    pub extra: BTreeMap<String, Value>,
}

impl CrawlSeed {
    /// Overlay this seed on `defaults`, field by field.
    ///
    /// Extra fields are replaced whole per key, never merged recursively.
    pub fn resolve(self, defaults: &CrawlParams) -> CrawlParams {
        let mut extra = defaults.extra.clone();
        extra.extend(self.extra);

        CrawlParams {
            offset: self.offset.unwrap_or(defaults.offset),
            window_size: self.window_size.unwrap_or(defaults.window_size),
            extra,
        }
    }
}

/// Counters for one crawl instance.
///
/// `retries` accumulates over the whole crawl; a successful page does not
/// reset it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlCounts {
    pub retries: u32,
    pub pages: u64,
    pub items: u64,
}

mod defaults {
    pub fn window_size() -> u64 {
        100
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn default_params_use_standard_window() {
        let params = CrawlParams::default();
        assert_eq!(params.offset, 0);
        assert_eq!(params.window_size, 100);
        assert!(params.extra.is_empty());
    }

    #[test]
    fn empty_seed_resolves_to_defaults() {
        let defaults = CrawlParams {
            offset: 40,
            window_size: 20,
            extra: BTreeMap::from([("board".to_string(), json!("notices"))]),
        };

        let resolved = CrawlSeed::default().resolve(&defaults);
        assert_eq!(resolved, defaults);
    }

    #[test]
    fn seed_fields_override_defaults_field_by_field() {
        let defaults = CrawlParams {
            offset: 0,
            window_size: 100,
            extra: BTreeMap::from([
                ("board".to_string(), json!("notices")),
                ("lang".to_string(), json!("en")),
            ]),
        };

        let seed = CrawlSeed {
            offset: Some(300),
            window_size: None,
            extra: BTreeMap::from([("board".to_string(), json!("jobs"))]),
        };

        let resolved = seed.resolve(&defaults);
        assert_eq!(resolved.offset, 300);
        assert_eq!(resolved.window_size, 100);
        assert_eq!(resolved.extra["board"], json!("jobs"));
        assert_eq!(resolved.extra["lang"], json!("en"));
    }

    #[test]
    fn seed_extra_values_replace_whole_not_deep() {
        let defaults = CrawlParams {
            extra: BTreeMap::from([(
                "filter".to_string(),
                json!({"kind": "notice", "pinned": true}),
            )]),
            ..CrawlParams::default()
        };

        let seed = CrawlSeed {
            extra: BTreeMap::from([("filter".to_string(), json!({"kind": "job"}))]),
            ..CrawlSeed::default()
        };

        let resolved = seed.resolve(&defaults);
        // The nested object is swapped out entirely; "pinned" does not survive.
        assert_eq!(resolved.extra["filter"], json!({"kind": "job"}));
    }
}
