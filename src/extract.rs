// src/extract.rs

//! Extraction capability: response body in, items plus continuation flag out.

use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::PageSelectors;
use crate::utils::{extract_item_id, resolve_url};

/// What one page yielded.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub items: Vec<Value>,
    pub more: bool,
}

/// Pure function from a response body to structured items and a continuation
/// flag.
///
/// Implementations must not perform I/O. An error here is a fault of the
/// crawl instance (bad selectors, unparseable format), never a retryable
/// failure.
pub trait Extractor: Send + Sync {
    fn extract(&self, body: &str) -> Result<Extraction>;
}

/// Extractor for JSON APIs answering `{"items": [...], "more": bool}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonExtractor;

#[derive(Deserialize)]
struct JsonPage {
    #[serde(default)]
    items: Vec<Value>,
    #[serde(default)]
    more: bool,
}

impl Extractor for JsonExtractor {
    fn extract(&self, body: &str) -> Result<Extraction> {
        let page: JsonPage = serde_json::from_str(body)?;
        Ok(Extraction {
            items: page.items,
            more: page.more,
        })
    }
}

/// CSS-selector extractor for HTML listings.
///
/// Each row matching the configured selector becomes one JSON item with
/// `title`, `link` and optionally `date` and `id` fields. The page is
/// considered to continue while it stays full (`full_page` rows or more).
pub struct SelectorExtractor {
    row: Selector,
    title: Selector,
    link: Option<Selector>,
    date: Option<Selector>,
    attr: String,
    base_url: Option<Url>,
    full_page: usize,
}

impl SelectorExtractor {
    /// Compile the configured selectors.
    pub fn new(selectors: &PageSelectors) -> Result<Self> {
        Ok(Self {
            row: parse_selector(&selectors.row)?,
            title: parse_selector(&selectors.title)?,
            link: selectors
                .link
                .as_deref()
                .map(parse_selector)
                .transpose()?,
            date: selectors
                .date
                .as_deref()
                .map(parse_selector)
                .transpose()?,
            attr: selectors.attr.clone(),
            base_url: selectors
                .base_url
                .as_deref()
                .map(Url::parse)
                .transpose()?,
            full_page: selectors.full_page,
        })
    }

    fn parse_row(&self, row: ElementRef<'_>) -> Option<Value> {
        let title_elem = row.select(&self.title).next()?;
        let title = squash_whitespace(&title_elem.text().collect::<String>());
        if title.is_empty() {
            return None;
        }

        let link_elem = self
            .link
            .as_ref()
            .and_then(|sel| row.select(sel).next())
            .or(Some(title_elem));
        let raw_link = link_elem
            .and_then(|e| e.value().attr(&self.attr))
            .unwrap_or("");
        let link = match &self.base_url {
            Some(base) => resolve_url(base, raw_link),
            None => raw_link.to_string(),
        };

        let id = extract_item_id(&link);
        let mut item = json!({ "title": title, "link": link });
        if let Some(date_sel) = &self.date {
            if let Some(date_elem) = row.select(date_sel).next() {
                let date = squash_whitespace(&date_elem.text().collect::<String>());
                item["date"] = Value::String(date);
            }
        }
        if let Some(id) = id {
            item["id"] = Value::String(id);
        }

        Some(item)
    }
}

impl Extractor for SelectorExtractor {
    fn extract(&self, body: &str) -> Result<Extraction> {
        let document = Html::parse_document(body);
        let items: Vec<Value> = document
            .select(&self.row)
            .filter_map(|row| self.parse_row(row))
            .collect();

        let more = self.full_page > 0 && items.len() >= self.full_page;
        Ok(Extraction { items, more })
    }
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

fn squash_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing_selectors() -> PageSelectors {
        PageSelectors {
            row: "tr.item".into(),
            title: "a.title".into(),
            link: None,
            date: Some("td.date".into()),
            attr: "href".into(),
            base_url: Some("https://example.com/board/".into()),
            full_page: 2,
        }
    }

    const LISTING: &str = r#"
        <table>
          <tr class="item">
            <td><a class="title" href="view?id=11"> First   notice </a></td>
            <td class="date">2026-08-01</td>
          </tr>
          <tr class="item">
            <td><a class="title" href="view?id=12">Second notice</a></td>
            <td class="date">2026-08-02</td>
          </tr>
        </table>
    "#;

    #[test]
    fn json_extractor_reads_items_and_flag() {
        let extraction = JsonExtractor
            .extract(r#"{"items": [{"n": 1}, {"n": 2}], "more": true}"#)
            .unwrap();
        assert_eq!(extraction.items.len(), 2);
        assert!(extraction.more);
    }

    #[test]
    fn json_extractor_rejects_garbage() {
        assert!(JsonExtractor.extract("<html>not json</html>").is_err());
    }

    #[test]
    fn selector_extractor_builds_items_from_rows() {
        let extractor = SelectorExtractor::new(&listing_selectors()).unwrap();
        let extraction = extractor.extract(LISTING).unwrap();

        assert_eq!(extraction.items.len(), 2);
        let first = &extraction.items[0];
        assert_eq!(first["title"], "First notice");
        assert_eq!(first["link"], "https://example.com/board/view?id=11");
        assert_eq!(first["date"], "2026-08-01");
        assert_eq!(first["id"], "11");
    }

    #[test]
    fn full_page_heuristic_drives_continuation() {
        let extractor = SelectorExtractor::new(&listing_selectors()).unwrap();
        assert!(extractor.extract(LISTING).unwrap().more);

        let mut selectors = listing_selectors();
        selectors.full_page = 3;
        let extractor = SelectorExtractor::new(&selectors).unwrap();
        assert!(!extractor.extract(LISTING).unwrap().more);
    }

    #[test]
    fn zero_full_page_never_continues() {
        let mut selectors = listing_selectors();
        selectors.full_page = 0;
        let extractor = SelectorExtractor::new(&selectors).unwrap();
        assert!(!extractor.extract(LISTING).unwrap().more);
    }

    #[test]
    fn invalid_row_selector_is_rejected() {
        let mut selectors = listing_selectors();
        selectors.row = "[[invalid".into();
        assert!(SelectorExtractor::new(&selectors).is_err());
    }

    #[test]
    fn rows_without_titles_are_skipped() {
        let extractor = SelectorExtractor::new(&listing_selectors()).unwrap();
        let extraction = extractor
            .extract(r#"<table><tr class="item"><td>no title here</td></tr></table>"#)
            .unwrap();
        assert!(extraction.items.is_empty());
    }
}
