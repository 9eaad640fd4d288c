// src/template.rs

//! Address construction from crawl parameters.
//!
//! A template maps the paging cursor to a concrete request target. Dynamic
//! templates are re-rendered on every page and are expected to honor the
//! advancing offset; static templates always yield the same target, and the
//! engine suppresses continuation for them.

use std::fmt;

use serde_json::Value;

use crate::models::CrawlParams;

enum Inner {
    Fixed(String),
    Pattern(String),
    Dynamic(Box<dyn Fn(&CrawlParams) -> String + Send + Sync>),
}

/// Mapping from [`CrawlParams`] to a request address.
pub struct AddressTemplate {
    inner: Inner,
    is_static: bool,
}

impl AddressTemplate {
    /// A fixed target. Always static: the crawl stops after one page no
    /// matter what the extractor reports.
    pub fn fixed(address: impl Into<String>) -> Self {
        Self {
            inner: Inner::Fixed(address.into()),
            is_static: true,
        }
    }

    /// A caller-supplied render function, recomputed each page.
    pub fn dynamic(render: impl Fn(&CrawlParams) -> String + Send + Sync + 'static) -> Self {
        Self {
            inner: Inner::Dynamic(Box::new(render)),
            is_static: false,
        }
    }

    /// Build from a pattern with `{offset}`, `{window}` and `{extra-key}`
    /// placeholders.
    ///
    /// Only the offset changes between pages, so a pattern that never
    /// interpolates `{offset}` renders the same address every time and is
    /// treated as static.
    pub fn from_pattern(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let is_static = !pattern.contains("{offset}");
        Self {
            inner: Inner::Pattern(pattern),
            is_static,
        }
    }

    /// Whether continuation is suppressed for this template.
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Render the concrete address for the current cursor position.
    pub fn render(&self, params: &CrawlParams) -> String {
        match &self.inner {
            Inner::Fixed(address) => address.clone(),
            Inner::Dynamic(render) => render(params),
            Inner::Pattern(pattern) => {
                let mut address = pattern
                    .replace("{offset}", &params.offset.to_string())
                    .replace("{window}", &params.window_size.to_string());
                for (key, value) in &params.extra {
                    let placeholder = format!("{{{key}}}");
                    if address.contains(&placeholder) {
                        address = address.replace(&placeholder, &scalar(value));
                    }
                }
                address
            }
        }
    }
}

/// Render a JSON value the way a query string expects it: strings bare,
/// everything else in JSON notation.
fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl fmt::Debug for AddressTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Inner::Fixed(address) => f.debug_tuple("Fixed").field(address).finish(),
            Inner::Pattern(pattern) => f.debug_tuple("Pattern").field(pattern).finish(),
            Inner::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}
