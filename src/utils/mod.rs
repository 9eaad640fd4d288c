//! Small URL helpers shared by extractors.

use url::Url;

/// Resolve a potentially relative link against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Pull a numeric item id out of a link.
///
/// Query-string shapes (`?id=123`, `&seq=123`) are tried before path shapes
/// (`/item/123`).
pub fn extract_item_id(link: &str) -> Option<String> {
    let patterns = [
        regex::Regex::new(r"[?&](?:id|seq|no|idx|item)=(\d+)").ok()?,
        regex::Regex::new(r"/(?:view|item|article|post)/(\d+)").ok()?,
    ];

    for pattern in &patterns {
        if let Some(caps) = pattern.captures(link) {
            if let Some(id) = caps.get(1) {
                return Some(id.as_str().to_string());
            }
        }
    }
    None
}
