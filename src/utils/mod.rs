//! Utility functions and helpers.

pub mod http;
pub mod log;

use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Resolve a URL string against a base URL string.
pub fn resolve(base_url: &str, href: &str) -> Option<String> {
    Url::parse(base_url)
        .ok()
        .map(|base| resolve_url(&base, href))
}

/// Extract the host from a URL string, without a leading `www.`.
pub fn get_domain(url_str: &str) -> Option<String> {
    Url::parse(url_str).ok().and_then(|u| {
        u.host_str()
            .map(|s| s.trim_start_matches("www.").to_lowercase())
    })
}

/// Whether a locator points at an http(s) resource rather than a local file.
pub fn is_remote(locator: &str) -> bool {
    locator.starts_with("http://") || locator.starts_with("https://")
}

/// URL of listing page `page` (1-based); page 1 is the base URL itself.
pub fn page_url(base_url: &str, param: &str, page: usize) -> Option<String> {
    if page <= 1 {
        return Some(base_url.to_string());
    }
    let mut url = Url::parse(base_url).ok()?;
    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != param)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (k, v) in &retained {
            pairs.append_pair(k, v);
        }
        pairs.append_pair(param, &page.to_string());
    }
    Some(url.to_string())
}
