use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::StatusCode;
use url::Url;

use super::client::{build_client, url_allowed};
use crate::config::FetchConfig;

/// Conventional icon locations, probed in order when the markup has no
/// verifiable hint.
const WELL_KNOWN_PATHS: &[&str] = &[
    "/favicon.ico",
    "/favicon.png",
    "/favicon.jpg",
    "/favicon.jpeg",
    "/favicon.gif",
    "/favicon.webp",
    "/apple-touch-icon.png",
    "/apple-touch-icon-precomposed.png",
    "/apple-touch-icon-180x180.png",
    "/apple-touch-icon-120x120.png",
    "/apple-touch-icon-76x76.png",
    "/apple-touch-icon-60x60.png",
];

// Hint patterns in search order: <link rel=icon> in both attribute
// orderings, then og:image, then twitter:image. Matching is
// case-insensitive over the raw markup so candidate hrefs keep their
// original case.
static HINT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#"(?i)<link[^>]*rel=["'](?:shortcut\s+)?(?:icon|apple-touch-icon)["'][^>]*href=["']([^"']+)["']"#,
        r#"(?i)<link[^>]*href=["']([^"']+)["'][^>]*rel=["'](?:shortcut\s+)?(?:icon|apple-touch-icon)["']"#,
        r#"(?i)<meta[^>]*property=["']og:image["'][^>]*content=["']([^"']+)["']"#,
        r#"(?i)<meta[^>]*name=["']twitter:image["'][^>]*content=["']([^"']+)["']"#,
    ]
    .iter()
    .map(|p| Regex::new(p).expect("failed to compile icon hint regex"))
    .collect()
});

/// Markup-hinted icon candidates in search order, each resolved against
/// the page URL. Pure; verification happens in `locate_favicon`.
pub fn icon_candidates(html: &str, page_url: &Url) -> Vec<String> {
    let mut candidates = Vec::new();

    for pattern in HINT_PATTERNS.iter() {
        for caps in pattern.captures_iter(html) {
            let href = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            if href.is_empty() {
                continue;
            }

            match page_url.join(href) {
                Ok(resolved) => candidates.push(resolved.to_string()),
                Err(err) => log::debug!("icon href {href:?} did not resolve: {err}"),
            }
        }
    }

    candidates
}

fn origin_of(page_url: &Url) -> Option<String> {
    let host = page_url.host_str()?;

    match page_url.port() {
        Some(port) => Some(format!("{}://{host}:{port}", page_url.scheme())),
        None => Some(format!("{}://{host}", page_url.scheme())),
    }
}

/// Ordered icon search: markup hints, then well-known paths against the
/// page origin, then the bare `/favicon.ico` fallback. The first candidate
/// that answers HEAD 200 within the probe timeout wins; none found is a
/// miss, not an error.
pub fn locate_favicon(html: &str, page_url: &Url, config: &FetchConfig) -> Option<String> {
    for candidate in icon_candidates(html, page_url) {
        if favicon_exists(&candidate, config) {
            return Some(candidate);
        }
    }

    let origin = origin_of(page_url)?;

    for path in WELL_KNOWN_PATHS {
        let candidate = format!("{origin}{path}");
        if favicon_exists(&candidate, config) {
            return Some(candidate);
        }
    }

    // already probed above; kept as the final safety net
    let fallback = format!("{origin}/favicon.ico");
    if favicon_exists(&fallback, config) {
        return Some(fallback);
    }

    None
}

fn favicon_exists(icon_url: &str, config: &FetchConfig) -> bool {
    let parsed = match Url::parse(icon_url) {
        Ok(u) => u,
        Err(_) => return false,
    };

    if !url_allowed(&parsed, config) {
        return false;
    }

    let client = match build_client(config, config.probe_timeout()) {
        Ok(c) => c,
        Err(err) => {
            log::error!("{icon_url}: could not build probe client: {err}");
            return false;
        }
    };

    match client.head(icon_url).send() {
        Ok(resp) => resp.status() == StatusCode::OK,
        Err(err) => {
            log::debug!("{icon_url}: probe failed: {err}");
            false
        }
    }
}
