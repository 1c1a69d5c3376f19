pub mod client;
pub mod download;
pub mod favicon;
pub mod normalize;
pub mod page;
pub mod title;
pub mod types;

pub use types::{DownloadError, EnrichFailure, Enrichment, EnrichmentInput, FetchError};

use std::path::Path;
use url::Url;

use crate::config::FetchConfig;

/// Run the full enrichment pipeline for one link: normalize, fetch,
/// extract the title, locate an icon, download it.
///
/// Best effort by contract — every sub-step failure is logged and folded
/// into the outcome, so the caller's create/refresh operation can never be
/// failed by enrichment. Linear, no retries; each network call is bounded
/// by its own configured timeout.
pub fn enrich(input: &EnrichmentInput, favicons_dir: &Path, config: &FetchConfig) -> Enrichment {
    let url = normalize::normalize_url(&input.raw_url);

    let page_url = match Url::parse(&url) {
        Ok(u) => u,
        Err(source) => {
            let failure = EnrichFailure::PageFetch(FetchError::InvalidUrl { url, source });
            log::warn!("link {}: {failure}", input.link_id);
            return Enrichment::degraded(failure);
        }
    };

    let html = match page::fetch_page(&page_url, config) {
        Ok(html) => html,
        Err(err) => {
            let failure = EnrichFailure::PageFetch(err);
            log::warn!("link {}: {failure}", input.link_id);
            return Enrichment::degraded(failure);
        }
    };

    let title = title::extract_title(&html);

    let (favicon_path, failure) = match favicon::locate_favicon(&html, &page_url, config) {
        Some(icon_url) => {
            match download::download_favicon(
                &icon_url,
                favicons_dir,
                input.user_id,
                input.link_id,
                config,
            ) {
                Ok(path) => (path, None),
                Err(err) => {
                    let failure = EnrichFailure::IconDownload(err);
                    log::warn!("link {}: {failure}", input.link_id);
                    (None, Some(failure))
                }
            }
        }
        None => (None, None),
    };

    Enrichment {
        title,
        favicon_path,
        failure,
    }
}
