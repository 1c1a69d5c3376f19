use reqwest::StatusCode;
use url::Url;

use super::client::{build_client, url_allowed};
use super::types::FetchError;
use crate::config::FetchConfig;

/// Fetch the page body as text. One GET, no retries; the configured page
/// timeout is the only upper bound on the call.
pub fn fetch_page(url: &Url, config: &FetchConfig) -> Result<String, FetchError> {
    if !url_allowed(url, config) {
        return Err(FetchError::PolicyDenied {
            url: url.to_string(),
        });
    }

    let client = build_client(config, config.page_timeout()).map_err(|source| {
        FetchError::Unreachable {
            url: url.to_string(),
            source,
        }
    })?;

    log::debug!("{url}: requesting");

    let resp = client
        .get(url.as_str())
        .send()
        .map_err(|source| FetchError::Unreachable {
            url: url.to_string(),
            source,
        })?;

    let status = resp.status();
    if status != StatusCode::OK {
        return Err(FetchError::BadStatus {
            url: url.to_string(),
            status,
        });
    }

    // we might get OK, but a body that cannot be read to the end
    let bytes = resp.bytes().map_err(|source| FetchError::UnreadableBody {
        url: url.to_string(),
        source,
    })?;

    Ok(String::from_utf8_lossy(&bytes).to_string())
}
