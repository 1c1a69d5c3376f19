use serde::Serialize;

/// Per-invocation input for the enrichment pipeline. Built by the caller,
/// discarded after use.
#[derive(Debug, Clone)]
pub struct EnrichmentInput {
    pub raw_url: String,
    pub user_id: u64,
    pub link_id: u64,
}

/// Outcome of one enrichment run. An absent field means "nothing found,
/// proceed without it" — never an error.
#[derive(Debug, Default, Serialize)]
pub struct Enrichment {
    pub title: Option<String>,
    /// Local filesystem path of the stored icon, when one was downloaded.
    pub favicon_path: Option<String>,
    /// Why the outcome is partial or empty. Diagnostic only; it never
    /// propagates as an Err past the orchestrator.
    #[serde(skip_serializing)]
    pub failure: Option<EnrichFailure>,
}

impl Enrichment {
    pub fn degraded(failure: EnrichFailure) -> Self {
        Self {
            failure: Some(failure),
            ..Default::default()
        }
    }

    #[allow(dead_code)]
    pub fn has_any_data(&self) -> bool {
        self.title.is_some() || self.favicon_path.is_some()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("url {url} denied by fetch policy")]
    PolicyDenied { url: String },

    #[error("request to {url} failed: {source}")]
    Unreachable { url: String, source: reqwest::Error },

    #[error("{url} answered with status {status}")]
    BadStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("could not read body of {url}: {source}")]
    UnreadableBody { url: String, source: reqwest::Error },
}

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("invalid icon url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("icon url {url} denied by fetch policy")]
    PolicyDenied { url: String },

    #[error("icon request to {url} failed: {source}")]
    Unreachable { url: String, source: reqwest::Error },

    #[error("icon {url} answered with status {status}")]
    BadStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("icon {url} has content type {content_type:?}, not an image")]
    NotAnImage { url: String, content_type: String },

    #[error("icon body of {url} ended early: {source}")]
    TruncatedBody { url: String, source: reqwest::Error },

    #[error("downloaded icon from {url} is empty")]
    EmptyFile { url: String },

    #[error("io error: {0:?}")]
    Io(#[from] std::io::Error),
}

/// Diagnostic attached to a degraded enrichment outcome, so callers and
/// tests can see why enrichment produced nothing.
#[derive(Debug, thiserror::Error)]
pub enum EnrichFailure {
    #[error("page fetch failed: {0}")]
    PageFetch(#[from] FetchError),

    #[error("favicon download failed: {0}")]
    IconDownload(#[from] DownloadError),
}
