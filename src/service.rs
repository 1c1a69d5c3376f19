use std::path::PathBuf;
use std::sync::Arc;

use crate::{
    config::FetchConfig,
    enrich::{self, EnrichmentInput},
    links::{Link, LinkCreate, LinkStore},
};

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("link not found")]
    NotFound,

    #[error("unexpected error: {0:?}")]
    Other(#[from] anyhow::Error),
}

/// Link operations that involve the enrichment pipeline. The rest of the
/// CRUD surface stays with the repository owner.
pub struct LinkService {
    store: Arc<dyn LinkStore>,
    favicons_dir: PathBuf,
    fetch: FetchConfig,
}

impl LinkService {
    pub fn new(store: Arc<dyn LinkStore>, favicons_dir: impl Into<PathBuf>, fetch: FetchConfig) -> Self {
        Self {
            store,
            favicons_dir: favicons_dir.into(),
            fetch,
        }
    }

    /// Create the record first, then enrich it. Enrichment is a side
    /// channel: when it cannot be persisted after the record exists, the
    /// created link is returned as-is.
    pub fn create_link(&self, create: LinkCreate) -> anyhow::Result<Link, AppError> {
        let link = self.store.create(create)?;

        match self.set_link_favicon_and_title(link.id) {
            Ok(updated) => Ok(updated),
            Err(err) => {
                log::warn!("link {}: enrichment not persisted: {err}", link.id);
                Ok(link)
            }
        }
    }

    /// Re-read the link and run the enrich-and-persist flow again.
    #[allow(dead_code)]
    pub fn refresh_icon(&self, link_id: u64) -> anyhow::Result<Link, AppError> {
        self.set_link_favicon_and_title(link_id)
    }

    /// The one operation the pipeline exposes. Never raises for "nothing
    /// found": empty strings mean none.
    pub fn enrich_link(&self, raw_url: &str, user_id: u64, link_id: u64) -> (String, String) {
        let input = EnrichmentInput {
            raw_url: raw_url.to_string(),
            user_id,
            link_id,
        };

        let outcome = enrich::enrich(&input, &self.favicons_dir, &self.fetch);

        if let Some(failure) = &outcome.failure {
            log::warn!("link {link_id}: enrichment degraded: {failure}");
        }

        (
            outcome.title.unwrap_or_default(),
            outcome.favicon_path.unwrap_or_default(),
        )
    }

    fn set_link_favicon_and_title(&self, link_id: u64) -> anyhow::Result<Link, AppError> {
        let link = self
            .store
            .get_link_by_id(link_id)?
            .ok_or(AppError::NotFound)?;

        let (found_title, favicon_path) = self.enrich_link(&link.url, link.user_id, link.id);

        // the page title only fills an empty one; it never overwrites what
        // the user typed
        let title = if link.title.is_empty() {
            found_title
        } else {
            link.title.clone()
        };

        // persisted exactly once per flow, found or not
        self.store
            .set_link_favicon_and_title(link_id, &favicon_path, &title)?
            .ok_or(AppError::NotFound)
    }
}
