use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        RwLock,
    },
};

/// A stored link. `favicon_url` holds a local filesystem path, not a
/// remote URL, so the served icon survives the origin site changing or
/// disappearing: either empty or `{favicons_dir}/{user_id}/{link_id}.{ext}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Link {
    pub id: u64,
    pub user_id: u64,

    pub url: String,
    pub title: String,
    pub description: String,

    pub favicon_url: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LinkCreate {
    pub user_id: u64,
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Persistence seam. The real repository lives outside this crate; the
/// enrichment flow only ever needs these calls.
pub trait LinkStore: Send + Sync {
    fn create(&self, create: LinkCreate) -> anyhow::Result<Link>;
    fn get_link_by_id(&self, id: u64) -> anyhow::Result<Option<Link>>;
    fn set_link_favicon_and_title(
        &self,
        id: u64,
        favicon_path: &str,
        title: &str,
    ) -> anyhow::Result<Option<Link>>;
}

/// In-memory store backing the CLI demo flow and the service tests.
pub struct StoreMemory {
    links: RwLock<HashMap<u64, Link>>,
    next_id: AtomicU64,
}

impl StoreMemory {
    pub fn new() -> Self {
        Self {
            links: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl LinkStore for StoreMemory {
    fn create(&self, create: LinkCreate) -> anyhow::Result<Link> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let link = Link {
            id,
            user_id: create.user_id,
            url: create.url,
            title: create.title.unwrap_or_default(),
            description: create.description.unwrap_or_default(),
            favicon_url: String::new(),
        };

        self.links.write().unwrap().insert(id, link.clone());

        Ok(link)
    }

    fn get_link_by_id(&self, id: u64) -> anyhow::Result<Option<Link>> {
        Ok(self.links.read().unwrap().get(&id).cloned())
    }

    fn set_link_favicon_and_title(
        &self,
        id: u64,
        favicon_path: &str,
        title: &str,
    ) -> anyhow::Result<Option<Link>> {
        let mut links = self.links.write().unwrap();

        Ok(links.get_mut(&id).map(|link| {
            link.favicon_url = favicon_path.to_string();
            link.title = title.to_string();
            link.clone()
        }))
    }
}
