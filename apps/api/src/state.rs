use std::sync::Arc;

use crate::collections::sessions::Sessions;
use crate::config::DEFAULT_MAX_UPLOAD_MB;
use crate::schema::EntityRegistry;
use crate::store::{CollectionStore, FileLocator};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<EntityRegistry>,
    pub store: Arc<dyn CollectionStore>,
    /// Same backend as `store`, used to build file URLs.
    pub files: Arc<dyn FileLocator>,
    pub sessions: Arc<Sessions>,
    /// Request body limit for file selections.
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new<S>(registry: EntityRegistry, store: Arc<S>, list_page_size: u32) -> Self
    where
        S: CollectionStore + 'static,
    {
        let registry = Arc::new(registry);
        Self {
            sessions: Arc::new(Sessions::new(Arc::clone(&registry), list_page_size)),
            registry,
            files: Arc::clone(&store) as Arc<dyn FileLocator>,
            store,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
        }
    }

    pub fn with_upload_limit(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}
