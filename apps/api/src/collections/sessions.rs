use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::engine::{CollectionManager, EngineError};
use crate::schema::EntityRegistry;
use crate::store::CollectionStore;

pub type Session = Arc<Mutex<CollectionManager>>;

/// Open collection screens, one per collection id.
///
/// A session lives from its first access until it is closed. Fetch results
/// that arrive after their session was closed are dropped.
pub struct Sessions {
    registry: Arc<EntityRegistry>,
    page_size: u32,
    open: Mutex<HashMap<String, Session>>,
}

impl Sessions {
    pub fn new(registry: Arc<EntityRegistry>, page_size: u32) -> Self {
        Self {
            registry,
            page_size,
            open: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, collection: &str) -> Option<Session> {
        self.open.lock().await.get(collection).cloned()
    }

    /// Returns the open session, mounting and fetching it on first access.
    pub async fn get_or_open(
        &self,
        collection: &str,
        store: &dyn CollectionStore,
    ) -> Result<Session, EngineError> {
        if let Some(session) = self.get(collection).await {
            return Ok(session);
        }

        let manager = CollectionManager::open(&self.registry, collection, self.page_size)?;
        let session = {
            let mut open = self.open.lock().await;
            if let Some(existing) = open.get(collection) {
                return Ok(Arc::clone(existing));
            }
            let session = Arc::new(Mutex::new(manager));
            open.insert(collection.to_string(), Arc::clone(&session));
            session
        };
        info!("Opened session for '{}'", collection);

        self.refresh(&session, store).await;
        Ok(session)
    }

    /// Runs one refetch without holding the session across the list call, so
    /// other actions on the screen proceed while it is in flight. Returns
    /// whether the result was applied.
    pub async fn refresh(&self, session: &Session, store: &dyn CollectionStore) -> bool {
        let request = session.lock().await.request_refetch();
        let result = store
            .list(&request.collection, 1, request.per_page, &request.options)
            .await;

        if !self.is_live(&request.collection, session).await {
            debug!(
                "Session for '{}' closed during fetch generation {}",
                request.collection,
                request.ticket.generation()
            );
            return false;
        }
        session.lock().await.apply_fetch(request.ticket, result)
    }

    /// Tears a session down. Returns whether one was open.
    pub async fn close(&self, collection: &str) -> bool {
        let closed = self.open.lock().await.remove(collection).is_some();
        if closed {
            info!("Closed session for '{}'", collection);
        }
        closed
    }

    async fn is_live(&self, collection: &str, session: &Session) -> bool {
        self.open
            .lock()
            .await
            .get(collection)
            .is_some_and(|open| Arc::ptr_eq(open, session))
    }
}
