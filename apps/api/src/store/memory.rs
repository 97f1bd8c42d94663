use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::models::record::{Record, SYSTEM_FIELDS};
use crate::store::{
    file_url_for, CollectionStore, FileLocator, ListOptions, ListPage, Payload, StoreError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    List,
    Get,
    Create,
    Update,
    Delete,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, Vec<Record>>,
    calls: HashMap<StoreOp, usize>,
    failing: HashSet<StoreOp>,
}

/// In-process store with PocketBase-like record shapes.
///
/// Records keep insertion order. File parts are stored by file name only.
/// The `filter` list option is not interpreted.
pub struct MemoryStore {
    base_url: String,
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            inner: Mutex::new(Inner::default()),
        }
    }

    #[cfg(test)]
    /// Inserts records as-is, stamping the collection name.
    pub async fn seed(&self, collection: &str, records: Vec<Record>) {
        let mut inner = self.inner.lock().await;
        let items = inner.collections.entry(collection.to_string()).or_default();
        for mut record in records {
            record.collection_name = collection.to_string();
            items.push(record);
        }
    }

    #[cfg(test)]
    /// Makes every subsequent call of `op` fail until switched off again.
    pub async fn set_failing(&self, op: StoreOp, failing: bool) {
        let mut inner = self.inner.lock().await;
        if failing {
            inner.failing.insert(op);
        } else {
            inner.failing.remove(&op);
        }
    }

    #[cfg(test)]
    pub async fn count_calls(&self, op: StoreOp) -> usize {
        self.inner.lock().await.calls.get(&op).copied().unwrap_or(0)
    }

    #[cfg(test)]
    pub async fn snapshot(&self, collection: &str) -> Vec<Record> {
        self.inner
            .lock()
            .await
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    fn begin(
        inner: &mut Inner,
        op: StoreOp,
        collection: &str,
        id: Option<&str>,
    ) -> Result<(), StoreError> {
        *inner.calls.entry(op).or_default() += 1;
        if inner.failing.contains(&op) {
            debug!("MemoryStore failing {:?} on '{}' {:?}", op, collection, id);
            return Err(StoreError::Api {
                status: 503,
                message: format!("{op:?} unavailable"),
            });
        }
        Ok(())
    }

    fn not_found(collection: &str, id: &str) -> StoreError {
        StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

fn now() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S%.3fZ").to_string()
}

fn apply_payload(record: &mut Record, payload: Payload) {
    let mut set = |name: String, value: Value| {
        if !SYSTEM_FIELDS.contains(&name.as_str()) {
            record.fields.insert(name, value);
        }
    };
    match payload {
        Payload::Json(map) => {
            for (name, value) in map {
                set(name, value);
            }
        }
        Payload::Multipart(parts) => {
            for (name, value) in parts.text {
                set(name, Value::String(value));
            }
            let mut uploads: Vec<(String, Vec<Value>)> = Vec::new();
            for (name, file) in parts.files {
                let stored = Value::String(file.file_name);
                match uploads.iter_mut().find(|(field, _)| *field == name) {
                    Some((_, names)) => names.push(stored),
                    None => uploads.push((name, vec![stored])),
                }
            }
            for (name, mut names) in uploads {
                let value = if names.len() == 1 {
                    names.remove(0)
                } else {
                    Value::Array(names)
                };
                set(name, value);
            }
        }
    }
}

impl FileLocator for MemoryStore {
    fn named_file_url(&self, record: &Record, file_name: &str) -> String {
        file_url_for(&self.base_url, record, file_name)
    }
}

#[async_trait]
impl CollectionStore for MemoryStore {
    async fn list(
        &self,
        collection: &str,
        page: u32,
        per_page: u32,
        opts: &ListOptions,
    ) -> Result<ListPage, StoreError> {
        let mut inner = self.inner.lock().await;
        Self::begin(&mut inner, StoreOp::List, collection, None)?;

        let mut items = inner.collections.get(collection).cloned().unwrap_or_default();
        if let Some(sort) = opts.sort.as_deref() {
            let (key, descending) = match sort.strip_prefix('-') {
                Some(key) => (key, true),
                None => (sort, false),
            };
            items.sort_by(|a, b| {
                let ord = a.text(key).cmp(&b.text(key));
                if descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }
        if opts.filter.is_some() {
            debug!("MemoryStore ignores list filters");
        }

        let total = items.len() as u64;
        let skip = (page.max(1) as usize - 1) * per_page as usize;
        let items = items.into_iter().skip(skip).take(per_page as usize).collect();
        Ok(ListPage { items, total })
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Record, StoreError> {
        let mut inner = self.inner.lock().await;
        Self::begin(&mut inner, StoreOp::Get, collection, Some(id))?;
        inner
            .collections
            .get(collection)
            .and_then(|items| items.iter().find(|r| r.id == id))
            .cloned()
            .ok_or_else(|| Self::not_found(collection, id))
    }

    async fn create(&self, collection: &str, payload: Payload) -> Result<Record, StoreError> {
        let mut inner = self.inner.lock().await;
        Self::begin(&mut inner, StoreOp::Create, collection, None)?;

        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(15);
        let mut record = Record::new(id);
        record.collection_name = collection.to_string();
        record.created = now();
        record.updated = record.created.clone();
        apply_payload(&mut record, payload);

        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        payload: Payload,
    ) -> Result<Record, StoreError> {
        let mut inner = self.inner.lock().await;
        Self::begin(&mut inner, StoreOp::Update, collection, Some(id))?;

        let record = inner
            .collections
            .get_mut(collection)
            .and_then(|items| items.iter_mut().find(|r| r.id == id))
            .ok_or_else(|| Self::not_found(collection, id))?;
        apply_payload(record, payload);
        record.updated = now();
        Ok(record.clone())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        Self::begin(&mut inner, StoreOp::Delete, collection, Some(id))?;

        let items = inner
            .collections
            .get_mut(collection)
            .ok_or_else(|| Self::not_found(collection, id))?;
        let before = items.len();
        items.retain(|r| r.id != id);
        if items.len() == before {
            return Err(Self::not_found(collection, id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    use crate::store::{FilePart, MultipartPayload};

    #[tokio::test]
    async fn test_create_then_list_sorted() {
        let store = MemoryStore::new("http://localhost");
        store
            .seed(
                "skills",
                vec![
                    Record::new("1").with("title", "Zig"),
                    Record::new("2").with("title", "Axum"),
                ],
            )
            .await;

        let opts = ListOptions {
            sort: Some("title".into()),
            filter: None,
        };
        let page = store.list("skills", 1, 200, &opts).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].id, "2");

        let mut map = Map::new();
        map.insert("title".into(), json!("Tokio"));
        map.insert("id".into(), json!("forged"));
        let created = store.create("skills", Payload::Json(map)).await.unwrap();
        assert_ne!(created.id, "forged");
        assert_eq!(created.id.len(), 15);
        assert!(!created.created.is_empty());
        assert_eq!(store.snapshot("skills").await.len(), 3);
    }

    #[tokio::test]
    async fn test_multipart_keeps_every_upload_of_a_field() {
        let store = MemoryStore::new("http://localhost");
        let file = |name: &str| FilePart {
            file_name: name.into(),
            content_type: None,
            bytes: bytes::Bytes::from_static(b"%PDF"),
        };
        let payload = Payload::Multipart(MultipartPayload {
            text: vec![("title".into(), "Rust".into())],
            files: vec![
                ("attachments".into(), file("a.pdf")),
                ("attachments".into(), file("b.pdf")),
                ("cover".into(), file("c.png")),
            ],
        });
        let created = store.create("skills", payload).await.unwrap();
        assert_eq!(created.file_names("attachments"), ["a.pdf", "b.pdf"]);
        assert_eq!(created.value("cover"), Some(&json!("c.png")));
    }

    #[tokio::test]
    async fn test_paging_caps_items() {
        let store = MemoryStore::new("http://localhost");
        let records = (0..5).map(|i| Record::new(i.to_string())).collect();
        store.seed("cvs", records).await;

        let page = store.list("cvs", 2, 2, &ListOptions::default()).await.unwrap();
        assert_eq!(page.total, 5);
        let ids: Vec<&str> = page.items.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["2", "3"]);
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let store = MemoryStore::new("http://localhost");
        store.seed("cvs", vec![Record::new("c1")]).await;
        store.delete("cvs", "c1").await.unwrap();
        let err = store.delete("cvs", "c1").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_failing_op_is_logged_and_errors() {
        let store = MemoryStore::new("http://localhost");
        store.seed("cvs", vec![Record::new("c1")]).await;
        store.set_failing(StoreOp::Delete, true).await;

        assert!(store.delete("cvs", "c1").await.is_err());
        assert_eq!(store.count_calls(StoreOp::Delete).await, 1);
        assert_eq!(store.snapshot("cvs").await.len(), 1);

        store.set_failing(StoreOp::Delete, false).await;
        store.delete("cvs", "c1").await.unwrap();
    }
}
