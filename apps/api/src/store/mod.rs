//! Remote collection store: the CRUD contract the engine consumes.
//!
//! `PocketBaseStore` talks to the production backend over HTTP.
//! `MemoryStore` keeps records in-process for local runs and tests.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::Record;

pub mod memory;
pub mod pocketbase;

pub use memory::MemoryStore;
pub use pocketbase::PocketBaseStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record {id} not found in {collection}")]
    NotFound { collection: String, id: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid multipart part: {0}")]
    InvalidPart(String),
}

/// Optional list parameters, passed through to the backend verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Backend sort expression, e.g. `-created`.
    pub sort: Option<String>,
    pub filter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListPage {
    pub items: Vec<Record>,
    pub total: u64,
}

/// A binary file selected for upload, not yet known to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MultipartPayload {
    pub text: Vec<(String, String)>,
    pub files: Vec<(String, FilePart)>,
}

/// Body of a create or update call. Multipart whenever a file is attached.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Map<String, Value>),
    Multipart(MultipartPayload),
}

impl Payload {
    pub fn is_multipart(&self) -> bool {
        matches!(self, Payload::Multipart(_))
    }
}

/// Resolves stored file names to download URLs without a network round trip.
pub trait FileLocator: Send + Sync {
    /// URL of one stored file of the record.
    fn named_file_url(&self, record: &Record, file_name: &str) -> String;

    /// URL of the field's first stored file.
    fn file_url(&self, record: &Record, field: &str) -> Option<String> {
        let file_name = record.file_names(field).into_iter().next()?;
        Some(self.named_file_url(record, &file_name))
    }

    /// Every stored file of the field with its URL, in stored order.
    fn file_urls(&self, record: &Record, field: &str) -> Vec<(String, String)> {
        record
            .file_names(field)
            .into_iter()
            .map(|file_name| {
                let url = self.named_file_url(record, &file_name);
                (file_name, url)
            })
            .collect()
    }
}

/// The remote record store, addressed by collection name.
#[async_trait]
pub trait CollectionStore: FileLocator {
    async fn list(
        &self,
        collection: &str,
        page: u32,
        per_page: u32,
        opts: &ListOptions,
    ) -> Result<ListPage, StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Record, StoreError>;

    async fn create(&self, collection: &str, payload: Payload) -> Result<Record, StoreError>;

    async fn update(
        &self,
        collection: &str,
        id: &str,
        payload: Payload,
    ) -> Result<Record, StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
}

/// `{base}/api/files/{collection}/{record}/{file}`
pub(crate) fn file_url_for(base_url: &str, record: &Record, file_name: &str) -> String {
    let collection = if record.collection_id.is_empty() {
        &record.collection_name
    } else {
        &record.collection_id
    };
    format!(
        "{}/api/files/{}/{}/{}",
        base_url.trim_end_matches('/'),
        collection,
        record.id,
        file_name
    )
}
