//! HTTP client for a PocketBase-compatible record store.
//!
//! Every store call in the service goes through this client. Calls are never
//! retried here; callers report failures and leave their state intact.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::models::Record;
use crate::store::{
    file_url_for, CollectionStore, FileLocator, ListOptions, ListPage, Payload, StoreError,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    items: Vec<Record>,
    #[serde(default)]
    total_items: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct PocketBaseStore {
    client: Client,
    base_url: String,
}

impl PocketBaseStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, StoreError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn records_url(&self, collection: &str) -> String {
        format!("{}/api/collections/{}/records", self.base_url, collection)
    }

    fn record_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}", self.records_url(collection), id)
    }

    fn with_payload(
        request: RequestBuilder,
        payload: Payload,
    ) -> Result<RequestBuilder, StoreError> {
        debug!(
            "Sending {} payload",
            if payload.is_multipart() { "multipart" } else { "JSON" }
        );
        match payload {
            Payload::Json(map) => Ok(request.json(&map)),
            Payload::Multipart(parts) => {
                let mut form = Form::new();
                for (name, value) in parts.text {
                    form = form.text(name, value);
                }
                for (name, file) in parts.files {
                    let mut part = Part::bytes(file.bytes.to_vec()).file_name(file.file_name);
                    if let Some(content_type) = file.content_type.as_deref() {
                        part = part
                            .mime_str(content_type)
                            .map_err(|e| StoreError::InvalidPart(format!("{name}: {e}")))?;
                    }
                    form = form.part(name, part);
                }
                Ok(request.multipart(form))
            }
        }
    }

    /// Maps non-success statuses onto `StoreError`. 404 becomes `NotFound`.
    async fn check(
        response: Response,
        collection: &str,
        id: Option<&str>,
    ) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::NOT_FOUND {
            if let Some(id) = id {
                return Err(StoreError::NotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                });
            }
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| e.message)
            .unwrap_or(body);
        warn!(
            "Store returned {} for collection '{}': {}",
            status, collection, message
        );
        Err(StoreError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

impl FileLocator for PocketBaseStore {
    fn named_file_url(&self, record: &Record, file_name: &str) -> String {
        file_url_for(&self.base_url, record, file_name)
    }
}

#[async_trait]
impl CollectionStore for PocketBaseStore {
    async fn list(
        &self,
        collection: &str,
        page: u32,
        per_page: u32,
        opts: &ListOptions,
    ) -> Result<ListPage, StoreError> {
        let mut query = vec![
            ("page", page.to_string()),
            ("perPage", per_page.to_string()),
        ];
        if let Some(sort) = &opts.sort {
            query.push(("sort", sort.clone()));
        }
        if let Some(filter) = &opts.filter {
            query.push(("filter", filter.clone()));
        }

        let response = self
            .client
            .get(self.records_url(collection))
            .query(&query)
            .send()
            .await?;
        let list: ListResponse = Self::check(response, collection, None).await?.json().await?;

        debug!(
            "Listed {} of {} records from '{}'",
            list.items.len(),
            list.total_items,
            collection
        );
        Ok(ListPage {
            items: list.items,
            total: list.total_items,
        })
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Record, StoreError> {
        let response = self.client.get(self.record_url(collection, id)).send().await?;
        Ok(Self::check(response, collection, Some(id)).await?.json().await?)
    }

    async fn create(&self, collection: &str, payload: Payload) -> Result<Record, StoreError> {
        let request = Self::with_payload(self.client.post(self.records_url(collection)), payload)?;
        let response = request.send().await?;
        Ok(Self::check(response, collection, None).await?.json().await?)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        payload: Payload,
    ) -> Result<Record, StoreError> {
        let request =
            Self::with_payload(self.client.patch(self.record_url(collection, id)), payload)?;
        let response = request.send().await?;
        Ok(Self::check(response, collection, Some(id)).await?.json().await?)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .delete(self.record_url(collection, id))
            .send()
            .await?;
        Self::check(response, collection, Some(id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use serde_json::{json, Map};
    use wiremock::matchers::{body_json, header_regex, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::store::{FilePart, MultipartPayload};

    fn store(server: &MockServer) -> PocketBaseStore {
        PocketBaseStore::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_list_passes_paging_and_sort() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/collections/projects/records"))
            .and(query_param("page", "1"))
            .and(query_param("perPage", "200"))
            .and(query_param("sort", "-created"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "page": 1,
                "perPage": 200,
                "totalItems": 2,
                "totalPages": 1,
                "items": [
                    {
                        "id": "1",
                        "collectionId": "pbc_1",
                        "collectionName": "projects",
                        "project_name": "Zeta"
                    },
                    {
                        "id": "2",
                        "collectionId": "pbc_1",
                        "collectionName": "projects",
                        "project_name": "Alpha"
                    }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let opts = ListOptions {
            sort: Some("-created".into()),
            filter: None,
        };
        let page = store(&server).list("projects", 1, 200, &opts).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[1].text("project_name"), "Alpha");
    }

    #[tokio::test]
    async fn test_get_missing_record_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/collections/projects/records/nope"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "code": 404,
                "message": "The requested resource wasn't found.",
                "data": {}
            })))
            .mount(&server)
            .await;

        let err = store(&server).get("projects", "nope").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { id, .. } if id == "nope"));
    }

    #[tokio::test]
    async fn test_create_json_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/collections/recruiters/records"))
            .and(body_json(json!({"recruiter_name": "Ada", "status": "New"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "r9",
                "recruiter_name": "Ada",
                "status": "New"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut map = Map::new();
        map.insert("recruiter_name".into(), json!("Ada"));
        map.insert("status".into(), json!("New"));
        let record = store(&server)
            .create("recruiters", Payload::Json(map))
            .await
            .unwrap();
        assert_eq!(record.id, "r9");
    }

    #[tokio::test]
    async fn test_update_multipart_payload() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/collections/resumes/records/r1"))
            .and(header_regex("content-type", "^multipart/form-data"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "r1",
                "title": "Backend",
                "file": "cv_x7.pdf"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let payload = Payload::Multipart(MultipartPayload {
            text: vec![("title".into(), "Backend".into())],
            files: vec![(
                "file".into(),
                FilePart {
                    file_name: "cv.pdf".into(),
                    content_type: Some("application/pdf".into()),
                    bytes: Bytes::from_static(b"%PDF-1.7"),
                },
            )],
        });
        let record = store(&server).update("resumes", "r1", payload).await.unwrap();
        assert_eq!(record.text("file"), "cv_x7.pdf");
    }

    #[tokio::test]
    async fn test_server_error_surfaces_message() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/collections/cvs/records/c1"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "code": 400,
                "message": "Failed to delete record.",
                "data": {}
            })))
            .mount(&server)
            .await;

        let err = store(&server).delete("cvs", "c1").await.unwrap_err();
        match err {
            StoreError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Failed to delete record.");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_delete_no_content() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/collections/cvs/records/c1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        store(&server).delete("cvs", "c1").await.unwrap();
    }

    #[test]
    fn test_file_url_uses_base() {
        let store =
            PocketBaseStore::new("https://db.jobos.online/", Duration::from_secs(5)).unwrap();
        let mut record = Record::new("r1").with("thumbnail", "eco.png");
        record.collection_id = "pbc_7".into();
        assert_eq!(
            store.file_url(&record, "thumbnail").unwrap(),
            "https://db.jobos.online/api/files/pbc_7/r1/eco.png"
        );
    }
}
