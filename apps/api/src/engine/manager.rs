//! Collection Manager: one screen over one registered collection.
//!
//! Holds the fetched record list, the query state and the record modal, and
//! derives the card grid and table views from the same filtered set. Every
//! refetch is tagged with a generation number; only the result of the most
//! recently requested fetch is applied.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::engine::error::EngineError;
use crate::engine::modal::{DeleteOutcome, ModalView, RecordModal};
use crate::engine::query::{self, QueryState, SortDirection};
use crate::models::record::{coerce, Record, SYSTEM_FIELDS};
use crate::schema::{EntityRegistry, EntitySchema};
use crate::store::{CollectionStore, FileLocator, ListOptions, ListPage, StoreError};

/// Backend sort used for every list fetch.
const FETCH_SORT: &str = "-created";
const CARD_SUMMARY_FIELDS: usize = 3;
const TABLE_COLUMNS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    Grid,
    Table,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum LoadStatus {
    Idle,
    Loading,
    Ready,
    Failed(String),
}

/// Generation number handed out when a refetch is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

impl FetchTicket {
    pub fn generation(self) -> u64 {
        self.0
    }
}

/// Everything needed to run a list call without holding the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub ticket: FetchTicket,
    pub collection: String,
    pub per_page: u32,
    pub options: ListOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortOption {
    pub field: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardField {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    pub id: String,
    pub title: String,
    pub thumbnail: Option<String>,
    pub summary: Vec<CardField>,
    pub created: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRow {
    pub id: String,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub columns: Vec<Column>,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetCount {
    pub value: String,
    pub count: usize,
}

/// Record counts per value of one select field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Facet {
    pub field: String,
    pub label: String,
    pub counts: Vec<FacetCount>,
}

/// The serialized screen: header, query controls, the active list view and
/// the modal when one is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScreenView {
    pub collection: String,
    pub display_name: String,
    pub description: String,
    pub status: LoadStatus,
    pub total: u64,
    pub shown: usize,
    pub query: QueryState,
    pub view_mode: ViewMode,
    pub sort_options: Vec<SortOption>,
    pub filter_options: Vec<String>,
    pub facets: Vec<Facet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cards: Option<Vec<Card>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<Table>,
    pub modal: Option<ModalView>,
    pub notice: Option<String>,
}

pub struct CollectionManager {
    schema: Arc<EntitySchema>,
    items: Vec<Record>,
    total: u64,
    query: QueryState,
    view_mode: ViewMode,
    modal: RecordModal,
    latest_requested: u64,
    status: LoadStatus,
    page_size: u32,
    notice: Option<String>,
}

impl CollectionManager {
    /// Mounts a screen for a registered collection. Nothing is fetched until
    /// the first refetch is requested.
    pub fn open(
        registry: &EntityRegistry,
        collection: &str,
        page_size: u32,
    ) -> Result<Self, EngineError> {
        let schema = Arc::clone(registry.get(collection)?);
        Ok(Self {
            modal: RecordModal::new(Arc::clone(&schema)),
            schema,
            items: Vec::new(),
            total: 0,
            query: QueryState::default(),
            view_mode: ViewMode::default(),
            latest_requested: 0,
            status: LoadStatus::Idle,
            page_size,
            notice: None,
        })
    }

    pub fn query(&self) -> &QueryState {
        &self.query
    }

    pub fn modal_mut(&mut self) -> &mut RecordModal {
        &mut self.modal
    }

    /// Records a new refetch request. Any fetch started earlier becomes stale.
    pub fn request_refetch(&mut self) -> FetchRequest {
        self.latest_requested += 1;
        self.status = LoadStatus::Loading;
        debug!(
            "Refetch generation {} requested for '{}'",
            self.latest_requested,
            self.schema.id()
        );
        FetchRequest {
            ticket: FetchTicket(self.latest_requested),
            collection: self.schema.id().to_string(),
            per_page: self.page_size,
            options: ListOptions {
                sort: Some(FETCH_SORT.to_string()),
                filter: None,
            },
        }
    }

    /// Applies a finished fetch if it belongs to the latest request.
    ///
    /// Success replaces the cached list wholesale. Failure keeps the previous
    /// list and records the error. Returns whether the result was applied.
    pub fn apply_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<ListPage, StoreError>,
    ) -> bool {
        if ticket.0 != self.latest_requested {
            debug!(
                "Discarding stale fetch generation {} for '{}' (latest {})",
                ticket.0,
                self.schema.id(),
                self.latest_requested
            );
            return false;
        }
        match result {
            Ok(page) => {
                debug!(
                    "Fetched {} of {} records for '{}'",
                    page.items.len(),
                    page.total,
                    self.schema.id()
                );
                self.items = page.items;
                self.total = page.total;
                self.status = LoadStatus::Ready;
            }
            Err(e) => {
                warn!("Failed to fetch '{}': {}", self.schema.id(), e);
                self.status = LoadStatus::Failed(format!("Failed to load items: {e}"));
            }
        }
        true
    }

    /// Requests, runs and applies one refetch while holding the manager.
    pub async fn refresh(&mut self, store: &dyn CollectionStore) {
        let request = self.request_refetch();
        let result = store
            .list(&request.collection, 1, request.per_page, &request.options)
            .await;
        self.apply_fetch(request.ticket, result);
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.query.search_term = term.into();
    }

    pub fn set_category(&mut self, category: impl Into<String>) {
        self.query.category_filter = category.into();
    }

    /// Sorts by a schema field or one of the system timestamp fields.
    pub fn set_sort(&mut self, field: &str, direction: SortDirection) -> Result<(), EngineError> {
        if self.schema.field(field).is_none() && !SYSTEM_FIELDS.contains(&field) {
            return Err(EngineError::UnknownField(field.to_string()));
        }
        self.query.sort_field = field.to_string();
        self.query.sort_direction = direction;
        Ok(())
    }

    pub fn toggle_sort_direction(&mut self) {
        self.query.sort_direction = self.query.sort_direction.toggled();
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
    }

    pub fn visible(&self) -> Vec<&Record> {
        query::apply(&self.items, &self.query)
    }

    pub fn sort_options(&self) -> Vec<SortOption> {
        vec![
            SortOption {
                field: "created".into(),
                label: "Date Created".into(),
            },
            SortOption {
                field: self.schema.title_field().name.clone(),
                label: "Name".into(),
            },
        ]
    }

    pub fn filter_options(&self) -> Vec<String> {
        self.schema
            .category_field()
            .map(|f| f.options().to_vec())
            .unwrap_or_default()
    }

    /// Counts of the visible records per value of every select field.
    ///
    /// Declared options come first in declaration order, zero counts
    /// included. Stored values outside the options follow in first-seen
    /// order; empty values are not counted.
    pub fn facets(&self) -> Vec<Facet> {
        let visible = self.visible();
        self.schema
            .fields()
            .iter()
            .filter(|f| !f.options().is_empty())
            .map(|field| {
                let mut counts: Vec<FacetCount> = field
                    .options()
                    .iter()
                    .map(|option| FacetCount {
                        value: option.clone(),
                        count: 0,
                    })
                    .collect();
                for record in &visible {
                    let value = record.text(&field.name);
                    if value.is_empty() {
                        continue;
                    }
                    match counts.iter_mut().find(|c| c.value == value) {
                        Some(entry) => entry.count += 1,
                        None => counts.push(FacetCount { value, count: 1 }),
                    }
                }
                Facet {
                    field: field.name.clone(),
                    label: field.label.clone(),
                    counts,
                }
            })
            .collect()
    }

    pub fn cards(&self, files: &dyn FileLocator) -> Vec<Card> {
        let title_field = &self.schema.title_field().name;
        let thumbnail_field = self.schema.image_field();
        self.visible()
            .into_iter()
            .map(|record| {
                let title = record.text(title_field);
                let summary = self
                    .schema
                    .fields()
                    .iter()
                    .skip(1)
                    .take(CARD_SUMMARY_FIELDS)
                    .filter(|f| !f.is_file())
                    .filter_map(|f| {
                        let value = record.text(&f.name);
                        (!value.is_empty()).then(|| CardField {
                            label: f.label.clone(),
                            value,
                        })
                    })
                    .collect();
                Card {
                    id: record.id.clone(),
                    title: if title.is_empty() {
                        "Untitled".to_string()
                    } else {
                        title
                    },
                    thumbnail: thumbnail_field.and_then(|f| files.file_url(record, &f.name)),
                    summary,
                    created: record.created.chars().take(10).collect(),
                }
            })
            .collect()
    }

    pub fn table(&self) -> Table {
        let fields: Vec<_> = self.schema.fields().iter().take(TABLE_COLUMNS).collect();
        let columns = fields
            .iter()
            .map(|f| Column {
                name: f.name.clone(),
                label: f.label.clone(),
            })
            .collect();
        let rows = self
            .visible()
            .into_iter()
            .map(|record| TableRow {
                id: record.id.clone(),
                cells: fields
                    .iter()
                    .map(|f| {
                        let empty = record.value(&f.name).map_or(true, |v| coerce(v).is_empty());
                        match (f.is_file(), empty) {
                            (_, true) => "-".to_string(),
                            (true, false) => "File Attached".to_string(),
                            (false, false) => record.text(&f.name),
                        }
                    })
                    .collect(),
            })
            .collect();
        Table { columns, rows }
    }

    fn cached(&self, id: &str) -> Result<Record, EngineError> {
        self.items
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| EngineError::RecordNotFound {
                collection: self.schema.id().to_string(),
                id: id.to_string(),
            })
    }

    pub fn create(&mut self) -> Result<(), EngineError> {
        self.notice = None;
        self.modal.open_create()
    }

    /// List-row view action.
    pub fn view_record(&mut self, id: &str) -> Result<(), EngineError> {
        let record = self.cached(id)?;
        self.notice = None;
        self.modal.open_view(record)
    }

    /// List-row edit action.
    pub fn edit_record(&mut self, id: &str) -> Result<(), EngineError> {
        let record = self.cached(id)?;
        self.notice = None;
        self.modal.open_edit(record)
    }

    /// Submits the open modal and refetches exactly once on success.
    pub async fn submit(&mut self, store: &dyn CollectionStore) -> Result<Record, EngineError> {
        let record = self.modal.submit(store).await?;
        self.refresh(store).await;
        Ok(record)
    }

    /// Deletes from the viewing modal or a list row, refetching exactly once
    /// on success. A vetoed deletion changes nothing.
    pub async fn delete_record<F>(
        &mut self,
        store: &dyn CollectionStore,
        id: &str,
        confirm: F,
    ) -> Result<DeleteOutcome, EngineError>
    where
        F: FnOnce(&str) -> bool,
    {
        match self.modal.delete(store, id, confirm).await {
            Ok(DeleteOutcome::Deleted) => {
                info!("Record {} removed from '{}'", id, self.schema.id());
                self.notice = None;
                self.refresh(store).await;
                Ok(DeleteOutcome::Deleted)
            }
            Ok(DeleteOutcome::Vetoed) => Ok(DeleteOutcome::Vetoed),
            Err(e) => {
                if !self.modal.is_viewing(id) {
                    self.notice = Some(format!("Failed to delete item: {e}"));
                }
                Err(e)
            }
        }
    }

    pub fn screen(&self, files: &dyn FileLocator) -> ScreenView {
        let (cards, table) = match self.view_mode {
            ViewMode::Grid => (Some(self.cards(files)), None),
            ViewMode::Table => (None, Some(self.table())),
        };
        ScreenView {
            collection: self.schema.id().to_string(),
            display_name: self.schema.display_name().to_string(),
            description: self.schema.description().to_string(),
            status: self.status.clone(),
            total: self.total,
            shown: self.visible().len(),
            query: self.query.clone(),
            view_mode: self.view_mode,
            sort_options: self.sort_options(),
            filter_options: self.filter_options(),
            facets: self.facets(),
            cards,
            table,
            modal: self.modal.view(files),
            notice: self.notice.clone(),
        }
    }
}

#[cfg(test)]
impl CollectionManager {
    pub fn items(&self) -> &[Record] {
        &self.items
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn modal(&self) -> &RecordModal {
        &self.modal
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }
}
