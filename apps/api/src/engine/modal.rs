//! Record Modal State Machine: create/edit/view sessions over one schema.
//!
//! Owns the Draft exclusively. Only `submit` and `delete` touch the store;
//! every other transition is plain state manipulation.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::engine::draft::Draft;
use crate::engine::error::{EngineError, ValidationErrors};
use crate::engine::render::{self, DetailView, Rendered};
use crate::engine::validation::validate_draft;
use crate::engine::Mode;
use crate::models::Record;
use crate::schema::EntitySchema;
use crate::store::{CollectionStore, FileLocator, FilePart};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "record_id", rename_all = "snake_case")]
pub enum ModalState {
    Closed,
    Creating,
    Editing(String),
    Viewing(String),
}

impl ModalState {
    fn describe(&self) -> &'static str {
        match self {
            ModalState::Closed => "closed",
            ModalState::Creating => "creating",
            ModalState::Editing(_) => "editing",
            ModalState::Viewing(_) => "viewing",
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, ModalState::Closed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    Vetoed,
}

/// Serialized modal, present only while the modal is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModalView {
    pub state: ModalState,
    pub heading: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub form: Vec<Rendered>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<DetailView>,
    #[serde(skip_serializing_if = "ValidationErrors::is_empty")]
    pub field_errors: ValidationErrors,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct RecordModal {
    schema: Arc<EntitySchema>,
    state: ModalState,
    draft: Draft,
    /// The record being viewed or edited.
    record: Option<Record>,
    field_errors: ValidationErrors,
    error: Option<String>,
}

impl RecordModal {
    pub fn new(schema: Arc<EntitySchema>) -> Self {
        let draft = Draft::empty(&schema);
        Self {
            schema,
            state: ModalState::Closed,
            draft,
            record: None,
            field_errors: ValidationErrors::default(),
            error: None,
        }
    }

    pub fn state(&self) -> &ModalState {
        &self.state
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn require_closed(&self, action: &'static str) -> Result<(), EngineError> {
        if self.state.is_open() {
            return Err(EngineError::InvalidTransition {
                state: self.state.describe(),
                action,
            });
        }
        Ok(())
    }

    fn require_editable(&self, action: &'static str) -> Result<Mode, EngineError> {
        match self.state {
            ModalState::Creating => Ok(Mode::Create),
            ModalState::Editing(_) => Ok(Mode::Edit),
            _ => Err(EngineError::InvalidTransition {
                state: self.state.describe(),
                action,
            }),
        }
    }

    fn enter(&mut self, state: ModalState, draft: Draft, record: Option<Record>) {
        self.state = state;
        self.draft = draft;
        self.record = record;
        self.field_errors = ValidationErrors::default();
        self.error = None;
    }

    /// closed → creating, with every field empty.
    pub fn open_create(&mut self) -> Result<(), EngineError> {
        self.require_closed("create")?;
        let draft = Draft::empty(&self.schema);
        self.enter(ModalState::Creating, draft, None);
        Ok(())
    }

    /// closed → viewing(id), snapshotting the record into the draft.
    pub fn open_view(&mut self, record: Record) -> Result<(), EngineError> {
        self.require_closed("view")?;
        let draft = Draft::from_record(&self.schema, &record);
        self.enter(ModalState::Viewing(record.id.clone()), draft, Some(record));
        Ok(())
    }

    /// closed → editing(id), the list-row edit action.
    pub fn open_edit(&mut self, record: Record) -> Result<(), EngineError> {
        self.require_closed("edit")?;
        let draft = Draft::from_record(&self.schema, &record);
        self.enter(ModalState::Editing(record.id.clone()), draft, Some(record));
        Ok(())
    }

    /// viewing(id) → editing(id). The viewed snapshot becomes the editable
    /// draft; nothing is refetched.
    pub fn begin_edit(&mut self) -> Result<(), EngineError> {
        let ModalState::Viewing(id) = &self.state else {
            return Err(EngineError::InvalidTransition {
                state: self.state.describe(),
                action: "edit",
            });
        };
        self.state = ModalState::Editing(id.clone());
        self.field_errors = ValidationErrors::default();
        self.error = None;
        Ok(())
    }

    /// Any open state → closed. The draft is discarded unconditionally.
    pub fn cancel(&mut self) {
        let draft = Draft::empty(&self.schema);
        self.enter(ModalState::Closed, draft, None);
    }

    /// Sets several fields at once. Nothing changes unless every field can be set.
    pub fn set_values(&mut self, values: Vec<(String, String)>) -> Result<(), EngineError> {
        for (field, _) in &values {
            self.check_field(field, false)?;
        }
        for (field, value) in values {
            self.draft.set(&field, value);
        }
        Ok(())
    }

    /// Selects files for file fields, checked against the accept pattern at
    /// submit time. Single-file fields keep only the latest pick. Nothing is
    /// attached unless every field accepts a file.
    pub fn attach_files(&mut self, files: Vec<(String, FilePart)>) -> Result<(), EngineError> {
        for (field, _) in &files {
            self.check_field(field, true)?;
        }
        for (field, file) in files {
            let multiple = self.schema.field(&field).is_some_and(|def| def.multiple);
            if !multiple {
                self.draft.clear_files(&field);
            }
            self.draft.attach(&field, file);
        }
        Ok(())
    }

    fn check_field(&self, field: &str, file: bool) -> Result<(), EngineError> {
        self.require_editable(if file { "select a file" } else { "change a field" })?;
        let def = self
            .schema
            .field(field)
            .ok_or_else(|| EngineError::UnknownField(field.to_string()))?;
        if def.is_file() != file {
            return Err(EngineError::NotEditable(field.to_string()));
        }
        Ok(())
    }

    /// Validates, packages and sends the draft.
    ///
    /// On success the modal closes and the saved record is returned; the
    /// caller refetches. On validation failure nothing is sent. On a store
    /// failure the modal stays open with the draft intact.
    pub async fn submit(&mut self, store: &dyn CollectionStore) -> Result<Record, EngineError> {
        let mode = self.require_editable("submit")?;

        let payload = match validate_draft(&self.schema, &self.draft, mode)
            .and_then(|()| self.draft.to_payload(&self.schema))
        {
            Ok(payload) => payload,
            Err(errors) => {
                self.field_errors = errors.clone();
                return Err(EngineError::Validation(errors));
            }
        };
        self.field_errors = ValidationErrors::default();

        let collection = self.schema.id();
        let result = match &self.state {
            ModalState::Editing(id) => store.update(collection, id, payload).await,
            _ => store.create(collection, payload).await,
        };

        match result {
            Ok(record) => {
                info!("Saved record {} in '{}'", record.id, collection);
                self.cancel();
                Ok(record)
            }
            Err(e) => {
                warn!("Failed to save record in '{}': {}", collection, e);
                self.error = Some(format!("Failed to save item: {e}"));
                Err(e.into())
            }
        }
    }

    /// Deletes a record from the viewing state or from a list row.
    ///
    /// `confirm` can veto the deletion before anything is sent. On success the
    /// modal closes; on failure it stays as it was with the error recorded.
    pub async fn delete<F>(
        &mut self,
        store: &dyn CollectionStore,
        id: &str,
        confirm: F,
    ) -> Result<DeleteOutcome, EngineError>
    where
        F: FnOnce(&str) -> bool,
    {
        if matches!(self.state, ModalState::Creating | ModalState::Editing(_)) {
            return Err(EngineError::InvalidTransition {
                state: self.state.describe(),
                action: "delete",
            });
        }
        if !confirm(id) {
            return Ok(DeleteOutcome::Vetoed);
        }

        let shown = self.is_viewing(id);
        let collection = self.schema.id();
        match store.delete(collection, id).await {
            Ok(()) => {
                info!("Deleted record {} from '{}'", id, collection);
                if shown {
                    self.cancel();
                }
                Ok(DeleteOutcome::Deleted)
            }
            Err(e) => {
                warn!("Failed to delete record {} from '{}': {}", id, collection, e);
                if shown {
                    self.error = Some(format!("Failed to delete item: {e}"));
                }
                Err(e.into())
            }
        }
    }

    /// True while the modal shows the record `id` read-only.
    pub fn is_viewing(&self, id: &str) -> bool {
        matches!(&self.state, ModalState::Viewing(shown) if shown == id)
    }

    pub fn view(&self, files: &dyn FileLocator) -> Option<ModalView> {
        let singular = self.schema.singular_name();
        let (heading, form, detail) = match (&self.state, &self.record) {
            (ModalState::Closed, _) => return None,
            (ModalState::Creating, _) => (
                format!("Add {singular}"),
                render::form(&self.schema, &self.draft, Mode::Create),
                None,
            ),
            (ModalState::Editing(_), _) => (
                format!("Edit {singular}"),
                render::form(&self.schema, &self.draft, Mode::Edit),
                None,
            ),
            (ModalState::Viewing(_), Some(record)) => {
                let detail = render::detail(&self.schema, record, files);
                (detail.title.clone(), Vec::new(), Some(detail))
            }
            (ModalState::Viewing(_), None) => (String::new(), Vec::new(), None),
        };

        Some(ModalView {
            state: self.state.clone(),
            heading,
            form,
            detail,
            field_errors: self.field_errors.clone(),
            error: self.error.clone(),
        })
    }
}

#[cfg(test)]
impl RecordModal {
    pub fn set_value(&mut self, field: &str, value: impl Into<String>) -> Result<(), EngineError> {
        self.set_values(vec![(field.to_string(), value.into())])
    }

    pub fn attach_file(&mut self, field: &str, file: FilePart) -> Result<(), EngineError> {
        self.attach_files(vec![(field.to_string(), file)])
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn field_errors(&self) -> &ValidationErrors {
        &self.field_errors
    }
}
