use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::collections::sessions::Session;
use crate::engine::manager::{ScreenView, ViewMode};
use crate::engine::modal::DeleteOutcome;
use crate::engine::query::SortDirection;
use crate::engine::CollectionManager;
use crate::errors::AppError;
use crate::models::record::coerce;
use crate::schema::EntitySchema;
use crate::state::AppState;
use crate::store::FilePart;

#[derive(Serialize)]
pub struct CollectionSummary {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub field_count: usize,
}

/// Partial query update; absent keys are left as they are.
#[derive(Debug, Default, Deserialize)]
pub struct QueryUpdate {
    pub search_term: Option<String>,
    pub category_filter: Option<String>,
    pub sort_field: Option<String>,
    pub sort_direction: Option<SortDirection>,
    /// Flips the current direction, after any explicit sort change.
    #[serde(default)]
    pub toggle_direction: bool,
    pub view_mode: Option<ViewMode>,
}

#[derive(Deserialize)]
pub struct DeleteParams {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub outcome: DeleteOutcome,
    pub screen: ScreenView,
}

async fn open_session(state: &AppState, collection: &str) -> Result<Session, AppError> {
    Ok(state
        .sessions
        .get_or_open(collection, state.store.as_ref())
        .await?)
}

fn screen(state: &AppState, manager: &CollectionManager) -> Json<ScreenView> {
    Json(manager.screen(state.files.as_ref()))
}

/// GET /api/v1/collections
pub async fn handle_list_collections(
    State(state): State<AppState>,
) -> Json<Vec<CollectionSummary>> {
    Json(
        state
            .registry
            .iter()
            .map(|schema| CollectionSummary {
                id: schema.id().to_string(),
                display_name: schema.display_name().to_string(),
                description: schema.description().to_string(),
                field_count: schema.fields().len(),
            })
            .collect(),
    )
}

/// GET /api/v1/collections/:c/schema
pub async fn handle_get_schema(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> Result<Json<EntitySchema>, AppError> {
    let schema = state.registry.get(&collection)?;
    Ok(Json(schema.as_ref().clone()))
}

/// GET /api/v1/collections/:c
pub async fn handle_open_screen(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> Result<Json<ScreenView>, AppError> {
    let session = open_session(&state, &collection).await?;
    let manager = session.lock().await;
    Ok(screen(&state, &manager))
}

/// DELETE /api/v1/collections/:c
pub async fn handle_close_screen(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> StatusCode {
    state.sessions.close(&collection).await;
    StatusCode::NO_CONTENT
}

/// POST /api/v1/collections/:c/refresh
pub async fn handle_refresh(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> Result<Json<ScreenView>, AppError> {
    let session = open_session(&state, &collection).await?;
    state.sessions.refresh(&session, state.store.as_ref()).await;
    let manager = session.lock().await;
    Ok(screen(&state, &manager))
}

/// PUT /api/v1/collections/:c/query
pub async fn handle_update_query(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Json(update): Json<QueryUpdate>,
) -> Result<Json<ScreenView>, AppError> {
    let session = open_session(&state, &collection).await?;
    let mut manager = session.lock().await;
    // The only fallible change goes first so a rejected update changes nothing.
    if update.sort_field.is_some() || update.sort_direction.is_some() {
        let field = update
            .sort_field
            .unwrap_or_else(|| manager.query().sort_field.clone());
        let direction = update
            .sort_direction
            .unwrap_or(manager.query().sort_direction);
        manager.set_sort(&field, direction)?;
    }
    if let Some(term) = update.search_term {
        manager.set_search(term);
    }
    if let Some(category) = update.category_filter {
        manager.set_category(category);
    }
    if update.toggle_direction {
        manager.toggle_sort_direction();
    }
    if let Some(mode) = update.view_mode {
        manager.set_view_mode(mode);
    }
    Ok(screen(&state, &manager))
}

/// POST /api/v1/collections/:c/modal/create
pub async fn handle_open_create(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> Result<Json<ScreenView>, AppError> {
    let session = open_session(&state, &collection).await?;
    let mut manager = session.lock().await;
    manager.create()?;
    Ok(screen(&state, &manager))
}

/// POST /api/v1/collections/:c/records/:id/view
pub async fn handle_open_view(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<ScreenView>, AppError> {
    let session = open_session(&state, &collection).await?;
    let mut manager = session.lock().await;
    manager.view_record(&id)?;
    Ok(screen(&state, &manager))
}

/// POST /api/v1/collections/:c/records/:id/edit
pub async fn handle_open_edit(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<ScreenView>, AppError> {
    let session = open_session(&state, &collection).await?;
    let mut manager = session.lock().await;
    manager.edit_record(&id)?;
    Ok(screen(&state, &manager))
}

/// POST /api/v1/collections/:c/modal/edit
pub async fn handle_begin_edit(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> Result<Json<ScreenView>, AppError> {
    let session = open_session(&state, &collection).await?;
    let mut manager = session.lock().await;
    manager.modal_mut().begin_edit()?;
    Ok(screen(&state, &manager))
}

/// POST /api/v1/collections/:c/modal/cancel
pub async fn handle_cancel(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> Result<Json<ScreenView>, AppError> {
    let session = open_session(&state, &collection).await?;
    let mut manager = session.lock().await;
    manager.modal_mut().cancel();
    Ok(screen(&state, &manager))
}

/// PATCH /api/v1/collections/:c/modal/draft
/// All keys are applied or none are.
pub async fn handle_set_draft(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Json(values): Json<Map<String, Value>>,
) -> Result<Json<ScreenView>, AppError> {
    let session = open_session(&state, &collection).await?;
    let mut manager = session.lock().await;
    let values = values
        .iter()
        .map(|(field, value)| (field.clone(), coerce(value)))
        .collect();
    manager.modal_mut().set_values(values)?;
    Ok(screen(&state, &manager))
}

/// POST /api/v1/collections/:c/modal/files
/// Each multipart part is named after the file field it fills. Repeating a
/// name adds several files to a multi-file field.
pub async fn handle_attach_files(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<ScreenView>, AppError> {
    let mut parts = Vec::new();
    while let Some(part) = multipart.next_field().await? {
        let field = part
            .name()
            .ok_or_else(|| AppError::BadRequest("multipart part has no name".into()))?
            .to_string();
        let file_name = part
            .file_name()
            .ok_or_else(|| AppError::BadRequest(format!("part '{field}' is not a file")))?
            .to_string();
        let content_type = part.content_type().map(str::to_string);
        let bytes = part.bytes().await?;
        parts.push((
            field,
            FilePart {
                file_name,
                content_type,
                bytes,
            },
        ));
    }

    let session = open_session(&state, &collection).await?;
    let mut manager = session.lock().await;
    manager.modal_mut().attach_files(parts)?;
    Ok(screen(&state, &manager))
}

/// POST /api/v1/collections/:c/modal/submit
pub async fn handle_submit(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> Result<Json<ScreenView>, AppError> {
    let session = open_session(&state, &collection).await?;
    let mut manager = session.lock().await;
    manager.submit(state.store.as_ref()).await?;
    Ok(screen(&state, &manager))
}

/// DELETE /api/v1/collections/:c/records/:id?confirm=true
pub async fn handle_delete_record(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    Query(params): Query<DeleteParams>,
) -> Result<Json<DeleteResponse>, AppError> {
    let session = open_session(&state, &collection).await?;
    let mut manager = session.lock().await;
    let outcome = manager
        .delete_record(state.store.as_ref(), &id, |_| params.confirm)
        .await?;
    Ok(Json(DeleteResponse {
        outcome,
        screen: manager.screen(state.files.as_ref()),
    }))
}
