pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::collections::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.max_upload_bytes);
    Router::new()
        .route("/health", get(health::health_handler))
        // Collection hub and schemas
        .route("/api/v1/collections", get(handlers::handle_list_collections))
        .route(
            "/api/v1/collections/:c/schema",
            get(handlers::handle_get_schema),
        )
        // Screen lifecycle and query
        .route(
            "/api/v1/collections/:c",
            get(handlers::handle_open_screen).delete(handlers::handle_close_screen),
        )
        .route(
            "/api/v1/collections/:c/refresh",
            post(handlers::handle_refresh),
        )
        .route(
            "/api/v1/collections/:c/query",
            put(handlers::handle_update_query),
        )
        // Record modal
        .route(
            "/api/v1/collections/:c/modal/create",
            post(handlers::handle_open_create),
        )
        .route(
            "/api/v1/collections/:c/modal/edit",
            post(handlers::handle_begin_edit),
        )
        .route(
            "/api/v1/collections/:c/modal/cancel",
            post(handlers::handle_cancel),
        )
        .route(
            "/api/v1/collections/:c/modal/draft",
            patch(handlers::handle_set_draft),
        )
        .route(
            "/api/v1/collections/:c/modal/files",
            post(handlers::handle_attach_files).layer(upload_limit),
        )
        .route(
            "/api/v1/collections/:c/modal/submit",
            post(handlers::handle_submit),
        )
        // List-row actions
        .route(
            "/api/v1/collections/:c/records/:id",
            delete(handlers::handle_delete_record),
        )
        .route(
            "/api/v1/collections/:c/records/:id/view",
            post(handlers::handle_open_view),
        )
        .route(
            "/api/v1/collections/:c/records/:id/edit",
            post(handlers::handle_open_edit),
        )
        .with_state(state)
}
