// Schema-driven record management: query pipeline, field renderer, draft
// validation and packaging, the record modal and the collection manager.
// All store access goes through `store::CollectionStore`.

pub mod draft;
pub mod error;
pub mod manager;
pub mod modal;
pub mod query;
pub mod render;
pub mod validation;

use serde::Serialize;

pub use error::EngineError;
pub use manager::CollectionManager;

/// How a field or form is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Create,
    Edit,
    View,
}
