pub mod entity;
pub mod field;
pub mod registry;

pub use entity::EntitySchema;
pub use field::{FieldDef, FieldKind};
pub use registry::EntityRegistry;
