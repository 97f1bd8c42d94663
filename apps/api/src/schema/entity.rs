use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;

use crate::models::record::SYSTEM_FIELDS;
use crate::schema::field::{FieldDef, FieldKind};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("schema '{schema}' declares no fields")]
    NoFields { schema: String },

    #[error("schema '{schema}' declares field '{field}' more than once")]
    DuplicateField { schema: String, field: String },

    #[error("select field '{field}' in schema '{schema}' has no options")]
    EmptySelect { schema: String, field: String },

    #[error("field '{field}' in schema '{schema}' shadows a system field")]
    ReservedField { schema: String, field: String },

    #[error("collection '{0}' is registered more than once")]
    DuplicateCollection(String),
}

/// Declarative description of one manageable entity type.
///
/// Only constructible through [`EntitySchema::new`], which enforces the
/// field invariants. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntitySchema {
    id: String,
    display_name: String,
    description: String,
    fields: Vec<FieldDef>,
}

impl EntitySchema {
    pub fn new(
        id: &str,
        display_name: &str,
        description: &str,
        fields: Vec<FieldDef>,
    ) -> Result<Self, SchemaError> {
        if fields.is_empty() {
            return Err(SchemaError::NoFields { schema: id.into() });
        }

        let mut seen = HashSet::new();
        for field in &fields {
            if SYSTEM_FIELDS.contains(&field.name.as_str()) {
                return Err(SchemaError::ReservedField {
                    schema: id.into(),
                    field: field.name.clone(),
                });
            }
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    schema: id.into(),
                    field: field.name.clone(),
                });
            }
            if let FieldKind::Select { options } = &field.kind {
                if options.is_empty() {
                    return Err(SchemaError::EmptySelect {
                        schema: id.into(),
                        field: field.name.clone(),
                    });
                }
            }
        }

        Ok(Self {
            id: id.into(),
            display_name: display_name.into(),
            description: description.into(),
            fields,
        })
    }

    /// Collection identifier, also the remote collection name.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The primary display label of an item.
    pub fn title_field(&self) -> &FieldDef {
        // non-empty, checked in `new`
        &self.fields[0]
    }

    /// The field the category filter applies to, if the schema has one.
    pub fn category_field(&self) -> Option<&FieldDef> {
        self.fields
            .iter()
            .find(|f| f.name == "category" || f.name == "domain")
    }

    /// First image upload field, used as a banner or card thumbnail.
    pub fn image_field(&self) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.is_image())
    }

    /// "Projects" → "Project".
    pub fn singular_name(&self) -> &str {
        self.display_name
            .strip_suffix('s')
            .unwrap_or(&self.display_name)
    }
}
