use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::store::StoreError;

/// Why a single field failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldErrorKind {
    #[error("is required")]
    Required,

    #[error("must be one of the listed options")]
    NotAnOption,

    #[error("is not a valid email address")]
    InvalidEmail,

    #[error("is not a valid URL")]
    InvalidUrl,

    #[error("must be a date formatted YYYY-MM-DD")]
    InvalidDate,

    #[error("is not valid JSON: {0}")]
    MalformedJson(String),

    #[error("file type is not accepted (expected {accept})")]
    FileTypeRejected { accept: String },
}

impl FieldErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            FieldErrorKind::Required => "required",
            FieldErrorKind::NotAnOption => "not_an_option",
            FieldErrorKind::InvalidEmail => "invalid_email",
            FieldErrorKind::InvalidUrl => "invalid_url",
            FieldErrorKind::InvalidDate => "invalid_date",
            FieldErrorKind::MalformedJson(_) => "malformed_json",
            FieldErrorKind::FileTypeRejected { .. } => "file_type_rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub kind: FieldErrorKind,
}

impl Serialize for FieldError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("FieldError", 3)?;
        s.serialize_field("field", &self.field)?;
        s.serialize_field("code", self.kind.code())?;
        s.serialize_field("message", &self.kind.to_string())?;
        s.end()
    }
}

/// Field-level errors in schema order, at most one per field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn push(&mut self, field: &str, kind: FieldErrorKind) {
        self.0.push(FieldError {
            field: field.to_string(),
            kind,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&FieldErrorKind> {
        self.0.iter().find(|e| e.field == field).map(|e| &e.kind)
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{} {}", e.field, e.kind)?;
        }
        Ok(())
    }
}

/// Every failure the engine reports. None of them is fatal.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no such collection: {0}")]
    CollectionNotFound(String),

    #[error("record {id} not found in {collection}")]
    RecordNotFound { collection: String, id: String },

    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("store request failed: {0}")]
    Transport(StoreError),

    #[error("cannot {action} while {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },

    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("field '{0}' cannot be set this way")]
    NotEditable(String),
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { collection, id } => {
                EngineError::RecordNotFound { collection, id }
            }
            other => EngineError::Transport(other),
        }
    }
}

impl From<ValidationErrors> for EngineError {
    fn from(e: ValidationErrors) -> Self {
        EngineError::Validation(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_display_and_lookup() {
        let mut errors = ValidationErrors::default();
        errors.push("title", FieldErrorKind::Required);
        errors.push("email", FieldErrorKind::InvalidEmail);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("title"), Some(&FieldErrorKind::Required));
        assert_eq!(
            errors.to_string(),
            "title is required; email is not a valid email address"
        );
    }

    #[test]
    fn test_field_error_serializes_code_and_message() {
        let mut errors = ValidationErrors::default();
        errors.push("links", FieldErrorKind::MalformedJson("EOF".into()));
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json[0]["field"], "links");
        assert_eq!(json[0]["code"], "malformed_json");
        assert_eq!(json[0]["message"], "is not valid JSON: EOF");
    }

    #[test]
    fn test_store_not_found_maps_to_record_not_found() {
        let err: EngineError = StoreError::NotFound {
            collection: "cvs".into(),
            id: "c1".into(),
        }
        .into();
        assert!(matches!(err, EngineError::RecordNotFound { .. }));

        let err: EngineError = StoreError::Api {
            status: 500,
            message: "boom".into(),
        }
        .into();
        assert!(matches!(err, EngineError::Transport(_)));
    }
}
