use chrono::NaiveDate;
use reqwest::Url;

use crate::engine::draft::Draft;
use crate::engine::error::{FieldErrorKind, ValidationErrors};
use crate::engine::Mode;
use crate::schema::{EntitySchema, FieldDef, FieldKind};

/// Checks a draft against its schema before anything is sent.
///
/// Required means present and not the select placeholder. File fields are
/// only required when creating; an edit keeps the already stored file. Format
/// checks run on non-empty values only.
pub fn validate_draft(
    schema: &EntitySchema,
    draft: &Draft,
    mode: Mode,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    for field in schema.fields() {
        if let Err(kind) = validate_field(field, draft, mode) {
            errors.push(&field.name, kind);
        }
    }
    errors.into_result()
}

fn validate_field(field: &FieldDef, draft: &Draft, mode: Mode) -> Result<(), FieldErrorKind> {
    if let FieldKind::File { accept } = &field.kind {
        let pending = draft.pending_files(&field.name);
        if pending
            .iter()
            .any(|file| !field.accepts(&file.file_name, file.content_type.as_deref()))
        {
            return Err(FieldErrorKind::FileTypeRejected {
                accept: accept.clone(),
            });
        }
        return if pending.is_empty() && field.required && mode == Mode::Create {
            Err(FieldErrorKind::Required)
        } else {
            Ok(())
        };
    }

    let value = draft.value(&field.name).trim();
    if value.is_empty() {
        return if field.required {
            Err(FieldErrorKind::Required)
        } else {
            Ok(())
        };
    }

    match &field.kind {
        FieldKind::Select { options } if !options.iter().any(|o| o == value) => {
            Err(FieldErrorKind::NotAnOption)
        }
        FieldKind::Email if !is_email(value) => Err(FieldErrorKind::InvalidEmail),
        FieldKind::Url if Url::parse(value).is_err() => Err(FieldErrorKind::InvalidUrl),
        FieldKind::Date if !is_date(value) => Err(FieldErrorKind::InvalidDate),
        FieldKind::Json => serde_json::from_str::<serde_json::Value>(value)
            .map(drop)
            .map_err(|e| FieldErrorKind::MalformedJson(e.to_string())),
        FieldKind::Text
        | FieldKind::Email
        | FieldKind::Url
        | FieldKind::Select { .. }
        | FieldKind::Date
        | FieldKind::File { .. }
        | FieldKind::LongText => Ok(()),
    }
}

fn is_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

fn is_date(value: &str) -> bool {
    value.len() == 10 && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}
