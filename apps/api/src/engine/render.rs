//! Field Renderer: turns a field definition and its current value into a
//! serializable control (create/edit) or display element (view).

use serde::Serialize;

use crate::engine::draft::Draft;
use crate::engine::Mode;
use crate::models::Record;
use crate::schema::{EntitySchema, FieldDef, FieldKind};
use crate::store::FileLocator;

const TEXTAREA_ROWS: u8 = 4;
const JSON_EDITOR_ROWS: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Text,
    Email,
    Url,
    Date,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rendered {
    Text {
        name: String,
        label: String,
        value: String,
    },
    LongText {
        name: String,
        label: String,
        value: String,
    },
    Link {
        name: String,
        label: String,
        href: String,
    },
    FileLink {
        name: String,
        label: String,
        files: Vec<FileRef>,
        image: bool,
    },
    Tags {
        name: String,
        label: String,
        tags: Vec<String>,
    },
    Code {
        name: String,
        label: String,
        value: String,
    },
    Input {
        name: String,
        label: String,
        input_type: InputType,
        value: String,
        placeholder: Option<String>,
        required: bool,
    },
    Select {
        name: String,
        label: String,
        /// Shown first, never a valid submission.
        placeholder: String,
        options: Vec<String>,
        selected: Option<String>,
        required: bool,
    },
    FileInput {
        name: String,
        label: String,
        accept: String,
        required: bool,
        multiple: bool,
        current_files: Vec<String>,
        pending_files: Vec<String>,
    },
    TextArea {
        name: String,
        label: String,
        value: String,
        placeholder: Option<String>,
        rows: u8,
        required: bool,
    },
    JsonEditor {
        name: String,
        label: String,
        value: String,
        rows: u8,
        required: bool,
    },
}

/// One stored file and where to download it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRef {
    pub file_name: String,
    pub href: Option<String>,
}

/// What the renderer knows about a field's current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldValue<'a> {
    pub text: &'a str,
    /// Stored files with resolved URLs, for file fields.
    pub files: Vec<FileRef>,
    /// Names of selected files not yet uploaded.
    pub pending_files: Vec<&'a str>,
}

impl<'a> FieldValue<'a> {
    pub fn text(text: &'a str) -> Self {
        Self {
            text,
            ..Self::default()
        }
    }
}

/// Renders one field. Returns `None` only in view mode for empty values.
pub fn render(field: &FieldDef, value: FieldValue<'_>, mode: Mode) -> Option<Rendered> {
    match mode {
        Mode::View => render_view(field, value),
        Mode::Create | Mode::Edit => Some(render_control(field, value, mode)),
    }
}

fn render_view(field: &FieldDef, value: FieldValue<'_>) -> Option<Rendered> {
    let text = value.text.trim();
    if text.is_empty() {
        return None;
    }
    let name = field.name.clone();
    let label = field.label.clone();

    let rendered = match &field.kind {
        FieldKind::Url => Rendered::Link {
            name,
            label,
            href: text.to_string(),
        },
        FieldKind::File { .. } => Rendered::FileLink {
            name,
            label,
            files: if value.files.is_empty() {
                split_list(text)
                    .map(|file_name| FileRef {
                        file_name,
                        href: None,
                    })
                    .collect()
            } else {
                value.files
            },
            image: field.is_image(),
        },
        FieldKind::Text if field.tags => Rendered::Tags {
            name,
            label,
            tags: split_list(text).collect(),
        },
        FieldKind::LongText => Rendered::LongText {
            name,
            label,
            value: text.to_string(),
        },
        FieldKind::Json => Rendered::Code {
            name,
            label,
            value: text.to_string(),
        },
        FieldKind::Text | FieldKind::Email | FieldKind::Select { .. } | FieldKind::Date => {
            Rendered::Text {
                name,
                label,
                value: text.to_string(),
            }
        }
    };
    Some(rendered)
}

fn render_control(field: &FieldDef, value: FieldValue<'_>, mode: Mode) -> Rendered {
    let name = field.name.clone();
    let label = field.label.clone();
    let required = field.required;
    let input = |input_type| Rendered::Input {
        name: field.name.clone(),
        label: field.label.clone(),
        input_type,
        value: value.text.to_string(),
        placeholder: field.placeholder.clone(),
        required,
    };

    match &field.kind {
        FieldKind::Text => input(InputType::Text),
        FieldKind::Email => input(InputType::Email),
        FieldKind::Url => input(InputType::Url),
        FieldKind::Date => input(InputType::Date),
        FieldKind::Select { options } => Rendered::Select {
            placeholder: format!("Select {label}"),
            name,
            label,
            options: options.clone(),
            selected: Some(value.text)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
            required,
        },
        FieldKind::File { accept } => Rendered::FileInput {
            name,
            label,
            accept: accept.clone(),
            required: required && mode == Mode::Create,
            multiple: field.multiple,
            current_files: if mode == Mode::Create {
                Vec::new()
            } else {
                split_list(value.text).collect()
            },
            pending_files: value.pending_files.iter().map(|f| f.to_string()).collect(),
        },
        FieldKind::LongText => Rendered::TextArea {
            name,
            label,
            value: value.text.to_string(),
            placeholder: field.placeholder.clone(),
            rows: TEXTAREA_ROWS,
            required,
        },
        FieldKind::Json => Rendered::JsonEditor {
            name,
            label,
            value: value.text.to_string(),
            rows: JSON_EDITOR_ROWS,
            required,
        },
    }
}

/// Comma-separated entries, trimmed, empties dropped.
fn split_list(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Every field of the schema as an editable control.
pub fn form(schema: &EntitySchema, draft: &Draft, mode: Mode) -> Vec<Rendered> {
    schema
        .fields()
        .iter()
        .filter_map(|field| {
            let value = FieldValue {
                pending_files: draft
                    .pending_files(&field.name)
                    .iter()
                    .map(|f| f.file_name.as_str())
                    .collect(),
                ..FieldValue::text(draft.value(&field.name))
            };
            render(field, value, mode)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailView {
    pub title: String,
    pub banner: Option<String>,
    pub fields: Vec<Rendered>,
}

/// Read-only layout of a record: title from the first field, the first image
/// field as a banner, then every other non-empty field.
pub fn detail(schema: &EntitySchema, record: &Record, files: &dyn FileLocator) -> DetailView {
    let snapshot = Draft::from_record(schema, record);
    let title_field = schema.title_field();
    let banner_field = schema
        .image_field()
        .filter(|f| !snapshot.value(&f.name).is_empty());
    let banner = banner_field.and_then(|f| files.file_url(record, &f.name));

    let fields = schema
        .fields()
        .iter()
        .filter(|f| f.name != title_field.name)
        .filter(|f| banner.is_none() || banner_field.map(|b| &b.name) != Some(&f.name))
        .filter_map(|field| {
            let stored = if field.is_file() {
                files.file_urls(record, &field.name)
            } else {
                Vec::new()
            };
            let value = FieldValue {
                files: stored
                    .into_iter()
                    .map(|(file_name, url)| FileRef {
                        file_name,
                        href: Some(url),
                    })
                    .collect(),
                ..FieldValue::text(snapshot.value(&field.name))
            };
            render(field, value, Mode::View)
        })
        .collect();

    DetailView {
        title: snapshot.value(&title_field.name).to_string(),
        banner,
        fields,
    }
}
