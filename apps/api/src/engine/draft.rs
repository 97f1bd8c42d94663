use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::engine::error::{FieldErrorKind, ValidationErrors};
use crate::models::record::{coerce, Record};
use crate::schema::{EntitySchema, FieldKind};
use crate::store::{FilePart, MultipartPayload, Payload};

/// Working copy of a record's field values during create or edit.
///
/// Scalar values are held as the text a form control would show. Pending
/// file selections are kept apart from the stored file names they replace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Draft {
    values: BTreeMap<String, String>,
    files: BTreeMap<String, Vec<FilePart>>,
}

impl Draft {
    /// Every schema field present and empty.
    pub fn empty(schema: &EntitySchema) -> Self {
        Self {
            values: schema
                .fields()
                .iter()
                .map(|f| (f.name.clone(), String::new()))
                .collect(),
            files: BTreeMap::new(),
        }
    }

    pub fn from_record(schema: &EntitySchema, record: &Record) -> Self {
        let values = schema
            .fields()
            .iter()
            .map(|field| {
                let text = match record.value(&field.name) {
                    None => String::new(),
                    Some(value) => form_text(&field.kind, value),
                };
                (field.name.clone(), text)
            })
            .collect();
        Self {
            values,
            files: BTreeMap::new(),
        }
    }

    pub fn value(&self, name: &str) -> &str {
        self.values.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.values.insert(name.to_string(), value.into());
    }

    /// Adds a selected file to the field's pending uploads.
    pub fn attach(&mut self, name: &str, file: FilePart) {
        self.files.entry(name.to_string()).or_default().push(file);
    }

    /// Drops every pending upload of one field.
    pub fn clear_files(&mut self, name: &str) {
        self.files.remove(name);
    }

    pub fn pending_files(&self, name: &str) -> &[FilePart] {
        self.files.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_pending_files(&self) -> bool {
        !self.files.is_empty()
    }

    /// Packages the draft for a create or update call.
    ///
    /// Only schema fields are sent, so system fields never leak into a
    /// payload. File fields are sent only when a new file was selected; the
    /// stored name of an untouched file is left alone. Any pending file makes
    /// the payload multipart.
    pub fn to_payload(&self, schema: &EntitySchema) -> Result<Payload, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let mut scalars: Vec<(String, Value)> = Vec::new();

        for field in schema.fields() {
            let text = self.value(&field.name);
            let value = match &field.kind {
                FieldKind::File { .. } => continue,
                FieldKind::Json if text.trim().is_empty() => Value::Null,
                FieldKind::Json => match serde_json::from_str::<Value>(text) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        errors.push(&field.name, FieldErrorKind::MalformedJson(e.to_string()));
                        continue;
                    }
                },
                _ => Value::String(text.to_string()),
            };
            scalars.push((field.name.clone(), value));
        }
        errors.into_result()?;

        if !self.has_pending_files() {
            return Ok(Payload::Json(scalars.into_iter().collect::<Map<_, _>>()));
        }

        let text = scalars
            .into_iter()
            .map(|(name, value)| {
                let text = match value {
                    Value::String(s) => s,
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                (name, text)
            })
            .collect();
        let files = schema
            .fields()
            .iter()
            .flat_map(|f| {
                self.pending_files(&f.name)
                    .iter()
                    .map(|file| (f.name.clone(), file.clone()))
            })
            .collect();
        Ok(Payload::Multipart(MultipartPayload { text, files }))
    }
}

/// The text a form control shows for a stored value.
fn form_text(kind: &FieldKind, value: &Value) -> String {
    match (kind, value) {
        (FieldKind::Json, Value::Null) => String::new(),
        (FieldKind::Json, Value::String(s)) => s.clone(),
        (FieldKind::Json, structured) => {
            serde_json::to_string_pretty(structured).unwrap_or_else(|_| structured.to_string())
        }
        // Stored datetimes look like `2025-01-15 00:00:00.000Z`.
        (FieldKind::Date, value) => {
            let text = coerce(value);
            match text.get(..10) {
                Some(day) if text.len() > 10 => day.to_string(),
                _ => text,
            }
        }
        (_, value) => coerce(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::schema::FieldDef;

    fn schema() -> EntitySchema {
        EntitySchema::new(
            "skills",
            "Skill Nexus",
            "",
            vec![
                FieldDef::text("title", "Skill").required(),
                FieldDef::date("target_date", "Target Date"),
                FieldDef::json("resource_links", "Links"),
                FieldDef::file("attachments", "Attachments", ".pdf"),
            ],
        )
        .unwrap()
    }

    fn stored() -> Record {
        let mut record = Record::new("s1")
            .with("title", "Advanced TypeScript")
            .with("target_date", "2025-03-01 00:00:00.000Z")
            .with("resource_links", json!([{"url": "https://example.com"}]))
            .with("attachments", "notes_3k2.pdf");
        record.collection_id = "pbc_9".into();
        record.created = "2025-01-01 10:00:00.000Z".into();
        record
    }

    #[test]
    fn test_empty_draft_has_every_field() {
        let draft = Draft::empty(&schema());
        assert_eq!(draft.value("title"), "");
        assert_eq!(draft.value("attachments"), "");
        assert!(!draft.has_pending_files());
    }

    #[test]
    fn test_from_record_normalizes_dates_and_json() {
        let draft = Draft::from_record(&schema(), &stored());
        assert_eq!(draft.value("target_date"), "2025-03-01");
        assert_eq!(draft.value("attachments"), "notes_3k2.pdf");
        let links: Value = serde_json::from_str(draft.value("resource_links")).unwrap();
        assert_eq!(links, json!([{"url": "https://example.com"}]));
    }

    #[test]
    fn test_json_payload_excludes_system_and_untouched_files() {
        let payload = Draft::from_record(&schema(), &stored())
            .to_payload(&schema())
            .unwrap();
        let Payload::Json(map) = payload else {
            panic!("expected JSON payload");
        };
        let mut keys: Vec<&str> = map.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["resource_links", "target_date", "title"]);
        assert_eq!(map["resource_links"], json!([{"url": "https://example.com"}]));
    }

    #[test]
    fn test_pending_file_makes_multipart() {
        let mut draft = Draft::from_record(&schema(), &stored());
        draft.attach(
            "attachments",
            FilePart {
                file_name: "roadmap.pdf".into(),
                content_type: Some("application/pdf".into()),
                bytes: Bytes::from_static(b"%PDF"),
            },
        );
        let Payload::Multipart(parts) = draft.to_payload(&schema()).unwrap() else {
            panic!("expected multipart payload");
        };
        assert_eq!(parts.files.len(), 1);
        assert_eq!(parts.files[0].0, "attachments");
        let links = parts
            .text
            .iter()
            .find(|(k, _)| k == "resource_links")
            .map(|(_, v)| v.as_str())
            .unwrap();
        assert_eq!(links, r#"[{"url":"https://example.com"}]"#);
        assert!(parts.text.iter().all(|(k, _)| k != "id" && k != "created"));
    }

    #[test]
    fn test_every_pending_file_becomes_a_part() {
        let mut draft = Draft::from_record(&schema(), &stored());
        for name in ["a.pdf", "b.pdf"] {
            draft.attach(
                "attachments",
                FilePart {
                    file_name: name.into(),
                    content_type: None,
                    bytes: Bytes::from_static(b"%PDF"),
                },
            );
        }
        assert_eq!(draft.pending_files("attachments").len(), 2);
        let Payload::Multipart(parts) = draft.to_payload(&schema()).unwrap() else {
            panic!("expected multipart payload");
        };
        let files: Vec<(&str, &str)> = parts
            .files
            .iter()
            .map(|(field, file)| (field.as_str(), file.file_name.as_str()))
            .collect();
        assert_eq!(files, [("attachments", "a.pdf"), ("attachments", "b.pdf")]);

        draft.clear_files("attachments");
        assert!(!draft.has_pending_files());
    }

    #[test]
    fn test_malformed_json_is_field_error() {
        let mut draft = Draft::empty(&schema());
        draft.set("title", "Rust");
        draft.set("resource_links", "[{\"url\": ");
        let errors = draft.to_payload(&schema()).unwrap_err();
        assert!(matches!(
            errors.get("resource_links"),
            Some(FieldErrorKind::MalformedJson(_))
        ));
    }

    #[test]
    fn test_empty_json_sends_null() {
        let mut draft = Draft::empty(&schema());
        draft.set("title", "Rust");
        let Payload::Json(map) = draft.to_payload(&schema()).unwrap() else {
            panic!("expected JSON payload");
        };
        assert_eq!(map["resource_links"], Value::Null);
        assert_eq!(map["title"], json!("Rust"));
    }

    #[test]
    fn test_unmodified_round_trip_matches_record() {
        let schema = EntitySchema::new(
            "recruiters",
            "Recruiters",
            "",
            vec![
                FieldDef::text("recruiter_name", "Name").required(),
                FieldDef::email("email", "Email"),
                FieldDef::url("linkedin_profile", "LinkedIn"),
                FieldDef::select("status", "Status", &["New", "Connected"]),
                FieldDef::date("met_on", "Met On"),
            ],
        )
        .unwrap();
        let record = Record::new("r1")
            .with("recruiter_name", "Grace")
            .with("email", "grace@example.com")
            .with("linkedin_profile", "https://linkedin.com/in/grace")
            .with("status", "Connected")
            .with("met_on", "2025-02-14");

        let Payload::Json(map) = Draft::from_record(&schema, &record).to_payload(&schema).unwrap()
        else {
            panic!("expected JSON payload");
        };
        for (name, value) in &map {
            assert_eq!(Some(value), record.value(name), "field {name}");
        }
        assert_eq!(map.len(), 5);
    }
}
