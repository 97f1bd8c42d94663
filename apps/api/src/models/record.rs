use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys the store owns. Never part of a schema, never sent in a payload.
pub const SYSTEM_FIELDS: &[&str] = &[
    "id",
    "collectionId",
    "collectionName",
    "created",
    "updated",
    "expand",
];

/// A record as the store returns it: system fields plus an opaque field map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(rename = "collectionId", default)]
    pub collection_id: String,
    #[serde(rename = "collectionName", default)]
    pub collection_name: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub updated: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expand: Option<Value>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            collection_id: String::new(),
            collection_name: String::new(),
            created: String::new(),
            updated: String::new(),
            expand: None,
            fields: Map::new(),
        }
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// String-coerced value of a field, resolving `id`, `created` and
    /// `updated` as well. Missing fields coerce to the empty string.
    pub fn text(&self, name: &str) -> String {
        match name {
            "id" => self.id.clone(),
            "created" => self.created.clone(),
            "updated" => self.updated.clone(),
            _ => self.fields.get(name).map(coerce).unwrap_or_default(),
        }
    }

    /// Every value a free-text search looks at.
    pub fn searchable_values(&self) -> impl Iterator<Item = String> + '_ {
        [self.id.clone(), self.created.clone(), self.updated.clone()]
            .into_iter()
            .chain(self.fields.values().map(coerce))
    }

    /// Stored file name(s) of a file field. Multi-file fields store a list.
    pub fn file_names(&self, name: &str) -> Vec<String> {
        match self.fields.get(name) {
            Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Renders a JSON value the way a text field would show it.
///
/// Strings are taken verbatim, `null` becomes empty, lists of scalars are
/// comma-joined and anything structured falls back to compact JSON.
pub fn coerce(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) if items.iter().all(|v| !v.is_array() && !v.is_object()) => {
            items.iter().map(coerce).collect::<Vec<_>>().join(",")
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_splits_system_fields() {
        let record: Record = serde_json::from_value(json!({
            "id": "abc123",
            "collectionId": "pbc_1",
            "collectionName": "projects",
            "created": "2025-01-02 10:00:00.000Z",
            "updated": "2025-01-03 10:00:00.000Z",
            "project_name": "EcoMind AI",
            "thumbnail": "eco_x1.png"
        }))
        .unwrap();

        assert_eq!(record.id, "abc123");
        assert_eq!(record.collection_name, "projects");
        assert_eq!(record.fields.len(), 2);
        assert_eq!(record.text("project_name"), "EcoMind AI");
        assert!(record.fields.get("created").is_none());
    }

    #[test]
    fn test_text_resolves_system_fields_and_missing() {
        let mut record = Record::new("r1").with("count", 3);
        record.created = "2025-01-01".into();
        assert_eq!(record.text("id"), "r1");
        assert_eq!(record.text("created"), "2025-01-01");
        assert_eq!(record.text("count"), "3");
        assert_eq!(record.text("nope"), "");
    }

    #[test]
    fn test_coerce() {
        assert_eq!(coerce(&Value::Null), "");
        assert_eq!(coerce(&json!(true)), "true");
        assert_eq!(coerce(&json!(["a", "b"])), "a,b");
        assert_eq!(coerce(&json!({"k": 1})), r#"{"k":1}"#);
    }

    #[test]
    fn test_file_names() {
        let record = Record::new("r1")
            .with("file", "cv.pdf")
            .with("attachments", json!(["a.pdf", "", "b.png"]))
            .with("empty", "");
        assert_eq!(record.file_names("file"), ["cv.pdf"]);
        assert_eq!(record.file_names("attachments"), ["a.pdf", "b.png"]);
        assert!(record.file_names("empty").is_empty());
    }
}
