use serde::{Deserialize, Serialize};

/// The declared kind of a field. Drives rendering, validation and payload packaging.
///
/// Select options and file accept patterns live inside the variant so a select
/// without options or an accept pattern on a text field cannot be expressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Email,
    Url,
    Select { options: Vec<String> },
    /// Calendar date, stored and submitted as `YYYY-MM-DD`.
    Date,
    /// Binary upload at submit time, stored filename at rest.
    File { accept: String },
    LongText,
    /// Free-form JSON entered as raw text.
    Json,
}

/// One field of an entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// Comma-separated value shown as a tag list in view mode.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub tags: bool,
    /// File field holding several uploads at once.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub multiple: bool,
}

impl FieldDef {
    fn new(name: &str, label: &str, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            required: false,
            placeholder: None,
            tags: false,
            multiple: false,
        }
    }

    pub fn text(name: &str, label: &str) -> Self {
        Self::new(name, label, FieldKind::Text)
    }

    pub fn email(name: &str, label: &str) -> Self {
        Self::new(name, label, FieldKind::Email)
    }

    pub fn url(name: &str, label: &str) -> Self {
        Self::new(name, label, FieldKind::Url)
    }

    pub fn select(name: &str, label: &str, options: &[&str]) -> Self {
        Self::new(
            name,
            label,
            FieldKind::Select {
                options: options.iter().map(|o| o.to_string()).collect(),
            },
        )
    }

    pub fn date(name: &str, label: &str) -> Self {
        Self::new(name, label, FieldKind::Date)
    }

    pub fn file(name: &str, label: &str, accept: &str) -> Self {
        Self::new(
            name,
            label,
            FieldKind::File {
                accept: accept.into(),
            },
        )
    }

    pub fn long_text(name: &str, label: &str) -> Self {
        Self::new(name, label, FieldKind::LongText)
    }

    pub fn json(name: &str, label: &str) -> Self {
        Self::new(name, label, FieldKind::Json)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn placeholder(mut self, placeholder: &str) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn as_tags(mut self) -> Self {
        self.tags = true;
        self
    }

    pub fn allow_multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    /// Declared select options; empty for every other kind.
    pub fn options(&self) -> &[String] {
        match &self.kind {
            FieldKind::Select { options } => options,
            _ => &[],
        }
    }

    pub fn accept(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::File { accept } => Some(accept),
            _ => None,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, FieldKind::File { .. })
    }

    /// True for file fields whose accept pattern targets images.
    pub fn is_image(&self) -> bool {
        self.accept().is_some_and(|a| a.trim_start().starts_with("image"))
    }

    /// Checks a selected file against the accept pattern.
    ///
    /// `.ext` entries match the file extension, `type/*` matches the MIME
    /// prefix and anything else must equal the MIME type. An empty pattern
    /// (or a non-file field) accepts everything.
    pub fn accepts(&self, file_name: &str, content_type: Option<&str>) -> bool {
        let Some(accept) = self.accept() else {
            return true;
        };
        let entries: Vec<&str> = accept
            .split(',')
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .collect();
        if entries.is_empty() {
            return true;
        }

        let file_name = file_name.to_lowercase();
        let content_type = content_type.map(str::to_lowercase);

        entries.iter().any(|entry| {
            let entry = entry.to_lowercase();
            if entry.starts_with('.') {
                file_name.ends_with(&entry)
            } else if let Some(prefix) = entry.strip_suffix("/*") {
                content_type
                    .as_deref()
                    .is_some_and(|ct| ct.split('/').next() == Some(prefix))
            } else {
                content_type.as_deref() == Some(entry.as_str())
            }
        })
    }
}
