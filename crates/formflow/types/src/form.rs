//! Form templates and submissions
//!
//! A template names the fields a submission carries and which of them are
//! required. Required-field checking happens once, before a submission is
//! accepted and its workflow instance is created.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Identifiers ──────────────────────────────────────────────────────

/// Unique identifier for a form template
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FormTemplateId(pub String);

impl FormTemplateId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for FormTemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a form submission
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubmissionId(pub String);

impl SubmissionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Template ─────────────────────────────────────────────────────────

/// One field of a form schema
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Key under which the value appears in submission data
    pub name: String,
    /// Display label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Free-form type hint for renderers ("text", "number", "date", ...)
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    /// Whether a submission must carry a non-empty value for this field
    #[serde(default)]
    pub required: bool,
}

impl FieldSpec {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            field_type: None,
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(name)
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_type(mut self, field_type: impl Into<String>) -> Self {
        self.field_type = Some(field_type.into());
        self
    }
}

/// Field layout of a template
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FormSchema {
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

/// A named form schema that submissions are filled against
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FormTemplate {
    pub id: FormTemplateId,
    /// Unique, human-readable name
    pub name: String,
    pub schema: FormSchema,
    pub created_at: DateTime<Utc>,
}

impl FormTemplate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: FormTemplateId::generate(),
            name: name.into(),
            schema: FormSchema::default(),
            created_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: FormTemplateId) -> Self {
        self.id = id;
        self
    }

    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.schema.fields.push(field);
        self
    }

    /// Names of required fields that are absent or empty in `data`, in
    /// schema order. Null, `false`, zero, and empty strings, arrays and
    /// objects all count as empty.
    pub fn missing_required_fields(&self, data: &Map<String, Value>) -> Vec<String> {
        self.schema
            .fields
            .iter()
            .filter(|f| f.required)
            .filter(|f| data.get(&f.name).map_or(true, is_empty_value))
            .map(|f| f.name.clone())
            .collect()
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

// ── Submission ───────────────────────────────────────────────────────

/// One filled-in form. Owns exactly one workflow instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FormSubmission {
    pub id: SubmissionId,
    pub form_template: FormTemplateId,
    /// Username of the submitter, taken from the verified identity
    pub submitted_by: String,
    pub data: Map<String, Value>,
    pub submitted_at: DateTime<Utc>,
}

impl FormSubmission {
    pub fn new(
        form_template: FormTemplateId,
        submitted_by: impl Into<String>,
        data: Map<String, Value>,
    ) -> Self {
        Self {
            id: SubmissionId::generate(),
            form_template,
            submitted_by: submitted_by.into(),
            data,
            submitted_at: Utc::now(),
        }
    }
}
