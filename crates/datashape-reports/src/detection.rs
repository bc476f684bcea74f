use anyhow::Result;
use datashape_core::SimpleType;
use serde::{Deserialize, Serialize};

/// Position of a detection. Lines and columns are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub filename: String,
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl SourceLocation {
    /// Build from zero-based (row, column) pairs as reported by the parser.
    pub fn from_points(filename: impl Into<String>, start: (usize, usize), end: (usize, usize)) -> Self {
        Self {
            filename: filename.into(),
            start_line: start.0 + 1,
            start_column: start.1 + 1,
            end_line: end.0 + 1,
            end_column: end.1 + 1,
        }
    }
}

/// One flattened entity: a field of an object, or a root with an empty object
/// name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRecord {
    pub object_name: String,
    pub object_uuid: String,
    pub field_name: String,
    pub field_uuid: String,
    pub field_type: String,
    pub simple_field_type: SimpleType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Detection {
    /// Found by a language discovery pass.
    Schema {
        detector: String,
        location: SourceLocation,
        record: SchemaRecord,
    },
    /// Extracted by a custom rule.
    CustomSchema {
        rule: String,
        location: SourceLocation,
        record: SchemaRecord,
    },
    /// A custom rule that only reports where it matched.
    Presence {
        rule: String,
        location: SourceLocation,
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },
    Error { file: String, message: String },
}

impl Detection {
    /// Value of the `type` tag.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Detection::Schema { .. } => "schema",
            Detection::CustomSchema { .. } => "custom_schema",
            Detection::Presence { .. } => "presence",
            Detection::Error { .. } => "error",
        }
    }

    #[must_use]
    pub fn filename(&self) -> &str {
        match self {
            Detection::Schema { location, .. }
            | Detection::CustomSchema { location, .. }
            | Detection::Presence { location, .. } => &location.filename,
            Detection::Error { file, .. } => file,
        }
    }

    #[must_use]
    pub fn record(&self) -> Option<&SchemaRecord> {
        match self {
            Detection::Schema { record, .. } | Detection::CustomSchema { record, .. } => Some(record),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
