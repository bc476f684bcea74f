//! Entity kinds.

use serde::{Deserialize, Serialize};

/// The closed set of kinds an entity can be classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimpleType {
    Object,
    Number,
    String,
    Boolean,
    Binary,
    Date,
    Function,
    #[default]
    Unknown,
}

impl SimpleType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SimpleType::Object => "object",
            SimpleType::Number => "number",
            SimpleType::String => "string",
            SimpleType::Boolean => "boolean",
            SimpleType::Binary => "binary",
            SimpleType::Date => "date",
            SimpleType::Function => "function",
            SimpleType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for SimpleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unknown() {
        assert_eq!(SimpleType::default(), SimpleType::Unknown);
    }

    #[test]
    fn test_serialized_name_matches_display() {
        for kind in [SimpleType::Object, SimpleType::Function, SimpleType::Date] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind));
        }
    }
}
