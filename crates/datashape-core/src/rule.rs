//! Custom rule source format.
//!
//! Rules are authored in YAML as a mapping from rule name to rule body:
//!
//! ```yaml
//! ruby_third_party_stripe:
//!   languages: [ruby]
//!   param_parenting: true
//!   patterns:
//!     - $CLASS_NAME.new(<$ARGUMENT>)
//!     - pattern: Stripe::$<METHOD>.create(<$ARGUMENT>)
//!       filters:
//!         - variable: METHOD
//!           values: [Charge, Customer]
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum RuleError {
    #[error("Failed to read rule file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid rule file {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// A single custom rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rule {
    pub disabled: bool,
    /// Language ids (`ruby`, `javascript`); unknown ids fail at compile time, per rule.
    pub languages: Vec<String>,
    pub patterns: Vec<RulePattern>,
    /// Nest extracted entities under the first extraction instead of exporting each one.
    pub param_parenting: bool,
    pub metavars: BTreeMap<String, MetaVar>,
    /// Report the match itself and skip entity extraction.
    pub detect_presence: bool,
    /// With `detect_presence`, report only the location of the match.
    pub omit_parent: bool,
}

/// A pattern string with optional per-variable filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawPattern")]
pub struct RulePattern {
    pub pattern: String,
    pub filters: Vec<PatternFilter>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPattern {
    Plain(String),
    Detailed {
        pattern: String,
        #[serde(default)]
        filters: Vec<PatternFilter>,
    },
}

impl From<RawPattern> for RulePattern {
    fn from(raw: RawPattern) -> Self {
        match raw {
            RawPattern::Plain(pattern) => Self {
                pattern,
                filters: Vec::new(),
            },
            RawPattern::Detailed { pattern, filters } => Self { pattern, filters },
        }
    }
}

impl RulePattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            filters: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: PatternFilter) -> Self {
        self.filters.push(filter);
        self
    }
}

/// Constraint on the text captured by a named variable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternFilter {
    pub variable: String,
    /// Allowed texts, compared with quotes stripped. Empty means unconstrained.
    pub values: Vec<String>,
    pub regex: Option<String>,
}

/// Regex extraction over the text captured by a named variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaVar {
    /// Name of the variable whose text is searched.
    pub input: String,
    /// Capture group index that becomes the entity name.
    pub output: usize,
    pub regex: String,
}

/// Rules keyed by name, in name order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    rules: BTreeMap<String, Rule>,
}

impl RuleSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, RuleError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| RuleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|source| RuleError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn insert(&mut self, name: impl Into<String>, rule: Rule) {
        self.rules.insert(name.into(), rule);
    }

    /// Merge another set into this one; rules in `other` replace same-named rules.
    pub fn merge(&mut self, other: RuleSet) {
        self.rules.extend(other.rules);
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rule)> {
        self.rules.iter().map(|(name, rule)| (name.as_str(), rule))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const RULES: &str = r#"
ruby_stripe:
  languages: [ruby]
  param_parenting: true
  patterns:
    - $CLASS_NAME.new(<$ARGUMENT>)
    - pattern: Stripe::$<METHOD>.create(<$ARGUMENT>)
      filters:
        - variable: METHOD
          values: [Charge, Customer]
ruby_http_get:
  languages: [ruby]
  detect_presence: true
  patterns:
    - Net::HTTP.get($<URL>)
  metavars:
    HOST:
      input: URL
      output: 1
      regex: 'https?://([^/]+)'
"#;

    #[test]
    fn test_parse_rules() {
        let rules = RuleSet::from_yaml(RULES).unwrap();
        assert_eq!(rules.len(), 2);

        let stripe = rules.get("ruby_stripe").unwrap();
        assert!(stripe.param_parenting);
        assert!(!stripe.disabled);
        assert_eq!(stripe.languages, vec!["ruby".to_string()]);
        assert_eq!(stripe.patterns.len(), 2);
        assert_eq!(stripe.patterns[0].pattern, "$CLASS_NAME.new(<$ARGUMENT>)");
        assert!(stripe.patterns[0].filters.is_empty());
        assert_eq!(stripe.patterns[1].filters[0].variable, "METHOD");
        assert_eq!(stripe.patterns[1].filters[0].values, vec!["Charge", "Customer"]);

        let http = rules.get("ruby_http_get").unwrap();
        assert!(http.detect_presence);
        let host = http.metavars.get("HOST").unwrap();
        assert_eq!(host.input, "URL");
        assert_eq!(host.output, 1);
    }

    #[test]
    fn test_empty_rules() {
        assert!(RuleSet::from_yaml("").unwrap().is_empty());
        assert!(RuleSet::from_yaml("  \n").unwrap().is_empty());
    }

    #[test]
    fn test_merge_replaces_same_name() {
        let mut base = RuleSet::from_yaml(RULES).unwrap();
        let mut other = RuleSet::new();
        other.insert(
            "ruby_stripe",
            Rule {
                disabled: true,
                ..Rule::default()
            },
        );
        base.merge(other);

        assert_eq!(base.len(), 2);
        assert!(base.get("ruby_stripe").unwrap().disabled);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", RULES).unwrap();
        let rules = RuleSet::load_from_file(file.path()).unwrap();
        assert_eq!(rules.iter().count(), 2);
    }

    #[test]
    fn test_load_invalid_file_reports_path() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "rule: [unclosed").unwrap();
        let err = RuleSet::load_from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid rule file"));
    }
}
