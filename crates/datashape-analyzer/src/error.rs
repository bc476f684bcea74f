use datashape_core::Language;
use datashape_parser::{ParseError, PatternError};

#[derive(thiserror::Error, Debug)]
pub enum AnalyzerError {
    #[error("Invalid regex `{pattern}` in custom rule '{rule}': {source}")]
    InvalidRegex {
        rule: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("No pattern support for {0}")]
    UnsupportedLanguage(Language),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// A (rule, language, pattern) triple that failed to compile. Reported once at
/// load time; the rule contributes nothing for that pattern afterwards.
#[derive(thiserror::Error, Debug)]
#[error("custom rule '{rule}' ({language}): {source}")]
pub struct RuleCompileError {
    pub rule: String,
    pub language: String,
    pub pattern: Option<String>,
    #[source]
    pub source: PatternError,
}
