use datashape_core::Language;

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("No grammar available for {0}")]
    UnsupportedLanguage(Language),

    #[error("Failed to load {language} grammar: {source}")]
    Grammar {
        language: Language,
        #[source]
        source: tree_sitter::LanguageError,
    },

    #[error("Failed to parse {0} source")]
    Failed(Language),
}

/// Errors raised while compiling a rule pattern. Each one drops a single
/// (rule, language, pattern) combination and nothing else.
#[derive(thiserror::Error, Debug)]
pub enum PatternError {
    #[error("No pattern support for language '{0}'")]
    UnsupportedLanguage(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Syntax error in pattern at {line}:{column} near `{snippet}`")]
    Syntax {
        line: usize,
        column: usize,
        snippet: String,
    },

    #[error("Pattern `{0}` has nothing left to match after ignoring placeholders")]
    Empty(String),

    #[error("Undefined variable '{variable}' in filter for custom rule '{rule}'")]
    UndefinedVariable { variable: String, rule: String },

    #[error("Generated query is invalid: {source}\n{query}")]
    Query {
        query: String,
        #[source]
        source: tree_sitter::QueryError,
    },
}
