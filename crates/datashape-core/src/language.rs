//! Guest language definitions.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Guest languages understood by the pattern compiler and discovery passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Ruby,
    JavaScript,
    Other,
}

impl Language {
    /// Every language with a pattern extension, in a stable order.
    pub const SUPPORTED: &'static [Language] = &[Language::Ruby, Language::JavaScript];

    /// Create a Language from a file extension.
    #[must_use]
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "rb" | "rake" | "gemspec" => Language::Ruby,
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            _ => Language::Other,
        }
    }

    /// Create a Language from a filename.
    #[must_use]
    pub fn from_filename(filename: &str) -> Self {
        let path = std::path::Path::new(filename);
        if path.file_name().and_then(|n| n.to_str()) == Some("Rakefile") {
            return Language::Ruby;
        }
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            Self::from_extension(ext)
        } else {
            Language::Other
        }
    }

    /// File extensions that map to this language.
    #[must_use]
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Ruby => &["rb", "rake", "gemspec"],
            Language::JavaScript => &["js", "jsx", "mjs", "cjs"],
            Language::Other => &[],
        }
    }

    /// Check if the language has a pattern extension.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        !matches!(self, Language::Other)
    }

    /// Get the display name for this language.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::Ruby => "Ruby",
            Language::JavaScript => "JavaScript",
            Language::Other => "Other",
        }
    }

    /// Lowercase identifier used in rule files and reports.
    #[must_use]
    pub fn id(&self) -> &'static str {
        match self {
            Language::Ruby => "ruby",
            Language::JavaScript => "javascript",
            Language::Other => "other",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s_lower = s.to_lowercase();
        match s_lower.as_str() {
            "ruby" | "rb" => Ok(Language::Ruby),
            "javascript" | "js" => Ok(Language::JavaScript),
            "other" => Ok(Language::Other),
            _ => Err(format!(
                "Unknown language: '{}'. Supported languages: ruby, javascript",
                s
            )),
        }
    }
}
