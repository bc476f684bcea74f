use std::collections::BTreeMap;

use datashape_core::{Language, RuleSet, SequentialIdGenerator};
use datashape_parser::{pattern_language, CompiledRule, PatternError};

use crate::error::RuleCompileError;

/// Compiled custom rules, grouped by language. Read-only once built and shared
/// across file workers.
#[derive(Debug, Default)]
pub struct CustomDetector {
    rules: BTreeMap<Language, Vec<CompiledRule>>,
}

impl CustomDetector {
    /// Compile every enabled rule for each of its languages.
    ///
    /// Each (rule, language, pattern) compiles on its own: a failure is
    /// returned and logged here, and does not affect other rules or patterns.
    pub fn compile(rules: &RuleSet) -> (Self, Vec<RuleCompileError>) {
        let mut detector = Self::default();
        let mut errors = Vec::new();
        // Placeholder ids only need to be unique, one counter keeps them reproducible.
        let mut ids = SequentialIdGenerator::new();

        for (name, rule) in rules.iter() {
            if rule.disabled {
                log::debug!("skipping disabled rule {}", name);
                continue;
            }

            for language_name in &rule.languages {
                let lang = language_name
                    .parse::<Language>()
                    .ok()
                    .and_then(pattern_language);
                let Some(lang) = lang else {
                    errors.push(RuleCompileError {
                        rule: name.to_string(),
                        language: language_name.clone(),
                        pattern: None,
                        source: PatternError::UnsupportedLanguage(language_name.clone()),
                    });
                    continue;
                };

                for pattern in &rule.patterns {
                    match lang.compile_pattern(name, rule, pattern, &mut ids) {
                        Ok(compiled) => detector.rules.entry(lang.language()).or_default().push(compiled),
                        Err(source) => errors.push(RuleCompileError {
                            rule: name.to_string(),
                            language: language_name.clone(),
                            pattern: Some(pattern.pattern.clone()),
                            source,
                        }),
                    }
                }
            }
        }

        for error in &errors {
            log::warn!("{}", error);
        }
        log::info!(
            "compiled {} custom rule patterns ({} failed)",
            detector.len(),
            errors.len()
        );

        (detector, errors)
    }

    #[must_use]
    pub fn rules_for(&self, language: Language) -> &[CompiledRule] {
        self.rules.get(&language).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompiledRule> {
        self.rules.values().flatten()
    }

    /// Number of compiled patterns across languages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES: &str = r#"
stripe_client:
  languages: [ruby, javascript]
  patterns:
    - "$CLASS_NAME.new(<$ARGUMENT>)"
broken_pattern:
  languages: [ruby]
  patterns:
    - "foo(<$ARGUMENT>"
    - "logger.info(<$ARGUMENT>)"
disabled_rule:
  disabled: true
  languages: [ruby]
  patterns:
    - "foo(<$ARGUMENT>)"
unknown_language:
  languages: [cobol]
  patterns:
    - "DISPLAY"
"#;

    #[test]
    fn test_compile_isolates_failures() {
        let rules = RuleSet::from_yaml(RULES).unwrap();
        let (detector, errors) = CustomDetector::compile(&rules);

        let ruby: Vec<&str> = detector
            .rules_for(Language::Ruby)
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(ruby, vec!["broken_pattern", "stripe_client"]);
        assert_eq!(detector.rules_for(Language::JavaScript).len(), 1);
        assert_eq!(detector.len(), 3);

        let failed: Vec<(&str, &str)> = errors
            .iter()
            .map(|e| (e.rule.as_str(), e.language.as_str()))
            .collect();
        assert_eq!(failed, vec![("broken_pattern", "ruby"), ("unknown_language", "cobol")]);
        assert!(matches!(errors[0].source, PatternError::Syntax { .. }));
        assert!(matches!(errors[1].source, PatternError::UnsupportedLanguage(_)));
    }

    #[test]
    fn test_capture_names_unique_across_rules() {
        let rules = RuleSet::from_yaml(RULES).unwrap();
        let (detector, _) = CustomDetector::compile(&rules);

        let mut names: Vec<&str> = detector
            .iter()
            .flat_map(|rule| rule.params.iter().map(|p| p.capture_name.as_str()))
            .collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[test]
    fn test_empty_rule_set() {
        let (detector, errors) = CustomDetector::compile(&RuleSet::new());
        assert!(detector.is_empty());
        assert!(errors.is_empty());
        assert!(detector.rules_for(Language::Ruby).is_empty());
    }
}
