use std::collections::BTreeMap;

use datashape_core::MetaVar;
use datashape_parser::{strip_quotes, CaptureSet, CompiledRule, SourceTree};
use regex::Regex;

use crate::error::AnalyzerError;

struct ParamCheck<'r> {
    capture_name: &'r str,
    string_match: Option<&'r str>,
    regex: Option<Regex>,
    values: Vec<&'r str>,
}

/// Runtime form of a compiled rule for one file: regexes are compiled once and
/// every capture set is checked against every declared constraint.
pub struct RuleMatcher<'r> {
    rule: &'r CompiledRule,
    checks: Vec<ParamCheck<'r>>,
    metavars: BTreeMap<&'r str, (&'r MetaVar, Regex)>,
}

impl<'r> RuleMatcher<'r> {
    /// Fails on the first malformed regex, which aborts the rule for this file.
    pub fn new(rule: &'r CompiledRule) -> Result<Self, AnalyzerError> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|source| AnalyzerError::InvalidRegex {
                rule: rule.name.clone(),
                pattern: pattern.to_string(),
                source,
            })
        };

        let mut checks = Vec::with_capacity(rule.params.len());
        for param in &rule.params {
            let values = rule
                .filters
                .iter()
                .filter(|filter| filter.variable == param.pattern_name)
                .flat_map(|filter| filter.values.iter().map(String::as_str))
                .collect();
            checks.push(ParamCheck {
                capture_name: &param.capture_name,
                string_match: param.string_match.as_deref(),
                regex: param.regex_match.as_deref().map(compile).transpose()?,
                values,
            });
        }

        let mut metavars = BTreeMap::new();
        for (name, metavar) in &rule.metavars {
            metavars.insert(name.as_str(), (metavar, compile(&metavar.regex)?));
        }

        Ok(Self {
            rule,
            checks,
            metavars,
        })
    }

    #[must_use]
    pub fn rule(&self) -> &'r CompiledRule {
        self.rule
    }

    /// Capture sets of every match that satisfies all constraints.
    pub fn matches<'t>(&self, tree: &'t SourceTree) -> Vec<CaptureSet<'t>> {
        tree.captures(self.rule.query(), &self.rule.anchors)
            .into_iter()
            .filter(|captures| self.accepts(captures, tree))
            .collect()
    }

    /// A capture set survives only if every param check passes.
    #[must_use]
    pub fn accepts(&self, captures: &CaptureSet<'_>, tree: &SourceTree) -> bool {
        self.checks.iter().all(|check| {
            let Some(node) = captures.get(check.capture_name) else {
                log::debug!("{}: capture {} missing", self.rule.name, check.capture_name);
                return false;
            };
            let text = strip_quotes(tree.content(node));

            check.string_match.is_none_or(|literal| literal == text)
                && check.regex.as_ref().is_none_or(|regex| regex.is_match(text))
                && (check.values.is_empty() || check.values.contains(&text))
        })
    }

    /// Metavars reading the named variable, with their compiled regexes.
    pub fn metavars_for<'a>(&'a self, variable: &'a str) -> impl Iterator<Item = (&'r MetaVar, &'a Regex)> + 'a {
        self.metavars
            .values()
            .filter(move |(metavar, _)| metavar.input == variable)
            .map(|(metavar, regex)| (*metavar, regex))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datashape_core::{Language, PatternFilter, Rule, RulePattern, SequentialIdGenerator};
    use datashape_parser::pattern_language;

    fn compile(language: Language, pattern: RulePattern, rule: &Rule) -> CompiledRule {
        let lang = pattern_language(language).unwrap();
        let mut ids = SequentialIdGenerator::new();
        lang.compile_pattern("test_rule", rule, &pattern, &mut ids).unwrap()
    }

    #[test]
    fn test_literal_anchor_rejects_other_methods() {
        let rule = compile(Language::Ruby, RulePattern::new("$CLASS_NAME.new(<$ARGUMENT>)"), &Rule::default());
        let tree = SourceTree::parse(Language::Ruby, "Stripe.new(api_key)\nStripe.build(api_key)\n").unwrap();

        let matcher = RuleMatcher::new(&rule).unwrap();
        let matches = matcher.matches(&tree);
        assert_eq!(matches.len(), 1);
        let class = matches[0].get(&rule.params[0].capture_name).unwrap();
        assert_eq!(tree.content(class), "Stripe");
    }

    #[test]
    fn test_values_filter_rejects_whole_match() {
        let pattern = RulePattern::new("$<CLIENT>.charge(<$ARGUMENT>)").with_filter(PatternFilter {
            variable: "CLIENT".to_string(),
            values: vec!["Stripe".to_string()],
            regex: None,
        });
        let rule = compile(Language::Ruby, pattern, &Rule::default());
        let tree = SourceTree::parse(Language::Ruby, "Stripe.charge(amount)\nPaypal.charge(amount)\n").unwrap();

        let matcher = RuleMatcher::new(&rule).unwrap();
        let matches = matcher.matches(&tree);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].rule_node().unwrap().start_position().row, 0);
    }

    #[test]
    fn test_regex_filter_on_quoted_text() {
        let pattern = RulePattern::new("fetch($<URL>)").with_filter(PatternFilter {
            variable: "URL".to_string(),
            values: Vec::new(),
            regex: Some("^https://api\\.".to_string()),
        });
        let rule = compile(Language::JavaScript, pattern, &Rule::default());
        let tree = SourceTree::parse(
            Language::JavaScript,
            "fetch(\"https://api.example.com\");\nfetch(\"http://other\");\n",
        )
        .unwrap();

        let matcher = RuleMatcher::new(&rule).unwrap();
        assert_eq!(matcher.matches(&tree).len(), 1);
    }

    #[test]
    fn test_values_filter_compares_string_contents() {
        let pattern = RulePattern::new("track($<EVENT>)").with_filter(PatternFilter {
            variable: "EVENT".to_string(),
            values: vec!["signup".to_string()],
            regex: None,
        });
        let rule = compile(Language::JavaScript, pattern, &Rule::default());
        let tree = SourceTree::parse(Language::JavaScript, "track(\"signup\");\ntrack('login');\n").unwrap();

        let matcher = RuleMatcher::new(&rule).unwrap();
        let matches = matcher.matches(&tree);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].rule_node().unwrap().start_position().row, 0);
    }

    #[test]
    fn test_inline_literal_filter() {
        let rule = compile(
            Language::Ruby,
            RulePattern::new("$<CLIENT:Stripe>.new(<$ARGUMENT>)"),
            &Rule::default(),
        );
        let tree = SourceTree::parse(Language::Ruby, "Stripe.new(key)\nBraintree.new(key)\n").unwrap();

        let matcher = RuleMatcher::new(&rule).unwrap();
        assert_eq!(matcher.matches(&tree).len(), 1);
    }

    #[test]
    fn test_invalid_regex_is_an_error() {
        let pattern = RulePattern::new("fetch($<URL>)").with_filter(PatternFilter {
            variable: "URL".to_string(),
            values: Vec::new(),
            regex: Some("(unclosed".to_string()),
        });
        let rule = compile(Language::JavaScript, pattern, &Rule::default());

        let err = RuleMatcher::new(&rule).err().unwrap();
        assert!(matches!(err, AnalyzerError::InvalidRegex { .. }));
    }
}
