//! Custom rule pattern compilation.
//!
//! A pattern goes through three steps, once per (rule, language):
//! - placeholder substitution into parseable guest-language text
//! - parsing with the guest grammar (any syntax error fails the compile)
//! - query generation, producing the tree-sitter query and its params

mod generator;
pub mod substitution;

use std::collections::BTreeMap;

use datashape_core::{IdGenerator, Language, MetaVar, PatternFilter, Rule, RulePattern};
use tree_sitter::Query;

use crate::error::PatternError;
use crate::languages::PatternLanguage;
use crate::tree::{grammar, SourceTree, RULE_CAPTURE};
use substitution::substitute;

/// What the extractor does with a param's capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Convert the captured argument list into entities.
    Arguments,
    /// Convert the captured class reference into an entity.
    ClassName,
    /// Run metavar regexes over the captured text.
    StringExtract,
    /// Constrain the match only.
    Capture,
}

/// One capture produced by a compiled query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub capture_name: String,
    /// Logical name (`CLASS_NAME`, `ARGUMENT` or the variable name).
    pub pattern_name: String,
    pub string_match: Option<String>,
    pub regex_match: Option<String>,
    pub kind: ParamKind,
}

/// A rule pattern compiled for one language. Immutable and shareable across
/// threads once built.
pub struct CompiledRule {
    pub name: String,
    pub language: Language,
    pub pattern: String,
    pub query_text: String,
    query: Query,
    pub params: Vec<Param>,
    /// Literal for every `helper_*` capture of the query.
    pub anchors: BTreeMap<String, String>,
    pub filters: Vec<PatternFilter>,
    pub metavars: BTreeMap<String, MetaVar>,
    pub param_parenting: bool,
    pub detect_presence: bool,
    pub omit_parent: bool,
}

impl CompiledRule {
    #[must_use]
    pub fn query(&self) -> &Query {
        &self.query
    }

    #[must_use]
    pub fn param(&self, pattern_name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.pattern_name == pattern_name)
    }
}

impl std::fmt::Debug for CompiledRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledRule")
            .field("name", &self.name)
            .field("language", &self.language)
            .field("pattern", &self.pattern)
            .field("query_text", &self.query_text)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Compile one pattern of a rule for `lang`.
///
/// `ids` supplies the placeholder ids; sharing one generator across all
/// patterns keeps capture names distinct between rules too.
pub fn compile_pattern<L>(
    lang: &L,
    rule_name: &str,
    rule: &Rule,
    pattern: &RulePattern,
    ids: &mut dyn IdGenerator,
) -> Result<CompiledRule, PatternError>
where
    L: PatternLanguage + ?Sized,
{
    let substitution = substitute(&pattern.pattern, lang.tokens(), ids);
    let tree = SourceTree::parse(lang.language(), substitution.text.as_str())?;

    if let Some(error) = tree.first_error() {
        let point = error.start_position();
        return Err(PatternError::Syntax {
            line: point.row + 1,
            column: point.column + 1,
            snippet: pattern.pattern.clone(),
        });
    }

    let root = lang.pattern_root(tree.root_node());
    let fragment = generator::generate(lang, root, &tree, &substitution.placeholders)?
        .filter(|fragment| !fragment.text.is_empty() && fragment.text != generator::WILDCARD)
        .ok_or_else(|| PatternError::Empty(pattern.pattern.clone()))?;

    let mut params = fragment.params;

    for filter in &pattern.filters {
        let param = params
            .iter_mut()
            .find(|p| p.pattern_name == filter.variable)
            .ok_or_else(|| PatternError::UndefinedVariable {
                variable: filter.variable.clone(),
                rule: rule_name.to_string(),
            })?;
        if filter.regex.is_some() {
            param.regex_match = filter.regex.clone();
        }
    }

    for metavar in rule.metavars.values() {
        for param in params.iter_mut() {
            if param.pattern_name == metavar.input && param.kind == ParamKind::Capture {
                param.kind = ParamKind::StringExtract;
            }
        }
    }

    let query_text = format!("{} @{}", fragment.text, RULE_CAPTURE);
    let language = grammar(lang.language())
        .ok_or_else(|| PatternError::UnsupportedLanguage(lang.language().id().to_string()))?;
    let query = Query::new(&language, &query_text).map_err(|source| PatternError::Query {
        query: query_text.clone(),
        source,
    })?;

    log::debug!("compiled `{}` for {}: {}", pattern.pattern, lang.language(), query_text);

    Ok(CompiledRule {
        name: rule_name.to_string(),
        language: lang.language(),
        pattern: pattern.pattern.clone(),
        query_text,
        query,
        params,
        anchors: fragment.anchors.into_iter().collect(),
        filters: pattern.filters.clone(),
        metavars: rule.metavars.clone(),
        param_parenting: rule.param_parenting,
        detect_presence: rule.detect_presence,
        omit_parent: rule.omit_parent,
    })
}
