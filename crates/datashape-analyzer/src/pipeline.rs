use std::sync::Arc;

use datashape_core::{IdGenerator, Language};
use datashape_parser::{pattern_language, CompiledRule, EntityArena, Node, PatternLanguage, SourceTree};
use datashape_reports::{Detection, SourceLocation};

use crate::custom::CustomDetector;
use crate::discovery::discover;
use crate::error::AnalyzerError;
use crate::export::export_entities;
use crate::extractor::extract;
use crate::matcher::RuleMatcher;
use crate::reconcile::reconcile;
use crate::scope::{scope_entities, ScopeMap};

/// Runs discovery, unification and every custom rule over one file.
///
/// Compiled rules are shared read-only; all entity and scope state lives for
/// one call only.
#[derive(Debug, Clone)]
pub struct FileScanner {
    detector: Arc<CustomDetector>,
}

impl FileScanner {
    pub fn new(detector: Arc<CustomDetector>) -> Self {
        Self { detector }
    }

    /// Scan one file. A custom rule failing on this file is logged and skipped;
    /// the other rules still run.
    pub fn scan_source(
        &self,
        language: Language,
        filename: &str,
        source: &str,
        ids: &mut dyn IdGenerator,
    ) -> Result<Vec<Detection>, AnalyzerError> {
        let lang = pattern_language(language).ok_or(AnalyzerError::UnsupportedLanguage(language))?;
        let tree = SourceTree::parse(language, source)?;
        let terminators = lang.scope_terminators();

        let mut arena = EntityArena::new();
        let discovered = discover(&tree, &mut arena);
        let roots = arena.prune_roots(discovered);
        let scopes = scope_entities(&mut arena, &roots, ids, terminators);

        let mut detections: Vec<Detection> = export_entities(&mut arena, &roots, ids, filename)
            .into_iter()
            .map(|exported| Detection::Schema {
                detector: language.id().to_string(),
                location: exported.location,
                record: exported.record,
            })
            .collect();

        let context = RuleRun {
            lang,
            tree: &tree,
            scopes: &scopes,
            filename,
        };
        for rule in self.detector.rules_for(language) {
            match context.run(rule, &mut arena, ids) {
                Ok(found) => detections.extend(found),
                Err(e) => log::warn!("{}: custom rule '{}' skipped: {}", filename, rule.name, e),
            }
        }

        log::debug!("{}: {} detections", filename, detections.len());
        Ok(detections)
    }
}

struct RuleRun<'a, 't> {
    lang: &'a dyn PatternLanguage,
    tree: &'t SourceTree,
    scopes: &'a ScopeMap<'t>,
    filename: &'a str,
}

impl<'t> RuleRun<'_, 't> {
    fn run(
        &self,
        rule: &CompiledRule,
        arena: &mut EntityArena<'t>,
        ids: &mut dyn IdGenerator,
    ) -> Result<Vec<Detection>, AnalyzerError> {
        let matcher = RuleMatcher::new(rule)?;
        let mut detections = Vec::new();

        for captures in matcher.matches(self.tree) {
            log::debug!("{}: rule {} matched", self.filename, rule.name);

            if rule.detect_presence {
                let Some(node) = captures.rule_node() else {
                    continue;
                };
                detections.push(Detection::Presence {
                    rule: rule.name.clone(),
                    location: location(self.filename, node),
                    content: (!rule.omit_parent).then(|| self.tree.content(node).to_string()),
                });
                continue;
            }

            let extracted = extract(&matcher, self.lang, &captures, self.tree, arena);
            let fresh = arena.prune_roots(extracted);
            reconcile(arena, &fresh, self.scopes, self.lang.scope_terminators());

            detections.extend(
                export_entities(arena, &fresh, ids, self.filename)
                    .into_iter()
                    .map(|exported| Detection::CustomSchema {
                        rule: rule.name.clone(),
                        location: exported.location,
                        record: exported.record,
                    }),
            );
        }

        Ok(detections)
    }
}

fn location(filename: &str, node: Node<'_>) -> SourceLocation {
    let start = node.start_position();
    let end = node.end_position();
    SourceLocation::from_points(filename, (start.row, start.column), (end.row, end.column))
}
