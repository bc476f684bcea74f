use std::collections::HashSet;

use datashape_core::SimpleType;
use datashape_parser::{strip_quotes, CaptureSet, Entity, EntityArena, EntityId, ParamKind, PatternLanguage, SourceTree};

use crate::matcher::RuleMatcher;

/// Turn one surviving capture set into root entities, visiting params in
/// declared order.
///
/// With parenting, the first extraction that yields a single entity becomes
/// the parent (unwrapped to its deepest single-property descendant) and every
/// later extraction is nested under it instead of being exported.
pub fn extract<'t>(
    matcher: &RuleMatcher<'_>,
    lang: &dyn PatternLanguage,
    captures: &CaptureSet<'t>,
    tree: &'t SourceTree,
    arena: &mut EntityArena<'t>,
) -> Vec<EntityId> {
    let rule = matcher.rule();
    let mut exports: Vec<EntityId> = Vec::new();
    let mut parent: Option<EntityId> = None;

    for param in &rule.params {
        let Some(node) = captures.get(&param.capture_name) else {
            continue;
        };

        let extracted = match param.kind {
            ParamKind::Arguments | ParamKind::ClassName => lang.extract_arguments(node, tree, arena),
            ParamKind::StringExtract => {
                let text = strip_quotes(tree.content(node));
                let mut leaves = Vec::new();
                for (metavar, regex) in matcher.metavars_for(&param.pattern_name) {
                    for found in regex.captures_iter(text) {
                        if let Some(group) = found.get(metavar.output) {
                            let leaf = Entity::new(node, group.as_str()).with_type(SimpleType::Unknown, "");
                            leaves.push(arena.alloc(leaf));
                        }
                    }
                }
                leaves
            }
            ParamKind::Capture => continue,
        };

        if !rule.param_parenting {
            exports.extend(extracted);
            continue;
        }

        match parent {
            Some(parent) => {
                arena[parent].simple_type = SimpleType::Object;
                for child in extracted {
                    arena.add_property(parent, child);
                }
            }
            None if extracted.len() == 1 && param.kind != ParamKind::StringExtract => {
                parent = Some(arena.deepest_single_child(extracted[0]));
                exports.push(extracted[0]);
            }
            None => exports.extend(extracted),
        }
    }

    let mut seen = HashSet::new();
    exports.retain(|id| {
        let entity = &arena[*id];
        seen.insert((entity.node.id(), entity.name.clone()))
    });
    exports
}
