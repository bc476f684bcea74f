//! Per-language pattern extensions.
//!
//! Each guest language implements [`PatternLanguage`]: its placeholder
//! vocabulary, how rewritten pattern nodes are classified, how matched subtrees
//! become entities and which node types close a lexical scope.

mod javascript;
mod ruby;

use datashape_core::{IdGenerator, Language, Rule, RulePattern, SimpleType};
use tree_sitter::Node;

use crate::entity::{Entity, EntityArena, EntityId};
use crate::error::PatternError;
use crate::pattern::substitution::{find_placeholder, Placeholder, PlaceholderKind, TokenRule};
use crate::pattern::{compile_pattern, CompiledRule, ParamKind};
use crate::tree::SourceTree;

pub use javascript::JavaScript;
pub use ruby::Ruby;

/// How the query generator treats a node of the rewritten pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeClass {
    /// Structural context, emitted as is.
    Context,
    /// Emit nothing for this node or its subtree.
    Ignore,
    /// Require a named node here without capturing it.
    Wildcard,
    Param(ParamSpec),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub placeholder_id: String,
    pub pattern_name: String,
    pub kind: ParamKind,
    /// Accepted node types; empty accepts any named node.
    pub node_types: Vec<String>,
    pub string_match: Option<String>,
    /// Do not descend into the node's children.
    pub terminating: bool,
}

impl ParamSpec {
    fn terminating(placeholder: &Placeholder, kind: ParamKind, node_types: &[&str]) -> Self {
        Self {
            placeholder_id: placeholder.id.clone(),
            pattern_name: placeholder.name.clone(),
            kind,
            node_types: node_types.iter().map(|t| t.to_string()).collect(),
            string_match: placeholder.literal.clone(),
            terminating: true,
        }
    }
}

pub trait PatternLanguage: Send + Sync {
    fn language(&self) -> Language;

    /// Placeholder vocabulary, tried in order at each position.
    fn tokens(&self) -> &'static [TokenRule];

    /// Node of a parsed pattern that the query is generated from.
    fn pattern_root<'t>(&self, root: Node<'t>) -> Node<'t>;

    fn classify(&self, node: Node<'_>, source: &str, placeholders: &[Placeholder]) -> NodeClass;

    /// Node type wrapping a call's arguments.
    fn argument_wrapper(&self) -> &'static str;

    /// Convert a matched subtree into entities, in source order.
    fn extract_arguments<'t>(
        &self,
        node: Node<'t>,
        tree: &'t SourceTree,
        arena: &mut EntityArena<'t>,
    ) -> Vec<EntityId>;

    /// Node types that close a lexical scope.
    fn scope_terminators(&self) -> &'static [&'static str];

    fn compile_pattern(
        &self,
        rule_name: &str,
        rule: &Rule,
        pattern: &RulePattern,
        ids: &mut dyn IdGenerator,
    ) -> Result<CompiledRule, PatternError> {
        compile_pattern(self, rule_name, rule, pattern, ids)
    }
}

static RUBY: Ruby = Ruby;
static JAVASCRIPT: JavaScript = JavaScript;

/// Get the pattern extension for a language.
#[must_use]
pub fn pattern_language(language: Language) -> Option<&'static dyn PatternLanguage> {
    match language {
        Language::Ruby => Some(&RUBY),
        Language::JavaScript => Some(&JAVASCRIPT),
        Language::Other => None,
    }
}

fn node_text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or_default()
}

fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| !child.is_extra())
        .collect()
}

/// Classification shared by both languages for a node whose text may be a
/// placeholder. `class_types` applies when a class-name placeholder sits on a
/// node that can also be written as a qualified reference.
fn classify_placeholder(
    node: Node<'_>,
    source: &str,
    placeholders: &[Placeholder],
    class_types: &[&str],
) -> Option<NodeClass> {
    let placeholder = find_placeholder(placeholders, node_text(node, source))?;
    let class = match placeholder.kind {
        PlaceholderKind::Anything => NodeClass::Wildcard,
        PlaceholderKind::ClassName => {
            NodeClass::Param(ParamSpec::terminating(placeholder, ParamKind::ClassName, class_types))
        }
        PlaceholderKind::Arguments => {
            NodeClass::Param(ParamSpec::terminating(placeholder, ParamKind::Arguments, &[]))
        }
        PlaceholderKind::Variable => {
            NodeClass::Param(ParamSpec::terminating(placeholder, ParamKind::Capture, &[]))
        }
    };
    Some(class)
}

/// Classification of a call's argument wrapper: a lone argument placeholder
/// captures the whole wrapper, a wrapper of only match-anything placeholders
/// is dropped.
fn classify_argument_wrapper(node: Node<'_>, source: &str, placeholders: &[Placeholder]) -> Option<NodeClass> {
    let children = named_children(node);
    if children.is_empty() {
        return None;
    }

    let kinds: Vec<Option<PlaceholderKind>> = children
        .iter()
        .map(|child| find_placeholder(placeholders, node_text(*child, source)).map(|p| p.kind))
        .collect();

    if kinds.iter().all(|kind| *kind == Some(PlaceholderKind::Anything)) {
        return Some(NodeClass::Ignore);
    }

    if let [Some(PlaceholderKind::Arguments)] = kinds.as_slice() {
        let placeholder = find_placeholder(placeholders, node_text(children[0], source))?;
        return Some(NodeClass::Param(ParamSpec::terminating(
            placeholder,
            ParamKind::Arguments,
            &[node.kind()],
        )));
    }

    None
}

/// A property access chain such as `user.address.city` or `user[:email]`,
/// split into its root reference and the accessed names, root first.
#[derive(Debug, Clone)]
pub struct Chain<'t> {
    pub root: Node<'t>,
    pub root_name: String,
    pub links: Vec<(Node<'t>, String)>,
}

impl<'t> Chain<'t> {
    /// Allocate the root and nest every link under it.
    pub fn build(&self, arena: &mut EntityArena<'t>) -> EntityId {
        let root = arena.alloc(Entity::new(self.root, self.root_name.clone()));
        self.attach(arena, root);
        root
    }

    /// Nest the links under an existing entity, reusing same-named properties.
    /// Returns the entity of the last link.
    pub fn attach(&self, arena: &mut EntityArena<'t>, parent: EntityId) -> EntityId {
        let mut current = parent;
        for (node, name) in &self.links {
            arena[current].simple_type = SimpleType::Object;
            current = arena.add_child(current, Entity::new(*node, name.clone()));
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_language_lookup() {
        assert_eq!(pattern_language(Language::Ruby).unwrap().language(), Language::Ruby);
        assert_eq!(
            pattern_language(Language::JavaScript).unwrap().language(),
            Language::JavaScript
        );
        assert!(pattern_language(Language::Other).is_none());
    }

    #[test]
    fn test_every_supported_language_has_an_extension() {
        for language in Language::SUPPORTED {
            let lang = pattern_language(*language).unwrap();
            assert!(!lang.tokens().is_empty());
            assert!(lang.scope_terminators().contains(&"program"));
        }
    }
}
