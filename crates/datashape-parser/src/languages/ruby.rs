use datashape_core::{Language, SimpleType};
use tree_sitter::Node;

use super::{
    classify_argument_wrapper, classify_placeholder, named_children, Chain, NodeClass, PatternLanguage,
};
use crate::entity::{Entity, EntityArena, EntityId};
use crate::pattern::substitution::{Placeholder, PlaceholderKind, TokenRule, TokenShape};
use crate::tree::{strip_quotes, SourceTree};

/// Ruby pattern extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ruby;

const TOKENS: &[TokenRule] = &[
    TokenRule {
        shape: TokenShape::Literal("<$ARGUMENT>"),
        kind: PlaceholderKind::Arguments,
        prefix: "dsvar_argument_",
    },
    TokenRule {
        shape: TokenShape::Literal("$CLASS_NAME"),
        kind: PlaceholderKind::ClassName,
        prefix: "DsvarClassName",
    },
    TokenRule {
        shape: TokenShape::Literal("$ANYTHING"),
        kind: PlaceholderKind::Anything,
        prefix: "dsvar_anything_",
    },
    // Constants parse as receivers, method names, arguments and scope names alike.
    TokenRule {
        shape: TokenShape::NamedVariable,
        kind: PlaceholderKind::Variable,
        prefix: "DsvarVar",
    },
];

const SCOPE_TERMINATORS: &[&str] = &[
    "program",
    "class",
    "module",
    "method",
    "singleton_method",
    "block",
    "do_block",
    "lambda",
];

const CLASS_TYPES: &[&str] = &["constant", "scope_resolution"];

impl PatternLanguage for Ruby {
    fn language(&self) -> Language {
        Language::Ruby
    }

    fn tokens(&self) -> &'static [TokenRule] {
        TOKENS
    }

    fn pattern_root<'t>(&self, root: Node<'t>) -> Node<'t> {
        if root.kind() == "program" {
            if let [single] = named_children(root).as_slice() {
                return *single;
            }
        }
        root
    }

    fn classify(&self, node: Node<'_>, source: &str, placeholders: &[Placeholder]) -> NodeClass {
        let class = match node.kind() {
            "argument_list" => classify_argument_wrapper(node, source, placeholders),
            "constant" => classify_placeholder(node, source, placeholders, CLASS_TYPES),
            kind @ "identifier" => classify_placeholder(node, source, placeholders, &[kind]),
            _ => None,
        };
        class.unwrap_or(NodeClass::Context)
    }

    fn argument_wrapper(&self) -> &'static str {
        "argument_list"
    }

    fn extract_arguments<'t>(
        &self,
        node: Node<'t>,
        tree: &'t SourceTree,
        arena: &mut EntityArena<'t>,
    ) -> Vec<EntityId> {
        let items = if node.kind() == self.argument_wrapper() {
            named_children(node)
        } else {
            vec![node]
        };

        items
            .into_iter()
            .flat_map(|item| extract_item(item, tree, arena))
            .collect()
    }

    fn scope_terminators(&self) -> &'static [&'static str] {
        SCOPE_TERMINATORS
    }
}

impl Ruby {
    /// Name of a variable without its sigil (`@user`, `@@count`, `$stdout`).
    #[must_use]
    pub fn variable_name(text: &str) -> &str {
        text.trim_start_matches(['@', '$'])
    }

    /// Split a receiver chain (`user.address.city`, `params[:user][:email]`)
    /// into its root and accessed names. Calls with arguments or blocks are not
    /// data access and yield `None`.
    pub fn chain<'t>(node: Node<'t>, tree: &'t SourceTree) -> Option<Chain<'t>> {
        let mut links = Vec::new();
        let mut current = node;

        loop {
            match current.kind() {
                "call" => {
                    if current.child_by_field_name("arguments").is_some()
                        || current.child_by_field_name("block").is_some()
                    {
                        return None;
                    }
                    let method = current.child_by_field_name("method")?;
                    if !matches!(method.kind(), "identifier" | "constant") {
                        return None;
                    }
                    links.push((method, tree.content(method).to_string()));
                    current = current.child_by_field_name("receiver")?;
                }
                "element_reference" => {
                    let object = current.child_by_field_name("object")?;
                    let key = named_children(current)
                        .into_iter()
                        .find(|child| child.id() != object.id())?;
                    links.push((key, key_name(key, tree)?));
                    current = object;
                }
                "identifier" | "constant" | "instance_variable" | "class_variable"
                | "global_variable" | "self" => break,
                _ => return None,
            }
        }

        if links.is_empty() {
            return None;
        }
        links.reverse();

        Some(Chain {
            root: current,
            root_name: Ruby::variable_name(tree.content(current)).to_string(),
            links,
        })
    }

    /// Object entity for a hash literal, named by the caller.
    pub fn hash_entity<'t>(
        hash: Node<'t>,
        name: &str,
        tree: &'t SourceTree,
        arena: &mut EntityArena<'t>,
    ) -> EntityId {
        let id = arena.alloc(Entity::new(hash, name).with_type(SimpleType::Object, "hash"));
        for pair in named_children(hash) {
            if let Some(child) = pair_entity(pair, tree, arena) {
                arena.add_property(id, child);
            }
        }
        id
    }
}

/// Name of a hash key or index: `email:`, `:email`, `"email"`.
fn key_name(key: Node<'_>, tree: &SourceTree) -> Option<String> {
    let text = tree.content(key);
    match key.kind() {
        "hash_key_symbol" | "identifier" | "constant" => Some(text.to_string()),
        "simple_symbol" => Some(text.trim_start_matches(':').to_string()),
        "string" => Some(strip_quotes(text).to_string()),
        _ => None,
    }
}

fn extract_item<'t>(item: Node<'t>, tree: &'t SourceTree, arena: &mut EntityArena<'t>) -> Vec<EntityId> {
    match item.kind() {
        "identifier" | "constant" | "scope_resolution" | "instance_variable" | "class_variable"
        | "global_variable" => {
            let name = Ruby::variable_name(tree.content(item));
            vec![arena.alloc(Entity::new(item, name))]
        }
        "simple_symbol" => {
            let name = tree.content(item).trim_start_matches(':');
            vec![arena.alloc(Entity::new(item, name))]
        }
        "call" | "element_reference" => Ruby::chain(item, tree)
            .map(|chain| chain.build(arena))
            .into_iter()
            .collect(),
        "hash" => named_children(item)
            .into_iter()
            .filter_map(|pair| pair_entity(pair, tree, arena))
            .collect(),
        "pair" => pair_entity(item, tree, arena).into_iter().collect(),
        "splat_argument" | "hash_splat_argument" | "block_argument" | "parenthesized_statements" => {
            named_children(item)
                .into_iter()
                .flat_map(|child| extract_item(child, tree, arena))
                .collect()
        }
        _ => Vec::new(),
    }
}

/// Entity for `key => value`, with nested hash values as properties.
pub(crate) fn pair_entity<'t>(
    pair: Node<'t>,
    tree: &'t SourceTree,
    arena: &mut EntityArena<'t>,
) -> Option<EntityId> {
    if pair.kind() != "pair" {
        return None;
    }
    let key = pair.child_by_field_name("key")?;
    let id = arena.alloc(Entity::new(key, key_name(key, tree)?));

    let Some(value) = pair.child_by_field_name("value") else {
        return Some(id);
    };
    if value.kind() == "hash" {
        arena[id].simple_type = SimpleType::Object;
        for nested in named_children(value) {
            if let Some(child) = pair_entity(nested, tree, arena) {
                arena.add_property(id, child);
            }
        }
    }

    Some(id)
}
