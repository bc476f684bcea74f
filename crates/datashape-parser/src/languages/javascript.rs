use datashape_core::{Language, SimpleType};
use tree_sitter::Node;

use super::{
    classify_argument_wrapper, classify_placeholder, named_children, Chain, NodeClass, PatternLanguage,
};
use crate::entity::{Entity, EntityArena, EntityId};
use crate::pattern::substitution::{Placeholder, PlaceholderKind, TokenRule, TokenShape};
use crate::tree::{strip_quotes, SourceTree};

/// JavaScript pattern extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaScript;

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
    TokenRule {
        shape: TokenShape::NamedVariable,
        kind: PlaceholderKind::Variable,
        prefix: "dsvar_var_",
    },
];

const SCOPE_TERMINATORS: &[&str] = &[
    "program",
    "function_declaration",
    "function_expression",
    "generator_function_declaration",
    "arrow_function",
    "method_definition",
    "class_declaration",
];

const CLASS_TYPES: &[&str] = &["identifier", "member_expression"];

impl PatternLanguage for JavaScript {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn tokens(&self) -> &'static [TokenRule] {
        TOKENS
    }

    fn pattern_root<'t>(&self, root: Node<'t>) -> Node<'t> {
        let mut node = root;
        while matches!(node.kind(), "program" | "expression_statement") {
            match named_children(node).as_slice() {
                [single] => node = *single,
                _ => break,
            }
        }
        node
    }

    fn classify(&self, node: Node<'_>, source: &str, placeholders: &[Placeholder]) -> NodeClass {
        let class = match node.kind() {
            "arguments" => classify_argument_wrapper(node, source, placeholders),
            "identifier" => classify_placeholder(node, source, placeholders, CLASS_TYPES),
            kind @ ("property_identifier" | "shorthand_property_identifier") => {
                classify_placeholder(node, source, placeholders, &[kind])
            }
            _ => None,
        };
        class.unwrap_or(NodeClass::Context)
    }

    fn argument_wrapper(&self) -> &'static str {
        "arguments"
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

impl JavaScript {
    /// Split a member chain (`user.address.city`, `req.body["email"]`) into its
    /// root and accessed names. Computed indexes other than string literals and
    /// calls anywhere in the chain yield `None`.
    pub fn chain<'t>(node: Node<'t>, tree: &'t SourceTree) -> Option<Chain<'t>> {
        let mut links = Vec::new();
        let mut current = node;

        loop {
            match current.kind() {
                "member_expression" => {
                    let property = current.child_by_field_name("property")?;
                    links.push((property, tree.content(property).trim_start_matches('#').to_string()));
                    current = current.child_by_field_name("object")?;
                }
                "subscript_expression" => {
                    let index = current.child_by_field_name("index")?;
                    if index.kind() != "string" {
                        return None;
                    }
                    links.push((index, strip_quotes(tree.content(index)).to_string()));
                    current = current.child_by_field_name("object")?;
                }
                "parenthesized_expression" => {
                    current = *named_children(current).first()?;
                }
                "identifier" | "this" => break,
                _ => return None,
            }
        }

        if links.is_empty() {
            return None;
        }
        links.reverse();

        Some(Chain {
            root: current,
            root_name: tree.content(current).to_string(),
            links,
        })
    }

    /// Object entity for an object literal, named by the caller.
    pub fn object_entity<'t>(
        object: Node<'t>,
        name: &str,
        tree: &'t SourceTree,
        arena: &mut EntityArena<'t>,
    ) -> EntityId {
        let id = arena.alloc(Entity::new(object, name).with_type(SimpleType::Object, "object"));
        for child in JavaScript::object_members(object, tree, arena) {
            arena.add_property(id, child);
        }
        id
    }

    /// Entities for the members of an object literal, in source order.
    pub fn object_members<'t>(object: Node<'t>, tree: &'t SourceTree, arena: &mut EntityArena<'t>) -> Vec<EntityId> {
        named_children(object)
            .into_iter()
            .filter_map(|member| member_entity(member, tree, arena))
            .collect()
    }
}

fn extract_item<'t>(item: Node<'t>, tree: &'t SourceTree, arena: &mut EntityArena<'t>) -> Vec<EntityId> {
    match item.kind() {
        "identifier" => vec![arena.alloc(Entity::new(item, tree.content(item)))],
        "member_expression" | "subscript_expression" => JavaScript::chain(item, tree)
            .map(|chain| chain.build(arena))
            .into_iter()
            .collect(),
        "object" => JavaScript::object_members(item, tree, arena),
        "spread_element" | "parenthesized_expression" => named_children(item)
            .into_iter()
            .flat_map(|child| extract_item(child, tree, arena))
            .collect(),
        _ => Vec::new(),
    }
}

/// Entity for one member of an object literal.
fn member_entity<'t>(member: Node<'t>, tree: &'t SourceTree, arena: &mut EntityArena<'t>) -> Option<EntityId> {
    match member.kind() {
        "shorthand_property_identifier" => Some(arena.alloc(Entity::new(member, tree.content(member)))),
        "pair" => {
            let key = member.child_by_field_name("key")?;
            let name = match key.kind() {
                "property_identifier" | "number" => tree.content(key),
                "string" => strip_quotes(tree.content(key)),
                _ => return None,
            };
            let id = arena.alloc(Entity::new(key, name));

            let value = member.child_by_field_name("value")?;
            if value.kind() == "object" {
                arena[id].simple_type = SimpleType::Object;
                for nested in named_children(value) {
                    if let Some(child) = member_entity(nested, tree, arena) {
                        arena.add_property(id, child);
                    }
                }
            }
            Some(id)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_of_kind<'t>(tree: &'t SourceTree, kind: &str) -> Node<'t> {
        let mut found = None;
        tree.for_each_node(|node| {
            if found.is_none() && node.kind() == kind {
                found = Some(node);
            }
        });
        found.unwrap()
    }

    fn names(arena: &EntityArena<'_>, ids: &[EntityId]) -> Vec<String> {
        ids.iter().map(|id| arena[*id].name.clone()).collect()
    }

    #[test]
    fn test_extract_arguments() {
        let tree = SourceTree::parse(
            Language::JavaScript,
            "track(user, { email: a, address: { city: b }, phone }, account.owner.name, ...rest);",
        )
        .unwrap();
        let arguments = first_of_kind(&tree, "arguments");
        let mut arena = EntityArena::new();

        let ids = JavaScript.extract_arguments(arguments, &tree, &mut arena);
        assert_eq!(
            names(&arena, &ids),
            vec!["user", "email", "address", "phone", "account", "rest"]
        );

        let address = ids[2];
        assert_eq!(arena[address].simple_type, SimpleType::Object);
        assert!(arena.property(address, "city").is_some());

        let owner = arena.property(ids[4], "owner").unwrap();
        assert!(arena.property(owner, "name").is_some());
    }

    #[test]
    fn test_chain_with_string_subscript() {
        let tree = SourceTree::parse(Language::JavaScript, "req.body[\"email\"];").unwrap();
        let subscript = first_of_kind(&tree, "subscript_expression");
        let chain = JavaScript::chain(subscript, &tree).unwrap();

        assert_eq!(chain.root_name, "req");
        let links: Vec<&str> = chain.links.iter().map(|(_, name)| name.as_str()).collect();
        assert_eq!(links, vec!["body", "email"]);
    }

    #[test]
    fn test_chain_rejects_computed_index_and_calls() {
        let tree = SourceTree::parse(Language::JavaScript, "users[i].name;").unwrap();
        let member = first_of_kind(&tree, "member_expression");
        assert!(JavaScript::chain(member, &tree).is_none());

        let tree = SourceTree::parse(Language::JavaScript, "load().name;").unwrap();
        let member = first_of_kind(&tree, "member_expression");
        assert!(JavaScript::chain(member, &tree).is_none());
    }

    #[test]
    fn test_chain_from_this() {
        let tree = SourceTree::parse(Language::JavaScript, "this.email;").unwrap();
        let member = first_of_kind(&tree, "member_expression");
        let chain = JavaScript::chain(member, &tree).unwrap();
        assert_eq!(chain.root.kind(), "this");
        assert_eq!(chain.root_name, "this");
    }

    #[test]
    fn test_object_entity() {
        let tree = SourceTree::parse(Language::JavaScript, "const user = { \"email\": a, profile: { name: b } };").unwrap();
        let object = first_of_kind(&tree, "object");
        let mut arena = EntityArena::new();

        let user = JavaScript::object_entity(object, "user", &tree, &mut arena);
        assert_eq!(arena[user].simple_type, SimpleType::Object);
        assert!(arena.property(user, "email").is_some());
        let profile = arena.property(user, "profile").unwrap();
        assert!(arena.property(profile, "name").is_some());
    }

    #[test]
    fn test_pattern_root_unwraps_statement() {
        let tree = SourceTree::parse(Language::JavaScript, "fetch(url);").unwrap();
        assert_eq!(JavaScript.pattern_root(tree.root_node()).kind(), "call_expression");
    }
}
