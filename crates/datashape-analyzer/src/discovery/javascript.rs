use std::collections::HashMap;

use datashape_core::SimpleType;
use datashape_parser::languages::{Chain, JavaScript};
use datashape_parser::{Entity, EntityArena, EntityId, Node, SourceTree};

use super::{enclosing, is_field, named_children};

const CLASS_KINDS: &[&str] = &["class_declaration", "class"];

pub(super) fn discover<'t>(tree: &'t SourceTree, arena: &mut EntityArena<'t>) -> Vec<EntityId> {
    let mut nodes = Vec::new();
    tree.for_each_node(|node| nodes.push(node));

    let mut roots = Vec::new();
    let mut classes: HashMap<usize, EntityId> = HashMap::new();

    for node in nodes.iter().filter(|node| node.kind() == "class_declaration") {
        if let Some(class) = class_entity(*node, tree, arena) {
            classes.insert(node.id(), class);
            roots.push(class);
        }
    }

    for node in nodes {
        match node.kind() {
            "member_expression" | "subscript_expression" => {
                if let Some(root) = member_chain(node, tree, arena, &classes) {
                    roots.push(root);
                }
            }
            "variable_declarator" => {
                let (Some(name), Some(value)) = (node.child_by_field_name("name"), node.child_by_field_name("value"))
                else {
                    continue;
                };
                if name.kind() == "identifier" && value.kind() == "object" {
                    roots.push(JavaScript::object_entity(value, tree.content(name), tree, arena));
                }
            }
            "assignment_expression" => {
                if let Some(root) = object_assignment(node, tree, arena, &classes) {
                    roots.push(root);
                }
            }
            "formal_parameters" => roots.extend(parameters(node, tree, arena)),
            "arrow_function" => {
                let parameter = node
                    .child_by_field_name("parameter")
                    .filter(|parameter| parameter.kind() == "identifier");
                if let Some(parameter) = parameter {
                    roots.push(arena.alloc(Entity::new(parameter, tree.content(parameter))));
                }
            }
            _ => {}
        }
    }

    roots
}

/// Class entity with fields and methods as properties.
fn class_entity<'t>(class: Node<'t>, tree: &'t SourceTree, arena: &mut EntityArena<'t>) -> Option<EntityId> {
    let name = class.child_by_field_name("name")?;
    let id = arena.alloc(Entity::new(class, tree.content(name)).with_type(SimpleType::Object, "class"));

    let Some(body) = class.child_by_field_name("body") else {
        return Some(id);
    };
    for member in named_children(body) {
        match member.kind() {
            "field_definition" => {
                if let Some(property) = member.child_by_field_name("property") {
                    let field = tree.content(property).trim_start_matches('#');
                    arena.add_child(id, Entity::new(property, field));
                }
            }
            "method_definition" => {
                let Some(method) = member.child_by_field_name("name") else {
                    continue;
                };
                let method_name = tree.content(method).trim_start_matches('#');
                if method_name != "constructor" {
                    let function = Entity::new(method, method_name).with_type(SimpleType::Function, "method");
                    arena.add_child(id, function);
                }
            }
            _ => {}
        }
    }

    Some(id)
}

fn is_call_target(node: Node<'_>) -> bool {
    node.parent()
        .is_some_and(|parent| parent.kind() == "call_expression" && is_field(parent, "function", node))
}

/// Left side of `target = {...}`, handled with the object literal.
fn is_object_assignment_target(node: Node<'_>) -> bool {
    node.parent().is_some_and(|parent| {
        parent.kind() == "assignment_expression"
            && is_field(parent, "left", node)
            && parent
                .child_by_field_name("right")
                .is_some_and(|right| right.kind() == "object")
    })
}

/// Whether `node` is the object of a longer chain that will be built from an
/// ancestor.
fn is_inner_link(node: Node<'_>, tree: &SourceTree) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    matches!(parent.kind(), "member_expression" | "subscript_expression")
        && is_field(parent, "object", node)
        && !is_call_target(parent)
        && JavaScript::chain(parent, tree).is_some()
}

/// Attach a chain to its owner: the enclosing class for `this`, a helper root
/// for `this` elsewhere, or a new root. Returns the new root, if any, and the
/// entity of the last link.
fn place_chain<'t>(
    node: Node<'t>,
    chain: &Chain<'t>,
    arena: &mut EntityArena<'t>,
    classes: &HashMap<usize, EntityId>,
) -> (Option<EntityId>, EntityId) {
    if chain.root.kind() != "this" {
        let root = arena.alloc(Entity::new(chain.root, chain.root_name.clone()));
        let last = chain.attach(arena, root);
        return (Some(root), last);
    }

    let class = enclosing(node, CLASS_KINDS).and_then(|class| classes.get(&class.id()).copied());
    match class {
        Some(class) => (None, chain.attach(arena, class)),
        None => {
            let helper = arena.alloc(Entity::new(chain.root, "this").helper());
            let last = chain.attach(arena, helper);
            (Some(helper), last)
        }
    }
}

fn member_chain<'t>(
    node: Node<'t>,
    tree: &'t SourceTree,
    arena: &mut EntityArena<'t>,
    classes: &HashMap<usize, EntityId>,
) -> Option<EntityId> {
    // `user.save()` names a method, not a property
    if is_call_target(node) || is_inner_link(node, tree) || is_object_assignment_target(node) {
        return None;
    }
    let chain = JavaScript::chain(node, tree)?;
    place_chain(node, &chain, arena, classes).0
}

/// `user = {...}` or `this.profile = {...}`.
fn object_assignment<'t>(
    node: Node<'t>,
    tree: &'t SourceTree,
    arena: &mut EntityArena<'t>,
    classes: &HashMap<usize, EntityId>,
) -> Option<EntityId> {
    let left = node.child_by_field_name("left")?;
    let right = node.child_by_field_name("right")?;
    if right.kind() != "object" {
        return None;
    }

    match left.kind() {
        "identifier" => Some(JavaScript::object_entity(right, tree.content(left), tree, arena)),
        "member_expression" | "subscript_expression" => {
            let chain = JavaScript::chain(left, tree)?;
            let (root, last) = place_chain(left, &chain, arena, classes);
            arena[last].simple_type = SimpleType::Object;
            for member in JavaScript::object_members(right, tree, arena) {
                arena.add_property(last, member);
            }
            root
        }
        _ => None,
    }
}

fn parameters<'t>(list: Node<'t>, tree: &'t SourceTree, arena: &mut EntityArena<'t>) -> Vec<EntityId> {
    named_children(list)
        .into_iter()
        .filter_map(|parameter| {
            let name = match parameter.kind() {
                "identifier" => parameter,
                "assignment_pattern" => parameter.child_by_field_name("left")?,
                "rest_pattern" => named_children(parameter).into_iter().next()?,
                _ => return None,
            };
            (name.kind() == "identifier").then(|| arena.alloc(Entity::new(name, tree.content(name))))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use datashape_core::Language;

    fn describe(arena: &EntityArena<'_>, id: EntityId) -> String {
        let entity = &arena[id];
        if entity.properties.is_empty() {
            return entity.name.clone();
        }
        let children: Vec<String> = arena
            .sorted_properties(id)
            .into_iter()
            .map(|child| describe(arena, child))
            .collect();
        format!("{}{{{}}}", entity.name, children.join(","))
    }

    fn run(source: &str) -> Vec<String> {
        let tree = SourceTree::parse(Language::JavaScript, source).unwrap();
        let mut arena = EntityArena::new();
        let roots = discover(&tree, &mut arena);
        roots.into_iter().map(|id| describe(&arena, id)).collect()
    }

    #[test]
    fn test_class_members_and_this() {
        let roots = run(
            "class Customer {\n  email = null;\n  constructor() {\n    this.phone = null;\n  }\n  greet() {\n    return this.nickname;\n  }\n}\n",
        );
        assert_eq!(roots, vec!["Customer{email,phone,greet,nickname}"]);
    }

    #[test]
    fn test_member_chains_skip_method_calls() {
        let roots = run("user.address.city;\nthis.session.save();\nconsole.log(x);\n");
        assert_eq!(roots, vec!["user{address{city}}", "this{session}"]);
    }

    #[test]
    fn test_object_literals() {
        let roots = run("const account = { owner: { email: e }, plan };\npayload = { token: t };\n");
        assert_eq!(roots, vec!["account{owner{email},plan}", "payload{token}"]);
    }

    #[test]
    fn test_member_assignment_of_object() {
        let roots = run("order.billing = { street: s, city: c };\n");
        assert_eq!(roots, vec!["order{billing{street,city}}"]);
    }

    #[test]
    fn test_parameters() {
        let roots = run("function charge(customer, amount = 0, ...rest) {}\nconst f = token => token;\n");
        assert_eq!(roots, vec!["customer", "amount", "rest", "token"]);
    }
}
