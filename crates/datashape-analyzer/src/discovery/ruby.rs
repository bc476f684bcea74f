use std::collections::HashMap;

use datashape_core::SimpleType;
use datashape_parser::languages::Ruby;
use datashape_parser::{Entity, EntityArena, EntityId, Node, SourceTree};

use super::{enclosing, is_field, named_children};

const ATTRIBUTE_MACROS: &[&str] = &["attr_accessor", "attr_reader", "attr_writer"];
const PARAMETER_LISTS: &[&str] = &["method_parameters", "block_parameters", "lambda_parameters"];

pub(super) fn discover<'t>(tree: &'t SourceTree, arena: &mut EntityArena<'t>) -> Vec<EntityId> {
    let mut nodes = Vec::new();
    tree.for_each_node(|node| nodes.push(node));

    let mut roots = Vec::new();
    let mut classes: HashMap<usize, EntityId> = HashMap::new();

    for node in nodes.iter().filter(|node| node.kind() == "class") {
        if let Some(class) = class_entity(*node, tree, arena) {
            classes.insert(node.id(), class);
            roots.push(class);
        }
    }

    for node in nodes {
        match node.kind() {
            "call" | "element_reference" => {
                if let Some(root) = chain(node, tree, arena, &classes) {
                    roots.push(root);
                }
            }
            "instance_variable" => {
                if let Some(root) = instance_variable(node, tree, arena, &classes) {
                    roots.push(root);
                }
            }
            "assignment" => {
                let (Some(left), Some(right)) = (node.child_by_field_name("left"), node.child_by_field_name("right"))
                else {
                    continue;
                };
                if right.kind() == "hash"
                    && matches!(left.kind(), "identifier" | "instance_variable" | "constant")
                {
                    let name = Ruby::variable_name(tree.content(left));
                    roots.push(Ruby::hash_entity(right, name, tree, arena));
                }
            }
            kind if PARAMETER_LISTS.contains(&kind) => roots.extend(parameters(node, tree, arena)),
            _ => {}
        }
    }

    roots
}

/// Class entity with attribute macros and method names as properties.
fn class_entity<'t>(class: Node<'t>, tree: &'t SourceTree, arena: &mut EntityArena<'t>) -> Option<EntityId> {
    let name = class.child_by_field_name("name")?;
    let id = arena.alloc(Entity::new(class, tree.content(name)).with_type(SimpleType::Object, "class"));

    let mut statements = Vec::new();
    for child in named_children(class) {
        if child.kind() == "body_statement" {
            statements.extend(named_children(child));
        } else {
            statements.push(child);
        }
    }

    for statement in statements {
        match statement.kind() {
            "call" if statement.child_by_field_name("receiver").is_none() => {
                let is_macro = statement
                    .child_by_field_name("method")
                    .is_some_and(|method| ATTRIBUTE_MACROS.contains(&tree.content(method)));
                let Some(arguments) = statement.child_by_field_name("arguments") else {
                    continue;
                };
                if !is_macro {
                    continue;
                }
                for symbol in named_children(arguments) {
                    if symbol.kind() == "simple_symbol" {
                        let field = tree.content(symbol).trim_start_matches(':');
                        arena.add_child(id, Entity::new(symbol, field));
                    }
                }
            }
            "method" => {
                if let Some(method) = statement.child_by_field_name("name") {
                    let function = Entity::new(method, tree.content(method)).with_type(SimpleType::Function, "method");
                    arena.add_child(id, function);
                }
            }
            _ => {}
        }
    }

    Some(id)
}

fn enclosing_class(node: Node<'_>, classes: &HashMap<usize, EntityId>) -> Option<EntityId> {
    enclosing(node, &["class"]).and_then(|class| classes.get(&class.id()).copied())
}

/// Whether `node` is a link inside a longer chain that will be built from an
/// ancestor.
fn is_inner_link(node: Node<'_>, tree: &SourceTree) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    let inner = match parent.kind() {
        "call" => is_field(parent, "receiver", node),
        "element_reference" => is_field(parent, "object", node),
        _ => false,
    };
    inner && Ruby::chain(parent, tree).is_some()
}

fn chain<'t>(
    node: Node<'t>,
    tree: &'t SourceTree,
    arena: &mut EntityArena<'t>,
    classes: &HashMap<usize, EntityId>,
) -> Option<EntityId> {
    if is_inner_link(node, tree) {
        return None;
    }
    let chain = Ruby::chain(node, tree)?;

    match chain.root.kind() {
        // receivers like `Rails.env` are class references, not data
        "constant" => None,
        "self" => {
            if let Some(class) = enclosing_class(node, classes) {
                chain.attach(arena, class);
                return None;
            }
            let helper = arena.alloc(Entity::new(chain.root, "self").helper());
            chain.attach(arena, helper);
            Some(helper)
        }
        "instance_variable" => {
            if let Some(class) = enclosing_class(node, classes) {
                let field = arena.add_child(class, Entity::new(chain.root, chain.root_name.clone()));
                chain.attach(arena, field);
                return None;
            }
            Some(chain.build(arena))
        }
        _ => Some(chain.build(arena)),
    }
}

/// A bare instance variable. Inside a class it becomes a class property.
fn instance_variable<'t>(
    node: Node<'t>,
    tree: &'t SourceTree,
    arena: &mut EntityArena<'t>,
    classes: &HashMap<usize, EntityId>,
) -> Option<EntityId> {
    if is_inner_link(node, tree) {
        return None;
    }
    let entity = Entity::new(node, Ruby::variable_name(tree.content(node)));
    match enclosing_class(node, classes) {
        Some(class) => {
            arena.add_child(class, entity);
            None
        }
        None => Some(arena.alloc(entity)),
    }
}

fn parameters<'t>(list: Node<'t>, tree: &'t SourceTree, arena: &mut EntityArena<'t>) -> Vec<EntityId> {
    named_children(list)
        .into_iter()
        .filter_map(|parameter| {
            let name = match parameter.kind() {
                "identifier" => parameter,
                _ => parameter.child_by_field_name("name")?,
            };
            Some(arena.alloc(Entity::new(name, tree.content(name))))
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
        let tree = SourceTree::parse(Language::Ruby, source).unwrap();
        let mut arena = EntityArena::new();
        let roots = discover(&tree, &mut arena);
        roots.into_iter().map(|id| describe(&arena, id)).collect()
    }

    #[test]
    fn test_class_members() {
        let roots = run(
            "class User\n  attr_accessor :email, :name\n\n  def greet\n    @nickname\n    self.phone\n  end\nend\n",
        );
        assert_eq!(roots, vec!["User{email,name,greet,nickname,phone}"]);
    }

    #[test]
    fn test_instance_variable_chain_nested_under_class() {
        let roots = run("class Order\n  def ship\n    @address.city\n  end\nend\n");
        assert_eq!(roots, vec!["Order{ship,address{city}}"]);
    }

    #[test]
    fn test_receiver_chains() {
        let roots = run("user.address.city\nparams[:user][:email]\n");
        assert_eq!(roots, vec!["user{address{city}}", "params{user{email}}"]);
    }

    #[test]
    fn test_call_with_arguments_keeps_receiver_chain() {
        let roots = run("account.owner.update(name)\nRails.env\n");
        assert_eq!(roots, vec!["account{owner}"]);
    }

    #[test]
    fn test_hash_assignment_and_parameters() {
        let roots = run("def create(customer, notify = true)\n  payload = { email: customer, meta: { source: 1 } }\nend\n");
        assert_eq!(roots, vec!["customer", "notify", "payload{email,meta{source}}"]);
    }

    #[test]
    fn test_self_outside_class_is_helper() {
        let tree = SourceTree::parse(Language::Ruby, "self.config\n").unwrap();
        let mut arena = EntityArena::new();
        let roots = discover(&tree, &mut arena);

        assert_eq!(roots.len(), 1);
        assert!(arena[roots[0]].is_helper);
        assert!(arena.property(roots[0], "config").is_some());
    }
}
