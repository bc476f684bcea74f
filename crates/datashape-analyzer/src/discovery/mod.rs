//! Per-language discovery passes.
//!
//! Each pass walks a file once and emits raw entity observations: classes and
//! their members, parameters, object literals and property access chains.
//! Nothing here is unified; that happens in [`crate::scope`].

mod javascript;
mod ruby;

use datashape_core::Language;
use datashape_parser::{EntityArena, EntityId, Node, SourceTree};

/// Root entities observed in `tree`, in discovery order.
pub fn discover<'t>(tree: &'t SourceTree, arena: &mut EntityArena<'t>) -> Vec<EntityId> {
    let roots = match tree.language() {
        Language::Ruby => ruby::discover(tree, arena),
        Language::JavaScript => javascript::discover(tree, arena),
        Language::Other => Vec::new(),
    };
    log::debug!("discovered {} root entities ({} total)", roots.len(), arena.len());
    roots
}

fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| !child.is_extra())
        .collect()
}

/// Whether `node` is the `field` child of `parent`.
fn is_field(parent: Node<'_>, field: &str, node: Node<'_>) -> bool {
    parent
        .child_by_field_name(field)
        .is_some_and(|child| child.id() == node.id())
}

/// Nearest ancestor of one of `kinds`.
fn enclosing<'t>(node: Node<'t>, kinds: &[&str]) -> Option<Node<'t>> {
    let mut current = node.parent();
    while let Some(ancestor) = current {
        if kinds.contains(&ancestor.kind()) {
            return Some(ancestor);
        }
        current = ancestor.parent();
    }
    None
}
