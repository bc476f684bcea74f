//! Enrich fresh extractions with what the scoped entities already know.

use std::collections::HashSet;

use datashape_core::SimpleType;
use datashape_parser::{EntityArena, EntityId};

use crate::scope::{scope_node, ScopeMap};

/// Merge `donor` into `target` by property name.
///
/// Same-named properties are merged recursively; properties only the donor has
/// are attached to the target as shared children. The target adopts the
/// donor's identity tag and type when it has none of its own.
pub fn merge_by_property_names(arena: &mut EntityArena<'_>, target: EntityId, donor: EntityId) {
    let mut visited = HashSet::new();
    merge_inner(arena, target, donor, &mut visited);
}

fn merge_inner(
    arena: &mut EntityArena<'_>,
    target: EntityId,
    donor: EntityId,
    visited: &mut HashSet<(EntityId, EntityId)>,
) {
    if target == donor || !visited.insert((target, donor)) {
        return;
    }

    if arena[target].uuid.is_none() {
        arena[target].uuid = arena[donor].uuid.clone();
    }
    if arena[target].simple_type == SimpleType::Unknown {
        let donor = &arena[donor];
        let (simple_type, text_type) = (donor.simple_type, donor.text_type.clone());
        arena[target].simple_type = simple_type;
        if arena[target].text_type.is_empty() {
            arena[target].text_type = text_type;
        }
    }

    let properties: Vec<(String, EntityId)> = arena[donor]
        .properties
        .iter()
        .map(|(name, id)| (name.clone(), *id))
        .collect();
    for (name, donor_child) in properties {
        match arena.property(target, &name) {
            Some(target_child) => merge_inner(arena, target_child, donor_child, visited),
            None => {
                arena.add_property(target, donor_child);
            }
        }
    }
}

/// Merge every scoped entity sharing a fresh entity's name and scope into it.
pub fn reconcile(arena: &mut EntityArena<'_>, fresh: &[EntityId], scopes: &ScopeMap<'_>, terminators: &[&str]) {
    for id in fresh {
        let scope = scope_node(arena[*id].node, terminators);
        let known = scopes.lookup(scope, &arena[*id].name).to_vec();
        for donor in known {
            merge_by_property_names(arena, *id, donor);
        }
    }
}
