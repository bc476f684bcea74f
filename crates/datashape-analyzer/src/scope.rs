//! Scope resolution and identity unification.
//!
//! Entities are grouped by the nearest enclosing terminator node and by name.
//! Every group receives one identity tag, and the same happens recursively for
//! each property name found on any member of the group.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use datashape_core::IdGenerator;
use datashape_parser::{EntityArena, EntityId, Node};

/// Nearest strict ancestor of `node` whose kind is a terminator, or the tree
/// root when none is.
#[must_use]
pub fn scope_node<'t>(node: Node<'t>, terminators: &[&str]) -> Node<'t> {
    let Some(mut current) = node.parent() else {
        return node;
    };
    loop {
        if terminators.contains(&current.kind()) {
            return current;
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return current,
        }
    }
}

/// Entities observed inside one lexical region.
#[derive(Debug, Clone)]
pub struct Scope<'t> {
    pub node: Node<'t>,
    pub entities: BTreeMap<String, Vec<EntityId>>,
}

/// Scopes of one file keyed by their terminator node.
#[derive(Debug, Default)]
pub struct ScopeMap<'t> {
    scopes: HashMap<usize, Scope<'t>>,
}

impl<'t> ScopeMap<'t> {
    /// Group `roots` by scope and name. Buckets are sorted by position.
    pub fn build(arena: &EntityArena<'t>, roots: &[EntityId], terminators: &[&str]) -> Self {
        let mut scopes: HashMap<usize, Scope<'t>> = HashMap::new();
        for root in roots {
            let entity = &arena[*root];
            let node = scope_node(entity.node, terminators);
            let bucket = scopes
                .entry(node.id())
                .or_insert_with(|| Scope {
                    node,
                    entities: BTreeMap::new(),
                })
                .entities
                .entry(entity.name.clone())
                .or_default();
            if !bucket.contains(root) {
                bucket.push(*root);
            }
        }

        for scope in scopes.values_mut() {
            for bucket in scope.entities.values_mut() {
                arena.sort_by_position(bucket);
            }
        }

        Self { scopes }
    }

    /// Entities named `name` in the scope rooted at `scope`.
    #[must_use]
    pub fn lookup(&self, scope: Node<'_>, name: &str) -> &[EntityId] {
        self.scopes
            .get(&scope.id())
            .and_then(|scope| scope.entities.get(name))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Scopes ordered by the position of their terminator node.
    #[must_use]
    pub fn ordered(&self) -> Vec<&Scope<'t>> {
        let mut scopes: Vec<&Scope<'t>> = self.scopes.values().collect();
        scopes.sort_by_key(|scope| {
            let start = scope.node.start_position();
            (start.row, start.column, scope.node.end_byte())
        });
        scopes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

/// Scope `roots` and unify identities in every bucket, in scope order.
pub fn scope_entities<'t>(
    arena: &mut EntityArena<'t>,
    roots: &[EntityId],
    ids: &mut dyn IdGenerator,
    terminators: &[&str],
) -> ScopeMap<'t> {
    let scopes = ScopeMap::build(arena, roots, terminators);
    let mut visited = HashSet::new();

    for scope in scopes.ordered() {
        for bucket in scope.entities.values() {
            unify_uuid(arena, bucket.clone(), ids, &mut visited);
        }
    }
    log::debug!("unified {} roots across {} scopes", roots.len(), scopes.len());

    scopes
}

/// Give every member of `bucket` one fresh identity tag, then recurse into each
/// property name present on any member.
///
/// Entities already in `visited` keep their tag; shared (aliased) children are
/// therefore unified once.
pub fn unify_uuid(
    arena: &mut EntityArena<'_>,
    mut bucket: Vec<EntityId>,
    ids: &mut dyn IdGenerator,
    visited: &mut HashSet<EntityId>,
) {
    let mut seen = HashSet::new();
    bucket.retain(|id| !visited.contains(id) && seen.insert(*id));
    if bucket.is_empty() {
        return;
    }
    arena.sort_by_position(&mut bucket);

    let uuid = ids.generate_id();
    for id in &bucket {
        visited.insert(*id);
        arena[*id].uuid = Some(uuid.clone());
    }

    let names: BTreeSet<String> = bucket
        .iter()
        .flat_map(|id| arena[*id].properties.keys().cloned())
        .collect();

    for name in names {
        let children: Vec<EntityId> = bucket
            .iter()
            .filter_map(|id| arena.property(*id, &name))
            .collect();
        unify_uuid(arena, children, ids, visited);
    }
}
