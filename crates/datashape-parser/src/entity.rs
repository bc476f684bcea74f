//! Entity arena.
//!
//! Entities are stored by index; properties refer to children by [`EntityId`].
//! Two parents holding the same child id share that child, which is how unified
//! occurrences alias one property map without reference cycles.

use std::collections::{BTreeMap, HashSet};
use std::ops::{Index, IndexMut};

use datashape_core::SimpleType;
use tree_sitter::Node;

/// Names shorter than this are noise and get pruned.
pub const MIN_NAME_LENGTH: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(usize);

impl EntityId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A discovered object, property or argument.
#[derive(Debug, Clone)]
pub struct Entity<'tree> {
    /// Originating node, used for location and scope lookup only.
    pub node: Node<'tree>,
    pub name: String,
    pub simple_type: SimpleType,
    /// Type as written in source, empty when unknown.
    pub text_type: String,
    pub properties: BTreeMap<String, EntityId>,
    /// Scaffolding: takes part in unification, skipped on export with its subtree.
    pub is_helper: bool,
    /// Identity tag, set by unification or reconciliation.
    pub uuid: Option<String>,
}

impl<'tree> Entity<'tree> {
    pub fn new(node: Node<'tree>, name: impl Into<String>) -> Self {
        Self {
            node,
            name: name.into(),
            simple_type: SimpleType::Unknown,
            text_type: String::new(),
            properties: BTreeMap::new(),
            is_helper: false,
            uuid: None,
        }
    }

    #[must_use]
    pub fn with_type(mut self, simple_type: SimpleType, text_type: impl Into<String>) -> Self {
        self.simple_type = simple_type;
        self.text_type = text_type.into();
        self
    }

    #[must_use]
    pub fn helper(mut self) -> Self {
        self.is_helper = true;
        self
    }

    /// Zero-based (row, column) of the originating node.
    #[must_use]
    pub fn position(&self) -> (usize, usize) {
        let point = self.node.start_position();
        (point.row, point.column)
    }
}

/// File-local storage for entities.
#[derive(Debug, Default)]
pub struct EntityArena<'tree> {
    entities: Vec<Entity<'tree>>,
}

impl<'tree> EntityArena<'tree> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
        }
    }

    pub fn alloc(&mut self, entity: Entity<'tree>) -> EntityId {
        self.entities.push(entity);
        EntityId(self.entities.len() - 1)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    #[must_use]
    pub fn property(&self, parent: EntityId, name: &str) -> Option<EntityId> {
        self[parent].properties.get(name).copied()
    }

    /// Attach `child` under its own name. An existing property of that name is
    /// kept and returned instead.
    pub fn add_property(&mut self, parent: EntityId, child: EntityId) -> EntityId {
        if parent == child {
            return child;
        }
        let name = self[child].name.clone();
        *self[parent].properties.entry(name).or_insert(child)
    }

    /// Allocate `child` and attach it under `parent`, returning the id now stored
    /// under that name.
    pub fn add_child(&mut self, parent: EntityId, child: Entity<'tree>) -> EntityId {
        if let Some(existing) = self.property(parent, &child.name) {
            return existing;
        }
        let id = self.alloc(child);
        self.add_property(parent, id)
    }

    /// Property children ordered by position, then name.
    #[must_use]
    pub fn sorted_properties(&self, id: EntityId) -> Vec<EntityId> {
        let mut children: Vec<EntityId> = self[id].properties.values().copied().collect();
        self.sort_by_position(&mut children);
        children
    }

    /// Order by (line, column, name) of the originating nodes.
    pub fn sort_by_position(&self, ids: &mut [EntityId]) {
        ids.sort_by(|a, b| {
            let (a, b) = (&self[*a], &self[*b]);
            a.position()
                .cmp(&b.position())
                .then_with(|| a.name.cmp(&b.name))
        });
    }

    /// Prune noise names below `id`. Returns true when `id` itself is noise and
    /// should be dropped by its owner.
    pub fn prune(&mut self, id: EntityId) -> bool {
        let mut visited = HashSet::new();
        self.prune_inner(id, &mut visited)
    }

    fn prune_inner(&mut self, id: EntityId, visited: &mut HashSet<EntityId>) -> bool {
        if self[id].name.chars().count() < MIN_NAME_LENGTH {
            return true;
        }
        if !visited.insert(id) {
            return false;
        }

        let children: Vec<(String, EntityId)> = self[id]
            .properties
            .iter()
            .map(|(name, child)| (name.clone(), *child))
            .collect();
        for (name, child) in children {
            if self.prune_inner(child, visited) {
                self[id].properties.remove(&name);
            }
        }
        false
    }

    /// Prune every root, dropping roots that are noise themselves.
    pub fn prune_roots(&mut self, roots: Vec<EntityId>) -> Vec<EntityId> {
        roots.into_iter().filter(|root| !self.prune(*root)).collect()
    }

    /// Follow single-property links down to the deepest entity. Stops at the
    /// first entity with zero or several properties.
    #[must_use]
    pub fn deepest_single_child(&self, id: EntityId) -> EntityId {
        let mut current = id;
        let mut visited = HashSet::new();
        while visited.insert(current) && self[current].properties.len() == 1 {
            match self[current].properties.values().next() {
                Some(child) => current = *child,
                None => break,
            }
        }
        current
    }
}

impl<'tree> Index<EntityId> for EntityArena<'tree> {
    type Output = Entity<'tree>;

    fn index(&self, id: EntityId) -> &Self::Output {
        &self.entities[id.0]
    }
}

impl<'tree> IndexMut<EntityId> for EntityArena<'tree> {
    fn index_mut(&mut self, id: EntityId) -> &mut Self::Output {
        &mut self.entities[id.0]
    }
}
