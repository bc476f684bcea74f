use std::collections::HashSet;

use datashape_core::IdGenerator;
use datashape_parser::{EntityArena, EntityId};
use datashape_reports::{SchemaRecord, SourceLocation};

/// A flattened entity with the location of its originating node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedRecord {
    pub location: SourceLocation,
    pub record: SchemaRecord,
}

/// Flatten root entities into records, parents before their properties.
///
/// Roots get an empty object name and share one fresh parent tag. Helper
/// entities are skipped together with everything below them. Entities that
/// were never unified get a tag here, so aliased children still share one.
pub fn export_entities(
    arena: &mut EntityArena<'_>,
    roots: &[EntityId],
    ids: &mut dyn IdGenerator,
    filename: &str,
) -> Vec<ExportedRecord> {
    let mut exporter = Exporter {
        ids,
        filename,
        records: Vec::new(),
    };

    let object_uuid = exporter.ids.generate_id();
    for root in roots {
        if arena[*root].is_helper {
            continue;
        }
        let mut visited = HashSet::new();
        exporter.visit(arena, *root, "", &object_uuid, &mut visited);
    }

    exporter.records
}

struct Exporter<'a> {
    ids: &'a mut dyn IdGenerator,
    filename: &'a str,
    records: Vec<ExportedRecord>,
}

impl Exporter<'_> {
    fn visit(
        &mut self,
        arena: &mut EntityArena<'_>,
        id: EntityId,
        object_name: &str,
        object_uuid: &str,
        visited: &mut HashSet<EntityId>,
    ) {
        if arena[id].is_helper || !visited.insert(id) {
            return;
        }

        let field_uuid = match &arena[id].uuid {
            Some(uuid) => uuid.clone(),
            None => {
                let uuid = self.ids.generate_id();
                arena[id].uuid = Some(uuid.clone());
                uuid
            }
        };

        let entity = &arena[id];
        let start = entity.node.start_position();
        let end = entity.node.end_position();
        let field_name = entity.name.clone();
        self.records.push(ExportedRecord {
            location: SourceLocation::from_points(self.filename, (start.row, start.column), (end.row, end.column)),
            record: SchemaRecord {
                object_name: object_name.to_string(),
                object_uuid: object_uuid.to_string(),
                field_name: field_name.clone(),
                field_uuid: field_uuid.clone(),
                field_type: entity.text_type.clone(),
                simple_field_type: entity.simple_type,
            },
        });

        for child in arena.sorted_properties(id) {
            self.visit(arena, child, &field_name, &field_uuid, visited);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datashape_core::{Language, SequentialIdGenerator, SimpleType};
    use datashape_parser::{Entity, SourceTree};

    #[test]
    fn test_flatten_root_and_properties() {
        let tree = SourceTree::parse(Language::Ruby, "user\n  email\n").unwrap();
        let root_node = tree.root_node();
        let mut nodes = Vec::new();
        tree.for_each_node(|node| {
            if node.kind() == "identifier" {
                nodes.push(node);
            }
        });
        let mut arena = EntityArena::new();

        let user = arena.alloc(Entity::new(nodes[0], "user").with_type(SimpleType::Object, "User"));
        let email = arena.alloc(Entity::new(nodes[1], "email"));
        arena.add_property(user, email);
        let scaffold = arena.alloc(Entity::new(root_node, "self").helper());
        arena.add_property(scaffold, email);
        arena[user].uuid = Some("u-1".to_string());

        let mut ids = SequentialIdGenerator::new();
        let records = export_entities(&mut arena, &[user, scaffold], &mut ids, "app.rb");

        assert_eq!(records.len(), 2);
        let root = &records[0].record;
        assert_eq!(root.object_name, "");
        assert_eq!(root.object_uuid, "1");
        assert_eq!(root.field_name, "user");
        assert_eq!(root.field_uuid, "u-1");
        assert_eq!(root.field_type, "User");
        assert_eq!(root.simple_field_type, SimpleType::Object);

        let field = &records[1].record;
        assert_eq!(field.object_name, "user");
        assert_eq!(field.object_uuid, "u-1");
        assert_eq!(field.field_name, "email");
        assert_eq!(field.field_uuid, "2");
        assert_eq!(records[1].location.start_line, 2);
        assert_eq!(records[1].location.start_column, 3);
    }

    #[test]
    fn test_roots_share_parent_tag() {
        let tree = SourceTree::parse(Language::JavaScript, "track(user, account);").unwrap();
        let mut nodes = Vec::new();
        tree.for_each_node(|node| {
            if node.kind() == "identifier" {
                nodes.push(node);
            }
        });
        let mut arena = EntityArena::new();
        let user = arena.alloc(Entity::new(nodes[1], "user"));
        let account = arena.alloc(Entity::new(nodes[2], "account"));

        let mut ids = SequentialIdGenerator::new();
        let records = export_entities(&mut arena, &[user, account], &mut ids, "app.js");

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].record.object_uuid, "1");
        assert_eq!(records[1].record.object_uuid, "1");
        assert_ne!(records[0].record.field_uuid, records[1].record.field_uuid);
    }
}
