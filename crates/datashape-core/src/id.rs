//! Identity tag generation.
//!
//! The same generator type is used for synthetic placeholder ids while compiling
//! patterns and for identity tags while unifying entities. A generator instance is
//! owned by one compile step or one file; it is never shared between threads.

use uuid::Uuid;

/// Source of unique identity tags.
pub trait IdGenerator {
    fn generate_id(&mut self) -> String;
}

/// Monotonic counter, reproducible across runs.
#[derive(Debug, Clone)]
pub struct SequentialIdGenerator {
    next: u64,
}

impl SequentialIdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    #[must_use]
    pub fn starting_at(first: u64) -> Self {
        Self { next: first }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn generate_id(&mut self) -> String {
        let id = self.next;
        self.next += 1;
        id.to_string()
    }
}

/// Random v4 UUIDs, unique across files without coordination.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate_id(&mut self) -> String {
        Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_sequential_ids_are_monotonic() {
        let mut ids = SequentialIdGenerator::new();
        assert_eq!(ids.generate_id(), "1");
        assert_eq!(ids.generate_id(), "2");
        assert_eq!(ids.generate_id(), "3");
    }

    #[test]
    fn test_sequential_starting_point() {
        let mut ids = SequentialIdGenerator::starting_at(100);
        assert_eq!(ids.generate_id(), "100");
    }

    #[test]
    fn test_uuid_ids_are_unique() {
        let mut ids = UuidGenerator;
        let generated: HashSet<String> = (0..64).map(|_| ids.generate_id()).collect();
        assert_eq!(generated.len(), 64);
        assert!(generated.iter().all(|id| Uuid::parse_str(id).is_ok()));
    }
}
