//! Tree-sitter based pattern compiler and entity model.
//!
//! This crate provides:
//! - Parsed source trees and capture-set execution with literal anchors
//! - The entity arena shared by extraction, discovery and unification
//! - Placeholder substitution and query generation for custom rule patterns
//! - Per-language pattern extensions (Ruby, JavaScript)

mod entity;
mod error;
pub mod languages;
pub mod pattern;
mod tree;

pub use entity::{Entity, EntityArena, EntityId, MIN_NAME_LENGTH};
pub use error::{ParseError, PatternError};
pub use languages::{pattern_language, NodeClass, ParamSpec, PatternLanguage};
pub use pattern::{compile_pattern, CompiledRule, Param, ParamKind};
pub use tree::{grammar, strip_quotes, CaptureSet, SourceTree, ANCHOR_PREFIX, PARAM_PREFIX, RULE_CAPTURE};

// Re-export tree-sitter types for downstream crates
pub use streaming_iterator::StreamingIterator;
pub use tree_sitter::{Node, Point, Query, QueryCursor};
