//! Core types and traits for the datashape scanner.
//!
//! This crate provides fundamental types used across all datashape components:
//! - Guest language definitions (Language)
//! - Entity kinds (SimpleType)
//! - Identity tag generators (IdGenerator)
//! - Rule source types loaded from YAML (Rule, RuleSet)

mod id;
mod language;
mod rule;
mod simple_type;

pub use id::{IdGenerator, SequentialIdGenerator, UuidGenerator};
pub use language::Language;
pub use rule::{MetaVar, PatternFilter, Rule, RuleError, RulePattern, RuleSet};
pub use simple_type::SimpleType;
