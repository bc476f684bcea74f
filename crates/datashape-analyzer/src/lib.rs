//! Custom rule matching and scoped identity unification for datashape.
//!
//! This crate provides:
//! - Custom rule compilation with per-rule isolation
//! - Capture-set filtering and entity extraction
//! - Ruby and JavaScript discovery passes
//! - Scope resolution, identity unification and reconciliation
//! - The per-file pipeline producing detections

mod custom;
pub mod discovery;
mod error;
mod export;
mod extractor;
mod matcher;
mod pipeline;
pub mod reconcile;
pub mod scope;

pub use custom::CustomDetector;
pub use error::{AnalyzerError, RuleCompileError};
pub use export::{export_entities, ExportedRecord};
pub use extractor::extract;
pub use matcher::RuleMatcher;
pub use pipeline::FileScanner;
pub use reconcile::{merge_by_property_names, reconcile};
pub use scope::{scope_entities, scope_node, unify_uuid, ScopeMap};
