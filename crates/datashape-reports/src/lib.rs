//! Report boundary for the datashape scanner.
//!
//! This crate provides:
//! - Plain-data detection records (no syntax trees cross this boundary)
//! - JSON lines and JSON array writers
//! - Scan summaries

pub mod detection;
pub mod summary;
pub mod writer;

pub use detection::{Detection, SchemaRecord, SourceLocation};
pub use summary::ScanSummary;
pub use writer::{write_detections, JsonLinesWriter, OutputFormat};
