pub mod cli;
pub mod config;
pub mod rules;
pub mod scanner;

pub use datashape_core::{Language, SimpleType};
pub use datashape_reports::{Detection, ScanSummary};
