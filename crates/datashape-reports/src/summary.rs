use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::detection::Detection;

/// Counts gathered over one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub files_scanned: usize,
    pub files_failed: usize,
    /// Detections per `type` tag.
    pub detections: BTreeMap<String, usize>,
    /// Custom schema and presence detections per rule.
    pub rules: BTreeMap<String, usize>,
}

impl ScanSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, detections: &[Detection]) {
        self.files_scanned += 1;
        if detections.iter().any(|d| matches!(d, Detection::Error { .. })) {
            self.files_failed += 1;
        }
        for detection in detections {
            self.add_detection(detection);
        }
    }

    pub fn add_detection(&mut self, detection: &Detection) {
        *self.detections.entry(detection.kind().to_string()).or_insert(0) += 1;
        match detection {
            Detection::CustomSchema { rule, .. } | Detection::Presence { rule, .. } => {
                *self.rules.entry(rule.clone()).or_insert(0) += 1;
            }
            _ => {}
        }
    }

    #[must_use]
    pub fn count(&self, kind: &str) -> usize {
        self.detections.get(kind).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.detections.values().sum()
    }
}

impl fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Scanned {} files ({} with errors), {} detections",
            self.files_scanned,
            self.files_failed,
            self.total()
        )?;
        for (kind, count) in &self.detections {
            writeln!(f, "  {kind}: {count}")?;
        }
        for (rule, count) in &self.rules {
            writeln!(f, "  rule {rule}: {count}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::SourceLocation;

    #[test]
    fn test_counts_per_kind_and_rule() {
        let mut summary = ScanSummary::new();
        let location = SourceLocation::from_points("a.rb", (0, 0), (0, 1));
        summary.add_file(&[
            Detection::Presence {
                rule: "eval_usage".to_string(),
                location: location.clone(),
                content: None,
            },
            Detection::Presence {
                rule: "eval_usage".to_string(),
                location,
                content: None,
            },
        ]);
        summary.add_file(&[Detection::Error {
            file: "b.rb".to_string(),
            message: "parse failed".to_string(),
        }]);

        assert_eq!(summary.files_scanned, 2);
        assert_eq!(summary.files_failed, 1);
        assert_eq!(summary.count("presence"), 2);
        assert_eq!(summary.count("schema"), 0);
        assert_eq!(summary.rules.get("eval_usage"), Some(&2));
        assert_eq!(summary.total(), 3);
        assert!(summary.to_string().contains("Scanned 2 files"));
    }
}
