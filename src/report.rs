//! Completeness reporting
//!
//! Diagnostic counts of referenced versus defined slots and enums. Always
//! computable for a parseable document, valid or not; never a pass/fail gate.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::document::SchemaDocument;

/// Reference/definition counts for one document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletenessReport {
    #[serde(rename = "classes")]
    pub class_count: usize,
    pub slots_defined: usize,
    pub slots_referenced: usize,
    pub slots_missing: usize,
    pub enums_defined: usize,
    pub enums_referenced: usize,
    pub enums_missing: usize,

    /// Referenced but undeclared slot names, sorted
    #[serde(skip)]
    pub missing_slots: Vec<String>,
    /// Referenced but undeclared enum names, sorted
    #[serde(skip)]
    pub missing_enums: Vec<String>,
}

impl CompletenessReport {
    pub fn from_document(document: &SchemaDocument, enum_suffix: &str) -> Self {
        let referenced_slots: BTreeSet<&str> = document
            .classes
            .values()
            .flat_map(|class| class.slots.iter().map(String::as_str))
            .collect();
        let missing_slots: Vec<String> = referenced_slots
            .iter()
            .filter(|slot| !document.slots.contains_key(**slot))
            .map(|slot| slot.to_string())
            .collect();

        let referenced_enums: BTreeSet<&str> = document
            .slots
            .values()
            .filter_map(|slot| slot.range.as_deref())
            .filter(|range| range.ends_with(enum_suffix))
            .collect();
        let missing_enums: Vec<String> = referenced_enums
            .iter()
            .filter(|name| !document.enums.contains_key(**name))
            .map(|name| name.to_string())
            .collect();

        Self {
            class_count: document.classes.len(),
            slots_defined: document.slots.len(),
            slots_referenced: referenced_slots.len(),
            slots_missing: missing_slots.len(),
            enums_defined: document.enums.len(),
            enums_referenced: referenced_enums.len(),
            enums_missing: missing_enums.len(),
            missing_slots,
            missing_enums,
        }
    }

    /// Nothing referenced is missing
    pub fn is_complete(&self) -> bool {
        self.slots_missing == 0 && self.enums_missing == 0
    }
}

/// Report counts, or an explicit error record for unparseable text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ReportRecord {
    Report(CompletenessReport),
    Error { error: String },
}

impl ReportRecord {
    pub fn from_text(text: &str, enum_suffix: &str) -> Self {
        match SchemaDocument::parse(text) {
            Ok(document) => Self::Report(CompletenessReport::from_document(&document, enum_suffix)),
            Err(e) => {
                warn!(error = %e, "document could not be parsed for reporting");
                Self::Error {
                    error: e.to_string(),
                }
            }
        }
    }

    pub fn report(&self) -> Option<&CompletenessReport> {
        match self {
            Self::Report(report) => Some(report),
            Self::Error { .. } => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DRAFT: &str = "\
classes:
  Task:
    slots: [id, title, priority, id]
  Project:
    slots: [id, owner]
slots:
  id:
    range: string
  title:
    range: string
  priority:
    range: PriorityEnum
  state:
    range: StateEnum
enums:
  StateEnum:
    permissible_values:
      open: {}
";

    #[test]
    fn test_counts_on_invalid_document() {
        let record = ReportRecord::from_text(DRAFT, "Enum");
        let report = record.report().unwrap();
        assert_eq!(report.class_count, 2);
        assert_eq!(report.slots_defined, 4);
        assert_eq!(report.slots_referenced, 4);
        assert_eq!(report.slots_missing, 1);
        assert_eq!(report.missing_slots, vec!["owner"]);
        assert_eq!(report.enums_defined, 1);
        assert_eq!(report.enums_referenced, 2);
        assert_eq!(report.enums_missing, 1);
        assert_eq!(report.missing_enums, vec!["PriorityEnum"]);
        assert!(!report.is_complete());
    }

    #[test]
    fn test_serialized_keys() {
        let record = ReportRecord::from_text("classes:\n  A:\n    slots: [x]\n", "Enum");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({
                "classes": 1,
                "slots_defined": 0,
                "slots_referenced": 1,
                "slots_missing": 1,
                "enums_defined": 0,
                "enums_referenced": 0,
                "enums_missing": 0
            })
        );
    }

    #[test]
    fn test_error_record() {
        let record = ReportRecord::from_text("just a scalar", "Enum");
        let value = serde_json::to_value(&record).unwrap();
        assert!(value["error"].as_str().unwrap().contains("mapping"));
    }
}
