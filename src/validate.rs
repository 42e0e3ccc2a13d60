//! Integrity Validation
//!
//! Reports referential-integrity violations in a parsed schema document:
//! 1. **Undefined slots**: a class references a slot name missing from the
//!    slot table
//! 2. **Undefined enums**: a slot range follows the enum naming convention
//!    but names neither a builtin type, a class nor a declared enum
//!
//! Findings never abort validation; only unparseable text produces the
//! single synthetic `InvalidDocument` finding.

use std::collections::HashSet;
use std::fmt;

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ValidationConfig;
use crate::document::SchemaDocument;
use crate::error::SchemaError;

/// What a finding is about
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationErrorKind {
    UndefinedSlot { class: String, slot: String },
    UndefinedEnum { slot: String, range: String },
    InvalidDocument { detail: String },
}

/// A single referential-integrity finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    #[serde(flatten)]
    pub kind: ValidationErrorKind,
    /// Human-readable message naming the offending definitions
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Verdict plus findings, in class order then slot order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationOutcome {
    fn from_errors(errors: Vec<ValidationError>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    /// Outcome for text that could not be parsed at all
    pub fn invalid_document(error: &SchemaError) -> Self {
        let detail = error.to_string();
        Self::from_errors(vec![ValidationError {
            message: format!("Invalid document: {}", detail),
            kind: ValidationErrorKind::InvalidDocument { detail },
        }])
    }

    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.message.clone()).collect()
    }

    /// `(is_valid, messages)`
    pub fn into_parts(self) -> (bool, Vec<String>) {
        let messages = self.messages();
        (self.is_valid, messages)
    }
}

/// The integrity validator
pub struct IntegrityValidator {
    builtin_types: HashSet<String>,
    enum_suffix: String,
    suggest_similar: bool,
}

impl Default for IntegrityValidator {
    fn default() -> Self {
        Self::new(&ValidationConfig::default())
    }
}

impl IntegrityValidator {
    pub fn new(config: &ValidationConfig) -> Self {
        Self {
            builtin_types: config.builtin_types.iter().cloned().collect(),
            enum_suffix: config.enum_suffix.clone(),
            suggest_similar: config.suggest_similar,
        }
    }

    /// Parse and validate; a parse failure becomes one `InvalidDocument` finding
    pub fn validate_text(&self, text: &str) -> ValidationOutcome {
        match SchemaDocument::parse(text) {
            Ok(document) => self.validate(&document),
            Err(e) => {
                warn!(error = %e, "document could not be parsed for validation");
                ValidationOutcome::invalid_document(&e)
            }
        }
    }

    pub fn validate(&self, document: &SchemaDocument) -> ValidationOutcome {
        let mut errors = Vec::new();

        for (class_name, class) in &document.classes {
            for slot in &class.slots {
                if document.slots.contains_key(slot) {
                    continue;
                }
                let mut message = format!(
                    "Class '{}' references undefined slot '{}'. Add a definition for '{}' under slots.",
                    class_name, slot, slot
                );
                if let Some(candidate) = self.suggest(slot, document.slots.keys()) {
                    message.push_str(&format!(" Did you mean '{}'?", candidate));
                }
                errors.push(ValidationError {
                    kind: ValidationErrorKind::UndefinedSlot {
                        class: class_name.clone(),
                        slot: slot.clone(),
                    },
                    message,
                });
            }
        }

        for (slot_name, slot) in &document.slots {
            let Some(range) = slot.range.as_deref() else {
                continue;
            };
            if self.builtin_types.contains(range)
                || document.classes.contains_key(range)
                || !self.is_enum_reference(range)
                || document.enums.contains_key(range)
            {
                continue;
            }
            let mut message = format!(
                "Slot '{}' has range '{}' but this enum is not defined. Add '{}' under enums.",
                slot_name, range, range
            );
            if let Some(candidate) = self.suggest(range, document.enums.keys()) {
                message.push_str(&format!(" Did you mean '{}'?", candidate));
            }
            errors.push(ValidationError {
                kind: ValidationErrorKind::UndefinedEnum {
                    slot: slot_name.clone(),
                    range: range.to_string(),
                },
                message,
            });
        }

        debug!(
            classes = document.classes.len(),
            slots = document.slots.len(),
            errors = errors.len(),
            "validated document"
        );
        ValidationOutcome::from_errors(errors)
    }

    /// Does this range name follow the enum naming convention?
    pub fn is_enum_reference(&self, range: &str) -> bool {
        range.ends_with(&self.enum_suffix)
    }

    /// Closest declared name for a "did you mean" hint
    fn suggest<'a>(
        &self,
        missing: &str,
        candidates: impl Iterator<Item = &'a String>,
    ) -> Option<&'a str> {
        if !self.suggest_similar {
            return None;
        }
        let matcher = SkimMatcherV2::default();
        let mut best: Option<(i64, &str)> = None;
        for candidate in candidates {
            if candidate.len().abs_diff(missing.len()) > 2 {
                continue;
            }
            if let Some(score) = matcher.fuzzy_match(candidate, missing) {
                if best.map_or(true, |(top, _)| score > top) {
                    best = Some((score, candidate.as_str()));
                }
            }
        }
        best.map(|(_, name)| name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(text: &str) -> ValidationOutcome {
        IntegrityValidator::default().validate_text(text)
    }

    #[test]
    fn test_undefined_slots_in_document_order() {
        let outcome = validate(
            "classes:\n  Invoice:\n    slots: [id, amount]\n  Vendor:\n    slots: [id, name]\nslots:\n  amount:\n    range: float\n  name:\n    range: string\n",
        );
        assert!(!outcome.is_valid);
        let messages = outcome.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].starts_with("Class 'Invoice' references undefined slot 'id'."));
        assert!(messages[1].starts_with("Class 'Vendor' references undefined slot 'id'."));
    }

    #[test]
    fn test_missing_enum() {
        let outcome = validate("classes:\n  Task:\n    slots: [priority]\nslots:\n  priority:\n    range: PriorityEnum\n");
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(
            outcome.errors[0].kind,
            ValidationErrorKind::UndefinedEnum {
                slot: "priority".to_string(),
                range: "PriorityEnum".to_string(),
            }
        );
        assert!(outcome.errors[0].message.contains("'priority'"));
        assert!(outcome.errors[0].message.contains("'PriorityEnum'"));
    }

    #[test]
    fn test_ranges_that_are_not_enum_references() {
        let outcome = validate(
            "classes:\n  StatusEnum:\n    slots: [a]\nslots:\n  a:\n    range: StatusEnum\n  b:\n    range: Customer\n  c:\n    range: datetime\n  d:\n    description: no range\n",
        );
        // class-named range, non-conventional name, builtin, missing range
        assert!(outcome.is_valid, "{:?}", outcome.messages());
    }

    #[test]
    fn test_declared_enum_is_valid() {
        let outcome = validate("slots:\n  priority:\n    range: PriorityEnum\nenums:\n  PriorityEnum:\n    permissible_values:\n      low: {}\n");
        assert!(outcome.is_valid);
    }

    #[test]
    fn test_suggestion_for_typo() {
        let outcome = validate("classes:\n  Invoice:\n    slots: [amout]\nslots:\n  amount:\n    range: float\n");
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].message.ends_with("Did you mean 'amount'?"));
    }

    #[test]
    fn test_suggestions_can_be_disabled() {
        let config = ValidationConfig {
            suggest_similar: false,
            ..Default::default()
        };
        let outcome = IntegrityValidator::new(&config)
            .validate_text("classes:\n  Invoice:\n    slots: [amout]\nslots:\n  amount:\n    range: float\n");
        assert!(!outcome.errors[0].message.contains("Did you mean"));
    }

    #[test]
    fn test_unparseable_document_is_single_error() {
        let outcome = validate("classes: [unclosed\n");
        assert!(!outcome.is_valid);
        assert_eq!(outcome.errors.len(), 1);
        assert!(matches!(outcome.errors[0].kind, ValidationErrorKind::InvalidDocument { .. }));
        assert!(outcome.errors[0].message.starts_with("Invalid document"));
    }
}
