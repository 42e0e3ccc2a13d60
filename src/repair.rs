//! Auto-Repair
//!
//! Synthesizes slot definitions that LLM-authored drafts routinely omit:
//! - the identifier slot, once any class references it
//! - catalog slots (name, description, timestamps), once enough distinct
//!   classes reference them
//!
//! Repair is strictly additive. Existing declarations are never renamed or
//! removed, and a second pass over repaired text finds nothing to do.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::RepairConfig;
use crate::document::{SchemaDocument, SlotDef};
use crate::error::{Result, SchemaError};

/// One synthesized slot, or a note that repair was skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairLogEntry {
    /// The synthesized slot; `None` when repair was skipped
    pub slot: Option<String>,
    /// Classes whose references motivated the addition
    pub classes: Vec<String>,
    pub description: String,
}

impl RepairLogEntry {
    fn added(slot: &str, classes: &[&str]) -> Self {
        let noun = if classes.len() == 1 { "class" } else { "classes" };
        Self {
            slot: Some(slot.to_string()),
            classes: classes.iter().map(|c| c.to_string()).collect(),
            description: format!(
                "Added missing slot '{}' referenced by {} {}: {}",
                slot,
                classes.len(),
                noun,
                classes.join(", ")
            ),
        }
    }

    fn skipped(error: &SchemaError) -> Self {
        Self {
            slot: None,
            classes: Vec::new(),
            description: format!("Skipped repair: document could not be parsed ({})", error),
        }
    }
}

/// Repaired (or untouched) text and what was done to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairOutcome {
    pub text: String,
    pub log: Vec<RepairLogEntry>,
}

impl RepairOutcome {
    fn unchanged(text: &str, log: Vec<RepairLogEntry>) -> Self {
        Self {
            text: text.to_string(),
            log,
        }
    }

    /// Number of slot definitions added
    pub fn added(&self) -> usize {
        self.log.iter().filter(|entry| entry.slot.is_some()).count()
    }

    /// `(text, log descriptions)`
    pub fn into_parts(self) -> (String, Vec<String>) {
        let log = self.log.into_iter().map(|entry| entry.description).collect();
        (self.text, log)
    }
}

/// Frequency-driven repairer
#[derive(Debug, Clone, Default)]
pub struct AutoRepairer {
    config: RepairConfig,
}

impl AutoRepairer {
    pub fn new(config: RepairConfig) -> Self {
        Self { config }
    }

    /// Repair document text. Never fails: unparseable text comes back
    /// unchanged with a single explanatory log entry.
    pub fn repair(&self, text: &str) -> RepairOutcome {
        let mut document = match SchemaDocument::parse(text) {
            Ok(document) => document,
            Err(e) => {
                warn!(error = %e, "document could not be parsed for repair");
                return RepairOutcome::unchanged(text, vec![RepairLogEntry::skipped(&e)]);
            }
        };

        let repaired = self
            .repair_document(&mut document)
            .and_then(|log| Ok((document.to_yaml()?, log)));

        match repaired {
            Ok((_, log)) if log.is_empty() => RepairOutcome::unchanged(text, log),
            Ok((repaired, log)) => {
                info!(added = log.len(), "repaired document");
                RepairOutcome {
                    text: repaired,
                    log,
                }
            }
            Err(e) => {
                warn!(error = %e, "repaired document could not be serialized");
                RepairOutcome::unchanged(text, vec![RepairLogEntry::skipped(&e)])
            }
        }
    }

    /// Add missing definitions to an already-parsed document
    pub fn repair_document(&self, document: &mut SchemaDocument) -> Result<Vec<RepairLogEntry>> {
        let candidates = self.missing_definitions(document);
        let mut log = Vec::with_capacity(candidates.len());

        for (name, def, classes) in candidates {
            debug!(slot = %name, classes = ?classes, "synthesizing slot definition");
            let refs: Vec<&str> = classes.iter().map(String::as_str).collect();
            log.push(RepairLogEntry::added(&name, &refs));
            document.add_slot(&name, def)?;
        }
        Ok(log)
    }

    /// Slots to synthesize, in policy order: identifier first, then catalog
    fn missing_definitions(
        &self,
        document: &SchemaDocument,
    ) -> Vec<(String, SlotDef, Vec<String>)> {
        let references = document.slot_references();
        let mut missing: Vec<(String, SlotDef, Vec<String>)> = Vec::new();

        let mut consider = |name: &str, threshold: usize, def: SlotDef| {
            let Some(classes) = references.get(name) else {
                return;
            };
            if classes.len() < threshold.max(1) || document.slots.contains_key(name) {
                return;
            }
            if missing.iter().any(|(existing, _, _)| existing == name) {
                return;
            }
            let classes = classes.iter().map(|c| c.to_string()).collect();
            missing.push((name.to_string(), def, classes));
        };

        let identifier = &self.config.identifier;
        consider(
            &identifier.name,
            identifier.min_references,
            SlotDef {
                description: Some(identifier.description.clone()),
                range: Some(identifier.range.clone()),
                identifier: Some(true),
                required: Some(true),
                ..Default::default()
            },
        );

        for entry in &self.config.catalog {
            consider(
                &entry.name,
                self.config.catalog_min_references,
                SlotDef {
                    description: Some(entry.description.clone()),
                    range: Some(entry.range.clone()),
                    required: Some(false),
                    ..Default::default()
                },
            );
        }

        missing
    }
}
