//! Consistency pipeline
//!
//! [`ConsistencyEngine`] bundles the resolver, validator, reporter and
//! repairer configured from one [`EngineConfig`], and sequences them the way
//! an orchestrator should before handing a schema to a code generator:
//!
//! ```text
//! dedupe -> parse/report -> validate -> (invalid?) repair -> validate
//! ```
//!
//! The engine holds only policy; every call works on its own document, so
//! one engine can be shared across threads.

use similar::TextDiff;
use tracing::info;

use crate::config::EngineConfig;
use crate::dedupe::{DedupeOutcome, DuplicateResolver, SlotRename};
use crate::repair::{AutoRepairer, RepairLogEntry, RepairOutcome};
use crate::report::ReportRecord;
use crate::validate::{IntegrityValidator, ValidationOutcome};

/// Configured engine exposing the four text operations
pub struct ConsistencyEngine {
    validator: IntegrityValidator,
    repairer: AutoRepairer,
    resolver: DuplicateResolver,
    enum_suffix: String,
}

impl Default for ConsistencyEngine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl ConsistencyEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            validator: IntegrityValidator::new(&config.validation),
            repairer: AutoRepairer::new(config.repair.clone()),
            resolver: DuplicateResolver::new(&config.dedupe),
            enum_suffix: config.validation.enum_suffix.clone(),
        }
    }

    pub fn validate(&self, text: &str) -> ValidationOutcome {
        self.validator.validate_text(text)
    }

    pub fn report(&self, text: &str) -> ReportRecord {
        ReportRecord::from_text(text, &self.enum_suffix)
    }

    pub fn repair(&self, text: &str) -> RepairOutcome {
        self.repairer.repair(text)
    }

    pub fn dedupe(&self, text: &str) -> DedupeOutcome {
        self.resolver.resolve(text)
    }

    /// Run the full sequence over one document
    pub fn process(&self, text: &str) -> PipelineOutcome {
        let deduped = self.dedupe(text);

        let report = self.report(&deduped.text);
        if let Some(counts) = report.report() {
            info!(
                classes = counts.class_count,
                slots_missing = counts.slots_missing,
                enums_missing = counts.enums_missing,
                "completeness report"
            );
        }

        let initial = self.validate(&deduped.text);
        let (final_text, repairs, validation) = if initial.is_valid {
            (deduped.text, Vec::new(), initial.clone())
        } else {
            let repaired = self.repair(&deduped.text);
            let validation = self.validate(&repaired.text);
            (repaired.text, repaired.log, validation)
        };

        info!(
            renamed = deduped.renames.len(),
            repaired = repairs.len(),
            valid = validation.is_valid,
            "pipeline finished"
        );

        PipelineOutcome {
            original: text.to_string(),
            text: final_text,
            renames: deduped.renames,
            report,
            initial,
            repairs,
            validation,
        }
    }
}

/// Everything one pipeline run produced
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub original: String,
    /// Final text: repaired if a repair ran, else the de-duplicated text
    pub text: String,
    pub renames: Vec<SlotRename>,
    /// Report over the de-duplicated text
    pub report: ReportRecord,
    /// Validation before repair
    pub initial: ValidationOutcome,
    pub repairs: Vec<RepairLogEntry>,
    /// Validation of the final text
    pub validation: ValidationOutcome,
}

impl PipelineOutcome {
    pub fn is_valid(&self) -> bool {
        self.validation.is_valid
    }

    pub fn changed(&self) -> bool {
        self.text != self.original
    }

    /// Unified diff from the original to the final text
    pub fn diff(&self) -> String {
        TextDiff::from_lines(&self.original, &self.text)
            .unified_diff()
            .context_radius(3)
            .header("original", "processed")
            .to_string()
    }
}
