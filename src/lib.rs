//! Schema Doctor
//!
//! A consistency engine for LLM-authored data-modeling schemas (classes,
//! slots and enums in an indentation-structured YAML document) that runs
//! before the schema is handed to a code generator.
//!
//! ## Features
//!
//! - **Integrity Validation**: undefined slot and enum references
//! - **Completeness Reporting**: referenced vs. defined counts, valid or not
//! - **Auto-Repair**: additive synthesis of commonly omitted slots
//! - **Duplicate Resolution**: in-place renaming of colliding slot
//!   definitions that keeps comments and layout
//!
//! ## Architecture
//!
//! ```text
//! text ─► dedupe (syntax) ─► document ─► validate ─┬─► valid
//!                                 │                └─► repair ─► validate
//!                                 └─► report
//! ```
//!
//! The engine is pure: no I/O, no global state. Every operation takes the
//! document text and returns a value; unparseable text is reported, never
//! raised.

pub mod config;
pub mod dedupe;
pub mod document;
pub mod error;
pub mod pipeline;
pub mod repair;
pub mod report;
pub mod syntax;
pub mod validate;

pub use config::{
    CatalogSlot, DedupeConfig, EngineConfig, IdentifierSlot, RepairConfig, ValidationConfig,
};
pub use dedupe::{DedupeOutcome, DuplicateResolver, SlotRename};
pub use document::{ClassDef, EnumDef, SchemaDocument, SlotDef};
pub use error::{Result, SchemaError};
pub use pipeline::{ConsistencyEngine, PipelineOutcome};
pub use repair::{AutoRepairer, RepairLogEntry, RepairOutcome};
pub use report::{CompletenessReport, ReportRecord};
pub use validate::{
    IntegrityValidator, ValidationError, ValidationErrorKind, ValidationOutcome,
};

/// Validate with the default policy: `(is_valid, messages)`
pub fn validate(text: &str) -> (bool, Vec<String>) {
    ConsistencyEngine::default().validate(text).into_parts()
}

/// Completeness counts, or `{error}` for unparseable text
pub fn report(text: &str) -> ReportRecord {
    ConsistencyEngine::default().report(text)
}

/// Repair with the default policy: `(text, log descriptions)`
pub fn repair(text: &str) -> (String, Vec<String>) {
    ConsistencyEngine::default().repair(text).into_parts()
}

/// Rename duplicate slot definitions
pub fn dedupe(text: &str) -> String {
    ConsistencyEngine::default().dedupe(text).text
}
