//! End-to-end tests for the consistency engine
//!
//! Exercises the four text operations and the pipeline against YAML fixtures.

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use schema_doctor::{
    dedupe, repair, report, validate, ConsistencyEngine, ReportRecord, SchemaDocument,
    ValidationErrorKind,
};

const INVOICE: &str = include_str!("fixtures/invoice_missing_id.yaml");
const DUPLICATE_STATUS: &str = include_str!("fixtures/duplicate_status.yaml");
const MISSING_ENUM: &str = include_str!("fixtures/missing_enum.yaml");
const LLM_DRAFT: &str = include_str!("fixtures/llm_draft.yaml");

// =============================================================================
// Validation and repair
// =============================================================================

#[test]
fn test_missing_identifier_is_reported_then_repaired() {
    let (valid, errors) = validate(INVOICE);
    assert!(!valid);
    assert_eq!(errors.len(), 2);
    assert!(errors[0].starts_with("Class 'Invoice' references undefined slot 'id'."));
    assert!(errors[1].starts_with("Class 'Vendor' references undefined slot 'id'."));

    let (repaired, log) = repair(INVOICE);
    assert_eq!(log.len(), 1);
    assert!(log[0].contains("'id'"));
    assert!(log[0].contains("Invoice"));
    assert!(log[0].contains("Vendor"));

    let doc = SchemaDocument::parse(&repaired).unwrap();
    let id = &doc.slots["id"];
    assert_eq!(id.range.as_deref(), Some("string"));
    assert!(id.is_identifier());
    assert!(id.is_required());

    assert_eq!(validate(&repaired), (true, Vec::new()));
}

#[test]
fn test_repair_keeps_top_level_layout() {
    let (repaired, _) = repair(INVOICE);
    let id_at = repaired.find("id: ").unwrap();
    let name_at = repaired.find("name: billing").unwrap();
    let classes_at = repaired.find("classes:").unwrap();
    let slots_at = repaired.find("slots:\n  amount:").unwrap();
    assert!(id_at < name_at && name_at < classes_at && classes_at < slots_at);
    let doc = SchemaDocument::parse(&repaired).unwrap();
    assert_eq!(
        doc.classes["Invoice"].extra["description"].as_str(),
        Some("A bill sent to a customer")
    );
}

#[test]
fn test_repair_is_additive_and_idempotent() {
    let original = SchemaDocument::parse(INVOICE).unwrap();
    let (once, _) = repair(INVOICE);
    let (twice, second_log) = repair(&once);

    assert_eq!(twice, once);
    assert!(second_log.is_empty());

    let repaired = SchemaDocument::parse(&once).unwrap();
    for (name, def) in &original.slots {
        assert_eq!(repaired.slots.get(name), Some(def), "slot '{}' changed", name);
    }
}

#[test]
fn test_catalog_slot_needs_two_classes() {
    let single = "classes:\n  A:\n    slots: [name]\nslots: {}\n";
    let (text, log) = repair(single);
    assert_eq!(text, single);
    assert!(log.is_empty());

    let shared = "classes:\n  A:\n    slots: [name]\n  B:\n    slots: [name]\nslots: {}\n";
    let (text, log) = repair(shared);
    assert_eq!(log.len(), 1);
    let doc = SchemaDocument::parse(&text).unwrap();
    assert_eq!(doc.slots["name"].range.as_deref(), Some("string"));
    assert_eq!(doc.slots["name"].required, Some(false));
}

#[test]
fn test_missing_enum_reported_once() {
    let outcome = ConsistencyEngine::default().validate(MISSING_ENUM);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(
        outcome.errors[0].kind,
        ValidationErrorKind::UndefinedEnum {
            slot: "priority".to_string(),
            range: "PriorityEnum".to_string(),
        }
    );

    let ReportRecord::Report(counts) = report(MISSING_ENUM) else {
        panic!("expected counts");
    };
    assert_eq!(counts.enums_referenced, 1);
    assert_eq!(counts.enums_missing, 1);
    assert_eq!(counts.slots_missing, 0);
}

#[test]
fn test_report_error_record() {
    let record = report("classes: [A]\n");
    assert!(matches!(record, ReportRecord::Error { .. }));
    let json = record.to_json().unwrap();
    assert!(json.contains("\"error\""));
}

// =============================================================================
// Duplicate resolution
// =============================================================================

#[test]
fn test_duplicate_status_renamed_for_second_owner() {
    let expected = "\
# Support desk model drafted by the assistant
classes:
  Order:
    slots:
      - id
      - status
  Ticket:
    slots:
      - id
      - ticket_status
slots:
  id:
    range: string
    identifier: true
  status:
    range: string
    description: Fulfilment state of an order
  # ticket lifecycle
  ticket_status:
    range: string
    description: Resolution state of a ticket
enums: {}
";
    assert_eq!(dedupe(DUPLICATE_STATUS), expected);
    assert_eq!(validate(expected), (true, Vec::new()));
}

#[test]
fn test_raw_duplicates_read_last_definition() {
    assert_eq!(validate(DUPLICATE_STATUS), (true, Vec::new()));

    let ReportRecord::Report(counts) = report(DUPLICATE_STATUS) else {
        panic!("expected counts");
    };
    assert_eq!(counts.slots_defined, 2);
    assert_eq!(counts.slots_referenced, 2);
    assert_eq!(counts.slots_missing, 0);

    let doc = SchemaDocument::parse(DUPLICATE_STATUS).unwrap();
    assert_eq!(
        doc.slots["status"].description.as_deref(),
        Some("Resolution state of a ticket")
    );
}

#[test]
fn test_imperfect_attributes_do_not_hide_findings() {
    let text = "\
classes:
  Task:
    slots: [id, priority]
  Board:
    slots: status
slots:
  priority:
    range: PriorityEnum
    required: yes
  weight:
    range: 5
";
    let outcome = ConsistencyEngine::default().validate(text);
    assert_eq!(outcome.errors.len(), 3);
    assert!(outcome.errors.iter().any(|e| e.kind
        == ValidationErrorKind::UndefinedSlot {
            class: "Board".to_string(),
            slot: "status".to_string(),
        }));
    assert!(outcome.errors.iter().any(|e| e.kind
        == ValidationErrorKind::UndefinedEnum {
            slot: "priority".to_string(),
            range: "PriorityEnum".to_string(),
        }));

    let ReportRecord::Report(counts) = report(text) else {
        panic!("expected counts");
    };
    assert_eq!(counts.enums_missing, 1);
    assert_eq!(counts.slots_missing, 2);

    let (repaired, log) = repair(text);
    assert_eq!(log.len(), 1);
    let doc = SchemaDocument::parse(&repaired).unwrap();
    assert!(doc.slots["id"].is_identifier());
    assert_eq!(doc.slots["priority"].required, Some(true));
}

#[test]
fn test_dedupe_without_duplicates_is_identical() {
    assert_eq!(dedupe(INVOICE), INVOICE);
    assert_eq!(dedupe(MISSING_ENUM), MISSING_ENUM);
}

// =============================================================================
// Full pipeline
// =============================================================================

#[test]
fn test_pipeline_on_llm_draft() {
    let outcome = ConsistencyEngine::default().process(LLM_DRAFT);

    let renames: Vec<_> = outcome
        .renames
        .iter()
        .map(|r| (r.original.as_str(), r.renamed.as_str()))
        .collect();
    assert_eq!(renames, vec![("status", "lead_status")]);

    let counts = outcome.report.report().expect("deduplicated draft parses");
    assert_eq!(counts.class_count, 3);
    assert_eq!(counts.missing_slots, vec!["created_at", "description", "id", "name"]);

    assert!(!outcome.initial.is_valid);
    let added: Vec<_> = outcome.repairs.iter().filter_map(|e| e.slot.as_deref()).collect();
    assert_eq!(added, vec!["id", "name", "description", "created_at"]);

    assert!(outcome.is_valid(), "{:?}", outcome.validation.messages());
    let doc = SchemaDocument::parse(&outcome.text).unwrap();
    assert_eq!(doc.classes["Lead"].slots[3], "lead_status");
    assert_eq!(doc.classes["Customer"].slots[2], "status");
    assert_eq!(doc.slots["lead_status"].range.as_deref(), Some("LeadStatusEnum"));
    assert!(outcome.text.contains("prefixes:"));
    assert!(outcome.diff().contains("lead_status"));
}

// =============================================================================
// Properties
// =============================================================================

fn render_document(classes: &[(String, Vec<String>)], slots: &[String]) -> String {
    let mut text = String::from("classes:\n");
    for (name, refs) in classes {
        text.push_str(&format!("  {}:\n    slots:\n", name));
        for slot in refs {
            text.push_str(&format!("      - {}\n", slot));
        }
    }
    text.push_str("slots:\n");
    for slot in slots {
        text.push_str(&format!("  {}:\n    range: string\n", slot));
    }
    text
}

fn slot_name() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["id", "status", "name", "kind"]).prop_map(String::from)
}

proptest! {
    #[test]
    fn prop_dedupe_preserves_line_count(text in "[a-z_ :#\\-\\[\\],\n\r]{0,400}") {
        let out = dedupe(&text);
        prop_assert_eq!(out.lines().count(), text.lines().count());
    }

    #[test]
    fn prop_dedupe_keeps_canonical_lines(
        classes in prop::collection::vec(("[A-Z][a-z]{0,6}", prop::collection::vec(slot_name(), 0..4)), 0..4),
        slots in prop::collection::vec(slot_name(), 1..8),
    ) {
        let text = render_document(&classes, &slots);
        let out = dedupe(&text);
        let before: Vec<&str> = text.lines().collect();
        let after: Vec<&str> = out.lines().collect();
        prop_assert_eq!(before.len(), after.len());

        let slots_start = before.iter().position(|l| *l == "slots:").unwrap();
        let mut seen = std::collections::HashSet::new();
        for (index, line) in before.iter().enumerate().skip(slots_start) {
            if line.starts_with("  ") && !line.starts_with("    ") && seen.insert(*line) {
                prop_assert_eq!(after[index], *line);
            }
        }
    }

    #[test]
    fn prop_dedupe_without_duplicates_is_identity(
        classes in prop::collection::vec(("[A-Z][a-z]{0,6}", prop::collection::vec("[a-z]{1,8}", 0..4)), 0..4),
        slots in prop::collection::btree_set("[a-z]{1,8}", 0..6),
    ) {
        let slots: Vec<String> = slots.into_iter().collect();
        let text = render_document(&classes, &slots);
        prop_assert_eq!(dedupe(&text), text);
    }
}
