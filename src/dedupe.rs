//! Duplicate Slot Resolution
//!
//! The slot table is a single flat namespace, so two classes that each
//! declare their own `status` collide and a structural parse would keep
//! only one. The resolver works on the lossless line tree instead, keeping
//! comments and layout intact:
//!
//! 1. **Detect**: one-level entries under the top-level `slots:` block,
//!    grouped by name; names seen more than once are duplicates
//! 2. **Ownership**: for each class block under `classes:`, the slot names
//!    listed in its `slots:` sub-block
//! 3. **Assign**: the first occurrence stays canonical; occurrence *k* is
//!    renamed `{class_k}_{slot}` after the *k*-th referencing class, or
//!    `{slot}_{k+1}` when there is no such class
//! 4. **Rewrite**: splice each new name over the definition key
//! 5. **Propagate**: rewrite class references to the variant derived from
//!    that class, or to an ownerless variant whose name contains the class
//!    name
//!
//! Propagation only falls back to name containment for ownerless
//! (`{slot}_{k}`) variants. Matching every variant by containment would send
//! `Order`'s reference to `purchaseorder_status`, the variant derived from
//! `PurchaseOrder`.
//!
//! Owners are assigned by position, not by proximity: when the definitions
//! appear in a different order from the referencing classes, the second
//! definition is still named after the second referencing class.
//!
//! Every edit replaces a span on an existing line, so the line count never
//! changes and text without duplicates comes back byte-identical.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::DedupeConfig;
use crate::syntax::{Edit, LineKind, SourceDocument, Span};

/// One renamed definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotRename {
    /// One-based line number of the definition
    pub line: usize,
    pub original: String,
    pub renamed: String,
    /// Class the new name was derived from, if any
    pub owner: Option<String>,
}

/// Resolved text and the renames applied to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupeOutcome {
    pub text: String,
    pub renames: Vec<SlotRename>,
}

impl DedupeOutcome {
    pub fn changed(&self) -> bool {
        !self.renames.is_empty()
    }
}

/// A slot name listed by a class
#[derive(Debug)]
struct Reference {
    slot: String,
    line: usize,
    span: Span,
}

#[derive(Debug)]
struct ClassBlock {
    name: String,
    references: Vec<Reference>,
}

impl ClassBlock {
    fn references_slot(&self, slot: &str) -> bool {
        self.references.iter().any(|r| r.slot == slot)
    }
}

#[derive(Debug)]
struct PendingRename {
    line: usize,
    key: Span,
    original: String,
    renamed: String,
    owner: Option<String>,
}

/// Line-level duplicate slot resolver
#[derive(Debug, Clone)]
pub struct DuplicateResolver {
    indent_width: usize,
}

impl Default for DuplicateResolver {
    fn default() -> Self {
        Self::new(&DedupeConfig::default())
    }
}

impl DuplicateResolver {
    pub fn new(config: &DedupeConfig) -> Self {
        Self {
            indent_width: config.indent_width.max(1),
        }
    }

    /// Rename colliding slot definitions; returns only the text
    pub fn dedupe(&self, text: &str) -> String {
        self.resolve(text).text
    }

    pub fn resolve(&self, text: &str) -> DedupeOutcome {
        let mut source = SourceDocument::parse(text);

        let duplicates = self.find_duplicates(&source);
        if duplicates.is_empty() {
            return DedupeOutcome {
                text: text.to_string(),
                renames: Vec::new(),
            };
        }

        let classes = self.discover_classes(&source);
        let pending = assign_renames(&duplicates, &classes);

        let mut edits: Vec<Edit> = pending
            .iter()
            .map(|rename| Edit {
                line: rename.line,
                span: rename.key,
                replacement: rename.renamed.clone(),
            })
            .collect();
        edits.extend(propagate(&pending, &classes));
        source.apply(edits);

        info!(
            duplicates = duplicates.len(),
            renamed = pending.len(),
            "resolved duplicate slot definitions"
        );

        DedupeOutcome {
            text: source.render(),
            renames: pending
                .into_iter()
                .map(|rename| SlotRename {
                    line: rename.line + 1,
                    original: rename.original,
                    renamed: rename.renamed,
                    owner: rename.owner,
                })
                .collect(),
        }
    }

    /// Phase 1: slot name -> definition header lines, duplicates only
    fn find_duplicates(&self, source: &SourceDocument) -> IndexMap<String, Vec<(usize, Span)>> {
        let mut occurrences: IndexMap<String, Vec<(usize, Span)>> = IndexMap::new();
        let Some(section) = source.top_level_section("slots") else {
            return occurrences;
        };

        for index in section {
            let line = &source.lines()[index];
            if line.indent() != self.indent_width {
                continue;
            }
            if let Some(key) = line.key_span() {
                let name = key.slice(line.content()).to_string();
                occurrences.entry(name).or_default().push((index, key));
            }
        }

        occurrences.retain(|name, lines| {
            let duplicated = lines.len() > 1;
            if duplicated {
                debug!(slot = %name, count = lines.len(), "duplicate slot definition");
            }
            duplicated
        });
        occurrences
    }

    /// Phase 2: class blocks and the slot names each one lists
    fn discover_classes(&self, source: &SourceDocument) -> Vec<ClassBlock> {
        let mut blocks = Vec::new();
        let Some(section) = source.top_level_section("classes") else {
            return blocks;
        };

        let mut index = section.start;
        while index < section.end {
            let line = &source.lines()[index];
            match line.key() {
                Some(name) if line.indent() == self.indent_width => {
                    let end = source.block_end(index, self.indent_width).min(section.end);
                    blocks.push(ClassBlock {
                        name: name.to_string(),
                        references: self.collect_references(source, index + 1, end),
                    });
                    index = end;
                }
                _ => index += 1,
            }
        }
        blocks
    }

    fn collect_references(
        &self,
        source: &SourceDocument,
        start: usize,
        end: usize,
    ) -> Vec<Reference> {
        let lines = source.lines();
        let list_indent = self.indent_width * 2;
        let mut references = Vec::new();

        let mut index = start;
        while index < end {
            let line = &lines[index];
            index += 1;
            if line.indent() != list_indent || line.key() != Some("slots") {
                continue;
            }

            // slots: [a, b]
            if let Some(items) = line.flow_items() {
                references.extend(items.into_iter().map(|span| Reference {
                    slot: span.slice(line.content()).to_string(),
                    line: index - 1,
                    span,
                }));
                continue;
            }

            // block sequence, nested one level or indentless
            while index < end {
                let item = &lines[index];
                if !item.is_significant() {
                    index += 1;
                    continue;
                }
                if item.indent() < list_indent {
                    break;
                }
                match item.kind() {
                    LineKind::Item { value } => {
                        if let Some(span) = value {
                            references.push(Reference {
                                slot: span.slice(item.content()).to_string(),
                                line: index,
                                span: *span,
                            });
                        }
                        index += 1;
                    }
                    _ => break,
                }
            }
        }
        references
    }
}

/// Phase 3: positional owner assignment
fn assign_renames(
    duplicates: &IndexMap<String, Vec<(usize, Span)>>,
    classes: &[ClassBlock],
) -> Vec<PendingRename> {
    let mut pending = Vec::new();

    for (slot, occurrences) in duplicates {
        let owners: Vec<&str> = classes
            .iter()
            .filter(|class| class.references_slot(slot))
            .map(|class| class.name.as_str())
            .collect();

        for (k, (line, key)) in occurrences.iter().enumerate().skip(1) {
            let (renamed, owner) = match owners.get(k) {
                Some(owner) => (
                    format!("{}_{}", owner.to_lowercase(), slot),
                    Some(owner.to_string()),
                ),
                None => (format!("{}_{}", slot, k + 1), None),
            };
            debug!(slot = %slot, line = line + 1, renamed = %renamed, "renaming duplicate slot");
            pending.push(PendingRename {
                line: *line,
                key: *key,
                original: slot.clone(),
                renamed,
                owner,
            });
        }
    }
    pending
}

/// Phase 5: point each class at the variant carrying its own name
fn propagate(pending: &[PendingRename], classes: &[ClassBlock]) -> Vec<Edit> {
    let mut edits = Vec::new();

    for class in classes {
        let lowered = class.name.to_lowercase();
        for reference in &class.references {
            let variants: Vec<&PendingRename> = pending
                .iter()
                .filter(|rename| rename.original == reference.slot)
                .collect();
            if variants.is_empty() {
                continue;
            }

            // a variant derived from another class never applies here
            let chosen = variants
                .iter()
                .find(|rename| rename.owner.as_deref() == Some(class.name.as_str()))
                .or_else(|| {
                    variants.iter().find(|rename| {
                        rename.owner.is_none() && rename.renamed.to_lowercase().contains(&lowered)
                    })
                });

            if let Some(rename) = chosen {
                debug!(
                    class = %class.name,
                    slot = %reference.slot,
                    renamed = %rename.renamed,
                    "rewriting class reference"
                );
                edits.push(Edit {
                    line: reference.line,
                    span: reference.span,
                    replacement: rename.renamed.clone(),
                });
            }
        }
    }
    edits
}
