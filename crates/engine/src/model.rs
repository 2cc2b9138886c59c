use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Raw input
// ---------------------------------------------------------------------------

/// A raw delimited table as produced by the intake layer: a header row plus
/// string records. The engine never touches files itself.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub records: Vec<Vec<String>>,
}

impl RawTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Field value at (record, column), treating short records and empty
    /// fields as absent.
    pub fn value<'a>(&self, record: &'a [String], column: usize) -> Option<&'a str> {
        match record.get(column).map(String::as_str) {
            Some("") | None => None,
            Some(v) => Some(v),
        }
    }
}

// ---------------------------------------------------------------------------
// Normalized rows
// ---------------------------------------------------------------------------

/// One deliverable from the registry export.
#[derive(Debug, Clone)]
pub struct Deliverable {
    pub token: String,
    pub name: Option<String>,
    pub created: Option<NaiveDateTime>,
    pub modified: Option<NaiveDateTime>,
    pub deadline: Option<NaiveDateTime>,
    pub fiscal_year: Option<String>,
    pub month: Option<String>,
    pub stage: Option<String>,
    /// Grade-indicator flags in column order. `None` when the cell held
    /// anything but a literal boolean.
    pub grade_flags: Vec<(String, Option<bool>)>,
    /// Distinct-reviewer count, filled during enrichment. Zero reviews = 0.
    pub checker_count: u32,
    /// All original cells, keyed by column name (kept for export).
    pub raw_fields: BTreeMap<String, String>,
}

/// One review event from the header export, tied to a deliverable by token.
#[derive(Debug, Clone)]
pub struct ReviewRecord {
    pub token: String,
    pub stage: Option<String>,
    /// Reviewer identity. Consumed by the distinct-count computation and
    /// dropped before the join; never reaches any downstream table.
    pub reviewer: Option<String>,
    pub completed: Option<bool>,
    pub next_check: Option<bool>,
    pub created: Option<NaiveDateTime>,
    pub modified: Option<NaiveDateTime>,
    pub raw_fields: BTreeMap<String, String>,
}

/// Which optional columns a table actually carried. Metrics that depend on
/// an absent column degrade to zero/empty instead of failing.
#[derive(Debug, Clone, Default)]
pub struct ColumnPresence {
    pub name: bool,
    pub created: bool,
    pub modified: bool,
    pub deadline: bool,
    pub stage: bool,
    pub month: bool,
    pub fiscal_year: bool,
    pub reviewer: bool,
    pub completed: bool,
    pub next_check: bool,
    /// Grade-indicator columns found by naming convention (registry only).
    pub grade_columns: Vec<String>,
}

/// Both tables after normalization, before enrichment.
#[derive(Debug, Clone)]
pub struct NormalizedInput {
    pub registry: Vec<Deliverable>,
    pub reviews: Vec<ReviewRecord>,
    pub registry_columns: ColumnPresence,
    pub header_columns: ColumnPresence,
    /// Original column order of each table (the join preserves it).
    pub registry_headers: Vec<String>,
    pub header_headers: Vec<String>,
}

// ---------------------------------------------------------------------------
// Joined view
// ---------------------------------------------------------------------------

/// One review row inner-joined to its deliverable. Registry-side attributes
/// are carried alongside so the filter chain can run in lockstep on both
/// views.
#[derive(Debug, Clone)]
pub struct JoinedRow {
    pub token: String,
    pub stage: Option<String>,
    pub completed: Option<bool>,
    pub next_check: Option<bool>,
    /// Header-side modification date = completion date of the review.
    pub completed_at: Option<NaiveDateTime>,
    /// Registry-side deadline inherited by the review.
    pub deadline: Option<NaiveDateTime>,
    /// Registry-side creation date (date-range filters use this side).
    pub entity_created: Option<NaiveDateTime>,
    pub name: Option<String>,
    pub fiscal_year: Option<String>,
    pub month: Option<String>,
    pub checker_count: u32,
    /// Original cells from both sides. Colliding column names carry
    /// `_header` / `_registry` suffixes; the reviewer column is absent.
    pub raw_fields: BTreeMap<String, String>,
}

/// Fully joined, enriched dataset — the base every filter pass recomputes
/// from.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub registry: Vec<Deliverable>,
    pub joined: Vec<JoinedRow>,
    /// Column order of the joined view (header columns first, then registry
    /// columns, suffixed where they collide, reviewer removed).
    pub joined_columns: Vec<String>,
    pub registry_columns: ColumnPresence,
    pub header_columns: ColumnPresence,
    /// Review rows with no matching deliverable (excluded from `joined`).
    pub unmatched_reviews: usize,
}

// ---------------------------------------------------------------------------
// Grade relation
// ---------------------------------------------------------------------------

/// One (deliverable, grade) pair from the wide-to-long grade expansion.
/// Only exact-true flags produce a pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradeAssignment {
    pub token: String,
    pub grade: String,
}
