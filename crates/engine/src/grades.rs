//! Wide-to-long grade expansion.
//!
//! The registry carries one-hot grade-applicability columns. They are
//! reshaped into an explicit (token, grade) relation; only a literal
//! boolean true makes a grade applicable.

use std::collections::HashSet;

use crate::model::{Deliverable, GradeAssignment};

/// Expand deliverables into (token, grade) pairs for every exact-true grade
/// flag. Deduplicated; empty when no grade columns exist.
pub fn expand(rows: &[Deliverable]) -> Vec<GradeAssignment> {
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    let mut relation = Vec::new();
    for d in rows {
        for (grade, flag) in &d.grade_flags {
            if *flag == Some(true) && seen.insert((d.token.as_str(), grade.as_str())) {
                relation.push(GradeAssignment {
                    token: d.token.clone(),
                    grade: grade.clone(),
                });
            }
        }
    }
    relation
}

/// Distinct grades present in the relation, in grade-column order (the order
/// pairs were emitted in).
pub fn available_grades(relation: &[GradeAssignment]) -> Vec<String> {
    let mut grades: Vec<String> = Vec::new();
    for a in relation {
        if !grades.contains(&a.grade) {
            grades.push(a.grade.clone());
        }
    }
    grades
}

/// Tokens applicable to at least one of the selected grades.
pub fn tokens_for_grades<'a>(
    relation: &'a [GradeAssignment],
    selected: &[String],
) -> HashSet<&'a str> {
    relation
        .iter()
        .filter(|a| selected.contains(&a.grade))
        .map(|a| a.token.as_str())
        .collect()
}

/// Tokens applicable to one specific grade.
pub fn tokens_for_grade<'a>(relation: &'a [GradeAssignment], grade: &str) -> HashSet<&'a str> {
    relation
        .iter()
        .filter(|a| a.grade == grade)
        .map(|a| a.token.as_str())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
