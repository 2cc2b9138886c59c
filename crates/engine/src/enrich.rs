//! Enrichment and the primary join.
//!
//! Computes distinct-checker counts per token, left-joins them onto the
//! registry (missing counts fill to 0), then inner-joins the review headers
//! to the enriched registry. The reviewer identity is consumed by the count
//! and dropped before the join — it never appears downstream.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::config::AnalysisConfig;
use crate::model::{Dataset, JoinedRow, NormalizedInput, ReviewRecord};

pub const HEADER_SUFFIX: &str = "_header";
pub const REGISTRY_SUFFIX: &str = "_registry";

/// Distinct reviewer identities per token. Tokens with no review rows are
/// simply absent; callers fill 0.
pub fn checker_counts(reviews: &[ReviewRecord]) -> BTreeMap<String, u32> {
    let mut per_token: BTreeMap<String, HashSet<&str>> = BTreeMap::new();
    for r in reviews {
        let reviewers = per_token.entry(r.token.clone()).or_default();
        if let Some(ref who) = r.reviewer {
            reviewers.insert(who.as_str());
        }
    }
    per_token
        .into_iter()
        .map(|(token, reviewers)| (token, reviewers.len() as u32))
        .collect()
}

/// Build the enriched, joined dataset from normalized input.
pub fn build_dataset(config: &AnalysisConfig, mut input: NormalizedInput) -> Dataset {
    let counts = checker_counts(&input.reviews);
    for d in &mut input.registry {
        d.checker_count = counts.get(&d.token).copied().unwrap_or(0);
    }

    let joined_columns = joined_columns(config, &input.header_headers, &input.registry_headers);

    // First occurrence wins; tokens are unique by contract, this is a tie
    // break for malformed input.
    let mut by_token: HashMap<&str, usize> = HashMap::new();
    for (i, d) in input.registry.iter().enumerate() {
        by_token.entry(d.token.as_str()).or_insert(i);
    }

    let collisions = collision_set(config, &input.header_headers, &input.registry_headers);
    let c = &config.columns;

    let mut joined = Vec::new();
    let mut unmatched_reviews = 0usize;
    for review in &input.reviews {
        let Some(&entity_idx) = by_token.get(review.token.as_str()) else {
            unmatched_reviews += 1;
            continue;
        };
        let entity = &input.registry[entity_idx];

        let mut raw_fields: BTreeMap<String, String> = BTreeMap::new();
        for (k, v) in &review.raw_fields {
            if k == &c.reviewer {
                continue;
            }
            let key = if k == &c.header_token {
                c.token.clone()
            } else if collisions.contains(k.as_str()) {
                format!("{k}{HEADER_SUFFIX}")
            } else {
                k.clone()
            };
            raw_fields.insert(key, v.clone());
        }
        for (k, v) in &entity.raw_fields {
            if k == &c.token {
                continue;
            }
            let key = if collisions.contains(k.as_str()) {
                format!("{k}{REGISTRY_SUFFIX}")
            } else {
                k.clone()
            };
            raw_fields.insert(key, v.clone());
        }

        joined.push(JoinedRow {
            token: review.token.clone(),
            stage: review.stage.clone().or_else(|| entity.stage.clone()),
            completed: review.completed,
            next_check: review.next_check,
            completed_at: review.modified,
            deadline: entity.deadline,
            entity_created: entity.created,
            name: entity.name.clone(),
            fiscal_year: entity.fiscal_year.clone(),
            month: entity.month.clone().or_else(|| {
                // Month lives on the registry side in practice; keep the
                // header-side value only when the registry has none.
                review.raw_fields.get(&c.month).filter(|v| !v.is_empty()).cloned()
            }),
            checker_count: entity.checker_count,
            raw_fields,
        });
    }

    Dataset {
        registry: input.registry,
        joined,
        joined_columns,
        registry_columns: input.registry_columns,
        header_columns: input.header_columns,
        unmatched_reviews,
    }
}

/// Column names shared by both tables after the foreign-key rename,
/// excluding the join key itself.
fn collision_set<'a>(
    config: &AnalysisConfig,
    header_headers: &'a [String],
    registry_headers: &'a [String],
) -> BTreeSet<&'a str> {
    let c = &config.columns;
    let registry_set: BTreeSet<&str> = registry_headers.iter().map(String::as_str).collect();
    header_headers
        .iter()
        .map(String::as_str)
        .filter(|h| *h != c.header_token && *h != c.token && *h != c.reviewer)
        .filter(|h| registry_set.contains(h))
        .collect()
}

/// Column order of the joined view: header columns first (foreign key
/// renamed to the canonical token, reviewer removed), then registry columns,
/// suffix-disambiguated where they collide.
fn joined_columns(
    config: &AnalysisConfig,
    header_headers: &[String],
    registry_headers: &[String],
) -> Vec<String> {
    let c = &config.columns;
    let collisions = collision_set(config, header_headers, registry_headers);

    let mut columns = Vec::new();
    for h in header_headers {
        if h == &c.reviewer {
            continue;
        }
        if h == &c.header_token {
            columns.push(c.token.clone());
        } else if collisions.contains(h.as_str()) {
            columns.push(format!("{h}{HEADER_SUFFIX}"));
        } else {
            columns.push(h.clone());
        }
    }
    for r in registry_headers {
        if r == &c.token {
            continue;
        }
        if collisions.contains(r.as_str()) {
            columns.push(format!("{r}{REGISTRY_SUFFIX}"));
        } else {
            columns.push(r.clone());
        }
    }
    columns
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
