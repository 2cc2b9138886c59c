//! Reference enumerations for the two ordered domains (publication month,
//! process stage) and the observed-subset orderings derived from them.

use serde::Serialize;

/// Publication months in fiscal order (April first), with a trailing
/// catch-all.
pub const MONTH_ORDER: [&str; 13] = [
    "4月号", "5月号", "6月号", "7月号", "8月号", "9月号", "10月号", "11月号", "12月号", "1月号",
    "2月号", "3月号", "その他",
];

/// Process stages in workflow order, with a trailing catch-all. The raw list
/// may repeat labels; `stage_reference()` deduplicates preserving first
/// occurrence.
const STAGE_ORDER_RAW: [&str; 21] = [
    "仮台割",
    "入稿前ラフ",
    "入稿原稿",
    "組版原稿",
    "初校",
    "再校",
    "再校2",
    "再校3",
    "色校",
    "色校2",
    "色校3",
    "念校",
    "念校2",
    "念校3",
    "α1版",
    "β1版",
    "β2版",
    "β3版",
    "β4版",
    "β5版",
    "その他",
];

/// Stage reference list, deduplicated preserving first occurrence.
pub fn stage_reference() -> Vec<&'static str> {
    let mut seen: Vec<&'static str> = Vec::with_capacity(STAGE_ORDER_RAW.len());
    for stage in STAGE_ORDER_RAW {
        if !seen.contains(&stage) {
            seen.push(stage);
        }
    }
    seen
}

/// Substrings marking a stage as a rework (corrective) pass rather than an
/// initial one.
const REWORK_MARKERS: [&str; 5] = ["再校", "念校", "色校", "α", "β"];

/// Whether a stage label denotes a rework pass.
pub fn is_rework_label(label: &str) -> bool {
    REWORK_MARKERS.iter().any(|m| label.contains(m))
}

// ---------------------------------------------------------------------------
// Effective ordering
// ---------------------------------------------------------------------------

/// A reference ordering restricted to the values actually observed in the
/// current dataset: relative order preserved, unobserved values dropped.
/// Downstream sorts, tab orders and scaffolds all consume this.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EffectiveOrder {
    labels: Vec<String>,
}

impl EffectiveOrder {
    /// Intersect a reference list with the observed values, keeping
    /// reference-relative order.
    pub fn from_observed<'a, 'b, R, O>(reference: R, observed: O) -> Self
    where
        R: IntoIterator<Item = &'a str>,
        O: IntoIterator<Item = &'b str>,
    {
        let observed: Vec<&str> = observed.into_iter().collect();
        let labels = reference
            .into_iter()
            .filter(|r| observed.contains(r))
            .map(str::to_string)
            .collect();
        Self { labels }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn position(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Restrict further to another observed subset (e.g. stages surviving
    /// the filter chain), still preserving order.
    pub fn restrict_to<'a, O>(&self, observed: O) -> Self
    where
        O: IntoIterator<Item = &'a str>,
    {
        Self::from_observed(self.labels.iter().map(String::as_str), observed)
    }

    /// Labels flagged as rework passes.
    pub fn rework_labels(&self) -> Vec<String> {
        self.labels
            .iter()
            .filter(|l| is_rework_label(l))
            .cloned()
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
