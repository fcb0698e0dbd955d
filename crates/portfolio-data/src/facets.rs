//! FI facet frequencies and section filtering.

use std::collections::HashMap;

use portfolio_core::models::{FacetCount, FacetLevel, PatentRecord};

/// How many records carry each value at `level`.
///
/// A record counts once per distinct value, however many of its codes share
/// it. Sorted by count descending, then value ascending.
pub fn facet_frequencies(records: &[PatentRecord], level: FacetLevel) -> Vec<FacetCount> {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for record in records {
        for value in record.facets().level(level) {
            *counts.entry(value.as_str()).or_default() += 1;
        }
    }

    let mut out: Vec<FacetCount> = counts
        .into_iter()
        .map(|(value, count)| FacetCount {
            value: value.to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    out
}

/// Records that carry at least one of `sections`.
///
/// An empty selection keeps nothing.
pub fn filter_by_sections(records: &[PatentRecord], sections: &[String]) -> Vec<PatentRecord> {
    records
        .iter()
        .filter(|r| sections.iter().any(|s| r.facets().sections.contains(s)))
        .cloned()
        .collect()
}
