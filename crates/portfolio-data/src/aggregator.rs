//! Applicant and yearly aggregation over patent records.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use portfolio_core::models::{
    ApplicantAggregateRow, ApplicantTable, DateRange, PatentRecord, YearlyCount,
};

/// Split a raw applicant cell into individual names.
///
/// Full-width commas and comma + (ideographic) space are folded into plain
/// commas first. Fragments are trimmed; empty ones and lone punctuation
/// marks are noise and dropped, while a one-letter name such as `"A"` is
/// kept. Order is preserved and duplicates are kept.
///
/// # Examples
///
/// ```
/// use portfolio_data::aggregator::split_applicants;
///
/// assert_eq!(split_applicants("A社、B社, C社"), vec!["A社", "B社", "C社"]);
/// ```
pub fn split_applicants(raw: &str) -> Vec<String> {
    raw.replace('、', ",")
        .replace('，', ",")
        .replace(", ", ",")
        .replace(",\u{3000}", ",")
        .split(',')
        .map(str::trim)
        .filter(|name| !is_noise_fragment(name))
        .map(str::to_string)
        .collect()
}

fn is_noise_fragment(name: &str) -> bool {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (None, _) => true,
        (Some(c), None) => !c.is_alphanumeric(),
        _ => false,
    }
}

/// Sorted, de-duplicated applicant names across `records`.
pub fn applicant_catalog(records: &[PatentRecord]) -> Vec<String> {
    records
        .iter()
        .flat_map(|r| split_applicants(&r.applicants_raw))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

// ── Accumulator ───────────────────────────────────────────────────────────────

#[derive(Default)]
struct ApplicantCounts {
    total: u32,
    stages: BTreeMap<String, u32>,
    years: BTreeMap<i32, u32>,
}

// ── ApplicantAggregator ───────────────────────────────────────────────────────

/// Stateless helper that groups patent records by applicant and year.
pub struct ApplicantAggregator;

impl ApplicantAggregator {
    /// Records whose filing date falls within `range`, in input order.
    pub fn filter_by_date(records: &[PatentRecord], range: &DateRange) -> Vec<PatentRecord> {
        records
            .iter()
            .filter(|r| range.contains(r.filing_date))
            .cloned()
            .collect()
    }

    /// Per-applicant totals with stage and year breakdowns.
    ///
    /// Each record contributes one exploded row per name in its applicant
    /// cell. Stage and year columns are the values present among the
    /// exploded rows; every output row carries all of them, zero-filled.
    /// Rows are sorted by total descending, ties in order of first
    /// appearance. Records without a stage count toward the total and the
    /// year columns only.
    ///
    /// An inverted range or an empty input yields an empty table with no
    /// stage or year columns.
    pub fn aggregate(records: &[PatentRecord], range: &DateRange) -> ApplicantTable {
        if range.is_empty() {
            return ApplicantTable::default();
        }

        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, ApplicantCounts> = HashMap::new();
        let mut stages: BTreeSet<String> = BTreeSet::new();
        let mut years: BTreeSet<i32> = BTreeSet::new();

        for record in records.iter().filter(|r| range.contains(r.filing_date)) {
            for name in split_applicants(&record.applicants_raw) {
                let counts = groups.entry(name.clone()).or_insert_with(|| {
                    order.push(name);
                    ApplicantCounts::default()
                });

                counts.total += 1;
                *counts.years.entry(record.year).or_default() += 1;
                years.insert(record.year);
                if let Some(stage) = &record.stage {
                    *counts.stages.entry(stage.clone()).or_default() += 1;
                    stages.insert(stage.clone());
                }
            }
        }

        let mut rows: Vec<ApplicantAggregateRow> = order
            .into_iter()
            .filter_map(|name| {
                let counts = groups.remove(&name)?;
                let stage_counts = stages
                    .iter()
                    .map(|s| (s.clone(), counts.stages.get(s).copied().unwrap_or(0)))
                    .collect();
                let year_counts = years
                    .iter()
                    .map(|y| (*y, counts.years.get(y).copied().unwrap_or(0)))
                    .collect();
                Some(ApplicantAggregateRow {
                    applicant_name: name,
                    total_count: counts.total,
                    stage_counts,
                    year_counts,
                })
            })
            .collect();

        // `sort_by` is stable, so ties keep first-appearance order.
        rows.sort_by(|a, b| b.total_count.cmp(&a.total_count));

        ApplicantTable {
            stages: stages.into_iter().collect(),
            years: years.into_iter().collect(),
            rows,
        }
    }

    /// Document counts per year for the records inside `range`.
    ///
    /// Covers every year from the earliest to the latest filtered record,
    /// including years without documents. `by_stage` holds one entry per
    /// label in `stages`.
    pub fn yearly_counts(
        records: &[PatentRecord],
        range: &DateRange,
        stages: &[String],
    ) -> Vec<YearlyCount> {
        let filtered: Vec<&PatentRecord> = records
            .iter()
            .filter(|r| range.contains(r.filing_date))
            .collect();

        let (Some(min_year), Some(max_year)) = (
            filtered.iter().map(|r| r.year).min(),
            filtered.iter().map(|r| r.year).max(),
        ) else {
            return Vec::new();
        };

        (min_year..=max_year)
            .map(|year| {
                let in_year: Vec<&&PatentRecord> =
                    filtered.iter().filter(|r| r.year == year).collect();
                let by_stage = stages
                    .iter()
                    .map(|stage| {
                        let n = in_year
                            .iter()
                            .filter(|r| r.stage.as_deref() == Some(stage.as_str()))
                            .count();
                        (stage.clone(), n as u32)
                    })
                    .collect();
                YearlyCount {
                    year,
                    total: in_year.len() as u32,
                    by_stage,
                }
            })
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(id: &str, d: NaiveDate, applicants: &str, stage: Option<&str>) -> PatentRecord {
        PatentRecord::new(
            id,
            d,
            applicants,
            stage.map(str::to_string),
            vec!["A01B3/00".to_string()],
        )
    }

    fn all_time() -> DateRange {
        DateRange::new(date(1900, 1, 1), date(2100, 12, 31))
    }

    // ── split_applicants ──────────────────────────────────────────────────────

    #[test]
    fn test_split_applicants_mixed_delimiters() {
        assert_eq!(
            split_applicants("A社、B社, C社"),
            vec!["A社", "B社", "C社"]
        );
        assert_eq!(
            split_applicants("株式会社X，株式会社Y,　株式会社Z"),
            vec!["株式会社X", "株式会社Y", "株式会社Z"]
        );
    }

    #[test]
    fn test_split_applicants_drops_short_fragments() {
        assert_eq!(split_applicants("A, , B"), vec!["A", "B"]);
        assert_eq!(split_applicants("A社,,X,"), vec!["A社", "X"]);
        assert!(split_applicants("").is_empty());
    }

    #[test]
    fn test_split_applicants_drops_lone_punctuation() {
        assert_eq!(split_applicants("A社、・、B社"), vec!["A社", "B社"]);
        assert_eq!(split_applicants(" A社 ,-"), vec!["A社"]);
        assert_eq!(split_applicants("丸"), vec!["丸"]);
    }

    #[test]
    fn test_split_applicants_keeps_duplicates_in_order() {
        assert_eq!(
            split_applicants("B社,A社,B社"),
            vec!["B社", "A社", "B社"]
        );
    }

    // ── applicant_catalog ─────────────────────────────────────────────────────

    #[test]
    fn test_applicant_catalog_sorted_unique() {
        let records = vec![
            record("JP1", date(2020, 1, 1), "B社、A社", None),
            record("JP2", date(2020, 1, 2), "A社", None),
        ];
        assert_eq!(applicant_catalog(&records), vec!["A社", "B社"]);
    }

    // ── aggregate ─────────────────────────────────────────────────────────────

    #[test]
    fn test_aggregate_stage_and_year_breakdown() {
        let records = vec![
            record("JP1", date(2020, 5, 1), "X社", Some("Pending")),
            record("JP2", date(2021, 6, 1), "X社", Some("Granted")),
        ];

        let table = ApplicantAggregator::aggregate(&records, &all_time());
        assert_eq!(table.len(), 1);
        let row = table.get("X社").unwrap();
        assert_eq!(row.total_count, 2);
        assert_eq!(row.stage_counts["Pending"], 1);
        assert_eq!(row.stage_counts["Granted"], 1);
        assert_eq!(row.year_counts[&2020], 1);
        assert_eq!(row.year_counts[&2021], 1);
    }

    #[test]
    fn test_aggregate_zero_fills_missing_combinations() {
        let records = vec![
            record("JP1", date(2020, 5, 1), "X社", Some("Pending")),
            record("JP2", date(2021, 6, 1), "X社", Some("Granted")),
            record("JP3", date(2021, 7, 1), "Y社", Some("Granted")),
        ];
        let table = ApplicantAggregator::aggregate(&records, &all_time());

        assert_eq!(table.stages, vec!["Granted", "Pending"]);
        assert_eq!(table.years, vec![2020, 2021]);
        let y = table.get("Y社").unwrap();
        assert_eq!(y.stage_counts["Pending"], 0);
        assert_eq!(y.year_counts[&2020], 0);
        for row in &table.rows {
            assert_eq!(row.stage_counts.len(), 2);
            assert_eq!(row.year_counts.len(), 2);
        }
    }

    #[test]
    fn test_aggregate_explodes_multi_applicant_records() {
        let records = vec![
            record("JP1", date(2020, 1, 1), "A社、B社、C社", Some("登録")),
            record("JP2", date(2020, 1, 2), "B社", Some("登録")),
        ];
        let table = ApplicantAggregator::aggregate(&records, &all_time());

        assert_eq!(table.get("A社").unwrap().total_count, 1);
        assert_eq!(table.get("B社").unwrap().total_count, 2);
        assert_eq!(table.get("C社").unwrap().total_count, 1);
    }

    #[test]
    fn test_aggregate_sorted_desc_ties_by_first_appearance() {
        let records = vec![
            record("JP1", date(2020, 1, 1), "C社", None),
            record("JP2", date(2020, 1, 2), "A社、B社", None),
            record("JP3", date(2020, 1, 3), "B社", None),
            record("JP4", date(2020, 1, 4), "D社", None),
        ];
        let table = ApplicantAggregator::aggregate(&records, &all_time());
        let names: Vec<&str> = table
            .rows
            .iter()
            .map(|r| r.applicant_name.as_str())
            .collect();
        assert_eq!(names, vec!["B社", "C社", "A社", "D社"]);
    }

    #[test]
    fn test_aggregate_applies_inclusive_date_filter() {
        let records = vec![
            record("JP1", date(2019, 12, 31), "A社", None),
            record("JP2", date(2020, 1, 1), "A社", None),
            record("JP3", date(2020, 12, 31), "B社", None),
            record("JP4", date(2021, 1, 1), "B社", None),
        ];
        let range = DateRange::new(date(2020, 1, 1), date(2020, 12, 31));
        let table = ApplicantAggregator::aggregate(&records, &range);

        assert_eq!(table.get("A社").unwrap().total_count, 1);
        assert_eq!(table.get("B社").unwrap().total_count, 1);
        assert_eq!(table.years, vec![2020]);
    }

    #[test]
    fn test_aggregate_inverted_range_is_empty() {
        let records = vec![record("JP1", date(2020, 1, 1), "A社", Some("登録"))];
        let range = DateRange::new(date(2021, 1, 1), date(2020, 1, 1));
        let table = ApplicantAggregator::aggregate(&records, &range);
        assert!(table.is_empty());
        assert!(table.stages.is_empty());
        assert!(table.years.is_empty());
    }

    #[test]
    fn test_aggregate_empty_input_has_no_columns() {
        let table = ApplicantAggregator::aggregate(&[], &all_time());
        assert_eq!(table, ApplicantTable::default());
    }

    #[test]
    fn test_aggregate_missing_stage_counts_toward_total_only() {
        let records = vec![
            record("JP1", date(2020, 1, 1), "A社", None),
            record("JP2", date(2020, 1, 2), "A社", Some("登録")),
        ];
        let table = ApplicantAggregator::aggregate(&records, &all_time());
        let row = table.get("A社").unwrap();
        assert_eq!(row.total_count, 2);
        assert_eq!(row.stage_counts["登録"], 1);
        assert_eq!(row.stage_counts.values().sum::<u32>(), 1);
        assert_eq!(row.year_counts[&2020], 2);
    }

    #[test]
    fn test_aggregate_order_independent_counts() {
        let mut records = vec![
            record("JP1", date(2020, 1, 1), "A社、B社", Some("出願")),
            record("JP2", date(2021, 1, 1), "B社", Some("登録")),
            record("JP3", date(2022, 1, 1), "C社、A社", Some("登録")),
        ];
        let forward = ApplicantAggregator::aggregate(&records, &all_time());
        records.reverse();
        let backward = ApplicantAggregator::aggregate(&records, &all_time());

        assert_eq!(forward.stages, backward.stages);
        assert_eq!(forward.years, backward.years);
        for row in &forward.rows {
            let other = backward.get(&row.applicant_name).unwrap();
            assert_eq!(row, other);
        }
    }

    // ── yearly_counts ─────────────────────────────────────────────────────────

    #[test]
    fn test_yearly_counts_continuous_years() {
        let records = vec![
            record("JP1", date(2018, 1, 1), "A社", Some("登録")),
            record("JP2", date(2020, 1, 1), "A社", Some("出願")),
            record("JP3", date(2020, 6, 1), "B社", Some("登録")),
        ];
        let stages = vec!["登録".to_string(), "出願".to_string()];
        let yearly = ApplicantAggregator::yearly_counts(&records, &all_time(), &stages);

        let years: Vec<i32> = yearly.iter().map(|y| y.year).collect();
        assert_eq!(years, vec![2018, 2019, 2020]);
        assert_eq!(yearly[1].total, 0);
        assert_eq!(yearly[1].by_stage["登録"], 0);
        assert_eq!(yearly[2].total, 2);
        assert_eq!(yearly[2].by_stage["登録"], 1);
        assert_eq!(yearly[2].by_stage["出願"], 1);
    }

    #[test]
    fn test_yearly_counts_empty_when_nothing_in_range() {
        let records = vec![record("JP1", date(2018, 1, 1), "A社", None)];
        let range = DateRange::new(date(2020, 1, 1), date(2020, 12, 31));
        assert!(ApplicantAggregator::yearly_counts(&records, &range, &[]).is_empty());
    }

    // ── filter_by_date ────────────────────────────────────────────────────────

    #[test]
    fn test_filter_by_date_keeps_order() {
        let records = vec![
            record("JP2", date(2020, 3, 1), "A社", None),
            record("JP1", date(2020, 1, 1), "A社", None),
            record("JP3", date(2022, 1, 1), "A社", None),
        ];
        let range = DateRange::new(date(2020, 1, 1), date(2020, 12, 31));
        let ids: Vec<String> = ApplicantAggregator::filter_by_date(&records, &range)
            .into_iter()
            .map(|r| r.document_id)
            .collect();
        assert_eq!(ids, vec!["JP2", "JP1"]);
    }
}
