use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::classification::parse_hierarchy;

/// Hierarchy facets derived from a record's merged FI codes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationFacets {
    /// Section letters, e.g. `"A"`.
    pub sections: BTreeSet<String>,
    /// Three-character classes, e.g. `"A01"`.
    pub classes: BTreeSet<String>,
    /// Four-character subclasses, e.g. `"A01B"`.
    pub subclasses: BTreeSet<String>,
    /// Main group identifiers, e.g. `"A01B3"`.
    pub groups: BTreeSet<String>,
}

impl ClassificationFacets {
    /// `true` when no code contributed to any facet.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
            && self.classes.is_empty()
            && self.subclasses.is_empty()
            && self.groups.is_empty()
    }

    /// The facet set for `level`.
    pub fn level(&self, level: FacetLevel) -> &BTreeSet<String> {
        match level {
            FacetLevel::Section => &self.sections,
            FacetLevel::Class => &self.classes,
            FacetLevel::Subclass => &self.subclasses,
            FacetLevel::Group => &self.groups,
        }
    }
}

/// One of the four classification granularities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacetLevel {
    Section,
    Class,
    Subclass,
    Group,
}

impl FacetLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacetLevel::Section => "section",
            FacetLevel::Class => "class",
            FacetLevel::Subclass => "subclass",
            FacetLevel::Group => "group",
        }
    }
}

impl fmt::Display for FacetLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FacetLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "section" => Ok(FacetLevel::Section),
            "class" => Ok(FacetLevel::Class),
            "subclass" => Ok(FacetLevel::Subclass),
            "group" => Ok(FacetLevel::Group),
            other => Err(format!("unknown facet level: {}", other)),
        }
    }
}

/// One patent-portfolio entry after ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatentRecord {
    /// Document number; the dedup and counting key.
    pub document_id: String,
    /// Value of the active date column.
    pub filing_date: NaiveDate,
    /// Calendar year of `filing_date`.
    pub year: i32,
    /// Raw applicant cell, possibly naming several applicants.
    pub applicants_raw: String,
    /// Prosecution stage label, `None` when the cell was empty.
    pub stage: Option<String>,
    /// Merged FI classification codes.
    fi_codes: Vec<String>,
    /// Facets derived from `fi_codes`.
    facets: ClassificationFacets,
    /// Abstract text, when the upload carries one.
    #[serde(default)]
    pub summary: Option<String>,
    /// Original CSV cells aligned with the dataset headers.
    #[serde(default)]
    pub raw: Vec<String>,
}

impl PatentRecord {
    pub fn new(
        document_id: impl Into<String>,
        filing_date: NaiveDate,
        applicants_raw: impl Into<String>,
        stage: Option<String>,
        fi_codes: Vec<String>,
    ) -> Self {
        let facets = parse_hierarchy(&fi_codes);
        Self {
            document_id: document_id.into(),
            filing_date,
            year: filing_date.year(),
            applicants_raw: applicants_raw.into(),
            stage,
            fi_codes,
            facets,
            summary: None,
            raw: Vec::new(),
        }
    }

    pub fn with_summary(mut self, summary: Option<String>) -> Self {
        self.summary = summary;
        self
    }

    pub fn with_raw(mut self, raw: Vec<String>) -> Self {
        self.raw = raw;
        self
    }

    pub fn fi_codes(&self) -> &[String] {
        &self.fi_codes
    }

    pub fn facets(&self) -> &ClassificationFacets {
        &self.facets
    }

    /// Replace the merged code list and recompute the facets.
    pub fn set_fi_codes(&mut self, codes: Vec<String>) {
        self.facets = parse_hierarchy(&codes);
        self.fi_codes = codes;
    }
}

/// Inclusive filing-date filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// `true` when `start > end`; such a range matches nothing.
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Smallest range covering every record's filing date.
    pub fn covering(records: &[PatentRecord]) -> Option<Self> {
        let start = records.iter().map(|r| r.filing_date).min()?;
        let end = records.iter().map(|r| r.filing_date).max()?;
        Some(Self { start, end })
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Per-applicant document counts.
///
/// `stage_counts` and `year_counts` always hold the full key set of the
/// [`ApplicantTable`] they belong to, zero-filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantAggregateRow {
    pub applicant_name: String,
    pub total_count: u32,
    pub stage_counts: BTreeMap<String, u32>,
    pub year_counts: BTreeMap<i32, u32>,
}

/// Applicant ranking with its data-dependent columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantTable {
    /// Stage labels present in the filtered data, sorted.
    pub stages: Vec<String>,
    /// Years present in the filtered data, ascending.
    pub years: Vec<i32>,
    /// Rows ordered by `total_count` descending.
    pub rows: Vec<ApplicantAggregateRow>,
}

impl ApplicantTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, applicant: &str) -> Option<&ApplicantAggregateRow> {
        self.rows.iter().find(|r| r.applicant_name == applicant)
    }
}

/// Document counts for one calendar year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearlyCount {
    pub year: i32,
    pub total: u32,
    /// One entry per selected stage.
    pub by_stage: BTreeMap<String, u32>,
}

/// Occurrence count of one facet value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetCount {
    pub value: String,
    pub count: u32,
}

/// Header names the reader maps onto [`PatentRecord`] fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub document_id: String,
    /// Filing date; half of the dedup key.
    pub filing_date: String,
    pub applicants: String,
    pub stage: String,
    pub fi_codes: String,
    /// Optional abstract column.
    pub summary: String,
    /// Headers ending with this suffix are candidate date columns.
    pub date_suffix: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            document_id: "文献番号".to_string(),
            filing_date: "出願日".to_string(),
            applicants: "出願人/権利者".to_string(),
            stage: "ステージ".to_string(),
            fi_codes: "FI".to_string(),
            summary: "要約".to_string(),
            date_suffix: "日".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(id: &str, d: NaiveDate) -> PatentRecord {
        PatentRecord::new(id, d, "A社", None, vec!["A01B3/00".to_string()])
    }

    #[test]
    fn test_record_derives_year_and_facets() {
        let r = record("JP1", date(2021, 3, 4));
        assert_eq!(r.year, 2021);
        assert!(r.facets().sections.contains("A"));
    }

    #[test]
    fn test_set_fi_codes_recomputes_facets() {
        let mut r = record("JP1", date(2021, 3, 4));
        r.set_fi_codes(vec!["G06F17/30".to_string()]);
        assert_eq!(r.fi_codes(), &["G06F17/30".to_string()]);
        assert!(r.facets().sections.contains("G"));
        assert!(!r.facets().sections.contains("A"));
    }

    #[test]
    fn test_date_range_contains_is_inclusive() {
        let range = DateRange::new(date(2020, 1, 1), date(2020, 12, 31));
        assert!(range.contains(date(2020, 1, 1)));
        assert!(range.contains(date(2020, 12, 31)));
        assert!(!range.contains(date(2021, 1, 1)));
        assert!(!range.is_empty());
    }

    #[test]
    fn test_date_range_inverted_is_empty() {
        let range = DateRange::new(date(2021, 1, 1), date(2020, 1, 1));
        assert!(range.is_empty());
        assert!(!range.contains(date(2020, 6, 1)));
    }

    #[test]
    fn test_date_range_covering() {
        let records = vec![
            record("JP2", date(2019, 5, 1)),
            record("JP1", date(2022, 1, 9)),
            record("JP3", date(2020, 7, 7)),
        ];
        let range = DateRange::covering(&records).unwrap();
        assert_eq!(range.start, date(2019, 5, 1));
        assert_eq!(range.end, date(2022, 1, 9));
        assert!(DateRange::covering(&[]).is_none());
    }

    #[test]
    fn test_facet_level_parse() {
        assert_eq!("Section".parse::<FacetLevel>(), Ok(FacetLevel::Section));
        assert_eq!("subclass".parse::<FacetLevel>(), Ok(FacetLevel::Subclass));
        assert!("family".parse::<FacetLevel>().is_err());
    }
}
