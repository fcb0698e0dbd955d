//! Analysis pipeline for the patent dashboard.
//!
//! Takes a loaded [`Dataset`] plus an explicit [`AnalysisRequest`] and returns
//! every table the dashboard views need in one [`PortfolioAnalysis`].

use std::time::Instant;

use chrono::Utc;
use portfolio_core::models::{
    ApplicantTable, DateRange, FacetCount, FacetLevel, PatentRecord, YearlyCount,
};
use serde::Serialize;
use tracing::debug;

use crate::aggregator::ApplicantAggregator;
use crate::facets::{facet_frequencies, filter_by_sections};
use crate::reader::Dataset;

// ── Public types ──────────────────────────────────────────────────────────────

/// Filter selection for one analysis run.
///
/// `None` fields fall back to "everything": the covering date range, all
/// stages, all sections.
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    pub date_range: Option<DateRange>,
    pub stages: Option<Vec<String>>,
    pub sections: Option<Vec<String>>,
}

/// Metadata produced alongside the analysis result.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisMetadata {
    /// ISO-8601 timestamp when this result was generated.
    pub generated_at: String,
    /// Date range actually applied, `None` for an empty dataset.
    pub date_range: Option<DateRange>,
    /// Records in the dataset before filtering.
    pub records_total: usize,
    /// Records inside the date range.
    pub records_in_range: usize,
    /// Distinct applicants inside the date range.
    pub applicants: usize,
    /// Wall-clock seconds spent on the aggregations.
    pub transform_time_seconds: f64,
}

/// The complete output of [`analyze_portfolio`].
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioAnalysis {
    /// Records inside the date range, in load order.
    pub records: Vec<PatentRecord>,
    pub applicants: ApplicantTable,
    /// Continuous per-year counts for the selected stages.
    pub yearly: Vec<YearlyCount>,
    /// Stage selection the yearly counts were built for.
    pub stages: Vec<String>,
    /// Section selection the FI frequencies were built for.
    pub sections: Vec<String>,
    pub section_frequencies: Vec<FacetCount>,
    pub class_frequencies: Vec<FacetCount>,
    pub metadata: AnalysisMetadata,
}

impl PortfolioAnalysis {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ── Public function ───────────────────────────────────────────────────────────

/// Run the full analysis pipeline.
///
/// 1. Resolve defaults for the request against the dataset.
/// 2. Filter records by date range.
/// 3. Aggregate applicants and yearly counts.
/// 4. Compute section and class frequencies for the section-filtered set.
///
/// The stage selection only shapes the yearly counts; the applicant table
/// always covers every stage.
pub fn analyze_portfolio(dataset: &Dataset, request: &AnalysisRequest) -> PortfolioAnalysis {
    let start = Instant::now();

    let date_range = request
        .date_range
        .or_else(|| DateRange::covering(&dataset.records));
    let stages = request.stages.clone().unwrap_or_else(|| dataset.stages());
    let sections = request
        .sections
        .clone()
        .unwrap_or_else(|| dataset.sections());

    let records = match &date_range {
        Some(range) => ApplicantAggregator::filter_by_date(&dataset.records, range),
        None => Vec::new(),
    };

    let (applicants, yearly) = match &date_range {
        Some(range) => (
            ApplicantAggregator::aggregate(&records, range),
            ApplicantAggregator::yearly_counts(&records, range, &stages),
        ),
        None => (ApplicantTable::default(), Vec::new()),
    };

    let fi_records = filter_by_sections(&records, &sections);
    let section_frequencies = facet_frequencies(&fi_records, FacetLevel::Section);
    let class_frequencies = facet_frequencies(&fi_records, FacetLevel::Class);

    let transform_time_seconds = start.elapsed().as_secs_f64();
    debug!(
        records = records.len(),
        applicants = applicants.len(),
        years = yearly.len(),
        elapsed_s = transform_time_seconds,
        "analysis complete"
    );

    let metadata = AnalysisMetadata {
        generated_at: Utc::now().to_rfc3339(),
        date_range,
        records_total: dataset.records.len(),
        records_in_range: records.len(),
        applicants: applicants.len(),
        transform_time_seconds,
    };

    PortfolioAnalysis {
        records,
        applicants,
        yearly,
        stages,
        sections,
        section_frequencies,
        class_frequencies,
        metadata,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
