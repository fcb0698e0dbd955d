//! Plain-text, JSON and CSV rendering of the dashboard views.

use std::io::Write;

use portfolio_core::formatting::{format_count, format_share};
use portfolio_core::models::{ApplicantAggregateRow, ApplicantTable, ColumnMapping, FacetCount};
use portfolio_data::analysis::PortfolioAnalysis;
use portfolio_data::export::{
    write_applicant_table, write_facet_counts, write_filtered_csv, write_yearly_counts,
};
use portfolio_data::reader::Dataset;
use serde_json::{json, Value};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Widest an abstract cell may get in the summary table.
const SUMMARY_WIDTH: usize = 60;

// ── Options ───────────────────────────────────────────────────────────────────

/// What to print and how much of it.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub view: String,
    pub top: usize,
    pub applicant: Option<String>,
    pub mapping: ColumnMapping,
}

impl ReportOptions {
    fn shows(&self, view: &str) -> bool {
        self.view == "all" || self.view == view
    }
}

// ── Text tables ───────────────────────────────────────────────────────────────

/// A column-aligned text table. Widths are measured in terminal cells so
/// CJK applicant names line up.
struct TextTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    /// Right-align columns from this index on.
    numeric_from: usize,
}

impl TextTable {
    fn new(headers: Vec<String>, numeric_from: usize) -> Self {
        Self {
            headers,
            rows: Vec::new(),
            numeric_from,
        }
    }

    fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn render(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.width()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(cell.width());
                }
            }
        }

        let mut out = String::new();
        out.push_str(&self.render_row(&self.headers, &widths));
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        out.push_str(&rule.join("  "));
        out.push('\n');
        for row in &self.rows {
            out.push_str(&self.render_row(row, &widths));
        }
        out
    }

    fn render_row(&self, cells: &[String], widths: &[usize]) -> String {
        let padded: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(i, &w)| {
                let cell = cells.get(i).map(String::as_str).unwrap_or("");
                let fill = " ".repeat(w.saturating_sub(cell.width()));
                if i >= self.numeric_from {
                    format!("{fill}{cell}")
                } else {
                    format!("{cell}{fill}")
                }
            })
            .collect();
        format!("{}\n", padded.join("  ").trim_end())
    }
}

/// Cut `text` to at most `max` terminal cells, marking the cut with `…`.
fn truncate_width(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

fn top_rows(table: &ApplicantTable, top: usize) -> ApplicantTable {
    ApplicantTable {
        stages: table.stages.clone(),
        years: table.years.clone(),
        rows: table.rows.iter().take(top).cloned().collect(),
    }
}

/// The applicant whose trend is shown: the requested one, else the leader.
fn selected_applicant<'a>(
    analysis: &'a PortfolioAnalysis,
    opts: &ReportOptions,
) -> Option<&'a ApplicantAggregateRow> {
    match &opts.applicant {
        Some(name) => analysis.applicants.get(name),
        None => analysis.applicants.rows.first(),
    }
}

// ── Text rendering ────────────────────────────────────────────────────────────

/// Render the selected views as aligned text.
pub fn render_text(dataset: &Dataset, analysis: &PortfolioAnalysis, opts: &ReportOptions) -> String {
    if analysis.is_empty() {
        return "No records match the selected filters.\n".to_string();
    }

    let mut sections = Vec::new();
    if opts.shows("overview") {
        sections.push(overview_text(dataset, analysis));
    }
    if opts.shows("applicant") {
        sections.push(applicant_text(analysis, opts));
    }
    if opts.shows("fi") {
        sections.push(fi_text(analysis));
    }
    if opts.shows("summary") {
        sections.push(summary_text(dataset, analysis, opts));
    }
    sections.join("\n")
}

fn overview_text(dataset: &Dataset, analysis: &PortfolioAnalysis) -> String {
    let mut out = String::from("== Overview ==\n");
    if let Some(range) = &analysis.metadata.date_range {
        out.push_str(&format!(
            "The selected date range is from {} to {}.\n",
            range.start, range.end
        ));
    }
    out.push_str(&format!(
        "Records: {} of {} ({} duplicates dropped, {} rows rejected)\n\n",
        format_count(analysis.metadata.records_in_range as u64),
        format_count(analysis.metadata.records_total as u64),
        format_count(dataset.report.duplicates_dropped as u64),
        format_count(dataset.report.rows_rejected as u64),
    ));

    let mut headers = vec!["Year".to_string(), "Total".to_string()];
    headers.extend(analysis.stages.iter().cloned());
    let mut table = TextTable::new(headers, 1);
    for entry in &analysis.yearly {
        let mut row = vec![entry.year.to_string(), format_count(u64::from(entry.total))];
        row.extend(analysis.stages.iter().map(|s| {
            format_count(u64::from(entry.by_stage.get(s).copied().unwrap_or(0)))
        }));
        table.push(row);
    }
    out.push_str(&table.render());
    out
}

fn applicant_text(analysis: &PortfolioAnalysis, opts: &ReportOptions) -> String {
    let applicants = &analysis.applicants;
    let mut out = format!(
        "== Applicants (top {} of {}) ==\n",
        opts.top.min(applicants.len()),
        format_count(applicants.len() as u64)
    );

    let mut headers = vec!["Applicant".to_string(), "Total".to_string()];
    headers.extend(applicants.stages.iter().cloned());
    headers.extend(applicants.years.iter().map(|y| y.to_string()));
    let mut table = TextTable::new(headers, 1);
    for row in applicants.rows.iter().take(opts.top) {
        let mut cells = vec![
            row.applicant_name.clone(),
            format_count(u64::from(row.total_count)),
        ];
        cells.extend(row.stage_counts.values().map(|n| format_count(u64::from(*n))));
        cells.extend(row.year_counts.values().map(|n| format_count(u64::from(*n))));
        table.push(cells);
    }
    out.push_str(&table.render());

    match selected_applicant(analysis, opts) {
        Some(row) => {
            out.push_str(&format!("\nPatents per year for {}\n", row.applicant_name));
            let mut trend = TextTable::new(vec!["Year".to_string(), "Count".to_string()], 1);
            for (year, count) in &row.year_counts {
                trend.push(vec![year.to_string(), format_count(u64::from(*count))]);
            }
            out.push_str(&trend.render());
        }
        None => {
            if let Some(name) = &opts.applicant {
                out.push_str(&format!("\nNo patents for {} in the selected range.\n", name));
            }
        }
    }
    out
}

fn facet_table(label: &str, counts: &[FacetCount]) -> String {
    let total: u64 = counts.iter().map(|f| u64::from(f.count)).sum();
    let mut table = TextTable::new(
        vec![label.to_string(), "Count".to_string(), "Share".to_string()],
        1,
    );
    for facet in counts {
        table.push(vec![
            facet.value.clone(),
            format_count(u64::from(facet.count)),
            format_share(u64::from(facet.count), total),
        ]);
    }
    table.render()
}

fn fi_text(analysis: &PortfolioAnalysis) -> String {
    let mut out = format!(
        "== FI classification (sections: {}) ==\n",
        analysis.sections.join(", ")
    );
    if analysis.section_frequencies.is_empty() {
        out.push_str("No FI codes in the selected sections.\n");
        return out;
    }
    out.push_str(&facet_table("Section", &analysis.section_frequencies));
    out.push('\n');
    out.push_str(&facet_table("Class", &analysis.class_frequencies));
    out
}

fn summary_text(dataset: &Dataset, analysis: &PortfolioAnalysis, opts: &ReportOptions) -> String {
    let mut out = String::from("== Summaries ==\n");
    if !dataset.has_summary {
        out.push_str(&format!(
            "The uploaded data has no {} column.\n",
            opts.mapping.summary
        ));
        return out;
    }

    let mut table = TextTable::new(
        vec![
            opts.mapping.document_id.clone(),
            opts.mapping.applicants.clone(),
            opts.mapping.summary.clone(),
        ],
        3,
    );
    for record in &analysis.records {
        table.push(vec![
            record.document_id.clone(),
            record.applicants_raw.clone(),
            truncate_width(record.summary.as_deref().unwrap_or(""), SUMMARY_WIDTH),
        ]);
    }
    out.push_str(&table.render());
    out
}

// ── JSON rendering ────────────────────────────────────────────────────────────

/// Render the selected views as a JSON document.
pub fn render_json(
    dataset: &Dataset,
    analysis: &PortfolioAnalysis,
    opts: &ReportOptions,
) -> anyhow::Result<String> {
    let mut doc = serde_json::Map::new();

    if opts.shows("overview") {
        doc.insert(
            "overview".to_string(),
            json!({
                "date_range": analysis.metadata.date_range,
                "records_in_range": analysis.metadata.records_in_range,
                "stages": analysis.stages,
                "yearly": analysis.yearly,
            }),
        );
    }
    if opts.shows("applicant") {
        let trend = selected_applicant(analysis, opts).map(|row| {
            json!({ "applicant": row.applicant_name, "years": row.year_counts })
        });
        doc.insert(
            "applicants".to_string(),
            json!({
                "table": top_rows(&analysis.applicants, opts.top),
                "total_applicants": analysis.applicants.len(),
                "trend": trend,
            }),
        );
    }
    if opts.shows("fi") {
        doc.insert(
            "fi".to_string(),
            json!({
                "sections_selected": analysis.sections,
                "sections": analysis.section_frequencies,
                "classes": analysis.class_frequencies,
            }),
        );
    }
    if opts.shows("summary") {
        let summaries: Vec<Value> = analysis
            .records
            .iter()
            .map(|r| {
                json!({
                    "document_id": r.document_id,
                    "applicants": r.applicants_raw,
                    "summary": r.summary,
                })
            })
            .collect();
        doc.insert(
            "summaries".to_string(),
            json!({ "available": dataset.has_summary, "records": summaries }),
        );
    }

    doc.insert("metadata".to_string(), serde_json::to_value(&analysis.metadata)?);
    doc.insert("load_report".to_string(), serde_json::to_value(&dataset.report)?);

    Ok(serde_json::to_string_pretty(&Value::Object(doc))?)
}

// ── CSV rendering ─────────────────────────────────────────────────────────────

/// Write the table behind the selected view as CSV. `summary` and `all`
/// write the filtered records themselves.
pub fn write_csv<W: Write>(
    dataset: &Dataset,
    analysis: &PortfolioAnalysis,
    opts: &ReportOptions,
    writer: W,
) -> anyhow::Result<()> {
    match opts.view.as_str() {
        "overview" => write_yearly_counts(&analysis.yearly, &analysis.stages, writer)?,
        "applicant" => write_applicant_table(&top_rows(&analysis.applicants, opts.top), writer)?,
        "fi" => write_facet_counts(
            &[
                ("section", analysis.section_frequencies.as_slice()),
                ("class", analysis.class_frequencies.as_slice()),
            ],
            writer,
        )?,
        _ => write_filtered_csv(dataset, &analysis.records, writer)?,
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
