//! CSV discovery and loading for the portfolio dashboard.
//!
//! Reads patent-database CSV exports, tolerating invalid UTF-8, merges
//! several uploads into one table, drops duplicate documents and converts
//! the remaining rows into [`PatentRecord`]s.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use portfolio_core::classification::normalize_codes;
use portfolio_core::dates::DateParser;
use portfolio_core::error::{PortfolioError, Result};
use portfolio_core::models::{ColumnMapping, PatentRecord};
use serde::Serialize;
use tracing::{debug, warn};

// ── Public types ──────────────────────────────────────────────────────────────

/// One decoded CSV upload.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    /// File name or other label identifying the upload.
    pub source: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Bytes dropped while decoding because they were not valid UTF-8.
    pub dropped_bytes: usize,
}

/// A recoverable problem found while loading; the offending data was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub source: String,
    /// 1-based data row within `source` (header excluded), 0 for file-level notes.
    pub row: usize,
    pub message: String,
}

/// Counters and diagnostics collected by [`build_dataset`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub files_read: usize,
    pub rows_read: usize,
    pub duplicates_dropped: usize,
    pub rows_rejected: usize,
    pub diagnostics: Vec<Diagnostic>,
}

/// All uploads merged, deduplicated and converted.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    /// Union of upload headers in first-appearance order.
    pub headers: Vec<String>,
    /// Every header ending with the date suffix.
    pub date_columns: Vec<String>,
    /// The column `PatentRecord::filing_date` was read from.
    pub date_column: String,
    pub records: Vec<PatentRecord>,
    /// `true` when the uploads carry an abstract column.
    pub has_summary: bool,
    pub report: LoadReport,
}

impl Dataset {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct stage labels in first-appearance order.
    pub fn stages(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .filter_map(|r| r.stage.clone())
            .filter(|s| seen.insert(s.clone()))
            .collect()
    }

    /// Distinct FI sections, sorted.
    pub fn sections(&self) -> Vec<String> {
        let mut sections: Vec<String> = self
            .records
            .iter()
            .flat_map(|r| r.facets().sections.iter().cloned())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        sections.sort();
        sections
    }
}

// ── Discovery ─────────────────────────────────────────────────────────────────

/// Expand `path` into CSV files: a file is returned as-is, a directory is
/// scanned recursively. Results are sorted by path.
pub fn find_csv_files(path: &Path) -> Vec<PathBuf> {
    if !path.exists() {
        warn!("Input path does not exist: {}", path.display());
        return Vec::new();
    }
    if path.is_file() {
        return vec![path.to_path_buf()];
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(path)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Decode `bytes` as UTF-8, dropping invalid sequences and a leading BOM.
///
/// Returns the text and the number of bytes dropped.
pub fn decode_lossy(bytes: &[u8]) -> (String, usize) {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut text = String::with_capacity(bytes.len());
    let mut dropped = 0usize;
    let mut rest = bytes;

    loop {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                text.push_str(valid);
                break;
            }
            Err(e) => {
                let (valid, after) = rest.split_at(e.valid_up_to());
                text.push_str(std::str::from_utf8(valid).unwrap_or_default());
                let skip = e.error_len().unwrap_or(after.len());
                dropped += skip;
                rest = &after[skip..];
            }
        }
    }

    (text, dropped)
}

/// Parse CSV text from an upload into a [`RawTable`].
///
/// Rows may be shorter or longer than the header; they are padded or
/// truncated to the header width. Blank rows are skipped.
pub fn read_csv_bytes(source: &str, bytes: &[u8]) -> Result<RawTable> {
    let (text, dropped_bytes) = decode_lossy(bytes);
    if dropped_bytes > 0 {
        warn!(source, dropped_bytes, "dropped invalid UTF-8 bytes");
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut values: Vec<String> = record.iter().map(|v| v.trim().to_string()).collect();
        if values.iter().all(|v| v.is_empty()) {
            continue;
        }
        values.resize(headers.len(), String::new());
        rows.push(values);
    }

    debug!(source, rows = rows.len(), columns = headers.len(), "csv parsed");

    Ok(RawTable {
        source: source.to_string(),
        headers,
        rows,
        dropped_bytes,
    })
}

/// Read one CSV file from disk.
pub fn read_csv_file(path: &Path) -> Result<RawTable> {
    let bytes = std::fs::read(path).map_err(|source| PortfolioError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let source = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    read_csv_bytes(&source, &bytes)
}

/// Headers ending with `suffix`, in header order.
pub fn date_columns(headers: &[String], suffix: &str) -> Vec<String> {
    headers
        .iter()
        .filter(|h| h.ends_with(suffix))
        .cloned()
        .collect()
}

// ── Dataset construction ──────────────────────────────────────────────────────

/// Merge uploads and convert them into a [`Dataset`].
///
/// * Tables are concatenated by header name; cells missing from a table are
///   empty.
/// * Rows sharing document id and filing date are collapsed, first wins.
/// * `date_column` selects the filter column; `None` picks the first
///   date-like header.
///
/// Rows whose active date cannot be parsed are dropped and reported in
/// [`LoadReport::diagnostics`]. A missing required column is an error.
/// No tables at all yield an empty dataset.
pub fn build_dataset(
    tables: Vec<RawTable>,
    mapping: &ColumnMapping,
    date_column: Option<&str>,
) -> Result<Dataset> {
    let mut report = LoadReport {
        files_read: tables.len(),
        ..Default::default()
    };

    if tables.is_empty() {
        return Ok(Dataset {
            report,
            ..Default::default()
        });
    }

    for table in &tables {
        if table.dropped_bytes > 0 {
            report.diagnostics.push(Diagnostic {
                source: table.source.clone(),
                row: 0,
                message: format!("dropped {} invalid UTF-8 bytes", table.dropped_bytes),
            });
        }
    }

    let headers = union_headers(&tables);
    let candidates = date_columns(&headers, &mapping.date_suffix);
    if candidates.is_empty() {
        return Err(PortfolioError::NoDateColumn(mapping.date_suffix.clone()));
    }
    let active = match date_column {
        Some(name) if candidates.iter().any(|c| c == name) => name.to_string(),
        Some(name) => return Err(PortfolioError::MissingColumn(name.to_string())),
        None => candidates[0].clone(),
    };

    let index: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.as_str(), i))
        .collect();
    let require = |name: &str| {
        index
            .get(name)
            .copied()
            .ok_or_else(|| PortfolioError::MissingColumn(name.to_string()))
    };
    let id_col = require(mapping.document_id.as_str())?;
    let applicant_col = require(mapping.applicants.as_str())?;
    let stage_col = require(mapping.stage.as_str())?;
    let fi_col = require(mapping.fi_codes.as_str())?;
    let date_col = require(active.as_str())?;
    let dedup_col = index
        .get(mapping.filing_date.as_str())
        .copied()
        .unwrap_or(date_col);
    let summary_col = index.get(mapping.summary.as_str()).copied();

    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut records = Vec::new();

    for table in &tables {
        let positions: Vec<usize> = table.headers.iter().map(|h| index[h.as_str()]).collect();

        for (row_number, row) in table.rows.iter().enumerate() {
            report.rows_read += 1;

            let mut cells = vec![String::new(); headers.len()];
            for (value, &pos) in row.iter().zip(&positions) {
                cells[pos] = value.clone();
            }

            let key = (cells[id_col].clone(), cells[dedup_col].clone());
            if !seen.insert(key) {
                report.duplicates_dropped += 1;
                continue;
            }

            let Some(filing_date) = DateParser::parse(&cells[date_col]) else {
                report.rows_rejected += 1;
                let message = format!("unparseable {} value \"{}\"", active, cells[date_col]);
                warn!(source = %table.source, row = row_number + 1, "{}", message);
                report.diagnostics.push(Diagnostic {
                    source: table.source.clone(),
                    row: row_number + 1,
                    message,
                });
                continue;
            };

            let stage = Some(cells[stage_col].clone()).filter(|s| !s.is_empty());
            let summary = summary_col
                .map(|i| cells[i].clone())
                .filter(|s| !s.is_empty());

            let record = PatentRecord::new(
                cells[id_col].clone(),
                filing_date,
                cells[applicant_col].clone(),
                stage,
                normalize_codes(&cells[fi_col]),
            )
            .with_summary(summary)
            .with_raw(cells);
            records.push(record);
        }
    }

    debug!(
        "Built dataset: {} records from {} rows ({} duplicates, {} rejected)",
        records.len(),
        report.rows_read,
        report.duplicates_dropped,
        report.rows_rejected,
    );

    Ok(Dataset {
        headers,
        date_columns: candidates,
        date_column: active,
        records,
        has_summary: summary_col.is_some(),
        report,
    })
}

/// [`build_dataset`], with `failures` (files that could not be read) listed
/// ahead of the row-level diagnostics.
pub fn assemble_dataset(
    tables: Vec<RawTable>,
    mut failures: Vec<Diagnostic>,
    mapping: &ColumnMapping,
    date_column: Option<&str>,
) -> Result<Dataset> {
    let mut dataset = build_dataset(tables, mapping, date_column)?;
    failures.append(&mut dataset.report.diagnostics);
    dataset.report.diagnostics = failures;
    Ok(dataset)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn union_headers(tables: &[RawTable]) -> Vec<String> {
    let mut seen = HashSet::new();
    tables
        .iter()
        .flat_map(|t| t.headers.iter())
        .filter(|h| seen.insert(h.as_str()))
        .cloned()
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
