//! Async upload loading.
//!
//! CSV files are read and decoded on tokio's blocking pool, one task per
//! file, then merged into a [`Dataset`] in discovery order. Text documents are
//! pushed through the shared [`ExtractionCache`] the same way.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use portfolio_core::error::{PortfolioError, Result};
use portfolio_core::models::ColumnMapping;
use portfolio_data::reader::{assemble_dataset, find_csv_files, read_csv_file, Dataset, Diagnostic};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::extraction_cache::{CacheStore, ExtractionCache, TextExtractor};

// ── CSV uploads ───────────────────────────────────────────────────────────────

/// Read every CSV file under `inputs` concurrently and build a dataset.
///
/// Unreadable files are skipped with a diagnostic; a missing required column
/// is an error.
pub async fn load_uploads(
    inputs: &[PathBuf],
    mapping: &ColumnMapping,
    date_column: Option<&str>,
) -> Result<Dataset> {
    let files: Vec<PathBuf> = inputs.iter().flat_map(|p| find_csv_files(p)).collect();
    info!(files = files.len(), "loading CSV uploads");

    let mut tasks = JoinSet::new();
    for (index, file) in files.into_iter().enumerate() {
        tasks.spawn_blocking(move || {
            let result = read_csv_file(&file);
            (index, file, result)
        });
    }

    let mut outcomes = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        let outcome = joined.map_err(|e| PortfolioError::Other(e.into()))?;
        outcomes.push(outcome);
    }
    // Tasks finish in any order; dedup must see files in discovery order.
    outcomes.sort_by_key(|(index, _, _)| *index);

    let mut tables = Vec::new();
    let mut failures = Vec::new();
    for (_, file, result) in outcomes {
        match result {
            Ok(table) => tables.push(table),
            Err(e) => {
                warn!("Skipping {}: {}", file.display(), e);
                failures.push(Diagnostic {
                    source: file.display().to_string(),
                    row: 0,
                    message: e.to_string(),
                });
            }
        }
    }

    let dataset = assemble_dataset(tables, failures, mapping, date_column)?;
    debug!(
        records = dataset.records.len(),
        diagnostics = dataset.report.diagnostics.len(),
        "uploads loaded"
    );
    Ok(dataset)
}

// ── Text documents ────────────────────────────────────────────────────────────

/// Files under `dir` with the given extension (case-insensitive), sorted.
pub fn find_documents(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        })
        .collect();
    files.sort();
    files
}

/// Extract every file in `files` through `cache`, returning
/// `(file_name, text)` pairs in input order.
///
/// Files that cannot be read are logged and skipped; failed extractions
/// produce an empty text entry.
pub async fn extract_documents<S, E>(
    files: Vec<PathBuf>,
    cache: Arc<ExtractionCache<S>>,
    extractor: Arc<E>,
) -> Vec<(String, String)>
where
    S: CacheStore + 'static,
    E: TextExtractor + 'static,
{
    let mut tasks = JoinSet::new();
    for (index, file) in files.into_iter().enumerate() {
        let cache = Arc::clone(&cache);
        let extractor = Arc::clone(&extractor);
        tasks.spawn_blocking(move || {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.display().to_string());
            let extracted = std::fs::read(&file)
                .map(|bytes| cache.get_or_extract(&bytes, extractor.as_ref()));
            (index, name, extracted)
        });
    }

    let mut texts = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, name, Ok(extracted))) => texts.push((index, name, extracted.text)),
            Ok((_, name, Err(e))) => warn!("Skipping {}: {}", name, e),
            Err(e) => warn!(error = %e, "extraction task failed"),
        }
    }
    texts.sort_by_key(|(index, _, _)| *index);

    debug!(
        documents = texts.len(),
        cached = cache.len(),
        hits = cache.hits(),
        "documents extracted"
    );
    texts.into_iter().map(|(_, name, text)| (name, text)).collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
