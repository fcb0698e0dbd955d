mod bootstrap;
mod report;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use portfolio_core::models::{ColumnMapping, DateRange};
use portfolio_core::settings::Settings;
use portfolio_data::analysis::{analyze_portfolio, AnalysisRequest};
use portfolio_data::export::{write_extracted_texts, write_filtered_csv};
use portfolio_data::reader::Dataset;
use portfolio_runtime::extraction_cache::{ExtractionCache, PlainTextExtractor};
use portfolio_runtime::loader::{extract_documents, find_documents, load_uploads};

use crate::report::ReportOptions;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("Patent Dashboard v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "View: {}, Format: {}, Inputs: {}",
        settings.view,
        settings.format,
        settings.inputs.len()
    );

    if settings.inputs.is_empty() && settings.texts.is_none() {
        println!("Upload one or more CSV files to start the analysis.");
        return Ok(());
    }

    if !settings.inputs.is_empty() {
        run_analysis(&settings).await?;
    }

    if let Some(dir) = &settings.texts {
        run_text_index(dir, settings.texts_export.as_ref()).await?;
    }

    Ok(())
}

/// Load the CSV uploads, analyse them and print or export the result.
async fn run_analysis(settings: &Settings) -> Result<()> {
    let mapping = ColumnMapping::default();
    let dataset = load_uploads(&settings.inputs, &mapping, settings.date_column.as_deref())
        .await
        .context("failed to load CSV uploads")?;

    for diag in &dataset.report.diagnostics {
        tracing::debug!(source = %diag.source, row = diag.row, "{}", diag.message);
    }
    tracing::info!(
        "Loaded {} records from {} files ({} duplicates, {} rejected)",
        dataset.records.len(),
        dataset.report.files_read,
        dataset.report.duplicates_dropped,
        dataset.report.rows_rejected
    );

    if dataset.is_empty() {
        println!("No records found in the uploaded files.");
        return Ok(());
    }

    let request = build_request(settings, &dataset);
    if let Some(range) = &request.date_range {
        if range.is_empty() {
            println!("The start date {} is after the end date {}.", range.start, range.end);
        }
    }
    let analysis = analyze_portfolio(&dataset, &request);

    let opts = ReportOptions {
        view: settings.view.clone(),
        top: settings.top as usize,
        applicant: settings.applicant.clone(),
        mapping,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match settings.format.as_str() {
        "json" => writeln!(out, "{}", report::render_json(&dataset, &analysis, &opts)?)?,
        "csv" => report::write_csv(&dataset, &analysis, &opts, &mut out)?,
        _ => write!(out, "{}", report::render_text(&dataset, &analysis, &opts))?,
    }
    out.flush()?;

    if let Some(path) = &settings.export {
        let file = File::create(path)
            .with_context(|| format!("cannot create {}", path.display()))?;
        write_filtered_csv(&dataset, &analysis.records, BufWriter::new(file))?;
        tracing::info!(
            "Wrote {} filtered records to {}",
            analysis.records.len(),
            path.display()
        );
    }

    Ok(())
}

/// Turn CLI filters into an analysis request. A single bound is completed
/// from the dataset's covering range.
fn build_request(settings: &Settings, dataset: &Dataset) -> AnalysisRequest {
    let covering = DateRange::covering(&dataset.records);
    let date_range = match (settings.start, settings.end, covering) {
        (None, None, _) => None,
        (Some(start), Some(end), _) => Some(DateRange::new(start, end)),
        (Some(start), None, Some(c)) => Some(DateRange::new(start, c.end)),
        (None, Some(end), Some(c)) => Some(DateRange::new(c.start, end)),
        (_, _, None) => None,
    };

    AnalysisRequest {
        date_range,
        stages: Some(settings.stages.clone()).filter(|s| !s.is_empty()),
        sections: Some(settings.sections.clone()).filter(|s| !s.is_empty()),
    }
}

/// Index a directory of text documents through the extraction cache.
async fn run_text_index(dir: &std::path::Path, export: Option<&std::path::PathBuf>) -> Result<()> {
    let files = find_documents(dir, "txt");
    if files.is_empty() {
        println!("No .txt documents found in {}.", dir.display());
        return Ok(());
    }

    let cache = Arc::new(ExtractionCache::new());
    let texts = extract_documents(files, Arc::clone(&cache), Arc::new(PlainTextExtractor)).await;
    println!(
        "Indexed {} documents ({} unique, {} served from cache).",
        texts.len(),
        cache.len(),
        cache.hits()
    );

    if let Some(path) = export {
        let file = File::create(path)
            .with_context(|| format!("cannot create {}", path.display()))?;
        write_extracted_texts(&texts, BufWriter::new(file))?;
        tracing::info!("Wrote extracted texts to {}", path.display());
    }

    Ok(())
}
