//! CSV output: filtered records, dashboard tables and extracted texts.

use std::io::Write;

use portfolio_core::error::Result;
use portfolio_core::models::{ApplicantTable, FacetCount, PatentRecord, YearlyCount};

use crate::reader::Dataset;

/// Write `records` with the dataset's original headers and raw cells.
///
/// Records built outside the loader have no raw cells; their row is padded
/// with empty fields so every line matches the header width.
pub fn write_filtered_csv<W: Write>(
    dataset: &Dataset,
    records: &[PatentRecord],
    writer: W,
) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(&dataset.headers)?;

    let width = dataset.headers.len();
    for record in records {
        let mut row: Vec<&str> = record.raw.iter().map(String::as_str).collect();
        row.resize(width, "");
        out.write_record(&row)?;
    }

    out.flush()?;
    Ok(())
}

/// Write `(file_name, extracted_text)` pairs as a two-column CSV.
pub fn write_extracted_texts<W: Write>(texts: &[(String, String)], writer: W) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(["file_name", "extracted_text"])?;
    for (name, text) in texts {
        out.write_record([name.as_str(), text.as_str()])?;
    }
    out.flush()?;
    Ok(())
}

/// Write the applicant table: name, total, one column per stage, one per year.
pub fn write_applicant_table<W: Write>(table: &ApplicantTable, writer: W) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);

    let mut header = vec!["applicant".to_string(), "total".to_string()];
    header.extend(table.stages.iter().cloned());
    header.extend(table.years.iter().map(|y| y.to_string()));
    out.write_record(&header)?;

    for row in &table.rows {
        let mut line = vec![row.applicant_name.clone(), row.total_count.to_string()];
        line.extend(row.stage_counts.values().map(u32::to_string));
        line.extend(row.year_counts.values().map(u32::to_string));
        out.write_record(&line)?;
    }

    out.flush()?;
    Ok(())
}

/// Write yearly counts with one column per selected stage.
pub fn write_yearly_counts<W: Write>(
    yearly: &[YearlyCount],
    stages: &[String],
    writer: W,
) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);

    let mut header = vec!["year".to_string(), "total".to_string()];
    header.extend(stages.iter().cloned());
    out.write_record(&header)?;

    for entry in yearly {
        let mut line = vec![entry.year.to_string(), entry.total.to_string()];
        line.extend(
            stages
                .iter()
                .map(|s| entry.by_stage.get(s).copied().unwrap_or(0).to_string()),
        );
        out.write_record(&line)?;
    }

    out.flush()?;
    Ok(())
}

/// Write facet frequencies as `level,value,count` rows.
pub fn write_facet_counts<W: Write>(
    facets: &[(&str, &[FacetCount])],
    writer: W,
) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(["level", "value", "count"])?;
    for (level, counts) in facets {
        for facet in counts.iter() {
            let count = facet.count.to_string();
            out.write_record([*level, facet.value.as_str(), count.as_str()])?;
        }
    }
    out.flush()?;
    Ok(())
}
