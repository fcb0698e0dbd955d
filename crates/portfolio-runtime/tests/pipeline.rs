//! End-to-end: CSV files on disk through to the dashboard tables.

use std::fs;

use chrono::NaiveDate;
use portfolio_core::models::{ColumnMapping, DateRange};
use portfolio_data::analysis::{analyze_portfolio, AnalysisRequest};
use portfolio_data::export::write_filtered_csv;
use portfolio_runtime::loader::load_uploads;
use tempfile::TempDir;

const FIRST: &str = "\u{feff}文献番号,出願日,出願人/権利者,ステージ,FI,要約
JP2019-001,2019/03/01,\"A社、B社\",出願,\"A01B3/00,3,4,B02C1/00\",耕うん装置
JP2020-002,2020/07/15,A社,登録,G06F3/00,入力装置
JP2020-003,not a date,C社,登録,H04L9/00,通信
";

const SECOND: &str = "文献番号,出願日,出願人/権利者,ステージ,FI
JP2019-001,2019/03/01,\"A社、B社\",出願,A01B3/00
JP2022-004,2022/01/10,\"B社，C社\",登録,A61K8/00-101@Z
";

fn write_uploads() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("first.csv"), FIRST).unwrap();
    fs::create_dir(dir.path().join("more")).unwrap();
    fs::write(dir.path().join("more").join("second.CSV"), SECOND).unwrap();
    fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
    dir
}

#[tokio::test]
async fn test_directory_upload_to_analysis() {
    let dir = write_uploads();
    let dataset = load_uploads(
        &[dir.path().to_path_buf()],
        &ColumnMapping::default(),
        None,
    )
    .await
    .unwrap();

    assert_eq!(dataset.report.files_read, 2);
    assert_eq!(dataset.report.rows_read, 5);
    assert_eq!(dataset.report.duplicates_dropped, 1);
    assert_eq!(dataset.report.rows_rejected, 1);
    assert_eq!(dataset.records.len(), 3);
    assert!(dataset.has_summary);

    let first = &dataset.records[0];
    assert_eq!(
        first.fi_codes(),
        &["A01B3/00-3", "A01B3/00-4", "B02C1/00"].map(String::from)
    );

    let result = analyze_portfolio(&dataset, &AnalysisRequest::default());
    let names: Vec<&str> = result
        .applicants
        .rows
        .iter()
        .map(|r| r.applicant_name.as_str())
        .collect();
    assert_eq!(names, vec!["A社", "B社", "C社"]);
    assert_eq!(result.applicants.years, vec![2019, 2020, 2022]);
    assert_eq!(result.applicants.get("C社").unwrap().year_counts[&2019], 0);

    let years: Vec<i32> = result.yearly.iter().map(|y| y.year).collect();
    assert_eq!(years, vec![2019, 2020, 2021, 2022]);
}

#[tokio::test]
async fn test_filtered_export_round_trips_through_loader() {
    let dir = write_uploads();
    let mapping = ColumnMapping::default();
    let dataset = load_uploads(&[dir.path().to_path_buf()], &mapping, None)
        .await
        .unwrap();

    let request = AnalysisRequest {
        date_range: Some(DateRange::new(
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2022, 12, 31).unwrap(),
        )),
        ..AnalysisRequest::default()
    };
    let result = analyze_portfolio(&dataset, &request);
    assert_eq!(result.records.len(), 2);

    let export = dir.path().join("filtered.csv");
    let file = fs::File::create(&export).unwrap();
    write_filtered_csv(&dataset, &result.records, file).unwrap();

    let reloaded = load_uploads(&[export], &mapping, None).await.unwrap();
    let ids: Vec<&str> = reloaded
        .records
        .iter()
        .map(|r| r.document_id.as_str())
        .collect();
    assert_eq!(ids, vec!["JP2020-002", "JP2022-004"]);
    assert_eq!(reloaded.headers, dataset.headers);
}
