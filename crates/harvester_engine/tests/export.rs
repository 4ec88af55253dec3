use std::fs;

use harvester_core::{NormalizedRow, RowData};
use harvester_engine::{ExportError, ExportOptions, TableWriter, MISSING_DATA_COLUMN};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

fn writer() -> TableWriter {
    TableWriter::new(ExportOptions {
        target_year: 2022,
        metric_columns: vec!["degreeLevelName".to_string(), "wagesYear1".to_string()],
    })
}

fn rows() -> Vec<NormalizedRow> {
    let fields = json!({
        "instituteLegalName": "Acme University",
        "year": 2022,
        "degreeLevelName": "Bachelor's, \"general\"",
        "wagesYear1": 55000,
        "ignored": 1
    });
    vec![
        NormalizedRow {
            program_id: 475,
            program_long_name: "Computer Science".to_string(),
            institute_legal_name: "Acme University".to_string(),
            data: RowData::Metrics(fields.as_object().unwrap().clone()),
            duplicate_records: 0,
        },
        NormalizedRow {
            program_id: 475,
            program_long_name: "Computer Science".to_string(),
            institute_legal_name: "Beta College".to_string(),
            data: RowData::MissingYear,
            duplicate_records: 0,
        },
    ]
}

#[test]
fn header_has_fixed_column_order() {
    assert_eq!(
        writer().header(),
        vec![
            "programId",
            "programLongName",
            "instituteLegalName",
            "degreeLevelName",
            "wagesYear1",
            MISSING_DATA_COLUMN,
        ]
    );
}

#[test]
fn rows_render_metrics_or_marker() {
    let text = String::from_utf8(writer().render(&rows()).unwrap()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "programId,programLongName,instituteLegalName,degreeLevelName,wagesYear1,missingData",
            "475,Computer Science,Acme University,\"Bachelor's, \"\"general\"\"\",55000,",
            "475,Computer Science,Beta College,,,NO_DATA_2022",
        ]
    );
}

#[test]
fn write_overwrites_instead_of_appending() {
    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("out").join("majortrans_2022.csv");

    let first = writer().write(&rows(), &dest).unwrap();
    assert_eq!(first.row_count, 2);
    assert_eq!(first.missing_count, 1);
    assert_eq!(first.output_path, dest);

    let second = writer().write(&rows()[..1], &dest).unwrap();
    assert_eq!(second.row_count, 1);
    let text = fs::read_to_string(&dest).unwrap();
    assert_eq!(text.lines().count(), 2);
}

#[test]
fn empty_table_still_has_header() {
    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("empty.csv");
    writer().write(&[], &dest).unwrap();
    assert_eq!(fs::read_to_string(&dest).unwrap().lines().count(), 1);
}

#[test]
fn destination_without_file_name_is_rejected() {
    let err = writer().write(&rows(), std::path::Path::new("/")).unwrap_err();
    assert!(matches!(err, ExportError::InvalidDestination(_)));
}
