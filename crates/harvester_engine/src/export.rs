use std::path::{Path, PathBuf};

use engine_logging::engine_info;
use harvester_core::{missing_marker, NormalizedRow};
use serde_json::Value;

use crate::persist::{AtomicFileWriter, PersistError};

pub const MISSING_DATA_COLUMN: &str = "missingData";
pub const KEY_COLUMNS: [&str; 3] = ["programId", "programLongName", "instituteLegalName"];

/// Metric fields of the yearly records, in output order.
pub fn default_metric_columns() -> Vec<String> {
    [
        "degreeLevelId",
        "degreeLevelName",
        "numberOfGraduates",
        "tuitionFee",
        "degreeTimeFinish",
        "loanPercent",
        "loanAmount",
        "wagesYear1",
        "wagesYear3",
        "wagesYear5",
        "wagesYear8",
        "wagesYear10",
        "loanPercentWagesYear1",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub target_year: i32,
    pub metric_columns: Vec<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            target_year: 2022,
            metric_columns: default_metric_columns(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub row_count: usize,
    pub missing_count: usize,
    pub output_path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("destination {0} has no file name")]
    InvalidDestination(String),
}

/// Serializes normalized rows to CSV with a fixed column order.
#[derive(Debug, Clone, Default)]
pub struct TableWriter {
    options: ExportOptions,
}

impl TableWriter {
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }

    pub fn header(&self) -> Vec<String> {
        KEY_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(self.options.metric_columns.iter().cloned())
            .chain(std::iter::once(MISSING_DATA_COLUMN.to_string()))
            .collect()
    }

    pub fn render(&self, rows: &[NormalizedRow]) -> Result<Vec<u8>, ExportError> {
        let marker = missing_marker(self.options.target_year);
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(self.header())?;

        for row in rows {
            let mut record = Vec::with_capacity(KEY_COLUMNS.len() + self.options.metric_columns.len() + 1);
            record.push(row.program_id.to_string());
            record.push(row.program_long_name.clone());
            record.push(row.institute_legal_name.clone());
            for column in &self.options.metric_columns {
                record.push(cell(row.metric(column)));
            }
            record.push(if row.has_target_year() {
                String::new()
            } else {
                marker.clone()
            });
            writer.write_record(&record)?;
        }

        writer.into_inner().map_err(|err| ExportError::Io(err.into_error()))
    }

    /// Replace `destination` with the full table. Never appends.
    pub fn write(
        &self,
        rows: &[NormalizedRow],
        destination: &Path,
    ) -> Result<ExportSummary, ExportError> {
        let filename = destination
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ExportError::InvalidDestination(destination.display().to_string()))?;
        let dir = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let content = self.render(rows)?;
        let output_path = AtomicFileWriter::new(dir).write(filename, &content)?;
        let missing_count = rows.iter().filter(|r| !r.has_target_year()).count();
        engine_info!("Wrote {} rows to {}", rows.len(), output_path.display());

        Ok(ExportSummary {
            row_count: rows.len(),
            missing_count,
            output_path,
        })
    }
}

/// Text form of one metric value; absent and null are empty.
fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
