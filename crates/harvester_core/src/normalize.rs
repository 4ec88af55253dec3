use std::fmt;

use serde_json::{Map, Value};

use crate::model::{DetailPayload, ProgramId, ProgramIndexEntry};

/// Sentinel written when an institution has no record for the target year.
pub fn missing_marker(target_year: i32) -> String {
    format!("NO_DATA_{target_year}")
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowData {
    /// Fields of the institution's target-year record.
    Metrics(Map<String, Value>),
    /// No record for the target year.
    MissingYear,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub program_id: ProgramId,
    pub program_long_name: String,
    pub institute_legal_name: String,
    pub data: RowData,
    /// Further target-year records of the same institution that were not
    /// used for this row. Non-zero rows have a matching
    /// [`DataWarning::DuplicateYearRecords`].
    pub duplicate_records: usize,
}

impl NormalizedRow {
    pub fn has_target_year(&self) -> bool {
        matches!(self.data, RowData::Metrics(_))
    }

    pub fn metric(&self, name: &str) -> Option<&Value> {
        match &self.data {
            RowData::Metrics(fields) => fields.get(name),
            RowData::MissingYear => None,
        }
    }
}

/// Data-quality findings. None of these stop normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataWarning {
    /// More than one record for one institution in the target year; the
    /// first record was used for the row.
    DuplicateYearRecords {
        program_id: ProgramId,
        institute_legal_name: String,
        year: i32,
        count: usize,
    },
    /// Records without an institution name were dropped at ingestion.
    UnnamedRecords { program_id: ProgramId, count: usize },
}

impl fmt::Display for DataWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataWarning::DuplicateYearRecords {
                program_id,
                institute_legal_name,
                year,
                count,
            } => write!(
                f,
                "programId={program_id} institute={institute_legal_name:?}: {count} records for {year}, first one used"
            ),
            DataWarning::UnnamedRecords { program_id, count } => write!(
                f,
                "programId={program_id}: {count} records without instituteLegalName skipped"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Normalized {
    pub rows: Vec<NormalizedRow>,
    pub warnings: Vec<DataWarning>,
}

impl Normalized {
    pub fn missing_count(&self) -> usize {
        self.rows.iter().filter(|r| !r.has_target_year()).count()
    }

    fn extend(&mut self, other: Normalized) {
        self.rows.extend(other.rows);
        self.warnings.extend(other.warnings);
    }
}

/// Rows for one program: one per institution, in first-seen order.
pub fn normalize_program(
    entry: &ProgramIndexEntry,
    payload: &DetailPayload,
    target_year: i32,
) -> Normalized {
    let mut out = Normalized::default();

    if payload.unnamed_records > 0 {
        out.warnings.push(DataWarning::UnnamedRecords {
            program_id: entry.program_id,
            count: payload.unnamed_records,
        });
    }

    for institution in &payload.institutions {
        let mut matches = institution.records_for(target_year);
        let (data, duplicate_records) = match matches.next() {
            Some(record) => {
                let extra = matches.count();
                if extra > 0 {
                    out.warnings.push(DataWarning::DuplicateYearRecords {
                        program_id: entry.program_id,
                        institute_legal_name: institution.legal_name.clone(),
                        year: target_year,
                        count: extra + 1,
                    });
                }
                (RowData::Metrics(record.fields.clone()), extra)
            }
            None => (RowData::MissingYear, 0),
        };
        out.rows.push(NormalizedRow {
            program_id: entry.program_id,
            program_long_name: entry.program_long_name.clone(),
            institute_legal_name: institution.legal_name.clone(),
            data,
            duplicate_records,
        });
    }
    out
}

/// Rows for several programs, ordered by `programId` ascending.
pub fn normalize<'a, I>(programs: I, target_year: i32) -> Normalized
where
    I: IntoIterator<Item = (&'a ProgramIndexEntry, &'a DetailPayload)>,
{
    let mut programs: Vec<_> = programs.into_iter().collect();
    // Stable sort keeps institution order within a program untouched.
    programs.sort_by_key(|(entry, _)| entry.program_id);

    let mut out = Normalized::default();
    for (entry, payload) in programs {
        out.extend(normalize_program(entry, payload, target_year));
    }
    out
}
