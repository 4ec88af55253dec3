use serde_json::{Map, Value};

pub type ProgramId = i64;

/// One entry of the remote program index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramIndexEntry {
    pub program_id: ProgramId,
    pub program_long_name: String,
}

impl ProgramIndexEntry {
    pub fn new(program_id: ProgramId, program_long_name: impl Into<String>) -> Self {
        Self {
            program_id,
            program_long_name: program_long_name.into(),
        }
    }
}

/// One yearly record of an institution. Every field of the record is kept,
/// including `year` and `instituteLegalName`; metric fields are opaque.
#[derive(Debug, Clone, PartialEq)]
pub struct YearRecord {
    pub year: i32,
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstitutionEntry {
    pub legal_name: String,
    pub records: Vec<YearRecord>,
}

impl InstitutionEntry {
    /// All records tagged with `year`, in payload order.
    pub fn records_for(&self, year: i32) -> impl Iterator<Item = &YearRecord> {
        self.records.iter().filter(move |r| r.year == year)
    }
}

/// Validated detail document for one program.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DetailPayload {
    /// Institutions in first-seen order.
    pub institutions: Vec<InstitutionEntry>,
    /// Records dropped at ingestion because they carried no institution name.
    pub unnamed_records: usize,
}

impl DetailPayload {
    pub fn record_count(&self) -> usize {
        self.institutions.iter().map(|i| i.records.len()).sum()
    }
}
