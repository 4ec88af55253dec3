//! Harvester core: pure data model, payload validation, run scoping and
//! normalization. Nothing in this crate performs IO.
mod model;
mod normalize;
mod schema;
mod scope;
mod summary;

pub use model::{DetailPayload, InstitutionEntry, ProgramId, ProgramIndexEntry, YearRecord};
pub use normalize::{
    missing_marker, normalize, normalize_program, DataWarning, Normalized, NormalizedRow, RowData,
};
pub use schema::{
    parse_detail, parse_index, SchemaError, FIELD_INSTITUTE, FIELD_PROGRAM_ID,
    FIELD_PROGRAM_LONG_NAME, FIELD_RECORDS, FIELD_YEAR,
};
pub use scope::{resolve_scope, RunScope, ScopeError, Selection, MAX_LISTED_ABSENT};
pub use summary::{FailureRecord, FetchSummary, ProgramOutcome};
