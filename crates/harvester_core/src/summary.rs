use std::fmt;

use crate::model::ProgramId;
use crate::scope::RunScope;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub program_id: ProgramId,
    pub reason: String,
    /// Whether the last error was transient (retries exhausted) rather than
    /// permanent for this id.
    pub transient: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramOutcome {
    AlreadyCached,
    Fetched { bytes: u64 },
    Failed(FailureRecord),
    /// Cancelled before this id was started, or while it was in flight.
    NotAttempted,
}

/// Per-run fetch report. Id lists are kept sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchSummary {
    pub already_cached: Vec<ProgramId>,
    pub fetched: Vec<ProgramId>,
    pub failed: Vec<FailureRecord>,
    pub not_attempted: Vec<ProgramId>,
    pub absent_from_index: Vec<ProgramId>,
    pub absent_count: u64,
    pub bytes_fetched: u64,
}

impl FetchSummary {
    pub fn for_scope(scope: &RunScope) -> Self {
        Self {
            absent_from_index: scope.absent.clone(),
            absent_count: scope.absent_count,
            ..Self::default()
        }
    }

    pub fn record(&mut self, program_id: ProgramId, outcome: ProgramOutcome) {
        match outcome {
            ProgramOutcome::AlreadyCached => insert_sorted(&mut self.already_cached, program_id),
            ProgramOutcome::Fetched { bytes } => {
                self.bytes_fetched += bytes;
                insert_sorted(&mut self.fetched, program_id);
            }
            ProgramOutcome::Failed(failure) => {
                let pos = self
                    .failed
                    .partition_point(|f| f.program_id < failure.program_id);
                self.failed.insert(pos, failure);
            }
            ProgramOutcome::NotAttempted => insert_sorted(&mut self.not_attempted, program_id),
        }
    }

    pub fn failed_ids(&self) -> Vec<ProgramId> {
        self.failed.iter().map(|f| f.program_id).collect()
    }

    /// Every in-scope id is cached after this run.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.not_attempted.is_empty()
    }

    pub fn processed(&self) -> usize {
        self.already_cached.len() + self.fetched.len() + self.failed.len()
    }
}

impl fmt::Display for FetchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "already cached: {}, fetched: {}, failed: {}",
            self.already_cached.len(),
            self.fetched.len(),
            self.failed.len()
        )?;
        if !self.not_attempted.is_empty() {
            write!(f, ", not attempted: {}", self.not_attempted.len())?;
        }
        if self.absent_count > 0 {
            write!(f, ", absent from index: {}", self.absent_count)?;
        }
        Ok(())
    }
}

fn insert_sorted(ids: &mut Vec<ProgramId>, id: ProgramId) {
    let pos = ids.partition_point(|&x| x < id);
    ids.insert(pos, id);
}
