use std::collections::HashSet;

use crate::model::{ProgramId, ProgramIndexEntry};

/// Windows wider than this report absent ids as a count only.
pub const MAX_LISTED_ABSENT: u64 = 10_000;

/// Which programs a run is asked to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Inclusive `[start, end]`; a missing bound is open.
    Window {
        start: Option<ProgramId>,
        end: Option<ProgramId>,
    },
    /// An explicit list, typically the failed ids of an earlier run.
    Ids(Vec<ProgramId>),
}

impl Selection {
    pub fn all() -> Self {
        Selection::Window {
            start: None,
            end: None,
        }
    }

    pub fn window(start: Option<ProgramId>, end: Option<ProgramId>) -> Self {
        Selection::Window { start, end }
    }

    pub fn contains(&self, id: ProgramId) -> bool {
        match self {
            Selection::Window { start, end } => {
                start.map_or(true, |s| id >= s) && end.map_or(true, |e| id <= e)
            }
            Selection::Ids(ids) => ids.contains(&id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    #[error("start id {start} is greater than end id {end}")]
    InvertedWindow { start: ProgramId, end: ProgramId },
    #[error("explicit id list is empty")]
    EmptyIdList,
}

/// The selection intersected with the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunScope {
    pub selection: Selection,
    /// In-scope programs, in index order.
    pub programs: Vec<ProgramIndexEntry>,
    /// Requested ids the index does not know about (listed when the
    /// selection is small enough to enumerate).
    pub absent: Vec<ProgramId>,
    pub absent_count: u64,
}

impl RunScope {
    pub fn ids(&self) -> impl Iterator<Item = ProgramId> + '_ {
        self.programs.iter().map(|p| p.program_id)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    pub fn entry(&self, id: ProgramId) -> Option<&ProgramIndexEntry> {
        self.programs.iter().find(|p| p.program_id == id)
    }
}

pub fn resolve_scope(
    index: &[ProgramIndexEntry],
    selection: Selection,
) -> Result<RunScope, ScopeError> {
    match &selection {
        Selection::Window {
            start: Some(start),
            end: Some(end),
        } if start > end => {
            return Err(ScopeError::InvertedWindow {
                start: *start,
                end: *end,
            })
        }
        Selection::Ids(ids) if ids.is_empty() => return Err(ScopeError::EmptyIdList),
        _ => {}
    }

    let programs: Vec<ProgramIndexEntry> = index
        .iter()
        .filter(|entry| selection.contains(entry.program_id))
        .cloned()
        .collect();
    let known: HashSet<ProgramId> = programs.iter().map(|p| p.program_id).collect();

    let (absent, absent_count) = match &selection {
        Selection::Ids(ids) => {
            let mut seen = HashSet::new();
            let absent: Vec<ProgramId> = ids
                .iter()
                .copied()
                .filter(|id| !known.contains(id) && seen.insert(*id))
                .collect();
            let count = absent.len() as u64;
            (absent, count)
        }
        Selection::Window {
            start: Some(start),
            end: Some(end),
        } => {
            let width = end.abs_diff(*start).saturating_add(1);
            let count = width.saturating_sub(known.len() as u64);
            if width <= MAX_LISTED_ABSENT {
                let absent = (*start..=*end).filter(|id| !known.contains(id)).collect();
                (absent, count)
            } else {
                (Vec::new(), count)
            }
        }
        // Open windows have no finite set of requested ids.
        Selection::Window { .. } => (Vec::new(), 0),
    };

    Ok(RunScope {
        selection,
        programs,
        absent,
        absent_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_bounds_contain_everything_on_their_side() {
        let sel = Selection::window(Some(10), None);
        assert!(!sel.contains(9));
        assert!(sel.contains(10));
        assert!(sel.contains(i64::MAX));
        assert!(Selection::all().contains(i64::MIN));
    }
}
