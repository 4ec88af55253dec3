use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use harvester_core::{normalize, DetailPayload, Normalized, ProgramId, ProgramIndexEntry};

use crate::cache::{CacheError, CacheStore};

#[derive(Debug, Default)]
pub struct NormalizeReport {
    pub normalized: Normalized,
    pub programs_normalized: Vec<ProgramId>,
    /// In scope but never fetched; absent from the output.
    pub not_cached: Vec<ProgramId>,
    pub cache_errors: Vec<CacheError>,
}

impl NormalizeReport {
    pub fn corrupt_ids(&self) -> Vec<ProgramId> {
        self.cache_errors
            .iter()
            .filter_map(|err| match err {
                CacheError::Corrupt { program_id, .. } => Some(*program_id),
                _ => None,
            })
            .collect()
    }
}

/// Build rows for every program of `programs` that has a cache file.
///
/// Output depends only on `programs`, the cache contents and `target_year`.
pub fn normalize_cached(
    cache: &CacheStore,
    programs: &[ProgramIndexEntry],
    target_year: i32,
) -> NormalizeReport {
    let mut report = NormalizeReport::default();
    let mut loaded: Vec<(&ProgramIndexEntry, DetailPayload)> = Vec::new();

    for entry in programs {
        let id = entry.program_id;
        if !cache.exists(id) {
            report.not_cached.push(id);
            continue;
        }
        match cache.read(id) {
            Ok(payload) => loaded.push((entry, payload)),
            Err(err) => {
                engine_error!("programId={} skipped: {}", id, err);
                report.cache_errors.push(err);
            }
        }
    }
    report.not_cached.sort_unstable();
    if !report.not_cached.is_empty() {
        engine_debug!(
            "{} in-scope programs have no cache file yet",
            report.not_cached.len()
        );
    }

    report.normalized = normalize(loaded.iter().map(|(e, p)| (*e, p)), target_year);
    let mut ids: Vec<ProgramId> = loaded.iter().map(|(e, _)| e.program_id).collect();
    ids.sort_unstable();
    report.programs_normalized = ids;

    for warning in &report.normalized.warnings {
        engine_warn!("Data warning: {}", warning);
    }
    engine_info!(
        "Normalized {} programs into {} rows ({} without {} data)",
        report.programs_normalized.len(),
        report.normalized.rows.len(),
        report.normalized.missing_count(),
        target_year
    );
    report
}
