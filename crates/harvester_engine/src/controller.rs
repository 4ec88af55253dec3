//! Range controller: decides what to fetch and drives the fetcher for the
//! gaps.
//!
//! Progress is never tracked separately. A program counts as done exactly
//! when its cache file exists, so an interrupted run is resumed by running
//! the same (or an overlapping) window again. Disjoint windows may run
//! concurrently in separate processes without coordination.

use std::time::Duration;

use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use futures_util::StreamExt;
use harvester_core::{
    resolve_scope, FailureRecord, FetchSummary, ProgramId, ProgramIndexEntry, ProgramOutcome,
    RunScope, ScopeError, Selection,
};
use tokio_util::sync::CancellationToken;

use crate::api::DetailFetcher;
use crate::cache::CacheStore;
use crate::{HarvestEvent, ProgramProgress, ProgressSink, Stage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerOptions {
    /// Re-download even when a cache file exists. The old file is replaced
    /// atomically, never merged.
    pub force: bool,
    /// Programs fetched at the same time. Zero is treated as one.
    pub concurrency: usize,
    /// Pause after each request, per worker.
    pub request_delay: Duration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            force: false,
            concurrency: 1,
            request_delay: Duration::ZERO,
        }
    }
}

pub struct RangeController {
    cache: CacheStore,
    details: DetailFetcher,
    options: ControllerOptions,
}

impl RangeController {
    pub fn new(cache: CacheStore, details: DetailFetcher, options: ControllerOptions) -> Self {
        Self {
            cache,
            details,
            options,
        }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Resolve `selection` against `index`, then fetch every in-scope
    /// program that is not cached yet.
    pub async fn run(
        &self,
        index: &[ProgramIndexEntry],
        selection: Selection,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<(RunScope, FetchSummary), ScopeError> {
        let scope = resolve_scope(index, selection)?;
        let summary = self.run_scope(&scope, sink, cancel).await;
        Ok((scope, summary))
    }

    /// Process every program of an already resolved scope. One failing id
    /// never stops the others.
    pub async fn run_scope(
        &self,
        scope: &RunScope,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> FetchSummary {
        let mut summary = FetchSummary::for_scope(scope);
        if scope.absent_count > 0 {
            engine_warn!(
                "{} requested ids are not in the program index{}",
                scope.absent_count,
                list_suffix(&scope.absent)
            );
        }
        engine_info!(
            "{} programs in scope (force={}, concurrency={})",
            scope.len(),
            self.options.force,
            self.options.concurrency.max(1)
        );

        for id in scope.ids() {
            sink.emit(HarvestEvent::Progress(ProgramProgress {
                program_id: id,
                stage: Stage::Queued,
                attempt: 0,
            }));
        }

        let mut outcomes = futures_util::stream::iter(scope.ids())
            .map(|id| async move { (id, self.process(id, sink, cancel).await) })
            .buffer_unordered(self.options.concurrency.max(1));

        while let Some((program_id, outcome)) = outcomes.next().await {
            log_outcome(program_id, &outcome);
            sink.emit(HarvestEvent::ProgramCompleted {
                program_id,
                outcome: outcome.clone(),
            });
            summary.record(program_id, outcome);
        }

        engine_info!("Fetch finished: {}", summary);
        if !summary.failed.is_empty() {
            engine_error!(
                "Failed programIds (re-run with --ids to retry): {}",
                join_ids(summary.failed_ids())
            );
        }
        summary
    }

    async fn process(
        &self,
        program_id: ProgramId,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> ProgramOutcome {
        let progress = |stage: Stage, attempt: u32| {
            sink.emit(HarvestEvent::Progress(ProgramProgress {
                program_id,
                stage,
                attempt,
            }));
        };

        progress(Stage::CheckingCache, 0);
        if !self.options.force && self.cache.exists(program_id) {
            return ProgramOutcome::AlreadyCached;
        }
        if cancel.is_cancelled() {
            return ProgramOutcome::NotAttempted;
        }

        let fetch = self
            .details
            .fetch_observed(program_id, |attempt| progress(Stage::Downloading, attempt));
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return ProgramOutcome::NotAttempted,
            result = fetch => result,
        };

        let outcome = match result {
            Ok(detail) => {
                progress(Stage::Writing, 0);
                match self.cache.write(program_id, &detail.bytes) {
                    Ok(path) => {
                        engine_debug!(
                            "programId={} cached at {} ({} institutions, {} records)",
                            program_id,
                            path.display(),
                            detail.payload.institutions.len(),
                            detail.payload.record_count()
                        );
                        ProgramOutcome::Fetched {
                            bytes: detail.bytes.len() as u64,
                        }
                    }
                    Err(err) => ProgramOutcome::Failed(FailureRecord {
                        program_id,
                        reason: err.to_string(),
                        transient: false,
                    }),
                }
            }
            Err(err) => ProgramOutcome::Failed(FailureRecord {
                program_id,
                reason: err.to_string(),
                transient: err.is_transient(),
            }),
        };
        progress(Stage::Done, 0);

        if !self.options.request_delay.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(self.options.request_delay) => {}
            }
        }
        outcome
    }
}

fn log_outcome(program_id: ProgramId, outcome: &ProgramOutcome) {
    match outcome {
        ProgramOutcome::AlreadyCached => {
            engine_debug!("programId={} already cached, skipping", program_id)
        }
        ProgramOutcome::Fetched { bytes } => {
            engine_info!("programId={} fetched ({} bytes)", program_id, bytes)
        }
        ProgramOutcome::Failed(failure) => engine_error!(
            "programId={} failed ({}): {}",
            program_id,
            if failure.transient {
                "retries exhausted"
            } else {
                "permanent"
            },
            failure.reason
        ),
        ProgramOutcome::NotAttempted => {
            engine_warn!("programId={} not attempted (cancelled)", program_id)
        }
    }
}

fn join_ids(ids: impl IntoIterator<Item = ProgramId>) -> String {
    ids.into_iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn list_suffix(ids: &[ProgramId]) -> String {
    const SHOWN: usize = 20;
    if ids.is_empty() {
        return String::new();
    }
    let mut out = format!(": {}", join_ids(ids.iter().copied().take(SHOWN)));
    if ids.len() > SHOWN {
        out.push_str(&format!(" (+{} more)", ids.len() - SHOWN));
    }
    out
}
