use std::path::Path;
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Context;
use engine_logging::{engine_error, engine_info, engine_warn};
use harvester_core::{FetchSummary, Selection};
use harvester_engine::{HarvestEvent, Harvester, NormalizeReport, ProgressSink};
use tokio_util::sync::CancellationToken;

use crate::cli::{Cli, Command};
use crate::config::HarvestConfig;

/// Some programs failed, some cache files could not be read, or the run was
/// cancelled.
pub const EXIT_INCOMPLETE: u8 = 2;

/// Exit status after a second Ctrl-C.
const EXIT_ABORTED: i32 = 130;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Complete,
    Incomplete,
}

impl RunStatus {
    pub fn exit_code(self) -> ExitCode {
        match self {
            RunStatus::Complete => ExitCode::SUCCESS,
            RunStatus::Incomplete => ExitCode::from(EXIT_INCOMPLETE),
        }
    }
}

/// Logs completion progress roughly every tenth of the scope.
struct ProgressLog {
    total: usize,
    done: AtomicUsize,
}

impl ProgressLog {
    fn new(total: usize) -> Self {
        Self {
            total,
            done: AtomicUsize::new(0),
        }
    }
}

impl ProgressSink for ProgressLog {
    fn emit(&self, event: HarvestEvent) {
        if let HarvestEvent::ProgramCompleted { .. } = event {
            let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
            let step = (self.total / 10).max(1);
            if done % step == 0 || done == self.total {
                engine_info!("Progress: {}/{} programs", done, self.total);
            }
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = HarvestConfig::load(cli.global.config.as_deref())?;
    config.apply_args(&cli.global)?;
    let command = cli.command();

    let harvester = Harvester::new(config.engine_config(cli.global.force))
        .context("cannot set up harvester")?;

    let cancel = CancellationToken::new();
    spawn_ctrl_c_handler(cancel.clone());

    let status = run_with(
        &harvester,
        command,
        cli.global.selection(),
        &config.output,
        &cancel,
    )
    .await?;
    Ok(status.exit_code())
}

/// One fetch and/or normalize pass over `selection`. Fatal errors are
/// returned; per-program problems only make the status incomplete.
pub async fn run_with(
    harvester: &Harvester,
    command: Command,
    selection: Selection,
    output: &Path,
    cancel: &CancellationToken,
) -> anyhow::Result<RunStatus> {
    let index = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            engine_warn!("Cancelled while fetching the program index; nothing was written.");
            return Ok(RunStatus::Incomplete);
        }
        index = harvester.fetch_index() => index?,
    };
    let scope = harvester.scope(&index, selection)?;
    engine_info!(
        "Total programs: {}; selected: {}",
        index.len(),
        scope.len()
    );

    let mut incomplete = false;

    if matches!(command, Command::Run | Command::Fetch) {
        let sink = ProgressLog::new(scope.len());
        let summary = harvester.fetch_scope(&scope, &sink, cancel).await;
        report_fetch(&summary);
        incomplete |= !summary.is_complete();
    }

    if cancel.is_cancelled() {
        engine_warn!("Cancelled; cached programs remain valid. Re-run to resume.");
        return Ok(RunStatus::Incomplete);
    }

    if matches!(command, Command::Run | Command::Normalize) {
        let report = harvester.normalize_scope(&scope);
        incomplete |= report_normalize(&report);
        if report.normalized.rows.is_empty() {
            engine_warn!("No rows produced. Check the selection, year and cache contents.");
        }
        let summary = harvester.write_table(&report.normalized.rows, output)?;
        engine_info!(
            "Table {}: {} rows, {} marked {}",
            summary.output_path.display(),
            summary.row_count,
            summary.missing_count,
            harvester_core::missing_marker(harvester.target_year())
        );
    }

    Ok(if incomplete {
        RunStatus::Incomplete
    } else {
        RunStatus::Complete
    })
}

/// First Ctrl-C cancels the run; a second one exits immediately.
fn spawn_ctrl_c_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        engine_warn!("Interrupt received; finishing without starting new programs (Ctrl-C again to abort)");
        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            engine_error!("Second interrupt; aborting");
            std::process::exit(EXIT_ABORTED);
        }
    });
}

fn report_fetch(summary: &FetchSummary) {
    engine_info!("Fetch summary: {}", summary);
    for failure in &summary.failed {
        engine_error!("  programId={}: {}", failure.program_id, failure.reason);
    }
}

/// Returns true when something needs operator attention.
fn report_normalize(report: &NormalizeReport) -> bool {
    if !report.not_cached.is_empty() {
        engine_warn!(
            "{} programs in scope are not cached and are absent from the table",
            report.not_cached.len()
        );
    }
    for err in &report.cache_errors {
        engine_error!("{}", err);
    }
    if !report.normalized.warnings.is_empty() {
        engine_warn!(
            "{} data warnings while normalizing",
            report.normalized.warnings.len()
        );
    }
    !report.cache_errors.is_empty()
}
