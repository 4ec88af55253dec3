use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use harvester_core::{ProgramId, Selection};

/// Harvest program detail records into a cache and flatten them into one
/// CSV table for a single reporting year.
#[derive(Debug, Parser)]
#[command(name = "harvester", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Fetch missing programs, then write the table (default).
    Run,
    /// Fetch missing programs only.
    Fetch,
    /// Write the table from whatever is cached; no detail requests.
    Normalize,
}

#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// First programId to process (inclusive).
    #[arg(long, global = true)]
    pub start_id: Option<ProgramId>,

    /// Last programId to process (inclusive).
    #[arg(long, global = true)]
    pub end_id: Option<ProgramId>,

    /// Explicit comma-separated programIds, e.g. the failed ids of a previous run.
    #[arg(
        long,
        global = true,
        value_delimiter = ',',
        conflicts_with_all = ["start_id", "end_id"]
    )]
    pub ids: Option<Vec<ProgramId>>,

    /// Reporting year to extract.
    #[arg(long, global = true)]
    pub year: Option<i32>,

    /// Output CSV path.
    #[arg(long, global = true)]
    pub out: Option<PathBuf>,

    /// Directory holding one cached payload per program.
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// API base URL.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Re-download programs even when they are cached.
    #[arg(long, global = true)]
    pub force: bool,

    /// Seconds to wait after each request.
    #[arg(long, global = true)]
    pub sleep: Option<f64>,

    /// Programs fetched in parallel.
    #[arg(long, global = true)]
    pub concurrency: Option<usize>,

    /// RON configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug-level logging.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Also write the log to this file.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

impl GlobalArgs {
    pub fn selection(&self) -> Selection {
        match &self.ids {
            Some(ids) => Selection::Ids(ids.clone()),
            None => Selection::window(self.start_id, self.end_id),
        }
    }
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_run_over_full_index() {
        let cli = Cli::parse_from(["harvester"]);
        assert_eq!(cli.command(), Command::Run);
        assert_eq!(cli.global.selection(), Selection::all());
    }

    #[test]
    fn window_flags_work_after_the_subcommand() {
        let cli = Cli::parse_from(["harvester", "fetch", "--start-id", "25", "--end-id", "50"]);
        assert_eq!(cli.command(), Command::Fetch);
        assert_eq!(cli.global.selection(), Selection::window(Some(25), Some(50)));
    }

    #[test]
    fn ids_list_is_split_on_commas() {
        let cli = Cli::parse_from(["harvester", "--ids", "30,42", "--force"]);
        assert_eq!(cli.global.selection(), Selection::Ids(vec![30, 42]));
        assert!(cli.global.force);
    }

    #[test]
    fn ids_conflict_with_window() {
        assert!(Cli::try_parse_from(["harvester", "--ids", "1", "--start-id", "1"]).is_err());
    }
}
