mod app;
mod cli;
mod config;
mod logging;

use std::process::ExitCode;

use clap::Parser;
use engine_logging::engine_error;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    logging::initialize(
        logging::LogDestination::from_args(cli.global.log_file.as_deref()),
        engine_logging::level_for(cli.global.verbose),
    );

    match app::run(cli).await {
        Ok(code) => code,
        Err(err) => {
            engine_error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}
