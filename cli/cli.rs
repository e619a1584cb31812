mod cli_args;
mod collect;
mod output;
mod progress;

use clap::Parser;
use colored::*;
use log;
use std::process;

use cli_args::Cli;
use repocat_core::AppError;

fn main() {
    let cli_args = Cli::parse();

    setup_logging(cli_args.quiet, cli_args.verbose);

    log::debug!("CLI args parsed: {:?}", cli_args);

    // Fatal errors are always reported, even with -q.
    let exit_code = match collect::handle_collect_command(&cli_args) {
        Ok(()) => {
            log::info!("Application finished successfully.");
            0
        }
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            exit_code_for(e.downcast_ref::<AppError>())
        }
    };
    log::debug!("Exiting with code {}", exit_code);
    process::exit(exit_code);
}

fn exit_code_for(core_err: Option<&AppError>) -> i32 {
    match core_err {
        Some(AppError::Config(_)) => 1,
        Some(AppError::TomlParse(_)) => 1,
        Some(AppError::FileRead { .. }) => 1,
        Some(AppError::Processing(_)) => 2,
        Some(AppError::Io(_)) => 2,
        Some(AppError::Fetch(_)) => 3,
        Some(AppError::OutputWrite { .. }) => 4,
        Some(AppError::InvalidInput(_)) => 5,
        Some(AppError::Glob(_)) => 5,
        Some(_) => 1,
        None => 1,
    }
}

fn setup_logging(quiet: bool, verbose: u8) {
    let log_level = if quiet {
        log::LevelFilter::Off
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();
    log::trace!("Logger initialized with level: {:?}", log_level);
}
