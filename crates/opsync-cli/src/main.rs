mod cli;
mod commands;
mod error;

#[cfg(test)]
mod tests;

use clap::{CommandFactory, Parser};
use opsync_core::config::SyncSettings;

use crate::cli::{Cli, Commands};
use crate::commands::common::{read_payload, resolve_db_path};
use crate::commands::completions::run_completions;
use crate::commands::hook::run_hook;
use crate::commands::project::run_project;
use crate::commands::pull::run_pull;
use crate::commands::time_entry::run_time_entry;
use crate::commands::work_package::run_work_package;
use crate::error::CliError;

fn main() {
    if let Err(error) = run() {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("opsync=info".parse().expect("Invalid log directive")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = SyncSettings::from_env()?;
    let db_path = resolve_db_path(cli.db_path, &settings);

    match cli.command {
        Some(Commands::Project { command }) => run_project(command, &db_path, &settings)?,
        Some(Commands::WorkPackage { command }) => {
            run_work_package(command, &db_path, &settings)?;
        }
        Some(Commands::TimeEntry { command }) => run_time_entry(command, &db_path, &settings)?,
        Some(Commands::Hook {
            kind,
            action,
            payload,
            existing_ids,
            forward,
        }) => {
            let payload = read_payload(payload.as_deref())?;
            run_hook(
                kind,
                &action,
                &payload,
                existing_ids.as_deref(),
                forward,
                &db_path,
                &settings,
            )?;
        }
        Some(Commands::Pull { kind }) => run_pull(kind, &db_path, &settings)?,
        Some(Commands::Completions { shell, output }) => {
            run_completions(shell, output.as_deref())?;
        }
        None => {
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
