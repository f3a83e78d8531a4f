use std::path::Path;

use chrono::Local;
use opsync_core::config::SyncSettings;
use opsync_core::models::{TimeEntry, TimeEntryChanges};
use opsync_core::sync::WriteOrigin;
use opsync_core::util::normalize_text_option;

use crate::cli::TimeEntryCommands;
use crate::commands::common::{
    format_saved, format_time_entry_lines, local_store, open_database, outbound_sync,
};
use crate::error::CliError;

pub fn run_time_entry(
    command: TimeEntryCommands,
    db_path: &Path,
    settings: &SyncSettings,
) -> Result<(), CliError> {
    let db = open_database(db_path)?;

    match command {
        TimeEntryCommands::Add {
            work_package,
            hours,
            spent_on,
            comment,
        } => {
            let outbound = outbound_sync(settings)?;
            let store = local_store(&db, outbound.as_ref());
            if store.get_work_package(work_package)?.is_none() {
                return Err(CliError::NotFound("Work package", work_package));
            }

            let spent_on = spent_on.unwrap_or_else(|| Local::now().date_naive());
            let mut time_entry = TimeEntry::new(work_package, spent_on, hours);
            time_entry.comment = normalize_text_option(comment);

            let saved = store.create_time_entry(time_entry, WriteOrigin::Local)?;
            println!("{}", format_saved(saved.record.id, &saved.sync));
        }
        TimeEntryCommands::Edit {
            id,
            hours,
            spent_on,
            comment,
        } => {
            let changes = TimeEntryChanges {
                hours,
                spent_on,
                comment,
                ..TimeEntryChanges::default()
            };
            if changes.is_empty() {
                return Err(CliError::NoChanges);
            }

            let outbound = outbound_sync(settings)?;
            let store = local_store(&db, outbound.as_ref());
            let saved = store.update_time_entry(id, changes, WriteOrigin::Local)?;
            println!("{}", format_saved(saved.record.id, &saved.sync));
        }
        TimeEntryCommands::List { work_package, json } => {
            let store = local_store(&db, None);
            let time_entries = store.list_time_entries(work_package)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&time_entries)?);
            } else {
                for line in format_time_entry_lines(&time_entries) {
                    println!("{line}");
                }
            }
        }
    }

    Ok(())
}
