use std::path::Path;

use opsync_core::config::SyncSettings;
use opsync_core::models::{WorkPackage, WorkPackageChanges};
use opsync_core::sync::WriteOrigin;
use opsync_core::util::normalize_text_option;

use crate::cli::WorkPackageCommands;
use crate::commands::common::{
    format_saved, format_work_package_lines, local_store, open_database, outbound_sync,
    resolve_project,
};
use crate::error::CliError;

pub fn run_work_package(
    command: WorkPackageCommands,
    db_path: &Path,
    settings: &SyncSettings,
) -> Result<(), CliError> {
    let db = open_database(db_path)?;

    match command {
        WorkPackageCommands::Add {
            project,
            subject,
            description,
            start,
            due,
            estimated,
            done,
        } => {
            let outbound = outbound_sync(settings)?;
            let store = local_store(&db, outbound.as_ref());
            let project = resolve_project(&store, &project)?;

            let mut work_package = WorkPackage::new(project.id, subject.trim());
            work_package.description = normalize_text_option(description);
            work_package.start_date = start;
            work_package.due_date = due;
            work_package.estimated_time = normalize_text_option(estimated);
            work_package.percentage_done = done;

            let saved = store.create_work_package(work_package, WriteOrigin::Local)?;
            println!("{}", format_saved(saved.record.id, &saved.sync));
        }
        WorkPackageCommands::Edit {
            id,
            subject,
            description,
            start,
            due,
            estimated,
            done,
        } => {
            let changes = WorkPackageChanges {
                subject,
                description,
                start_date: start,
                due_date: due,
                estimated_time: estimated,
                percentage_done: done,
                ..WorkPackageChanges::default()
            };
            if changes.is_empty() {
                return Err(CliError::NoChanges);
            }

            let outbound = outbound_sync(settings)?;
            let store = local_store(&db, outbound.as_ref());
            let saved = store.update_work_package(id, changes, WriteOrigin::Local)?;
            println!("{}", format_saved(saved.record.id, &saved.sync));
        }
        WorkPackageCommands::List { project, json } => {
            let store = local_store(&db, None);
            let project_id = match project {
                Some(reference) => Some(resolve_project(&store, &reference)?.id),
                None => None,
            };
            let work_packages = store.list_work_packages(project_id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&work_packages)?);
            } else {
                for line in format_work_package_lines(&work_packages) {
                    println!("{line}");
                }
            }
        }
    }

    Ok(())
}
