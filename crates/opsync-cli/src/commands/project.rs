use std::path::Path;

use opsync_core::config::SyncSettings;
use opsync_core::models::{Project, ProjectChanges};
use opsync_core::sync::WriteOrigin;
use opsync_core::util::normalize_text_option;

use crate::cli::ProjectCommands;
use crate::commands::common::{
    format_project_lines, format_saved, local_store, open_database, outbound_sync,
    resolve_project,
};
use crate::error::CliError;

pub fn run_project(
    command: ProjectCommands,
    db_path: &Path,
    settings: &SyncSettings,
) -> Result<(), CliError> {
    let db = open_database(db_path)?;

    match command {
        ProjectCommands::Add {
            identifier,
            name,
            description,
            private,
            inactive,
        } => {
            let outbound = outbound_sync(settings)?;
            let store = local_store(&db, outbound.as_ref());

            let mut project = Project::new(identifier.trim(), name.trim());
            project.description = normalize_text_option(description);
            project.public = !private;
            project.active = !inactive;

            let saved = store.create_project(project, WriteOrigin::Local)?;
            println!("{}", format_saved(saved.record.id, &saved.sync));
        }
        ProjectCommands::Edit {
            project,
            name,
            description,
            active,
            public,
        } => {
            let changes = ProjectChanges {
                name,
                active,
                public,
                description,
            };
            if changes.is_empty() {
                return Err(CliError::NoChanges);
            }

            let outbound = outbound_sync(settings)?;
            let store = local_store(&db, outbound.as_ref());
            let id = resolve_project(&store, &project)?.id;

            let saved = store.update_project(id, changes, WriteOrigin::Local)?;
            println!("{}", format_saved(saved.record.id, &saved.sync));
        }
        ProjectCommands::List { json } => {
            let store = local_store(&db, None);
            let projects = store.list_projects()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&projects)?);
            } else {
                for line in format_project_lines(&projects) {
                    println!("{line}");
                }
            }
        }
        ProjectCommands::Delete { project } => {
            let store = local_store(&db, None);
            let project = resolve_project(&store, &project)?;
            store.delete_project(project.id)?;
            println!("{}", project.id);
        }
    }

    Ok(())
}
