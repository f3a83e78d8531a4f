use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use opsync_core::config::SyncSettings;
use opsync_core::db::{Database, SqliteStore};
use opsync_core::models::{Project, Stored, TimeEntry, WorkPackage};
use opsync_core::remote::{HttpTransport, OpenProjectClient};
use opsync_core::sync::{OutboundSync, SyncOutcome};
use opsync_core::{Record, RemoteId};
use serde_json::Value;

use crate::error::CliError;

pub type Outbound = OutboundSync<HttpTransport>;

pub fn resolve_db_path(cli_db_path: Option<PathBuf>, settings: &SyncSettings) -> PathBuf {
    cli_db_path
        .or_else(|| settings.db_path.clone())
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("opsync")
        .join("opsync.db")
}

pub fn open_database(path: &Path) -> Result<Database, CliError> {
    Ok(Database::open(path)?)
}

/// Outbound sync for local writes, when an OpenProject endpoint is configured.
pub fn outbound_sync(settings: &SyncSettings) -> Result<Option<Outbound>, CliError> {
    let Some(endpoint) = &settings.openproject else {
        tracing::debug!("OPENPROJECT_API_URL not set, local writes are not pushed");
        return Ok(None);
    };
    let transport = HttpTransport::new(settings.http_timeout)?;
    Ok(Some(OutboundSync::new(OpenProjectClient::from_endpoint(
        transport, endpoint,
    ))))
}

pub fn local_store<'a>(db: &'a Database, outbound: Option<&'a Outbound>) -> SqliteStore<'a> {
    let store = SqliteStore::new(db.connection());
    match outbound {
        Some(hook) => store.with_save_hook(hook),
        None => store,
    }
}

/// Look a project up by local id, then by identifier.
pub fn resolve_project(
    store: &SqliteStore<'_>,
    reference: &str,
) -> Result<Stored<Project>, CliError> {
    let reference = reference.trim();
    let found = match reference.parse::<i64>() {
        Ok(id) => store.get_project(id)?,
        Err(_) => None,
    };
    let found = match found {
        Some(project) => Some(project),
        None => store.find_project(reference)?,
    };
    found.ok_or_else(|| CliError::ProjectNotFound(reference.to_string()))
}

pub fn read_payload(path: Option<&Path>) -> Result<Record, CliError> {
    let text = match path {
        Some(path) => std::fs::read_to_string(path)?,
        None => read_piped_stdin()?.ok_or(CliError::EmptyPayload)?,
    };
    parse_payload(&text)
}

pub fn parse_payload(text: &str) -> Result<Record, CliError> {
    if text.trim().is_empty() {
        return Err(CliError::EmptyPayload);
    }
    match serde_json::from_str::<Value>(text)? {
        Value::Object(record) => Ok(record),
        _ => Err(CliError::InvalidPayload),
    }
}

fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(Some(buffer))
}

pub fn format_saved(id: i64, outcome: &SyncOutcome) -> String {
    format!("{id}\t{outcome}")
}

fn remote_label(remote_id: Option<RemoteId>) -> String {
    remote_id.map_or_else(|| "local only".to_string(), |id| format!("remote #{id}"))
}

pub fn format_project_lines(projects: &[Stored<Project>]) -> Vec<String> {
    projects
        .iter()
        .map(|project| {
            let mut flags = Vec::new();
            if !project.active {
                flags.push("archived");
            }
            if !project.public {
                flags.push("private");
            }
            let flags = if flags.is_empty() {
                String::new()
            } else {
                format!(" ({})", flags.join(", "))
            };
            format!(
                "{}  {}  {}{}  [{}]",
                project.id,
                project.identifier,
                project.name,
                flags,
                remote_label(project.openproject_id)
            )
        })
        .collect()
}

pub fn format_work_package_lines(work_packages: &[Stored<WorkPackage>]) -> Vec<String> {
    work_packages
        .iter()
        .map(|work_package| {
            let done = work_package
                .percentage_done
                .map_or_else(String::new, |percent| format!(" {percent}%"));
            format!(
                "{}  {}{}  (project {})  [{}]",
                work_package.id,
                work_package.subject,
                done,
                work_package.project,
                remote_label(work_package.openproject_id)
            )
        })
        .collect()
}

pub fn format_time_entry_lines(time_entries: &[Stored<TimeEntry>]) -> Vec<String> {
    time_entries
        .iter()
        .map(|entry| {
            let day = entry
                .spent_on
                .map_or_else(|| "----------".to_string(), |day| day.to_string());
            let comment = entry
                .comment
                .as_deref()
                .map_or_else(String::new, |comment| format!("  {comment}"));
            format!(
                "{}  {}  {}  (work package {}){}  [{}]",
                entry.id,
                day,
                entry.hours.as_deref().unwrap_or("-"),
                entry.work_package,
                comment,
                remote_label(entry.openproject_id)
            )
        })
        .collect()
}
