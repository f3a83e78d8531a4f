use std::path::PathBuf;

use clap::Parser;
use opsync_core::config::SyncSettings;
use opsync_core::db::Database;
use opsync_core::models::{Project, Stored};
use opsync_core::sync::{SyncOutcome, WriteOrigin};
use opsync_core::EntityKind;
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::cli::{Cli, Commands, CompletionShell, ProjectCommands};
use crate::commands::common::{
    default_db_path, format_project_lines, format_saved, local_store, parse_payload,
    resolve_db_path, resolve_project,
};
use crate::commands::completions::write_completions;
use crate::commands::hook::{format_stored_id, run_hook};
use crate::commands::project::run_project;
use crate::error::CliError;

fn unconfigured() -> SyncSettings {
    SyncSettings::from_lookup(|_| None).unwrap()
}

#[test]
fn db_path_prefers_flag_then_environment() {
    let settings = SyncSettings::from_lookup(|name| {
        (name == "OPSYNC_DB_PATH").then(|| "/tmp/from-env.db".to_string())
    })
    .unwrap();

    assert_eq!(
        resolve_db_path(Some(PathBuf::from("/tmp/flag.db")), &settings),
        PathBuf::from("/tmp/flag.db")
    );
    assert_eq!(
        resolve_db_path(None, &settings),
        PathBuf::from("/tmp/from-env.db")
    );
    assert_eq!(resolve_db_path(None, &unconfigured()), default_db_path());
}

#[test]
fn default_db_path_lives_under_opsync() {
    assert!(default_db_path().ends_with("opsync/opsync.db"));
}

#[test]
fn payload_must_be_a_json_object() {
    assert!(matches!(parse_payload("  \n"), Err(CliError::EmptyPayload)));
    assert!(matches!(parse_payload("[1, 2]"), Err(CliError::InvalidPayload)));
    assert!(matches!(
        parse_payload("{not json"),
        Err(CliError::Serialization(_))
    ));

    let record = parse_payload(r#"{"id": 7, "description": {"raw": "d"}}"#).unwrap();
    assert_eq!(record["id"], json!(7));
}

#[test]
fn stored_ids_print_without_quotes() {
    assert_eq!(format_stored_id(&json!("7")), "7");
    assert_eq!(format_stored_id(&json!(12)), "12");
}

#[test]
fn saved_line_reports_sync_outcome() {
    assert_eq!(format_saved(3, &SyncOutcome::Skipped), "3\tnot synced");
}

#[test]
fn project_lines_show_flags_and_remote_identity() {
    let mut private = Project::new("ops", "Operations");
    private.public = false;
    private.openproject_id = Some(40);
    let projects = vec![
        Stored {
            id: 1,
            fields: Project::new("demo", "Demo"),
        },
        Stored {
            id: 2,
            fields: private,
        },
    ];

    assert_eq!(
        format_project_lines(&projects),
        vec![
            "1  demo  Demo  [local only]".to_string(),
            "2  ops  Operations (private)  [remote #40]".to_string(),
        ]
    );
}

#[test]
fn projects_resolve_by_id_or_identifier() {
    let db = Database::open_in_memory().unwrap();
    let store = local_store(&db, None);
    let id = store
        .create_project(Project::new("demo", "Demo"), WriteOrigin::Local)
        .unwrap()
        .record
        .id;

    assert_eq!(resolve_project(&store, &id.to_string()).unwrap().id, id);
    assert_eq!(resolve_project(&store, " demo ").unwrap().id, id);
    assert!(matches!(
        resolve_project(&store, "missing"),
        Err(CliError::ProjectNotFound(_))
    ));
}

#[test]
fn hook_arguments_parse() {
    let cli = Cli::try_parse_from([
        "opsync",
        "hook",
        "work-package",
        "--action",
        "work_package:updated",
        "--existing-ids",
        "4,5",
    ])
    .unwrap();

    let Some(Commands::Hook {
        kind,
        action,
        existing_ids,
        forward,
        ..
    }) = cli.command
    else {
        panic!("expected the hook command");
    };
    assert_eq!(kind, EntityKind::WorkPackage);
    assert_eq!(action, "work_package:updated");
    assert_eq!(existing_ids, Some(vec![4, 5]));
    assert!(!forward);
}

#[test]
fn unknown_kind_is_rejected() {
    assert!(Cli::try_parse_from(["opsync", "hook", "issue"]).is_err());
}

#[test]
fn hook_writes_into_local_database() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("opsync.db");
    let payload = parse_payload(
        r#"{"_type": "Project", "id": 40, "identifier": "demo", "name": "Demo",
            "active": true, "public": true, "description": {"raw": "About"}}"#,
    )
    .unwrap();

    run_hook(
        EntityKind::Project,
        "project:created",
        &payload,
        None,
        false,
        &db_path,
        &unconfigured(),
    )
    .unwrap();

    let db = Database::open(&db_path).unwrap();
    let projects = local_store(&db, None).list_projects().unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].openproject_id, Some(40));
    assert_eq!(projects[0].description.as_deref(), Some("About"));
}

#[test]
fn project_commands_work_without_openproject() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("opsync.db");
    let settings = unconfigured();

    run_project(
        ProjectCommands::Add {
            identifier: "demo".into(),
            name: "Demo".into(),
            description: Some("  ".into()),
            private: true,
            inactive: false,
        },
        &db_path,
        &settings,
    )
    .unwrap();

    let result = run_project(
        ProjectCommands::Edit {
            project: "demo".into(),
            name: None,
            description: None,
            active: None,
            public: None,
        },
        &db_path,
        &settings,
    );
    assert!(matches!(result, Err(CliError::NoChanges)));

    let db = Database::open(&db_path).unwrap();
    let projects = local_store(&db, None).list_projects().unwrap();
    assert_eq!(projects[0].description, None);
    assert!(!projects[0].public);
}

#[test]
fn pull_requires_openproject_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let result = crate::commands::pull::run_pull(
        None,
        &dir.path().join("opsync.db"),
        &unconfigured(),
    );
    assert!(matches!(result, Err(CliError::Config(_))));
}

#[test]
fn completions_name_the_binary() {
    let mut buffer = Vec::new();
    write_completions(CompletionShell::Bash, &mut buffer);
    let script = String::from_utf8(buffer).unwrap();
    assert!(script.contains("opsync"));
}
