use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use opsync_core::{EntityKind, LocalId, RemoteId};

#[derive(Parser)]
#[command(name = "opsync")]
#[command(about = "Keep local projects, work packages and time entries in sync with OpenProject")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage local projects
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Manage local work packages
    #[command(alias = "wp")]
    WorkPackage {
        #[command(subcommand)]
        command: WorkPackageCommands,
    },
    /// Manage local time entries
    #[command(alias = "te")]
    TimeEntry {
        #[command(subcommand)]
        command: TimeEntryCommands,
    },
    /// Apply an OpenProject webhook payload to the local store
    Hook {
        /// Entity kind of the payload (project, work_package, time_entry)
        kind: EntityKind,
        /// Webhook action, e.g. `project:updated`. Empty reconciles by remote id.
        #[arg(short, long, default_value = "")]
        action: String,
        /// Payload file (piped stdin when omitted)
        #[arg(short, long, value_name = "PATH")]
        payload: Option<PathBuf>,
        /// Remote ids already known locally, comma separated
        #[arg(long, value_delimiter = ',', value_name = "IDS")]
        existing_ids: Option<Vec<RemoteId>>,
        /// Write through the store API endpoint instead of the local database
        #[arg(long)]
        forward: bool,
    },
    /// Pull full listings from OpenProject into the local store
    Pull {
        /// Only pull this kind (all kinds, parents first, when omitted)
        kind: Option<EntityKind>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Create a project
    #[command(alias = "new")]
    Add {
        /// Unique short identifier
        identifier: String,
        /// Display name
        name: String,
        #[arg(short, long)]
        description: Option<String>,
        /// Create the project as private
        #[arg(long)]
        private: bool,
        /// Create the project as archived
        #[arg(long)]
        inactive: bool,
    },
    /// Change fields of a project
    Edit {
        /// Project ID or identifier
        project: String,
        #[arg(long)]
        name: Option<String>,
        /// New description; an empty string clears it
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long, value_name = "BOOL")]
        active: Option<bool>,
        #[arg(long, value_name = "BOOL")]
        public: Option<bool>,
    },
    /// List projects
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a project with its work packages and time entries (local only)
    Delete {
        /// Project ID or identifier
        project: String,
    },
}

#[derive(Subcommand)]
pub enum WorkPackageCommands {
    /// Create a work package
    #[command(alias = "new")]
    Add {
        /// Project ID or identifier
        #[arg(short, long)]
        project: String,
        subject: String,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long, value_name = "YYYY-MM-DD")]
        start: Option<NaiveDate>,
        #[arg(long, value_name = "YYYY-MM-DD")]
        due: Option<NaiveDate>,
        /// Estimated time as an ISO 8601 duration, e.g. PT8H
        #[arg(long, value_name = "DURATION")]
        estimated: Option<String>,
        #[arg(long, value_name = "PERCENT")]
        done: Option<i64>,
    },
    /// Change fields of a work package
    Edit {
        id: LocalId,
        #[arg(long)]
        subject: Option<String>,
        /// New description; an empty string clears it
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long, value_name = "YYYY-MM-DD")]
        start: Option<NaiveDate>,
        #[arg(long, value_name = "YYYY-MM-DD")]
        due: Option<NaiveDate>,
        #[arg(long, value_name = "DURATION")]
        estimated: Option<String>,
        #[arg(long, value_name = "PERCENT")]
        done: Option<i64>,
    },
    /// List work packages
    List {
        /// Only work packages of this project (ID or identifier)
        #[arg(short, long)]
        project: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum TimeEntryCommands {
    /// Log time on a work package
    #[command(alias = "new")]
    Add {
        /// Local work package ID
        #[arg(short, long)]
        work_package: LocalId,
        /// Hours as an ISO 8601 duration, e.g. PT1H30M
        hours: String,
        /// Day the time was spent (today when omitted)
        #[arg(long, value_name = "YYYY-MM-DD")]
        spent_on: Option<NaiveDate>,
        #[arg(short, long)]
        comment: Option<String>,
    },
    /// Change fields of a time entry
    Edit {
        id: LocalId,
        #[arg(long)]
        hours: Option<String>,
        #[arg(long, value_name = "YYYY-MM-DD")]
        spent_on: Option<NaiveDate>,
        /// New comment; an empty string clears it
        #[arg(short, long)]
        comment: Option<String>,
    },
    /// List time entries
    List {
        /// Only entries of this work package
        #[arg(short, long)]
        work_package: Option<LocalId>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
