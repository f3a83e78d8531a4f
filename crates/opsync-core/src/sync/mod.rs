//! Bidirectional synchronization between the local store and OpenProject.
//!
//! Inbound: webhook or listing record -> [`normalize`] -> [`linker`] ->
//! [`reconcile`] -> local store write (never re-triggering outbound sync).
//!
//! Outbound: local save -> [`SaveHook`] -> wire shape -> OpenProject
//! create/update -> field-only write-back of the remote identity.

pub mod inbound;
pub mod linker;
pub mod normalize;
pub mod outbound;
pub mod pull;
pub mod reconcile;

use std::fmt;

use crate::error::{Error, Result};
use crate::models::{
    EntityKind, LocalId, Project, Record, RemoteId, Stored, TimeEntry, WorkPackage,
};

pub use inbound::{ingest, process_hook};
pub use outbound::OutboundSync;
pub use pull::{ListingPull, PullReport};
pub use reconcile::{decide_action, SyncAction};

/// The local store as seen by inbound sync.
///
/// Writes made through this trait always carry the skip marker: they never
/// fire the outbound save hook. `update` is keyed by remote identity, the way
/// the store's REST endpoint looks records up.
pub trait LocalStore {
    /// Every record of a kind, in the flat local shape.
    fn list(&self, kind: EntityKind) -> Result<Vec<Record>>;

    /// Create a record; returns it with its local `id`.
    fn create(&self, kind: EntityKind, record: &Record) -> Result<Record>;

    /// Merge `partial` into the record with the given remote identity.
    fn update(&self, kind: EntityKind, remote_id: RemoteId, partial: &Record) -> Result<Record>;

    /// Local identity of the record with the given remote identity, or
    /// [`Error::NotFound`].
    fn local_id_for(&self, kind: EntityKind, remote_id: RemoteId) -> Result<LocalId>;
}

/// Who is writing to the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOrigin {
    /// A local edit; fires the save hook after the write
    Local,
    /// A write coming from synchronization itself; never fires the save hook
    Sync,
}

/// Fields to write back onto a local record after a successful push.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteBack {
    pub remote_id: RemoteId,
    pub fields: Record,
}

/// Result of the outbound hook for one local save.
#[derive(Debug)]
pub enum SyncOutcome {
    /// No hook ran (sync-originated write, or no hook registered)
    Skipped,
    Synced(WriteBack),
    /// The push failed; the local write stands and is not retried
    Failed(Error),
}

impl SyncOutcome {
    pub const fn remote_id(&self) -> Option<RemoteId> {
        match self {
            Self::Synced(write_back) => Some(write_back.remote_id),
            _ => None,
        }
    }

    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skipped => f.write_str("not synced"),
            Self::Synced(write_back) => write!(f, "synced as #{}", write_back.remote_id),
            Self::Failed(error) => write!(f, "sync failed: {error}"),
        }
    }
}

/// A saved entity handed to the outbound hook, with its parent's remote
/// identity already resolved.
#[derive(Debug, Clone, Copy)]
pub enum SavedEntity<'a> {
    Project(&'a Stored<Project>),
    WorkPackage {
        work_package: &'a Stored<WorkPackage>,
        project_remote_id: Option<RemoteId>,
    },
    TimeEntry {
        time_entry: &'a Stored<TimeEntry>,
        work_package_remote_id: Option<RemoteId>,
    },
}

impl SavedEntity<'_> {
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Project(_) => EntityKind::Project,
            Self::WorkPackage { .. } => EntityKind::WorkPackage,
            Self::TimeEntry { .. } => EntityKind::TimeEntry,
        }
    }

    pub const fn local_id(&self) -> LocalId {
        match self {
            Self::Project(project) => project.id,
            Self::WorkPackage { work_package, .. } => work_package.id,
            Self::TimeEntry { time_entry, .. } => time_entry.id,
        }
    }

    pub const fn remote_id(&self) -> Option<RemoteId> {
        match self {
            Self::Project(project) => project.fields.openproject_id,
            Self::WorkPackage { work_package, .. } => work_package.fields.openproject_id,
            Self::TimeEntry { time_entry, .. } => time_entry.fields.openproject_id,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SaveEvent<'a> {
    pub entity: SavedEntity<'a>,
    pub created: bool,
}

/// Called synchronously by the local store right after a local write.
pub trait SaveHook {
    fn after_save(&self, event: &SaveEvent<'_>) -> SyncOutcome;
}
