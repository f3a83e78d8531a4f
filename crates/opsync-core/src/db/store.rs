//! The local store: typed entity writes plus the inbound sync surface.

use rusqlite::types::Value as SqlValue;
use rusqlite::Connection;
use serde_json::Value;

use super::table::{self, Table};
use crate::error::{Error, Result};
use crate::models::{
    EntityKind, LocalId, Project, ProjectChanges, Record, RemoteId, Stored, TimeEntry,
    TimeEntryChanges, WorkPackage, WorkPackageChanges,
};
use crate::sync::{LocalStore, SaveEvent, SaveHook, SyncOutcome, WriteBack, WriteOrigin};

/// A written entity and what the outbound hook made of it.
#[derive(Debug)]
pub struct Saved<T> {
    /// The row as stored, including any write-back from the remote
    pub record: Stored<T>,
    pub sync: SyncOutcome,
}

/// `SQLite` implementation of the local store
pub struct SqliteStore<'a> {
    conn: &'a Connection,
    hook: Option<&'a dyn SaveHook>,
}

impl<'a> SqliteStore<'a> {
    /// Create a new store with the given connection and no save hook
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn, hook: None }
    }

    /// Run `hook` after every [`WriteOrigin::Local`] write.
    #[must_use]
    pub const fn with_save_hook(mut self, hook: &'a dyn SaveHook) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn create_project(&self, project: Project, origin: WriteOrigin) -> Result<Saved<Project>> {
        self.insert_entity(project, origin)
    }

    pub fn update_project(
        &self,
        id: LocalId,
        changes: ProjectChanges,
        origin: WriteOrigin,
    ) -> Result<Saved<Project>> {
        self.edit_entity(id, origin, |project| changes.apply(project))
    }

    pub fn get_project(&self, id: LocalId) -> Result<Option<Stored<Project>>> {
        table::get(self.conn, id)
    }

    pub fn find_project(&self, identifier: &str) -> Result<Option<Stored<Project>>> {
        Ok(table::select(
            self.conn,
            "identifier = ?",
            &[SqlValue::Text(identifier.to_string())],
        )?
        .into_iter()
        .next())
    }

    pub fn list_projects(&self) -> Result<Vec<Stored<Project>>> {
        table::select(self.conn, "1 = 1", &[])
    }

    /// Delete a project together with its work packages and their time entries.
    ///
    /// Local only: nothing is deleted remotely.
    pub fn delete_project(&self, id: LocalId) -> Result<()> {
        let rows = self
            .conn
            .execute("DELETE FROM projects WHERE id = ?", [id])?;
        if rows == 0 {
            return Err(Error::not_found(EntityKind::Project, id));
        }
        tracing::info!("Deleted project #{id}");
        Ok(())
    }

    pub fn create_work_package(
        &self,
        work_package: WorkPackage,
        origin: WriteOrigin,
    ) -> Result<Saved<WorkPackage>> {
        self.insert_entity(work_package, origin)
    }

    pub fn update_work_package(
        &self,
        id: LocalId,
        changes: WorkPackageChanges,
        origin: WriteOrigin,
    ) -> Result<Saved<WorkPackage>> {
        self.edit_entity(id, origin, |work_package| changes.apply(work_package))
    }

    pub fn get_work_package(&self, id: LocalId) -> Result<Option<Stored<WorkPackage>>> {
        table::get(self.conn, id)
    }

    /// Work packages, optionally only those of one project.
    pub fn list_work_packages(&self, project: Option<LocalId>) -> Result<Vec<Stored<WorkPackage>>> {
        match project {
            Some(project) => table::select(self.conn, "project_id = ?", &[SqlValue::Integer(project)]),
            None => table::select(self.conn, "1 = 1", &[]),
        }
    }

    pub fn create_time_entry(
        &self,
        time_entry: TimeEntry,
        origin: WriteOrigin,
    ) -> Result<Saved<TimeEntry>> {
        self.insert_entity(time_entry, origin)
    }

    pub fn update_time_entry(
        &self,
        id: LocalId,
        changes: TimeEntryChanges,
        origin: WriteOrigin,
    ) -> Result<Saved<TimeEntry>> {
        self.edit_entity(id, origin, |time_entry| changes.apply(time_entry))
    }

    pub fn get_time_entry(&self, id: LocalId) -> Result<Option<Stored<TimeEntry>>> {
        table::get(self.conn, id)
    }

    /// Time entries, optionally only those of one work package.
    pub fn list_time_entries(
        &self,
        work_package: Option<LocalId>,
    ) -> Result<Vec<Stored<TimeEntry>>> {
        match work_package {
            Some(work_package) => table::select(
                self.conn,
                "work_package_id = ?",
                &[SqlValue::Integer(work_package)],
            ),
            None => table::select(self.conn, "1 = 1", &[]),
        }
    }

    fn insert_entity<T: Table>(&self, fields: T, origin: WriteOrigin) -> Result<Saved<T>> {
        fields.check()?;
        let id = table::insert(self.conn, &fields)?;
        tracing::info!("Created {} #{id}", T::KIND);
        self.after_write(Stored { id, fields }, true, origin)
    }

    fn edit_entity<T: Table>(
        &self,
        id: LocalId,
        origin: WriteOrigin,
        edit: impl FnOnce(&mut T),
    ) -> Result<Saved<T>> {
        let mut record: Stored<T> =
            table::get(self.conn, id)?.ok_or_else(|| Error::not_found(T::KIND, id))?;
        edit(&mut record.fields);
        record.fields.check()?;
        table::write(self.conn, id, &record.fields)?;
        tracing::info!("Updated {} #{id}", T::KIND);
        self.after_write(record, false, origin)
    }

    fn after_write<T: Table>(
        &self,
        mut record: Stored<T>,
        created: bool,
        origin: WriteOrigin,
    ) -> Result<Saved<T>> {
        let Some(hook) = self.hook.filter(|_| origin == WriteOrigin::Local) else {
            return Ok(Saved {
                record,
                sync: SyncOutcome::Skipped,
            });
        };

        let parent_remote_id = match self.parent_remote_id(&record.fields) {
            Ok(parent_remote_id) => parent_remote_id,
            Err(error) => {
                tracing::warn!(
                    "Could not look up the parent of {} #{}: {error}",
                    T::KIND,
                    record.id
                );
                return Ok(Saved {
                    record,
                    sync: SyncOutcome::Failed(error),
                });
            }
        };
        let outcome = hook.after_save(&SaveEvent {
            entity: T::saved_entity(&record, parent_remote_id),
            created,
        });

        let sync = match outcome {
            SyncOutcome::Synced(write_back) => match self.apply_write_back(&mut record, &write_back) {
                Ok(()) => SyncOutcome::Synced(write_back),
                Err(error) => {
                    tracing::warn!(
                        "Could not store remote identity #{} on {} #{}: {error}",
                        write_back.remote_id,
                        T::KIND,
                        record.id
                    );
                    SyncOutcome::Failed(error)
                }
            },
            other => other,
        };
        Ok(Saved { record, sync })
    }

    fn parent_remote_id<T: Table>(&self, fields: &T) -> Result<Option<RemoteId>> {
        match (T::KIND.parent(), fields.parent_id()) {
            (Some((parent_kind, _)), Some(parent_id)) => {
                table::remote_id_for(self.conn, parent_kind, parent_id)
            }
            _ => Ok(None),
        }
    }

    /// Field-only write of remote-assigned values; never re-fires the hook.
    ///
    /// The remote id is always stored. Any other field that does not decode
    /// is skipped with a warning.
    fn apply_write_back<T: Table>(&self, record: &mut Stored<T>, write_back: &WriteBack) -> Result<()> {
        let mut merged = record.to_record()?;
        merged.remove("id");
        merged.insert(
            "openproject_id".to_string(),
            Value::from(write_back.remote_id),
        );
        let mut fields: T = table::decode(merged.clone())?;

        for (key, value) in &write_back.fields {
            if key == "openproject_id" {
                continue;
            }
            let mut candidate = merged.clone();
            candidate.insert(key.clone(), value.clone());
            match table::decode::<T>(candidate.clone()) {
                Ok(decoded) => {
                    merged = candidate;
                    fields = decoded;
                }
                Err(error) => tracing::warn!(
                    "Ignoring remote {key} for {} #{}: {error}",
                    T::KIND,
                    record.id
                ),
            }
        }

        table::write(self.conn, record.id, &fields)?;
        record.fields = fields;
        Ok(())
    }

    fn list_records<T: Table>(&self) -> Result<Vec<Record>> {
        table::select::<T>(self.conn, "1 = 1", &[])?
            .iter()
            .map(Stored::to_record)
            .collect()
    }

    fn create_record<T: Table>(&self, record: &Record) -> Result<Record> {
        let saved = self.insert_entity(table::decode::<T>(record.clone())?, WriteOrigin::Sync)?;
        saved.record.to_record()
    }

    fn update_record<T: Table>(&self, remote_id: RemoteId, partial: &Record) -> Result<Record> {
        let existing: Stored<T> = table::find_by_remote(self.conn, remote_id)?
            .ok_or_else(|| Error::not_found(T::KIND, remote_id))?;

        let mut merged = existing.to_record()?;
        merged.remove("id");
        let mut partial = partial.clone();
        partial.remove("id");
        merge(&mut merged, &partial);

        let fields: T = table::decode(merged)?;
        fields.check()?;
        table::write(self.conn, existing.id, &fields)?;
        tracing::info!("Updated {} #{} from remote #{remote_id}", T::KIND, existing.id);
        Stored {
            id: existing.id,
            fields,
        }
        .to_record()
    }
}

fn merge(target: &mut Record, changes: &Record) {
    for (key, value) in changes {
        target.insert(key.clone(), value.clone());
    }
}

/// Inbound writes: always without the save hook.
impl LocalStore for SqliteStore<'_> {
    fn list(&self, kind: EntityKind) -> Result<Vec<Record>> {
        match kind {
            EntityKind::Project => self.list_records::<Project>(),
            EntityKind::WorkPackage => self.list_records::<WorkPackage>(),
            EntityKind::TimeEntry => self.list_records::<TimeEntry>(),
        }
    }

    fn create(&self, kind: EntityKind, record: &Record) -> Result<Record> {
        match kind {
            EntityKind::Project => self.create_record::<Project>(record),
            EntityKind::WorkPackage => self.create_record::<WorkPackage>(record),
            EntityKind::TimeEntry => self.create_record::<TimeEntry>(record),
        }
    }

    fn update(&self, kind: EntityKind, remote_id: RemoteId, partial: &Record) -> Result<Record> {
        match kind {
            EntityKind::Project => self.update_record::<Project>(remote_id, partial),
            EntityKind::WorkPackage => self.update_record::<WorkPackage>(remote_id, partial),
            EntityKind::TimeEntry => self.update_record::<TimeEntry>(remote_id, partial),
        }
    }

    fn local_id_for(&self, kind: EntityKind, remote_id: RemoteId) -> Result<LocalId> {
        table::local_id_for(self.conn, kind, remote_id)?
            .ok_or_else(|| Error::not_found(kind, remote_id))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::db::Database;
    use crate::sync::SavedEntity;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn record(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    /// Records every event and answers with a fixed remote id.
    #[derive(Default)]
    struct RecordingHook {
        events: RefCell<Vec<(EntityKind, LocalId, bool, Option<RemoteId>)>>,
        fail: bool,
    }

    impl SaveHook for RecordingHook {
        fn after_save(&self, event: &SaveEvent<'_>) -> SyncOutcome {
            let parent = match event.entity {
                SavedEntity::Project(_) => None,
                SavedEntity::WorkPackage {
                    project_remote_id, ..
                } => project_remote_id,
                SavedEntity::TimeEntry {
                    work_package_remote_id,
                    ..
                } => work_package_remote_id,
            };
            self.events.borrow_mut().push((
                event.entity.kind(),
                event.entity.local_id(),
                event.created,
                parent,
            ));
            if self.fail {
                return SyncOutcome::Failed(Error::MalformedResponse("down".into()));
            }
            let remote_id = 100 + event.entity.local_id();
            let mut fields = Record::new();
            fields.insert("openproject_id".into(), json!(remote_id));
            if event.entity.kind() == EntityKind::WorkPackage {
                fields.insert("lockVersion".into(), json!(1));
            }
            SyncOutcome::Synced(WriteBack { remote_id, fields })
        }
    }

    #[test]
    fn test_create_and_get() {
        let db = setup();
        let store = SqliteStore::new(db.connection());

        let saved = store
            .create_project(Project::new("demo", "Demo"), WriteOrigin::Local)
            .unwrap();
        assert!(matches!(saved.sync, SyncOutcome::Skipped));

        let fetched = store.get_project(saved.record.id).unwrap().unwrap();
        assert_eq!(fetched, saved.record);
        assert_eq!(
            store.find_project("demo").unwrap().map(|project| project.id),
            Some(saved.record.id)
        );
    }

    #[test]
    fn test_duplicate_identifier_is_validation_error() {
        let db = setup();
        let store = SqliteStore::new(db.connection());

        store
            .create_project(Project::new("demo", "Demo"), WriteOrigin::Local)
            .unwrap();
        let result = store.create_project(Project::new("demo", "Other"), WriteOrigin::Local);
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_dangling_parent_is_validation_error() {
        let db = setup();
        let store = SqliteStore::new(db.connection());

        let result = store.create_work_package(WorkPackage::new(42, "Orphan"), WriteOrigin::Local);
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_local_write_fires_hook_and_applies_write_back() {
        let db = setup();
        let hook = RecordingHook::default();
        let store = SqliteStore::new(db.connection()).with_save_hook(&hook);

        let project = store
            .create_project(Project::new("demo", "Demo"), WriteOrigin::Local)
            .unwrap();
        assert_eq!(project.sync.remote_id(), Some(100 + project.record.id));
        assert_eq!(project.record.openproject_id, Some(100 + project.record.id));

        let work_package = store
            .create_work_package(WorkPackage::new(project.record.id, "Plan"), WriteOrigin::Local)
            .unwrap();
        assert_eq!(work_package.record.lock_version, Some(1));

        let stored = store.get_work_package(work_package.record.id).unwrap().unwrap();
        assert_eq!(stored.openproject_id, Some(100 + work_package.record.id));

        // The write-back itself must not trigger another sync.
        let events = hook.events.borrow();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[1],
            (
                EntityKind::WorkPackage,
                work_package.record.id,
                true,
                Some(100 + project.record.id)
            )
        );
    }

    #[test]
    fn test_sync_origin_skips_hook() {
        let db = setup();
        let hook = RecordingHook::default();
        let store = SqliteStore::new(db.connection()).with_save_hook(&hook);

        let saved = store
            .create_project(Project::new("demo", "Demo"), WriteOrigin::Sync)
            .unwrap();
        store
            .update_project(
                saved.record.id,
                ProjectChanges {
                    name: Some("Renamed".into()),
                    ..ProjectChanges::default()
                },
                WriteOrigin::Sync,
            )
            .unwrap();

        assert!(hook.events.borrow().is_empty());
    }

    #[test]
    fn test_failed_sync_keeps_local_write() {
        let db = setup();
        let hook = RecordingHook {
            fail: true,
            ..RecordingHook::default()
        };
        let store = SqliteStore::new(db.connection()).with_save_hook(&hook);

        let saved = store
            .create_project(Project::new("demo", "Demo"), WriteOrigin::Local)
            .unwrap();
        assert!(saved.sync.is_failed());
        let stored = store.get_project(saved.record.id).unwrap().unwrap();
        assert_eq!(stored.openproject_id, None);
    }

    #[test]
    fn test_update_reports_created_false() {
        let db = setup();
        let hook = RecordingHook::default();
        let store = SqliteStore::new(db.connection()).with_save_hook(&hook);

        let saved = store
            .create_project(Project::new("demo", "Demo"), WriteOrigin::Sync)
            .unwrap();
        store
            .update_project(
                saved.record.id,
                ProjectChanges {
                    public: Some(false),
                    ..ProjectChanges::default()
                },
                WriteOrigin::Local,
            )
            .unwrap();

        let events = hook.events.borrow();
        assert_eq!(events.len(), 1);
        assert!(!events[0].2);
    }

    #[test]
    fn test_delete_project_cascades() {
        let db = setup();
        let store = SqliteStore::new(db.connection());

        let project = store
            .create_project(Project::new("demo", "Demo"), WriteOrigin::Local)
            .unwrap()
            .record;
        let work_package = store
            .create_work_package(WorkPackage::new(project.id, "Plan"), WriteOrigin::Local)
            .unwrap()
            .record;
        let day = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        store
            .create_time_entry(TimeEntry::new(work_package.id, day, "PT1H"), WriteOrigin::Local)
            .unwrap();

        store.delete_project(project.id).unwrap();
        assert!(store.list_work_packages(None).unwrap().is_empty());
        assert!(store.list_time_entries(None).unwrap().is_empty());
        assert!(matches!(
            store.delete_project(project.id),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_list_filters_by_parent() {
        let db = setup();
        let store = SqliteStore::new(db.connection());

        let first = store
            .create_project(Project::new("one", "One"), WriteOrigin::Local)
            .unwrap()
            .record;
        let second = store
            .create_project(Project::new("two", "Two"), WriteOrigin::Local)
            .unwrap()
            .record;
        store
            .create_work_package(WorkPackage::new(first.id, "A"), WriteOrigin::Local)
            .unwrap();
        store
            .create_work_package(WorkPackage::new(second.id, "B"), WriteOrigin::Local)
            .unwrap();

        let listed = store.list_work_packages(Some(second.id)).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].subject, "B");
        assert_eq!(store.list_work_packages(None).unwrap().len(), 2);
    }

    #[test]
    fn test_local_store_create_and_update_by_remote_id() {
        let db = setup();
        let hook = RecordingHook::default();
        let store = SqliteStore::new(db.connection()).with_save_hook(&hook);

        let created = LocalStore::create(
            &store,
            EntityKind::Project,
            &record(json!({
                "id": 7,
                "openproject_id": 7,
                "identifier": "demo",
                "name": "Demo",
                "active": "True",
                "public": false,
                "description": "",
                "_links": {"self": {"href": "/api/v3/projects/7"}}
            })),
        )
        .unwrap();
        assert_eq!(created["openproject_id"], json!(7));
        assert_eq!(created["public"], json!(false));

        let updated = LocalStore::update(
            &store,
            EntityKind::Project,
            7,
            &record(json!({"id": 7, "description": "d"})),
        )
        .unwrap();
        assert_eq!(updated["id"], created["id"]);
        assert_eq!(updated["description"], json!("d"));
        assert_eq!(updated["name"], json!("Demo"));

        assert_eq!(
            store.local_id_for(EntityKind::Project, 7).unwrap(),
            created["id"].as_i64().unwrap()
        );
        assert!(hook.events.borrow().is_empty());
    }

    #[test]
    fn test_local_store_update_unknown_remote_id() {
        let db = setup();
        let store = SqliteStore::new(db.connection());

        let result = LocalStore::update(&store, EntityKind::TimeEntry, 5, &Record::new());
        assert!(matches!(result, Err(Error::NotFound { .. })));
        assert!(matches!(
            store.local_id_for(EntityKind::TimeEntry, 5),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_local_store_lists_flat_records() {
        let db = setup();
        let store = SqliteStore::new(db.connection());

        let project = store
            .create_project(Project::new("demo", "Demo"), WriteOrigin::Local)
            .unwrap()
            .record;
        store
            .create_work_package(WorkPackage::new(project.id, "Plan"), WriteOrigin::Local)
            .unwrap();

        let listed = LocalStore::list(&store, EntityKind::WorkPackage).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["project"], json!(project.id));
        assert_eq!(listed[0]["subject"], json!("Plan"));
        assert_eq!(listed[0]["openproject_id"], json!(null));
    }

    /// Answers every save with the same write-back fields.
    struct FixedWriteBack(Record);

    impl SaveHook for FixedWriteBack {
        fn after_save(&self, _: &SaveEvent<'_>) -> SyncOutcome {
            SyncOutcome::Synced(WriteBack {
                remote_id: 42,
                fields: self.0.clone(),
            })
        }
    }

    #[test]
    fn test_undecodable_write_back_field_keeps_remote_id() {
        let db = setup();
        let project = SqliteStore::new(db.connection())
            .create_project(Project::new("demo", "Demo"), WriteOrigin::Sync)
            .unwrap()
            .record;

        let hook = FixedWriteBack(record(json!({
            "openproject_id": 42,
            "createdAt": "not-a-timestamp",
            "updatedAt": "2024-05-01T09:30:00Z",
            "lockVersion": 3
        })));
        let store = SqliteStore::new(db.connection()).with_save_hook(&hook);

        let saved = store
            .create_work_package(WorkPackage::new(project.id, "Plan"), WriteOrigin::Local)
            .unwrap();
        assert_eq!(saved.sync.remote_id(), Some(42));

        let stored = store.get_work_package(saved.record.id).unwrap().unwrap();
        assert_eq!(stored.openproject_id, Some(42));
        assert_eq!(stored.lock_version, Some(3));
        assert_eq!(stored.created_at, None);
        assert_eq!(
            stored.updated_at.map(|at| at.to_rfc3339()),
            Some("2024-05-01T09:30:00+00:00".to_string())
        );
    }

    #[test]
    fn test_parent_lookup_failure_keeps_local_write() {
        let db = setup();
        let hook = RecordingHook::default();
        let store = SqliteStore::new(db.connection()).with_save_hook(&hook);
        let project = store
            .create_project(Project::new("demo", "Demo"), WriteOrigin::Sync)
            .unwrap()
            .record;
        let work_package = store
            .create_work_package(WorkPackage::new(project.id, "Plan"), WriteOrigin::Sync)
            .unwrap()
            .record;
        db.connection()
            .execute("UPDATE projects SET openproject_id = 'not-a-number'", [])
            .unwrap();

        let saved = store
            .update_work_package(
                work_package.id,
                WorkPackageChanges {
                    subject: Some("Renamed".into()),
                    ..WorkPackageChanges::default()
                },
                WriteOrigin::Local,
            )
            .unwrap();

        assert!(saved.sync.is_failed());
        assert!(hook.events.borrow().is_empty());
        let stored = store.get_work_package(work_package.id).unwrap().unwrap();
        assert_eq!(stored.subject, "Renamed");
    }
}
