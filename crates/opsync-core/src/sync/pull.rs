//! Full-listing pulls from OpenProject into the local store.
//!
//! Each pass snapshots the known remote ids once, then reconciles every
//! listed element against that snapshot. The first failing element aborts
//! the pass; records written before it stay written.

use std::collections::HashSet;
use std::fmt;

use serde_json::Value;

use super::inbound::write_record;
use super::linker::link;
use super::normalize::{normalize_inbound, shape_listing_record};
use super::reconcile::{decide_action, known_remote_ids, SyncAction};
use super::LocalStore;
use crate::error::{Error, Result};
use crate::models::fields::remote_id_from_value;
use crate::models::{EntityKind, LocalId, Record, RemoteId};
use crate::remote::{link_href, OpenProjectClient, Transport};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PullReport {
    pub created: usize,
    pub updated: usize,
}

impl PullReport {
    fn count(&mut self, action: SyncAction) {
        match action {
            SyncAction::Created => self.created += 1,
            SyncAction::Updated => self.updated += 1,
        }
    }
}

impl fmt::Display for PullReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} created, {} updated", self.created, self.updated)
    }
}

pub struct ListingPull<'a, T> {
    client: &'a OpenProjectClient<T>,
    store: &'a dyn LocalStore,
}

impl<'a, T: Transport> ListingPull<'a, T> {
    pub const fn new(client: &'a OpenProjectClient<T>, store: &'a dyn LocalStore) -> Self {
        Self { client, store }
    }

    pub fn pull(&self, kind: EntityKind) -> Result<PullReport> {
        match kind {
            EntityKind::Project => self.pull_projects(),
            EntityKind::WorkPackage => self.pull_work_packages(),
            EntityKind::TimeEntry => self.pull_time_entries(),
        }
    }

    /// Every kind, parents before children.
    pub fn pull_all(&self) -> Result<Vec<(EntityKind, PullReport)>> {
        EntityKind::ALL
            .into_iter()
            .map(|kind| Ok((kind, self.pull(kind)?)))
            .collect()
    }

    pub fn pull_projects(&self) -> Result<PullReport> {
        let kind = EntityKind::Project;
        let elements = self.client.list(kind)?;
        let known = self.snapshot(kind)?;

        let mut report = PullReport::default();
        for element in &elements {
            self.apply(kind, element, None, &known, &mut report)?;
        }
        tracing::info!("Pulled projects: {report}");
        Ok(report)
    }

    /// Work packages are listed per project, through each project's
    /// `workPackages` link.
    pub fn pull_work_packages(&self) -> Result<PullReport> {
        let kind = EntityKind::WorkPackage;
        let projects = self.client.list(EntityKind::Project)?;
        let known = self.snapshot(kind)?;

        let mut report = PullReport::default();
        for project in &projects {
            let remote_project = project
                .get("id")
                .and_then(remote_id_from_value)
                .ok_or_else(|| {
                    Error::MalformedResponse("project listing element has no 'id'".into())
                })?;
            let local_project = self.local_parent(EntityKind::Project, remote_project)?;

            let href = link_href(project, "workPackages").map_or_else(
                || format!("/api/v3/projects/{remote_project}/work_packages"),
                str::to_string,
            );
            for element in &self.client.list_href(&href)? {
                self.apply(kind, element, Some(local_project), &known, &mut report)?;
            }
        }
        tracing::info!("Pulled work packages: {report}");
        Ok(report)
    }

    pub fn pull_time_entries(&self) -> Result<PullReport> {
        let kind = EntityKind::TimeEntry;
        let elements = self.client.list(kind)?;
        let known = self.snapshot(kind)?;

        let mut report = PullReport::default();
        for element in &elements {
            self.apply(kind, element, None, &known, &mut report)?;
        }
        tracing::info!("Pulled time entries: {report}");
        Ok(report)
    }

    fn snapshot(&self, kind: EntityKind) -> Result<HashSet<RemoteId>> {
        Ok(known_remote_ids(&self.store.list(kind)?))
    }

    fn local_parent(&self, kind: EntityKind, remote_id: RemoteId) -> Result<LocalId> {
        self.store
            .local_id_for(kind, remote_id)
            .map_err(|error| match error {
                Error::NotFound { .. } => Error::ReferenceNotFound {
                    kind,
                    reference: format!("#{remote_id}"),
                },
                other => other,
            })
    }

    fn apply(
        &self,
        kind: EntityKind,
        element: &Record,
        parent: Option<LocalId>,
        known: &HashSet<RemoteId>,
        report: &mut PullReport,
    ) -> Result<()> {
        let mut normalized = normalize_inbound(kind, element);
        if let (Some(local_id), Some((_, parent_key))) = (parent, kind.parent()) {
            normalized.insert(parent_key.to_string(), Value::from(local_id));
        }
        let record = shape_listing_record(kind, &link(kind, normalized, self.store)?);

        let remote_id = record.get("openproject_id").and_then(remote_id_from_value);
        let action = decide_action(kind, remote_id, known);
        write_record(kind, action, &record, self.store)?;
        report.count(action);
        Ok(())
    }
}
