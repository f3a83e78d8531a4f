//! Outbound sync: push local saves to OpenProject.

use serde_json::Value;

use super::normalize::serialize_outbound;
use super::{SaveEvent, SaveHook, SyncOutcome, WriteBack};
use crate::error::{Error, Result};
use crate::models::fields::remote_id_from_value;
use crate::models::{EntityKind, Record};
use crate::remote::{OpenProjectClient, Transport};

const WORK_PACKAGE_WRITE_BACK: &[&str] = &[
    "lockVersion",
    "createdAt",
    "updatedAt",
    "derivedStartDate",
    "derivedDueDate",
    "derivedEstimatedTime",
    "derivedRemainingTime",
    "derivedPercentageDone",
];

const TIME_ENTRY_WRITE_BACK: &[&str] = &["createdAt", "updatedAt"];

/// Save hook that creates or updates the remote copy of every local save.
///
/// One attempt per save. Failures are logged and reported through
/// [`SyncOutcome::Failed`]; the local write is never rolled back.
pub struct OutboundSync<T> {
    client: OpenProjectClient<T>,
}

impl<T: Transport> OutboundSync<T> {
    pub const fn new(client: OpenProjectClient<T>) -> Self {
        Self { client }
    }

    fn push(&self, event: &SaveEvent<'_>) -> Result<WriteBack> {
        let kind = event.entity.kind();
        let remote_id = event.entity.remote_id().filter(|_| !event.created);
        let body = serialize_outbound(event, remote_id.is_some())?;

        let response = match remote_id {
            Some(remote_id) => self.client.update(kind, remote_id, body)?,
            None => self.client.create(kind, body)?,
        };
        write_back_from(kind, &response)
    }
}

/// Remote-assigned fields to store locally after a push.
fn write_back_from(kind: EntityKind, response: &Value) -> Result<WriteBack> {
    let remote_id = response
        .get("id")
        .and_then(remote_id_from_value)
        .ok_or_else(|| {
            Error::MalformedResponse(format!("{kind} response has no integer 'id'"))
        })?;

    let mut fields = Record::new();
    fields.insert("openproject_id".to_string(), Value::from(remote_id));

    let copied: &[&str] = match kind {
        EntityKind::Project => &[],
        EntityKind::WorkPackage => WORK_PACKAGE_WRITE_BACK,
        EntityKind::TimeEntry => TIME_ENTRY_WRITE_BACK,
    };
    for &key in copied {
        if let Some(value) = response.get(key) {
            fields.insert(key.to_string(), value.clone());
        }
    }

    Ok(WriteBack { remote_id, fields })
}

impl<T: Transport> SaveHook for OutboundSync<T> {
    fn after_save(&self, event: &SaveEvent<'_>) -> SyncOutcome {
        let kind = event.entity.kind();
        let local_id = event.entity.local_id();

        match self.push(event) {
            Ok(write_back) => {
                tracing::info!(
                    "Pushed {kind} #{local_id} to OpenProject as #{}",
                    write_back.remote_id
                );
                SyncOutcome::Synced(write_back)
            }
            Err(error) => {
                tracing::warn!("Outbound sync of {kind} #{local_id} failed: {error}");
                SyncOutcome::Failed(error)
            }
        }
    }
}
