//! Inbound sync: webhook and listing records into the local store.
//!
//! Failures propagate. Inbound runs under an orchestrator (webhook sender,
//! scheduled pull) that is expected to retry.

use std::collections::HashSet;

use serde_json::Value;

use super::linker::link;
use super::normalize::normalize_inbound;
use super::reconcile::{action_from_hook, decide_action, known_remote_ids, SyncAction};
use super::LocalStore;
use crate::error::{Error, Result};
use crate::models::fields::remote_id_from_value;
use crate::models::{EntityKind, Record, RemoteId};

fn remote_id_of(record: &Record) -> Option<RemoteId> {
    record.get("openproject_id").and_then(remote_id_from_value)
}

/// Write an already normalized and linked record; returns the store's `id`.
pub(crate) fn write_record(
    kind: EntityKind,
    action: SyncAction,
    record: &Record,
    store: &dyn LocalStore,
) -> Result<Value> {
    let response = match action {
        SyncAction::Updated => {
            let value = record
                .get("openproject_id")
                .ok_or_else(|| Error::MissingField("openproject_id".to_string()))?;
            let remote_id = remote_id_from_value(value).ok_or_else(|| {
                Error::InvalidInput(format!("openproject_id is not an integer: {value}"))
            })?;
            store.update(kind, remote_id, record)?
        }
        SyncAction::Created => store.create(kind, record)?,
    };

    let id = response.get("id").cloned().ok_or_else(|| {
        Error::MalformedResponse(format!("{kind} write response has no 'id'"))
    })?;
    tracing::info!(
        "Inbound {kind} {action}: remote {:?} stored as {id}",
        remote_id_of(record)
    );
    Ok(id)
}

/// Apply one webhook delivery.
///
/// `<kind>:updated` merges into the record with the same `openproject_id`;
/// any other action (including an unrecognized or empty one) creates.
/// Returns the `id` of the store's response, verbatim.
pub fn process_hook(
    kind: EntityKind,
    action: &str,
    raw: &Record,
    store: &dyn LocalStore,
) -> Result<Value> {
    let record = link(kind, normalize_inbound(kind, raw), store)?;
    let action = action_from_hook(kind, action).unwrap_or(SyncAction::Created);
    write_record(kind, action, &record, store)
}

/// Entry point shared by webhooks and reconciliation.
///
/// With a non-empty `action` this is [`process_hook`]. With an empty one the
/// record's remote id is reconciled against `existing_ids`, or against a
/// fresh listing of the local store when none are supplied.
pub fn ingest(
    kind: EntityKind,
    action: &str,
    raw: &Record,
    existing_ids: Option<&[RemoteId]>,
    store: &dyn LocalStore,
) -> Result<Value> {
    if action_from_hook(kind, action).is_some() {
        return process_hook(kind, action, raw, store);
    }

    let record = link(kind, normalize_inbound(kind, raw), store)?;
    let known: HashSet<RemoteId> = match existing_ids {
        Some(ids) => ids.iter().copied().collect(),
        None => known_remote_ids(&store.list(kind)?),
    };
    let action = decide_action(kind, remote_id_of(&record), &known);
    write_record(kind, action, &record, store)
}
