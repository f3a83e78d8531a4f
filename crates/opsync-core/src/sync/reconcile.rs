//! Create-versus-update decisions for inbound records.

use std::collections::HashSet;
use std::fmt;

use crate::models::fields::remote_id_from_value;
use crate::models::{EntityKind, Record, RemoteId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Created,
    Updated,
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Updated => "updated",
        })
    }
}

/// `Updated` only when the remote id is already known locally.
///
/// `known` is a point-in-time snapshot; a record created by someone else
/// between the snapshot and the write will be created twice.
pub fn decide_action(
    kind: EntityKind,
    remote_id: Option<RemoteId>,
    known: &HashSet<RemoteId>,
) -> SyncAction {
    let action = match remote_id {
        Some(remote_id) if known.contains(&remote_id) => SyncAction::Updated,
        _ => SyncAction::Created,
    };
    tracing::debug!("Reconciled {kind} {remote_id:?} as {action}");
    action
}

/// Interpret a webhook action string such as `work_package:updated`.
///
/// An empty action means "no hint". Only `<kind>:updated` selects an
/// update; any other non-empty value is treated as a create.
pub fn action_from_hook(kind: EntityKind, action: &str) -> Option<SyncAction> {
    let action = action.trim();
    if action.is_empty() {
        return None;
    }
    if action == format!("{}:updated", kind.action_prefix()) {
        Some(SyncAction::Updated)
    } else {
        Some(SyncAction::Created)
    }
}

/// The set of `openproject_id`s present in a listing of local records.
pub fn known_remote_ids(records: &[Record]) -> HashSet<RemoteId> {
    records
        .iter()
        .filter_map(|record| record.get("openproject_id").and_then(remote_id_from_value))
        .collect()
}
