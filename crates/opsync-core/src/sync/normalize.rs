//! Wire shape <-> flat local shape.

use serde_json::{json, Map, Value};

use super::SaveEvent;
use crate::error::{Error, Result};
use crate::models::{
    EntityKind, FieldDefault, Project, Record, RemoteId, Stored, TimeEntry, WorkPackage,
};

/// Flatten a remote record into the local shape.
///
/// The kind's rich-text field (`{"raw": "text"}` on the wire) becomes a plain
/// string, `""` when the field, its `raw` key, or its value is missing. A
/// remote `id` is copied into `openproject_id` unless that key is already
/// present. Everything else passes through untouched, and normalizing an
/// already-flat record is a no-op.
pub fn normalize_inbound(kind: EntityKind, raw: &Record) -> Record {
    let mut record = raw.clone();

    let field = kind.rich_text_field();
    let text = match record.get(field) {
        Some(Value::Object(rich)) => match rich.get("raw") {
            Some(Value::String(text)) => Value::String(text.clone()),
            _ => Value::String(String::new()),
        },
        None | Some(Value::Null) => Value::String(String::new()),
        Some(other) => other.clone(),
    };
    record.insert(field.to_string(), text);

    if !record.contains_key("openproject_id") {
        if let Some(id) = record.get("id").cloned() {
            record.insert("openproject_id".to_string(), id);
        }
    }

    record
}

fn default_value(default: FieldDefault) -> Value {
    match default {
        FieldDefault::Text => Value::String(String::new()),
        FieldDefault::Flag => Value::Bool(false),
        FieldDefault::Number => Value::from(0),
    }
}

/// Reduce a normalized listing element to the kind's field set.
///
/// Keeps `id`, `openproject_id`, the flat parent key (when already linked),
/// and the listing fields, filling absent or null ones with their defaults.
pub fn shape_listing_record(kind: EntityKind, normalized: &Record) -> Record {
    let mut shaped = Map::new();

    for key in ["id", "openproject_id"] {
        if let Some(value) = normalized.get(key) {
            shaped.insert(key.to_string(), value.clone());
        }
    }
    if let Some((_, parent_key)) = kind.parent() {
        if let Some(value) = normalized.get(parent_key) {
            shaped.insert(parent_key.to_string(), value.clone());
        }
    }

    for &(field, default) in kind.listing_fields() {
        let value = match normalized.get(field) {
            None | Some(Value::Null) => default_value(default),
            Some(value) => value.clone(),
        };
        shaped.insert(field.to_string(), value);
    }

    shaped
}

const fn wire_bool(flag: bool) -> &'static str {
    if flag {
        "True"
    } else {
        "False"
    }
}

fn rich_text(text: Option<&str>) -> Value {
    json!({ "raw": text })
}

fn parent_href(
    parent: EntityKind,
    parent_remote_id: Option<RemoteId>,
    parent_local_id: i64,
) -> Result<String> {
    parent_remote_id
        .map(|remote_id| format!("/api/v3/{}/{remote_id}", parent.collection()))
        .ok_or_else(|| Error::ReferenceNotFound {
            kind: parent,
            reference: format!("local #{parent_local_id} has no remote identity"),
        })
}

/// Project wire body. Flags travel as `"True"`/`"False"` strings.
pub fn serialize_project(project: &Stored<Project>) -> Value {
    json!({
        "_type": EntityKind::Project.wire_type(),
        "id": project.openproject_id,
        "identifier": project.identifier,
        "name": project.name,
        "active": wire_bool(project.active),
        "public": wire_bool(project.public),
        "description": rich_text(project.description.as_deref()),
    })
}

/// Work package wire body; `lockVersion` is only sent with a PATCH.
pub fn serialize_work_package(
    work_package: &Stored<WorkPackage>,
    project_remote_id: Option<RemoteId>,
    patch: bool,
) -> Result<Value> {
    let href = parent_href(EntityKind::Project, project_remote_id, work_package.project)?;

    let mut body = json!({
        "_type": EntityKind::WorkPackage.wire_type(),
        "id": work_package.openproject_id,
        "subject": work_package.subject,
        "description": rich_text(work_package.description.as_deref()),
        "startDate": work_package.start_date.map(|date| date.to_string()),
        "dueDate": work_package.due_date.map(|date| date.to_string()),
        "estimatedTime": work_package.estimated_time,
        "duration": work_package.duration,
        "percentageDone": work_package.percentage_done,
        "scheduleManually": work_package.schedule_manually,
        "ignoreNonWorkingDays": work_package.ignore_non_working_days,
        "_links": { "project": { "href": href } },
    });
    if patch {
        body["lockVersion"] = json!(work_package.lock_version);
    }
    Ok(body)
}

pub fn serialize_time_entry(
    time_entry: &Stored<TimeEntry>,
    work_package_remote_id: Option<RemoteId>,
) -> Result<Value> {
    let href = parent_href(
        EntityKind::WorkPackage,
        work_package_remote_id,
        time_entry.work_package,
    )?;

    Ok(json!({
        "_type": EntityKind::TimeEntry.wire_type(),
        "id": time_entry.openproject_id,
        "ongoing": time_entry.ongoing,
        "comment": rich_text(time_entry.comment.as_deref()),
        "spentOn": time_entry.spent_on.map(|date| date.to_string()),
        "hours": time_entry.hours,
        "_links": { "workPackage": { "href": href } },
    }))
}

/// Wire body for a saved entity; `patch` selects the update form.
pub fn serialize_outbound(event: &SaveEvent<'_>, patch: bool) -> Result<Value> {
    use super::SavedEntity;

    match event.entity {
        SavedEntity::Project(project) => Ok(serialize_project(project)),
        SavedEntity::WorkPackage {
            work_package,
            project_remote_id,
        } => serialize_work_package(work_package, project_remote_id, patch),
        SavedEntity::TimeEntry {
            time_entry,
            work_package_remote_id,
        } => serialize_time_entry(time_entry, work_package_remote_id),
    }
}
