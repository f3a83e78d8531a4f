//! Resolve embedded parent references to local foreign keys.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::LocalStore;
use crate::error::{Error, Result};
use crate::models::fields::remote_id_from_value;
use crate::models::{EntityKind, LocalId, Record, RemoteId};

static HREF_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/api/v3/(projects|work_packages|time_entries)/(\d+)/?$")
        .expect("Invalid regex")
});

/// Remote id at the end of an API v3 `href` for the given kind.
pub fn id_from_href(kind: EntityKind, href: &str) -> Option<RemoteId> {
    let captures = HREF_ID.captures(href)?;
    if &captures[1] != kind.collection() {
        return None;
    }
    captures[2].parse().ok()
}

fn embedded_remote_id(raw: &Record, parent: EntityKind) -> Option<RemoteId> {
    let key = parent.link_key();

    let embedded = raw
        .get("_embedded")
        .and_then(|embedded| embedded.get(key))
        .and_then(|resource| resource.get("id"))
        .and_then(remote_id_from_value);

    // Time entries may reference their work package through the generic
    // `entity` association.
    let entity = || {
        if parent != EntityKind::WorkPackage {
            return None;
        }
        let entity = raw.get("_embedded")?.get("entity")?;
        match entity.get("_type").and_then(Value::as_str) {
            None | Some("WorkPackage") => entity.get("id").and_then(remote_id_from_value),
            Some(_) => None,
        }
    };

    let linked = || {
        let links = raw.get("_links")?;
        let href = links
            .get(key)
            .or_else(|| {
                (parent == EntityKind::WorkPackage)
                    .then(|| links.get("entity"))
                    .flatten()
            })?
            .get("href")?
            .as_str()?;
        id_from_href(parent, href)
    };

    embedded.or_else(entity).or_else(linked)
}

fn resolve_parent(
    raw: &Record,
    parent: EntityKind,
    flat_key: &str,
    store: &dyn LocalStore,
) -> Result<LocalId> {
    if let Some(local_id) = raw.get(flat_key).and_then(remote_id_from_value) {
        return Ok(local_id);
    }

    let remote_id = embedded_remote_id(raw, parent)
        .ok_or_else(|| Error::MissingField(flat_key.to_string()))?;

    match store.local_id_for(parent, remote_id) {
        Ok(local_id) => {
            tracing::debug!("Linked {parent} #{remote_id} to local #{local_id}");
            Ok(local_id)
        }
        Err(Error::NotFound { .. }) => Err(Error::ReferenceNotFound {
            kind: parent,
            reference: format!("#{remote_id}"),
        }),
        Err(error) => Err(error),
    }
}

/// Local id of the project a record belongs to.
pub fn resolve_project_ref(raw: &Record, store: &dyn LocalStore) -> Result<LocalId> {
    resolve_parent(raw, EntityKind::Project, "project", store)
}

/// Local id of the work package a record belongs to.
pub fn resolve_work_package_ref(raw: &Record, store: &dyn LocalStore) -> Result<LocalId> {
    resolve_parent(raw, EntityKind::WorkPackage, "work_package", store)
}

/// Set the flat parent key of a record of `kind` when it carries a reference.
///
/// Records without any reference are returned unchanged: partial updates
/// rarely repeat the parent, and the local store rejects creates that lack it.
pub fn link(kind: EntityKind, mut record: Record, store: &dyn LocalStore) -> Result<Record> {
    let Some((parent, flat_key)) = kind.parent() else {
        return Ok(record);
    };
    let has_flat = record
        .get(flat_key)
        .and_then(remote_id_from_value)
        .is_some();
    if !has_flat && embedded_remote_id(&record, parent).is_none() {
        return Ok(record);
    }

    let local_id = resolve_parent(&record, parent, flat_key, store)?;
    record.insert(flat_key.to_string(), Value::from(local_id));
    Ok(record)
}
