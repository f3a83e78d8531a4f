//! Data models for opsync

pub mod fields;
mod kind;
mod project;
mod time_entry;
mod work_package;

use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use kind::{EntityKind, FieldDefault};
pub use project::{Project, ProjectChanges};
pub use time_entry::{TimeEntry, TimeEntryChanges};
pub use work_package::{WorkPackage, WorkPackageChanges};

/// Primary key assigned by the local store.
pub type LocalId = i64;

/// Identifier assigned by OpenProject (`openproject_id` locally).
pub type RemoteId = i64;

/// A loosely-shaped record as exchanged with webhooks, listings, and the
/// store's REST endpoint.
pub type Record = Map<String, Value>;

/// A persisted entity together with its local identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stored<T> {
    /// Local primary key
    pub id: LocalId,
    #[serde(flatten)]
    pub fields: T,
}

impl<T: Serialize> Stored<T> {
    /// Flat record in the local store's shape, `id` being the local identity.
    pub fn to_record(&self) -> crate::Result<Record> {
        match serde_json::to_value(self)? {
            Value::Object(record) => Ok(record),
            other => Err(crate::Error::InvalidInput(format!(
                "entity serialized to a non-object value: {other}"
            ))),
        }
    }
}

impl<T> Deref for Stored<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.fields
    }
}

impl<T> DerefMut for Stored<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.fields
    }
}
