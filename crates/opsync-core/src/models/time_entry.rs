//! Time entry model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::fields;
use super::{LocalId, RemoteId};
use crate::error::{Error, Result};
use crate::util::normalize_text_option;

/// Time logged against exactly one work package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    #[serde(
        rename = "openproject_id",
        default,
        deserialize_with = "fields::lenient_id"
    )]
    pub openproject_id: Option<RemoteId>,
    /// Local id of the work package the time was spent on
    #[serde(
        rename = "work_package",
        default,
        deserialize_with = "fields::lenient_local_id"
    )]
    pub work_package: LocalId,
    #[serde(default, deserialize_with = "fields::lenient_bool")]
    pub ongoing: bool,
    #[serde(default, deserialize_with = "fields::optional_text")]
    pub comment: Option<String>,
    #[serde(default, deserialize_with = "fields::optional_date")]
    pub spent_on: Option<NaiveDate>,
    /// Duration string, e.g. `PT1H30M`
    #[serde(default, deserialize_with = "fields::optional_text")]
    pub hours: Option<String>,
    #[serde(default, deserialize_with = "fields::optional_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "fields::optional_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl TimeEntry {
    #[must_use]
    pub fn new(work_package: LocalId, spent_on: NaiveDate, hours: impl Into<String>) -> Self {
        Self {
            openproject_id: None,
            work_package,
            ongoing: false,
            comment: None,
            spent_on: Some(spent_on),
            hours: normalize_text_option(Some(hours.into())),
            created_at: None,
            updated_at: None,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.work_package < 1 {
            return Err(Error::Validation("time entry requires a work package".into()));
        }
        Ok(())
    }
}

/// Locally editable time entry fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeEntryChanges {
    pub ongoing: Option<bool>,
    /// An empty string clears the comment
    pub comment: Option<String>,
    pub spent_on: Option<NaiveDate>,
    pub hours: Option<String>,
}

impl TimeEntryChanges {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub(crate) fn apply(self, time_entry: &mut TimeEntry) {
        if let Some(ongoing) = self.ongoing {
            time_entry.ongoing = ongoing;
        }
        if let Some(comment) = self.comment {
            time_entry.comment = normalize_text_option(Some(comment));
        }
        if let Some(spent_on) = self.spent_on {
            time_entry.spent_on = Some(spent_on);
        }
        if let Some(hours) = self.hours {
            time_entry.hours = normalize_text_option(Some(hours));
        }
    }
}
