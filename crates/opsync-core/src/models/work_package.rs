//! Work package model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::fields;
use super::{LocalId, RemoteId};
use crate::error::{Error, Result};
use crate::util::normalize_text_option;

/// A work package belonging to exactly one project.
///
/// Effort and cost values are OpenProject duration/amount strings
/// (`PT2H30M`, `"120.0 EUR"`) and are stored verbatim. The `derived_*`
/// fields, `lock_version`, and the timestamps are computed by OpenProject and
/// only ever written from remote data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkPackage {
    #[serde(
        rename = "openproject_id",
        default,
        deserialize_with = "fields::lenient_id"
    )]
    pub openproject_id: Option<RemoteId>,
    /// Local id of the owning project
    #[serde(default, deserialize_with = "fields::lenient_local_id")]
    pub project: LocalId,
    #[serde(default)]
    pub subject: String,
    #[serde(default, deserialize_with = "fields::optional_text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "fields::optional_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "fields::optional_date")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "fields::optional_date")]
    pub derived_start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "fields::optional_date")]
    pub derived_due_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "fields::optional_text")]
    pub spent_time: Option<String>,
    #[serde(default, deserialize_with = "fields::optional_text")]
    pub estimated_time: Option<String>,
    #[serde(default, deserialize_with = "fields::optional_text")]
    pub derived_estimated_time: Option<String>,
    #[serde(default, deserialize_with = "fields::optional_text")]
    pub derived_remaining_time: Option<String>,
    #[serde(default, deserialize_with = "fields::optional_text")]
    pub duration: Option<String>,
    #[serde(default, deserialize_with = "fields::optional_text")]
    pub labor_costs: Option<String>,
    #[serde(default, deserialize_with = "fields::optional_text")]
    pub material_costs: Option<String>,
    #[serde(default, deserialize_with = "fields::optional_text")]
    pub overall_costs: Option<String>,
    #[serde(default, deserialize_with = "fields::lenient_bool")]
    pub schedule_manually: bool,
    #[serde(default, deserialize_with = "fields::lenient_bool")]
    pub ignore_non_working_days: bool,
    #[serde(default, deserialize_with = "fields::optional_number")]
    pub percentage_done: Option<i64>,
    #[serde(default, deserialize_with = "fields::optional_number")]
    pub derived_percentage_done: Option<i64>,
    #[serde(default, deserialize_with = "fields::optional_number")]
    pub lock_version: Option<i64>,
    #[serde(default, deserialize_with = "fields::optional_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "fields::optional_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl WorkPackage {
    /// Create an unsynced work package in the given project.
    #[must_use]
    pub fn new(project: LocalId, subject: impl Into<String>) -> Self {
        Self {
            openproject_id: None,
            project,
            subject: subject.into(),
            description: None,
            start_date: None,
            due_date: None,
            derived_start_date: None,
            derived_due_date: None,
            spent_time: None,
            estimated_time: None,
            derived_estimated_time: None,
            derived_remaining_time: None,
            duration: None,
            labor_costs: None,
            material_costs: None,
            overall_costs: None,
            schedule_manually: false,
            ignore_non_working_days: false,
            percentage_done: None,
            derived_percentage_done: None,
            lock_version: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.project < 1 {
            return Err(Error::Validation("work package requires a project".into()));
        }
        if self.subject.trim().is_empty() {
            return Err(Error::Validation("work package subject is required".into()));
        }
        if let Some(done) = self.percentage_done {
            if !(0..=100).contains(&done) {
                return Err(Error::Validation(format!(
                    "percentageDone must be within 0..=100, got {done}"
                )));
            }
        }
        if let (Some(start), Some(due)) = (self.start_date, self.due_date) {
            if due < start {
                return Err(Error::Validation(format!(
                    "dueDate {due} is before startDate {start}"
                )));
            }
        }
        Ok(())
    }
}

/// Locally editable work package fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkPackageChanges {
    pub subject: Option<String>,
    /// An empty string clears the description
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub estimated_time: Option<String>,
    pub percentage_done: Option<i64>,
    pub schedule_manually: Option<bool>,
    pub ignore_non_working_days: Option<bool>,
}

impl WorkPackageChanges {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub(crate) fn apply(self, work_package: &mut WorkPackage) {
        if let Some(subject) = self.subject {
            work_package.subject = subject;
        }
        if let Some(description) = self.description {
            work_package.description = normalize_text_option(Some(description));
        }
        if let Some(start_date) = self.start_date {
            work_package.start_date = Some(start_date);
        }
        if let Some(due_date) = self.due_date {
            work_package.due_date = Some(due_date);
        }
        if let Some(estimated_time) = self.estimated_time {
            work_package.estimated_time = normalize_text_option(Some(estimated_time));
        }
        if let Some(percentage_done) = self.percentage_done {
            work_package.percentage_done = Some(percentage_done);
        }
        if let Some(schedule_manually) = self.schedule_manually {
            work_package.schedule_manually = schedule_manually;
        }
        if let Some(ignore) = self.ignore_non_working_days {
            work_package.ignore_non_working_days = ignore;
        }
    }
}
