//! The three synchronized entity kinds and their static wire metadata.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default used for a field that is absent from a remote listing element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    /// Empty string
    Text,
    /// `false`
    Flag,
    /// `0`
    Number,
}

const PROJECT_FIELDS: &[(&str, FieldDefault)] = &[
    ("identifier", FieldDefault::Text),
    ("name", FieldDefault::Text),
    ("active", FieldDefault::Flag),
    ("public", FieldDefault::Flag),
    ("description", FieldDefault::Text),
];

const WORK_PACKAGE_FIELDS: &[(&str, FieldDefault)] = &[
    ("subject", FieldDefault::Text),
    ("createdAt", FieldDefault::Text),
    ("updatedAt", FieldDefault::Text),
    ("derivedStartDate", FieldDefault::Text),
    ("derivedDueDate", FieldDefault::Text),
    ("startDate", FieldDefault::Text),
    ("dueDate", FieldDefault::Text),
    ("spentTime", FieldDefault::Text),
    ("estimatedTime", FieldDefault::Text),
    ("derivedEstimatedTime", FieldDefault::Text),
    ("derivedRemainingTime", FieldDefault::Text),
    ("duration", FieldDefault::Text),
    ("laborCosts", FieldDefault::Text),
    ("materialCosts", FieldDefault::Text),
    ("overallCosts", FieldDefault::Text),
    ("description", FieldDefault::Text),
    ("scheduleManually", FieldDefault::Flag),
    ("ignoreNonWorkingDays", FieldDefault::Flag),
    ("percentageDone", FieldDefault::Number),
    ("derivedPercentageDone", FieldDefault::Number),
    ("lockVersion", FieldDefault::Number),
];

const TIME_ENTRY_FIELDS: &[(&str, FieldDefault)] = &[
    ("ongoing", FieldDefault::Flag),
    ("comment", FieldDefault::Text),
    ("spentOn", FieldDefault::Text),
    ("hours", FieldDefault::Text),
    ("createdAt", FieldDefault::Text),
    ("updatedAt", FieldDefault::Text),
];

/// Entity kinds kept in sync between the local store and OpenProject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Project,
    WorkPackage,
    TimeEntry,
}

impl EntityKind {
    /// All kinds, parents before children.
    pub const ALL: [Self; 3] = [Self::Project, Self::WorkPackage, Self::TimeEntry];

    /// Collection path segment, shared by the OpenProject API and the
    /// local store's REST endpoint.
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Project => "projects",
            Self::WorkPackage => "work_packages",
            Self::TimeEntry => "time_entries",
        }
    }

    /// Prefix of webhook actions for this kind (`project:created`, ...).
    pub const fn action_prefix(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::WorkPackage => "work_package",
            Self::TimeEntry => "time_entry",
        }
    }

    /// The `_type` OpenProject uses for this kind.
    pub const fn wire_type(self) -> &'static str {
        match self {
            Self::Project => "Project",
            Self::WorkPackage => "WorkPackage",
            Self::TimeEntry => "TimeEntry",
        }
    }

    /// Field carrying OpenProject formattable text (`{"raw": ...}` on the wire).
    pub const fn rich_text_field(self) -> &'static str {
        match self {
            Self::Project | Self::WorkPackage => "description",
            Self::TimeEntry => "comment",
        }
    }

    /// The parent kind and the flat foreign-key field naming it locally.
    pub const fn parent(self) -> Option<(Self, &'static str)> {
        match self {
            Self::Project => None,
            Self::WorkPackage => Some((Self::Project, "project")),
            Self::TimeEntry => Some((Self::WorkPackage, "work_package")),
        }
    }

    /// Key under `_embedded`/`_links` that references an entity of this kind.
    pub const fn link_key(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::WorkPackage => "workPackage",
            Self::TimeEntry => "timeEntry",
        }
    }

    /// Fields kept from a remote listing element, with their defaults.
    pub const fn listing_fields(self) -> &'static [(&'static str, FieldDefault)] {
        match self {
            Self::Project => PROJECT_FIELDS,
            Self::WorkPackage => WORK_PACKAGE_FIELDS,
            Self::TimeEntry => TIME_ENTRY_FIELDS,
        }
    }

    /// Local table name.
    pub(crate) const fn table(self) -> &'static str {
        self.collection()
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Project => "project",
            Self::WorkPackage => "work package",
            Self::TimeEntry => "time entry",
        };
        f.write_str(label)
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "project" | "projects" => Ok(Self::Project),
            "work_package" | "work_packages" => Ok(Self::WorkPackage),
            "time_entry" | "time_entries" => Ok(Self::TimeEntry),
            other => Err(format!("unknown entity kind: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_singular_plural_and_dashes() {
        assert_eq!("project".parse(), Ok(EntityKind::Project));
        assert_eq!("work-package".parse(), Ok(EntityKind::WorkPackage));
        assert_eq!("time_entries".parse(), Ok(EntityKind::TimeEntry));
        assert!("issue".parse::<EntityKind>().is_err());
    }

    #[test]
    fn parents_form_a_chain() {
        assert_eq!(EntityKind::Project.parent(), None);
        assert_eq!(
            EntityKind::WorkPackage.parent(),
            Some((EntityKind::Project, "project"))
        );
        assert_eq!(
            EntityKind::TimeEntry.parent(),
            Some((EntityKind::WorkPackage, "work_package"))
        );
    }

    #[test]
    fn rich_text_field_per_kind() {
        assert_eq!(EntityKind::Project.rich_text_field(), "description");
        assert_eq!(EntityKind::TimeEntry.rich_text_field(), "comment");
    }
}
