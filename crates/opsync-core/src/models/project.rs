//! Project model

use serde::{Deserialize, Serialize};

use super::fields;
use super::RemoteId;
use crate::error::{Error, Result};
use crate::util::normalize_text_option;

/// A project, identified across systems by its stable `identifier` slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Remote identity, unset until the first successful outbound sync
    #[serde(default, deserialize_with = "fields::lenient_id")]
    pub openproject_id: Option<RemoteId>,
    /// Unique, stable slug
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_true", deserialize_with = "fields::lenient_bool")]
    pub active: bool,
    #[serde(default = "default_true", deserialize_with = "fields::lenient_bool")]
    pub public: bool,
    #[serde(default, deserialize_with = "fields::optional_text")]
    pub description: Option<String>,
}

const fn default_true() -> bool {
    true
}

impl Project {
    /// Create an active, public project that has not been synced yet.
    #[must_use]
    pub fn new(identifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            openproject_id: None,
            identifier: identifier.into(),
            name: name.into(),
            active: true,
            public: true,
            description: None,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.identifier.trim().is_empty() {
            return Err(Error::Validation("project identifier is required".into()));
        }
        if self.name.trim().is_empty() {
            return Err(Error::Validation("project name is required".into()));
        }
        Ok(())
    }
}

/// Locally editable project fields. The identifier is stable and not editable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectChanges {
    pub name: Option<String>,
    pub active: Option<bool>,
    pub public: Option<bool>,
    /// An empty string clears the description
    pub description: Option<String>,
}

impl ProjectChanges {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub(crate) fn apply(self, project: &mut Project) {
        if let Some(name) = self.name {
            project.name = name;
        }
        if let Some(active) = self.active {
            project.active = active;
        }
        if let Some(public) = self.public {
            project.public = public;
        }
        if let Some(description) = self.description {
            project.description = normalize_text_option(Some(description));
        }
    }
}
