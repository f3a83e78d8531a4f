//! Runtime configuration resolved from the environment.
//!
//! The OpenProject endpoint drives outbound sync and listing pulls; the
//! optional store API endpoint lets webhook payloads be forwarded to a remote
//! copy of the local store instead of the embedded database.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::util::{is_http_url, trim_trailing_slash};

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// An HTTP API base URL with its opaque Basic credential.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiEndpoint {
    /// Base URL without trailing slash
    pub url: String,
    /// Precomputed value sent as `Authorization: Basic <hash>`
    pub authorization_hash: String,
}

impl fmt::Debug for ApiEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ApiEndpoint")
            .field("url", &self.url)
            .field("authorization_hash", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    pub openproject: Option<ApiEndpoint>,
    pub store_api: Option<ApiEndpoint>,
    pub db_path: Option<PathBuf>,
    pub http_timeout: Duration,
}

impl SyncSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let openproject = parse_endpoint(
            &lookup,
            "OPENPROJECT_API_URL",
            "OPENPROJECT_AUTHORIZATION_HASH",
        )?;
        let store_api = parse_endpoint(
            &lookup,
            "OPSYNC_STORE_API_URL",
            "OPSYNC_STORE_AUTHORIZATION_HASH",
        )?;
        let db_path = optional_trimmed(&lookup, "OPSYNC_DB_PATH").map(PathBuf::from);

        let timeout_secs = match optional_trimmed(&lookup, "OPSYNC_HTTP_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                ConfigError::Invalid(
                    "OPSYNC_HTTP_TIMEOUT_SECS must be an integer in [1, 300]".to_string(),
                )
            })?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };
        if !(1..=300).contains(&timeout_secs) {
            return Err(ConfigError::Invalid(
                "OPSYNC_HTTP_TIMEOUT_SECS must be in [1, 300]".to_string(),
            ));
        }

        Ok(Self {
            openproject,
            store_api,
            db_path,
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// The OpenProject endpoint, required by outbound sync and pulls.
    pub fn require_openproject(&self) -> Result<&ApiEndpoint, ConfigError> {
        self.openproject
            .as_ref()
            .ok_or(ConfigError::MissingVar("OPENPROJECT_API_URL"))
    }

    /// The store API endpoint, required when forwarding webhook payloads.
    pub fn require_store_api(&self) -> Result<&ApiEndpoint, ConfigError> {
        self.store_api
            .as_ref()
            .ok_or(ConfigError::MissingVar("OPSYNC_STORE_API_URL"))
    }
}

fn parse_endpoint(
    lookup: impl Fn(&str) -> Option<String>,
    url_var: &'static str,
    hash_var: &'static str,
) -> Result<Option<ApiEndpoint>, ConfigError> {
    let url = optional_trimmed(&lookup, url_var);
    let authorization_hash = optional_trimmed(&lookup, hash_var);
    if url.is_none() && authorization_hash.is_none() {
        return Ok(None);
    }

    let url = url.ok_or(ConfigError::MissingVar(url_var))?;
    let authorization_hash = authorization_hash.ok_or(ConfigError::MissingVar(hash_var))?;
    if !is_http_url(&url) {
        return Err(ConfigError::Invalid(format!(
            "{url_var} must start with http:// or https://"
        )));
    }

    Ok(Some(ApiEndpoint {
        url: trim_trailing_slash(&url).to_string(),
        authorization_hash,
    }))
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> Result<SyncSettings, ConfigError> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        SyncSettings::from_lookup(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn empty_environment_yields_local_only_settings() {
        let settings = settings(&[]).unwrap();
        assert!(settings.openproject.is_none());
        assert!(settings.store_api.is_none());
        assert_eq!(settings.http_timeout, Duration::from_secs(30));
        assert!(settings.require_openproject().is_err());
    }

    #[test]
    fn endpoint_requires_both_url_and_hash() {
        let err = settings(&[("OPENPROJECT_API_URL", "https://op.example.com")]).unwrap_err();
        assert!(err.to_string().contains("OPENPROJECT_AUTHORIZATION_HASH"));
    }

    #[test]
    fn endpoint_url_is_trimmed_and_validated() {
        let parsed = settings(&[
            ("OPENPROJECT_API_URL", " https://op.example.com/ "),
            ("OPENPROJECT_AUTHORIZATION_HASH", "abc"),
        ])
        .unwrap();
        assert_eq!(
            parsed.require_openproject().unwrap().url,
            "https://op.example.com"
        );

        let err = settings(&[
            ("OPSYNC_STORE_API_URL", "store.example.com"),
            ("OPSYNC_STORE_AUTHORIZATION_HASH", "abc"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("OPSYNC_STORE_API_URL"));
    }

    #[test]
    fn timeout_is_range_checked() {
        assert!(settings(&[("OPSYNC_HTTP_TIMEOUT_SECS", "0")]).is_err());
        assert!(settings(&[("OPSYNC_HTTP_TIMEOUT_SECS", "soon")]).is_err());
        let parsed = settings(&[("OPSYNC_HTTP_TIMEOUT_SECS", "5")]).unwrap();
        assert_eq!(parsed.http_timeout, Duration::from_secs(5));
    }

    #[test]
    fn debug_output_redacts_credentials() {
        let parsed = settings(&[
            ("OPENPROJECT_API_URL", "https://op.example.com"),
            ("OPENPROJECT_AUTHORIZATION_HASH", "sensitive-hash"),
        ])
        .unwrap();
        let debug_output = format!("{parsed:?}");
        assert!(!debug_output.contains("sensitive-hash"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
