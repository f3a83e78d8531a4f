use std::io;

use opsync_core::config::ConfigError;
use opsync_core::remote::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] opsync_core::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No webhook payload provided (pass --payload or pipe JSON on stdin)")]
    EmptyPayload,
    #[error("Webhook payload must be a JSON object")]
    InvalidPayload,
    #[error("Project not found for id/identifier: {0}")]
    ProjectNotFound(String),
    #[error("{0} not found: #{1}")]
    NotFound(&'static str, i64),
    #[error("Nothing to change: pass at least one field option")]
    NoChanges,
}
