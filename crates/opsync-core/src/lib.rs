//! opsync-core - Core library for opsync
//!
//! This crate keeps a local project store and a remote OpenProject instance
//! consistent for projects, work packages, and time entries. Local saves are
//! pushed to the remote API, and remote webhook events or full listings are
//! pulled into the local store.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{EntityKind, LocalId, Record, RemoteId};
