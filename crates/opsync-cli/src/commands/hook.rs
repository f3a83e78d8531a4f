use std::path::Path;

use opsync_core::config::SyncSettings;
use opsync_core::remote::{HttpTransport, RestStore};
use opsync_core::sync::{ingest, LocalStore};
use opsync_core::{EntityKind, Record, RemoteId};
use serde_json::Value;

use crate::commands::common::{local_store, open_database};
use crate::error::CliError;

pub fn run_hook(
    kind: EntityKind,
    action: &str,
    payload: &Record,
    existing_ids: Option<&[RemoteId]>,
    forward: bool,
    db_path: &Path,
    settings: &SyncSettings,
) -> Result<(), CliError> {
    let id = if forward {
        let endpoint = settings.require_store_api()?;
        let transport = HttpTransport::new(settings.http_timeout)?;
        let store = RestStore::from_endpoint(transport, endpoint);
        apply(kind, action, payload, existing_ids, &store)?
    } else {
        let db = open_database(db_path)?;
        let store = local_store(&db, None);
        apply(kind, action, payload, existing_ids, &store)?
    };

    println!("{}", format_stored_id(&id));
    Ok(())
}

fn apply(
    kind: EntityKind,
    action: &str,
    payload: &Record,
    existing_ids: Option<&[RemoteId]>,
    store: &dyn LocalStore,
) -> Result<Value, CliError> {
    Ok(ingest(kind, action.trim(), payload, existing_ids, store)?)
}

/// The store's id as printed: strings without quotes.
pub fn format_stored_id(id: &Value) -> String {
    match id {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
