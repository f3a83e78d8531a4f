use std::path::Path;

use opsync_core::config::SyncSettings;
use opsync_core::remote::{HttpTransport, OpenProjectClient};
use opsync_core::sync::ListingPull;
use opsync_core::EntityKind;

use crate::commands::common::{local_store, open_database};
use crate::error::CliError;

pub fn run_pull(
    kind: Option<EntityKind>,
    db_path: &Path,
    settings: &SyncSettings,
) -> Result<(), CliError> {
    let endpoint = settings.require_openproject()?;
    let transport = HttpTransport::new(settings.http_timeout)?;
    let client = OpenProjectClient::from_endpoint(transport, endpoint);

    let db = open_database(db_path)?;
    let store = local_store(&db, None);
    let pull = ListingPull::new(&client, &store);

    let reports = match kind {
        Some(kind) => vec![(kind, pull.pull(kind)?)],
        None => pull.pull_all()?,
    };
    for (kind, report) in reports {
        println!("{kind}: {report}");
    }

    Ok(())
}
