use std::sync::Arc;

use console::style;
use gleaner::DatabaseStore;
use gleaner::provider::ProviderAggregator;
use gleaner::sync::SyncEngine;
use uuid::Uuid;

use crate::commands::shared::{CliResult, target_kind};

/// Move a checkpoint back to the epoch so the next pass refetches everything.
pub(crate) async fn handle_reset(id: Uuid, user: bool, database_url: &str) -> CliResult<()> {
    let db = gleaner::connect(database_url).await?;
    let engine = SyncEngine::new(
        Arc::new(DatabaseStore::new(db)),
        ProviderAggregator::default(),
    );
    let kind = target_kind(user);

    if engine.reset_checkpoint(kind, id).await? {
        println!("{} checkpoint of {kind} {id}", style("Reset").green());
        Ok(())
    } else {
        Err(format!("No {kind} with id {id}").into())
    }
}
