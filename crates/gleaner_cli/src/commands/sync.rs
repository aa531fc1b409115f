use console::{Term, style};
use gleaner::SyncOutcome;
use uuid::Uuid;

use crate::commands::shared::{CliResult, build_engine, target_kind};
use crate::config::Config;

/// Run one synchronization pass for a target, outside the scheduler.
///
/// The pass is forced: a target inside the staleness window is fetched anyway.
pub(crate) async fn handle_sync(
    id: Uuid,
    user: bool,
    config: &Config,
    database_url: &str,
) -> CliResult<()> {
    let (_store, engine) = build_engine(config, database_url).await?;
    let kind = target_kind(user);
    let is_tty = Term::stdout().is_term();

    match engine.sync_now(kind, id).await {
        SyncOutcome::Synced {
            fetched,
            inserted,
            skipped,
        } => {
            if is_tty {
                println!(
                    "{} {kind} {id}: {fetched} fetched, {inserted} new, {skipped} already stored",
                    style("Synced").green().bold()
                );
            } else {
                tracing::info!(%kind, %id, fetched, inserted, skipped, "Synced");
            }
            Ok(())
        }
        SyncOutcome::UpToDate => {
            if is_tty {
                println!("{} {kind} {id}", style("Already up to date").dim());
            }
            Ok(())
        }
        SyncOutcome::Missing => Err(format!("No {kind} with id {id}").into()),
        SyncOutcome::Failed { error } => {
            if is_tty {
                eprintln!("{} {kind} {id}: {error}", style("Failed").red().bold());
            }
            Err(format!("Synchronization of {kind} {id} failed; checkpoint unchanged").into())
        }
    }
}
