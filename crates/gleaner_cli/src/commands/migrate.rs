use console::style;
use gleaner::db;
use gleaner::migration::{Migrator, MigratorTrait};

use crate::MigrateAction;
use crate::commands::shared::CliResult;

pub(crate) async fn handle_migrate(action: MigrateAction, database_url: &str) -> CliResult<()> {
    let db = db::connect(database_url).await?;

    match action {
        MigrateAction::Up => {
            let pending = Migrator::get_pending_migrations(&db).await?.len();
            if pending == 0 {
                println!("Schema is up to date.");
                return Ok(());
            }
            println!("Applying {pending} migration(s)...");
            Migrator::up(&db, None).await?;
            println!("{}", style("Migrations applied.").green());
        }
        MigrateAction::Down => {
            println!("Rolling back the last migration...");
            Migrator::down(&db, Some(1)).await?;
            println!("{}", style("Rollback complete.").green());
        }
        MigrateAction::Status => {
            Migrator::status(&db).await?;
        }
        MigrateAction::Fresh => {
            println!(
                "{}",
                style("Dropping every gleaner table and reapplying migrations...").yellow()
            );
            Migrator::fresh(&db).await?;
            println!("{}", style("Fresh schema ready.").green());
        }
    }

    Ok(())
}
