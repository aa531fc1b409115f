//! Gleaner CLI - runs the content synchronization pipeline.

mod commands;
mod config;
mod shutdown;

use clap::{Parser, Subcommand};
use console::Term;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::commands::feed::OutputFormat;

#[derive(Parser)]
#[command(name = "gleaner")]
#[command(version)]
#[command(about = "Keeps subscriptions and their content fresh")]
#[command(
    long_about = "Gleaner periodically finds subscriptions and users whose content has gone \
stale, fetches new items from their providers (RSS/Atom feeds, YouTube channels, podcasts), \
and stores them without duplicates."
)]
#[command(after_long_help = r#"EXAMPLES
    Run the scheduler until Ctrl+C:
        $ gleaner run

    Synchronize one subscription right now:
        $ gleaner sync 0b6f1f0e-3c7a-4f6a-9a55-1d2f0c7c1e11

    Discover new subscriptions for a user:
        $ gleaner sync --user 5e0c2a55-8d19-4c55-b0a8-7f1f8c3a0d42

    Force a full resync on the next scan:
        $ gleaner reset 0b6f1f0e-3c7a-4f6a-9a55-1d2f0c7c1e11

    Preview a feed without storing anything:
        $ gleaner feed https://blog.rust-lang.org/feed.xml --limit 5

CONFIGURATION
    Gleaner reads configuration from:
      1. ~/.config/gleaner/config.toml (or $XDG_CONFIG_HOME/gleaner/config.toml)
      2. ./gleaner.toml
      3. Environment variables (GLEANER_ prefix, nested keys joined with __)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    GLEANER_DATABASE__URL                   Database connection string (default: ~/.local/state/gleaner/gleaner.db)
    GLEANER_SYNC__STALENESS_HOURS           Hours before a target is considered stale (default: 24)
    GLEANER_SYNC__SUBSCRIPTION_INTERVAL_SECS  Seconds between subscription scans (default: 300)
    GLEANER_SYNC__USER_INTERVAL_SECS        Seconds between user scans (default: 3600)
    GLEANER_SYNC__ISOLATE_PROVIDER_FAILURES Keep healthy providers' results when one fails
    RUST_LOG                                Log filter (default: gleaner=info,gleaner_cli=info)
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run staleness detection and synchronization until interrupted
    Run {
        /// Wait one full interval before the first scan
        #[arg(long)]
        skip_first: bool,
    },
    /// Synchronize a single subscription (or user) immediately
    Sync {
        /// Subscription id, or user id with --user
        id: Uuid,

        /// Treat the id as a user and discover subscriptions
        #[arg(short, long)]
        user: bool,
    },
    /// Reset a checkpoint so the next pass refetches everything
    Reset {
        /// Subscription id, or user id with --user
        id: Uuid,

        /// Treat the id as a user
        #[arg(short, long)]
        user: bool,
    },
    /// Fetch and print a feed without storing it
    Feed {
        /// Feed URL
        url: String,

        /// Maximum number of items to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Rollback the last migration
    Down,
    /// Show migration status
    Status,
    /// Fresh install - drop all tables and reapply migrations
    Fresh,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Structured logs when not attached to a terminal
    if !Term::stdout().is_term() {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("gleaner=info,gleaner_cli=info"),
        };

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    // Load configuration (config file -> env vars -> defaults)
    let config = config::Config::load();

    let cli = Cli::parse();

    // Feed preview needs no database
    if let Commands::Feed { url, limit, output } = &cli.command {
        commands::feed::handle_feed(url, *limit, *output, &config).await?;
        return Ok(());
    }

    let database_url = config
        .database_url()
        .ok_or("Could not determine a database URL; set GLEANER_DATABASE__URL")?;

    ensure_sqlite_dir(&database_url)?;

    match cli.command {
        Commands::Run { skip_first } => {
            commands::run::handle_run(&config, &database_url, skip_first).await?;
        }
        Commands::Sync { id, user } => {
            commands::sync::handle_sync(id, user, &config, &database_url).await?;
        }
        Commands::Reset { id, user } => {
            commands::reset::handle_reset(id, user, &database_url).await?;
        }
        Commands::Migrate { action } => {
            commands::migrate::handle_migrate(action, &database_url).await?;
        }
        Commands::Feed { .. } => {}
    }

    Ok(())
}

/// Create the parent directory of a SQLite database file.
fn ensure_sqlite_dir(database_url: &str) -> std::io::Result<()> {
    let Some(db_path) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    // Strip query parameters (e.g., ?mode=rwc) before path operations
    let db_path = db_path.split('?').next().unwrap_or(db_path);
    let db_path = std::path::Path::new(db_path);

    if db_path.is_relative() && !db_path.as_os_str().is_empty() {
        tracing::warn!(
            "Database path '{}' is relative - behavior depends on current directory. \
             Consider using an absolute path.",
            db_path.display()
        );
    }

    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sync_user() {
        let id = Uuid::new_v4();
        let cli = Cli::try_parse_from(["gleaner", "sync", "--user", &id.to_string()]).unwrap();
        match cli.command {
            Commands::Sync { id: parsed, user } => {
                assert_eq!(parsed, id);
                assert!(user);
            }
            _ => panic!("expected sync"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_uuid() {
        assert!(Cli::try_parse_from(["gleaner", "reset", "not-a-uuid"]).is_err());
    }

    #[test]
    fn test_ensure_sqlite_dir_ignores_other_schemes() {
        assert!(ensure_sqlite_dir("postgres://localhost/gleaner").is_ok());
        assert!(ensure_sqlite_dir("sqlite::memory:").is_ok());
    }
}
