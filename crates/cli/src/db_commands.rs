use std::path::{Path, PathBuf};

use {
    anyhow::Context,
    clap::Subcommand,
    helpline_config::HelplineConfig,
    helpline_tickets::SqliteStore,
    tracing::info,
};

#[derive(Subcommand)]
pub enum DbAction {
    /// Run all pending database migrations.
    Migrate,
    /// Delete the database file (and its WAL/SHM files) from the data directory.
    Reset,
}

/// Path of the default database file.
fn db_path(data_dir: &Path) -> PathBuf {
    data_dir.join("helpline.db")
}

/// Open the configured store, creating the data directory and running
/// migrations.
pub async fn open_store(config: &HelplineConfig) -> anyhow::Result<SqliteStore> {
    let data_dir = helpline_config::data_dir();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data directory {}", data_dir.display()))?;
    let url = config.database.resolved_url(&data_dir);
    let store = SqliteStore::new(&url)
        .await
        .with_context(|| format!("opening database {url}"))?;
    Ok(store)
}

pub async fn handle_db(action: &DbAction, config: &HelplineConfig) -> anyhow::Result<()> {
    match action {
        DbAction::Migrate => {
            let store = open_store(config).await?;
            store.pool().close().await;
            info!("migrations applied");
            println!("Database is up to date.");
            Ok(())
        },
        DbAction::Reset => {
            if config.database.url.is_some() {
                anyhow::bail!("database.url is set; reset only manages the default database file");
            }
            let deleted = reset_database(&db_path(&helpline_config::data_dir()))?;
            if deleted.is_empty() {
                println!("No database files found.");
            } else {
                for path in &deleted {
                    println!("Deleted: {}", path.display());
                }
                println!("Database files deleted. Run `helpline db migrate` to recreate them.");
            }
            Ok(())
        },
    }
}

/// Delete the database and the WAL and SHM files SQLite may have created.
/// Returns the paths actually removed.
fn reset_database(main_db: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut deleted = Vec::new();
    for suffix in ["", "-wal", "-shm"] {
        let path = if suffix.is_empty() {
            main_db.to_path_buf()
        } else {
            main_db.with_extension(format!("db{suffix}"))
        };
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("deleting {}", path.display()))?;
            deleted.push(path);
        }
    }
    Ok(deleted)
}
