use std::path::{Path, PathBuf};

use {
    anyhow::{Context, Result},
    clap::Subcommand,
    helpline_common::types::Catalog,
    helpline_config::{HelplineConfig, load_catalog, validate_catalog},
    helpline_tickets::apply_catalog,
};

use crate::{config_commands::report, db_commands::open_store};

#[derive(Subcommand)]
pub enum CatalogAction {
    /// Validate a catalog file without touching the database.
    Check {
        /// Catalog file (TOML, YAML or JSON).
        file: PathBuf,
        /// Show informational diagnostics too.
        #[arg(long)]
        verbose: bool,
    },
    /// Validate a catalog file and replace the stored catalog with it.
    Apply {
        /// Catalog file (TOML, YAML or JSON).
        file: PathBuf,
    },
}

pub async fn handle_catalog(action: &CatalogAction, config: &HelplineConfig) -> Result<()> {
    let max_depth = config.automation.max_option_depth;
    match action {
        CatalogAction::Check { file, verbose } => {
            let catalog = read(file)?;
            eprintln!("Checking {}\n", file.display());
            let result = validate_catalog(&catalog, max_depth);
            if report(&result.diagnostics, *verbose) {
                std::process::exit(1);
            }
            Ok(())
        },
        CatalogAction::Apply { file } => {
            let catalog = read(file)?;
            let result = validate_catalog(&catalog, max_depth);
            if result.has_errors() {
                report(&result.diagnostics, false);
                anyhow::bail!("catalog {} rejected", file.display());
            }
            let store = open_store(config).await?;
            apply_catalog(&store, &catalog, max_depth).await?;
            println!(
                "Applied {} connection(s), {} queue(s), {} option(s).",
                catalog.connections.len(),
                catalog.queues.len(),
                catalog.options.len()
            );
            Ok(())
        },
    }
}

fn read(path: &Path) -> Result<Catalog> {
    let file = load_catalog(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(file.into_catalog()?)
}
