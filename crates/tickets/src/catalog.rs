//! Writing a validated catalog into the store.

use {
    helpline_common::types::Catalog,
    helpline_config::ensure_valid_catalog,
    tracing::info,
};

use crate::{Result, store::CatalogStore};

/// Validate `catalog` and replace the stored one with it. Nothing is written
/// when validation reports an error.
pub async fn apply_catalog(
    store: &dyn CatalogStore,
    catalog: &Catalog,
    max_option_depth: usize,
) -> Result<()> {
    ensure_valid_catalog(catalog, max_option_depth)?;
    store.replace_catalog(catalog).await?;
    info!(
        connections = catalog.connections.len(),
        queues = catalog.queues.len(),
        options = catalog.options.len(),
        "catalog applied"
    );
    Ok(())
}
