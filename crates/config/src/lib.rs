//! Configuration loading, catalog files and validation.
//!
//! Config files: `helpline.toml`, `helpline.yaml`, `helpline.yml` or `helpline.json`,
//! searched in `./` then `~/.config/helpline/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-fallback}` substitution in raw text.

pub mod catalog;
pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    catalog::{CatalogFile, load_catalog},
    error::{Context, Error, Result},
    loader::{config_dir, data_dir, discover_and_load, load_config, set_data_dir},
    schema::{
        AutomationConfig, DatabaseConfig, HelplineConfig, MediaConfig, MetricsConfig, ReplyTexts,
    },
    validate::{
        Diagnostic, Severity, ValidationResult, ensure_valid_catalog, validate, validate_catalog,
    },
};
