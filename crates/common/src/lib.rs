//! Shared domain types, error definitions, and utilities used across all helpline crates.

pub mod error;
pub mod types;

pub use error::{Error, FromMessage, HelplineError, Result};
