//! Metrics for helpline.
//!
//! Crates record through the `metrics` facade macros re-exported here. Nothing
//! is collected until [`init_metrics`] installs a recorder; with the
//! `prometheus` feature that recorder also serves a scrape endpoint.
//!
//! ```rust,ignore
//! use helpline_metrics::{counter, tickets};
//!
//! counter!(tickets::CREATED_TOTAL).increment(1);
//! ```

mod definitions;
mod recorder;

pub use {
    definitions::*,
    recorder::{MetricsHandle, MetricsRecorderConfig, init_metrics},
};

pub use metrics::{counter, gauge, histogram};
