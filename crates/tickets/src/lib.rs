//! Conversations: contacts, tickets, messages, ratings and the catalog they
//! are routed against.
//!
//! The store traits live in [`store`], with SQLite and in-memory backends.
//! On top of them sit the resolver (sender to ticket), the normalizer
//! (idempotent message ingestion), the outbox (send and record) and the
//! lifecycle (every ticket state change and its fan-out).

pub mod catalog;
pub mod error;
pub mod lifecycle;
pub mod normalize;
pub mod notify;
pub mod outbox;
pub mod resolver;
pub mod store;
pub mod store_memory;
pub mod store_sqlite;

pub use {
    catalog::apply_catalog,
    error::{Context, Error, Result},
    lifecycle::{TicketLifecycle, TicketUpdate},
    normalize::MessageNormalizer,
    notify::{Notification, Notifier, NotifyAction, Topic},
    outbox::Outbox,
    resolver::{Resolved, TicketResolver},
    store::{CatalogStore, Store, TicketStore},
    store_memory::InMemoryStore,
    store_sqlite::SqliteStore,
};

/// Run database migrations for the tickets crate.
///
/// Creates the catalog, contact, ticket, message and rating tables. Called by
/// [`SqliteStore::new`]; call it yourself when using
/// [`SqliteStore::with_pool`].
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .set_ignore_missing(true)
        .run(pool)
        .await?;
    Ok(())
}
