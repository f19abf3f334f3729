//! Persistence traits for the catalog and for conversations.
//!
//! Invariants that must hold under concurrency are enforced here, by the
//! backend: one active ticket per (contact, connection, group flag), one
//! pending rating per ticket, one message per external id.

use {
    async_trait::async_trait,
    helpline_common::types::{
        AckState, Catalog, Connection, ConnectionEntry, ConnectionId, Contact, ContactId, Message,
        NewMessage, NewTicket, Queue, QueueId, QueueOption, RatingId, SenderIdentity, Ticket,
        TicketId, TicketStatus, UserId, UserRating,
    },
};

use crate::Result;

/// Read side of the administrator-managed catalog, plus the one write used by
/// `catalog apply`.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn get_connection(&self, id: ConnectionId) -> Result<Option<Connection>>;
    async fn list_connections(&self) -> Result<Vec<ConnectionEntry>>;
    /// Queues served by a connection, in offer order.
    async fn queues_for_connection(&self, id: ConnectionId) -> Result<Vec<Queue>>;
    async fn get_queue(&self, id: QueueId) -> Result<Option<Queue>>;
    /// Every option of a queue, roots and descendants.
    async fn queue_options(&self, queue_id: QueueId) -> Result<Vec<QueueOption>>;
    async fn get_setting(&self, key: &str) -> Result<Option<String>>;
    /// Atomically replace the whole catalog. Callers validate first.
    async fn replace_catalog(&self, catalog: &Catalog) -> Result<()>;
}

#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Create or refresh a contact by external id. A missing name or avatar
    /// keeps the stored value.
    async fn upsert_contact(&self, sender: &SenderIdentity) -> Result<Contact>;
    async fn get_contact(&self, id: ContactId) -> Result<Option<Contact>>;

    async fn find_active_ticket(
        &self,
        contact_id: ContactId,
        connection_id: ConnectionId,
        is_group: bool,
    ) -> Result<Option<Ticket>>;
    /// Fails with `Error::Conflict` if an active ticket already exists.
    async fn create_ticket(&self, new: &NewTicket) -> Result<Ticket>;
    async fn get_ticket(&self, id: TicketId) -> Result<Option<Ticket>>;
    /// Persist status, queue, user, chatbot flag and menu position. Fails with
    /// `Error::Conflict` when the write would create a second active ticket.
    async fn save_ticket(&self, ticket: &Ticket) -> Result<Ticket>;
    /// Most recently updated first.
    async fn list_tickets(&self, status: Option<TicketStatus>) -> Result<Vec<Ticket>>;
    async fn set_unread(&self, id: TicketId, unread: u32) -> Result<()>;
    async fn set_last_message(&self, id: TicketId, body: &str) -> Result<()>;

    /// `None` when the external id is already stored.
    async fn insert_message(&self, message: &NewMessage) -> Result<Option<Message>>;
    async fn find_message(&self, external_id: &str) -> Result<Option<Message>>;
    /// Raise the ack state. `None` if the message is unknown or already at or
    /// above `ack`.
    async fn update_message_ack(&self, external_id: &str, ack: AckState)
    -> Result<Option<Message>>;
    async fn list_messages(&self, ticket_id: TicketId) -> Result<Vec<Message>>;
    /// Returns the number of messages newly marked read.
    async fn mark_messages_read(&self, ticket_id: TicketId) -> Result<u64>;

    /// The pending rating for the ticket, creating it if absent. The flag is
    /// `true` when this call created it.
    async fn find_or_create_pending_rating(
        &self,
        ticket_id: TicketId,
        user_id: Option<UserId>,
    ) -> Result<(UserRating, bool)>;
    async fn pending_rating(&self, ticket_id: TicketId) -> Result<Option<UserRating>>;
    /// Set the score if the rating is still pending. `None` if it was not.
    async fn resolve_rating(&self, id: RatingId, score: u8) -> Result<Option<UserRating>>;
}

/// Everything the automation needs from persistence.
pub trait Store: CatalogStore + TicketStore {}

impl<T: CatalogStore + TicketStore> Store for T {}
