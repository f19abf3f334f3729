//! In-memory store for testing.

use std::{collections::HashMap, sync::Mutex};

use {
    async_trait::async_trait,
    helpline_common::types::{
        AckState, Catalog, Connection, ConnectionEntry, ConnectionId, Contact, ContactId, Message,
        NewMessage, NewTicket, Queue, QueueId, QueueOption, RatingId, SenderIdentity, Ticket,
        TicketId, TicketStatus, UserId, UserRating, now_ms,
    },
};

use crate::{
    Error, Result,
    store::{CatalogStore, TicketStore},
};

#[derive(Default)]
struct Inner {
    catalog: Catalog,
    contacts: Vec<Contact>,
    tickets: HashMap<TicketId, Ticket>,
    messages: Vec<Message>,
    ratings: Vec<UserRating>,
    next_id: i64,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn active_ticket(
        &self,
        contact_id: ContactId,
        connection_id: ConnectionId,
        is_group: bool,
    ) -> Option<&Ticket> {
        self.tickets.values().find(|t| {
            t.contact_id == contact_id
                && t.connection_id == connection_id
                && t.is_group == is_group
                && t.is_active()
        })
    }
}

/// In-memory store behind a single mutex. Nothing is persisted; used by tests.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn get_connection(&self, id: ConnectionId) -> Result<Option<Connection>> {
        Ok(self
            .lock()
            .catalog
            .connections
            .iter()
            .find(|e| e.connection.id == id)
            .map(|e| e.connection.clone()))
    }

    async fn list_connections(&self) -> Result<Vec<ConnectionEntry>> {
        Ok(self.lock().catalog.connections.clone())
    }

    async fn queues_for_connection(&self, id: ConnectionId) -> Result<Vec<Queue>> {
        let inner = self.lock();
        let Some(entry) = inner
            .catalog
            .connections
            .iter()
            .find(|e| e.connection.id == id)
        else {
            return Ok(Vec::new());
        };
        Ok(entry
            .queue_ids
            .iter()
            .filter_map(|qid| inner.catalog.queues.iter().find(|q| q.id == *qid).cloned())
            .collect())
    }

    async fn get_queue(&self, id: QueueId) -> Result<Option<Queue>> {
        Ok(self
            .lock()
            .catalog
            .queues
            .iter()
            .find(|q| q.id == id)
            .cloned())
    }

    async fn queue_options(&self, queue_id: QueueId) -> Result<Vec<QueueOption>> {
        Ok(self
            .lock()
            .catalog
            .options
            .iter()
            .filter(|o| o.queue_id == queue_id)
            .cloned()
            .collect())
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .lock()
            .catalog
            .settings
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone()))
    }

    async fn replace_catalog(&self, catalog: &Catalog) -> Result<()> {
        self.lock().catalog = catalog.clone();
        Ok(())
    }
}

#[async_trait]
impl TicketStore for InMemoryStore {
    async fn upsert_contact(&self, sender: &SenderIdentity) -> Result<Contact> {
        let mut inner = self.lock();
        let now = now_ms();
        if let Some(existing) = inner
            .contacts
            .iter_mut()
            .find(|c| c.external_id == sender.external_id)
        {
            if let Some(name) = sender.name.as_deref().filter(|n| !n.trim().is_empty()) {
                existing.name = name.to_string();
            }
            if sender.avatar_url.is_some() {
                existing.avatar_url.clone_from(&sender.avatar_url);
            }
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let contact = Contact {
            id: inner.next_id(),
            external_id: sender.external_id.clone(),
            name: sender.display_name().to_string(),
            avatar_url: sender.avatar_url.clone(),
            is_group: sender.is_group,
            created_at: now,
            updated_at: now,
        };
        inner.contacts.push(contact.clone());
        Ok(contact)
    }

    async fn get_contact(&self, id: ContactId) -> Result<Option<Contact>> {
        Ok(self.lock().contacts.iter().find(|c| c.id == id).cloned())
    }

    async fn find_active_ticket(
        &self,
        contact_id: ContactId,
        connection_id: ConnectionId,
        is_group: bool,
    ) -> Result<Option<Ticket>> {
        Ok(self
            .lock()
            .active_ticket(contact_id, connection_id, is_group)
            .cloned())
    }

    async fn create_ticket(&self, new: &NewTicket) -> Result<Ticket> {
        let mut inner = self.lock();
        if let Some(existing) = inner.active_ticket(new.contact_id, new.connection_id, new.is_group)
        {
            return Err(Error::conflict(format!(
                "contact {} already has active ticket {}",
                new.contact_id, existing.id
            )));
        }
        let now = now_ms();
        let ticket = Ticket {
            id: inner.next_id(),
            uuid: uuid::Uuid::new_v4().to_string(),
            contact_id: new.contact_id,
            connection_id: new.connection_id,
            status: new.status,
            queue_id: None,
            user_id: None,
            chatbot: false,
            menu: Default::default(),
            last_message: None,
            unread_messages: new.unread_messages,
            is_group: new.is_group,
            created_at: now,
            updated_at: now,
        };
        inner.tickets.insert(ticket.id, ticket.clone());
        Ok(ticket)
    }

    async fn get_ticket(&self, id: TicketId) -> Result<Option<Ticket>> {
        Ok(self.lock().tickets.get(&id).cloned())
    }

    async fn save_ticket(&self, ticket: &Ticket) -> Result<Ticket> {
        let mut inner = self.lock();
        if ticket.is_active()
            && let Some(other) =
                inner.active_ticket(ticket.contact_id, ticket.connection_id, ticket.is_group)
            && other.id != ticket.id
        {
            return Err(Error::conflict(format!(
                "contact {} already has another active ticket",
                ticket.contact_id
            )));
        }
        let stored = inner
            .tickets
            .get_mut(&ticket.id)
            .ok_or_else(|| Error::ticket_not_found(ticket.id))?;
        stored.status = ticket.status;
        stored.queue_id = ticket.queue_id;
        stored.user_id = ticket.user_id;
        stored.chatbot = ticket.chatbot;
        stored.menu = ticket.menu;
        stored.updated_at = now_ms();
        Ok(stored.clone())
    }

    async fn list_tickets(&self, status: Option<TicketStatus>) -> Result<Vec<Ticket>> {
        let mut tickets: Vec<Ticket> = self
            .lock()
            .tickets
            .values()
            .filter(|t| status.is_none_or(|s| t.status == s))
            .cloned()
            .collect();
        tickets.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Ok(tickets)
    }

    async fn set_unread(&self, id: TicketId, unread: u32) -> Result<()> {
        if let Some(t) = self.lock().tickets.get_mut(&id) {
            t.unread_messages = unread;
        }
        Ok(())
    }

    async fn set_last_message(&self, id: TicketId, body: &str) -> Result<()> {
        if let Some(t) = self.lock().tickets.get_mut(&id) {
            t.last_message = Some(body.to_string());
            t.updated_at = now_ms();
        }
        Ok(())
    }

    async fn insert_message(&self, message: &NewMessage) -> Result<Option<Message>> {
        let mut inner = self.lock();
        if inner
            .messages
            .iter()
            .any(|m| m.external_id == message.external_id)
        {
            return Ok(None);
        }
        let stored = Message {
            id: inner.next_id(),
            external_id: message.external_id.clone(),
            ticket_id: message.ticket_id,
            contact_id: message.contact_id,
            body: message.body.clone(),
            origin: message.origin,
            read: message.read,
            ack: message.ack,
            media_ref: message.media_ref.clone(),
            media_type: message.media_type.clone(),
            quoted_message_id: message.quoted_message_id,
            created_at: now_ms(),
        };
        inner.messages.push(stored.clone());
        Ok(Some(stored))
    }

    async fn find_message(&self, external_id: &str) -> Result<Option<Message>> {
        Ok(self
            .lock()
            .messages
            .iter()
            .find(|m| m.external_id == external_id)
            .cloned())
    }

    async fn update_message_ack(
        &self,
        external_id: &str,
        ack: AckState,
    ) -> Result<Option<Message>> {
        let mut inner = self.lock();
        Ok(inner
            .messages
            .iter_mut()
            .find(|m| m.external_id == external_id && m.ack < ack)
            .map(|m| {
                m.ack = ack;
                m.clone()
            }))
    }

    async fn list_messages(&self, ticket_id: TicketId) -> Result<Vec<Message>> {
        Ok(self
            .lock()
            .messages
            .iter()
            .filter(|m| m.ticket_id == ticket_id)
            .cloned()
            .collect())
    }

    async fn mark_messages_read(&self, ticket_id: TicketId) -> Result<u64> {
        let mut inner = self.lock();
        let mut changed = 0;
        for m in inner
            .messages
            .iter_mut()
            .filter(|m| m.ticket_id == ticket_id && !m.read)
        {
            m.read = true;
            changed += 1;
        }
        if let Some(t) = inner.tickets.get_mut(&ticket_id) {
            t.unread_messages = 0;
        }
        Ok(changed)
    }

    async fn find_or_create_pending_rating(
        &self,
        ticket_id: TicketId,
        user_id: Option<UserId>,
    ) -> Result<(UserRating, bool)> {
        let mut inner = self.lock();
        if let Some(existing) = inner
            .ratings
            .iter()
            .find(|r| r.ticket_id == ticket_id && r.is_pending())
        {
            return Ok((existing.clone(), false));
        }
        let now = now_ms();
        let rating = UserRating {
            id: inner.next_id(),
            ticket_id,
            user_id,
            score: None,
            created_at: now,
            updated_at: now,
        };
        inner.ratings.push(rating.clone());
        Ok((rating, true))
    }

    async fn pending_rating(&self, ticket_id: TicketId) -> Result<Option<UserRating>> {
        Ok(self
            .lock()
            .ratings
            .iter()
            .find(|r| r.ticket_id == ticket_id && r.is_pending())
            .cloned())
    }

    async fn resolve_rating(&self, id: RatingId, score: u8) -> Result<Option<UserRating>> {
        let mut inner = self.lock();
        Ok(inner
            .ratings
            .iter_mut()
            .find(|r| r.id == id && r.is_pending())
            .map(|r| {
                r.score = Some(score);
                r.updated_at = now_ms();
                r.clone()
            }))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, helpline_common::types::MenuPosition};

    #[tokio::test]
    async fn mirrors_active_ticket_rules() {
        let store = InMemoryStore::new();
        let contact = store
            .upsert_contact(&SenderIdentity {
                external_id: "551".into(),
                name: None,
                avatar_url: None,
                is_group: false,
            })
            .await
            .unwrap();
        assert_eq!(contact.name, "551");

        let new = NewTicket {
            contact_id: contact.id,
            connection_id: 1,
            status: TicketStatus::Pending,
            is_group: false,
            unread_messages: 0,
        };
        let mut ticket = store.create_ticket(&new).await.unwrap();
        assert!(store.create_ticket(&new).await.unwrap_err().is_conflict());

        // The group conversation of the same contact is a separate slot.
        let group = store
            .create_ticket(&NewTicket {
                is_group: true,
                ..new.clone()
            })
            .await
            .unwrap();
        assert_ne!(group.id, ticket.id);

        ticket.menu = MenuPosition::Node(9);
        ticket.status = TicketStatus::Closed;
        let saved = store.save_ticket(&ticket).await.unwrap();
        assert_eq!(saved.menu, MenuPosition::Node(9));
        assert!(store.create_ticket(&new).await.is_ok());
    }
}
