//! The one place ticket status, queue, agent, chatbot flag and menu position
//! change. Side effects of a change (farewell, rating prompt, transfer notice,
//! fan-out) are applied here in a fixed order.

use std::sync::Arc;

use {
    helpline_common::types::{
        Contact, MenuPosition, QueueId, Ticket, TicketId, TicketStatus, UserId,
    },
    helpline_config::ReplyTexts,
    tracing::{debug, info},
};

#[cfg(feature = "metrics")]
use helpline_metrics::{counter, labels, tickets as ticket_metrics};

use crate::{
    Error, Result,
    notify::{Notifier, NotifyAction, Topic},
    outbox::Outbox,
    store::Store,
};

/// Fields to change. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketUpdate {
    pub status: Option<TicketStatus>,
    pub queue_id: Option<Option<QueueId>>,
    pub user_id: Option<Option<UserId>>,
    pub chatbot: Option<bool>,
    pub menu: Option<MenuPosition>,
}

impl TicketUpdate {
    #[must_use]
    pub fn status(status: TicketStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    fn apply(&self, ticket: &mut Ticket) {
        if let Some(status) = self.status {
            ticket.status = status;
        }
        if let Some(queue_id) = self.queue_id {
            ticket.queue_id = queue_id;
        }
        if let Some(user_id) = self.user_id {
            ticket.user_id = user_id;
        }
        if let Some(chatbot) = self.chatbot {
            ticket.chatbot = chatbot;
        }
        if let Some(menu) = self.menu {
            ticket.menu = menu;
        }
    }
}

pub struct TicketLifecycle {
    store: Arc<dyn Store>,
    outbox: Outbox,
    notifier: Notifier,
    texts: ReplyTexts,
}

impl TicketLifecycle {
    pub fn new(
        store: Arc<dyn Store>,
        outbox: Outbox,
        notifier: Notifier,
        texts: ReplyTexts,
    ) -> Self {
        Self {
            store,
            outbox,
            notifier,
            texts,
        }
    }

    /// Apply `change` with all of its side effects.
    ///
    /// Closing an open ticket whose connection has a rating prompt does not
    /// close it yet: a pending rating is created, the prompt sent, and the
    /// ticket is returned unchanged until the contact answers.
    pub async fn update(&self, ticket_id: TicketId, change: TicketUpdate) -> Result<Ticket> {
        let current = self.load(ticket_id).await?;
        let old_status = current.status;
        let mut next = current.clone();
        change.apply(&mut next);

        if old_status == TicketStatus::Closed && next.status != TicketStatus::Closed {
            self.check_reopen(&current).await?;
        }

        let contact = self.contact(&current).await?;

        if next.status == TicketStatus::Closed && old_status != TicketStatus::Closed {
            next.queue_id = None;
            next.chatbot = false;
            next.menu = MenuPosition::Root;

            let connection = self
                .store
                .get_connection(current.connection_id)
                .await?
                .unwrap_or_default();

            if old_status == TicketStatus::Open
                && let Some(prompt) = non_empty(connection.rating_prompt.as_deref())
            {
                let (rating, created) = self
                    .store
                    .find_or_create_pending_rating(current.id, current.user_id)
                    .await?;
                if created {
                    let text = format!("{prompt}\n\n{}", self.texts.rating_scale);
                    self.outbox.send_text(&current, &contact, &text).await?;
                }
                debug!(
                    ticket_id = current.id,
                    rating_id = rating.id,
                    "close deferred until the contact rates"
                );
                self.notifier.ticket_removed(old_status, current.id);
                return Ok(current);
            }

            if let Some(farewell) = non_empty(connection.farewell.as_deref()) {
                self.outbox.send_text(&current, &contact, farewell).await?;
            }
        }

        if next.status == TicketStatus::Open && old_status != TicketStatus::Open {
            let marked = self.store.mark_messages_read(current.id).await?;
            debug!(ticket_id = current.id, marked, "messages marked read");
        }

        let saved = self.store.save_ticket(&next).await?;

        if let (Some(from), Some(to)) = (current.queue_id, saved.queue_id)
            && from != to
        {
            info!(ticket_id = saved.id, from, to, "ticket transferred");
            self.outbox
                .send_text(&saved, &contact, &self.texts.transferred)
                .await?;
        }

        self.publish(&current, &saved);
        Ok(saved)
    }

    /// Persist `change` without side effects or notifications. Used for menu
    /// movement inside a queue.
    pub async fn update_quietly(&self, ticket_id: TicketId, change: TicketUpdate) -> Result<Ticket> {
        let mut ticket = self.load(ticket_id).await?;
        change.apply(&mut ticket);
        self.store.save_ticket(&ticket).await
    }

    pub async fn close(&self, ticket_id: TicketId) -> Result<Ticket> {
        self.update(ticket_id, TicketUpdate::status(TicketStatus::Closed))
            .await
    }

    /// Final close after a rating: no farewell or prompt here, the rating
    /// flow has already answered. Publishes exactly one upsert.
    pub async fn close_rated(&self, ticket_id: TicketId) -> Result<Ticket> {
        let current = self.load(ticket_id).await?;
        let mut next = current.clone();
        next.status = TicketStatus::Closed;
        next.queue_id = None;
        next.user_id = None;
        next.chatbot = false;
        next.menu = MenuPosition::Root;
        let saved = self.store.save_ticket(&next).await?;

        info!(ticket_id = saved.id, "ticket closed after rating");
        #[cfg(feature = "metrics")]
        counter!(ticket_metrics::TRANSITIONS_TOTAL, labels::STATUS => "closed").increment(1);

        self.notifier.ticket_removed(current.status, saved.id);
        self.notifier.ticket_changed(NotifyAction::Update, &saved, vec![
            Topic::Status(TicketStatus::Closed),
            Topic::Ticket(saved.id),
        ]);
        Ok(saved)
    }

    async fn load(&self, ticket_id: TicketId) -> Result<Ticket> {
        self.store
            .get_ticket(ticket_id)
            .await?
            .ok_or_else(|| Error::ticket_not_found(ticket_id))
    }

    async fn contact(&self, ticket: &Ticket) -> Result<Contact> {
        self.store
            .get_contact(ticket.contact_id)
            .await?
            .ok_or_else(|| Error::not_found("contact", ticket.contact_id))
    }

    async fn check_reopen(&self, ticket: &Ticket) -> Result<()> {
        let other = self
            .store
            .find_active_ticket(ticket.contact_id, ticket.connection_id, ticket.is_group)
            .await?;
        match other {
            Some(other) if other.id != ticket.id => Err(Error::conflict(format!(
                "contact {} already has active ticket {}",
                ticket.contact_id, other.id
            ))),
            _ => Ok(()),
        }
    }

    fn publish(&self, before: &Ticket, after: &Ticket) {
        if before.status != after.status || before.user_id != after.user_id {
            if before.status != after.status {
                info!(
                    ticket_id = after.id,
                    from = %before.status,
                    to = %after.status,
                    "ticket status changed"
                );
                #[cfg(feature = "metrics")]
                counter!(ticket_metrics::TRANSITIONS_TOTAL, labels::STATUS => after.status.as_str())
                    .increment(1);
            }
            self.notifier.ticket_removed(before.status, after.id);
        }
        self.notifier.ticket_updated(after);
    }
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.trim().is_empty())
}
