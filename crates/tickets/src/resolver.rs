//! Map an inbound sender to a contact and exactly one active ticket.

use std::sync::Arc;

use {
    helpline_common::types::{Contact, InboundEvent, NewTicket, Ticket, TicketStatus},
    tracing::{debug, info},
};

#[cfg(feature = "metrics")]
use helpline_metrics::{counter, tickets as ticket_metrics};

use crate::{
    Result,
    notify::{Notifier, NotifyAction, Topic},
    store::Store,
};

#[derive(Debug, Clone)]
pub struct Resolved {
    pub contact: Contact,
    pub ticket: Ticket,
    pub created: bool,
}

pub struct TicketResolver {
    store: Arc<dyn Store>,
    notifier: Notifier,
}

impl TicketResolver {
    pub fn new(store: Arc<dyn Store>, notifier: Notifier) -> Self {
        Self { store, notifier }
    }

    pub async fn resolve(&self, event: &InboundEvent) -> Result<Resolved> {
        let contact = self.store.upsert_contact(&event.sender).await?;
        let unread = if event.from_me {
            0
        } else {
            event.unread_count
        };

        if let Some(ticket) = self.existing(&contact, event, unread).await? {
            return Ok(Resolved {
                contact,
                ticket,
                created: false,
            });
        }

        let new = NewTicket {
            contact_id: contact.id,
            connection_id: event.connection_id,
            status: TicketStatus::Pending,
            is_group: event.sender.is_group,
            unread_messages: unread,
        };
        match self.store.create_ticket(&new).await {
            Ok(ticket) => {
                info!(
                    ticket_id = ticket.id,
                    contact_id = contact.id,
                    connection_id = ticket.connection_id,
                    "ticket created"
                );
                #[cfg(feature = "metrics")]
                counter!(ticket_metrics::CREATED_TOTAL).increment(1);
                self.notifier.ticket_changed(NotifyAction::Create, &ticket, vec![
                    Topic::Status(ticket.status),
                    Topic::Notification,
                ]);
                Ok(Resolved {
                    contact,
                    ticket,
                    created: true,
                })
            },
            // Another event for the same contact won the race.
            Err(e) if e.is_conflict() => {
                #[cfg(feature = "metrics")]
                counter!(ticket_metrics::CONFLICTS_TOTAL).increment(1);
                debug!(contact_id = contact.id, "ticket creation raced, using the winner");
                let ticket = self.existing(&contact, event, unread).await?.ok_or(e)?;
                Ok(Resolved {
                    contact,
                    ticket,
                    created: false,
                })
            },
            Err(e) => Err(e),
        }
    }

    async fn existing(
        &self,
        contact: &Contact,
        event: &InboundEvent,
        unread: u32,
    ) -> Result<Option<Ticket>> {
        let Some(mut ticket) = self
            .store
            .find_active_ticket(contact.id, event.connection_id, event.sender.is_group)
            .await?
        else {
            return Ok(None);
        };
        if unread > 0 && unread != ticket.unread_messages {
            self.store.set_unread(ticket.id, unread).await?;
            ticket.unread_messages = unread;
        }
        Ok(Some(ticket))
    }
}
