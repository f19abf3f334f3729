//! Automated sends: deliver through the gateway, then record the message.
//!
//! Recording under the gateway's id makes the later echo of the same message
//! a duplicate no-op in the normalizer.

use std::sync::Arc;

use {
    helpline_channels::{ChannelOutbound, Chooser, OutboundContent, Recipient},
    helpline_common::types::{AckState, Contact, MediaRef, MessageOrigin, NewMessage, Ticket},
    tracing::{debug, warn},
};

#[cfg(feature = "metrics")]
use helpline_metrics::{counter, labels, outbound as outbound_metrics};

use crate::{Result, notify::Notifier, store::Store};

#[derive(Clone)]
pub struct Outbox {
    outbound: Arc<dyn ChannelOutbound>,
    store: Arc<dyn Store>,
    notifier: Notifier,
}

impl Outbox {
    pub fn new(
        outbound: Arc<dyn ChannelOutbound>,
        store: Arc<dyn Store>,
        notifier: Notifier,
    ) -> Self {
        Self {
            outbound,
            store,
            notifier,
        }
    }

    #[must_use]
    pub fn recipient(ticket: &Ticket, contact: &Contact) -> Recipient {
        Recipient {
            connection_id: ticket.connection_id,
            address: contact.external_id.clone(),
            is_group: ticket.is_group,
        }
    }

    /// Send and record. `Ok(false)` when the gateway refused the send; that is
    /// logged and never undoes ticket changes already made.
    pub async fn send(
        &self,
        ticket: &Ticket,
        contact: &Contact,
        content: OutboundContent,
    ) -> Result<bool> {
        let recipient = Self::recipient(ticket, contact);

        #[cfg(feature = "metrics")]
        let kind = match &content {
            OutboundContent::Text { .. } => "text",
            OutboundContent::Media { .. } => "media",
            OutboundContent::Chooser { .. } => "chooser",
        };

        let sent = match self.outbound.send(&recipient, &content).await {
            Ok(sent) => sent,
            Err(e) => {
                warn!(ticket_id = ticket.id, error = %e, "outbound send failed");
                #[cfg(feature = "metrics")]
                counter!(outbound_metrics::FAILURES_TOTAL, labels::KIND => kind).increment(1);
                return Ok(false);
            },
        };

        #[cfg(feature = "metrics")]
        counter!(outbound_metrics::SENT_TOTAL, labels::KIND => kind).increment(1);

        let (media_ref, media_type) = match &content {
            OutboundContent::Media { media, .. } => (
                Some(media.reference.clone()),
                media
                    .mime_type
                    .as_deref()
                    .map(helpline_media::media_type),
            ),
            _ => (None, None),
        };
        let body = content.summary();
        let record = NewMessage {
            external_id: sent.external_id,
            ticket_id: ticket.id,
            contact_id: None,
            body: body.clone(),
            origin: MessageOrigin::System,
            read: true,
            ack: AckState::Pending,
            media_ref,
            media_type,
            quoted_message_id: None,
        };

        match self.store.insert_message(&record).await? {
            Some(message) => {
                self.store.set_last_message(ticket.id, &body).await?;
                self.notifier.message_created(&message, ticket);
            },
            None => debug!(external_id = %record.external_id, "sent message already recorded"),
        }
        Ok(true)
    }

    pub async fn send_text(&self, ticket: &Ticket, contact: &Contact, text: &str) -> Result<bool> {
        self.send(ticket, contact, OutboundContent::Text {
            body: text.to_string(),
        })
        .await
    }

    pub async fn send_media(
        &self,
        ticket: &Ticket,
        contact: &Contact,
        media: &MediaRef,
        caption: Option<&str>,
    ) -> Result<bool> {
        self.send(ticket, contact, OutboundContent::Media {
            media: media.clone(),
            caption: caption.map(Into::into),
        })
        .await
    }

    pub async fn send_chooser(
        &self,
        ticket: &Ticket,
        contact: &Contact,
        chooser: Chooser,
    ) -> Result<bool> {
        self.send(ticket, contact, OutboundContent::Chooser { chooser })
            .await
    }
}
