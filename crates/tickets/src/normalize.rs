//! Idempotent ingestion of inbound messages.

use std::sync::Arc;

use {
    helpline_common::types::{
        AckState, Contact, InboundEvent, Message, MessageOrigin, NewMessage, Ticket, now_ms,
    },
    helpline_media::{MediaStore, derive_file_name, media_type},
    tracing::debug,
};

#[cfg(feature = "metrics")]
use helpline_metrics::{counter, messages as message_metrics};

use crate::{Error, Result, notify::Notifier, store::Store};

pub struct MessageNormalizer {
    store: Arc<dyn Store>,
    media: Arc<dyn MediaStore>,
    notifier: Notifier,
}

impl MessageNormalizer {
    pub fn new(store: Arc<dyn Store>, media: Arc<dyn MediaStore>, notifier: Notifier) -> Self {
        Self {
            store,
            media,
            notifier,
        }
    }

    /// Store the event as a message of `ticket`.
    ///
    /// Returns `None` for an external id that is already stored. Fails with
    /// [`Error::MediaPersist`] when the payload cannot be saved; nothing is
    /// recorded in that case.
    pub async fn normalize(
        &self,
        ticket: &Ticket,
        contact: &Contact,
        event: &InboundEvent,
    ) -> Result<Option<Message>> {
        if self
            .store
            .find_message(&event.external_message_id)
            .await?
            .is_some()
        {
            debug!(external_id = %event.external_message_id, "duplicate delivery ignored");
            #[cfg(feature = "metrics")]
            counter!(message_metrics::DUPLICATES_TOTAL).increment(1);
            return Ok(None);
        }

        let quoted_message_id = match event.quoted_external_id.as_deref() {
            Some(quoted) => self.store.find_message(quoted).await?.map(|m| m.id),
            None => None,
        };

        let mut media_ref = None;
        let mut media_name = None;
        let mut kind = None;
        if let Some(payload) = &event.media {
            let timestamp = if event.timestamp > 0 {
                event.timestamp
            } else {
                now_ms()
            };
            let file_name =
                derive_file_name(payload.file_name.as_deref(), &payload.mime_type, timestamp);
            let reference = self
                .media
                .persist(&file_name, &payload.data)
                .await
                .map_err(|e| {
                    #[cfg(feature = "metrics")]
                    counter!(message_metrics::MEDIA_FAILURES_TOTAL).increment(1);
                    Error::MediaPersist(e)
                })?;
            media_ref = Some(reference);
            media_name = Some(file_name);
            kind = Some(media_type(&payload.mime_type));
        }

        let body = if event.body.is_empty() {
            media_name.unwrap_or_default()
        } else {
            event.body.clone()
        };

        let new = NewMessage {
            external_id: event.external_message_id.clone(),
            ticket_id: ticket.id,
            contact_id: (!event.from_me).then_some(contact.id),
            body,
            origin: if event.from_me {
                MessageOrigin::Agent
            } else {
                MessageOrigin::Contact
            },
            read: event.from_me,
            ack: AckState::Pending,
            media_ref,
            media_type: kind,
            quoted_message_id,
        };

        // A concurrent delivery of the same id may have landed in between.
        let Some(message) = self.store.insert_message(&new).await? else {
            debug!(external_id = %new.external_id, "duplicate delivery ignored");
            return Ok(None);
        };
        self.store
            .set_last_message(ticket.id, &message.body)
            .await?;

        #[cfg(feature = "metrics")]
        counter!(message_metrics::STORED_TOTAL).increment(1);
        self.notifier.message_created(&message, ticket);
        Ok(Some(message))
    }
}
