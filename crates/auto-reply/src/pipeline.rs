//! Event pipeline: one gateway frame in, ticket state and sends out.
//!
//! Order for a message: filters, redelivery check, ticket resolution,
//! normalization, rating intercept, queue routing, business-hours gate,
//! connection greeting, chatbot. State is re-read from the store between
//! steps. Any error is logged and the event dropped.

use std::{sync::Arc, time::Duration};

use {
    helpline_channels::ChannelOutbound,
    helpline_chatbot::{ChatbotEngine, Transition},
    helpline_common::types::{
        AckEvent, GatewayFrame, InboundEvent, MessageKind, MessageOrigin, STATUS_BROADCAST,
        TicketStatus,
    },
    helpline_config::HelplineConfig,
    helpline_media::MediaStore,
    helpline_routing::{QueueRouter, RouteOutcome},
    helpline_tickets::{
        Error as TicketsError, MessageNormalizer, Notifier, Outbox, Resolved, Store,
        TicketLifecycle, TicketResolver,
    },
    tracing::{debug, warn},
};

#[cfg(feature = "metrics")]
use helpline_metrics::{automation, counter, events as event_metrics, labels};

use crate::{
    Result,
    debounce::Debouncer,
    gate::BusinessHoursGate,
    rating::{RatingFlow, RatingOutcome},
};

/// What the pipeline did with a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    Skipped(&'static str),
    /// Redelivery of a stored message.
    Duplicate,
    /// Stored, no automation applies.
    Recorded,
    Rating(RatingOutcome),
    /// A queue chooser was sent.
    Prompted,
    /// Outside business hours; the reply is debounced.
    OutOfHours,
    Greeted,
    Chatbot(Option<Transition>),
    AckUpdated,
    AckIgnored,
}

pub struct Pipeline {
    store: Arc<dyn Store>,
    outbox: Outbox,
    notifier: Notifier,
    resolver: TicketResolver,
    normalizer: MessageNormalizer,
    router: Arc<QueueRouter>,
    chatbot: ChatbotEngine,
    rating: RatingFlow,
    gate: BusinessHoursGate,
    debouncer: Debouncer,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn Store>,
        outbound: Arc<dyn ChannelOutbound>,
        media: Arc<dyn MediaStore>,
        notifier: Notifier,
        config: &HelplineConfig,
    ) -> Self {
        let texts = config.replies.clone();
        let outbox = Outbox::new(outbound, Arc::clone(&store), notifier.clone());
        let lifecycle = Arc::new(TicketLifecycle::new(
            Arc::clone(&store),
            outbox.clone(),
            notifier.clone(),
            texts.clone(),
        ));
        let router = Arc::new(QueueRouter::new(
            Arc::clone(&store),
            Arc::clone(&lifecycle),
            outbox.clone(),
            texts.clone(),
        ));
        let chatbot = ChatbotEngine::new(
            Arc::clone(&store),
            Arc::clone(&lifecycle),
            Arc::clone(&router),
            outbox.clone(),
            texts,
        );
        Self {
            resolver: TicketResolver::new(Arc::clone(&store), notifier.clone()),
            normalizer: MessageNormalizer::new(Arc::clone(&store), media, notifier.clone()),
            rating: RatingFlow::new(Arc::clone(&store), lifecycle, outbox.clone()),
            gate: BusinessHoursGate::new(Arc::clone(&store), config.automation.timezone.clone()),
            debouncer: Debouncer::new(Duration::from_millis(config.automation.debounce_ms)),
            router,
            chatbot,
            store,
            outbox,
            notifier,
        }
    }

    #[must_use]
    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    /// Process one frame. Failures are logged and the frame dropped.
    pub async fn handle_frame(&self, frame: GatewayFrame) -> Option<Handled> {
        #[cfg(feature = "metrics")]
        counter!(event_metrics::RECEIVED_TOTAL).increment(1);

        let result = match &frame {
            GatewayFrame::Message(event) => self.process_message(event).await,
            GatewayFrame::Ack(ack) => self.process_ack(ack).await,
        };
        match result {
            Ok(handled) => {
                debug!(?handled, "frame processed");
                Some(handled)
            },
            Err(e) => {
                warn!(error = %e, "dropping gateway event after failure");
                #[cfg(feature = "metrics")]
                counter!(event_metrics::DROPPED_TOTAL).increment(1);
                None
            },
        }
    }

    pub async fn process_message(&self, event: &InboundEvent) -> Result<Handled> {
        if let Some(reason) = skip_reason(event) {
            debug!(external_id = %event.external_message_id, reason, "event skipped");
            #[cfg(feature = "metrics")]
            counter!(event_metrics::SKIPPED_TOTAL, labels::REASON => reason).increment(1);
            return Ok(Handled::Skipped(reason));
        }

        if self
            .store
            .find_message(&event.external_message_id)
            .await?
            .is_some()
        {
            return Ok(Handled::Duplicate);
        }

        let Resolved {
            contact, ticket, ..
        } = self.resolver.resolve(event).await?;
        let automated = !event.from_me && !ticket.is_group;

        match self.normalizer.normalize(&ticket, &contact, event).await {
            Ok(Some(_)) => {},
            Ok(None) => return Ok(Handled::Duplicate),
            Err(TicketsError::MediaPersist(e)) => {
                warn!(
                    ticket_id = ticket.id,
                    external_id = %event.external_message_id,
                    error = %e,
                    "media not stored, message skipped"
                );
            },
            Err(e) => return Err(e.into()),
        }

        if !automated {
            return Ok(Handled::Recorded);
        }

        let outcome = self.rating.handle(&ticket, &contact, &event.body).await?;
        if outcome != RatingOutcome::NotPending {
            return Ok(Handled::Rating(outcome));
        }

        let queues = self
            .store
            .queues_for_connection(ticket.connection_id)
            .await?;
        let (mut routed_now, mut prompted) = (false, false);
        if ticket.queue_id.is_none() && ticket.user_id.is_none() && !queues.is_empty() {
            match self.router.route(&ticket, &contact, event).await? {
                RouteOutcome::Assigned { .. } => routed_now = true,
                RouteOutcome::Prompted => prompted = true,
                RouteOutcome::NoQueues => {},
            }
        }

        let ticket = self
            .store
            .get_ticket(ticket.id)
            .await?
            .ok_or_else(|| TicketsError::ticket_not_found(ticket.id))?;
        let connection = self
            .store
            .get_connection(ticket.connection_id)
            .await?
            .unwrap_or_default();

        if let Some(text) = self.gate.out_of_hours_message(&connection).await? {
            let outbox = self.outbox.clone();
            let (ticket, contact) = (ticket.clone(), contact.clone());
            self.debouncer.schedule(ticket.id, async move {
                match outbox.send_text(&ticket, &contact, &text).await {
                    Ok(_) => {
                        #[cfg(feature = "metrics")]
                        counter!(automation::OUT_OF_HOURS_SENT_TOTAL).increment(1);
                    },
                    Err(e) => {
                        warn!(ticket_id = ticket.id, error = %e, "out-of-hours reply failed");
                    },
                }
            });
            return Ok(Handled::OutOfHours);
        }
        if prompted {
            return Ok(Handled::Prompted);
        }

        if ticket.queue_id.is_none()
            && ticket.status != TicketStatus::Open
            && queues.len() <= 1
            && let Some(greeting) = connection.greeting.as_deref().filter(|g| !g.trim().is_empty())
        {
            self.outbox.send_text(&ticket, &contact, greeting).await?;
            return Ok(Handled::Greeted);
        }

        if ticket.chatbot && ticket.queue_id.is_some() {
            let transition = self
                .chatbot
                .handle(ticket.id, &contact, event, !routed_now)
                .await?;
            return Ok(Handled::Chatbot(transition));
        }

        Ok(Handled::Recorded)
    }

    pub async fn process_ack(&self, ack: &AckEvent) -> Result<Handled> {
        match self
            .store
            .update_message_ack(&ack.external_message_id, ack.ack)
            .await?
        {
            Some(message) => {
                self.notifier.message_updated(&message);
                Ok(Handled::AckUpdated)
            },
            None => Ok(Handled::AckIgnored),
        }
    }
}

fn skip_reason(event: &InboundEvent) -> Option<&'static str> {
    if event.sender.external_id == STATUS_BROADCAST {
        return Some("status_broadcast");
    }
    if !event.kind.is_supported() {
        return Some("unsupported_kind");
    }
    if event.origin == Some(MessageOrigin::System) {
        return Some("own_send");
    }
    if event.from_me && !(event.kind == MessageKind::Chat || event.kind.is_media()) {
        return Some("own_non_chat");
    }
    None
}
