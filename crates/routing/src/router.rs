use std::sync::Arc;

use {
    helpline_channels::{ChooserEntry, ChooserSpec, render_chooser},
    helpline_common::types::{
        ChooserMode, Contact, InboundEvent, Queue, Ticket, setting_keys,
    },
    helpline_config::ReplyTexts,
    helpline_tickets::{Outbox, Store, TicketLifecycle, TicketUpdate},
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use helpline_metrics::{automation, counter};

use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The connection serves no queue.
    NoQueues,
    Assigned {
        ticket: Ticket,
        queue: Queue,
        chatbot: bool,
    },
    /// A chooser of queues was sent; the ticket stays unassigned.
    Prompted,
}

pub struct QueueRouter {
    store: Arc<dyn Store>,
    lifecycle: Arc<TicketLifecycle>,
    outbox: Outbox,
    texts: ReplyTexts,
}

impl QueueRouter {
    pub fn new(
        store: Arc<dyn Store>,
        lifecycle: Arc<TicketLifecycle>,
        outbox: Outbox,
        texts: ReplyTexts,
    ) -> Self {
        Self {
            store,
            lifecycle,
            outbox,
            texts,
        }
    }

    pub async fn route(
        &self,
        ticket: &Ticket,
        contact: &Contact,
        event: &InboundEvent,
    ) -> Result<RouteOutcome> {
        let queues = self
            .store
            .queues_for_connection(ticket.connection_id)
            .await?;

        let chosen = match queues.as_slice() {
            [] => return Ok(RouteOutcome::NoQueues),
            [only] => only.clone(),
            many => match selected_queue(many, event.selection.as_deref()) {
                Some(queue) => {
                    let queue = queue.clone();
                    let (ticket, chatbot) = self.assign(ticket, &queue).await?;
                    if !chatbot {
                        self.greet(&ticket, contact, &queue).await?;
                    }
                    return Ok(RouteOutcome::Assigned {
                        ticket,
                        queue,
                        chatbot,
                    });
                },
                None => {
                    self.prompt(ticket, contact, many).await?;
                    return Ok(RouteOutcome::Prompted);
                },
            },
        };

        let (ticket, chatbot) = self.assign(ticket, &chosen).await?;
        Ok(RouteOutcome::Assigned {
            ticket,
            queue: chosen,
            chatbot,
        })
    }

    async fn assign(&self, ticket: &Ticket, queue: &Queue) -> Result<(Ticket, bool)> {
        let chatbot = self
            .store
            .queue_options(queue.id)
            .await?
            .iter()
            .any(|o| o.parent_id.is_none());
        let ticket = self
            .lifecycle
            .update(ticket.id, TicketUpdate {
                queue_id: Some(Some(queue.id)),
                chatbot: Some(chatbot),
                ..TicketUpdate::default()
            })
            .await?;

        info!(ticket_id = ticket.id, queue_id = queue.id, chatbot, "queue assigned");
        #[cfg(feature = "metrics")]
        counter!(automation::QUEUE_ASSIGNMENTS_TOTAL).increment(1);
        Ok((ticket, chatbot))
    }

    /// Queue greeting for a queue without a menu, as media when it has one.
    async fn greet(&self, ticket: &Ticket, contact: &Contact, queue: &Queue) -> Result<()> {
        let Some(greeting) = queue.greeting.as_deref().filter(|g| !g.trim().is_empty()) else {
            return Ok(());
        };
        match &queue.media {
            Some(media) => {
                self.outbox
                    .send_media(ticket, contact, media, Some(greeting))
                    .await?
            },
            None => self.outbox.send_text(ticket, contact, greeting).await?,
        };
        Ok(())
    }

    async fn prompt(&self, ticket: &Ticket, contact: &Contact, queues: &[Queue]) -> Result<()> {
        let mode = self.chooser_mode().await?;
        let greeting = self
            .store
            .get_connection(ticket.connection_id)
            .await?
            .and_then(|c| c.greeting)
            .filter(|g| !g.trim().is_empty());
        let body = greeting.unwrap_or_else(|| match mode {
            ChooserMode::Buttons => self.texts.menu_placeholder.clone(),
            ChooserMode::List => self.texts.list_text.clone(),
        });

        let entries = queues
            .iter()
            .enumerate()
            .map(|(i, q)| ChooserEntry::new((i + 1).to_string(), q.name.clone()))
            .collect();
        let chooser = render_chooser(mode, ChooserSpec {
            title: self.texts.list_title.clone(),
            body,
            footer: None,
            section_title: self.texts.list_section.clone(),
            entries,
        });
        debug!(ticket_id = ticket.id, queues = queues.len(), %mode, "prompting for a queue");
        self.outbox.send_chooser(ticket, contact, chooser).await?;
        Ok(())
    }

    async fn chooser_mode(&self) -> Result<ChooserMode> {
        let Some(raw) = self
            .store
            .get_setting(setting_keys::QUEUES_OPTION_TYPE)
            .await?
        else {
            return Ok(ChooserMode::default());
        };
        Ok(raw.parse().unwrap_or_else(|e| {
            warn!(error = %e, "invalid queue chooser setting, using buttons");
            ChooserMode::default()
        }))
    }
}

/// The queue picked by a button or list reply carrying a 1-based ordinal.
/// Typed text never selects a queue.
fn selected_queue<'a>(queues: &'a [Queue], selection: Option<&str>) -> Option<&'a Queue> {
    let n: usize = selection?.trim().parse().ok()?;
    n.checked_sub(1).and_then(|i| queues.get(i))
}
