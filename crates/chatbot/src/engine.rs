//! Applies menu transitions to a ticket and renders the result.

use std::sync::Arc;

use {
    helpline_channels::{ChooserEntry, ChooserSpec, render_chooser},
    helpline_common::types::{
        ChooserMode, Contact, InboundEvent, MenuPosition, Queue, QueueOption, Ticket, TicketId,
    },
    helpline_config::ReplyTexts,
    helpline_routing::{QueueRouter, RouteOutcome},
    helpline_tickets::{Error as TicketsError, Outbox, Store, TicketLifecycle, TicketUpdate},
    tracing::{debug, info},
};

#[cfg(feature = "metrics")]
use helpline_metrics::{automation, counter, labels};

use crate::{
    Result,
    menu::{BACK, HAND_OFF, MenuTree, RESTART, Transition},
};

pub struct ChatbotEngine {
    store: Arc<dyn Store>,
    lifecycle: Arc<TicketLifecycle>,
    router: Arc<QueueRouter>,
    outbox: Outbox,
    texts: ReplyTexts,
}

impl ChatbotEngine {
    pub fn new(
        store: Arc<dyn Store>,
        lifecycle: Arc<TicketLifecycle>,
        router: Arc<QueueRouter>,
        outbox: Outbox,
        texts: ReplyTexts,
    ) -> Self {
        Self {
            store,
            lifecycle,
            router,
            outbox,
            texts,
        }
    }

    /// Run one inbound event through the menu of the ticket's queue.
    ///
    /// State is read from the store on every call, never cached, so rapid
    /// replies delivered out of order act on the latest position. With
    /// `consume` false a ticket at the root gets the root menu and the token
    /// is not read as a choice.
    pub async fn handle(
        &self,
        ticket_id: TicketId,
        contact: &Contact,
        event: &InboundEvent,
        consume: bool,
    ) -> Result<Option<Transition>> {
        let ticket = self
            .store
            .get_ticket(ticket_id)
            .await?
            .ok_or_else(|| TicketsError::ticket_not_found(ticket_id))?;
        let Some(queue_id) = ticket.queue_id.filter(|_| ticket.chatbot) else {
            return Ok(None);
        };
        let Some(queue) = self.store.get_queue(queue_id).await? else {
            return Ok(None);
        };
        let tree = MenuTree::new(self.store.queue_options(queue.id).await?);
        if tree.is_empty() {
            return Ok(None);
        }

        let at = tree.normalize(ticket.menu);
        let transition = tree.transition(at, event.menu_token(), consume);
        debug!(
            ticket_id,
            ?at,
            transition = transition.as_str(),
            "chatbot transition"
        );
        #[cfg(feature = "metrics")]
        counter!(automation::CHATBOT_TRANSITIONS_TOTAL, labels::TRANSITION => transition.as_str())
            .increment(1);

        match transition {
            Transition::Restart => self.restart(&ticket, contact, event).await?,
            Transition::HandOff => self.hand_off(&ticket, contact).await?,
            Transition::MoveTo(to) => {
                let ticket = if to == ticket.menu {
                    ticket
                } else {
                    self.lifecycle
                        .update_quietly(ticket.id, TicketUpdate {
                            menu: Some(to),
                            ..TicketUpdate::default()
                        })
                        .await?
                };
                self.render(&ticket, contact, &queue, &tree, to).await?;
            },
            Transition::Stay => self.render(&ticket, contact, &queue, &tree, at).await?,
        }
        Ok(Some(transition))
    }

    async fn restart(&self, ticket: &Ticket, contact: &Contact, event: &InboundEvent) -> Result<()> {
        let ticket = self
            .lifecycle
            .update(ticket.id, TicketUpdate {
                queue_id: Some(None),
                chatbot: Some(false),
                menu: Some(MenuPosition::Root),
                ..TicketUpdate::default()
            })
            .await?;
        info!(ticket_id = ticket.id, "chatbot restarted");

        if let RouteOutcome::Assigned {
            ticket,
            queue,
            chatbot: true,
        } = self.router.route(&ticket, contact, event).await?
        {
            let tree = MenuTree::new(self.store.queue_options(queue.id).await?);
            self.render_root(&ticket, contact, &queue, &tree).await?;
        }
        Ok(())
    }

    async fn hand_off(&self, ticket: &Ticket, contact: &Contact) -> Result<()> {
        let ticket = self
            .lifecycle
            .update(ticket.id, TicketUpdate {
                chatbot: Some(false),
                menu: Some(MenuPosition::Root),
                ..TicketUpdate::default()
            })
            .await?;
        info!(ticket_id = ticket.id, queue_id = ?ticket.queue_id, "handed off to an agent");
        self.outbox
            .send_text(&ticket, contact, &self.texts.please_wait)
            .await?;
        Ok(())
    }

    async fn render(
        &self,
        ticket: &Ticket,
        contact: &Contact,
        queue: &Queue,
        tree: &MenuTree,
        at: MenuPosition,
    ) -> Result<()> {
        match at {
            MenuPosition::Root => self.render_root(ticket, contact, queue, tree).await,
            MenuPosition::Node(id) => match tree.get(id) {
                Some(node) => self.render_node(ticket, contact, queue, tree, node).await,
                None => self.render_root(ticket, contact, queue, tree).await,
            },
        }
    }

    async fn render_root(
        &self,
        ticket: &Ticket,
        contact: &Contact,
        queue: &Queue,
        tree: &MenuTree,
    ) -> Result<()> {
        let roots = tree.roots();
        if roots.is_empty() {
            return Ok(());
        }
        let body = non_empty(queue.greeting.as_deref())
            .unwrap_or(&self.texts.menu_placeholder)
            .to_string();
        let entries = roots
            .iter()
            .map(|o| ChooserEntry::new(o.ordinal.trim(), o.title.clone()))
            .collect();
        let chooser = render_chooser(queue.chooser, self.spec(queue, body, entries));
        self.outbox.send_chooser(ticket, contact, chooser).await?;

        let more = render_chooser(queue.chooser, ChooserSpec {
            title: self.texts.more_options.clone(),
            body: self.texts.more_options.clone(),
            footer: None,
            section_title: self.texts.list_section.clone(),
            entries: vec![ChooserEntry::new(RESTART, self.texts.home_label.clone())],
        });
        self.outbox.send_chooser(ticket, contact, more).await?;
        Ok(())
    }

    async fn render_node(
        &self,
        ticket: &Ticket,
        contact: &Contact,
        queue: &Queue,
        tree: &MenuTree,
        node: &QueueOption,
    ) -> Result<()> {
        if let Some(media) = &node.media {
            self.outbox.send_media(ticket, contact, media, None).await?;
        }

        let children = tree.children(node.id);
        match children.as_slice() {
            [] => {
                let text = non_empty(node.message.as_deref()).unwrap_or(&node.title);
                self.outbox.send_text(ticket, contact, text).await?;
            },
            [only] => {
                let text = non_empty(only.message.as_deref()).unwrap_or(&only.title);
                self.outbox.send_text(ticket, contact, text).await?;
                if only.finalize {
                    return self.finish(ticket).await;
                }
            },
            many => {
                let body = match non_empty(node.message.as_deref()) {
                    Some(message) => format!("{}\n\n{message}", node.title),
                    None => node.title.clone(),
                };
                let entries = many
                    .iter()
                    .map(|o| ChooserEntry::new(o.ordinal.trim(), o.title.clone()))
                    .collect();
                let chooser = render_chooser(node.chooser, self.spec(queue, body, entries));
                self.outbox.send_chooser(ticket, contact, chooser).await?;
            },
        }

        if node.finalize {
            return self.finish(ticket).await;
        }

        let navigation = render_chooser(node.chooser, ChooserSpec {
            title: self.texts.other_options.clone(),
            body: self.texts.other_options.clone(),
            footer: None,
            section_title: self.texts.list_section.clone(),
            entries: vec![
                ChooserEntry::new(BACK, self.texts.back_label.clone()),
                ChooserEntry::new(RESTART, self.texts.home_label.clone()),
                ChooserEntry::new(HAND_OFF, self.texts.agent_label.clone()),
            ],
        });
        self.outbox.send_chooser(ticket, contact, navigation).await?;
        Ok(())
    }

    async fn finish(&self, ticket: &Ticket) -> Result<()> {
        let closed = self.lifecycle.close(ticket.id).await?;
        info!(ticket_id = closed.id, status = %closed.status, "finalize option reached");
        Ok(())
    }

    fn spec(&self, queue: &Queue, body: String, entries: Vec<ChooserEntry>) -> ChooserSpec {
        ChooserSpec {
            title: self.texts.list_title.clone(),
            body,
            footer: Some(queue.name.clone()),
            section_title: self.texts.list_section.clone(),
            entries,
        }
    }
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.trim().is_empty())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        helpline_channels::{Chooser, RecordingOutbound},
        helpline_common::types::{
            Catalog, Connection, ConnectionEntry, MessageKind, NewTicket, SenderIdentity,
            TicketStatus,
        },
        helpline_tickets::{CatalogStore, InMemoryStore, Notifier, TicketStore},
    };

    fn option(id: i64, parent: Option<i64>, ordinal: &str, title: &str) -> QueueOption {
        QueueOption {
            id,
            queue_id: 1,
            parent_id: parent,
            ordinal: ordinal.into(),
            title: title.into(),
            message: None,
            chooser: ChooserMode::Buttons,
            media: None,
            finalize: false,
        }
    }

    /// ```text
    /// 1 Billing            2 Support                 3 Hours
    ///   4 Invoices           6 Reset password          (leaf, finalize)
    ///   5 Refunds
    /// ```
    fn options() -> Vec<QueueOption> {
        let mut reset = option(6, Some(2), "1", "Reset password");
        reset.message = Some("Use the link we sent".into());
        let mut hours = option(3, None, "3", "Hours");
        hours.message = Some("We open at 8".into());
        hours.finalize = true;
        let mut billing = option(1, None, "1", "Billing");
        billing.message = Some("What about billing?".into());
        vec![
            billing,
            option(2, None, "2", "Support"),
            hours,
            option(4, Some(1), "1", "Invoices"),
            option(5, Some(1), "2", "Refunds"),
            reset,
        ]
    }

    struct Fixture {
        store: Arc<InMemoryStore>,
        outbound: Arc<RecordingOutbound>,
        engine: ChatbotEngine,
        ticket: Ticket,
        contact: Contact,
    }

    async fn fixture() -> Fixture {
        fixture_with(options()).await
    }

    async fn fixture_with(options: Vec<QueueOption>) -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        store
            .replace_catalog(&Catalog {
                connections: vec![ConnectionEntry {
                    connection: Connection {
                        id: 1,
                        name: "main".into(),
                        ..Connection::default()
                    },
                    queue_ids: vec![1],
                }],
                queues: vec![Queue {
                    id: 1,
                    name: "Helpdesk".into(),
                    color: "#123".into(),
                    greeting: Some("How can we help?".into()),
                    chooser: ChooserMode::Buttons,
                    media: None,
                }],
                options,
                settings: Vec::new(),
            })
            .await
            .unwrap();

        let outbound = Arc::new(RecordingOutbound::new());
        let notifier = Notifier::default();
        let outbox = Outbox::new(outbound.clone(), store.clone(), notifier.clone());
        let texts = ReplyTexts::default();
        let lifecycle = Arc::new(TicketLifecycle::new(
            store.clone(),
            outbox.clone(),
            notifier,
            texts.clone(),
        ));
        let router = Arc::new(QueueRouter::new(
            store.clone(),
            lifecycle.clone(),
            outbox.clone(),
            texts.clone(),
        ));
        let engine = ChatbotEngine::new(store.clone(), lifecycle, router, outbox, texts);

        let contact = store
            .upsert_contact(&SenderIdentity {
                external_id: "551".into(),
                name: None,
                avatar_url: None,
                is_group: false,
            })
            .await
            .unwrap();
        let mut ticket = store
            .create_ticket(&NewTicket {
                contact_id: contact.id,
                connection_id: 1,
                status: TicketStatus::Pending,
                is_group: false,
                unread_messages: 0,
            })
            .await
            .unwrap();
        ticket.queue_id = Some(1);
        ticket.chatbot = true;
        let ticket = store.save_ticket(&ticket).await.unwrap();

        Fixture {
            store,
            outbound,
            engine,
            ticket,
            contact,
        }
    }

    fn event(token: &str) -> InboundEvent {
        InboundEvent {
            external_message_id: format!("in-{token}"),
            connection_id: 1,
            from_me: false,
            sender: SenderIdentity {
                external_id: "551".into(),
                name: None,
                avatar_url: None,
                is_group: false,
            },
            kind: MessageKind::Chat,
            body: token.into(),
            selection: None,
            media: None,
            quoted_external_id: None,
            origin: None,
            unread_count: 0,
            timestamp: 0,
        }
    }

    impl Fixture {
        async fn send(&self, token: &str, consume: bool) -> Option<Transition> {
            self.engine
                .handle(self.ticket.id, &self.contact, &event(token), consume)
                .await
                .unwrap()
        }

        async fn ticket(&self) -> Ticket {
            self.store.get_ticket(self.ticket.id).await.unwrap().unwrap()
        }

        fn entry_ids(&self, chooser: &Chooser) -> Vec<String> {
            chooser.entries().iter().map(|e| e.id.clone()).collect()
        }
    }

    #[tokio::test]
    async fn first_message_renders_root_without_consuming() {
        let f = fixture().await;
        assert_eq!(f.send("2", false).await, Some(Transition::Stay));
        assert_eq!(f.ticket().await.menu, MenuPosition::Root);

        let choosers = f.outbound.choosers();
        assert_eq!(choosers.len(), 2);
        assert_eq!(choosers[0].body(), "How can we help?");
        assert_eq!(f.entry_ids(&choosers[0]), ["1", "2", "3"]);
        assert_eq!(f.entry_ids(&choosers[1]), ["00"]);
    }

    #[tokio::test]
    async fn choice_at_root_moves_to_node_and_renders_children() {
        let f = fixture().await;
        let to = f.send("1", true).await;
        assert_eq!(to, Some(Transition::MoveTo(MenuPosition::Node(1))));
        assert_eq!(f.ticket().await.menu, MenuPosition::Node(1));

        let choosers = f.outbound.choosers();
        assert_eq!(choosers[0].body(), "Billing\n\nWhat about billing?");
        assert_eq!(f.entry_ids(&choosers[0]), ["1", "2"]);
        assert_eq!(f.entry_ids(&choosers[1]), ["0", "00", "#"]);
    }

    #[tokio::test]
    async fn garbage_at_root_re_renders() {
        let f = fixture().await;
        assert_eq!(f.send("what?", true).await, Some(Transition::Stay));
        assert_eq!(f.ticket().await.menu, MenuPosition::Root);
        assert_eq!(f.outbound.choosers().len(), 2);
    }

    #[tokio::test]
    async fn single_child_is_shown_then_taken_on_any_token() {
        let f = fixture().await;
        f.send("2", true).await;
        let bodies = f.outbound.bodies();
        assert_eq!(bodies[0], "Use the link we sent");
        assert_eq!(f.entry_ids(&f.outbound.choosers()[0]), ["0", "00", "#"]);

        assert_eq!(
            f.send("x", true).await,
            Some(Transition::MoveTo(MenuPosition::Node(6)))
        );
        assert_eq!(f.ticket().await.menu, MenuPosition::Node(6));
    }

    #[tokio::test]
    async fn single_finalize_child_closes_on_arrival() {
        let mut options = options();
        for o in &mut options {
            if o.id == 6 {
                o.finalize = true;
            }
        }
        let f = fixture_with(options).await;
        f.send("2", true).await;

        assert_eq!(f.outbound.bodies(), vec!["Use the link we sent".to_string()]);
        let ticket = f.ticket().await;
        assert_eq!(ticket.status, TicketStatus::Closed);
        assert!(!ticket.chatbot);
        assert_eq!(ticket.queue_id, None);
    }

    #[tokio::test]
    async fn finalize_leaf_closes_the_ticket() {
        let f = fixture().await;
        f.send("3", true).await;
        assert_eq!(f.outbound.bodies(), vec!["We open at 8".to_string()]);
        assert_eq!(f.ticket().await.status, TicketStatus::Closed);
    }

    #[tokio::test]
    async fn back_goes_to_parent() {
        let f = fixture().await;
        f.send("1", true).await;
        f.send("2", true).await;
        assert_eq!(f.ticket().await.menu, MenuPosition::Node(5));
        f.send("0", true).await;
        assert_eq!(f.ticket().await.menu, MenuPosition::Node(1));
        f.send("0", true).await;
        assert_eq!(f.ticket().await.menu, MenuPosition::Root);
    }

    #[tokio::test]
    async fn hash_hands_off_and_keeps_queue() {
        let f = fixture().await;
        f.send("1", true).await;
        f.outbound.clear();

        assert_eq!(f.send("#", true).await, Some(Transition::HandOff));
        let ticket = f.ticket().await;
        assert!(!ticket.chatbot);
        assert_eq!(ticket.menu, MenuPosition::Root);
        assert_eq!(ticket.queue_id, Some(1));
        assert_eq!(f.outbound.bodies(), vec![ReplyTexts::default().please_wait]);

        // The chatbot stays out of it from now on.
        f.outbound.clear();
        assert_eq!(f.send("1", true).await, None);
        assert!(f.outbound.sent().is_empty());
    }

    #[tokio::test]
    async fn double_zero_reroutes_and_renders_root() {
        let f = fixture().await;
        f.send("1", true).await;
        f.outbound.clear();

        assert_eq!(f.send("00", true).await, Some(Transition::Restart));
        let ticket = f.ticket().await;
        assert_eq!(ticket.menu, MenuPosition::Root);
        // Single queue: routing assigns it again and the chatbot restarts.
        assert_eq!(ticket.queue_id, Some(1));
        assert!(ticket.chatbot);
        let choosers = f.outbound.choosers();
        assert_eq!(f.entry_ids(&choosers[0]), ["1", "2", "3"]);
    }

    #[tokio::test]
    async fn root_button_ids_follow_ordinals() {
        let f = fixture_with(vec![
            option(1, None, "2", "Billing"),
            option(2, None, "1", "Support"),
        ])
        .await;
        f.send("hi", false).await;
        let root = &f.outbound.choosers()[0];
        let billing = root
            .entries()
            .iter()
            .find(|e| e.label == "Billing")
            .unwrap()
            .id
            .clone();
        assert_eq!(f.entry_ids(root), ["1", "2"]);

        let mut pressed = event(&billing);
        pressed.body = "Billing".into();
        pressed.selection = Some(billing);
        let to = f
            .engine
            .handle(f.ticket.id, &f.contact, &pressed, true)
            .await
            .unwrap();
        assert_eq!(to, Some(Transition::MoveTo(MenuPosition::Node(1))));
        assert_eq!(f.ticket().await.menu, MenuPosition::Node(1));
    }

    #[tokio::test]
    async fn stale_menu_position_acts_from_root() {
        let f = fixture().await;
        let mut ticket = f.ticket().await;
        ticket.menu = MenuPosition::Node(404);
        f.store.save_ticket(&ticket).await.unwrap();

        assert_eq!(
            f.send("2", true).await,
            Some(Transition::MoveTo(MenuPosition::Node(2)))
        );
    }
}
