#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use {
    helpline_auto_reply::{Handled, Pipeline, RatingOutcome},
    helpline_channels::{OutboundContent, RecordingOutbound},
    helpline_chatbot::Transition,
    helpline_common::types::{
        AckEvent, AckState, Catalog, ChooserMode, Connection, ConnectionEntry, GatewayFrame,
        InboundEvent, MediaPayload, MenuPosition, MessageKind, MessageOrigin, Queue, QueueOption,
        SenderIdentity, Ticket, TicketStatus, setting_keys,
    },
    helpline_config::{HelplineConfig, ReplyTexts},
    helpline_media::MemoryMediaStore,
    helpline_tickets::{
        CatalogStore, InMemoryStore, Notification, Notifier, NotifyAction, Outbox,
        TicketLifecycle, TicketStore, TicketUpdate, Topic,
    },
    tokio::sync::broadcast,
};

struct Harness {
    store: Arc<InMemoryStore>,
    outbound: Arc<RecordingOutbound>,
    media: Arc<MemoryMediaStore>,
    notifier: Notifier,
    pipeline: Pipeline,
    seq: AtomicU64,
}

impl Harness {
    async fn new(catalog: Catalog) -> Self {
        let store = Arc::new(InMemoryStore::new());
        store.replace_catalog(&catalog).await.unwrap();
        let outbound = Arc::new(RecordingOutbound::new());
        let media = Arc::new(MemoryMediaStore::new());
        let notifier = Notifier::default();
        let mut config = HelplineConfig::default();
        config.automation.debounce_ms = 80;
        let pipeline = Pipeline::new(
            store.clone(),
            outbound.clone(),
            media.clone(),
            notifier.clone(),
            &config,
        );
        Self {
            store,
            outbound,
            media,
            notifier,
            pipeline,
            seq: Default::default(),
        }
    }

    fn event(&self, from: &str, body: &str) -> InboundEvent {
        let n = self.seq.fetch_add(1, Ordering::SeqCst);
        InboundEvent {
            external_message_id: format!("in-{n}"),
            connection_id: 1,
            from_me: false,
            sender: SenderIdentity {
                external_id: from.into(),
                name: Some("Ana".into()),
                avatar_url: None,
                is_group: false,
            },
            kind: MessageKind::Chat,
            body: body.into(),
            selection: None,
            media: None,
            quoted_external_id: None,
            origin: None,
            unread_count: 1,
            timestamp: 1_700_000_000_000,
        }
    }

    async fn say(&self, body: &str) -> Handled {
        let event = self.event("551", body);
        self.pipeline
            .handle_frame(GatewayFrame::Message(event))
            .await
            .unwrap()
    }

    async fn pick(&self, selection: &str) -> Handled {
        let mut event = self.event("551", selection);
        event.selection = Some(selection.into());
        self.pipeline
            .handle_frame(GatewayFrame::Message(event))
            .await
            .unwrap()
    }

    async fn ticket(&self) -> Ticket {
        self.store
            .list_tickets(None)
            .await
            .unwrap()
            .into_iter()
            .next()
            .unwrap()
    }

    fn lifecycle(&self) -> TicketLifecycle {
        let outbox = Outbox::new(
            self.outbound.clone(),
            self.store.clone(),
            self.notifier.clone(),
        );
        TicketLifecycle::new(
            self.store.clone(),
            outbox,
            self.notifier.clone(),
            ReplyTexts::default(),
        )
    }
}

fn connection(queue_ids: Vec<i64>) -> ConnectionEntry {
    ConnectionEntry {
        connection: Connection {
            id: 1,
            name: "main".into(),
            greeting: Some("Welcome to Acme".into()),
            ..Connection::default()
        },
        queue_ids,
    }
}

fn queue(id: i64, name: &str) -> Queue {
    Queue {
        id,
        name: name.into(),
        color: format!("#00{id}"),
        greeting: None,
        chooser: ChooserMode::Buttons,
        media: None,
    }
}

fn root_option(id: i64, ordinal: &str, title: &str) -> QueueOption {
    QueueOption {
        id,
        queue_id: 1,
        parent_id: None,
        ordinal: ordinal.into(),
        title: title.into(),
        message: None,
        chooser: ChooserMode::Buttons,
        media: None,
        finalize: false,
    }
}

fn helpdesk() -> Catalog {
    let mut faq = root_option(12, "2", "FAQ");
    faq.message = Some("Read the FAQ".into());
    Catalog {
        connections: vec![connection(vec![1])],
        queues: vec![queue(1, "Helpdesk")],
        options: vec![
            root_option(11, "1", "Billing"),
            faq,
            root_option(13, "3", "Other"),
        ],
        settings: Vec::new(),
    }
}

fn drain(rx: &mut broadcast::Receiver<Notification>) -> Vec<Notification> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

#[tokio::test]
async fn single_queue_greets_with_root_menu_then_follows_choice() {
    let h = Harness::new(helpdesk()).await;

    assert_eq!(h.say("hi").await, Handled::Chatbot(Some(Transition::Stay)));
    let ticket = h.ticket().await;
    assert_eq!(ticket.queue_id, Some(1));
    assert!(ticket.chatbot);
    assert_eq!(ticket.menu, MenuPosition::Root);

    let choosers = h.outbound.choosers();
    assert_eq!(choosers[0].entries().len(), 3);

    assert_eq!(
        h.say("2").await,
        Handled::Chatbot(Some(Transition::MoveTo(MenuPosition::Node(12))))
    );
    assert_eq!(h.ticket().await.menu, MenuPosition::Node(12));
}

#[tokio::test]
async fn several_queues_prompt_then_assign_on_selection() {
    let mut catalog = helpdesk();
    catalog.connections = vec![connection(vec![1, 2])];
    catalog.queues.push(queue(2, "Sales"));
    let h = Harness::new(catalog).await;

    assert_eq!(h.say("hello").await, Handled::Prompted);
    assert_eq!(h.ticket().await.queue_id, None);
    assert_eq!(h.outbound.choosers()[0].body(), "Welcome to Acme");
    h.outbound.clear();

    // The reply picks the queue and is not reused as a menu choice.
    assert_eq!(h.pick("1").await, Handled::Chatbot(Some(Transition::Stay)));
    let ticket = h.ticket().await;
    assert_eq!(ticket.queue_id, Some(1));
    assert_eq!(ticket.menu, MenuPosition::Root);
}

#[tokio::test]
async fn typed_digit_does_not_pick_a_queue() {
    let mut catalog = helpdesk();
    catalog.connections = vec![connection(vec![1, 2])];
    catalog.queues.push(queue(2, "Sales"));
    let h = Harness::new(catalog).await;

    assert_eq!(h.say("2").await, Handled::Prompted);
    assert_eq!(h.ticket().await.queue_id, None);
    assert_eq!(h.outbound.choosers().len(), 1);
}

#[tokio::test]
async fn redelivered_event_does_not_rerun_automation() {
    let h = Harness::new(helpdesk()).await;
    let event = h.event("551", "hi");

    h.pipeline
        .handle_frame(GatewayFrame::Message(event.clone()))
        .await
        .unwrap();
    let sent = h.outbound.sent().len();

    for _ in 0..3 {
        assert_eq!(
            h.pipeline
                .handle_frame(GatewayFrame::Message(event.clone()))
                .await,
            Some(Handled::Duplicate)
        );
    }
    assert_eq!(h.outbound.sent().len(), sent);
    let ticket = h.ticket().await;
    let contact_messages = h
        .store
        .list_messages(ticket.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|m| m.origin == MessageOrigin::Contact)
        .count();
    assert_eq!(contact_messages, 1);
}

#[tokio::test]
async fn rating_reply_is_clamped_and_closes_once() {
    let mut catalog = helpdesk();
    catalog.connections[0].connection.rating_prompt = Some("How did we do?".into());
    catalog.connections[0].connection.farewell = Some("Thanks, bye".into());
    let h = Harness::new(catalog).await;
    h.say("hi").await;

    let lifecycle = h.lifecycle();
    let ticket = h.ticket().await;
    lifecycle
        .update(ticket.id, TicketUpdate {
            status: Some(TicketStatus::Open),
            user_id: Some(Some(7)),
            ..TicketUpdate::default()
        })
        .await
        .unwrap();
    let still_open = lifecycle.close(ticket.id).await.unwrap();
    assert_eq!(still_open.status, TicketStatus::Open);
    assert!(
        h.outbound
            .bodies()
            .last()
            .unwrap()
            .starts_with("How did we do?\n\n")
    );

    // Not a number: nothing happens.
    h.outbound.clear();
    assert_eq!(
        h.say("great service").await,
        Handled::Rating(RatingOutcome::Ignored)
    );
    assert!(h.outbound.sent().is_empty());
    assert!(h.store.pending_rating(ticket.id).await.unwrap().is_some());

    let mut rx = h.notifier.subscribe();
    assert_eq!(h.say("7").await, Handled::Rating(RatingOutcome::Resolved(3)));

    let ticket = h.store.get_ticket(ticket.id).await.unwrap().unwrap();
    assert_eq!(ticket.status, TicketStatus::Closed);
    assert_eq!(ticket.queue_id, None);
    assert_eq!(ticket.user_id, None);
    assert!(h.store.pending_rating(ticket.id).await.unwrap().is_none());
    assert_eq!(h.outbound.bodies(), vec!["Thanks, bye".to_string()]);

    let ticket_updates: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter(|n| n.event == "ticket" && n.action == NotifyAction::Update)
        .collect();
    assert_eq!(ticket_updates.len(), 1);
    assert_eq!(ticket_updates[0].topics, vec![
        Topic::Status(TicketStatus::Closed),
        Topic::Ticket(ticket.id)
    ]);
}

#[tokio::test]
async fn redelivered_rating_reply_changes_nothing() {
    let mut catalog = helpdesk();
    catalog.connections[0].connection.rating_prompt = Some("How did we do?".into());
    let h = Harness::new(catalog).await;
    h.say("hi").await;

    let lifecycle = h.lifecycle();
    let ticket = h.ticket().await;
    lifecycle
        .update(ticket.id, TicketUpdate {
            status: Some(TicketStatus::Open),
            user_id: Some(Some(7)),
            ..TicketUpdate::default()
        })
        .await
        .unwrap();
    lifecycle.close(ticket.id).await.unwrap();

    let reply = h.event("551", "3");
    assert_eq!(
        h.pipeline
            .handle_frame(GatewayFrame::Message(reply.clone()))
            .await,
        Some(Handled::Rating(RatingOutcome::Resolved(3)))
    );
    let sent = h.outbound.sent().len();
    let stored = h.store.list_messages(ticket.id).await.unwrap().len();

    for _ in 0..2 {
        assert_eq!(
            h.pipeline
                .handle_frame(GatewayFrame::Message(reply.clone()))
                .await,
            Some(Handled::Duplicate)
        );
    }
    let tickets = h.store.list_tickets(None).await.unwrap();
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0].status, TicketStatus::Closed);
    assert_eq!(h.outbound.sent().len(), sent);
    assert_eq!(h.store.list_messages(ticket.id).await.unwrap().len(), stored);
    assert!(
        h.store
            .find_message(&reply.external_message_id)
            .await
            .unwrap()
            .is_some()
    );
}

fn closed_all_week() -> (String, String) {
    let days: Vec<_> = [
        "monday",
        "tuesday",
        "wednesday",
        "thursday",
        "friday",
        "saturday",
        "sunday",
    ]
    .iter()
    .map(|d| serde_json::json!({ "weekdayEn": d, "startTime": "00:00", "endTime": "00:00" }))
    .collect();
    (
        setting_keys::SCHEDULES.into(),
        serde_json::Value::from(days).to_string(),
    )
}

#[tokio::test]
async fn out_of_hours_burst_sends_one_reply() {
    let mut catalog = helpdesk();
    catalog.connections[0].connection.out_of_hours = Some("We are closed".into());
    catalog.settings = vec![closed_all_week()];
    let h = Harness::new(catalog).await;

    for body in ["hi", "hello?", "anyone"] {
        assert_eq!(h.say(body).await, Handled::OutOfHours);
    }
    h.pipeline.debouncer().drain().await;

    let replies: Vec<_> = h
        .outbound
        .bodies()
        .into_iter()
        .filter(|b| b == "We are closed")
        .collect();
    assert_eq!(replies.len(), 1);
    // The chatbot never saw these events.
    assert!(h.outbound.choosers().is_empty());
}

#[tokio::test]
async fn out_of_hours_reply_follows_the_queue_chooser() {
    let mut catalog = helpdesk();
    catalog.connections = vec![connection(vec![1, 2])];
    catalog.connections[0].connection.out_of_hours = Some("We are closed".into());
    catalog.queues.push(queue(2, "Sales"));
    catalog.settings = vec![closed_all_week()];
    let h = Harness::new(catalog).await;

    assert_eq!(h.say("hello").await, Handled::OutOfHours);
    h.pipeline.debouncer().drain().await;

    let sent = h.outbound.sent();
    assert_eq!(sent.len(), 2);
    assert!(matches!(sent[0].content, OutboundContent::Chooser { .. }));
    assert_eq!(sent[1].content.summary(), "We are closed");
    assert_eq!(h.ticket().await.queue_id, None);
}

#[tokio::test]
async fn hand_off_stops_the_chatbot() {
    let mut catalog = helpdesk();
    catalog.options.extend([
        QueueOption {
            parent_id: Some(11),
            ..root_option(21, "1", "Invoices")
        },
        QueueOption {
            parent_id: Some(11),
            ..root_option(22, "2", "Refunds")
        },
    ]);
    let h = Harness::new(catalog).await;
    h.say("hi").await;
    h.say("1").await;
    assert_eq!(h.ticket().await.menu, MenuPosition::Node(11));

    h.outbound.clear();
    assert_eq!(h.say("#").await, Handled::Chatbot(Some(Transition::HandOff)));
    let ticket = h.ticket().await;
    assert!(!ticket.chatbot);
    assert_eq!(ticket.menu, MenuPosition::Root);
    assert_eq!(ticket.queue_id, Some(1));
    assert_eq!(h.outbound.bodies(), vec![ReplyTexts::default().please_wait]);

    h.outbound.clear();
    assert_eq!(h.say("2").await, Handled::Recorded);
    assert!(h.outbound.sent().is_empty());
}

#[tokio::test]
async fn filtered_events_never_touch_the_store() {
    let h = Harness::new(helpdesk()).await;

    let broadcast = h.event("status@broadcast", "story");
    assert_eq!(
        h.pipeline.process_message(&broadcast).await.unwrap(),
        Handled::Skipped("status_broadcast")
    );

    let mut echo = h.event("551", "Welcome");
    echo.from_me = true;
    echo.origin = Some(MessageOrigin::System);
    assert_eq!(
        h.pipeline.process_message(&echo).await.unwrap(),
        Handled::Skipped("own_send")
    );

    let mut unknown = h.event("551", "");
    unknown.kind = MessageKind::Unsupported;
    assert_eq!(
        h.pipeline.process_message(&unknown).await.unwrap(),
        Handled::Skipped("unsupported_kind")
    );

    assert!(h.store.list_tickets(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn own_and_group_messages_are_recorded_without_automation() {
    let h = Harness::new(helpdesk()).await;

    let mut own = h.event("551", "typed on the phone");
    own.from_me = true;
    assert_eq!(
        h.pipeline.process_message(&own).await.unwrap(),
        Handled::Recorded
    );

    let mut group = h.event("group-1", "hello all");
    group.sender.is_group = true;
    assert_eq!(
        h.pipeline.process_message(&group).await.unwrap(),
        Handled::Recorded
    );

    assert!(h.outbound.sent().is_empty());
    for ticket in h.store.list_tickets(None).await.unwrap() {
        assert_eq!(ticket.queue_id, None);
        assert!(!ticket.chatbot);
    }
}

#[tokio::test]
async fn media_failure_still_runs_automation() {
    let h = Harness::new(helpdesk()).await;
    h.media.set_failing(true);

    let mut photo = h.event("551", "");
    photo.kind = MessageKind::Image;
    photo.media = Some(MediaPayload {
        mime_type: "image/jpeg".into(),
        file_name: None,
        data: vec![0xff, 0xd8],
    });
    assert_eq!(
        h.pipeline.process_message(&photo).await.unwrap(),
        Handled::Chatbot(Some(Transition::Stay))
    );
    let ticket = h.ticket().await;
    assert!(
        h.store
            .list_messages(ticket.id)
            .await
            .unwrap()
            .iter()
            .all(|m| m.origin == MessageOrigin::System)
    );
}

#[tokio::test]
async fn acks_only_move_forward() {
    let h = Harness::new(helpdesk()).await;
    h.say("hi").await;
    let sent = h.outbound.sent();
    let external_id = sent[0].external_id.clone();
    assert!(matches!(sent[0].content, OutboundContent::Chooser { .. }));

    let ack = |state| GatewayFrame::Ack(AckEvent {
        external_message_id: external_id.clone(),
        ack: state,
    });
    let mut rx = h.notifier.subscribe();
    assert_eq!(
        h.pipeline.handle_frame(ack(AckState::Read)).await,
        Some(Handled::AckUpdated)
    );
    assert_eq!(
        h.pipeline.handle_frame(ack(AckState::Device)).await,
        Some(Handled::AckIgnored)
    );
    let updates = drain(&mut rx);
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].event, "appMessage");

    let stored = h.store.find_message(&external_id).await.unwrap().unwrap();
    assert_eq!(stored.ack, AckState::Read);

    let unknown = GatewayFrame::Ack(AckEvent {
        external_message_id: "nope".into(),
        ack: AckState::Read,
    });
    assert_eq!(
        h.pipeline.handle_frame(unknown).await,
        Some(Handled::AckIgnored)
    );
}

#[tokio::test]
async fn connection_greeting_when_no_queue_serves_it() {
    let catalog = Catalog {
        connections: vec![connection(Vec::new())],
        ..Catalog::default()
    };
    let h = Harness::new(catalog).await;
    assert_eq!(h.say("hi").await, Handled::Greeted);
    assert_eq!(h.outbound.bodies(), vec!["Welcome to Acme".to_string()]);
}
