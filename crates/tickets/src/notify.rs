//! Change notifications for live subscribers.
//!
//! Each publish reaches every subscriber once, tagged with the topics it is
//! addressed to; subscribers filter on the topics they watch.

use std::fmt;

use {
    helpline_common::types::{Message, Ticket, TicketId, TicketStatus},
    serde::{Serialize, Serializer},
    serde_json::json,
    tokio::sync::broadcast,
    tracing::debug,
};

pub const TICKET_EVENT: &str = "ticket";
pub const MESSAGE_EVENT: &str = "appMessage";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyAction {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Everyone viewing tickets in this status.
    Status(TicketStatus),
    /// The global notification feed.
    Notification,
    /// Everyone viewing this one ticket.
    Ticket(TicketId),
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(status) => f.write_str(status.as_str()),
            Self::Notification => f.write_str("notification"),
            Self::Ticket(id) => write!(f, "{id}"),
        }
    }
}

impl Serialize for Topic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub event: &'static str,
    pub action: NotifyAction,
    pub topics: Vec<Topic>,
    pub payload: serde_json::Value,
}

impl Notification {
    #[must_use]
    pub fn is_for(&self, topic: Topic) -> bool {
        self.topics.contains(&topic)
    }
}

/// Broadcast hub. Cloning shares the channel.
#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn publish(&self, notification: Notification) {
        debug!(
            event = notification.event,
            action = ?notification.action,
            topics = ?notification.topics,
            "publishing notification"
        );
        // No subscribers is fine.
        let _ = self.tx.send(notification);
    }

    /// Drop the ticket from the view of its previous status.
    pub fn ticket_removed(&self, from: TicketStatus, ticket_id: TicketId) {
        self.publish(Notification {
            event: TICKET_EVENT,
            action: NotifyAction::Delete,
            topics: vec![Topic::Status(from)],
            payload: json!({ "action": "delete", "ticketId": ticket_id }),
        });
    }

    /// Upsert the ticket into the given views.
    pub fn ticket_changed(&self, action: NotifyAction, ticket: &Ticket, topics: Vec<Topic>) {
        self.publish(Notification {
            event: TICKET_EVENT,
            action,
            topics,
            payload: json!({ "action": action, "ticket": ticket, "ticketId": ticket.id }),
        });
    }

    /// Upsert into the new status view, the notification feed and the ticket itself.
    pub fn ticket_updated(&self, ticket: &Ticket) {
        self.ticket_changed(NotifyAction::Update, ticket, vec![
            Topic::Status(ticket.status),
            Topic::Notification,
            Topic::Ticket(ticket.id),
        ]);
    }

    pub fn message_created(&self, message: &Message, ticket: &Ticket) {
        self.publish(Notification {
            event: MESSAGE_EVENT,
            action: NotifyAction::Create,
            topics: vec![
                Topic::Ticket(ticket.id),
                Topic::Status(ticket.status),
                Topic::Notification,
            ],
            payload: json!({ "action": "create", "message": message, "ticket": ticket }),
        });
    }

    pub fn message_updated(&self, message: &Message) {
        self.publish(Notification {
            event: MESSAGE_EVENT,
            action: NotifyAction::Update,
            topics: vec![Topic::Ticket(message.ticket_id)],
            payload: json!({ "action": "update", "message": message }),
        });
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_each_publish_once() {
        let notifier = Notifier::default();
        let mut rx = notifier.subscribe();

        notifier.ticket_removed(TicketStatus::Open, 7);
        let n = rx.recv().await.unwrap();
        assert_eq!(n.action, NotifyAction::Delete);
        assert!(n.is_for(Topic::Status(TicketStatus::Open)));
        assert_eq!(n.payload["ticketId"], 7);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn topics_serialize_as_room_names() {
        let topics = vec![
            Topic::Status(TicketStatus::Closed),
            Topic::Notification,
            Topic::Ticket(42),
        ];
        assert_eq!(
            serde_json::to_value(&topics).unwrap(),
            json!(["closed", "notification", "42"])
        );
    }

    #[test]
    fn publishing_without_subscribers_is_harmless() {
        Notifier::new(4).ticket_removed(TicketStatus::Pending, 1);
    }
}
