//! Domain types shared by every helpline crate.
//!
//! Identifiers are plain `i64` row ids. Timestamps are epoch milliseconds.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

pub type ContactId = i64;
pub type TicketId = i64;
pub type QueueId = i64;
pub type OptionId = i64;
pub type ConnectionId = i64;
pub type UserId = i64;
pub type MessageId = i64;
pub type RatingId = i64;

/// Sender address used by the channel for status broadcasts. Never a conversation.
pub const STATUS_BROADCAST: &str = "status@broadcast";

/// Current wall-clock time in epoch milliseconds.
#[must_use]
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// ── Contacts ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub external_id: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub is_group: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Identity of a sender as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderIdentity {
    pub external_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub is_group: bool,
}

impl SenderIdentity {
    /// Display name, falling back to the external id.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.external_id)
    }
}

// ── Tickets ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Pending,
    Open,
    Closed,
}

impl TicketStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            other => Err(Error::unknown_value("ticket status", other)),
        }
    }
}

/// Where a ticket currently sits in its queue's option tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "at", content = "option", rename_all = "snake_case")]
pub enum MenuPosition {
    #[default]
    Root,
    Node(OptionId),
}

impl MenuPosition {
    /// Persisted form: the current option id, `None` at the root.
    #[must_use]
    pub fn option_id(self) -> Option<OptionId> {
        match self {
            Self::Root => None,
            Self::Node(id) => Some(id),
        }
    }

    #[must_use]
    pub fn from_option_id(id: Option<OptionId>) -> Self {
        id.map_or(Self::Root, Self::Node)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub uuid: String,
    pub contact_id: ContactId,
    pub connection_id: ConnectionId,
    pub status: TicketStatus,
    pub queue_id: Option<QueueId>,
    pub user_id: Option<UserId>,
    pub chatbot: bool,
    pub menu: MenuPosition,
    pub last_message: Option<String>,
    pub unread_messages: u32,
    pub is_group: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Ticket {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status != TicketStatus::Closed
    }
}

/// Values for a ticket about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicket {
    pub contact_id: ContactId,
    pub connection_id: ConnectionId,
    pub status: TicketStatus,
    pub is_group: bool,
    pub unread_messages: u32,
}

// ── Catalog: connections, queues, options ───────────────────────────────────

/// How a list of choices is presented to the contact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChooserMode {
    #[default]
    #[serde(alias = "OPTION_BUTTON")]
    Buttons,
    #[serde(alias = "OPTION_LIST")]
    List,
}

impl ChooserMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buttons => "buttons",
            Self::List => "list",
        }
    }
}

impl fmt::Display for ChooserMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChooserMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "buttons" | "button" | "OPTION_BUTTON" => Ok(Self::Buttons),
            "list" | "OPTION_LIST" => Ok(Self::List),
            other => Err(Error::unknown_value("chooser mode", other)),
        }
    }
}

/// Stored media attached to a queue, an option, or a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    /// Stable reference returned by the media store.
    pub reference: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// A channel connection (one account on the messaging provider).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub name: String,
    pub greeting: Option<String>,
    pub farewell: Option<String>,
    pub rating_prompt: Option<String>,
    pub out_of_hours: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Queue {
    pub id: QueueId,
    pub name: String,
    pub color: String,
    pub greeting: Option<String>,
    pub chooser: ChooserMode,
    pub media: Option<MediaRef>,
}

/// One node of a queue's option tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueOption {
    pub id: OptionId,
    pub queue_id: QueueId,
    pub parent_id: Option<OptionId>,
    /// Position among siblings, matched against typed replies ("1", "2", ...).
    pub ordinal: String,
    pub title: String,
    pub message: Option<String>,
    /// Display mode for this node's children.
    pub chooser: ChooserMode,
    pub media: Option<MediaRef>,
    pub finalize: bool,
}

/// One business-hours window, persisted under the `schedules` setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    /// Lowercase English weekday name, e.g. `monday`.
    #[serde(alias = "weekday_en")]
    pub weekday_en: String,
    #[serde(alias = "start_time")]
    pub start_time: String,
    #[serde(alias = "end_time")]
    pub end_time: String,
}

impl ScheduleEntry {
    /// Start and end as minutes since midnight. `24:00` is accepted as an end.
    /// `None` when either side is blank or not `HH:MM`.
    #[must_use]
    pub fn window_minutes(&self) -> Option<(u32, u32)> {
        let start = clock_minutes(&self.start_time, false)?;
        let end = clock_minutes(&self.end_time, true)?;
        Some((start, end))
    }
}

fn clock_minutes(raw: &str, allow_end_of_day: bool) -> Option<u32> {
    use chrono::Timelike;

    let raw = raw.trim();
    if allow_end_of_day && raw == "24:00" {
        return Some(24 * 60);
    }
    let time = chrono::NaiveTime::parse_from_str(raw, "%H:%M").ok()?;
    Some(time.hour() * 60 + time.minute())
}

/// Well-known setting keys.
pub mod setting_keys {
    pub const SCHEDULES: &str = "schedules";
    pub const QUEUES_OPTION_TYPE: &str = "queuesOptionType";
}

/// A connection together with the ordered ids of the queues it serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionEntry {
    pub connection: Connection,
    pub queue_ids: Vec<QueueId>,
}

/// Everything an administrator configures: connections, queues, option forest, settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub connections: Vec<ConnectionEntry>,
    pub queues: Vec<Queue>,
    pub options: Vec<QueueOption>,
    pub settings: Vec<(String, String)>,
}

// ── Messages ────────────────────────────────────────────────────────────────

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageOrigin {
    /// Written by the contact.
    Contact,
    /// Written by a human on the connection's own account.
    Agent,
    /// Sent by this system's automation.
    System,
}

impl MessageOrigin {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Contact => "contact",
            Self::Agent => "agent",
            Self::System => "system",
        }
    }
}

impl FromStr for MessageOrigin {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "contact" => Ok(Self::Contact),
            "agent" => Ok(Self::Agent),
            "system" => Ok(Self::System),
            other => Err(Error::unknown_value("message origin", other)),
        }
    }
}

/// Delivery acknowledgement levels, ordered.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AckState {
    Error,
    #[default]
    Pending,
    Server,
    Device,
    Read,
    Played,
}

impl AckState {
    #[must_use]
    pub fn level(self) -> i64 {
        match self {
            Self::Error => -1,
            Self::Pending => 0,
            Self::Server => 1,
            Self::Device => 2,
            Self::Read => 3,
            Self::Played => 4,
        }
    }

    #[must_use]
    pub fn from_level(level: i64) -> Self {
        match level {
            i64::MIN..=-1 => Self::Error,
            0 => Self::Pending,
            1 => Self::Server,
            2 => Self::Device,
            3 => Self::Read,
            _ => Self::Played,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub external_id: String,
    pub ticket_id: TicketId,
    pub contact_id: Option<ContactId>,
    pub body: String,
    pub origin: MessageOrigin,
    pub read: bool,
    pub ack: AckState,
    pub media_ref: Option<String>,
    pub media_type: Option<String>,
    pub quoted_message_id: Option<MessageId>,
    pub created_at: i64,
}

/// Values for a message about to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub external_id: String,
    pub ticket_id: TicketId,
    pub contact_id: Option<ContactId>,
    pub body: String,
    pub origin: MessageOrigin,
    pub read: bool,
    pub ack: AckState,
    pub media_ref: Option<String>,
    pub media_type: Option<String>,
    pub quoted_message_id: Option<MessageId>,
}

// ── Ratings ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRating {
    pub id: RatingId,
    pub ticket_id: TicketId,
    pub user_id: Option<UserId>,
    /// `None` while the rating is pending.
    pub score: Option<u8>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl UserRating {
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.score.is_none()
    }
}

// ── Gateway events ──────────────────────────────────────────────────────────

/// Message kinds reported by the gateway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    #[default]
    Chat,
    ButtonsResponse,
    ListResponse,
    Audio,
    Ptt,
    Video,
    Image,
    Document,
    Vcard,
    Sticker,
    Location,
    #[serde(other)]
    Unsupported,
}

impl MessageKind {
    #[must_use]
    pub fn is_supported(self) -> bool {
        !matches!(self, Self::Unsupported)
    }

    #[must_use]
    pub fn is_media(self) -> bool {
        matches!(
            self,
            Self::Audio | Self::Ptt | Self::Video | Self::Image | Self::Document | Self::Sticker
        )
    }
}

/// Raw media bytes delivered with an inbound event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaPayload {
    pub mime_type: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

/// One message event from the channel gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
    pub external_message_id: String,
    pub connection_id: ConnectionId,
    #[serde(default)]
    pub from_me: bool,
    pub sender: SenderIdentity,
    #[serde(default)]
    pub kind: MessageKind,
    #[serde(default)]
    pub body: String,
    /// Button id or list-row id when the contact answered a chooser.
    #[serde(default)]
    pub selection: Option<String>,
    #[serde(default)]
    pub media: Option<MediaPayload>,
    #[serde(default)]
    pub quoted_external_id: Option<String>,
    /// Set by gateways that can tell this system's own sends apart.
    #[serde(default)]
    pub origin: Option<MessageOrigin>,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default)]
    pub timestamp: i64,
}

impl InboundEvent {
    /// The menu token: an explicit selection, else the trimmed typed body.
    #[must_use]
    pub fn menu_token(&self) -> &str {
        self.selection
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| self.body.trim())
    }
}

/// Delivery acknowledgement for a previously sent or received message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckEvent {
    pub external_message_id: String,
    pub ack: AckState,
}

/// One line of the gateway's inbound stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayFrame {
    Message(InboundEvent),
    Ack(AckEvent),
}

mod base64_bytes {
    use {
        base64::{Engine, engine::general_purpose::STANDARD},
        serde::{Deserialize, Deserializer, Serializer, de::Error},
    };

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        STANDARD.decode(raw.as_bytes()).map_err(D::Error::custom)
    }
}
