use {
    async_trait::async_trait,
    helpline_common::types::{ConnectionId, MediaRef},
    serde::{Deserialize, Serialize},
};

use crate::{Result, chooser::Chooser};

/// Who an outbound command is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub connection_id: ConnectionId,
    /// Contact external id on the provider.
    pub address: String,
    pub is_group: bool,
}

/// Gateway receipt for a send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Provider message id; the echo of this id is recognized as already stored.
    pub external_id: String,
}

/// Payload of one outbound command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutboundContent {
    Text {
        body: String,
    },
    Media {
        media: MediaRef,
        #[serde(skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    Chooser {
        chooser: Chooser,
    },
}

impl OutboundContent {
    /// Text recorded in the message log for this send.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::Text { body } => body.clone(),
            Self::Media { media, caption } => caption
                .clone()
                .or_else(|| media.file_name.clone())
                .unwrap_or_else(|| media.reference.clone()),
            Self::Chooser { chooser } => chooser.summary(),
        }
    }
}

/// Send messages through the channel gateway.
#[async_trait]
pub trait ChannelOutbound: Send + Sync {
    async fn send_text(&self, to: &Recipient, text: &str) -> Result<SentMessage>;

    async fn send_media(
        &self,
        to: &Recipient,
        media: &MediaRef,
        caption: Option<&str>,
    ) -> Result<SentMessage>;

    async fn send_chooser(&self, to: &Recipient, chooser: &Chooser) -> Result<SentMessage>;

    /// Dispatch any [`OutboundContent`] to the matching send method.
    async fn send(&self, to: &Recipient, content: &OutboundContent) -> Result<SentMessage> {
        match content {
            OutboundContent::Text { body } => self.send_text(to, body).await,
            OutboundContent::Media { media, caption } => {
                self.send_media(to, media, caption.as_deref()).await
            },
            OutboundContent::Chooser { chooser } => self.send_chooser(to, chooser).await,
        }
    }
}
