use {
    async_trait::async_trait,
    helpline_common::types::MediaRef,
    serde::{Deserialize, Serialize},
    tokio::{
        io::{AsyncWrite, AsyncWriteExt},
        sync::Mutex,
    },
    tracing::debug,
};

use crate::{
    Result,
    chooser::Chooser,
    outbound::{ChannelOutbound, OutboundContent, Recipient, SentMessage},
};

/// One line of the outbound stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    Send {
        id: String,
        to: Recipient,
        content: OutboundContent,
    },
    Notification {
        payload: serde_json::Value,
    },
}

/// Writes outbound commands as newline-delimited JSON for the gateway to pick up.
pub struct JsonLinesOutbound<W> {
    writer: Mutex<W>,
}

impl<W: AsyncWrite + Send + Unpin> JsonLinesOutbound<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub async fn write_frame(&self, frame: &OutboundFrame) -> Result<()> {
        let mut line = serde_json::to_vec(frame)?;
        line.push(b'\n');
        let mut writer = self.writer.lock().await;
        writer.write_all(&line).await?;
        writer.flush().await?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    async fn send_content(&self, to: &Recipient, content: OutboundContent) -> Result<SentMessage> {
        let id = uuid::Uuid::new_v4().to_string();
        debug!(external_id = %id, address = %to.address, "writing outbound frame");
        self.write_frame(&OutboundFrame::Send {
            id: id.clone(),
            to: to.clone(),
            content,
        })
        .await?;
        Ok(SentMessage { external_id: id })
    }
}

#[async_trait]
impl<W: AsyncWrite + Send + Unpin> ChannelOutbound for JsonLinesOutbound<W> {
    async fn send_text(&self, to: &Recipient, text: &str) -> Result<SentMessage> {
        self.send_content(to, OutboundContent::Text { body: text.into() })
            .await
    }

    async fn send_media(
        &self,
        to: &Recipient,
        media: &MediaRef,
        caption: Option<&str>,
    ) -> Result<SentMessage> {
        self.send_content(to, OutboundContent::Media {
            media: media.clone(),
            caption: caption.map(Into::into),
        })
        .await
    }

    async fn send_chooser(&self, to: &Recipient, chooser: &Chooser) -> Result<SentMessage> {
        self.send_content(to, OutboundContent::Chooser {
            chooser: chooser.clone(),
        })
        .await
    }
}
