use std::sync::{
    Mutex,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use {async_trait::async_trait, helpline_common::types::MediaRef};

use crate::{
    Error, Result,
    chooser::Chooser,
    outbound::{ChannelOutbound, OutboundContent, Recipient, SentMessage},
};

/// One captured send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentRecord {
    pub recipient: Recipient,
    pub content: OutboundContent,
    pub external_id: String,
}

/// Outbound that keeps every send in memory. Used by tests and dry runs.
#[derive(Default)]
pub struct RecordingOutbound {
    sent: Mutex<Vec<SentRecord>>,
    next_id: AtomicU64,
    failing: AtomicBool,
}

impl RecordingOutbound {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following send fail with [`Error::SendFailure`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentRecord> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Text bodies of sends, with choosers and media as their summaries.
    pub fn bodies(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .map(|r| r.content.summary())
            .collect()
    }

    pub fn choosers(&self) -> Vec<Chooser> {
        self.sent()
            .into_iter()
            .filter_map(|r| match r.content {
                OutboundContent::Chooser { chooser } => Some(chooser),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    fn record(&self, to: &Recipient, content: OutboundContent) -> Result<SentMessage> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::send_failure("recording outbound set to fail"));
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let external_id = format!("out-{n}");
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(SentRecord {
                recipient: to.clone(),
                content,
                external_id: external_id.clone(),
            });
        Ok(SentMessage { external_id })
    }
}

#[async_trait]
impl ChannelOutbound for RecordingOutbound {
    async fn send_text(&self, to: &Recipient, text: &str) -> Result<SentMessage> {
        self.record(to, OutboundContent::Text { body: text.into() })
    }

    async fn send_media(
        &self,
        to: &Recipient,
        media: &MediaRef,
        caption: Option<&str>,
    ) -> Result<SentMessage> {
        self.record(to, OutboundContent::Media {
            media: media.clone(),
            caption: caption.map(Into::into),
        })
    }

    async fn send_chooser(&self, to: &Recipient, chooser: &Chooser) -> Result<SentMessage> {
        self.record(to, OutboundContent::Chooser {
            chooser: chooser.clone(),
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn to() -> Recipient {
        Recipient {
            connection_id: 1,
            address: "5511999".into(),
            is_group: false,
        }
    }

    #[tokio::test]
    async fn records_sends_with_distinct_ids() {
        let out = RecordingOutbound::new();
        let a = out.send_text(&to(), "hello").await.unwrap();
        let b = out.send_text(&to(), "again").await.unwrap();
        assert_ne!(a.external_id, b.external_id);
        assert_eq!(out.bodies(), vec!["hello", "again"]);
    }

    #[tokio::test]
    async fn failing_mode_rejects_sends() {
        let out = RecordingOutbound::new();
        out.set_failing(true);
        let err = out.send_text(&to(), "hello").await.unwrap_err();
        assert!(matches!(err, Error::SendFailure { .. }));
        assert!(out.sent().is_empty());
    }
}
