//! Outbound side of the channel gateway.
//!
//! Automation never talks to the messaging provider directly; it sends text,
//! media and choosers through [`ChannelOutbound`]. The gateway binary writes
//! those commands as JSON lines, tests capture them with [`RecordingOutbound`].

pub mod chooser;
pub mod error;
pub mod jsonl;
pub mod outbound;
pub mod recording;

pub use {
    chooser::{Chooser, ChooserEntry, ChooserSpec, render_chooser},
    error::{Error, Result},
    jsonl::{JsonLinesOutbound, OutboundFrame},
    outbound::{ChannelOutbound, OutboundContent, Recipient, SentMessage},
    recording::{RecordingOutbound, SentRecord},
};
