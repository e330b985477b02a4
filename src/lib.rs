//! Seinfeld: a single-persona conversational relay between a chat channel and a
//! generative-text backend, with on-demand image generation.

pub mod agent;
pub mod commands;
pub mod config;
pub mod conversation;
pub mod error;
pub mod imaging;
pub mod llm;
pub mod messaging;
pub mod prompts;
#[cfg(test)]
pub(crate) mod test_support;

pub use agent::Relay;
pub use error::{Error, Result};

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Channel identifier type.
pub type ChannelId = Arc<str>;

/// Platform message identifier type.
pub type MessageId = String;

/// One inbound chat message. Lives for a single turn and is never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub author_id: String,
    pub author_is_bot: bool,
    pub content: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Resolved by the transport before dispatch. Only commands look at this.
    #[serde(default)]
    pub capabilities: Capabilities,
}

impl InboundMessage {
    /// Where replies to this message should go.
    pub fn reply_target(&self) -> ReplyTarget {
        ReplyTarget {
            channel_id: self.channel_id.clone(),
            reply_to: Some(self.id.clone()),
        }
    }
}

/// A message from the channel transcript, as returned by the transport's history query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranscriptMessage {
    pub id: MessageId,
    pub author_id: String,
    pub author_is_bot: bool,
    pub content: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Destination of an outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyTarget {
    pub channel_id: ChannelId,
    /// Message to reference as a reply. `None` posts a plain channel message.
    pub reply_to: Option<MessageId>,
}

impl ReplyTarget {
    pub fn channel(channel_id: ChannelId) -> Self {
        Self {
            channel_id,
            reply_to: None,
        }
    }
}

/// Authorization predicates held by a message author in the channel.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Capabilities {
    /// May delete other users' messages.
    pub moderate: bool,
    /// Full administrator. Implies `moderate`.
    pub administer: bool,
}

impl Capabilities {
    pub fn can_moderate(&self) -> bool {
        self.moderate || self.administer
    }

    pub fn can_administer(&self) -> bool {
        self.administer
    }
}

/// Named capability, used in denial messages and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Moderate,
    Administer,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::Moderate => write!(f, "manage messages"),
            Capability::Administer => write!(f, "administrator"),
        }
    }
}
