//! Transport trait implemented by chat adapters.

use crate::error::TransportError;
use crate::{ChannelId, MessageId, ReplyTarget, TranscriptMessage};

use std::path::Path;

/// Outbound and history operations a chat platform must provide.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Identity of the bot account on this platform.
    fn bot_user_id(&self) -> &str;

    /// Up to `limit` messages posted before `before` (or the latest ones when
    /// `None`), ordered oldest first.
    async fn recent_messages(
        &self,
        channel_id: &ChannelId,
        before: Option<&MessageId>,
        limit: usize,
    ) -> Result<Vec<TranscriptMessage>, TransportError>;

    /// Post a text message.
    async fn send_text(&self, target: &ReplyTarget, text: &str)
    -> Result<MessageId, TransportError>;

    /// Post a file, with an optional caption.
    async fn send_file(
        &self,
        target: &ReplyTarget,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<MessageId, TransportError>;

    /// Delete up to `limit` of the most recent messages. Returns how many were deleted.
    async fn bulk_delete(&self, channel_id: &ChannelId, limit: usize)
    -> Result<usize, TransportError>;
}
