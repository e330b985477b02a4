//! Ordered, best-effort delivery of a reply as one or more messages.

use crate::ReplyTarget;
use crate::messaging::{Transport, split_message};

/// What happened to each chunk of a delivered reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
}

/// Split `text` and send the chunks in order.
///
/// The first chunk replies to `target`; the rest are posted to the channel.
/// A failed chunk is logged and does not stop later chunks. Blank chunks are
/// skipped.
pub async fn deliver_reply(
    transport: &dyn Transport,
    target: &ReplyTarget,
    text: &str,
    max_len: usize,
) -> DeliveryReport {
    let mut report = DeliveryReport::default();
    let chunks = split_message(text, max_len);
    let total = chunks.len();

    for (index, chunk) in chunks.iter().enumerate() {
        if chunk.is_empty() {
            continue;
        }

        let chunk_target = if report.sent + report.failed == 0 {
            target.clone()
        } else {
            ReplyTarget::channel(target.channel_id.clone())
        };

        match transport.send_text(&chunk_target, chunk).await {
            Ok(_) => report.sent += 1,
            Err(error) => {
                report.failed += 1;
                tracing::warn!(
                    %error,
                    channel_id = %target.channel_id,
                    chunk = %format!("{}/{total}", index + 1),
                    "failed to send reply chunk"
                );
            }
        }
    }

    if report.sent + report.failed == 0 {
        tracing::warn!(channel_id = %target.channel_id, "reply was blank, nothing sent");
    }

    report
}
