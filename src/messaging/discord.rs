//! Discord messaging adapter using serenity.

use crate::agent::{Intent, Relay, classify};
use crate::commands::Command;
use crate::error::TransportError;
use crate::messaging::traits::Transport;
use crate::{Capabilities, ChannelId, InboundMessage, MessageId, ReplyTarget, TranscriptMessage};

use anyhow::Context as _;
use serenity::all::{
    ChannelId as DiscordChannelId, Context, CreateAttachment, CreateMessage, EventHandler,
    GatewayIntents, GetMessages, Http, Message, MessageId as DiscordMessageId, Permissions, Ready,
};

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

/// Discord caps history fetches and bulk deletes at 100 messages per request.
const MAX_BATCH: usize = 100;

/// Gateway event handler. Each message event is handed to the relay with a
/// transport bound to the event's HTTP client.
pub struct DiscordAdapter {
    relay: Arc<Relay>,
}

impl DiscordAdapter {
    pub fn new(relay: Arc<Relay>) -> Self {
        Self { relay }
    }

    /// Connect to the gateway and process events until the client stops.
    pub async fn run(self, token: &str) -> crate::Result<()> {
        let intents = GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT;

        let mut client = serenity::Client::builder(token, intents)
            .event_handler(self)
            .await
            .context("failed to build discord client")?;

        let shard_manager = client.shard_manager.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown signal received, closing discord shards");
                shard_manager.shutdown_all().await;
            }
        });

        client
            .start()
            .await
            .context("discord client stopped with an error")?;

        Ok(())
    }
}

#[serenity::async_trait]
impl EventHandler for DiscordAdapter {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        tracing::info!(
            user = %ready.user.name,
            channels = ?self.relay.channels().all(),
            "discord connected"
        );
    }

    async fn message(&self, ctx: Context, message: Message) {
        let bot_user_id = ctx.cache.current_user().id;
        if message.author.id == bot_user_id {
            return;
        }

        let mut inbound = to_inbound(&message);
        if !self.relay.accepts(&inbound) {
            return;
        }

        let intent = classify(&inbound.content, self.relay.command_prefix());
        if intent == Intent::Ignore {
            return;
        }

        if matches!(intent, Intent::Command(_)) {
            inbound.capabilities = author_capabilities(&ctx, &message).await;
        }

        let typing = shows_typing(&intent).then(|| message.channel_id.start_typing(&ctx.http));
        let transport = DiscordTransport::new(ctx.http.clone(), bot_user_id.to_string());
        self.relay.handle_message(&transport, inbound).await;
        if let Some(typing) = typing {
            typing.stop();
        }
    }
}

/// Only requests that wait on the generative backend show a typing indicator.
fn shows_typing(intent: &Intent) -> bool {
    matches!(
        intent,
        Intent::Conversation(_) | Intent::Image(_) | Intent::Command(Command::Image { .. })
    )
}

fn to_inbound(message: &Message) -> InboundMessage {
    InboundMessage {
        id: message.id.to_string(),
        channel_id: ChannelId::from(message.channel_id.to_string()),
        author_id: message.author.id.to_string(),
        author_is_bot: message.author.bot,
        content: message.content.clone(),
        timestamp: to_utc(message),
        capabilities: Capabilities::default(),
    }
}

fn to_transcript(message: &Message) -> TranscriptMessage {
    TranscriptMessage {
        id: message.id.to_string(),
        author_id: message.author.id.to_string(),
        author_is_bot: message.author.bot,
        content: message.content.clone(),
        timestamp: to_utc(message),
    }
}

fn to_utc(message: &Message) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::from_timestamp(message.timestamp.unix_timestamp(), 0)
        .unwrap_or_else(chrono::Utc::now)
}

/// Resolve the author's moderation and administrator permissions in the
/// message's channel. Anything unresolvable counts as no capability.
async fn author_capabilities(ctx: &Context, message: &Message) -> Capabilities {
    let Some(guild_id) = message.guild_id else {
        return Capabilities::default();
    };

    let member = match message.member(ctx).await {
        Ok(member) => member,
        Err(error) => {
            tracing::warn!(%error, author_id = %message.author.id, "failed to resolve guild member");
            return Capabilities::default();
        }
    };

    let permissions = {
        let Some(guild) = ctx.cache.guild(guild_id) else {
            return Capabilities::default();
        };
        match guild.channels.get(&message.channel_id) {
            Some(channel) => guild.user_permissions_in(channel, &member),
            None => Permissions::empty(),
        }
    };

    Capabilities {
        moderate: permissions.contains(Permissions::MANAGE_MESSAGES),
        administer: permissions.contains(Permissions::ADMINISTRATOR),
    }
}

/// [`Transport`] over Discord's HTTP API.
pub struct DiscordTransport {
    http: Arc<Http>,
    bot_user_id: String,
}

impl DiscordTransport {
    pub fn new(http: Arc<Http>, bot_user_id: String) -> Self {
        Self { http, bot_user_id }
    }
}

fn parse_channel_id(channel_id: &str) -> Result<DiscordChannelId, TransportError> {
    channel_id
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .map(DiscordChannelId::new)
        .ok_or_else(|| TransportError::InvalidChannel(channel_id.to_string()))
}

fn parse_message_id(message_id: &str) -> Option<DiscordMessageId> {
    message_id
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .map(DiscordMessageId::new)
}

fn with_reply(
    builder: CreateMessage,
    channel: DiscordChannelId,
    target: &ReplyTarget,
) -> CreateMessage {
    match target.reply_to.as_deref().and_then(parse_message_id) {
        Some(message_id) => builder.reference_message((channel, message_id)),
        None => builder,
    }
}

#[async_trait::async_trait]
impl Transport for DiscordTransport {
    fn bot_user_id(&self) -> &str {
        &self.bot_user_id
    }

    async fn recent_messages(
        &self,
        channel_id: &ChannelId,
        before: Option<&MessageId>,
        limit: usize,
    ) -> Result<Vec<TranscriptMessage>, TransportError> {
        let channel = parse_channel_id(channel_id)?;

        let mut request = GetMessages::new().limit(limit.clamp(1, MAX_BATCH) as u8);
        if let Some(before) = before.and_then(|id| parse_message_id(id)) {
            request = request.before(before);
        }

        let messages = channel
            .messages(&self.http, request)
            .await
            .map_err(|error| TransportError::Fetch {
                channel_id: channel_id.to_string(),
                reason: error.to_string(),
            })?;

        // Discord returns newest first.
        Ok(messages.iter().rev().map(to_transcript).collect())
    }

    async fn send_text(
        &self,
        target: &ReplyTarget,
        text: &str,
    ) -> Result<MessageId, TransportError> {
        let channel = parse_channel_id(&target.channel_id)?;
        let builder = with_reply(CreateMessage::new().content(text), channel, target);

        let sent = channel
            .send_message(&self.http, builder)
            .await
            .map_err(|error| TransportError::Send {
                channel_id: target.channel_id.to_string(),
                reason: error.to_string(),
            })?;

        Ok(sent.id.to_string())
    }

    async fn send_file(
        &self,
        target: &ReplyTarget,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<MessageId, TransportError> {
        let channel = parse_channel_id(&target.channel_id)?;
        let send_error = |reason: String| TransportError::Send {
            channel_id: target.channel_id.to_string(),
            reason,
        };

        let attachment = CreateAttachment::path(path)
            .await
            .map_err(|error| send_error(format!("failed to read {}: {error}", path.display())))?;

        let mut builder = CreateMessage::new().add_file(attachment);
        if let Some(caption) = caption {
            builder = builder.content(caption);
        }
        let builder = with_reply(builder, channel, target);

        let sent = channel
            .send_message(&self.http, builder)
            .await
            .map_err(|error| send_error(error.to_string()))?;

        Ok(sent.id.to_string())
    }

    async fn bulk_delete(
        &self,
        channel_id: &ChannelId,
        limit: usize,
    ) -> Result<usize, TransportError> {
        let channel = parse_channel_id(channel_id)?;
        delete_in_batches(limit, |batch| self.delete_batch(channel, channel_id, batch)).await
    }
}

impl DiscordTransport {
    /// Delete up to `batch` of the newest messages. Returns how many were deleted.
    async fn delete_batch(
        &self,
        channel: DiscordChannelId,
        channel_id: &ChannelId,
        batch: usize,
    ) -> Result<usize, TransportError> {
        let delete_error = |reason: String| TransportError::Delete {
            channel_id: channel_id.to_string(),
            reason,
        };

        let messages = channel
            .messages(&self.http, GetMessages::new().limit(batch as u8))
            .await
            .map_err(|error| delete_error(error.to_string()))?;

        let ids: Vec<DiscordMessageId> = messages.iter().map(|message| message.id).collect();
        match ids.as_slice() {
            [] => {}
            [single] => channel
                .delete_message(&self.http, *single)
                .await
                .map_err(|error| delete_error(error.to_string()))?,
            _ => channel
                .delete_messages(&self.http, ids.iter())
                .await
                .map_err(|error| delete_error(error.to_string()))?,
        }

        Ok(ids.len())
    }
}

/// Run `delete_batch` until `limit` messages are gone or the channel runs dry.
///
/// A failure after some messages were already deleted ends the run with the
/// partial count, so the caller can still report what happened.
async fn delete_in_batches<F, Fut>(limit: usize, mut delete_batch: F) -> Result<usize, TransportError>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<usize, TransportError>>,
{
    let mut deleted = 0;
    while deleted < limit {
        let batch = (limit - deleted).min(MAX_BATCH);
        let count = match delete_batch(batch).await {
            Ok(count) => count,
            Err(error) if deleted > 0 => {
                tracing::warn!(%error, deleted, requested = limit, "bulk delete stopped early");
                break;
            }
            Err(error) => return Err(error),
        };

        deleted += count;
        if count < batch {
            break;
        }
    }

    Ok(deleted)
}
