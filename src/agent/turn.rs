//! Per-message handler: classifies an inbound message and runs the matching
//! pipeline (conversation turn, image request or command) to completion.

use crate::agent::delivery::deliver_reply;
use crate::commands::{self, Command};
use crate::config::{ChannelConfig, RuntimeConfig, TurnConfig};
use crate::conversation::assemble_history;
use crate::imaging::{ImageOutcome, ImagePipeline};
use crate::llm::{GenerationRequest, TextBackend, Tool, generate_reply};
use crate::messaging::Transport;
use crate::{InboundMessage, ReplyTarget};

use std::sync::Arc;

/// Sent when text generation fails.
pub const APOLOGY: &str =
    "Sorry, I'm drawing a blank here. What's the deal with that? Try me again in a bit.";

/// Caption for the fallback image.
pub const FALLBACK_CAPTION: &str = "I couldn't make that image. So... here's this instead.";

/// In-channel phrases that turn a message into an image request.
const IMAGE_TRIGGERS: &[&str] = &["generate image:", "create image:"];

/// What an inbound message asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Command(Command),
    Image(String),
    Conversation(String),
    Ignore,
}

/// Decide what to do with a message's text.
///
/// Prefixed messages are commands and never reach the conversation, even when
/// the command is unknown.
pub fn classify(content: &str, command_prefix: char) -> Intent {
    let content = content.trim();
    if content.is_empty() {
        return Intent::Ignore;
    }

    if let Some(rest) = content.strip_prefix(command_prefix) {
        return match Command::parse(rest, command_prefix) {
            Some(command) => Intent::Command(command),
            None => Intent::Ignore,
        };
    }

    for trigger in IMAGE_TRIGGERS {
        let matches = content
            .get(..trigger.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(trigger));
        if matches {
            let prompt = content[trigger.len()..].trim();
            if prompt.is_empty() {
                return Intent::Command(Command::Invalid {
                    usage: format!("Usage: `{trigger} <prompt>`"),
                });
            }
            return Intent::Image(prompt.to_string());
        }
    }

    Intent::Conversation(content.to_string())
}

/// Everything a turn needs, shared across all events.
#[derive(Clone)]
pub struct Relay {
    runtime: Arc<RuntimeConfig>,
    text_backend: Arc<dyn TextBackend>,
    images: ImagePipeline,
    persona: Arc<str>,
    channels: ChannelConfig,
    turn: TurnConfig,
}

impl Relay {
    pub fn new(
        runtime: Arc<RuntimeConfig>,
        text_backend: Arc<dyn TextBackend>,
        images: ImagePipeline,
        persona: impl Into<Arc<str>>,
        channels: ChannelConfig,
        turn: TurnConfig,
    ) -> Self {
        Self {
            runtime,
            text_backend,
            images,
            persona: persona.into(),
            channels,
            turn,
        }
    }

    pub fn channels(&self) -> &ChannelConfig {
        &self.channels
    }

    pub fn command_prefix(&self) -> char {
        self.turn.command_prefix
    }

    /// Whether a message should be handled at all.
    pub fn accepts(&self, message: &InboundMessage) -> bool {
        !message.author_is_bot && self.channels.contains(&message.channel_id)
    }

    /// Handle one inbound message end to end. Never fails: every error is
    /// turned into a user-facing reply and logged.
    #[tracing::instrument(skip_all, fields(channel_id = %message.channel_id, message_id = %message.id))]
    pub async fn handle_message(&self, transport: &dyn Transport, message: InboundMessage) {
        if !self.accepts(&message) {
            return;
        }

        match classify(&message.content, self.turn.command_prefix) {
            Intent::Ignore => {}
            Intent::Conversation(query) => self.run_text_turn(transport, &message, query).await,
            Intent::Image(prompt) => self.run_image_request(transport, &message, &prompt).await,
            Intent::Command(command) => self.run_command(transport, &message, command).await,
        }
    }

    async fn run_text_turn(&self, transport: &dyn Transport, message: &InboundMessage, query: String) {
        let models = self.runtime.models();

        let transcript = match transport
            .recent_messages(&message.channel_id, Some(&message.id), self.turn.history_limit)
            .await
        {
            Ok(transcript) => transcript,
            Err(error) => {
                tracing::warn!(%error, "failed to fetch channel history, continuing without it");
                Vec::new()
            }
        };
        let history = assemble_history(&transcript, transport.bot_user_id());

        let tools = if self.turn.search_grounding {
            vec![Tool::GoogleSearch]
        } else {
            Vec::new()
        };

        let request = GenerationRequest {
            model_id: models.chat_model_id.clone(),
            history,
            system_instruction: self.persona.clone(),
            tools,
            query,
        };

        let reply = match generate_reply(self.text_backend.as_ref(), request).await {
            Ok(text) => text,
            Err(error) => {
                tracing::error!(%error, kind = %error.kind(), "text generation failed");
                APOLOGY.to_string()
            }
        };

        let report = deliver_reply(
            transport,
            &message.reply_target(),
            &reply,
            self.turn.max_message_length,
        )
        .await;
        tracing::debug!(sent = report.sent, failed = report.failed, "turn complete");
    }

    async fn run_image_request(
        &self,
        transport: &dyn Transport,
        message: &InboundMessage,
        prompt: &str,
    ) {
        let models = self.runtime.models();
        let outcome = self
            .images
            .generate_or_fallback(&models.image_model_id, prompt)
            .await;

        let caption = match &outcome {
            ImageOutcome::Generated(_) => {
                truncate_chars(&format!("Here's \"{prompt}\""), self.turn.max_message_length)
            }
            ImageOutcome::Fallback(_) => FALLBACK_CAPTION.to_string(),
        };

        if let Err(error) = transport
            .send_file(&message.reply_target(), outcome.path(), Some(&caption))
            .await
        {
            tracing::warn!(
                %error,
                path = %outcome.path().display(),
                fallback = outcome.is_fallback(),
                "failed to send image"
            );
        }
    }

    async fn run_command(&self, transport: &dyn Transport, message: &InboundMessage, command: Command) {
        let (name, result, target) = match command {
            Command::Image { prompt } => {
                self.run_image_request(transport, message, &prompt).await;
                return;
            }
            Command::Invalid { usage } => ("usage", Ok(usage), message.reply_target()),
            Command::Clear { limit } => (
                "clear",
                commands::clear(transport, message, limit).await,
                // The triggering message is usually among the deleted ones.
                ReplyTarget::channel(message.channel_id.clone()),
            ),
            Command::Model { model_id } => (
                "model",
                commands::set_model(&self.runtime, message, model_id.as_deref()),
                message.reply_target(),
            ),
        };

        let reply = match result {
            Ok(reply) => reply,
            Err(error) => commands::failure_reply(name, &error),
        };

        if let Err(error) = transport.send_text(&target, &reply).await {
            tracing::warn!(%error, command = name, "failed to send command reply");
        }
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}
