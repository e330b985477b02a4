//! Configuration loading and validation.

use crate::ChannelId;
use crate::error::{ConfigError, Result};

use arc_swap::ArcSwap;
use serde::Deserialize;

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.5-pro-exp-03-25";
pub const DEFAULT_IMAGE_MODEL: &str = "imagen-3.0-generate-002";
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Discord messages are limited to 2000 characters.
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 2000;
pub const DEFAULT_HISTORY_LIMIT: usize = 15;

/// Seinfeld configuration, resolved once before the gateway connects.
#[derive(Debug, Clone)]
pub struct Config {
    /// Display name used in logs.
    pub bot_name: String,

    /// Discord bot token.
    pub discord_token: String,

    /// Google generative API key.
    pub google_key: String,

    /// Channels the bot listens and replies in.
    pub channels: ChannelConfig,

    /// Models in effect at startup. Changed at runtime through [`RuntimeConfig`].
    pub models: ActiveModels,

    /// Turn behavior settings.
    pub turn: TurnConfig,

    /// Where generated images are written.
    pub images_dir: PathBuf,

    /// Sent in place of a generated image when generation fails.
    pub fallback_image: PathBuf,

    /// Replaces the built-in persona instruction when set.
    pub persona_file: Option<PathBuf>,

    /// Generative API base URL.
    pub api_base_url: String,
}

/// Channel allow-list.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub primary: ChannelId,
    pub additional: Vec<ChannelId>,
}

impl ChannelConfig {
    /// Every channel the bot serves, primary first.
    pub fn all(&self) -> Vec<ChannelId> {
        std::iter::once(self.primary.clone())
            .chain(self.additional.iter().cloned())
            .collect()
    }

    pub fn contains(&self, channel_id: &str) -> bool {
        self.primary.as_ref() == channel_id
            || self.additional.iter().any(|id| id.as_ref() == channel_id)
    }
}

/// Active model identifiers. Swapped as a whole snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveModels {
    pub chat_model_id: String,
    pub image_model_id: String,
}

/// Per-turn behavior.
#[derive(Debug, Clone, Copy)]
pub struct TurnConfig {
    /// Transcript messages fetched for the history window.
    pub history_limit: usize,

    /// Hard limit for a single outbound message.
    pub max_message_length: usize,

    /// Messages starting with this are commands, never conversation.
    pub command_prefix: char,

    /// Attach the search grounding tool to text requests.
    pub search_grounding: bool,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
            command_prefix: '!',
            search_grounding: true,
        }
    }
}

/// On-disk TOML shape. Every key is optional; the environment wins on conflict.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    bot_name: Option<String>,
    discord_token: Option<String>,
    google_key: Option<String>,
    channel_id: Option<String>,
    additional_channels: Option<Vec<String>>,
    chat_model: Option<String>,
    image_model: Option<String>,
    images_dir: Option<PathBuf>,
    fallback_image: Option<PathBuf>,
    history_limit: Option<usize>,
    max_message_length: Option<usize>,
    command_prefix: Option<char>,
    persona_file: Option<PathBuf>,
    search_grounding: Option<bool>,
    api_base_url: Option<String>,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// `env_prefix` names the bot-specific variables (`<PREFIX>_TOKEN`,
    /// `<PREFIX>_CHANNEL_ID`, ...). The Google key is shared as `GOOGLE_KEY`.
    pub fn load(env_prefix: &str) -> Result<Self> {
        Self::resolve(FileConfig::default(), env_prefix, |key| std::env::var(key).ok())
    }

    /// Load from a TOML file, with environment variables taking precedence.
    pub fn load_from_path(path: &Path, env_prefix: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Load {
            path: path.display().to_string(),
            source,
        })?;
        let file: FileConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        Self::resolve(file, env_prefix, |key| std::env::var(key).ok())
    }

    fn resolve(
        file: FileConfig,
        env_prefix: &str,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let prefix = env_prefix.to_uppercase();
        let var = |suffix: &str| {
            env(&format!("{prefix}_{suffix}")).filter(|value| !value.trim().is_empty())
        };

        let discord_token = var("TOKEN")
            .or(file.discord_token)
            .ok_or_else(|| ConfigError::MissingKey(format!("{prefix}_TOKEN")))?;

        let google_key = env("GOOGLE_KEY")
            .filter(|value| !value.trim().is_empty())
            .or(file.google_key)
            .ok_or_else(|| ConfigError::MissingKey("GOOGLE_KEY".into()))?;

        let primary = var("CHANNEL_ID")
            .or(file.channel_id)
            .ok_or_else(|| ConfigError::MissingKey(format!("{prefix}_CHANNEL_ID")))?;
        let primary = parse_channel_id(&primary)?;

        let additional = match var("ADDITIONAL_CHANNELS") {
            Some(list) => parse_channel_list(&list)?,
            None => file
                .additional_channels
                .unwrap_or_default()
                .iter()
                .map(|id| parse_channel_id(id))
                .collect::<Result<Vec<_>>>()?,
        };

        let models = ActiveModels {
            chat_model_id: var("CHAT_MODEL")
                .or(file.chat_model)
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.into()),
            image_model_id: var("IMAGE_MODEL")
                .or(file.image_model)
                .unwrap_or_else(|| DEFAULT_IMAGE_MODEL.into()),
        };

        let defaults = TurnConfig::default();
        let turn = TurnConfig {
            history_limit: file.history_limit.unwrap_or(defaults.history_limit),
            max_message_length: file
                .max_message_length
                .unwrap_or(defaults.max_message_length),
            command_prefix: file.command_prefix.unwrap_or(defaults.command_prefix),
            search_grounding: file.search_grounding.unwrap_or(defaults.search_grounding),
        };

        if turn.history_limit == 0 {
            return Err(ConfigError::Invalid("history_limit must be at least 1".into()).into());
        }
        if turn.max_message_length == 0 {
            return Err(
                ConfigError::Invalid("max_message_length must be at least 1".into()).into(),
            );
        }
        if turn.command_prefix.is_whitespace() {
            return Err(ConfigError::Invalid("command_prefix must be visible".into()).into());
        }

        Ok(Self {
            bot_name: file.bot_name.unwrap_or_else(|| capitalize(&prefix)),
            discord_token,
            google_key,
            channels: ChannelConfig {
                primary,
                additional,
            },
            models,
            turn,
            images_dir: file.images_dir.unwrap_or_else(|| PathBuf::from("./images")),
            fallback_image: file
                .fallback_image
                .unwrap_or_else(|| PathBuf::from("no.jpg")),
            persona_file: file.persona_file,
            api_base_url: file
                .api_base_url
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.into()),
        })
    }
}

/// Parse one numeric channel id.
fn parse_channel_id(raw: &str) -> Result<ChannelId> {
    let trimmed = raw.trim();
    trimmed
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(format!("channel id is not numeric: {trimmed:?}")))?;
    Ok(ChannelId::from(trimmed))
}

/// Parse a comma-separated channel list. Blank entries are skipped.
pub fn parse_channel_list(raw: &str) -> Result<Vec<ChannelId>> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(parse_channel_id)
        .collect()
}

fn capitalize(value: &str) -> String {
    let lower = value.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Process-wide mutable settings shared by every turn.
///
/// Turns read a snapshot at their start; `set_chat_model` swaps in a new one.
/// An in-flight turn keeps the snapshot it loaded (last write wins).
#[derive(Debug)]
pub struct RuntimeConfig {
    models: ArcSwap<ActiveModels>,
}

impl RuntimeConfig {
    pub fn new(models: ActiveModels) -> Self {
        Self {
            models: ArcSwap::from_pointee(models),
        }
    }

    /// Current model snapshot.
    pub fn models(&self) -> Arc<ActiveModels> {
        self.models.load_full()
    }

    /// Replace the chat model id. Returns the previous id.
    pub fn set_chat_model(&self, model_id: impl Into<String>) -> String {
        let model_id = model_id.into();
        let previous = self.models.rcu(|current| ActiveModels {
            chat_model_id: model_id.clone(),
            image_model_id: current.image_model_id.clone(),
        });
        previous.chat_model_id.clone()
    }
}
