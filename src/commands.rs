//! Administrative and utility commands.
//!
//! Commands are plain prefixed messages (`!clear 20`, `!model gemini-2.0-flash`,
//! `!image a puffy shirt`). Handlers check capabilities first and never retry.

use crate::config::RuntimeConfig;
use crate::error::{AuthorizationError, Error, Result};
use crate::messaging::Transport;
use crate::{Capability, InboundMessage};

/// Messages deleted by `clear` when no limit is given.
pub const DEFAULT_CLEAR_LIMIT: usize = 100;

/// Upper bound for a single `clear`.
pub const MAX_CLEAR_LIMIT: usize = 1000;

/// A parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Delete recent messages in the channel.
    Clear { limit: usize },
    /// Switch the chat model, or report the current models when `None`.
    Model { model_id: Option<String> },
    /// Generate an image from a prompt.
    Image { prompt: String },
    /// A known command with bad arguments. Carries the usage line.
    Invalid { usage: String },
}

impl Command {
    /// Parse the text following the command prefix. Unknown commands yield `None`.
    pub fn parse(input: &str, prefix: char) -> Option<Self> {
        let input = input.trim();
        let (name, args) = match input.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (input, ""),
        };

        let command = match name.to_lowercase().as_str() {
            "clear" => {
                if args.is_empty() {
                    Command::Clear {
                        limit: DEFAULT_CLEAR_LIMIT,
                    }
                } else {
                    match args.parse::<usize>() {
                        Ok(limit) => Command::Clear {
                            limit: limit.clamp(1, MAX_CLEAR_LIMIT),
                        },
                        Err(_) => Command::Invalid {
                            usage: format!("Usage: `{prefix}clear [limit]`"),
                        },
                    }
                }
            }
            "model" => Command::Model {
                model_id: (!args.is_empty()).then(|| args.to_string()),
            },
            "image" => {
                if args.is_empty() {
                    Command::Invalid {
                        usage: format!("Usage: `{prefix}image <prompt>`"),
                    }
                } else {
                    Command::Image {
                        prompt: args.to_string(),
                    }
                }
            }
            _ => return None,
        };

        Some(command)
    }
}

/// Delete up to `limit` recent messages in the message's channel.
///
/// Requires the moderation capability. Returns the acknowledgement text.
pub async fn clear(
    transport: &dyn Transport,
    message: &InboundMessage,
    limit: usize,
) -> Result<String> {
    if !message.capabilities.can_moderate() {
        return Err(AuthorizationError::MissingCapability(Capability::Moderate).into());
    }

    let deleted = transport.bulk_delete(&message.channel_id, limit).await?;
    tracing::info!(
        channel_id = %message.channel_id,
        author_id = %message.author_id,
        requested = limit,
        deleted,
        "cleared channel messages"
    );

    Ok(format!("Deleted {deleted} messages."))
}

/// Switch the active chat model, or describe the current models.
///
/// Switching requires the administrator capability; reading does not.
pub fn set_model(
    runtime: &RuntimeConfig,
    message: &InboundMessage,
    model_id: Option<&str>,
) -> Result<String> {
    let Some(model_id) = model_id else {
        let models = runtime.models();
        return Ok(format!(
            "Chat model: `{}`\nImage model: `{}`",
            models.chat_model_id, models.image_model_id
        ));
    };

    if !message.capabilities.can_administer() {
        return Err(AuthorizationError::MissingCapability(Capability::Administer).into());
    }

    let previous = runtime.set_chat_model(model_id);
    tracing::info!(
        author_id = %message.author_id,
        previous = %previous,
        current = %model_id,
        "chat model changed"
    );

    Ok(format!(
        "Chat model changed from `{previous}` to `{model_id}`."
    ))
}

/// User-facing text for a failed command. Denials are logged at info, other
/// failures as warnings.
pub fn failure_reply(command: &str, error: &Error) -> String {
    match error {
        Error::Authorization(AuthorizationError::MissingCapability(capability)) => {
            tracing::info!(command, %capability, "command denied");
            format!("You need the **{capability}** permission to use this command.")
        }
        _ => {
            tracing::warn!(command, %error, "command failed");
            format!("Sorry, `{command}` failed: {error}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ActiveModels;
    use crate::Capabilities;

    fn message(capabilities: Capabilities) -> InboundMessage {
        InboundMessage {
            id: "100".into(),
            channel_id: "1".into(),
            author_id: "7".into(),
            author_is_bot: false,
            content: String::new(),
            timestamp: chrono::Utc::now(),
            capabilities,
        }
    }

    fn runtime() -> RuntimeConfig {
        RuntimeConfig::new(ActiveModels {
            chat_model_id: "gemini-old".into(),
            image_model_id: "imagen".into(),
        })
    }

    #[test]
    fn parses_clear_with_default_and_clamped_limits() {
        assert_eq!(
            Command::parse("clear", '!'),
            Some(Command::Clear { limit: 100 })
        );
        assert_eq!(
            Command::parse("clear 50", '!'),
            Some(Command::Clear { limit: 50 })
        );
        assert_eq!(
            Command::parse("CLEAR 0", '!'),
            Some(Command::Clear { limit: 1 })
        );
        assert_eq!(
            Command::parse("clear 99999", '!'),
            Some(Command::Clear { limit: 1000 })
        );
        assert!(matches!(
            Command::parse("clear lots", '!'),
            Some(Command::Invalid { .. })
        ));
    }

    #[test]
    fn parses_model_and_image() {
        assert_eq!(
            Command::parse("model  gemini-2.0-flash ", '!'),
            Some(Command::Model {
                model_id: Some("gemini-2.0-flash".into())
            })
        );
        assert_eq!(
            Command::parse("model", '!'),
            Some(Command::Model { model_id: None })
        );
        assert_eq!(
            Command::parse("image a puffy shirt", '!'),
            Some(Command::Image {
                prompt: "a puffy shirt".into()
            })
        );
        assert_eq!(
            Command::parse("image", '!'),
            Some(Command::Invalid {
                usage: "Usage: `!image <prompt>`".into()
            })
        );
    }

    #[test]
    fn unknown_commands_are_ignored() {
        assert_eq!(Command::parse("serenity now", '!'), None);
        assert_eq!(Command::parse("", '!'), None);
    }

    #[test]
    fn set_model_requires_administrator() {
        let runtime = runtime();
        let moderator = Capabilities {
            moderate: true,
            administer: false,
        };

        let error = set_model(&runtime, &message(moderator), Some("gemini-new"))
            .expect_err("moderators cannot switch models");

        assert!(matches!(
            error,
            Error::Authorization(AuthorizationError::MissingCapability(Capability::Administer))
        ));
        assert_eq!(runtime.models().chat_model_id, "gemini-old");
    }

    #[test]
    fn set_model_acknowledges_old_and_new() {
        let runtime = runtime();
        let admin = Capabilities {
            moderate: false,
            administer: true,
        };

        let reply = set_model(&runtime, &message(admin), Some("gemini-new")).expect("switched");

        assert_eq!(reply, "Chat model changed from `gemini-old` to `gemini-new`.");
        assert_eq!(runtime.models().chat_model_id, "gemini-new");
        assert_eq!(runtime.models().image_model_id, "imagen");
    }

    #[test]
    fn anyone_can_read_current_models() {
        let reply = set_model(&runtime(), &message(Capabilities::default()), None)
            .expect("read models");
        assert!(reply.contains("gemini-old"));
        assert!(reply.contains("imagen"));
    }

    #[test]
    fn denial_reply_names_the_capability() {
        let error: Error = AuthorizationError::MissingCapability(Capability::Moderate).into();
        let reply = failure_reply("clear", &error);
        assert_eq!(
            reply,
            "You need the **manage messages** permission to use this command."
        );
    }
}
