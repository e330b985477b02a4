//! History window assembly from the channel transcript.
//!
//! History is never stored. Each turn rebuilds it from the last few transcript
//! messages, tagging each one with the role the backend expects.

use crate::TranscriptMessage;

use serde::{Deserialize, Serialize};

/// Who authored a history entry, from the backend's point of view.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One role-tagged message in the history window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub role: Role,
    pub text: String,
}

impl HistoryEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Build the history window from transcript messages ordered oldest to newest.
///
/// Messages authored by `bot_user_id` become `model` entries, everything else
/// `user`. A non-empty history must open with a `user` entry; when the oldest
/// message is the bot's own, the whole window is dropped.
pub fn assemble_history(transcript: &[TranscriptMessage], bot_user_id: &str) -> Vec<HistoryEntry> {
    let history: Vec<HistoryEntry> = transcript
        .iter()
        .map(|message| HistoryEntry {
            role: if message.author_id == bot_user_id {
                Role::Model
            } else {
                Role::User
            },
            text: message.content.clone(),
        })
        .collect();

    match history.first() {
        Some(first) if first.role != Role::User => {
            tracing::debug!(
                entries = history.len(),
                "history window opens with a model entry, discarding it"
            );
            Vec::new()
        }
        _ => history,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOT: &str = "42";

    fn message(author_id: &str, content: &str) -> TranscriptMessage {
        TranscriptMessage {
            id: uuid::Uuid::new_v4().to_string(),
            author_id: author_id.to_string(),
            author_is_bot: author_id == BOT,
            content: content.to_string(),
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn maps_roles_by_author() {
        let transcript = vec![message("7", "hi"), message(BOT, "hello")];

        let history = assemble_history(&transcript, BOT);

        assert_eq!(
            history,
            vec![HistoryEntry::user("hi"), HistoryEntry::model("hello")]
        );
    }

    #[test]
    fn empty_transcript_yields_empty_history() {
        assert!(assemble_history(&[], BOT).is_empty());
    }

    #[test]
    fn discards_everything_when_bot_speaks_first() {
        let transcript = vec![message(BOT, "hello")];
        assert!(assemble_history(&transcript, BOT).is_empty());

        let transcript = vec![
            message(BOT, "what's the deal with airline food"),
            message("7", "ha"),
            message(BOT, "right?"),
            message("8", "go on"),
        ];
        assert!(assemble_history(&transcript, BOT).is_empty());
    }

    #[test]
    fn other_bots_count_as_users() {
        let mut other_bot = message("99", "beep");
        other_bot.author_is_bot = true;
        let transcript = vec![other_bot, message(BOT, "boop")];

        let history = assemble_history(&transcript, BOT);

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
    }

    #[test]
    fn preserves_order_oldest_first() {
        let transcript = vec![
            message("7", "one"),
            message("8", "two"),
            message(BOT, "three"),
        ];

        let texts: Vec<_> = assemble_history(&transcript, BOT)
            .into_iter()
            .map(|entry| entry.text)
            .collect();

        assert_eq!(texts, vec!["one", "two", "three"]);
    }
}
