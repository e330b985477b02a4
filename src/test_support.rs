//! In-memory fakes for the backend and transport traits.

use crate::error::{LlmError, TransportError};
use crate::llm::{GeneratedImage, GenerationRequest, ImageBackend, ImageRequest, TextBackend};
use crate::messaging::Transport;
use crate::{ChannelId, MessageId, ReplyTarget, TranscriptMessage};

use parking_lot::Mutex;

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// Replays scripted results in order and records every request.
pub struct ScriptedTextBackend {
    results: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedTextBackend {
    pub fn new(results: Vec<Result<String, LlmError>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait::async_trait]
impl TextBackend for ScriptedTextBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        self.requests.lock().push(request.clone());
        self.results
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Backend("script exhausted".into())))
    }
}

/// Returns one fixed result, then errors.
pub struct FakeImageBackend {
    result: Mutex<Option<Result<Vec<GeneratedImage>, LlmError>>>,
    requests: Mutex<Vec<ImageRequest>>,
}

impl FakeImageBackend {
    pub fn returning(result: Result<Vec<GeneratedImage>, LlmError>) -> Self {
        Self {
            result: Mutex::new(Some(result)),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ImageRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait::async_trait]
impl ImageBackend for FakeImageBackend {
    async fn generate_images(
        &self,
        request: &ImageRequest,
    ) -> Result<Vec<GeneratedImage>, LlmError> {
        self.requests.lock().push(request.clone());
        self.result
            .lock()
            .take()
            .unwrap_or_else(|| Err(LlmError::Backend("called twice".into())))
    }
}

/// A message the fake transport delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentMessage {
    Text {
        channel_id: String,
        reply_to: Option<String>,
        text: String,
    },
    File {
        channel_id: String,
        reply_to: Option<String>,
        path: PathBuf,
        caption: Option<String>,
    },
}

/// Records outbound traffic and serves a scripted transcript.
pub struct FakeTransport {
    bot_user_id: String,
    transcript: Mutex<Vec<TranscriptMessage>>,
    history_fails: Mutex<bool>,
    history_queries: Mutex<Vec<(Option<MessageId>, usize)>>,
    failing_sends: Mutex<Vec<usize>>,
    send_attempts: Mutex<usize>,
    sent: Mutex<Vec<SentMessage>>,
    deletes: Mutex<Vec<usize>>,
    delete_fails: Mutex<bool>,
}

impl FakeTransport {
    pub fn new(bot_user_id: &str) -> Self {
        Self {
            bot_user_id: bot_user_id.to_string(),
            transcript: Mutex::new(Vec::new()),
            history_fails: Mutex::new(false),
            history_queries: Mutex::new(Vec::new()),
            failing_sends: Mutex::new(Vec::new()),
            send_attempts: Mutex::new(0),
            sent: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
            delete_fails: Mutex::new(false),
        }
    }

    pub fn push_transcript(&self, author_id: &str, content: &str) {
        let mut transcript = self.transcript.lock();
        let id = transcript.len().to_string();
        transcript.push(TranscriptMessage {
            id,
            author_id: author_id.to_string(),
            author_is_bot: author_id == self.bot_user_id,
            content: content.to_string(),
            timestamp: chrono::Utc::now(),
        });
    }

    pub fn fail_history(&self) {
        *self.history_fails.lock() = true;
    }

    pub fn fail_delete(&self) {
        *self.delete_fails.lock() = true;
    }

    /// Make the send attempt at `index` (zero-based, texts and files alike) fail.
    pub fn fail_send_attempt(&self, index: usize) {
        self.failing_sends.lock().push(index);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter_map(|message| match message {
                SentMessage::Text { text, .. } => Some(text.clone()),
                SentMessage::File { .. } => None,
            })
            .collect()
    }

    pub fn deletes(&self) -> Vec<usize> {
        self.deletes.lock().clone()
    }

    pub fn history_queries(&self) -> Vec<(Option<MessageId>, usize)> {
        self.history_queries.lock().clone()
    }

    fn next_send_fails(&self) -> bool {
        let mut attempts = self.send_attempts.lock();
        let index = *attempts;
        *attempts += 1;
        self.failing_sends.lock().contains(&index)
    }
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
    fn bot_user_id(&self) -> &str {
        &self.bot_user_id
    }

    async fn recent_messages(
        &self,
        channel_id: &ChannelId,
        before: Option<&MessageId>,
        limit: usize,
    ) -> Result<Vec<TranscriptMessage>, TransportError> {
        self.history_queries.lock().push((before.cloned(), limit));
        if *self.history_fails.lock() {
            return Err(TransportError::Fetch {
                channel_id: channel_id.to_string(),
                reason: "scripted failure".into(),
            });
        }

        let transcript = self.transcript.lock();
        let skip = transcript.len().saturating_sub(limit);
        Ok(transcript[skip..].to_vec())
    }

    async fn send_text(
        &self,
        target: &ReplyTarget,
        text: &str,
    ) -> Result<MessageId, TransportError> {
        if self.next_send_fails() {
            return Err(TransportError::Send {
                channel_id: target.channel_id.to_string(),
                reason: "scripted failure".into(),
            });
        }

        let mut sent = self.sent.lock();
        sent.push(SentMessage::Text {
            channel_id: target.channel_id.to_string(),
            reply_to: target.reply_to.clone(),
            text: text.to_string(),
        });
        Ok(sent.len().to_string())
    }

    async fn send_file(
        &self,
        target: &ReplyTarget,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<MessageId, TransportError> {
        if self.next_send_fails() {
            return Err(TransportError::Send {
                channel_id: target.channel_id.to_string(),
                reason: "scripted failure".into(),
            });
        }

        let mut sent = self.sent.lock();
        sent.push(SentMessage::File {
            channel_id: target.channel_id.to_string(),
            reply_to: target.reply_to.clone(),
            path: path.to_path_buf(),
            caption: caption.map(String::from),
        });
        Ok(sent.len().to_string())
    }

    async fn bulk_delete(
        &self,
        channel_id: &ChannelId,
        limit: usize,
    ) -> Result<usize, TransportError> {
        self.deletes.lock().push(limit);
        if *self.delete_fails.lock() {
            return Err(TransportError::Delete {
                channel_id: channel_id.to_string(),
                reason: "boom".into(),
            });
        }
        Ok(limit)
    }
}

/// A tiny valid PNG.
pub fn png_bytes() -> Vec<u8> {
    let mut buffer = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(image::RgbImage::new(2, 2))
        .write_to(&mut buffer, image::ImageFormat::Png)
        .expect("encode png");
    buffer.into_inner()
}
