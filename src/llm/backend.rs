//! Backend traits and request types.

use crate::conversation::HistoryEntry;
use crate::error::LlmError;

use std::sync::Arc;

/// Capability attached to a text request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    /// Ground answers with web search results.
    GoogleSearch,
}

/// One text-generation attempt. A retry builds a new request rather than
/// mutating this one.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model_id: String,
    pub history: Vec<HistoryEntry>,
    pub system_instruction: Arc<str>,
    pub tools: Vec<Tool>,
    pub query: String,
}

impl GenerationRequest {
    /// Same request with the history dropped.
    pub fn without_history(&self) -> Self {
        Self {
            history: Vec::new(),
            ..self.clone()
        }
    }
}

/// Image-generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub model_id: String,
    pub prompt: String,
    pub aspect_ratio: String,
    pub count: u32,
}

/// Raw image bytes as returned by the backend, not yet validated.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
}

/// Text-generation backend.
#[async_trait::async_trait]
pub trait TextBackend: Send + Sync + 'static {
    /// Run one generation attempt. Errors are already classified.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError>;
}

/// Image-generation backend.
#[async_trait::async_trait]
pub trait ImageBackend: Send + Sync + 'static {
    async fn generate_images(&self, request: &ImageRequest)
    -> Result<Vec<GeneratedImage>, LlmError>;
}
