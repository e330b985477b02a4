//! Text generation policy: one attempt with history, one retry without it.

use crate::error::{FailureKind, LlmError};
use crate::llm::backend::{GenerationRequest, TextBackend};

/// Generate a reply for `request`.
///
/// When the backend rejects the history, the request is retried exactly once
/// with an empty history and nothing else changed. Any other failure, and any
/// failure of the retry, is returned as-is. The text is returned unmodified.
#[tracing::instrument(skip_all, fields(model = %request.model_id, history = request.history.len()))]
pub async fn generate_reply(
    backend: &dyn TextBackend,
    request: GenerationRequest,
) -> Result<String, LlmError> {
    match backend.generate(&request).await {
        Ok(text) => Ok(text),
        Err(error) if error.kind() == FailureKind::HistoryValidation => {
            tracing::warn!(%error, "history rejected by backend, retrying without history");
            backend.generate(&request.without_history()).await
        }
        Err(error) => Err(error),
    }
}
