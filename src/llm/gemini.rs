//! Gemini REST client for text (generateContent) and Imagen (predict).

use crate::conversation::{HistoryEntry, Role};
use crate::error::{LlmError, Result};
use crate::llm::backend::{
    GeneratedImage, GenerationRequest, ImageBackend, ImageRequest, TextBackend, Tool,
};

use anyhow::Context as _;
use base64::Engine as _;
use reqwest::StatusCode;

/// Talks to the Google generative language API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .with_context(|| "failed to build HTTP client")?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            base_url: base_url.into(),
        })
    }

    fn model_url(&self, model_id: &str, method: &str) -> String {
        format!(
            "{}/models/{model_id}:{method}",
            self.base_url.trim_end_matches('/')
        )
    }

    /// POST a JSON body and return the parsed JSON response, classifying failures.
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> std::result::Result<serde_json::Value, LlmError> {
        let response = self
            .http_client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| LlmError::Network(format!("failed to read response body: {e}")))?;

        let response_body: serde_json::Value = match serde_json::from_str(&response_text) {
            Ok(value) => value,
            Err(error) if status.is_success() => {
                return Err(LlmError::Backend(format!(
                    "response ({status}) is not valid JSON: {error}\nBody: {}",
                    truncate_body(&response_text)
                )));
            }
            Err(_) => serde_json::Value::Null,
        };

        if !status.is_success() {
            let message = response_body["error"]["message"]
                .as_str()
                .unwrap_or_else(|| truncate_body(&response_text));
            return Err(classify_error(status, message));
        }

        Ok(response_body)
    }
}

#[async_trait::async_trait]
impl TextBackend for GeminiClient {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> std::result::Result<String, LlmError> {
        validate_history(&request.history)?;

        let url = self.model_url(&request.model_id, "generateContent");
        let body = build_generate_body(request);
        let response = self.post_json(&url, &body).await?;

        parse_generate_response(&response)
    }
}

#[async_trait::async_trait]
impl ImageBackend for GeminiClient {
    async fn generate_images(
        &self,
        request: &ImageRequest,
    ) -> std::result::Result<Vec<GeneratedImage>, LlmError> {
        let url = self.model_url(&request.model_id, "predict");
        let body = build_predict_body(request);
        let response = self.post_json(&url, &body).await?;

        parse_predict_response(&response)
    }
}

/// Reject history the chat API would refuse, before spending a request on it.
fn validate_history(history: &[HistoryEntry]) -> std::result::Result<(), LlmError> {
    if let Some(first) = history.first()
        && first.role != Role::User
    {
        return Err(LlmError::HistoryValidation(format!(
            "history must start with a user entry, got {}",
            first.role
        )));
    }

    if let Some(index) = history.iter().position(|entry| entry.text.trim().is_empty()) {
        return Err(LlmError::HistoryValidation(format!(
            "history entry {index} has no text"
        )));
    }

    Ok(())
}

fn build_generate_body(request: &GenerationRequest) -> serde_json::Value {
    let mut contents: Vec<serde_json::Value> = request
        .history
        .iter()
        .map(|entry| {
            serde_json::json!({
                "role": entry.role.as_str(),
                "parts": [{ "text": entry.text }],
            })
        })
        .collect();

    contents.push(serde_json::json!({
        "role": Role::User.as_str(),
        "parts": [{ "text": request.query }],
    }));

    let mut body = serde_json::json!({
        "systemInstruction": {
            "parts": [{ "text": request.system_instruction.as_ref() }],
        },
        "contents": contents,
    });

    if !request.tools.is_empty() {
        let tools: Vec<serde_json::Value> = request
            .tools
            .iter()
            .map(|tool| match tool {
                Tool::GoogleSearch => serde_json::json!({ "google_search": {} }),
            })
            .collect();
        body["tools"] = serde_json::json!(tools);
    }

    body
}

fn parse_generate_response(
    response: &serde_json::Value,
) -> std::result::Result<String, LlmError> {
    let text: String = response["candidates"][0]["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part["text"].as_str())
                .collect()
        })
        .unwrap_or_default();

    if !text.trim().is_empty() {
        return Ok(text);
    }

    if let Some(reason) = response["promptFeedback"]["blockReason"].as_str() {
        return Err(LlmError::Backend(format!("prompt blocked: {reason}")));
    }

    Err(LlmError::EmptyResponse)
}

fn build_predict_body(request: &ImageRequest) -> serde_json::Value {
    serde_json::json!({
        "instances": [{ "prompt": request.prompt }],
        "parameters": {
            "sampleCount": request.count,
            "aspectRatio": request.aspect_ratio,
        },
    })
}

fn parse_predict_response(
    response: &serde_json::Value,
) -> std::result::Result<Vec<GeneratedImage>, LlmError> {
    let Some(predictions) = response["predictions"].as_array() else {
        return Ok(Vec::new());
    };

    predictions
        .iter()
        .filter_map(|prediction| {
            let encoded = prediction["bytesBase64Encoded"].as_str()?;
            let mime_type = prediction["mimeType"].as_str().map(String::from);
            Some((encoded, mime_type))
        })
        .map(|(encoded, mime_type)| {
            base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map(|bytes| GeneratedImage { bytes, mime_type })
                .map_err(|e| LlmError::Backend(format!("image payload is not base64: {e}")))
        })
        .collect()
}

/// Map an HTTP failure onto the closed error kinds.
fn classify_error(status: StatusCode, message: &str) -> LlmError {
    let lower = message.to_lowercase();

    if status == StatusCode::TOO_MANY_REQUESTS || lower.contains("resource_exhausted") {
        return LlmError::Quota(format!("({status}) {message}"));
    }

    if status == StatusCode::BAD_REQUEST && is_history_rejection(&lower) {
        return LlmError::HistoryValidation(format!("({status}) {message}"));
    }

    LlmError::Backend(format!("({status}) {message}"))
}

fn is_history_rejection(lower_message: &str) -> bool {
    lower_message.contains("contents")
        || lower_message.contains("role")
        || lower_message.contains("turn")
}

fn truncate_body(body: &str) -> &str {
    match body.char_indices().nth(500) {
        Some((byte_index, _)) => &body[..byte_index],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn request(history: Vec<HistoryEntry>, tools: Vec<Tool>) -> GenerationRequest {
        GenerationRequest {
            model_id: "gemini-test".into(),
            history,
            system_instruction: Arc::from("be funny"),
            tools,
            query: "tell me about airports".into(),
        }
    }

    #[test]
    fn generate_body_appends_query_after_history() {
        let body = build_generate_body(&request(
            vec![HistoryEntry::user("hi"), HistoryEntry::model("hello")],
            vec![Tool::GoogleSearch],
        ));

        let contents = body["contents"].as_array().expect("contents array");
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["parts"][0]["text"], "tell me about airports");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be funny");
        assert!(body["tools"][0].get("google_search").is_some());
    }

    #[test]
    fn generate_body_omits_tools_when_none() {
        let body = build_generate_body(&request(Vec::new(), Vec::new()));
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn history_starting_with_model_is_invalid() {
        let error = validate_history(&[HistoryEntry::model("hello")])
            .expect_err("model-first history is invalid");
        assert!(matches!(error, LlmError::HistoryValidation(_)));
    }

    #[test]
    fn blank_history_entry_is_invalid() {
        let error = validate_history(&[HistoryEntry::user("hi"), HistoryEntry::model("  ")])
            .expect_err("blank entry is invalid");
        assert!(matches!(error, LlmError::HistoryValidation(_)));
        assert!(validate_history(&[]).is_ok());
    }

    #[test]
    fn parses_text_from_all_parts() {
        let response = serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "What's the deal " }, { "text": "with airports?" }] }
            }]
        });

        let text = parse_generate_response(&response).expect("text response");
        assert_eq!(text, "What's the deal with airports?");
    }

    #[test]
    fn empty_candidates_are_empty_response() {
        let response = serde_json::json!({ "candidates": [] });
        assert!(matches!(
            parse_generate_response(&response),
            Err(LlmError::EmptyResponse)
        ));

        let blocked = serde_json::json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        assert!(matches!(
            parse_generate_response(&blocked),
            Err(LlmError::Backend(_))
        ));
    }

    #[test]
    fn classifies_http_failures() {
        assert!(matches!(
            classify_error(StatusCode::TOO_MANY_REQUESTS, "slow down"),
            LlmError::Quota(_)
        ));
        assert!(matches!(
            classify_error(
                StatusCode::BAD_REQUEST,
                "Please ensure that multiturn requests alternate between user and model turns."
            ),
            LlmError::HistoryValidation(_)
        ));
        assert!(matches!(
            classify_error(StatusCode::BAD_REQUEST, "API key not valid"),
            LlmError::Backend(_)
        ));
        assert!(matches!(
            classify_error(StatusCode::INTERNAL_SERVER_ERROR, "contents exploded"),
            LlmError::Backend(_)
        ));
    }

    #[test]
    fn predict_body_requests_single_image() {
        let body = build_predict_body(&ImageRequest {
            model_id: "imagen".into(),
            prompt: "a puffy shirt".into(),
            aspect_ratio: "1:1".into(),
            count: 1,
        });

        assert_eq!(body["instances"][0]["prompt"], "a puffy shirt");
        assert_eq!(body["parameters"]["sampleCount"], 1);
        assert_eq!(body["parameters"]["aspectRatio"], "1:1");
    }

    #[test]
    fn parses_predictions() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"png-bytes");
        let response = serde_json::json!({
            "predictions": [{ "bytesBase64Encoded": encoded, "mimeType": "image/png" }]
        });

        let images = parse_predict_response(&response).expect("images");
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].bytes, b"png-bytes");
        assert_eq!(images[0].mime_type.as_deref(), Some("image/png"));

        assert!(
            parse_predict_response(&serde_json::json!({}))
                .expect("no predictions")
                .is_empty()
        );
    }
}
