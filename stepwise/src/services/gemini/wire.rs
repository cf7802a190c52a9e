//! `generateContent` request/response bodies and their error classification.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{MalformedResponseError, Result, StepwiseError};
use crate::model::ImagePayload;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    pub fn user_prompt(prompt: &str) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                    inline_data: None,
                }],
            }],
            generation_config: None,
        }
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.generation_config = Some(config);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_config: Option<ImageConfig>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ImageConfig {
    pub aspect_ratio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_size: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

const SAFETY_REASONS: &[&str] = &[
    "SAFETY",
    "PROHIBITED_CONTENT",
    "BLOCKLIST",
    "SPII",
    "IMAGE_SAFETY",
    "IMAGE_PROHIBITED_CONTENT",
];

const RECITATION_REASONS: &[&str] = &["RECITATION", "IMAGE_RECITATION"];

/// Maps a non-success HTTP answer to a typed error.
pub(crate) fn classify_http_error(status: u16, body: &str) -> StepwiseError {
    let (message, api_status) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (envelope.error.message, envelope.error.status),
        Err(_) => (body.trim().to_string(), None),
    };
    let message = if message.is_empty() {
        format!("status {status}")
    } else {
        message
    };

    let overloaded = matches!(status, 429 | 503)
        || matches!(api_status.as_deref(), Some("RESOURCE_EXHAUSTED" | "UNAVAILABLE"));
    if overloaded {
        StepwiseError::TransientOverload(message)
    } else {
        StepwiseError::Http {
            status: Some(status),
            message,
        }
    }
}

/// Maps a refusal finish condition to its typed error.
pub(crate) fn classify_finish_reason(reason: &str) -> Option<StepwiseError> {
    if SAFETY_REASONS.contains(&reason) {
        Some(StepwiseError::ContentPolicyBlock {
            finish_reason: reason.to_string(),
        })
    } else if RECITATION_REASONS.contains(&reason) {
        Some(StepwiseError::CopyrightBlock {
            finish_reason: reason.to_string(),
        })
    } else {
        None
    }
}

impl GenerateContentResponse {
    fn first_candidate(&self, operation: &str) -> Result<&Candidate> {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref())
        {
            return Err(StepwiseError::ContentPolicyBlock {
                finish_reason: reason.to_string(),
            });
        }
        let candidate = self.candidates.first().ok_or_else(|| {
            StepwiseError::from(MalformedResponseError::Empty {
                operation: operation.to_string(),
            })
        })?;
        if let Some(error) = candidate
            .finish_reason
            .as_deref()
            .and_then(classify_finish_reason)
        {
            return Err(error);
        }
        Ok(candidate)
    }

    /// Concatenated text of the first candidate.
    pub fn into_text(self, operation: &str) -> Result<String> {
        let candidate = self.first_candidate(operation)?;
        let text: String = candidate
            .content
            .iter()
            .flat_map(|content| &content.parts)
            .filter_map(|part| part.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            return Err(MalformedResponseError::Empty {
                operation: operation.to_string(),
            }
            .into());
        }
        Ok(text)
    }

    /// First inline image of the first candidate.
    pub fn into_image(self, operation: &str) -> Result<ImagePayload> {
        let candidate = self.first_candidate(operation)?;
        let parts = candidate.content.as_ref().map(|c| c.parts.as_slice()).unwrap_or_default();

        if let Some(inline) = parts.iter().find_map(|part| part.inline_data.as_ref()) {
            if inline.data.is_empty() {
                return Err(MalformedResponseError::Empty {
                    operation: operation.to_string(),
                }
                .into());
            }
            return Ok(ImagePayload::new(inline.mime_type.clone(), inline.data.clone()));
        }

        let has_text = parts
            .iter()
            .any(|part| part.text.as_deref().is_some_and(|t| !t.trim().is_empty()));
        if has_text {
            return Err(MalformedResponseError::WrongModality {
                finish_reason: candidate
                    .finish_reason
                    .clone()
                    .unwrap_or_else(|| "STOP".to_string()),
            }
            .into());
        }
        Err(MalformedResponseError::Empty {
            operation: operation.to_string(),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(value: Value) -> GenerateContentResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let request = GenerateContentRequest::user_prompt("draw").with_config(GenerationConfig {
            response_modalities: Some(vec!["IMAGE".to_string()]),
            image_config: Some(ImageConfig {
                aspect_ratio: "3:4".to_string(),
                image_size: None,
            }),
            ..GenerationConfig::default()
        });
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["contents"][0]["parts"][0]["text"], "draw");
        assert_eq!(value["generationConfig"]["responseModalities"], json!(["IMAGE"]));
        assert_eq!(value["generationConfig"]["imageConfig"]["aspectRatio"], "3:4");
        assert!(value["generationConfig"].get("responseSchema").is_none());
    }

    #[test]
    fn test_overload_statuses_are_transient() {
        assert!(classify_http_error(429, "").is_transient());
        assert!(classify_http_error(503, "Service Unavailable").is_transient());

        let body = json!({
            "error": { "code": 500, "message": "The model is overloaded.", "status": "UNAVAILABLE" }
        })
        .to_string();
        let err = classify_http_error(500, &body);
        assert!(err.is_transient());
        assert_eq!(err.to_string(), "Service overloaded: The model is overloaded.");
    }

    #[test]
    fn test_other_statuses_are_fatal() {
        let body = json!({
            "error": { "code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT" }
        })
        .to_string();
        match classify_http_error(400, &body) {
            StepwiseError::Http { status, message } => {
                assert_eq!(status, Some(400));
                assert_eq!(message, "API key not valid");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_text_extraction() {
        let resp = response(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "{\"a\":" }, { "text": "1}" }] },
                "finishReason": "STOP"
            }]
        }));
        assert_eq!(resp.into_text("narrate").unwrap(), "{\"a\":1}");
    }

    #[test]
    fn test_prompt_block_is_policy_block() {
        let resp = response(json!({ "promptFeedback": { "blockReason": "PROHIBITED_CONTENT" } }));
        match resp.into_text("plan") {
            Err(StepwiseError::ContentPolicyBlock { finish_reason }) => {
                assert_eq!(finish_reason, "PROHIBITED_CONTENT");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_no_candidates_is_empty() {
        let resp = response(json!({ "candidates": [] }));
        assert!(matches!(
            resp.into_image("render"),
            Err(StepwiseError::MalformedResponse(MalformedResponseError::Empty { .. }))
        ));
    }

    #[test]
    fn test_image_finish_reasons() {
        let safety = response(json!({ "candidates": [{ "finishReason": "IMAGE_SAFETY" }] }));
        assert!(matches!(
            safety.into_image("render"),
            Err(StepwiseError::ContentPolicyBlock { .. })
        ));

        let recitation = response(json!({ "candidates": [{ "finishReason": "RECITATION" }] }));
        assert!(matches!(
            recitation.into_image("render"),
            Err(StepwiseError::CopyrightBlock { .. })
        ));
    }

    #[test]
    fn test_text_instead_of_image_is_wrong_modality() {
        let resp = response(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "I cannot draw that, here is a description." }] },
                "finishReason": "STOP"
            }]
        }));
        match resp.into_image("render") {
            Err(StepwiseError::MalformedResponse(MalformedResponseError::WrongModality {
                finish_reason,
            })) => assert_eq!(finish_reason, "STOP"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_image_extraction() {
        let resp = response(json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "Here you go" },
                    { "inlineData": { "mimeType": "image/png", "data": "aGVsbG8=" } }
                ]},
                "finishReason": "STOP"
            }]
        }));
        let payload = resp.into_image("render").unwrap();
        assert_eq!(payload.mime_type, "image/png");
        assert_eq!(payload.decode().unwrap(), b"hello");
    }
}
