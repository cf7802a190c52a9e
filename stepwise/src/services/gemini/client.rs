//! HTTP client for the Gemini `generateContent` endpoint.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use std::time::Duration;
use tracing::debug;

use super::wire::{
    classify_http_error, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    ImageConfig,
};
use crate::config::StepwiseConfig;
use crate::errors::{Result, StepwiseError};
use crate::model::{ImagePayload, QualityTier};
use crate::services::{ImageRequest, ImageSynthesizer, TextGenerator, TextRequest};

/// Primary environment variable holding the API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
/// Fallback environment variable holding the API key.
pub const FALLBACK_API_KEY_ENV: &str = "API_KEY";

/// One client for both text generation and image synthesis.
///
/// The credential is read once at construction and shared read-only by
/// every call.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    config: StepwiseConfig,
}

impl GeminiClient {
    /// Creates a client with an explicit API key.
    pub fn new(api_key: impl Into<String>, config: &StepwiseConfig) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(StepwiseError::Config("API key is empty".to_string()));
        }
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StepwiseError::Config(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_key,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            config: config.clone(),
        })
    }

    /// Creates a client from `GEMINI_API_KEY`, falling back to `API_KEY`.
    pub fn from_env(config: &StepwiseConfig) -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .or_else(|_| std::env::var(FALLBACK_API_KEY_ENV))
            .map_err(|_| {
                StepwiseError::Config(format!(
                    "neither {API_KEY_ENV} nor {FALLBACK_API_KEY_ENV} is set"
                ))
            })?;
        Self::new(api_key, config)
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{model}:generateContent", self.base_url)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|e| StepwiseError::Config(format!("invalid API key: {e}")))?,
        );
        Ok(headers)
    }

    async fn post(
        &self,
        model: &str,
        body: &GenerateContentRequest,
        timeout: Option<Duration>,
    ) -> Result<GenerateContentResponse> {
        let mut request = self
            .http
            .post(self.endpoint(model))
            .headers(self.headers()?)
            .json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| StepwiseError::Http {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = classify_http_error(status.as_u16(), &body);
            debug!(model = %model, status = status.as_u16(), error = %error, "Request rejected");
            return Err(error);
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| StepwiseError::Serialization(format!("unreadable response: {e}")))
    }
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("text_model", &self.config.text_model)
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, request: &TextRequest) -> Result<String> {
        let mut body = GenerateContentRequest::user_prompt(&request.prompt);
        if let Some(schema) = &request.response_schema {
            body = body.with_config(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(schema.clone()),
                ..GenerationConfig::default()
            });
        }

        debug!(kind = %request.kind, model = %self.config.text_model, "Text request");
        let operation = request.kind.to_string();
        self.post(&self.config.text_model, &body, None)
            .await?
            .into_text(&operation)
    }
}

#[async_trait]
impl ImageSynthesizer for GeminiClient {
    async fn synthesize(&self, request: &ImageRequest) -> Result<ImagePayload> {
        let image_size = match request.quality {
            QualityTier::HighQuality => Some(self.config.image_size.clone()),
            QualityTier::Fast => None,
        };
        let generation = GenerationConfig {
            response_modalities: Some(vec!["IMAGE".to_string()]),
            image_config: Some(ImageConfig {
                aspect_ratio: request.aspect_ratio.as_str().to_string(),
                image_size,
            }),
            ..GenerationConfig::default()
        };
        let body = GenerateContentRequest::user_prompt(&request.prompt).with_config(generation);

        let model = self.config.image_model(request.quality);
        debug!(
            label = %request.label,
            model = %model,
            aspect_ratio = %request.aspect_ratio,
            "Image request"
        );
        self.post(model, &body, Some(request.timeout))
            .await?
            .into_image(&request.label)
    }
}
