//! Contracts for the two external generative services.
//!
//! Every pipeline component holds an `Arc<dyn TextGenerator>` or
//! `Arc<dyn ImageSynthesizer>` handed to it at construction. Adapters return
//! typed [`StepwiseError`]s; callers never look at error text.

#[cfg(feature = "gemini")]
pub mod gemini;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;

use crate::design::StageVisualPlan;
use crate::errors::{MalformedResponseError, Result};
use crate::model::{AspectRatio, Fact, ImagePayload, ProcessStructure, QualityTier, StageNarrative};

/// What a text request is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Decompose a topic into stages.
    Structure,
    /// Narrate stage `n`.
    Narration(usize),
    /// Plan the image for stage `n`.
    VisualPlan(usize),
    /// Propose candidate facts from a domain.
    Facts,
    /// Explain a single concept.
    Concept,
    /// Plan a single standalone image.
    SinglePlan,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structure => write!(f, "structure"),
            Self::Narration(n) => write!(f, "stage {n} narration"),
            Self::VisualPlan(n) => write!(f, "stage {n} visual plan"),
            Self::Facts => write!(f, "fact discovery"),
            Self::Concept => write!(f, "concept"),
            Self::SinglePlan => write!(f, "single plan"),
        }
    }
}

/// A prompt for the text-generation service.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRequest {
    /// Fully rendered prompt.
    pub prompt: String,
    /// JSON schema the answer must follow, if structured output is wanted.
    pub response_schema: Option<Value>,
    /// What the request is for.
    pub kind: RequestKind,
}

impl TextRequest {
    /// Creates a free-text request.
    #[must_use]
    pub fn new(kind: RequestKind, prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            response_schema: None,
            kind,
        }
    }

    /// Asks for structured output matching `T`'s schema.
    #[must_use]
    pub fn structured<T: StructuredOutput>(kind: RequestKind, prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            response_schema: Some(T::response_schema()),
            kind,
        }
    }
}

/// A rendering request for the image-synthesis service.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest {
    /// Natural-language rendering plan.
    pub prompt: String,
    /// Output proportions.
    pub aspect_ratio: AspectRatio,
    /// Model tier.
    pub quality: QualityTier,
    /// Budget for the render, retries included.
    pub timeout: Duration,
    /// Label used in logs and timeout errors.
    pub label: String,
}

/// Text-generation service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Returns the raw text answer, which is JSON when a schema was given.
    async fn generate(&self, request: &TextRequest) -> Result<String>;
}

/// Image-synthesis service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageSynthesizer: Send + Sync {
    /// Renders one image.
    async fn synthesize(&self, request: &ImageRequest) -> Result<ImagePayload>;
}

/// A value the text service can produce as schema-validated JSON.
pub trait StructuredOutput: DeserializeOwned {
    /// The response schema, in the OpenAPI subset the service accepts.
    fn response_schema() -> Value;
}

/// Sends `request` and parses the JSON answer.
pub async fn generate_structured<T: StructuredOutput>(
    generator: &dyn TextGenerator,
    request: &TextRequest,
) -> Result<T> {
    let raw = generator.generate(request).await?;
    parse_structured(&raw, request.kind)
}

fn parse_structured<T: DeserializeOwned>(raw: &str, kind: RequestKind) -> Result<T> {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return Err(MalformedResponseError::Empty {
            operation: kind.to_string(),
        }
        .into());
    }
    serde_json::from_str(body).map_err(|e| {
        MalformedResponseError::InvalidPayload(format!("{kind} answer does not match schema: {e}"))
            .into()
    })
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn string() -> Value {
    json!({ "type": "STRING" })
}

fn string_array() -> Value {
    json!({ "type": "ARRAY", "items": { "type": "STRING" } })
}

fn object(properties: &Value, required: &[&str]) -> Value {
    json!({ "type": "OBJECT", "properties": properties, "required": required })
}

impl StructuredOutput for ProcessStructure {
    fn response_schema() -> Value {
        object(
            &json!({
                "processName": string(),
                "domain": string(),
                "overviewText": string(),
                "suggestedSteps": { "type": "INTEGER" },
                "stepTitles": string_array(),
            }),
            &["processName", "domain", "overviewText", "suggestedSteps", "stepTitles"],
        )
    }
}

impl StructuredOutput for StageNarrative {
    fn response_schema() -> Value {
        object(
            &json!({
                "stepNumber": { "type": "INTEGER" },
                "title": string(),
                "description": string(),
                "keyEvents": string_array(),
            }),
            &["stepNumber", "title", "description", "keyEvents"],
        )
    }
}

impl StructuredOutput for Fact {
    fn response_schema() -> Value {
        object(
            &json!({ "domain": string(), "title": string(), "text": string() }),
            &["domain", "title", "text"],
        )
    }
}

impl StructuredOutput for Vec<Fact> {
    fn response_schema() -> Value {
        json!({ "type": "ARRAY", "items": Fact::response_schema() })
    }
}

impl StructuredOutput for StageVisualPlan {
    fn response_schema() -> Value {
        let title = object(
            &json!({
                "fontStyle": string(),
                "size": string(),
                "color": string(),
                "background": string(),
                "position": string(),
                "effects": string(),
            }),
            &["fontStyle", "size", "color", "background", "position"],
        );
        let badge = object(
            &json!({
                "shape": string(),
                "backgroundColor": string(),
                "border": string(),
                "textStyle": string(),
                "position": string(),
                "size": string(),
            }),
            &["shape", "backgroundColor", "border", "textStyle", "position", "size"],
        );
        let palette_entry = object(
            &json!({ "concept": string(), "color": string() }),
            &["concept", "color"],
        );
        let palette = json!({ "type": "ARRAY", "items": palette_entry });
        let layout = object(
            &json!({ "titleArea": string(), "badgeArea": string(), "calloutArea": string() }),
            &["titleArea", "badgeArea", "calloutArea"],
        );
        let text_rules = object(
            &json!({ "labelStyle": string(), "explanationStyle": string() }),
            &["labelStyle", "explanationStyle"],
        );
        let design = object(
            &json!({
                "title": title,
                "badge": badge,
                "palette": palette,
                "technique": string(),
                "layout": layout,
                "textRules": text_rules,
            }),
            &["title", "badge", "palette", "technique", "layout", "textRules"],
        );
        let scene = object(
            &json!({
                "composition": string(),
                "focalPoint": string(),
                "labels": string_array(),
                "explanations": string_array(),
                "callouts": string_array(),
                "inputsOutputs": string_array(),
            }),
            &["composition", "focalPoint", "labels", "explanations"],
        );
        object(&json!({ "design": design, "scene": scene }), &["design", "scene"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StepwiseError;
    use mockall::predicate::function;

    #[tokio::test]
    async fn test_generate_structured_parses_fenced_json() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .with(function(|req: &TextRequest| {
                req.kind == RequestKind::Concept && req.response_schema.is_some()
            }))
            .times(1)
            .returning(|_| {
                Ok(concat!(
                    "```json\n",
                    r#"{"domain":"Physics","title":"Tides","text":"The moon pulls."}"#,
                    "\n```"
                )
                .to_string())
            });

        let request = TextRequest::structured::<Fact>(RequestKind::Concept, "explain tides");
        let fact: Fact = generate_structured(&generator, &request).await.unwrap();
        assert_eq!(fact.title, "Tides");
    }

    #[tokio::test]
    async fn test_schema_mismatch_is_malformed() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .returning(|_| Ok(r#"{"unexpected": true}"#.to_string()));

        let request = TextRequest::structured::<ProcessStructure>(RequestKind::Structure, "p");
        let err = generate_structured::<ProcessStructure>(&generator, &request)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StepwiseError::MalformedResponse(MalformedResponseError::InvalidPayload(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_answer_is_malformed() {
        let mut generator = MockTextGenerator::new();
        generator.expect_generate().returning(|_| Ok("  ".to_string()));

        let request = TextRequest::structured::<Fact>(RequestKind::Narration(2), "p");
        let err = generate_structured::<Fact>(&generator, &request).await.unwrap_err();
        assert!(matches!(
            err,
            StepwiseError::MalformedResponse(MalformedResponseError::Empty { .. })
        ));
    }

    #[tokio::test]
    async fn test_service_errors_pass_through() {
        let mut generator = MockTextGenerator::new();
        generator.expect_generate().returning(|_| {
            Err(StepwiseError::ContentPolicyBlock {
                finish_reason: "SAFETY".to_string(),
            })
        });

        let request = TextRequest::new(RequestKind::Structure, "p");
        let err = generate_structured::<Fact>(&generator, &request).await.unwrap_err();
        assert!(matches!(err, StepwiseError::ContentPolicyBlock { .. }));
    }

    #[tokio::test]
    async fn test_fact_list_parses_from_array() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .withf(|req| {
                req.kind == RequestKind::Facts
                    && req.response_schema.as_ref().map(|s| s["type"] == "ARRAY") == Some(true)
            })
            .returning(|_| {
                Ok(r#"[{"domain":"Biology","title":"Tardigrades","text":"They survive vacuum."},
                      {"domain":"Biology","title":"Octopus","text":"Three hearts."}]"#
                    .to_string())
            });

        let request = TextRequest::structured::<Vec<Fact>>(RequestKind::Facts, "biology");
        let facts: Vec<Fact> = generate_structured(&generator, &request).await.unwrap();
        assert_eq!(facts.len(), 2);
        assert_eq!(facts[1].title, "Octopus");
        assert_eq!(RequestKind::Facts.to_string(), "fact discovery");
    }

    #[test]
    fn test_plan_schema_requires_design_and_scene() {
        let schema = StageVisualPlan::response_schema();
        assert_eq!(schema["type"], "OBJECT");
        assert_eq!(schema["required"], json!(["design", "scene"]));
        assert_eq!(
            schema["properties"]["design"]["properties"]["palette"]["type"],
            "ARRAY"
        );
    }
}
