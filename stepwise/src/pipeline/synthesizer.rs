//! Renders a plan into an image through the image service.

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::errors::{MalformedResponseError, Result};
use crate::model::{GenerationOptions, ImagePayload};
use crate::resilience::Resilience;
use crate::services::{ImageRequest, ImageSynthesizer};

/// Wraps the image service with the resilience layer.
#[derive(Clone)]
pub struct ImageSynthesizerAdapter {
    images: Arc<dyn ImageSynthesizer>,
    resilience: Resilience,
}

impl ImageSynthesizerAdapter {
    /// Creates an adapter.
    #[must_use]
    pub fn new(images: Arc<dyn ImageSynthesizer>, resilience: Resilience) -> Self {
        Self { images, resilience }
    }

    /// Renders `plan_text`.
    ///
    /// `budget` bounds the whole render including retries; process-mode
    /// callers pass a longer budget than single-image callers.
    pub async fn render(
        &self,
        plan_text: &str,
        label: &str,
        options: &GenerationOptions,
        budget: Duration,
    ) -> Result<ImagePayload> {
        let request = ImageRequest {
            prompt: plan_text.to_string(),
            aspect_ratio: options.aspect_ratio,
            quality: options.quality,
            timeout: budget,
            label: label.to_string(),
        };

        let payload = self
            .resilience
            .call(label, budget, || self.images.synthesize(&request))
            .await?;
        if payload.data.is_empty() {
            return Err(MalformedResponseError::Empty {
                operation: label.to_string(),
            }
            .into());
        }

        info!(
            label = %label,
            mime_type = %payload.mime_type,
            bytes = payload.data.len(),
            "Image rendered"
        );
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StepwiseError;
    use crate::model::{AspectRatio, QualityTier};
    use crate::resilience::RetryConfig;
    use crate::services::MockImageSynthesizer;

    #[tokio::test]
    async fn test_request_carries_options_and_budget() {
        let mut mock = MockImageSynthesizer::new();
        mock.expect_synthesize()
            .withf(|req| {
                req.aspect_ratio == AspectRatio::Tall
                    && req.quality == QualityTier::HighQuality
                    && req.timeout == Duration::from_secs(180)
                    && req.prompt == "PLAN"
            })
            .times(1)
            .returning(|_| Ok(ImagePayload::from_bytes("image/png", b"png")));

        let adapter = ImageSynthesizerAdapter::new(Arc::new(mock), Resilience::default());
        let options = GenerationOptions::default()
            .with_aspect_ratio(AspectRatio::Tall)
            .with_quality(QualityTier::HighQuality);

        let payload = adapter
            .render("PLAN", "stage 1 render", &options, Duration::from_secs(180))
            .await
            .unwrap();
        assert_eq!(payload.decode().unwrap(), b"png");
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_is_retried() {
        let mut mock = MockImageSynthesizer::new();
        let mut seq = mockall::Sequence::new();
        mock.expect_synthesize()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(StepwiseError::TransientOverload("503".to_string())));
        mock.expect_synthesize()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(ImagePayload::from_bytes("image/png", b"ok")));

        let resilience = Resilience::new(RetryConfig::new().with_initial_delay_ms(10));
        let adapter = ImageSynthesizerAdapter::new(Arc::new(mock), resilience);

        let payload = adapter
            .render("PLAN", "stage 2 render", &GenerationOptions::default(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(payload.decode().unwrap(), b"ok");
    }

    #[tokio::test]
    async fn test_block_propagates_with_finish_reason() {
        let mut mock = MockImageSynthesizer::new();
        mock.expect_synthesize().times(1).returning(|_| {
            Err(StepwiseError::ContentPolicyBlock {
                finish_reason: "IMAGE_SAFETY".to_string(),
            })
        });

        let adapter = ImageSynthesizerAdapter::new(Arc::new(mock), Resilience::default());
        let err = adapter
            .render("PLAN", "stage 1 render", &GenerationOptions::default(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("IMAGE_SAFETY"));
    }

    #[tokio::test]
    async fn test_empty_payload_is_malformed() {
        let mut mock = MockImageSynthesizer::new();
        mock.expect_synthesize()
            .returning(|_| Ok(ImagePayload::new("image/png", "")));

        let adapter = ImageSynthesizerAdapter::new(Arc::new(mock), Resilience::default());
        let err = adapter
            .render("PLAN", "stage 1 render", &GenerationOptions::default(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, StepwiseError::MalformedResponse(_)));
    }
}
