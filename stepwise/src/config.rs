//! Runtime configuration.
//!
//! Every field has a serde default, so a config file only needs to name the
//! values it overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::errors::{Result, StepwiseError};
use crate::model::{GenerationOptions, QualityTier};
use crate::resilience::RetryConfig;

/// Configuration for a pipeline and its service adapters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepwiseConfig {
    /// Base URL of the generative API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Model used for every text call.
    #[serde(default = "default_text_model")]
    pub text_model: String,
    /// Image model for [`QualityTier::Fast`].
    #[serde(default = "default_fast_image_model")]
    pub fast_image_model: String,
    /// Image model for [`QualityTier::HighQuality`].
    #[serde(default = "default_high_quality_image_model")]
    pub high_quality_image_model: String,
    /// Image size hint sent with every render.
    #[serde(default = "default_image_size")]
    pub image_size: String,
    /// Budget for each text call, retries included.
    #[serde(default = "default_text_timeout_ms")]
    pub text_timeout_ms: u64,
    /// Budget for a single-image render, retries included.
    #[serde(default = "default_single_image_timeout_ms")]
    pub single_image_timeout_ms: u64,
    /// Budget for one process-stage render, retries included.
    #[serde(default = "default_process_image_timeout_ms")]
    pub process_image_timeout_ms: u64,
    /// Retry policy for transient overloads.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Options applied when a caller does not pick their own.
    #[serde(default)]
    pub defaults: GenerationOptions,
    /// Characters kept from each prior stage in the exclusion digest.
    #[serde(default = "default_digest_excerpt_chars")]
    pub digest_excerpt_chars: usize,
}

fn default_api_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_text_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_fast_image_model() -> String {
    "gemini-2.5-flash-image".to_string()
}

fn default_high_quality_image_model() -> String {
    "gemini-3-pro-image-preview".to_string()
}

fn default_image_size() -> String {
    "1K".to_string()
}

fn default_text_timeout_ms() -> u64 {
    60_000
}

fn default_single_image_timeout_ms() -> u64 {
    90_000
}

fn default_process_image_timeout_ms() -> u64 {
    180_000
}

fn default_digest_excerpt_chars() -> usize {
    150
}

impl Default for StepwiseConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            text_model: default_text_model(),
            fast_image_model: default_fast_image_model(),
            high_quality_image_model: default_high_quality_image_model(),
            image_size: default_image_size(),
            text_timeout_ms: default_text_timeout_ms(),
            single_image_timeout_ms: default_single_image_timeout_ms(),
            process_image_timeout_ms: default_process_image_timeout_ms(),
            retry: RetryConfig::default(),
            defaults: GenerationOptions::default(),
            digest_excerpt_chars: default_digest_excerpt_chars(),
        }
    }
}

impl StepwiseConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON configuration and validates it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| StepwiseError::Config(format!("invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| StepwiseError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    /// Sets the API base URL.
    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Sets the text-call budget.
    #[must_use]
    pub fn with_text_timeout_ms(mut self, ms: u64) -> Self {
        self.text_timeout_ms = ms;
        self
    }

    /// Sets both image budgets.
    #[must_use]
    pub fn with_image_timeouts_ms(mut self, single_ms: u64, process_ms: u64) -> Self {
        self.single_image_timeout_ms = single_ms;
        self.process_image_timeout_ms = process_ms;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the default generation options.
    #[must_use]
    pub fn with_defaults(mut self, defaults: GenerationOptions) -> Self {
        self.defaults = defaults;
        self
    }

    /// Sets the digest excerpt length.
    #[must_use]
    pub fn with_digest_excerpt_chars(mut self, chars: usize) -> Self {
        self.digest_excerpt_chars = chars;
        self
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(StepwiseError::Config("api_base_url is empty".to_string()));
        }
        for (name, model) in [
            ("text_model", &self.text_model),
            ("fast_image_model", &self.fast_image_model),
            ("high_quality_image_model", &self.high_quality_image_model),
        ] {
            if model.trim().is_empty() {
                return Err(StepwiseError::Config(format!("{name} is empty")));
            }
        }
        for (name, ms) in [
            ("text_timeout_ms", self.text_timeout_ms),
            ("single_image_timeout_ms", self.single_image_timeout_ms),
            ("process_image_timeout_ms", self.process_image_timeout_ms),
        ] {
            if ms == 0 {
                return Err(StepwiseError::Config(format!("{name} must be positive")));
            }
        }
        if self.process_image_timeout_ms <= self.single_image_timeout_ms {
            return Err(StepwiseError::Config(format!(
                "process_image_timeout_ms ({}) must exceed single_image_timeout_ms ({})",
                self.process_image_timeout_ms, self.single_image_timeout_ms
            )));
        }
        if self.digest_excerpt_chars == 0 {
            return Err(StepwiseError::Config(
                "digest_excerpt_chars must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Image model for a quality tier.
    #[must_use]
    pub fn image_model(&self, quality: QualityTier) -> &str {
        match quality {
            QualityTier::Fast => &self.fast_image_model,
            QualityTier::HighQuality => &self.high_quality_image_model,
        }
    }

    /// Text-call budget.
    #[must_use]
    pub fn text_timeout(&self) -> Duration {
        Duration::from_millis(self.text_timeout_ms)
    }

    /// Single-image render budget.
    #[must_use]
    pub fn single_image_timeout(&self) -> Duration {
        Duration::from_millis(self.single_image_timeout_ms)
    }

    /// Process-stage render budget.
    #[must_use]
    pub fn process_image_timeout(&self) -> Duration {
        Duration::from_millis(self.process_image_timeout_ms)
    }
}
