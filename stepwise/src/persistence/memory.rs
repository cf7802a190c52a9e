//! In-memory sequence store.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use super::{SequenceRecord, SequenceStore};
use crate::errors::{Result, StepwiseError};
use crate::model::ImagePayload;

/// Keeps images and records in concurrent maps. Image URLs are `memory://{key}`.
#[derive(Debug, Default)]
pub struct InMemorySequenceStore {
    images: DashMap<String, ImagePayload>,
    records: DashMap<Uuid, SequenceRecord>,
    fail_uploads: AtomicBool,
}

impl InMemorySequenceStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every image upload fail.
    #[must_use]
    pub fn with_failing_uploads(self) -> Self {
        self.fail_uploads.store(true, Ordering::SeqCst);
        self
    }

    /// Gets a stored record.
    pub fn record(&self, id: Uuid) -> Option<SequenceRecord> {
        self.records.get(&id).map(|entry| entry.value().clone())
    }

    /// Gets a stored image.
    pub fn image(&self, key: &str) -> Option<ImagePayload> {
        self.images.get(key).map(|entry| entry.value().clone())
    }

    /// Number of stored images.
    #[must_use]
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Number of stored records.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

#[async_trait]
impl SequenceStore for InMemorySequenceStore {
    async fn upload_image(&self, key: &str, image: &ImagePayload) -> Result<String> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StepwiseError::Http {
                status: Some(503),
                message: format!("upload of {key} rejected"),
            });
        }
        self.images.insert(key.to_string(), image.clone());
        Ok(format!("memory://{key}"))
    }

    async fn write_record(&self, record: &SequenceRecord) -> Result<()> {
        self.records.insert(record.id, record.clone());
        Ok(())
    }
}
