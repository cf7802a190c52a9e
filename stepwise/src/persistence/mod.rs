//! Handing a finished sequence to storage.
//!
//! Only a [`CompleteSequence`] can be persisted; a partial run has no path
//! into a [`SequenceStore`].

mod memory;

pub use memory::InMemorySequenceStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::Result;
use crate::model::{CompleteSequence, GenerationOptions, ImagePayload, SequenceStep};
use crate::utils::generate_uuid;

/// Where finished sequences go.
#[async_trait]
pub trait SequenceStore: Send + Sync {
    /// Uploads one image and returns the URL it can be fetched from.
    async fn upload_image(&self, key: &str, image: &ImagePayload) -> Result<String>;

    /// Writes the metadata record of a sequence.
    async fn write_record(&self, record: &SequenceRecord) -> Result<()>;
}

/// Metadata for one stored stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    /// 1-based stage index.
    pub step_number: usize,
    /// Stage title.
    pub title: String,
    /// Stage description.
    pub description: String,
    /// Key events.
    pub key_events: Vec<String>,
    /// The plan sent to the image service.
    pub plan_text: String,
    /// Uploaded image URL, or the inline data URL when the upload failed.
    pub image_url: String,
}

/// Metadata for one stored sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceRecord {
    /// Generated identifier.
    pub id: Uuid,
    /// When the record was written.
    pub created_at: DateTime<Utc>,
    /// Process name.
    pub process_name: String,
    /// Scientific domain.
    pub domain: String,
    /// Process overview.
    pub overview: String,
    /// Options the sequence was generated with.
    pub options: GenerationOptions,
    /// Every stage, in order.
    pub steps: Vec<StepRecord>,
}

/// Uploads every stage image in parallel, then writes one record.
///
/// A failed upload does not fail the save: the stage keeps its inline
/// data URL instead. A failed record write does.
pub async fn persist_sequence(
    store: &dyn SequenceStore,
    sequence: &CompleteSequence,
    options: &GenerationOptions,
) -> Result<SequenceRecord> {
    let id = generate_uuid();
    let uploads = sequence
        .steps()
        .iter()
        .map(|step| upload_or_inline(store, id, step));
    let urls = join_all(uploads).await;

    let structure = sequence.structure();
    let record = SequenceRecord {
        id,
        created_at: Utc::now(),
        process_name: structure.process_name.clone(),
        domain: structure.domain.clone(),
        overview: structure.overview_text.clone(),
        options: *options,
        steps: sequence
            .steps()
            .iter()
            .zip(urls)
            .map(|(step, image_url)| StepRecord {
                step_number: step.step_number,
                title: step.title.clone(),
                description: step.description.clone(),
                key_events: step.key_events.clone(),
                plan_text: step.plan_text.clone(),
                image_url,
            })
            .collect(),
    };

    store.write_record(&record).await?;
    info!(
        id = %record.id,
        process = %record.process_name,
        stages = record.steps.len(),
        "Sequence persisted"
    );
    Ok(record)
}

async fn upload_or_inline(store: &dyn SequenceStore, id: Uuid, step: &SequenceStep) -> String {
    let key = format!("{id}/step-{}.png", step.step_number);
    match store.upload_image(&key, &step.image).await {
        Ok(url) => url,
        Err(e) => {
            warn!(key = %key, error = %e, "Image upload failed, keeping inline payload");
            step.image.data_url()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sequence;
    use crate::testing::{sample_plan, sample_structure};

    fn complete_sequence(steps: usize) -> CompleteSequence {
        let structure = sample_structure(steps);
        let mut sequence = Sequence::with_target(steps);
        for n in 1..=steps {
            sequence
                .push(SequenceStep {
                    step_number: n,
                    title: structure.step_titles[n - 1].clone(),
                    description: format!("description {n}"),
                    key_events: vec![format!("event {n}")],
                    plan: sample_plan(n),
                    plan_text: format!("plan {n}"),
                    image: ImagePayload::from_bytes("image/png", format!("png-{n}").as_bytes()),
                })
                .unwrap();
        }
        sequence.into_complete(structure).unwrap()
    }

    #[tokio::test]
    async fn test_persist_uploads_every_image_then_writes_record() {
        let store = InMemorySequenceStore::new();
        let sequence = complete_sequence(3);

        let record = persist_sequence(&store, &sequence, &GenerationOptions::default())
            .await
            .unwrap();

        assert_eq!(store.image_count(), 3);
        assert_eq!(record.steps.len(), 3);
        assert_eq!(
            record.steps[1].image_url,
            format!("memory://{}/step-2.png", record.id)
        );
        assert_eq!(store.record(record.id), Some(record.clone()));
        assert_eq!(
            store.image(&format!("{}/step-3.png", record.id)).unwrap().decode().unwrap(),
            b"png-3"
        );
    }

    #[tokio::test]
    async fn test_failed_uploads_fall_back_to_inline_payload() {
        let store = InMemorySequenceStore::new().with_failing_uploads();
        let sequence = complete_sequence(3);

        let record = persist_sequence(&store, &sequence, &GenerationOptions::default())
            .await
            .unwrap();

        assert_eq!(store.image_count(), 0);
        for (step, stored) in sequence.steps().iter().zip(&record.steps) {
            assert_eq!(stored.image_url, step.image.data_url());
        }
        assert!(store.record(record.id).is_some());
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = SequenceRecord {
            id: Uuid::nil(),
            created_at: Utc::now(),
            process_name: "Tides".to_string(),
            domain: "Earth Science".to_string(),
            overview: "The moon pulls the oceans.".to_string(),
            options: GenerationOptions::default(),
            steps: Vec::new(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["processName"], "Tides");
        assert!(json.get("createdAt").is_some());
    }
}
