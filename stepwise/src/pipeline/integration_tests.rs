//! End-to-end controller runs against scripted services.

#[cfg(test)]
mod tests {
    use crate::cancellation::CancellationToken;
    use crate::config::StepwiseConfig;
    use crate::errors::{ErrorClass, StepwiseError, ValidationError};
    use crate::events::{
        CollectingEventSink, PHASE_CHANGED, PIPELINE_COMPLETED, PIPELINE_FAILED, STAGE_APPENDED,
    };
    use crate::model::{AspectRatio, GenerationOptions, ProcessStructure};
    use crate::pipeline::{Phase, PipelineController};
    use crate::resilience::RetryConfig;
    use crate::services::RequestKind;
    use crate::testing::{sample_structure, ScriptedImageSynthesizer, ScriptedTextGenerator};
    use std::sync::Arc;
    use std::time::Duration;

    fn config() -> StepwiseConfig {
        StepwiseConfig::default().with_retry(RetryConfig::new().with_initial_delay_ms(10))
    }

    fn controller(
        text: &Arc<ScriptedTextGenerator>,
        images: &Arc<ScriptedImageSynthesizer>,
    ) -> PipelineController {
        PipelineController::new(text.clone(), images.clone(), config())
    }

    fn services(steps: usize) -> (Arc<ScriptedTextGenerator>, Arc<ScriptedImageSynthesizer>) {
        (
            Arc::new(ScriptedTextGenerator::for_process(sample_structure(steps))),
            Arc::new(ScriptedImageSynthesizer::new()),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_five_stage_run_completes_in_order() {
        let (text, images) = services(5);
        let mut controller = controller(&text, &images);

        let sequence = controller
            .run("Photosynthesis", &GenerationOptions::default())
            .await
            .unwrap();

        assert_eq!(sequence.len(), 5);
        let numbers: Vec<usize> = sequence.steps().iter().map(|s| s.step_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
        for (index, step) in sequence.steps().iter().enumerate() {
            let k = index + 1;
            assert_eq!(step.title, sample_structure(5).step_titles[index]);
            assert!(step.plan_text.contains(&format!("\"STEP {k}/5\"")));
            assert_eq!(step.image.decode().unwrap(), format!("image-{k}").as_bytes());
        }

        assert_eq!(controller.state().phase(), Phase::Complete);
        assert_eq!(images.call_count(), 5);
        for request in images.requests() {
            assert_eq!(request.timeout, Duration::from_millis(180_000));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_allowed_stage_count_completes() {
        for n in ProcessStructure::MIN_STEPS..=ProcessStructure::MAX_STEPS {
            let (text, images) = services(n);
            let mut controller = controller(&text, &images);

            let sequence = controller
                .run("Photosynthesis", &GenerationOptions::default())
                .await
                .unwrap();

            assert_eq!(sequence.len(), n);
            let numbers: Vec<usize> = sequence.steps().iter().map(|s| s.step_number).collect();
            assert_eq!(numbers, (1..=n).collect::<Vec<_>>());
            let last = &sequence.steps()[n - 1];
            assert!(last.plan_text.contains(&format!("\"STEP {n}/{n}\"")));
            assert_eq!(images.call_count(), n);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_with_defaults_uses_configured_options() {
        let (text, images) = services(3);
        let config = StepwiseConfig::from_json_str(
            r#"{"defaults": {"language": "fr", "aspect_ratio": "4:3"}}"#,
        )
        .unwrap()
        .with_retry(RetryConfig::new().with_initial_delay_ms(10));
        let mut controller = PipelineController::new(text.clone(), images.clone(), config);

        let sequence = controller.run_with_defaults("Photosynthesis").await.unwrap();

        assert_eq!(sequence.len(), 3);
        for request in text.requests() {
            assert!(request.prompt.contains("French"), "{} prompt lacks language", request.kind);
        }
        assert!(images
            .requests()
            .iter()
            .all(|req| req.aspect_ratio == AspectRatio::Landscape));
    }

    #[tokio::test(start_paused = true)]
    async fn test_later_stages_carry_stage_one_plan_and_digest() {
        let (text, images) = services(4);
        let mut controller = controller(&text, &images);

        let sequence = controller
            .run("Photosynthesis", &GenerationOptions::default())
            .await
            .unwrap();
        let stage_one_plan = &sequence.steps()[0].plan_text;

        let first = &text.prompts_for(RequestKind::VisualPlan(1))[0];
        assert!(first.contains("this is stage 1"));
        assert!(!first.contains("STAGE 1 PLAN"));

        let third = &text.prompts_for(RequestKind::VisualPlan(3))[0];
        assert!(third.contains(stage_one_plan.as_str()));
        assert!(third.contains("- Stage 1 (Light Absorption): DESC-1"));
        assert!(third.contains("- Stage 2 (Water Splitting): DESC-2"));
        assert!(!third.contains("- Stage 3"));
        assert!(third
            .contains("Do not re-illustrate the above; show only new content for this stage."));
    }

    #[tokio::test(start_paused = true)]
    async fn test_design_is_pinned_to_stage_one() {
        let (text, images) = services(3);
        let mut controller = controller(&text, &images);

        let sequence = controller
            .run("Photosynthesis", &GenerationOptions::default())
            .await
            .unwrap();

        let design = &sequence.steps()[0].plan.design;
        for step in sequence.steps() {
            assert_eq!(&step.plan.design, design);
        }
        assert_ne!(sequence.steps()[1].plan.scene, sequence.steps()[2].plan.scene);
    }

    #[tokio::test(start_paused = true)]
    async fn test_narration_sees_only_earlier_stages() {
        let (text, images) = services(4);
        let mut controller = controller(&text, &images);
        controller
            .run("Photosynthesis", &GenerationOptions::default())
            .await
            .unwrap();

        for stage in 1..=4 {
            let prompt = &text.prompts_for(RequestKind::Narration(stage))[0];
            for earlier in 1..stage {
                assert!(
                    prompt.contains(&format!("DESC-{earlier}")),
                    "stage {stage} misses {earlier}"
                );
            }
            for later in stage..=4 {
                assert!(!prompt.contains(&format!("DESC-{later}")), "stage {stage} saw {later}");
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_at_stage_three_discards_everything() {
        let text = Arc::new(ScriptedTextGenerator::for_process(sample_structure(5)));
        let images = Arc::new(ScriptedImageSynthesizer::new().with_failure_on_call(
            3,
            StepwiseError::ContentPolicyBlock {
                finish_reason: "IMAGE_SAFETY".to_string(),
            },
        ));
        let sink = Arc::new(CollectingEventSink::new());
        let mut controller = controller(&text, &images).with_event_sink(sink.clone());

        let failure = controller
            .run("Photosynthesis", &GenerationOptions::default())
            .await
            .unwrap_err();

        assert_eq!(failure.stage, 3);
        assert_eq!(failure.class, ErrorClass::ContentBlocked);
        assert_eq!(failure.message, ErrorClass::ContentBlocked.user_message());
        assert!(failure.error.to_string().contains("IMAGE_SAFETY"));

        let state = controller.state();
        assert_eq!(state.phase(), Phase::Failed(3));
        assert!(state.sequence().is_empty());
        assert!(state.structure().is_none());
        assert!(state.template().is_none());

        assert_eq!(images.call_count(), 3);
        assert!(text.prompts_for(RequestKind::Narration(4)).is_empty());
        assert_eq!(sink.events_of_type(STAGE_APPENDED).len(), 2);
        assert_eq!(sink.events_of_type(PIPELINE_FAILED).len(), 1);
        assert!(sink.events_of_type(PIPELINE_COMPLETED).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_overload_is_retried_transparently() {
        let text = Arc::new(ScriptedTextGenerator::for_process(sample_structure(3)));
        let images = Arc::new(ScriptedImageSynthesizer::new().with_failure_on_call(
            2,
            StepwiseError::TransientOverload("503 UNAVAILABLE".to_string()),
        ));
        let mut controller = controller(&text, &images);

        let sequence = controller
            .run("Photosynthesis", &GenerationOptions::default())
            .await
            .unwrap();

        assert_eq!(sequence.len(), 3);
        assert_eq!(images.call_count(), 4);
        assert_eq!(sequence.steps()[1].image.decode().unwrap(), b"image-3");
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_report_rate_limit() {
        let text = Arc::new(
            ScriptedTextGenerator::for_process(sample_structure(3)).with_failure(
                RequestKind::Structure,
                10,
                StepwiseError::TransientOverload("429".to_string()),
            ),
        );
        let images = Arc::new(ScriptedImageSynthesizer::new());
        let mut controller = controller(&text, &images);

        let failure = controller
            .run("Photosynthesis", &GenerationOptions::default())
            .await
            .unwrap_err();

        assert_eq!(failure.stage, 0);
        assert_eq!(failure.class, ErrorClass::RateLimited);
        assert_eq!(text.prompts_for(RequestKind::Structure).len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mismatched_structure_fails_before_any_stage() {
        let mut structure = sample_structure(3);
        structure.suggested_steps = 5;
        let text = Arc::new(ScriptedTextGenerator::for_process(structure));
        let images = Arc::new(ScriptedImageSynthesizer::new());
        let mut controller = controller(&text, &images);

        let failure = controller
            .run("Photosynthesis", &GenerationOptions::default())
            .await
            .unwrap_err();

        assert_eq!(failure.stage, 0);
        assert!(matches!(
            failure.error.root_cause(),
            StepwiseError::Validation(ValidationError::StepCountMismatch { declared: 5, titles: 3 })
        ));
        assert_eq!(controller.state().phase(), Phase::Failed(0));
        assert!(text.prompts_for(RequestKind::Narration(1)).is_empty());
        assert_eq!(images.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_text_service_times_out() {
        let text = Arc::new(
            ScriptedTextGenerator::for_process(sample_structure(3))
                .with_delay(Duration::from_secs(120)),
        );
        let images = Arc::new(ScriptedImageSynthesizer::new());
        let mut controller = PipelineController::new(
            text.clone(),
            images.clone(),
            config().with_text_timeout_ms(1_000),
        );

        let failure = controller
            .run("Photosynthesis", &GenerationOptions::default())
            .await
            .unwrap_err();

        assert_eq!(failure.class, ErrorClass::TimedOut);
        assert!(matches!(
            failure.error.root_cause(),
            StepwiseError::Timeout { budget_ms: 1_000, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_follow_the_state_machine() {
        let (text, images) = services(3);
        let sink = Arc::new(CollectingEventSink::new());
        let mut controller = controller(&text, &images).with_event_sink(sink.clone());

        controller
            .run("Photosynthesis", &GenerationOptions::default())
            .await
            .unwrap();

        let phases = sink.phases();
        assert_eq!(phases.len(), 1 + 5 * 3 + 1);
        assert_eq!(phases.first(), Some(&Phase::Discovering));
        assert_eq!(
            &phases[1..6],
            [
                Phase::Narrating(1),
                Phase::Templating(1),
                Phase::Planning(1),
                Phase::Rendering(1),
                Phase::Appended(1),
            ]
        );
        assert_eq!(phases.last(), Some(&Phase::Complete));
        assert_eq!(sink.events_of_type(PHASE_CHANGED).len(), phases.len());

        let types = sink.event_types();
        assert_eq!(types.last().copied(), Some(PIPELINE_COMPLETED));
        assert_eq!(sink.events_of_type(STAGE_APPENDED).len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_final_snapshot() {
        let (text, images) = services(3);
        let mut controller = controller(&text, &images);
        let receiver = controller.subscribe();

        controller
            .run("Photosynthesis", &GenerationOptions::default())
            .await
            .unwrap();

        let snapshot = receiver.borrow().clone();
        assert_eq!(snapshot.phase, Phase::Complete);
        assert_eq!(snapshot.total_steps, 3);
        assert_eq!(snapshot.steps.len(), 3);
        assert_eq!(snapshot.process_name.as_deref(), Some("Photosynthesis"));
        assert_eq!(snapshot, controller.snapshot());
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshots_share_steps_with_the_run() {
        let (text, images) = services(3);
        let mut controller = controller(&text, &images);
        let receiver = controller.subscribe();

        let sequence = controller
            .run("Photosynthesis", &GenerationOptions::default())
            .await
            .unwrap();

        let published = receiver.borrow().clone();
        let held = controller.state().sequence().steps();
        for (index, step) in sequence.steps().iter().enumerate() {
            assert!(Arc::ptr_eq(step, &held[index]));
            assert!(Arc::ptr_eq(step, &published.steps[index]));
            assert!(Arc::ptr_eq(step, &controller.snapshot().steps[index]));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_run_makes_no_calls() {
        let (text, images) = services(3);
        let token = Arc::new(CancellationToken::new());
        token.cancel("user navigated away");
        let mut controller = controller(&text, &images).with_cancellation(token);

        let failure = controller
            .run("Photosynthesis", &GenerationOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(failure.error, StepwiseError::Cancelled(_)));
        assert!(text.requests().is_empty());
        assert_eq!(images.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_run_starts_clean_after_failure() {
        let text = Arc::new(ScriptedTextGenerator::for_process(sample_structure(3)).with_failure(
            RequestKind::Narration(2),
            1,
            StepwiseError::Http {
                status: Some(500),
                message: "boom".to_string(),
            },
        ));
        let images = Arc::new(ScriptedImageSynthesizer::new());
        let mut controller = controller(&text, &images);

        let failure = controller
            .run("Photosynthesis", &GenerationOptions::default())
            .await
            .unwrap_err();
        assert_eq!(failure.stage, 2);
        assert_eq!(failure.class, ErrorClass::Generic);

        let sequence = controller
            .run("Photosynthesis", &GenerationOptions::default())
            .await
            .unwrap();
        assert_eq!(sequence.len(), 3);
        assert_eq!(sequence.structure().suggested_steps, ProcessStructure::MIN_STEPS);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_config_fails_at_stage_zero() {
        let (text, images) = services(3);
        let mut controller = PipelineController::new(
            text.clone(),
            images.clone(),
            StepwiseConfig::default().with_text_timeout_ms(0),
        );

        let failure = controller
            .run("Photosynthesis", &GenerationOptions::default())
            .await
            .unwrap_err();
        assert_eq!(failure.stage, 0);
        assert!(matches!(failure.error, StepwiseError::Config(_)));
        assert!(text.requests().is_empty());
    }
}
