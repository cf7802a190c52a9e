//! Benchmarks for prompt assembly.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use stepwise::design::RenderContext;
use stepwise::model::{Language, StageNarrative};
use stepwise::pipeline::{ConsistencyTemplate, ConsistencyTemplateBuilder};
use stepwise::testing::{sample_design, sample_plan};

fn prior_stages(count: usize) -> Vec<StageNarrative> {
    (1..=count)
        .map(|n| StageNarrative {
            step_number: n,
            title: format!("Stage {n}"),
            description: "Light strikes the chlorophyll and excites electrons, which pass \
                          along a chain of proteins embedded in the thylakoid membrane."
                .repeat(2),
            key_events: vec!["absorb".to_string(), "excite".to_string()],
        })
        .collect()
}

fn consistency_benchmark(c: &mut Criterion) {
    let plan_text = sample_plan(1).render(&RenderContext {
        title: "Light Absorption",
        position: Some((1, 8)),
        style: "clean vector",
        language: Language::En,
    });
    let template = ConsistencyTemplate::new(plan_text, sample_design());
    let builder = ConsistencyTemplateBuilder::default();
    let prior = prior_stages(7);

    c.bench_function("consistency_block_stage_8", |b| {
        b.iter(|| builder.build(black_box(8), 8, Some(&template), black_box(&prior)))
    });

    let plan = sample_plan(3);
    c.bench_function("render_plan", |b| {
        b.iter(|| {
            black_box(&plan).render(&RenderContext {
                title: "Electron Transport",
                position: Some((3, 8)),
                style: "clean vector",
                language: Language::Fr,
            })
        })
    });
}

criterion_group!(benches, consistency_benchmark);
criterion_main!(benches);
