use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use leadscore_core::{
    fallback, CompiledNode, CompiledTree, EnsembleArtifact, FeatureVocabulary, FieldKind,
    FieldSpec, PortableRuntime, RawLead,
};
use serde_json::json;

const TREES: usize = 100;

fn vocabulary() -> FeatureVocabulary {
    FeatureVocabulary::new(
        vec![
            "Page Views".to_string(),
            "Downloads".to_string(),
            "Webinar Attended".to_string(),
            "Industry_Technology".to_string(),
        ],
        vec![
            FieldSpec::new("Page Views", FieldKind::Numeric, &["pageViews"]),
            FieldSpec::new("Downloads", FieldKind::Numeric, &["downloads"]),
            FieldSpec::new("Webinar Attended", FieldKind::Flag, &["webinarAttended"]),
            FieldSpec::new("Industry", FieldKind::Categorical, &["industry"]),
        ],
    )
}

fn sample_tree(offset: f64) -> CompiledTree {
    CompiledTree::new(vec![
        CompiledNode::split("Page Views", 5.5 + offset, 1, 4),
        CompiledNode::split("Downloads", 0.5, 2, 3),
        CompiledNode::leaf(0.05),
        CompiledNode::leaf(0.4),
        CompiledNode::split("Industry_Technology", 0.5, 5, 6),
        CompiledNode::leaf(0.6),
        CompiledNode::leaf(0.9),
    ])
}

fn bench_runtime_scoring(c: &mut Criterion) {
    let trees = (0..TREES).map(|i| sample_tree((i % 7) as f64)).collect();
    let runtime = match PortableRuntime::new(EnsembleArtifact::new(vocabulary(), trees)) {
        Ok(runtime) => runtime,
        Err(e) => panic!("benchmark artifact rejected: {e}"),
    };
    let lead = RawLead::from_value(json!({
        "pageViews": 9,
        "downloads": 2,
        "webinarAttended": true,
        "industry": "Technology"
    }));

    let mut group = c.benchmark_group("runtime");
    group.throughput(Throughput::Elements(1));
    group.bench_function("score_100_trees", |b| {
        b.iter(|| black_box(runtime.try_score(black_box(&lead))))
    });
    group.bench_function("fallback", |b| {
        b.iter(|| black_box(fallback::score(black_box(&lead))))
    });
    group.finish();
}

criterion_group!(runtime_benches, bench_runtime_scoring);
criterion_main!(runtime_benches);
