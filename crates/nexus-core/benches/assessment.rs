//! Benchmarks for interaction checks and walk generation
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nexus_core::predictor::CancelToken;
use nexus_core::walks::WalkGenerator;
use nexus_core::{EmbeddingConfig, InteractionGraph, NexusConfig, NexusEngine, RiskAssessment, Seed};

fn bench_check_interactions(c: &mut Criterion) {
    let engine = NexusEngine::ephemeral(
        NexusConfig::default(),
        InteractionGraph::demo(&Seed::from_string("benchmark-v1")),
    );

    let lists: [(&str, Vec<&str>); 3] = [
        ("2 drugs", vec!["warfarin", "aspirin"]),
        ("4 drugs", vec!["warfarin", "aspirin", "Advil 200mg", "lisinopril"]),
        (
            "8 drugs",
            vec![
                "warfarin", "aspirin", "ibuprofen", "lisinopril",
                "Lipitor", "metformin", "Dolo 650", "sertraline",
            ],
        ),
    ];

    let mut group = c.benchmark_group("check_interactions");
    for (label, drugs) in &lists {
        group.bench_with_input(BenchmarkId::new("assess", label), drugs, |b, drugs| {
            b.iter(|| RiskAssessment::assess(engine.scorer(), black_box(drugs)))
        });
        group.bench_with_input(BenchmarkId::new("assess_and_record", label), drugs, |b, drugs| {
            b.iter(|| engine.check_interactions(black_box(drugs)))
        });
    }
    group.finish();
}

fn bench_resolve(c: &mut Criterion) {
    let engine = NexusEngine::ephemeral(NexusConfig::default(), InteractionGraph::new());

    c.bench_function("resolve_alias", |b| b.iter(|| engine.resolve(black_box("Dolo 650 mg"))));
    c.bench_function("resolve_fuzzy", |b| b.iter(|| engine.resolve(black_box("ibuprofin"))));
}

fn bench_walks(c: &mut Criterion) {
    let graph = InteractionGraph::demo(&Seed::from_string("benchmark-v1"));
    let config = EmbeddingConfig::default().with_num_walks(20);
    let generator = WalkGenerator::new(&graph, &config);
    let cancel = CancelToken::new();

    c.bench_function("walks_demo_graph_20x30", |b| {
        b.iter(|| generator.generate(black_box(&cancel)))
    });
}

criterion_group!(benches, bench_check_interactions, bench_resolve, bench_walks);
criterion_main!(benches);
