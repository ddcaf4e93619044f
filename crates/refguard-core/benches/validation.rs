//! Deletion validation latency over the in-memory catalog store

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use refguard_core::IntegrityConfig;
use refguard_test_utils::CatalogFixture;

fn bench_validate_deletion(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();

    let mut group = c.benchmark_group("validate_deletion");
    for dependents in [0usize, 10, 1_000] {
        let fixture = CatalogFixture::new();
        let (protocol, _, _) = fixture.protocol_with_dependents(dependents, dependents);

        for concurrent in [true, false] {
            let orchestrator = fixture.orchestrator(IntegrityConfig::new().with_concurrent(concurrent));
            let mode = if concurrent { "concurrent" } else { "sequential" };

            group.bench_with_input(BenchmarkId::new(mode, dependents), &protocol, |b, &id| {
                b.to_async(&rt).iter(|| async {
                    black_box(
                        orchestrator
                            .validate_deletion("ProtocolEntity", id)
                            .await
                            .unwrap(),
                    )
                });
            });
        }
    }
    group.finish();
}

fn bench_identity_unchanged(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let fixture = CatalogFixture::new();
    let (protocol, _, _) = fixture.protocol_with_dependents(100, 100);
    let orchestrator = fixture.orchestrator(IntegrityConfig::new());

    c.bench_function("validate_update_same_identity", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(
                orchestrator
                    .validate_update("ProtocolEntity", protocol, protocol)
                    .await
                    .unwrap(),
            )
        });
    });
}

criterion_group!(benches, bench_validate_deletion, bench_identity_unchanged);
criterion_main!(benches);
