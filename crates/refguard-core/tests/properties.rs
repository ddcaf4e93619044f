//! Properties of deletion and update validation over real stores.
//!
//! - counts in the result equal the true document counts, zero-count
//!   dependents never appear
//! - repeated calls with no intervening writes agree
//! - an update that keeps its identity never queries the store
//! - an identity change is checked exactly like deleting the old id
//! - the master switch turns every call into a query-free pass

use proptest::prelude::*;
use refguard_core::{IntegrityConfig, MemoryStore, SkipReason, ValidationResult};
use refguard_graph::catalog::collections;
use refguard_graph::EntityId;
use refguard_test_utils::{catalog_orchestrator, CatalogFixture, CountingStore};
use std::sync::Arc;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn observed(result: &ValidationResult) -> (bool, Vec<(String, u64)>, Option<String>, Option<SkipReason>) {
    (
        result.is_valid(),
        result
            .violations()
            .iter()
            .map(|v| (v.dependent_type.to_string(), v.count))
            .collect(),
        result.message().map(str::to_string),
        result.skip_reason(),
    )
}

proptest! {
    #[test]
    fn counts_match_documents(sources in 0usize..6, destinations in 0usize..6, noise in 0usize..4) {
        let fixture = CatalogFixture::new();
        let (protocol, _, _) = fixture.protocol_with_dependents(sources, destinations);
        // Documents referencing some other protocol.
        let (_, _, _) = fixture.protocol_with_dependents(noise, noise);
        let orchestrator = fixture.orchestrator(IntegrityConfig::new());

        let result = runtime()
            .block_on(orchestrator.validate_deletion("ProtocolEntity", protocol))
            .unwrap();

        let mut expected = Vec::new();
        if sources > 0 {
            expected.push(("SourceEntity".to_string(), sources as u64));
        }
        if destinations > 0 {
            expected.push(("DestinationEntity".to_string(), destinations as u64));
        }
        prop_assert_eq!(result.is_valid(), expected.is_empty());
        prop_assert_eq!(observed(&result).1, expected);
    }

    #[test]
    fn repeated_calls_agree(sources in 0usize..4, destinations in 0usize..4, concurrent: bool) {
        let fixture = CatalogFixture::new();
        let (protocol, _, _) = fixture.protocol_with_dependents(sources, destinations);
        let orchestrator = fixture.orchestrator(IntegrityConfig::new().with_concurrent(concurrent));

        let rt = runtime();
        let first = rt.block_on(orchestrator.validate_deletion("ProtocolEntity", protocol)).unwrap();
        let second = rt.block_on(orchestrator.validate_deletion("ProtocolEntity", protocol)).unwrap();
        prop_assert_eq!(observed(&first), observed(&second));
    }

    #[test]
    fn identity_change_matches_deleting_old_id(sources in 0usize..4, destinations in 0usize..4) {
        let fixture = CatalogFixture::new();
        let (protocol, _, _) = fixture.protocol_with_dependents(sources, destinations);
        let orchestrator = fixture.orchestrator(IntegrityConfig::new());

        let rt = runtime();
        let deletion = rt.block_on(orchestrator.validate_deletion("ProtocolEntity", protocol)).unwrap();
        let update = rt
            .block_on(orchestrator.validate_update("ProtocolEntity", protocol, EntityId::new()))
            .unwrap();
        prop_assert_eq!(observed(&deletion), observed(&update));
    }
}

#[tokio::test]
async fn unchanged_identity_issues_no_queries() {
    let fixture = CatalogFixture::new();
    let (protocol, _, _) = fixture.protocol_with_dependents(2, 2);
    let store = Arc::new(CountingStore::new(Arc::clone(&fixture.store)));
    let orchestrator = catalog_orchestrator(Arc::clone(&store), IntegrityConfig::new());

    let result = orchestrator
        .validate_update("ProtocolEntity", protocol, protocol)
        .await
        .unwrap();

    assert!(result.is_valid());
    assert_eq!(result.skip_reason(), Some(SkipReason::IdentityUnchanged));
    assert_eq!(store.query_count(), 0);
}

#[tokio::test]
async fn disabled_switch_passes_without_queries() {
    let fixture = CatalogFixture::new();
    let (protocol, _, _) = fixture.protocol_with_dependents(5, 5);
    let store = Arc::new(CountingStore::new(Arc::clone(&fixture.store)));
    let orchestrator = catalog_orchestrator(Arc::clone(&store), IntegrityConfig::new().with_enabled(false));

    let deletion = orchestrator
        .validate_deletion("ProtocolEntity", protocol)
        .await
        .unwrap();
    let update = orchestrator
        .validate_update("ProtocolEntity", protocol, EntityId::new())
        .await
        .unwrap();
    let unknown = orchestrator
        .validate_deletion("WidgetEntity", protocol)
        .await
        .unwrap();

    for result in [deletion, update, unknown] {
        assert!(result.is_valid());
        assert_eq!(result.skip_reason(), Some(SkipReason::Disabled));
    }
    assert_eq!(store.query_count(), 0);
}

#[tokio::test]
async fn switched_off_dependent_is_neither_queried_nor_reported() {
    let fixture = CatalogFixture::new();
    let (protocol, _, _) = fixture.protocol_with_dependents(1, 1);
    let store = Arc::new(CountingStore::new(Arc::clone(&fixture.store)));
    let config = IntegrityConfig::new().without_dependent("SourceEntity");
    let orchestrator = catalog_orchestrator(Arc::clone(&store), config);

    let result = orchestrator
        .validate_deletion("ProtocolEntity", protocol)
        .await
        .unwrap();

    assert_eq!(result.violations().len(), 1);
    assert_eq!(result.violations()[0].dependent_type, "DestinationEntity");
    assert_eq!(
        store.queries(),
        vec![(collections::DESTINATIONS.to_string(), "protocolId".to_string())]
    );
}

#[tokio::test]
async fn sequential_mode_queries_in_registry_order() {
    let fixture = CatalogFixture::new();
    let step = fixture.add_step();
    let store = Arc::new(CountingStore::new(Arc::clone(&fixture.store)));
    let orchestrator = catalog_orchestrator(Arc::clone(&store), IntegrityConfig::new().with_concurrent(false));

    orchestrator.validate_deletion("StepEntity", step).await.unwrap();

    assert_eq!(
        store.queries(),
        vec![
            (collections::FLOWS.to_string(), "stepIds".to_string()),
            (collections::ASSIGNMENTS.to_string(), "stepId".to_string()),
        ]
    );
}

#[tokio::test]
async fn snapshot_roundtrip_preserves_counts() {
    let fixture = CatalogFixture::new();
    let (protocol, _, _) = fixture.protocol_with_dependents(2, 1);

    let restored = MemoryStore::from_snapshot(fixture.store.snapshot()).unwrap();
    let orchestrator = catalog_orchestrator(restored, IntegrityConfig::new());

    let result = orchestrator
        .validate_deletion("ProtocolEntity", protocol)
        .await
        .unwrap();
    assert_eq!(result.total_references(), 3);
    assert!(orchestrator.verify_indexes().await.unwrap().is_empty());
}
