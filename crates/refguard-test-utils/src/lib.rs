//! Testing utilities for refguard workspace
//!
//! Shared fixtures over the catalog graph and store wrappers for fault
//! injection and query accounting.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use refguard_core::{IntegrityConfig, MemoryStore, ReferenceStore, StoreError, ValidationOrchestrator};
use refguard_graph::catalog::{self, collections};
use refguard_graph::EntityId;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Memory store with an index declared for every catalog reference
pub fn indexed_catalog_store() -> MemoryStore {
    let store = MemoryStore::new();
    for spec in catalog::registry().specs() {
        store.create_index(&spec.collection, &spec.foreign_key_field);
    }
    store
}

pub fn catalog_orchestrator<S: ReferenceStore>(store: S, config: IntegrityConfig) -> ValidationOrchestrator<S> {
    ValidationOrchestrator::new(Arc::new(catalog::registry().clone()), store, config).unwrap()
}

/// Catalog documents seeded into a shared memory store
#[derive(Debug, Clone)]
pub struct CatalogFixture {
    pub store: Arc<MemoryStore>,
}

impl Default for CatalogFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogFixture {
    pub fn new() -> Self {
        Self {
            store: Arc::new(indexed_catalog_store()),
        }
    }

    pub fn orchestrator(&self, config: IntegrityConfig) -> ValidationOrchestrator<Arc<MemoryStore>> {
        catalog_orchestrator(Arc::clone(&self.store), config)
    }

    fn put(&self, collection: &str, document: Value) -> EntityId {
        self.store.insert(collection, document).unwrap()
    }

    pub fn add_protocol(&self) -> EntityId {
        let id = EntityId::new();
        self.put(collections::PROTOCOLS, json!({ "id": id.to_string(), "name": "http" }))
    }

    pub fn add_source(&self, protocol_id: EntityId) -> EntityId {
        let id = EntityId::new();
        self.put(
            collections::SOURCES,
            json!({ "id": id.to_string(), "protocolId": protocol_id.to_string() }),
        )
    }

    pub fn add_destination(&self, protocol_id: EntityId) -> EntityId {
        let id = EntityId::new();
        self.put(
            collections::DESTINATIONS,
            json!({ "id": id.to_string(), "protocolId": protocol_id.to_string() }),
        )
    }

    pub fn add_step(&self) -> EntityId {
        let id = EntityId::new();
        self.put(collections::STEPS, json!({ "id": id.to_string(), "kind": "transform" }))
    }

    pub fn add_flow(&self, source_id: EntityId, destination_ids: &[EntityId], step_ids: &[EntityId]) -> EntityId {
        let id = EntityId::new();
        let ids = |list: &[EntityId]| list.iter().map(ToString::to_string).collect::<Vec<_>>();
        self.put(
            collections::FLOWS,
            json!({
                "id": id.to_string(),
                "sourceId": source_id.to_string(),
                "destinationIds": ids(destination_ids),
                "stepIds": ids(step_ids),
            }),
        )
    }

    pub fn add_scheduled_flow(&self, flow_id: EntityId) -> EntityId {
        let id = EntityId::new();
        self.put(
            collections::SCHEDULED_FLOWS,
            json!({ "id": id.to_string(), "flowId": flow_id.to_string(), "cron": "0 * * * *" }),
        )
    }

    pub fn add_assignment(&self, flow_id: EntityId, step_id: EntityId) -> EntityId {
        let id = EntityId::new();
        self.put(
            collections::ASSIGNMENTS,
            json!({ "id": id.to_string(), "flowId": flow_id.to_string(), "stepId": step_id.to_string() }),
        )
    }

    /// Protocol referenced by `sources` sources and `destinations` destinations
    pub fn protocol_with_dependents(&self, sources: usize, destinations: usize) -> (EntityId, Vec<EntityId>, Vec<EntityId>) {
        let protocol = self.add_protocol();
        let source_ids = (0..sources).map(|_| self.add_source(protocol)).collect();
        let destination_ids = (0..destinations).map(|_| self.add_destination(protocol)).collect();
        (protocol, source_ids, destination_ids)
    }

    pub fn remove(&self, collection: &str, id: EntityId) {
        self.store.remove(collection, id);
    }
}

/// Injected behaviour for one collection
#[derive(Debug, Clone)]
pub enum Fault {
    Fail(StoreError),
    Delay(Duration),
}

/// Store wrapper failing or stalling queries on chosen collections
#[derive(Debug)]
pub struct FaultyStore<S> {
    inner: S,
    faults: HashMap<String, Fault>,
}

impl<S: ReferenceStore> FaultyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            faults: HashMap::new(),
        }
    }

    pub fn failing(mut self, collection: &str, error: StoreError) -> Self {
        self.faults.insert(collection.to_string(), Fault::Fail(error));
        self
    }

    pub fn delayed(mut self, collection: &str, delay: Duration) -> Self {
        self.faults.insert(collection.to_string(), Fault::Delay(delay));
        self
    }
}

#[async_trait]
impl<S: ReferenceStore> ReferenceStore for FaultyStore<S> {
    async fn count(
        &self,
        collection: &str,
        field: &str,
        value: EntityId,
        set_membership: bool,
    ) -> Result<u64, StoreError> {
        match self.faults.get(collection) {
            Some(Fault::Fail(error)) => return Err(error.clone()),
            Some(Fault::Delay(delay)) => tokio::time::sleep(*delay).await,
            None => {}
        }
        self.inner.count(collection, field, value, set_membership).await
    }

    async fn has_index(&self, collection: &str, field: &str) -> Result<bool, StoreError> {
        self.inner.has_index(collection, field).await
    }
}

/// Store wrapper recording every count query
#[derive(Debug)]
pub struct CountingStore<S> {
    inner: S,
    queries: Mutex<Vec<(String, String)>>,
}

impl<S: ReferenceStore> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// `(collection, field)` of each query, in issue order
    pub fn queries(&self) -> Vec<(String, String)> {
        self.queries.lock().clone()
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().len()
    }
}

#[async_trait]
impl<S: ReferenceStore> ReferenceStore for CountingStore<S> {
    async fn count(
        &self,
        collection: &str,
        field: &str,
        value: EntityId,
        set_membership: bool,
    ) -> Result<u64, StoreError> {
        self.queries
            .lock()
            .push((collection.to_string(), field.to_string()));
        self.inner.count(collection, field, value, set_membership).await
    }

    async fn has_index(&self, collection: &str, field: &str) -> Result<bool, StoreError> {
        self.inner.has_index(collection, field).await
    }
}
