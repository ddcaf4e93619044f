//! In-memory document store
//!
//! Collections of JSON documents keyed by their `id` field. Used as the
//! reference adapter for the CLI and tests; it keeps no real indexes, only
//! the list of declared ones so index verification has something to report.

use super::{ReferenceStore, StoreError};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use indexmap::IndexMap;
use refguard_graph::EntityId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field every document carries its identity in
pub const ID_FIELD: &str = "id";

/// Serialized store contents
///
/// ```json
/// { "collections": { "sources": [ { "id": "…", "protocolId": "…" } ] },
///   "indexes": [ ["sources", "protocolId"] ] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Documents per collection
    #[serde(default)]
    pub collections: IndexMap<String, Vec<Value>>,
    /// Declared `(collection, field)` indexes
    #[serde(default)]
    pub indexes: Vec<(String, String)>,
}

/// Concurrent in-memory document store
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: DashMap<String, IndexMap<EntityId, Value>>,
    indexes: DashSet<(String, String)>,
}

impl MemoryStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a snapshot
    ///
    /// # Errors
    /// `StoreError::Malformed` if a document has no valid id.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, StoreError> {
        let store = Self::new();
        store.load_snapshot(snapshot)?;
        Ok(store)
    }

    /// Insert documents and indexes from a snapshot
    ///
    /// Returns the number of documents inserted.
    ///
    /// # Errors
    /// - `StoreError::Malformed` if a document has no valid id
    /// - `StoreError::DuplicateKey` if an id repeats within a collection or is
    ///   already stored
    pub fn load_snapshot(&self, snapshot: Snapshot) -> Result<usize, StoreError> {
        let mut inserted = 0;
        for (collection, documents) in snapshot.collections {
            for document in documents {
                self.insert(&collection, document)?;
                inserted += 1;
            }
        }
        for (collection, field) in snapshot.indexes {
            self.create_index(&collection, &field);
        }
        Ok(inserted)
    }

    /// Insert a new document
    ///
    /// # Errors
    /// - `StoreError::Malformed` if the document has no valid id
    /// - `StoreError::DuplicateKey` if the id is already stored (nothing written)
    pub fn insert(&self, collection: &str, document: Value) -> Result<EntityId, StoreError> {
        let id = document_id(collection, &document)?;
        let mut documents = self.collections.entry(collection.to_string()).or_default();
        if documents.contains_key(&id) {
            return Err(StoreError::DuplicateKey {
                collection: collection.to_string(),
                id,
            });
        }
        documents.insert(id, document);
        Ok(id)
    }

    /// Insert a document, overwriting any stored under the same id
    ///
    /// Returns the overwritten document.
    ///
    /// # Errors
    /// `StoreError::Malformed` if the document has no valid id.
    pub fn upsert(&self, collection: &str, document: Value) -> Result<Option<Value>, StoreError> {
        let id = document_id(collection, &document)?;
        Ok(self
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id, document))
    }

    /// Replace the document stored under `current_id`
    ///
    /// The replacement may carry a different id. Returns the previous
    /// document, or `None` if `current_id` was not present (nothing written).
    ///
    /// # Errors
    /// - `StoreError::Malformed` if the replacement has no valid id
    /// - `StoreError::DuplicateKey` if the new id belongs to another document
    pub fn replace(
        &self,
        collection: &str,
        current_id: EntityId,
        document: Value,
    ) -> Result<Option<Value>, StoreError> {
        let new_id = document_id(collection, &document)?;
        let Some(mut documents) = self.collections.get_mut(collection) else {
            return Ok(None);
        };
        if !documents.contains_key(&current_id) {
            return Ok(None);
        }
        if new_id != current_id && documents.contains_key(&new_id) {
            return Err(StoreError::DuplicateKey {
                collection: collection.to_string(),
                id: new_id,
            });
        }

        let previous = documents.shift_remove(&current_id);
        documents.insert(new_id, document);
        Ok(previous)
    }

    /// Remove a document
    pub fn remove(&self, collection: &str, id: EntityId) -> Option<Value> {
        self.collections
            .get_mut(collection)
            .and_then(|mut documents| documents.shift_remove(&id))
    }

    /// Fetch a copy of a document
    #[must_use]
    pub fn get(&self, collection: &str, id: EntityId) -> Option<Value> {
        self.collections
            .get(collection)
            .and_then(|documents| documents.get(&id).cloned())
    }

    /// Number of documents in a collection
    #[must_use]
    pub fn len(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, |d| d.len())
    }

    /// Check if a collection holds no documents
    #[must_use]
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Declare an index on `(collection, field)`
    pub fn create_index(&self, collection: &str, field: &str) {
        self.indexes.insert((collection.to_string(), field.to_string()));
    }

    /// Export current contents
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let mut collections: IndexMap<String, Vec<Value>> = self
            .collections
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().values().cloned().collect()))
            .collect();
        collections.sort_keys();

        let mut indexes: Vec<(String, String)> =
            self.indexes.iter().map(|pair| pair.key().clone()).collect();
        indexes.sort();

        Snapshot {
            collections,
            indexes,
        }
    }
}

#[async_trait]
impl ReferenceStore for MemoryStore {
    async fn count(
        &self,
        collection: &str,
        field: &str,
        value: EntityId,
        set_membership: bool,
    ) -> Result<u64, StoreError> {
        let Some(documents) = self.collections.get(collection) else {
            return Ok(0);
        };

        let matches = documents
            .values()
            .filter_map(|document| resolve_field(document, field))
            .filter(|stored| {
                if set_membership {
                    stored
                        .as_array()
                        .is_some_and(|items| items.iter().any(|item| holds_id(item, value)))
                } else {
                    holds_id(stored, value)
                }
            })
            .count();

        Ok(u64::try_from(matches).unwrap_or(u64::MAX))
    }

    async fn has_index(&self, collection: &str, field: &str) -> Result<bool, StoreError> {
        Ok(self
            .indexes
            .contains(&(collection.to_string(), field.to_string())))
    }
}

/// Read the id of a document
///
/// # Errors
/// `StoreError::Malformed` if `id` is missing or not a UUID string.
pub fn document_id(collection: &str, document: &Value) -> Result<EntityId, StoreError> {
    document
        .get(ID_FIELD)
        .and_then(Value::as_str)
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(|| StoreError::Malformed {
            collection: collection.to_string(),
            message: format!("document has no valid '{ID_FIELD}' field"),
        })
}

// Dotted paths walk nested objects: "config.protocolId".
fn resolve_field<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(document, |current, segment| current.get(segment))
}

fn holds_id(stored: &Value, id: EntityId) -> bool {
    stored
        .as_str()
        .and_then(|raw| raw.parse::<EntityId>().ok())
        .is_some_and(|stored| stored == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: EntityId, extra: Value) -> Value {
        let mut document = json!({ "id": id.to_string() });
        if let (Some(target), Some(source)) = (document.as_object_mut(), extra.as_object()) {
            target.extend(source.clone());
        }
        document
    }

    #[tokio::test]
    async fn counts_scalar_references() {
        let store = MemoryStore::new();
        let protocol = EntityId::new();
        let other = EntityId::new();
        for target in [protocol, protocol, other] {
            store
                .insert("sources", doc(EntityId::new(), json!({ "protocolId": target.to_string() })))
                .unwrap();
        }
        store.insert("sources", doc(EntityId::new(), json!({}))).unwrap();

        assert_eq!(store.count("sources", "protocolId", protocol, false).await.unwrap(), 2);
        assert_eq!(store.count("sources", "protocolId", other, false).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn counts_set_membership() {
        let store = MemoryStore::new();
        let destination = EntityId::new();
        store
            .insert(
                "flows",
                doc(
                    EntityId::new(),
                    json!({ "destinationIds": [EntityId::new().to_string(), destination.to_string()] }),
                ),
            )
            .unwrap();
        store
            .insert("flows", doc(EntityId::new(), json!({ "destinationIds": [] })))
            .unwrap();

        assert_eq!(store.count("flows", "destinationIds", destination, true).await.unwrap(), 1);
        // scalar query does not look inside lists
        assert_eq!(store.count("flows", "destinationIds", destination, false).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn id_comparison_ignores_case() {
        let store = MemoryStore::new();
        let protocol = EntityId::new();
        store
            .insert(
                "sources",
                doc(EntityId::new(), json!({ "protocolId": protocol.to_string().to_uppercase() })),
            )
            .unwrap();
        assert_eq!(store.count("sources", "protocolId", protocol, false).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn nested_field_path() {
        let store = MemoryStore::new();
        let protocol = EntityId::new();
        store
            .insert(
                "sources",
                doc(EntityId::new(), json!({ "config": { "protocolId": protocol.to_string() } })),
            )
            .unwrap();
        assert_eq!(store.count("sources", "config.protocolId", protocol, false).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unknown_collection_counts_zero() {
        let store = MemoryStore::new();
        assert_eq!(store.count("nothing", "x", EntityId::new(), false).await.unwrap(), 0);
    }

    #[test]
    fn insert_requires_id() {
        let store = MemoryStore::new();
        let err = store.insert("sources", json!({ "name": "x" })).unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
    }

    #[test]
    fn insert_rejects_taken_id() {
        let store = MemoryStore::new();
        let id = EntityId::new();
        store.insert("flows", doc(id, json!({ "name": "first" }))).unwrap();

        let err = store.insert("flows", doc(id, json!({ "name": "second" }))).unwrap_err();

        assert!(matches!(err, StoreError::DuplicateKey { id: taken, .. } if taken == id));
        assert_eq!(store.get("flows", id).unwrap()["name"], "first");
    }

    #[test]
    fn upsert_overwrites() {
        let store = MemoryStore::new();
        let id = EntityId::new();
        assert_eq!(store.upsert("flows", doc(id, json!({ "name": "first" }))).unwrap(), None);

        let previous = store.upsert("flows", doc(id, json!({ "name": "second" }))).unwrap();

        assert_eq!(previous.unwrap()["name"], "first");
        assert_eq!(store.get("flows", id).unwrap()["name"], "second");
        assert_eq!(store.len("flows"), 1);
    }

    #[test]
    fn snapshot_with_repeated_id_is_rejected() {
        let flow = EntityId::new();
        let destination = EntityId::new();
        let mut snapshot = Snapshot::default();
        snapshot.collections.insert(
            "flows".to_string(),
            vec![
                doc(flow, json!({ "destinationIds": [destination.to_string()] })),
                doc(flow, json!({ "destinationIds": [] })),
            ],
        );

        let err = MemoryStore::from_snapshot(snapshot).unwrap_err();

        assert!(matches!(err, StoreError::DuplicateKey { ref collection, id } if collection == "flows" && id == flow));
    }

    #[test]
    fn replace_changes_identity() {
        let store = MemoryStore::new();
        let old = EntityId::new();
        let new = EntityId::new();
        store.insert("protocols", doc(old, json!({ "name": "a" }))).unwrap();

        let previous = store.replace("protocols", old, doc(new, json!({ "name": "b" }))).unwrap();
        assert!(previous.is_some());
        assert!(store.get("protocols", old).is_none());
        assert_eq!(store.get("protocols", new).unwrap()["name"], "b");
    }

    #[test]
    fn replace_rejects_taken_id() {
        let store = MemoryStore::new();
        let a = EntityId::new();
        let b = EntityId::new();
        store.insert("protocols", doc(a, json!({}))).unwrap();
        store.insert("protocols", doc(b, json!({}))).unwrap();

        let err = store.replace("protocols", a, doc(b, json!({}))).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { id, .. } if id == b));
    }

    #[test]
    fn replace_missing_writes_nothing() {
        let store = MemoryStore::new();
        let result = store.replace("protocols", EntityId::new(), doc(EntityId::new(), json!({})));
        assert_eq!(result.unwrap(), None);
        assert!(store.is_empty("protocols"));
    }

    #[tokio::test]
    async fn snapshot_roundtrip_keeps_indexes() {
        let store = MemoryStore::new();
        store.insert("steps", doc(EntityId::new(), json!({}))).unwrap();
        store.create_index("flows", "stepIds");

        let restored = MemoryStore::from_snapshot(store.snapshot()).unwrap();
        assert_eq!(restored.len("steps"), 1);
        assert!(restored.has_index("flows", "stepIds").await.unwrap());
        assert!(!restored.has_index("flows", "sourceId").await.unwrap());
    }
}
