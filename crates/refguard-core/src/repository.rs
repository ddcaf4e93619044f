//! JSON document repository over [`MemoryStore`]

use crate::guard::EntityRepository;
use crate::store::{document_id, MemoryStore, StoreError};
use async_trait::async_trait;
use refguard_graph::{catalog, EntityId, EntityType};
use serde_json::Value;
use std::sync::Arc;

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// No document with that id
    #[error("{entity_type} {id} not found")]
    NotFound {
        /// Entity type
        entity_type: EntityType,
        /// Requested id
        id: EntityId,
    },

    /// Entity type has no known collection
    #[error("no collection for entity type {0}")]
    UnknownEntityType(EntityType),

    /// Store rejected the write
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One collection of JSON documents, addressed by entity type
#[derive(Debug, Clone)]
pub struct CollectionRepository {
    store: Arc<MemoryStore>,
    entity_type: EntityType,
    collection: String,
}

impl CollectionRepository {
    /// Create repository for an explicit collection
    pub fn new(
        store: Arc<MemoryStore>,
        entity_type: impl Into<EntityType>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            store,
            entity_type: entity_type.into(),
            collection: collection.into(),
        }
    }

    /// Create repository for a catalog entity type
    ///
    /// # Errors
    /// `RepositoryError::UnknownEntityType` if the type is not in the catalog.
    pub fn for_catalog(
        store: Arc<MemoryStore>,
        entity_type: impl Into<EntityType>,
    ) -> Result<Self, RepositoryError> {
        let entity_type = entity_type.into();
        let collection = catalog::collection_of(entity_type.as_str())
            .ok_or_else(|| RepositoryError::UnknownEntityType(entity_type.clone()))?;
        Ok(Self::new(store, entity_type, collection))
    }

    /// Collection name
    #[inline]
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Fetch a document
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<Value> {
        self.store.get(&self.collection, id)
    }

    fn not_found(&self, id: EntityId) -> RepositoryError {
        RepositoryError::NotFound {
            entity_type: self.entity_type.clone(),
            id,
        }
    }
}

#[async_trait]
impl EntityRepository for CollectionRepository {
    type Document = Value;
    type DeleteOutput = Value;
    type UpdateOutput = Value;
    type Error = RepositoryError;

    fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    fn identity(&self, document: &Value) -> Result<EntityId, RepositoryError> {
        Ok(document_id(&self.collection, document)?)
    }

    async fn delete(&self, id: EntityId) -> Result<Value, RepositoryError> {
        self.store
            .remove(&self.collection, id)
            .ok_or_else(|| self.not_found(id))
    }

    async fn update(&self, current_id: EntityId, document: Value) -> Result<Value, RepositoryError> {
        self.store
            .replace(&self.collection, current_id, document.clone())?
            .ok_or_else(|| self.not_found(current_id))?;
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn delete_and_update_roundtrip() {
        let store = Arc::new(MemoryStore::new());
        let repo = CollectionRepository::for_catalog(store.clone(), "StepEntity").unwrap();
        assert_eq!(repo.collection(), "steps");

        let id = EntityId::new();
        store.insert("steps", json!({ "id": id.to_string(), "name": "a" })).unwrap();

        let updated = repo
            .update(id, json!({ "id": id.to_string(), "name": "b" }))
            .await
            .unwrap();
        assert_eq!(updated["name"], "b");

        let removed = repo.delete(id).await.unwrap();
        assert_eq!(removed["name"], "b");
        assert!(matches!(
            repo.delete(id).await.unwrap_err(),
            RepositoryError::NotFound { .. }
        ));
    }

    #[test]
    fn identity_requires_id() {
        let repo = CollectionRepository::new(Arc::new(MemoryStore::new()), "StepEntity", "steps");
        assert!(repo.identity(&json!({})).is_err());
    }

    #[test]
    fn unknown_catalog_type() {
        let err = CollectionRepository::for_catalog(Arc::new(MemoryStore::new()), "WidgetEntity")
            .unwrap_err();
        assert!(matches!(err, RepositoryError::UnknownEntityType(_)));
    }
}
