//! Reference counter
//!
//! One read-only count query per [`ReferenceSpec`]. A failed query is a
//! [`CounterError`], never a count of zero.

use crate::store::{ReferenceStore, StoreError};
use refguard_graph::{EntityId, EntityType, ReferenceSpec};

/// Count query failure for one reference spec
#[derive(Debug, Clone, thiserror::Error)]
#[error("counting {dependent_type} references in {collection}.{field} failed: {source}")]
pub struct CounterError {
    /// Dependent type being counted
    pub dependent_type: EntityType,
    /// Collection queried
    pub collection: String,
    /// Field queried
    pub field: String,
    /// Store failure
    #[source]
    pub source: StoreError,
}

/// Executes count queries against a [`ReferenceStore`]
#[derive(Debug)]
pub struct ReferenceCounter<S> {
    store: S,
}

impl<S: ReferenceStore> ReferenceCounter<S> {
    /// Create counter over a store
    #[inline]
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Underlying store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Number of dependent documents referencing `target` through `spec`
    ///
    /// # Errors
    /// `CounterError` wrapping the store failure.
    pub async fn count(&self, spec: &ReferenceSpec, target: EntityId) -> Result<u64, CounterError> {
        let (collection, field) = spec.location();

        match self
            .store
            .count(collection, field, target, spec.cardinality.is_set_membership())
            .await
        {
            Ok(count) => {
                tracing::debug!(
                    dependent = %spec.dependent_type,
                    collection,
                    field,
                    count,
                    "reference count"
                );
                Ok(count)
            }
            Err(source) => {
                tracing::error!(
                    dependent = %spec.dependent_type,
                    collection,
                    field,
                    error = %source,
                    "reference count failed"
                );
                Err(CounterError {
                    dependent_type: spec.dependent_type.clone(),
                    collection: collection.to_string(),
                    field: field.to_string(),
                    source,
                })
            }
        }
    }
}
