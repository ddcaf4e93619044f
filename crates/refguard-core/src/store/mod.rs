//! Store query interface
//!
//! The engine needs exactly one thing from the document store: how many
//! documents in a collection hold a given id in a given field. Correctness
//! does not depend on an index existing for `(collection, field)`, latency
//! does.

mod memory;

pub use memory::{document_id, MemoryStore, Snapshot, ID_FIELD};

use async_trait::async_trait;
use refguard_graph::EntityId;
use std::sync::Arc;

/// Store errors
///
/// Always distinct from a zero count.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Store unreachable
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Query rejected or failed
    #[error("query on {collection}.{field} failed: {message}")]
    Query {
        /// Collection queried
        collection: String,
        /// Field queried
        field: String,
        /// Driver message
        message: String,
    },

    /// Document without a usable id
    #[error("malformed document in {collection}: {message}")]
    Malformed {
        /// Collection
        collection: String,
        /// What was wrong
        message: String,
    },

    /// Id already taken in the collection
    #[error("duplicate id {id} in {collection}")]
    DuplicateKey {
        /// Collection
        collection: String,
        /// Conflicting id
        id: EntityId,
    },
}

/// Read-only reference counting against a document store
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    /// Count documents in `collection` whose `field` equals `value`, or, with
    /// `set_membership`, whose list-valued `field` contains `value`
    async fn count(
        &self,
        collection: &str,
        field: &str,
        value: EntityId,
        set_membership: bool,
    ) -> Result<u64, StoreError>;

    /// Whether `(collection, field)` is backed by an index
    async fn has_index(&self, collection: &str, field: &str) -> Result<bool, StoreError> {
        let _ = (collection, field);
        Ok(true)
    }
}

#[async_trait]
impl<S: ReferenceStore + ?Sized> ReferenceStore for Arc<S> {
    async fn count(
        &self,
        collection: &str,
        field: &str,
        value: EntityId,
        set_membership: bool,
    ) -> Result<u64, StoreError> {
        (**self).count(collection, field, value, set_membership).await
    }

    async fn has_index(&self, collection: &str, field: &str) -> Result<bool, StoreError> {
        (**self).has_index(collection, field).await
    }
}
