//! Refguard Core - Referential Integrity Validation Engine
//!
//! Blocks deletes and identity changes of parent entities that dependent
//! documents still reference, for document stores without foreign keys.
//!
//! - [`ReferenceCounter`]: one count query per reference spec
//! - [`ValidationOrchestrator`]: fans out counters, aggregates violations,
//!   fails closed on store errors and timeouts
//! - [`MutationGuard`]: wraps a repository's delete/update
//! - [`ConflictResponse`]: 409 payload for the API layer
//!
//! # Example
//!
//! ```rust,ignore
//! use refguard_core::prelude::*;
//! use refguard_graph::catalog;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new());
//! let registry = Arc::new(catalog::registry().clone());
//! let orchestrator = Arc::new(ValidationOrchestrator::new(registry, store.clone(), IntegrityConfig::new())?);
//!
//! let protocols = CollectionRepository::for_catalog(store, "ProtocolEntity")?;
//! let guard = MutationGuard::new(orchestrator, protocols);
//!
//! match guard.delete(protocol_id).await {
//!     Ok(_) => println!("deleted"),
//!     Err(e) => println!("{} {}", e.status_code(), e.response_body()),
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

pub mod config;
pub mod counter;
pub mod error;
pub mod guard;
pub mod orchestrator;
pub mod repository;
pub mod response;
pub mod result;
pub mod store;

// Re-exports for convenience
pub use config::{ConfigError, IntegrityConfig};
pub use counter::{CounterError, ReferenceCounter};
pub use error::ValidationError;
pub use guard::{EntityRepository, GuardError, MutationGuard, ReferentialIntegrityViolation};
pub use orchestrator::{MissingIndex, ValidationOrchestrator};
pub use repository::{CollectionRepository, RepositoryError};
pub use response::{ConflictResponse, ErrorResponse, ReferencingEntity};
pub use result::{violation_message, SkipReason, ValidationResult, Violation};
pub use store::{MemoryStore, ReferenceStore, Snapshot, StoreError};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for guarding mutations
    pub use crate::{
        CollectionRepository, EntityRepository, GuardError, IntegrityConfig, MemoryStore,
        MutationGuard, ReferenceStore, ValidationOrchestrator, ValidationResult,
    };
    pub use refguard_graph::{EntityId, EntityType, ReferenceRegistry};
    pub use std::sync::Arc;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
