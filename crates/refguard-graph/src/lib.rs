//! Refguard Reference Graph
//!
//! Declarative table of which entity types reference which.
//!
//! # Overview
//!
//! - [`EntityId`] / [`EntityType`]: identity of documents and their types
//! - [`ReferenceSpec`]: one parent → dependent relationship (collection,
//!   foreign-key field, [`Cardinality`])
//! - [`ReferenceRegistry`]: all specs keyed by parent type, in declaration
//!   order
//! - [`ReferenceRegistry::audit`]: detects id-bearing fields with no spec
//! - [`catalog`]: the built-in catalog graph
//!
//! # Example
//!
//! ```rust
//! use refguard_graph::{ReferenceRegistry, ReferenceSpec};
//!
//! let registry = ReferenceRegistry::builder()
//!     .reference(ReferenceSpec::scalar("ProtocolEntity", "SourceEntity", "sources", "protocolId"))
//!     .parent("SourceEntity")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(registry.dependents_of("ProtocolEntity").unwrap().len(), 1);
//! assert!(registry.dependents_of("SourceEntity").unwrap().is_empty());
//! assert!(registry.dependents_of("WidgetEntity").is_err());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod audit;
pub mod catalog;
pub mod entity;
pub mod error;
pub mod registry;
pub mod spec;

// Re-exports
pub use audit::{CoverageGap, DeclaredReference};
pub use entity::{EntityId, EntityType};
pub use error::RegistryError;
pub use registry::{ReferenceRegistry, RegistryBuilder, RegistryDeclaration};
pub use spec::{Cardinality, ReferenceSpec};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
