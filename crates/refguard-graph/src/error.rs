//! Error types for registry construction and lookup

use crate::entity::EntityType;
use std::path::PathBuf;

/// Registry errors
///
/// `UnknownParent` is a configuration error, distinct from a registered
/// parent that has no dependents.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Parent type was never registered
    #[error("entity type '{0}' is not registered in the reference graph")]
    UnknownParent(EntityType),

    /// Same `(parent, collection, field)` declared twice
    #[error("duplicate reference: {parent} <- {collection}.{field}")]
    DuplicateReference {
        /// Parent type
        parent: EntityType,
        /// Dependent collection
        collection: String,
        /// Foreign-key field
        field: String,
    },

    /// Blank type, collection, or field name
    #[error("empty {what} in reference declaration")]
    EmptyName {
        /// Which name was empty
        what: &'static str,
    },

    /// Declaration file could not be parsed
    #[error("invalid registry declaration: {0}")]
    Declaration(#[from] toml::de::Error),

    /// Declaration file could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl RegistryError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
