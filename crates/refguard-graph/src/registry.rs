//! Reference graph registry
//!
//! Maps each parent entity type to the dependents that may reference it.
//! Built once at startup, read-only afterwards.
//!
//! Lookup order is declaration order. It decides the order in which
//! violations are reported, so it must not depend on hashing.

use crate::entity::EntityType;
use crate::error::RegistryError;
use crate::spec::ReferenceSpec;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Immutable registry of reference specs keyed by parent type
#[derive(Debug, Clone, Default)]
pub struct ReferenceRegistry {
    parents: IndexMap<EntityType, Vec<ReferenceSpec>>,
}

impl ReferenceRegistry {
    /// Start building a registry
    #[inline]
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Build from a parsed declaration
    ///
    /// # Errors
    /// Same as [`RegistryBuilder::build`].
    pub fn from_declaration(declaration: RegistryDeclaration) -> Result<Self, RegistryError> {
        let mut builder = Self::builder();
        for parent in declaration.parents {
            builder = builder.parent(parent);
        }
        for spec in declaration.references {
            builder = builder.reference(spec);
        }
        builder.build()
    }

    /// Parse a TOML declaration
    ///
    /// # Errors
    /// - `RegistryError::Declaration` on malformed TOML
    /// - any [`RegistryBuilder::build`] error
    pub fn from_toml_str(source: &str) -> Result<Self, RegistryError> {
        let declaration: RegistryDeclaration = toml::from_str(source)?;
        Self::from_declaration(declaration)
    }

    /// Read and parse a TOML declaration file
    ///
    /// # Errors
    /// - `RegistryError::Io` if the file cannot be read
    /// - any [`ReferenceRegistry::from_toml_str`] error
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let source =
            std::fs::read_to_string(path).map_err(|e| RegistryError::io_error(path, e))?;
        Self::from_toml_str(&source)
    }

    /// Dependents of a parent type, in declaration order
    ///
    /// Returns an empty slice for a registered parent without dependents.
    ///
    /// # Errors
    /// `RegistryError::UnknownParent` if the type was never registered.
    pub fn dependents_of(&self, parent_type: &str) -> Result<&[ReferenceSpec], RegistryError> {
        self.parents
            .get(parent_type)
            .map(Vec::as_slice)
            .ok_or_else(|| RegistryError::UnknownParent(EntityType::new(parent_type)))
    }

    /// Check if parent type is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, parent_type: &str) -> bool {
        self.parents.contains_key(parent_type)
    }

    /// Registered parent types in declaration order
    pub fn parents(&self) -> impl Iterator<Item = &EntityType> {
        self.parents.keys()
    }

    /// All specs, grouped by parent in declaration order
    pub fn specs(&self) -> impl Iterator<Item = &ReferenceSpec> {
        self.parents.values().flatten()
    }

    /// Number of registered parent types
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    /// Check if registry has no parent types
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Export as a declaration, preserving order
    #[must_use]
    pub fn to_declaration(&self) -> RegistryDeclaration {
        RegistryDeclaration {
            parents: self
                .parents
                .iter()
                .filter(|(_, specs)| specs.is_empty())
                .map(|(parent, _)| parent.clone())
                .collect(),
            references: self.specs().cloned().collect(),
        }
    }
}

/// Serialized registry form
///
/// ```toml
/// parents = ["ScheduledFlowEntity"]
///
/// [[reference]]
/// parent_type = "ProtocolEntity"
/// dependent_type = "SourceEntity"
/// collection = "sources"
/// foreign_key_field = "protocolId"
/// cardinality = "scalar"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryDeclaration {
    /// Parent types registered without (or ahead of) their references
    #[serde(default)]
    pub parents: Vec<EntityType>,
    /// Reference specs in reporting order
    #[serde(default, rename = "reference")]
    pub references: Vec<ReferenceSpec>,
}

/// Builder for [`ReferenceRegistry`]
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    parents: Vec<EntityType>,
    references: Vec<ReferenceSpec>,
}

impl RegistryBuilder {
    /// Register a parent type
    #[must_use]
    pub fn parent(mut self, parent_type: impl Into<EntityType>) -> Self {
        self.parents.push(parent_type.into());
        self
    }

    /// Append a reference spec; its parent is registered implicitly
    #[must_use]
    pub fn reference(mut self, spec: ReferenceSpec) -> Self {
        self.references.push(spec);
        self
    }

    /// Validate and freeze
    ///
    /// # Errors
    /// - `RegistryError::EmptyName` for a blank type, collection, or field
    /// - `RegistryError::DuplicateReference` if a `(parent, collection, field)`
    ///   triple appears twice
    pub fn build(self) -> Result<ReferenceRegistry, RegistryError> {
        let mut parents: IndexMap<EntityType, Vec<ReferenceSpec>> = IndexMap::new();

        for parent in self.parents {
            if parent.is_blank() {
                return Err(RegistryError::EmptyName { what: "parent type" });
            }
            parents.entry(parent).or_default();
        }

        let mut seen = HashSet::new();
        for spec in self.references {
            check_names(&spec)?;

            let key = (
                spec.parent_type.clone(),
                spec.collection.clone(),
                spec.foreign_key_field.clone(),
            );
            if !seen.insert(key) {
                return Err(RegistryError::DuplicateReference {
                    parent: spec.parent_type,
                    collection: spec.collection,
                    field: spec.foreign_key_field,
                });
            }

            parents.entry(spec.parent_type.clone()).or_default().push(spec);
        }

        Ok(ReferenceRegistry { parents })
    }
}

fn check_names(spec: &ReferenceSpec) -> Result<(), RegistryError> {
    if spec.parent_type.is_blank() {
        return Err(RegistryError::EmptyName { what: "parent type" });
    }
    if spec.dependent_type.is_blank() {
        return Err(RegistryError::EmptyName {
            what: "dependent type",
        });
    }
    if spec.collection.trim().is_empty() {
        return Err(RegistryError::EmptyName { what: "collection" });
    }
    if spec.foreign_key_field.trim().is_empty() {
        return Err(RegistryError::EmptyName {
            what: "foreign key field",
        });
    }
    Ok(())
}
