//! Reference specifications
//!
//! A [`ReferenceSpec`] declares that documents of one dependent entity type
//! store the id of a parent entity in a given collection field.

use crate::entity::EntityType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a dependent document holds the parent id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// Field holds a single id
    Scalar,

    /// Field holds a list of ids
    SetMembership,
}

impl Cardinality {
    /// Whether the count query must test list membership
    #[inline]
    #[must_use]
    pub fn is_set_membership(self) -> bool {
        matches!(self, Self::SetMembership)
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar => f.write_str("scalar"),
            Self::SetMembership => f.write_str("set_membership"),
        }
    }
}

/// One declared parent → dependent relationship
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceSpec {
    /// Entity type being referenced
    pub parent_type: EntityType,
    /// Entity type holding the reference
    pub dependent_type: EntityType,
    /// Storage collection of the dependent documents
    pub collection: String,
    /// Field holding the parent id; dotted paths address nested documents
    pub foreign_key_field: String,
    /// Scalar field or list membership
    pub cardinality: Cardinality,
}

impl ReferenceSpec {
    /// Scalar reference
    pub fn scalar(
        parent_type: impl Into<EntityType>,
        dependent_type: impl Into<EntityType>,
        collection: impl Into<String>,
        foreign_key_field: impl Into<String>,
    ) -> Self {
        Self {
            parent_type: parent_type.into(),
            dependent_type: dependent_type.into(),
            collection: collection.into(),
            foreign_key_field: foreign_key_field.into(),
            cardinality: Cardinality::Scalar,
        }
    }

    /// List-membership reference
    pub fn set_membership(
        parent_type: impl Into<EntityType>,
        dependent_type: impl Into<EntityType>,
        collection: impl Into<String>,
        foreign_key_field: impl Into<String>,
    ) -> Self {
        Self {
            cardinality: Cardinality::SetMembership,
            ..Self::scalar(parent_type, dependent_type, collection, foreign_key_field)
        }
    }

    /// `(collection, field)` pair the count query runs against
    #[inline]
    #[must_use]
    pub fn location(&self) -> (&str, &str) {
        (&self.collection, &self.foreign_key_field)
    }
}

impl fmt::Display for ReferenceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} <- {} ({}.{}, {})",
            self.parent_type,
            self.dependent_type,
            self.collection,
            self.foreign_key_field,
            self.cardinality
        )
    }
}
