//! Registry coverage audit
//!
//! Every field that stores another entity's id must have exactly one
//! reference spec. A missing spec does not crash anything; deletes simply stop
//! being checked for that field. The audit compares the id-bearing fields the
//! entity schemas declare with what the registry enforces.

use crate::entity::EntityType;
use crate::registry::ReferenceRegistry;
use crate::spec::{Cardinality, ReferenceSpec};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Id-bearing field declared by an entity schema
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeclaredReference {
    /// Entity type owning the field
    pub dependent_type: EntityType,
    /// Collection storing that entity
    pub collection: String,
    /// Field name (dotted for nested fields)
    pub field: String,
    /// Entity type whose id the field stores
    pub target_type: EntityType,
    /// Scalar or list
    pub cardinality: Cardinality,
}

impl DeclaredReference {
    fn matches(&self, spec: &ReferenceSpec) -> bool {
        spec.parent_type == self.target_type
            && spec.collection == self.collection
            && spec.foreign_key_field == self.field
    }
}

impl From<&ReferenceSpec> for DeclaredReference {
    fn from(spec: &ReferenceSpec) -> Self {
        Self {
            dependent_type: spec.dependent_type.clone(),
            collection: spec.collection.clone(),
            field: spec.foreign_key_field.clone(),
            target_type: spec.parent_type.clone(),
            cardinality: spec.cardinality,
        }
    }
}

/// Discrepancy between schemas and registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverageGap {
    /// Schema field with no reference spec
    Missing(DeclaredReference),

    /// Spec exists but disagrees on scalar vs list
    CardinalityMismatch {
        /// Schema side
        declared: DeclaredReference,
        /// Registry side
        registered: Cardinality,
    },

    /// Spec with no schema field behind it
    Stale(ReferenceSpec),
}

impl fmt::Display for CoverageGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(d) => write!(
                f,
                "missing: {}.{} ({}) references {} but is not registered",
                d.collection, d.field, d.dependent_type, d.target_type
            ),
            Self::CardinalityMismatch {
                declared,
                registered,
            } => write!(
                f,
                "cardinality mismatch: {}.{} declared {}, registered {}",
                declared.collection, declared.field, declared.cardinality, registered
            ),
            Self::Stale(spec) => write!(f, "stale: {spec} has no declared field"),
        }
    }
}

impl ReferenceRegistry {
    /// Compare declared id-bearing fields with registered specs
    ///
    /// Gaps are reported in the order of `declared`, followed by stale specs
    /// in registry order.
    #[must_use]
    pub fn audit<'a>(
        &self,
        declared: impl IntoIterator<Item = &'a DeclaredReference>,
    ) -> Vec<CoverageGap> {
        let declared: Vec<&DeclaredReference> = declared.into_iter().collect();
        let mut gaps = Vec::new();

        for field in &declared {
            match self.specs().find(|spec| field.matches(spec)) {
                None => gaps.push(CoverageGap::Missing((*field).clone())),
                Some(spec) if spec.cardinality != field.cardinality => {
                    gaps.push(CoverageGap::CardinalityMismatch {
                        declared: (*field).clone(),
                        registered: spec.cardinality,
                    });
                }
                Some(_) => {}
            }
        }

        for spec in self.specs() {
            if !declared.iter().any(|field| field.matches(spec)) {
                gaps.push(CoverageGap::Stale(spec.clone()));
            }
        }

        gaps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declared(field: &str, cardinality: Cardinality) -> DeclaredReference {
        DeclaredReference {
            dependent_type: EntityType::from_static("FlowEntity"),
            collection: "flows".to_string(),
            field: field.to_string(),
            target_type: EntityType::from_static("StepEntity"),
            cardinality,
        }
    }

    fn registry() -> ReferenceRegistry {
        ReferenceRegistry::builder()
            .reference(ReferenceSpec::set_membership(
                "StepEntity",
                "FlowEntity",
                "flows",
                "stepIds",
            ))
            .build()
            .unwrap()
    }

    #[test]
    fn full_coverage_has_no_gaps() {
        let fields = [declared("stepIds", Cardinality::SetMembership)];
        assert!(registry().audit(&fields).is_empty());
    }

    #[test]
    fn missing_field_reported() {
        let fields = [
            declared("stepIds", Cardinality::SetMembership),
            declared("entryStepId", Cardinality::Scalar),
        ];
        let gaps = registry().audit(&fields);
        assert_eq!(gaps.len(), 1);
        assert!(matches!(&gaps[0], CoverageGap::Missing(d) if d.field == "entryStepId"));
    }

    #[test]
    fn cardinality_mismatch_reported() {
        let fields = [declared("stepIds", Cardinality::Scalar)];
        let gaps = registry().audit(&fields);
        assert!(matches!(
            gaps.as_slice(),
            [CoverageGap::CardinalityMismatch {
                registered: Cardinality::SetMembership,
                ..
            }]
        ));
    }

    #[test]
    fn stale_spec_reported() {
        let gaps = registry().audit(&[]);
        assert_eq!(gaps.len(), 1);
        assert!(gaps[0].to_string().starts_with("stale:"));
    }
}
