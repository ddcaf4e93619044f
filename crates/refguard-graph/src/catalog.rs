//! Reference graph of the entity catalog
//!
//! Protocols are used by sources and destinations; sources, destinations and
//! steps are wired into flows; flows are scheduled and assigned.

use crate::audit::DeclaredReference;
use crate::entity::EntityType;
use crate::error::RegistryError;
use crate::registry::ReferenceRegistry;
use crate::spec::{Cardinality, ReferenceSpec};
use once_cell::sync::Lazy;

/// Entity type names
pub mod types {
    use crate::entity::EntityType;

    /// Protocol
    pub const PROTOCOL: EntityType = EntityType::from_static("ProtocolEntity");
    /// Source
    pub const SOURCE: EntityType = EntityType::from_static("SourceEntity");
    /// Destination
    pub const DESTINATION: EntityType = EntityType::from_static("DestinationEntity");
    /// Step
    pub const STEP: EntityType = EntityType::from_static("StepEntity");
    /// Flow
    pub const FLOW: EntityType = EntityType::from_static("FlowEntity");
    /// Scheduled flow
    pub const SCHEDULED_FLOW: EntityType = EntityType::from_static("ScheduledFlowEntity");
    /// Assignment
    pub const ASSIGNMENT: EntityType = EntityType::from_static("AssignmentEntity");
}

/// Storage collection names
pub mod collections {
    /// Protocol documents
    pub const PROTOCOLS: &str = "protocols";
    /// Source documents
    pub const SOURCES: &str = "sources";
    /// Destination documents
    pub const DESTINATIONS: &str = "destinations";
    /// Step documents
    pub const STEPS: &str = "steps";
    /// Flow documents
    pub const FLOWS: &str = "flows";
    /// Scheduled flow documents
    pub const SCHEDULED_FLOWS: &str = "scheduledflows";
    /// Assignment documents
    pub const ASSIGNMENTS: &str = "assignments";
}

/// Collection storing documents of an entity type
#[must_use]
pub fn collection_of(entity_type: &str) -> Option<&'static str> {
    let collection = match entity_type {
        "ProtocolEntity" => collections::PROTOCOLS,
        "SourceEntity" => collections::SOURCES,
        "DestinationEntity" => collections::DESTINATIONS,
        "StepEntity" => collections::STEPS,
        "FlowEntity" => collections::FLOWS,
        "ScheduledFlowEntity" => collections::SCHEDULED_FLOWS,
        "AssignmentEntity" => collections::ASSIGNMENTS,
        _ => return None,
    };
    Some(collection)
}

type Reference = (EntityType, EntityType, &'static str, &'static str, Cardinality);

// (parent, dependent, collection, field, cardinality) in reporting order.
#[rustfmt::skip]
const REFERENCES: &[Reference] = &[
    (types::PROTOCOL, types::SOURCE, collections::SOURCES, "protocolId", Cardinality::Scalar),
    (types::PROTOCOL, types::DESTINATION, collections::DESTINATIONS, "protocolId", Cardinality::Scalar),
    (types::SOURCE, types::FLOW, collections::FLOWS, "sourceId", Cardinality::Scalar),
    (types::DESTINATION, types::FLOW, collections::FLOWS, "destinationIds", Cardinality::SetMembership),
    (types::STEP, types::FLOW, collections::FLOWS, "stepIds", Cardinality::SetMembership),
    (types::STEP, types::ASSIGNMENT, collections::ASSIGNMENTS, "stepId", Cardinality::Scalar),
    (types::FLOW, types::SCHEDULED_FLOW, collections::SCHEDULED_FLOWS, "flowId", Cardinality::Scalar),
    (types::FLOW, types::ASSIGNMENT, collections::ASSIGNMENTS, "flowId", Cardinality::Scalar),
];

const LEAVES: &[EntityType] = &[types::SCHEDULED_FLOW, types::ASSIGNMENT];

// Id-bearing fields per entity schema: (entity, collection, field, target, cardinality).
// Kept apart from REFERENCES; a field added here without a reference row is
// an audit gap.
#[rustfmt::skip]
const SCHEMA_FIELDS: &[(EntityType, &str, &str, EntityType, Cardinality)] = &[
    (types::SOURCE, collections::SOURCES, "protocolId", types::PROTOCOL, Cardinality::Scalar),
    (types::DESTINATION, collections::DESTINATIONS, "protocolId", types::PROTOCOL, Cardinality::Scalar),
    (types::FLOW, collections::FLOWS, "sourceId", types::SOURCE, Cardinality::Scalar),
    (types::FLOW, collections::FLOWS, "destinationIds", types::DESTINATION, Cardinality::SetMembership),
    (types::FLOW, collections::FLOWS, "stepIds", types::STEP, Cardinality::SetMembership),
    (types::SCHEDULED_FLOW, collections::SCHEDULED_FLOWS, "flowId", types::FLOW, Cardinality::Scalar),
    (types::ASSIGNMENT, collections::ASSIGNMENTS, "flowId", types::FLOW, Cardinality::Scalar),
    (types::ASSIGNMENT, collections::ASSIGNMENTS, "stepId", types::STEP, Cardinality::Scalar),
];

fn build_registry(
    references: &[Reference],
    leaves: &[EntityType],
) -> Result<ReferenceRegistry, RegistryError> {
    let mut builder = ReferenceRegistry::builder();
    for (parent, dependent, collection, field, cardinality) in references {
        builder = builder.reference(ReferenceSpec {
            parent_type: parent.clone(),
            dependent_type: dependent.clone(),
            collection: (*collection).to_string(),
            foreign_key_field: (*field).to_string(),
            cardinality: *cardinality,
        });
    }
    for leaf in leaves {
        builder = builder.parent(leaf.clone());
    }
    builder.build()
}

static REGISTRY: Lazy<ReferenceRegistry> = Lazy::new(|| {
    build_registry(REFERENCES, LEAVES).unwrap_or_else(|error| {
        // Every lookup then fails with UnknownParent.
        tracing::error!(%error, "catalog reference table is invalid; registry left empty");
        ReferenceRegistry::default()
    })
});

/// The catalog reference graph
#[must_use]
pub fn registry() -> &'static ReferenceRegistry {
    &REGISTRY
}

/// Id-bearing fields declared by the catalog entity schemas
#[must_use]
pub fn declared_references() -> Vec<DeclaredReference> {
    SCHEMA_FIELDS
        .iter()
        .map(|(entity, collection, field, target, cardinality)| DeclaredReference {
            dependent_type: entity.clone(),
            collection: (*collection).to_string(),
            field: (*field).to_string(),
            target_type: target.clone(),
            cardinality: *cardinality,
        })
        .collect()
}
