//! Mutation guard
//!
//! Wraps a repository's delete/update primitives. A blocked validation
//! raises [`ReferentialIntegrityViolation`] and the primitive is never called.
//! Validation failures propagate as [`GuardError::Validation`], visibly
//! distinct from a violation.

use crate::error::ValidationError;
use crate::orchestrator::ValidationOrchestrator;
use crate::result::ValidationResult;
use crate::store::ReferenceStore;
use async_trait::async_trait;
use refguard_graph::{EntityId, EntityType};
use std::sync::Arc;

/// Underlying delete/update primitives of one entity type
#[async_trait]
pub trait EntityRepository: Send + Sync {
    /// Stored document
    type Document: Send + Sync;
    /// Result of a delete
    type DeleteOutput: Send;
    /// Result of an update
    type UpdateOutput: Send;
    /// Repository failure
    type Error: std::error::Error + Send + Sync + 'static;

    /// Entity type this repository stores
    fn entity_type(&self) -> &EntityType;

    /// Identity carried by a document
    ///
    /// # Errors
    /// Repository-specific, e.g. the document has no id.
    fn identity(&self, document: &Self::Document) -> Result<EntityId, Self::Error>;

    /// Delete the document with `id`
    async fn delete(&self, id: EntityId) -> Result<Self::DeleteOutput, Self::Error>;

    /// Replace the document stored under `current_id`
    async fn update(
        &self,
        current_id: EntityId,
        document: Self::Document,
    ) -> Result<Self::UpdateOutput, Self::Error>;
}

/// Mutation blocked by existing references
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ReferentialIntegrityViolation {
    message: String,
    result: ValidationResult,
}

impl ReferentialIntegrityViolation {
    /// Wrap a blocked result; `None` if the result is valid
    #[must_use]
    pub fn from_result(result: ValidationResult) -> Option<Self> {
        let message = result.message()?.to_string();
        Some(Self { message, result })
    }

    /// Consolidated message
    #[inline]
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Full validation result
    #[inline]
    #[must_use]
    pub fn result(&self) -> &ValidationResult {
        &self.result
    }
}

/// Guarded mutation errors
#[derive(Debug, thiserror::Error)]
pub enum GuardError<E>
where
    E: std::error::Error + 'static,
{
    /// References exist; remove them first
    #[error(transparent)]
    Violation(#[from] ReferentialIntegrityViolation),

    /// Could not determine whether the mutation is safe
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Underlying primitive failed
    #[error("repository error: {0}")]
    Repository(#[source] E),
}

impl<E: std::error::Error + 'static> GuardError<E> {
    /// Check for an integrity violation
    #[inline]
    #[must_use]
    pub fn is_violation(&self) -> bool {
        matches!(self, Self::Violation(_))
    }

    /// The violation, if that is what this is
    #[inline]
    #[must_use]
    pub fn violation(&self) -> Option<&ReferentialIntegrityViolation> {
        match self {
            Self::Violation(v) => Some(v),
            _ => None,
        }
    }
}

/// Repository wrapper enforcing referential integrity
#[derive(Debug)]
pub struct MutationGuard<S, R> {
    orchestrator: Arc<ValidationOrchestrator<S>>,
    repository: R,
}

impl<S, R> MutationGuard<S, R>
where
    S: ReferenceStore,
    R: EntityRepository,
{
    /// Guard a repository
    #[inline]
    #[must_use]
    pub fn new(orchestrator: Arc<ValidationOrchestrator<S>>, repository: R) -> Self {
        Self {
            orchestrator,
            repository,
        }
    }

    /// Guarded repository
    #[inline]
    #[must_use]
    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Validate, then delete
    ///
    /// # Errors
    /// - `GuardError::Violation` if references exist (nothing deleted)
    /// - `GuardError::Validation` if validation could not complete (nothing deleted)
    /// - `GuardError::Repository` if the delete itself fails
    pub async fn delete(&self, id: EntityId) -> Result<R::DeleteOutput, GuardError<R::Error>> {
        let entity_type = self.repository.entity_type();
        let result = self
            .orchestrator
            .validate_deletion(entity_type.as_str(), id)
            .await?;
        ensure_valid(result)?;

        tracing::debug!(%entity_type, %id, "delete permitted");
        self.repository.delete(id).await.map_err(GuardError::Repository)
    }

    /// Update, validating only when the identity changes
    ///
    /// # Errors
    /// - `GuardError::Violation` if the old id is still referenced (nothing written)
    /// - `GuardError::Validation` if validation could not complete (nothing written)
    /// - `GuardError::Repository` if the identity cannot be read or the update fails
    pub async fn update(
        &self,
        current_id: EntityId,
        document: R::Document,
    ) -> Result<R::UpdateOutput, GuardError<R::Error>> {
        let entity_type = self.repository.entity_type();
        let new_id = self
            .repository
            .identity(&document)
            .map_err(GuardError::Repository)?;

        if new_id == current_id {
            tracing::trace!(%entity_type, %current_id, "identity unchanged");
        } else {
            let result = self
                .orchestrator
                .validate_update(entity_type.as_str(), current_id, new_id)
                .await?;
            ensure_valid(result)?;
            tracing::debug!(%entity_type, %current_id, %new_id, "identity change permitted");
        }

        self.repository
            .update(current_id, document)
            .await
            .map_err(GuardError::Repository)
    }
}

fn ensure_valid(result: ValidationResult) -> Result<(), ReferentialIntegrityViolation> {
    match ReferentialIntegrityViolation::from_result(result) {
        Some(violation) => Err(violation),
        None => Ok(()),
    }
}
