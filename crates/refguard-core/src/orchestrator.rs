//! Validation orchestrator
//!
//! Resolves a parent's dependents in the registry, counts references for
//! each, and aggregates the non-zero counts.
//!
//! # Semantics
//! - Fail-closed: a failed count or a timeout is an error, never a pass
//! - Results keep registry order whatever the execution mode
//! - Concurrent mode waits for all counters or the first error; the rest are
//!   dropped, which is safe because counting only reads
//! - Dropping the returned future abandons in-flight counters
//!
//! Counting and the subsequent mutation are not one transaction, so a
//! reference created in between goes unnoticed. Stores with multi-document
//! transactions should run both inside one.

use crate::config::{ConfigError, IntegrityConfig};
use crate::counter::{CounterError, ReferenceCounter};
use crate::error::ValidationError;
use crate::result::{SkipReason, ValidationResult};
use crate::store::{ReferenceStore, StoreError};
use futures::future::try_join_all;
use refguard_graph::{EntityId, EntityType, ReferenceRegistry, ReferenceSpec};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// `(collection, field)` pair without a store index
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MissingIndex {
    /// Collection
    pub collection: String,
    /// Foreign-key field
    pub field: String,
}

/// Runs referential integrity validations
#[derive(Debug)]
pub struct ValidationOrchestrator<S> {
    registry: Arc<ReferenceRegistry>,
    counter: ReferenceCounter<S>,
    config: IntegrityConfig,
}

impl<S: ReferenceStore> ValidationOrchestrator<S> {
    /// Create orchestrator
    ///
    /// # Errors
    /// `ConfigError::Invalid` if the configuration fails
    /// [`IntegrityConfig::validate`], e.g. a zero timeout.
    pub fn new(
        registry: Arc<ReferenceRegistry>,
        store: S,
        config: IntegrityConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if !config.enabled {
            tracing::warn!("referential integrity validation is disabled by configuration");
        }
        Ok(Self {
            registry,
            counter: ReferenceCounter::new(store),
            config,
        })
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &IntegrityConfig {
        &self.config
    }

    /// Get registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &ReferenceRegistry {
        &self.registry
    }

    /// Get store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &S {
        self.counter.store()
    }

    /// Check whether `parent_id` may be deleted
    ///
    /// # Workflow
    /// 1. Master switch off → valid, no queries
    /// 2. Resolve enabled dependents; none → valid
    /// 3. Count each dependent (concurrently or sequentially), bounded by
    ///    the configured timeout
    /// 4. Non-zero counts become violations in registry order
    ///
    /// # Errors
    /// - `ValidationError::Configuration` if `parent_type` is not registered
    /// - `ValidationError::Infrastructure` if any count query fails
    /// - `ValidationError::Timeout` if counting exceeds the timeout
    #[tracing::instrument(
        name = "validate_deletion",
        skip_all,
        fields(parent_type = %parent_type, parent_id = %parent_id)
    )]
    pub async fn validate_deletion(
        &self,
        parent_type: &str,
        parent_id: EntityId,
    ) -> Result<ValidationResult, ValidationError> {
        if !self.config.enabled {
            tracing::warn!("validation disabled; deletion allowed without checks");
            return Ok(ValidationResult::skipped(
                EntityType::new(parent_type),
                parent_id,
                SkipReason::Disabled,
            ));
        }

        let specs: Vec<&ReferenceSpec> = self
            .registry
            .dependents_of(parent_type)?
            .iter()
            .filter(|spec| self.config.is_dependent_enabled(spec.dependent_type.as_str()))
            .collect();

        if specs.is_empty() {
            tracing::debug!("no dependents to check");
            return Ok(ValidationResult::skipped(
                EntityType::new(parent_type),
                parent_id,
                SkipReason::NoDependents,
            ));
        }

        let start = Instant::now();
        let limit = self.config.timeout();
        let counts = match tokio::time::timeout(limit, self.count_all(&specs, parent_id)).await {
            Ok(counts) => counts?,
            Err(_) => {
                tracing::error!(timeout_ms = self.config.timeout_ms, "validation timed out");
                return Err(ValidationError::Timeout {
                    parent_type: EntityType::new(parent_type),
                    limit,
                });
            }
        };

        let result = ValidationResult::from_counts(
            EntityType::new(parent_type),
            parent_id,
            specs.iter().copied().zip(counts),
            start.elapsed(),
        );

        match result.message() {
            Some(message) => tracing::warn!(
                violations = result.violations().len(),
                elapsed = ?result.duration(),
                "{message}"
            ),
            None => tracing::debug!(
                checked = specs.len(),
                elapsed = ?result.duration(),
                "no references found"
            ),
        }

        Ok(result)
    }

    /// Check whether the identity of `current_id` may change to `new_id`
    ///
    /// Same identity → valid without queries. Otherwise identical to
    /// [`validate_deletion`](Self::validate_deletion) of `current_id`: holders
    /// of the old id are orphaned exactly as by a delete.
    ///
    /// # Errors
    /// Same as [`validate_deletion`](Self::validate_deletion).
    pub async fn validate_update(
        &self,
        parent_type: &str,
        current_id: EntityId,
        new_id: EntityId,
    ) -> Result<ValidationResult, ValidationError> {
        if current_id == new_id {
            tracing::trace!(%parent_type, %current_id, "identity unchanged; skipping validation");
            return Ok(ValidationResult::skipped(
                EntityType::new(parent_type),
                current_id,
                SkipReason::IdentityUnchanged,
            ));
        }
        self.validate_deletion(parent_type, current_id).await
    }

    /// Report registry `(collection, field)` pairs the store has no index for
    ///
    /// Missing indexes slow validation down; they never change its outcome.
    ///
    /// # Errors
    /// `StoreError` if the store cannot answer.
    pub async fn verify_indexes(&self) -> Result<Vec<MissingIndex>, StoreError> {
        let mut checked: HashSet<(&str, &str)> = HashSet::new();
        let mut missing: Vec<MissingIndex> = Vec::new();
        for spec in self.registry.specs() {
            let (collection, field) = spec.location();
            if !checked.insert((collection, field)) {
                continue;
            }
            if !self.store().has_index(collection, field).await? {
                tracing::warn!(collection, field, "reference field is not indexed");
                missing.push(MissingIndex {
                    collection: collection.to_string(),
                    field: field.to_string(),
                });
            }
        }
        Ok(missing)
    }

    async fn count_all(
        &self,
        specs: &[&ReferenceSpec],
        parent_id: EntityId,
    ) -> Result<Vec<u64>, CounterError> {
        if self.config.concurrent {
            try_join_all(specs.iter().map(|spec| self.counter.count(spec, parent_id))).await
        } else {
            let mut counts = Vec::with_capacity(specs.len());
            for spec in specs {
                counts.push(self.counter.count(spec, parent_id).await?);
            }
            Ok(counts)
        }
    }
}
