//! Error types for the validation engine
//!
//! A blocked mutation is not an error of the engine; it is a
//! [`ValidationResult`](crate::ValidationResult) with violations. The errors
//! here mean "could not determine", and callers must treat them as unsafe.

use crate::counter::CounterError;
use refguard_graph::{EntityType, RegistryError};
use std::time::Duration;

/// Validation could not complete
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// Parent type missing from the registry (deployment/programming error)
    #[error("configuration error: {0}")]
    Configuration(#[from] RegistryError),

    /// A count query failed
    #[error("infrastructure error: {0}")]
    Infrastructure(#[from] CounterError),

    /// Counting did not finish in time
    #[error("validation of {parent_type} timed out after {}ms", .limit.as_millis())]
    Timeout {
        /// Parent type being validated
        parent_type: EntityType,
        /// Configured limit
        limit: Duration,
    },
}

impl ValidationError {
    /// Store failure or timeout
    #[inline]
    #[must_use]
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Self::Infrastructure(_) | Self::Timeout { .. })
    }

    /// Registry misconfiguration
    #[inline]
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    #[test]
    fn classification() {
        let config = ValidationError::from(RegistryError::UnknownParent(EntityType::new("X")));
        assert!(config.is_configuration());
        assert!(!config.is_infrastructure());

        let timeout = ValidationError::Timeout {
            parent_type: EntityType::new("X"),
            limit: Duration::from_millis(10),
        };
        assert!(timeout.is_infrastructure());
        assert_eq!(timeout.to_string(), "validation of X timed out after 10ms");

        let infra = ValidationError::from(CounterError {
            dependent_type: EntityType::new("Y"),
            collection: "ys".into(),
            field: "xId".into(),
            source: StoreError::Unavailable("down".into()),
        });
        assert!(infra.is_infrastructure());
        assert!(infra.to_string().contains("store unavailable: down"));
    }
}
