//! Boundary payloads for the API layer
//!
//! A violation renders as 409 with the per-entity breakdown. Anything else
//! renders as 5xx without a breakdown, since nothing was determined.

use crate::error::ValidationError;
use crate::guard::{GuardError, ReferentialIntegrityViolation};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP 409
pub const STATUS_CONFLICT: u16 = 409;
/// HTTP 500
pub const STATUS_INTERNAL_ERROR: u16 = 500;
/// HTTP 503
pub const STATUS_UNAVAILABLE: u16 = 503;

/// One referencing entity type in a conflict payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferencingEntity {
    /// Dependent entity type name
    pub entity_type: String,
    /// Referencing documents
    pub count: u64,
}

/// 409 payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictResponse {
    /// Consolidated message
    pub message: String,
    /// Breakdown in registry order
    pub referencing_entities: Vec<ReferencingEntity>,
}

impl From<&ReferentialIntegrityViolation> for ConflictResponse {
    fn from(violation: &ReferentialIntegrityViolation) -> Self {
        Self {
            message: violation.message().to_string(),
            referencing_entities: violation
                .result()
                .violations()
                .iter()
                .map(|v| ReferencingEntity {
                    entity_type: v.dependent_type.to_string(),
                    count: v.count,
                })
                .collect(),
        }
    }
}

/// 5xx payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error description
    pub message: String,
}

impl ValidationError {
    /// 503 for store failures and timeouts, 500 for configuration errors
    #[must_use]
    pub fn status_code(&self) -> u16 {
        if self.is_infrastructure() {
            STATUS_UNAVAILABLE
        } else {
            STATUS_INTERNAL_ERROR
        }
    }
}

impl<E: std::error::Error + 'static> GuardError<E> {
    /// HTTP status for this error
    ///
    /// Repository failures map to 500; API layers with richer repository
    /// errors (not found, duplicate) map those themselves.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Violation(_) => STATUS_CONFLICT,
            Self::Validation(e) => e.status_code(),
            Self::Repository(_) => STATUS_INTERNAL_ERROR,
        }
    }

    /// JSON body for this error
    #[must_use]
    pub fn response_body(&self) -> Value {
        let body = match self {
            Self::Violation(violation) => serde_json::to_value(ConflictResponse::from(violation)),
            other => serde_json::to_value(ErrorResponse {
                message: other.to_string(),
            }),
        };
        body.unwrap_or(Value::Null)
    }
}
