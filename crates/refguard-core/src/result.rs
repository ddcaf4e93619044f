//! Validation results
//!
//! A [`ValidationResult`] is built once per validation call and never
//! modified afterwards. Failures to validate are not results; they are
//! [`ValidationError`](crate::ValidationError)s.

use refguard_graph::{EntityId, EntityType, ReferenceSpec};
use serde::Serialize;
use std::fmt::Write as _;
use std::time::Duration;

/// Dependent type still referencing the parent
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Violation {
    /// Dependent entity type
    pub dependent_type: EntityType,
    /// Number of referencing documents, always non-zero
    pub count: u64,
}

/// Why a validation passed without querying the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Master switch is off
    Disabled,
    /// Update keeps the same identity
    IdentityUnchanged,
    /// Parent has no (enabled) dependents
    NoDependents,
}

/// Outcome of a completed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    parent_type: EntityType,
    parent_id: EntityId,
    violations: Vec<Violation>,
    message: Option<String>,
    duration: Duration,
    skipped: Option<SkipReason>,
}

impl ValidationResult {
    /// Valid result for a call that issued no queries
    #[must_use]
    pub fn skipped(parent_type: EntityType, parent_id: EntityId, reason: SkipReason) -> Self {
        Self {
            parent_type,
            parent_id,
            violations: Vec::new(),
            message: None,
            duration: Duration::ZERO,
            skipped: Some(reason),
        }
    }

    /// Aggregate per-spec counts
    ///
    /// Non-zero counts become violations in the order given, which is the
    /// registry's declaration order.
    #[must_use]
    pub fn from_counts<'a>(
        parent_type: EntityType,
        parent_id: EntityId,
        counts: impl IntoIterator<Item = (&'a ReferenceSpec, u64)>,
        duration: Duration,
    ) -> Self {
        let violations: Vec<Violation> = counts
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(spec, count)| Violation {
                dependent_type: spec.dependent_type.clone(),
                count,
            })
            .collect();

        let message = (!violations.is_empty()).then(|| violation_message(&parent_type, &violations));

        Self {
            parent_type,
            parent_id,
            violations,
            message,
            duration,
            skipped: None,
        }
    }

    /// True iff there are no violations
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// True iff the mutation must be blocked
    #[inline]
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        !self.is_valid()
    }

    /// Parent type validated
    #[inline]
    #[must_use]
    pub fn parent_type(&self) -> &EntityType {
        &self.parent_type
    }

    /// Parent id validated
    #[inline]
    #[must_use]
    pub fn parent_id(&self) -> EntityId {
        self.parent_id
    }

    /// Violations in registry order
    #[inline]
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Consolidated message, present iff blocked
    #[inline]
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Time spent counting
    #[inline]
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Set when the call passed without querying
    #[inline]
    #[must_use]
    pub fn skip_reason(&self) -> Option<SkipReason> {
        self.skipped
    }

    /// Total referencing documents across all violations
    #[must_use]
    pub fn total_references(&self) -> u64 {
        self.violations.iter().map(|v| v.count).sum()
    }
}

/// Format the operator-facing blocked message
///
/// `Cannot delete/modify ProtocolEntity. Referenced by: SourceEntity (3 records), DestinationEntity (1 records)`
#[must_use]
pub fn violation_message(parent_type: &EntityType, violations: &[Violation]) -> String {
    let mut message = format!("Cannot delete/modify {parent_type}. Referenced by: ");
    for (i, violation) in violations.iter().enumerate() {
        if i > 0 {
            message.push_str(", ");
        }
        let _ = write!(message, "{} ({} records)", violation.dependent_type, violation.count);
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn spec(dependent: &str) -> ReferenceSpec {
        ReferenceSpec::scalar("ProtocolEntity", dependent.to_string(), "docs", dependent.to_string())
    }

    #[test]
    fn zero_counts_are_valid() {
        let specs = [spec("SourceEntity"), spec("DestinationEntity")];
        let result = ValidationResult::from_counts(
            EntityType::from_static("ProtocolEntity"),
            EntityId::new(),
            specs.iter().zip([0, 0]),
            Duration::from_millis(3),
        );
        assert!(result.is_valid());
        assert_eq!(result.message(), None);
        assert_eq!(result.skip_reason(), None);
    }

    #[test]
    fn message_lists_only_violating_dependents() {
        let specs = [spec("SourceEntity"), spec("FlowEntity"), spec("DestinationEntity")];
        let result = ValidationResult::from_counts(
            EntityType::from_static("ProtocolEntity"),
            EntityId::new(),
            specs.iter().zip([3, 0, 1]),
            Duration::ZERO,
        );
        assert!(result.is_blocked());
        assert_eq!(
            result.message().unwrap(),
            "Cannot delete/modify ProtocolEntity. Referenced by: SourceEntity (3 records), DestinationEntity (1 records)"
        );
        assert_eq!(result.total_references(), 4);
    }

    #[test]
    fn skipped_result_is_valid() {
        let result = ValidationResult::skipped(
            EntityType::from_static("FlowEntity"),
            EntityId::new(),
            SkipReason::Disabled,
        );
        assert!(result.is_valid());
        assert_eq!(result.skip_reason(), Some(SkipReason::Disabled));
    }

    proptest! {
        #[test]
        fn prop_violations_are_nonzero_counts_in_order(counts in proptest::collection::vec(0u64..5, 0..10)) {
            let specs: Vec<ReferenceSpec> = (0..counts.len()).map(|i| spec(&format!("Dep{i}"))).collect();
            let result = ValidationResult::from_counts(
                EntityType::from_static("P"),
                EntityId::new(),
                specs.iter().zip(counts.iter().copied()),
                Duration::ZERO,
            );

            let expected: Vec<(String, u64)> = counts
                .iter()
                .enumerate()
                .filter(|(_, c)| **c > 0)
                .map(|(i, c)| (format!("Dep{i}"), *c))
                .collect();
            let actual: Vec<(String, u64)> = result
                .violations()
                .iter()
                .map(|v| (v.dependent_type.to_string(), v.count))
                .collect();

            prop_assert_eq!(&actual, &expected);
            prop_assert_eq!(result.is_valid(), expected.is_empty());
            prop_assert_eq!(result.message().is_some(), !expected.is_empty());
        }
    }
}
