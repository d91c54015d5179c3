//! Step selection rules
//!
//! Pure mapping from (step, retouch limit) to the selection rules the
//! presentation layer renders. No failure modes.

use pfw_common::db::WorkflowStep;
use serde::Serialize;

/// UI selection rules for one workflow step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepMetadata {
    /// Whether more than one photo may be selected at this step
    pub allow_multiple: bool,
    /// Upper bound on the selection size, if any
    pub max_selection: Option<u32>,
    pub description: &'static str,
}

/// Selection rules for a step, given the resolved retouch limit.
///
/// | step                    | allow_multiple | max_selection |
/// |-------------------------|----------------|---------------|
/// | claiming / registration | true           | unlimited     |
/// | retouch                 | true           | limit         |
/// | tablo (final)           | false          | 1             |
/// | completed               | true           | unlimited     |
pub fn metadata(step: WorkflowStep, max_retouch: u32) -> StepMetadata {
    match step.canonical() {
        WorkflowStep::Claiming => StepMetadata {
            allow_multiple: true,
            max_selection: None,
            description: "Pick the photos you want from the shared pool",
        },
        WorkflowStep::Retouch => StepMetadata {
            allow_multiple: true,
            max_selection: Some(max_retouch),
            description: "Choose which of your photos to retouch",
        },
        WorkflowStep::Tablo => StepMetadata {
            allow_multiple: false,
            max_selection: Some(1),
            description: "Choose the single photo for the tablo",
        },
        WorkflowStep::Completed => StepMetadata {
            allow_multiple: true,
            max_selection: None,
            description: "Review your finished selections",
        },
        WorkflowStep::Registration => unreachable!("canonicalized above"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claiming_allows_unlimited_selection() {
        let meta = metadata(WorkflowStep::Claiming, 5);
        assert!(meta.allow_multiple);
        assert_eq!(meta.max_selection, None);
    }

    #[test]
    fn registration_matches_claiming() {
        assert_eq!(
            metadata(WorkflowStep::Registration, 5),
            metadata(WorkflowStep::Claiming, 5)
        );
    }

    #[test]
    fn retouch_is_bounded_by_the_resolved_limit() {
        let meta = metadata(WorkflowStep::Retouch, 8);
        assert!(meta.allow_multiple);
        assert_eq!(meta.max_selection, Some(8));
    }

    #[test]
    fn tablo_is_single_select() {
        let meta = metadata(WorkflowStep::Tablo, 5);
        assert!(!meta.allow_multiple);
        assert_eq!(meta.max_selection, Some(1));
    }

    #[test]
    fn completed_is_unbounded() {
        let meta = metadata(WorkflowStep::Completed, 5);
        assert!(meta.allow_multiple);
        assert_eq!(meta.max_selection, None);
    }
}
