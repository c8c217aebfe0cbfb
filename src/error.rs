use thiserror::Error;

use crate::profile::LabField;

/// Errors returned by [`crate::scoring::RiskScorer`].
///
/// Validation errors carry every problem found, not just the first one.
#[derive(Debug, Error)]
pub enum AssessmentError {
    #[error("invalid input: {}", .0.join("; "))]
    InvalidInput(Vec<String>),

    #[error("clinical assessment needs every lab value; missing: {}", join_fields(.0))]
    IncompleteLabs(Vec<LabField>),

    #[error("invalid scoring config: {}", .0.join("; "))]
    InvalidScoring(Vec<String>),
}

impl AssessmentError {
    /// Individual messages, one per problem.
    pub fn details(&self) -> Vec<String> {
        match self {
            AssessmentError::InvalidInput(errors) | AssessmentError::InvalidScoring(errors) => {
                errors.clone()
            }
            AssessmentError::IncompleteLabs(fields) => fields
                .iter()
                .map(|f| format!("labs.{}: required for clinical assessment", f.key()))
                .collect(),
        }
    }
}

fn join_fields(fields: &[LabField]) -> String {
    fields
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
