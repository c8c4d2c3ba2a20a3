//! crates/meal_swap_core/src/error.rs
//!
//! Terminal failures of an analysis request.

use crate::validator::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// Bad or missing day/meal type. Raised before any external call.
    #[error("Invalid slot: {0}")]
    InvalidSlot(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Profile, goal or catalog is missing or could not be read.
    #[error("User context unavailable: {0}")]
    ContextUnavailable(String),

    /// The estimator failed or timed out on every attempt.
    #[error("Meal estimation unavailable: {0}")]
    EstimationUnavailable(String),

    #[error("Malformed estimate: {0}")]
    MalformedEstimate(#[from] ValidationError),
}

impl AnalysisError {
    /// Text that can be shown to the end user as-is.
    pub fn user_message(&self) -> &'static str {
        match self {
            AnalysisError::InvalidSlot(_) => "Please choose a day and a meal type.",
            AnalysisError::InvalidRequest(_) => "Please attach a photo of your meal.",
            AnalysisError::ContextUnavailable(_) => {
                "Please complete onboarding and add a menu first."
            }
            AnalysisError::EstimationUnavailable(_) => {
                "Meal analysis is temporarily unavailable, please try again later."
            }
            AnalysisError::MalformedEstimate(_) => "Analysis failed, please try again.",
        }
    }

    /// Only an unreachable estimator is worth another attempt; a bad answer is not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AnalysisError::EstimationUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unavailable_estimator_is_retryable() {
        assert!(AnalysisError::EstimationUnavailable("timeout".into()).is_retryable());
        assert!(!AnalysisError::MalformedEstimate(ValidationError::NotAnObject).is_retryable());
        assert!(!AnalysisError::ContextUnavailable("goal".into()).is_retryable());
    }
}
