//! Response evaluation port: Trait for the digit-recognition evaluator.
//!
//! The evaluator knows the correct digit of every plate and reports which
//! answers were right. Its own type analysis and diagnosis are carried
//! through but not trusted (see `application::colour_diagnosis`).

use serde::{Deserialize, Serialize};

use crate::domain::{DetailedResult, ResponseSheet, TypeBreakdown, UserResponse};

use super::ServiceError;

/// Batch of answers submitted for scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    pub responses: Vec<UserResponse>,
}

impl From<&ResponseSheet> for EvaluationRequest {
    fn from(sheet: &ResponseSheet) -> Self {
        Self {
            responses: sheet.responses().to_vec(),
        }
    }
}

/// Raw evaluator answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResponse {
    #[serde(default)]
    pub overall_accuracy: f64,

    #[serde(default)]
    pub total_correct: u32,

    #[serde(default)]
    pub total_questions: u32,

    /// Type analysis computed upstream from possibly mislabeled types
    #[serde(default)]
    pub type_analysis: TypeBreakdown,

    /// Upstream diagnosis, kept for logging only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<serde_json::Value>,

    /// Per-plate results; required for the type correction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detailed_results: Option<Vec<DetailedResult>>,
}

/// Trait for the response evaluation collaborator.
pub trait ResponseEvaluator: Send + Sync {
    /// Score a complete batch of answers.
    ///
    /// # Errors
    /// Returns error if the service is unreachable or answers garbage.
    fn evaluate(&self, request: &EvaluationRequest) -> Result<EvaluationResponse, ServiceError>;
}
