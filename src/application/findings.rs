//! Disease finding normalizer.
//!
//! Pure transform from raw classifier confidences to a `DiagnosisReport`.

use crate::domain::{
    title_case, ClassificationResult, ConditionInfo, DiagnosisReport, Finding, FindingSeverity,
    Severity,
};
use crate::ports::ServiceError;

/// Class label the retinal model uses for a healthy fundus.
pub const NORMAL_CLASS: &str = "normal";

const HEALTHY_RECOMMENDATION: &str = "Your eyes appear healthy. Continue regular eye checkups.";

/// Why a fallback report was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackKind {
    /// The classifier refused the image
    InvalidImage,
    /// The classifier could not be reached or answered garbage
    Error,
}

impl FallbackKind {
    /// Pick the fallback matching a collaborator failure.
    #[must_use]
    pub fn for_error(error: &ServiceError) -> Self {
        if error.is_input_rejection() {
            Self::InvalidImage
        } else {
            Self::Error
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::InvalidImage => "Invalid Image",
            Self::Error => "Error",
        }
    }

    fn recommendation(self) -> &'static str {
        match self {
            Self::InvalidImage => {
                "The image could not be analyzed. Please upload a clear retinal fundus photograph and try again."
            }
            Self::Error => {
                "Unable to analyze image. Please check that the classification service is reachable and try again."
            }
        }
    }
}

/// Round a confidence to a whole percent. Non-finite values become 0.
fn round_confidence(value: f64) -> i64 {
    if value.is_finite() {
        value.round() as i64
    } else {
        0
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Recommendation text for a predicted class.
#[must_use]
pub fn recommendation_for(predicted_class: &str) -> String {
    if predicted_class == NORMAL_CLASS {
        HEALTHY_RECOMMENDATION.to_string()
    } else {
        format!(
            "Please consult an ophthalmologist for professional evaluation and treatment of {}.",
            predicted_class.replace('_', " ")
        )
    }
}

/// Build the report for a successful classification.
#[must_use]
pub fn normalize(result: &ClassificationResult) -> DiagnosisReport {
    let confidence = finite_or_zero(result.confidence);

    let findings = result
        .all_predictions
        .iter()
        .map(|(label, score)| {
            let score = finite_or_zero(score);
            Finding {
                condition: title_case(label),
                severity: FindingSeverity::from_confidence(score),
                confidence: round_confidence(score),
            }
        })
        .collect();

    let condition_info = match (&result.description, &result.symptoms) {
        (Some(description), Some(symptoms)) => Some(ConditionInfo {
            description: description.clone(),
            symptoms: symptoms.clone(),
            icon: None,
            color: None,
        }),
        _ => ConditionInfo::for_class(&result.predicted_class),
    }
    .map(|info| ConditionInfo {
        icon: result.icon.clone(),
        color: result.color.clone(),
        ..info
    });

    DiagnosisReport {
        primary_diagnosis: title_case(&result.predicted_class),
        confidence: round_confidence(confidence),
        severity: Severity::from_confidence(confidence),
        findings,
        recommendation: recommendation_for(&result.predicted_class),
        condition_info,
        error: None,
        created_at: chrono::Utc::now(),
    }
}

/// Build the user-safe report used when classification failed.
#[must_use]
pub fn fallback_report(kind: FallbackKind, reason: impl Into<String>) -> DiagnosisReport {
    DiagnosisReport {
        primary_diagnosis: kind.label().to_string(),
        confidence: 0,
        severity: Severity::Low,
        findings: Vec::new(),
        recommendation: kind.recommendation().to_string(),
        condition_info: None,
        error: Some(reason.into()),
        created_at: chrono::Utc::now(),
    }
}
