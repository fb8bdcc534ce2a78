//! Colour vision diagnosis engine.
//!
//! Turns per-plate correctness into per-type error rates, Deutan/Protan
//! likelihoods and a rule-based diagnosis. Everything here is a pure
//! function of the evaluator's answer.
//!
//! # Type correction
//!
//! The plate service tags every `theme_4` plate with the wrong colour type
//! (usually 3). Those plates are counted as type 4 before aggregation.
//! Without per-plate results the correction cannot be applied and the
//! evaluator's own type analysis is used instead (`EvaluationMode::Degraded`).

use crate::domain::{
    ColourType, DeficiencySeverity, DeficiencyType, DetailedResult, Diagnosis,
    DiagnosisConfidence, EvaluationMode, TestResult, TypeAnalysis, TypeBreakdown, VisionStatus,
};
use crate::ports::EvaluationResponse;

/// Below this overall error rate (percent) vision is reported normal.
pub const THRESHOLD_LOW: f64 = 10.0;
/// From this likelihood a deficiency is reported as moderate.
pub const THRESHOLD_MODERATE: f64 = 30.0;
/// From this likelihood a deficiency is reported as strong.
pub const THRESHOLD_HIGH: f64 = 50.0;

/// Filename marker of plates whose upstream type label is wrong.
pub const MISLABELED_TYPE4_MARKER: &str = "theme_4";

/// Deutan and Protan likelihoods, in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Likelihoods {
    pub deutan: f64,
    pub protan: f64,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Colour type a detailed result counts towards.
///
/// Returns `None` when the reported type is unusable.
#[must_use]
pub fn corrected_type(result: &DetailedResult) -> Option<ColourType> {
    if result.filename.contains(MISLABELED_TYPE4_MARKER) {
        return Some(ColourType::YellowGreen);
    }
    ColourType::try_from(result.color_type).ok()
}

/// Count totals and mistakes per corrected type.
#[must_use]
pub fn aggregate(results: &[DetailedResult]) -> TypeBreakdown {
    let mut totals = [0u32; 4];
    let mut mistakes = [0u32; 4];

    for result in results {
        let Some(colour_type) = corrected_type(result) else {
            tracing::warn!(
                "Skipping {}: colour type {} is outside 1-4",
                result.filename,
                result.color_type
            );
            continue;
        };

        if i64::from(colour_type.code()) != result.color_type {
            tracing::debug!(
                "Remapped {} from type {} to {}",
                result.filename,
                result.color_type,
                colour_type
            );
        }

        let slot = colour_type.index();
        totals[slot] += 1;
        if !result.is_correct {
            mistakes[slot] += 1;
        }
    }

    let mut breakdown = TypeBreakdown::default();
    for t in ColourType::ALL {
        breakdown.set(t, TypeAnalysis::from_counts(totals[t.index()], mistakes[t.index()]));
    }
    breakdown
}

/// Mean error percentage over the given types that have data (0 if none).
fn mean_error(breakdown: &TypeBreakdown, types: [ColourType; 2]) -> f64 {
    let errors: Vec<f64> = types
        .iter()
        .map(|t| breakdown.get(*t))
        .filter(|a| a.has_data())
        .map(|a| a.error_percentage)
        .collect();

    if errors.is_empty() {
        0.0
    } else {
        errors.iter().sum::<f64>() / errors.len() as f64
    }
}

/// Unrounded Deutan (types 1 and 4) and Protan (types 2 and 3) likelihoods.
#[must_use]
pub fn likelihoods(breakdown: &TypeBreakdown) -> Likelihoods {
    Likelihoods {
        deutan: mean_error(breakdown, [ColourType::GreenOrange, ColourType::YellowGreen]),
        protan: mean_error(breakdown, [ColourType::OrangeGreen, ColourType::GrayRed]),
    }
}

/// Share of wrong answers across all types, in percent.
#[must_use]
pub fn overall_error(breakdown: &TypeBreakdown) -> f64 {
    let total = breakdown.total_responses();
    if total == 0 {
        return 0.0;
    }
    f64::from(breakdown.total_mistakes()) / f64::from(total) * 100.0
}

/// Which cone family a directional pattern points at.
#[derive(Debug, Clone, Copy)]
enum Pattern {
    Deutan,
    Protan,
}

impl Pattern {
    fn types(self) -> [ColourType; 2] {
        match self {
            Self::Deutan => [ColourType::GreenOrange, ColourType::YellowGreen],
            Self::Protan => [ColourType::OrangeGreen, ColourType::GrayRed],
        }
    }

    fn anomaly(self) -> DeficiencyType {
        match self {
            Self::Deutan => DeficiencyType::Deuteranomaly,
            Self::Protan => DeficiencyType::Protanomaly,
        }
    }

    fn anopia(self) -> DeficiencyType {
        match self {
            Self::Deutan => DeficiencyType::Deuteranopia,
            Self::Protan => DeficiencyType::Protanopia,
        }
    }

    fn colour(self) -> &'static str {
        match self {
            Self::Deutan => "green",
            Self::Protan => "red",
        }
    }
}

struct Verdict {
    status: VisionStatus,
    severity: DeficiencySeverity,
    deficiency: Option<DeficiencyType>,
    confidence: DiagnosisConfidence,
    summary: String,
    recommendation: &'static str,
    details: Vec<String>,
}

fn normal_verdict() -> Verdict {
    Verdict {
        status: VisionStatus::Normal,
        severity: DeficiencySeverity::None,
        deficiency: None,
        confidence: DiagnosisConfidence::High,
        summary: "Normal colour vision detected. No significant colour vision deficiency."
            .to_string(),
        recommendation: "No further action required. Your colour vision appears normal.",
        details: vec!["All colour types were perceived correctly with minimal errors.".to_string()],
    }
}

fn residual_verdict() -> Verdict {
    Verdict {
        status: VisionStatus::Normal,
        severity: DeficiencySeverity::None,
        deficiency: None,
        confidence: DiagnosisConfidence::High,
        summary: "Normal colour vision with minor inconsistencies.".to_string(),
        recommendation: "Your colour vision appears mostly normal. Retest if concerned.",
        details: vec![
            "Errors are minimal and do not indicate a specific deficiency pattern.".to_string(),
        ],
    }
}

fn pattern_verdict(pattern: Pattern, likelihood: f64, breakdown: &TypeBreakdown) -> Verdict {
    // Shown the same way as the reported likelihood, ties rounded up.
    let shown = round1(likelihood);
    let details = pattern
        .types()
        .iter()
        .map(|t| {
            format!(
                "Type {} errors ({}): {:.1}%",
                t.code(),
                t.axis(),
                breakdown.error(*t)
            )
        })
        .collect();

    if likelihood >= THRESHOLD_HIGH {
        let deficiency = pattern.anopia();
        Verdict {
            status: VisionStatus::ColourBlind,
            severity: DeficiencySeverity::Strong,
            deficiency: Some(deficiency),
            confidence: DiagnosisConfidence::High,
            summary: format!(
                "Strong indication of {deficiency} ({}-blindness). Error rate: {shown:.1}%",
                pattern.colour()
            ),
            recommendation: "Please consult an eye care professional for a comprehensive colour vision examination.",
            details,
        }
    } else if likelihood >= THRESHOLD_MODERATE {
        let deficiency = pattern.anomaly();
        Verdict {
            status: VisionStatus::ColourWeak,
            severity: DeficiencySeverity::Moderate,
            deficiency: Some(deficiency),
            confidence: DiagnosisConfidence::Moderate,
            summary: format!(
                "Moderate signs of {deficiency} ({}-weakness). Error rate: {shown:.1}%",
                pattern.colour()
            ),
            recommendation: "Consider seeing an eye care professional for further evaluation.",
            details,
        }
    } else {
        Verdict {
            status: VisionStatus::PossibleWeakness,
            severity: DeficiencySeverity::Mild,
            deficiency: Some(pattern.anomaly()),
            confidence: DiagnosisConfidence::Low,
            summary: format!(
                "Mild signs of {} colour weakness. Error rate: {shown:.1}%",
                pattern.colour()
            ),
            recommendation: "Monitor your colour vision. If symptoms persist, consult an eye care professional.",
            details,
        }
    }
}

fn inconclusive_verdict(l: Likelihoods, breakdown: &TypeBreakdown) -> Verdict {
    Verdict {
        status: VisionStatus::Inconclusive,
        severity: DeficiencySeverity::Varied,
        deficiency: None,
        confidence: DiagnosisConfidence::Low,
        summary: format!(
            "Equal error rates detected (Deutan: {:.1}%, Protan: {:.1}%). Results are inconclusive.",
            round1(l.deutan),
            round1(l.protan)
        ),
        recommendation: "This test shows mixed results. Please consult an eye care professional for a thorough examination.",
        details: breakdown
            .iter()
            .map(|(t, a)| format!("Type {} errors: {:.1}%", t.code(), a.error_percentage))
            .collect(),
    }
}

/// Derive the diagnosis from per-type statistics.
///
/// Rules are tried in order and the first match wins:
/// 1. overall error below `THRESHOLD_LOW`: normal
/// 2. Deutan ahead and at least `THRESHOLD_LOW`: Deutan pattern
/// 3. Protan ahead and at least `THRESHOLD_LOW`: Protan pattern
/// 4. tie at `THRESHOLD_MODERATE` or above: inconclusive
/// 5. otherwise: normal with minor inconsistencies
#[must_use]
pub fn classify(breakdown: &TypeBreakdown) -> Diagnosis {
    let l = likelihoods(breakdown);
    let overall = overall_error(breakdown);

    let verdict = if overall < THRESHOLD_LOW {
        normal_verdict()
    } else if l.deutan > l.protan && l.deutan >= THRESHOLD_LOW {
        pattern_verdict(Pattern::Deutan, l.deutan, breakdown)
    } else if l.protan > l.deutan && l.protan >= THRESHOLD_LOW {
        pattern_verdict(Pattern::Protan, l.protan, breakdown)
    } else if l.deutan == l.protan && l.deutan >= THRESHOLD_MODERATE {
        inconclusive_verdict(l, breakdown)
    } else {
        residual_verdict()
    };

    tracing::debug!(
        "Overall error {:.1}%, deutan {:.1}%, protan {:.1}% -> {}",
        overall,
        l.deutan,
        l.protan,
        verdict.status
    );

    Diagnosis {
        status: verdict.status,
        severity: verdict.severity,
        deficiency: verdict.deficiency,
        confidence: verdict.confidence,
        deutan_likelihood: round1(l.deutan),
        protan_likelihood: round1(l.protan),
        summary: verdict.summary,
        recommendation: verdict.recommendation.to_string(),
        details: verdict.details,
    }
}

/// Recompute type analysis and diagnosis from an evaluator answer.
///
/// Uses the corrected per-plate aggregation when `detailed_results` is
/// present, otherwise falls back to the evaluator's own type analysis.
#[must_use]
pub fn evaluate(response: EvaluationResponse) -> TestResult {
    let (type_analysis, mode) = match &response.detailed_results {
        Some(results) => (aggregate(results), EvaluationMode::Corrected),
        None => {
            tracing::warn!(
                "Evaluator sent no per-plate results; using its type analysis without correction"
            );
            (response.type_analysis, EvaluationMode::Degraded)
        }
    };

    let diagnosis = classify(&type_analysis);

    if let Some(upstream) = response
        .diagnosis
        .as_ref()
        .and_then(|d| d.get("status"))
        .and_then(|s| s.as_str())
    {
        let ours = serde_json::to_value(diagnosis.status).unwrap_or_default();
        if ours.as_str() != Some(upstream) {
            tracing::info!(
                "Recomputed diagnosis differs from evaluator: {} (evaluator said {})",
                diagnosis.status,
                upstream
            );
        }
    }

    TestResult {
        overall_accuracy: response.overall_accuracy,
        total_correct: response.total_correct,
        total_questions: response.total_questions,
        type_analysis,
        diagnosis,
        mode,
    }
}
