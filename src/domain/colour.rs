//! Colour vision diagnosis types.
//!
//! Per-type error statistics and the differential diagnosis derived from
//! them. Wire names follow the evaluation service (snake_case).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::plate::ColourType;

/// Error statistics for one colour type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeAnalysis {
    pub total: u32,
    pub mistakes: u32,
    pub error_percentage: f64,
    pub normal_percentage: f64,
}

impl Default for TypeAnalysis {
    fn default() -> Self {
        Self {
            total: 0,
            mistakes: 0,
            error_percentage: 0.0,
            normal_percentage: 100.0,
        }
    }
}

impl TypeAnalysis {
    /// Build from raw counts. Percentages carry one decimal place.
    ///
    /// The normal percentage is taken as the complement of the rounded
    /// error percentage so the pair always sums to exactly 100, including
    /// on half-tenth ties such as 1/16.
    #[must_use]
    pub fn from_counts(total: u32, mistakes: u32) -> Self {
        if total == 0 {
            return Self::default();
        }
        let ratio = f64::from(mistakes) / f64::from(total);
        let error_tenths = (ratio * 1000.0).round();
        Self {
            total,
            mistakes,
            error_percentage: error_tenths / 10.0,
            normal_percentage: (1000.0 - error_tenths) / 10.0,
        }
    }

    #[must_use]
    pub fn has_data(&self) -> bool {
        self.total > 0
    }
}

/// Statistics for all four colour types.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, TypeAnalysis>", into = "BTreeMap<String, TypeAnalysis>")]
pub struct TypeBreakdown([TypeAnalysis; 4]);

impl TypeBreakdown {
    #[must_use]
    pub fn new(analyses: [TypeAnalysis; 4]) -> Self {
        Self(analyses)
    }

    #[must_use]
    pub fn get(&self, colour_type: ColourType) -> &TypeAnalysis {
        &self.0[colour_type.index()]
    }

    pub fn set(&mut self, colour_type: ColourType, analysis: TypeAnalysis) {
        self.0[colour_type.index()] = analysis;
    }

    /// Shorthand for a type's error percentage.
    #[must_use]
    pub fn error(&self, colour_type: ColourType) -> f64 {
        self.get(colour_type).error_percentage
    }

    pub fn iter(&self) -> impl Iterator<Item = (ColourType, &TypeAnalysis)> {
        ColourType::ALL.into_iter().zip(self.0.iter())
    }

    #[must_use]
    pub fn total_responses(&self) -> u32 {
        self.0.iter().map(|a| a.total).sum()
    }

    #[must_use]
    pub fn total_mistakes(&self) -> u32 {
        self.0.iter().map(|a| a.mistakes).sum()
    }
}

impl From<BTreeMap<String, TypeAnalysis>> for TypeBreakdown {
    fn from(map: BTreeMap<String, TypeAnalysis>) -> Self {
        let mut breakdown = Self::default();
        for (key, analysis) in map {
            let parsed = key
                .trim()
                .parse::<i64>()
                .ok()
                .and_then(|code| ColourType::try_from(code).ok());
            match parsed {
                Some(t) => breakdown.set(t, analysis),
                None => tracing::warn!("Ignoring type analysis for unknown colour type {:?}", key),
            }
        }
        breakdown
    }
}

impl From<TypeBreakdown> for BTreeMap<String, TypeAnalysis> {
    fn from(breakdown: TypeBreakdown) -> Self {
        breakdown
            .iter()
            .map(|(t, a)| (t.code().to_string(), *a))
            .collect()
    }
}

/// Upstream per-plate evaluation (ground truth and correctness).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedResult {
    pub filename: String,
    pub correct_digit: i64,
    pub user_answer: i64,
    pub is_correct: bool,
    /// Colour type as reported upstream. Known to be wrong for some plates.
    pub color_type: i64,
}

/// Overall outcome of the colour test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisionStatus {
    Normal,
    PossibleWeakness,
    ColourWeak,
    ColourBlind,
    Inconclusive,
}

impl fmt::Display for VisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Normal => "normal",
            Self::PossibleWeakness => "possible weakness",
            Self::ColourWeak => "colour weak",
            Self::ColourBlind => "colour blind",
            Self::Inconclusive => "inconclusive",
        };
        f.write_str(s)
    }
}

/// Severity of the detected deficiency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeficiencySeverity {
    None,
    Mild,
    Moderate,
    Strong,
    Varied,
}

impl fmt::Display for DeficiencySeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Mild => "mild",
            Self::Moderate => "moderate",
            Self::Strong => "strong",
            Self::Varied => "varied",
        };
        f.write_str(s)
    }
}

/// How much weight to put on the diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosisConfidence {
    Low,
    Moderate,
    High,
}

impl fmt::Display for DiagnosisConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
        };
        f.write_str(s)
    }
}

/// Named deficiency. Deutan forms affect green cones, Protan forms red cones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeficiencyType {
    Deuteranomaly,
    Deuteranopia,
    Protanomaly,
    Protanopia,
}

impl fmt::Display for DeficiencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Differential diagnosis for one completed test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub status: VisionStatus,
    pub severity: DeficiencySeverity,
    #[serde(rename = "type")]
    pub deficiency: Option<DeficiencyType>,
    pub confidence: DiagnosisConfidence,
    pub deutan_likelihood: f64,
    pub protan_likelihood: f64,
    pub summary: String,
    pub recommendation: String,
    pub details: Vec<String>,
}

/// Whether the plate-type correction could be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    /// Per-plate results were available and type labels were corrected.
    Corrected,
    /// Only the evaluator's own type analysis was available; its type
    /// labels may be wrong, so the Deutan/Protan split is less reliable.
    Degraded,
}

/// Complete colour test outcome handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub overall_accuracy: f64,
    pub total_correct: u32,
    pub total_questions: u32,
    pub type_analysis: TypeBreakdown,
    pub diagnosis: Diagnosis,
    pub mode: EvaluationMode,
}
