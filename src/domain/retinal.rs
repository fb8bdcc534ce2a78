//! Retinal fundus classification types.
//!
//! Represents the raw output of the external image classifier and the
//! normalized report derived from it.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Severity bucket for the primary diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// Confidence below 60%
    Low,
    /// Confidence from 60% up to 80%
    Moderate,
    /// Confidence of 80% or more
    High,
}

impl Severity {
    /// Bucket a primary-diagnosis confidence (percent).
    #[must_use]
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 80.0 {
            Self::High
        } else if confidence >= 60.0 {
            Self::Moderate
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Moderate => write!(f, "Moderate"),
            Self::High => write!(f, "High"),
        }
    }
}

/// Presence marker for a single finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FindingSeverity {
    Present,
    #[serde(rename = "None")]
    Absent,
}

impl FindingSeverity {
    /// A condition counts as present from 50% confidence.
    #[must_use]
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 50.0 {
            Self::Present
        } else {
            Self::Absent
        }
    }
}

impl fmt::Display for FindingSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present => write!(f, "Present"),
            Self::Absent => write!(f, "None"),
        }
    }
}

/// Per-class confidences in the order the classifier reported them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassScores(Vec<(String, f64)>);

impl ClassScores {
    #[must_use]
    pub fn new(scores: Vec<(String, f64)>) -> Self {
        Self(scores)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(label, score)| (label.as_str(), *score))
    }

    #[must_use]
    pub fn get(&self, label: &str) -> Option<f64> {
        self.0.iter().find(|(l, _)| l == label).map(|(_, s)| *s)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for ClassScores {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(l, s)| (l.into(), s)).collect())
    }
}

impl Serialize for ClassScores {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, score) in &self.0 {
            map.serialize_entry(label, score)?;
        }
        map.end()
    }
}

struct ClassScoresVisitor;

impl<'de> Visitor<'de> for ClassScoresVisitor {
    type Value = ClassScores;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of class label to confidence")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut scores = Vec::with_capacity(access.size_hint().unwrap_or(4));
        while let Some((label, score)) = access.next_entry::<String, f64>()? {
            scores.push((label, score));
        }
        Ok(ClassScores(scores))
    }
}

impl<'de> Deserialize<'de> for ClassScores {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ClassScoresVisitor)
    }
}

/// Raw classifier output for one uploaded image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Winning class label, e.g. `diabetic_retinopathy`
    pub predicted_class: String,

    /// Confidence of the winning class (0-100)
    pub confidence: f64,

    /// Confidence for every class the model knows
    #[serde(default)]
    pub all_predictions: ClassScores,

    /// Upstream description of the predicted condition, if supplied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Upstream symptom summary, if supplied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symptoms: Option<String>,

    /// Display hints for the condition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Background text about a condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionInfo {
    pub description: String,
    pub symptoms: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl ConditionInfo {
    /// Built-in information for the classes the retinal model is trained on.
    #[must_use]
    pub fn for_class(label: &str) -> Option<Self> {
        let (description, symptoms) = match label {
            "cataract" => (
                "A clouding of the eye lens that affects vision.",
                "Blurred vision, faded colors, glare sensitivity",
            ),
            "diabetic_retinopathy" => (
                "Damage to blood vessels in the retina due to diabetes.",
                "Floaters, blurred vision, dark areas",
            ),
            "glaucoma" => (
                "A group of eye conditions damaging the optic nerve.",
                "Peripheral vision loss, eye pain, nausea",
            ),
            "normal" => (
                "No signs of common eye diseases detected.",
                "Healthy eye condition",
            ),
            _ => return None,
        };

        Some(Self {
            description: description.to_string(),
            symptoms: symptoms.to_string(),
            icon: None,
            color: None,
        })
    }
}

/// One labeled condition in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub condition: String,
    pub severity: FindingSeverity,
    pub confidence: i64,
}

/// Normalized retinal report handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisReport {
    /// Title-cased predicted condition, or `Invalid Image` / `Error`
    pub primary_diagnosis: String,

    /// Rounded confidence of the primary diagnosis
    pub confidence: i64,

    /// Severity bucket of the primary diagnosis
    pub severity: Severity,

    /// One finding per class, in classifier order
    pub findings: Vec<Finding>,

    /// Guidance text
    pub recommendation: String,

    /// Background text for the primary condition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_info: Option<ConditionInfo>,

    /// Why the classifier could not produce a result (fallback reports only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Timestamp of report creation
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl DiagnosisReport {
    /// Whether this report is a fallback produced after a classifier failure.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}

/// Title-case a class label: underscores become spaces and the first
/// character of every word is upper-cased. The rest of each word is kept.
#[must_use]
pub fn title_case(label: &str) -> String {
    label
        .replace('_', " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
