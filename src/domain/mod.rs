//! Domain layer: Core value types for both screening pipelines.
//!
//! Everything here is plain data plus the small rules that belong to a
//! single value (severity buckets, digit validation, sequential response
//! capture). Nothing in this module performs I/O.

mod colour;
mod ids;
mod plate;
mod retinal;

pub use colour::{
    DeficiencySeverity, DeficiencyType, DetailedResult, Diagnosis, DiagnosisConfidence,
    EvaluationMode, TestResult, TypeAnalysis, TypeBreakdown, VisionStatus,
};
pub use ids::uuid_v4;
pub use plate::{ColourType, Digit, ResponseSheet, TestPlate, TestSession, UserResponse};
pub use retinal::{
    title_case, ClassScores, ClassificationResult, ConditionInfo, DiagnosisReport, Finding,
    FindingSeverity, Severity,
};
