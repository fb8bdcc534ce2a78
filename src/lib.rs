//! # Oculus
//!
//! Diagnostic post-processing for two eye-screening tasks.
//!
//! This crate provides:
//! - Normalization of retinal fundus classifier confidences into a findings report
//! - Ishihara plate test sessions (plate issue, response capture, evaluation)
//! - Rule-based Deutan/Protan differential diagnosis from per-type error rates
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core value types (reports, plates, sessions, diagnoses)
//! - `ports`: Trait definitions for the external classifier and test services
//! - `adapters`: Concrete implementations (HTTP clients, log sanitization)
//! - `application`: Use cases and the pure scoring engines
//! - `cli`: Command-line front end

pub mod adapters;
pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod ports;

pub use domain::{Diagnosis, DiagnosisReport, Severity, TestResult, TestSession};

/// Result type for Oculus operations
pub type Result<T> = std::result::Result<T, OculusError>;

/// Main error type for Oculus
#[derive(Debug, thiserror::Error)]
pub enum OculusError {
    #[error("Upstream service unavailable: {0}")]
    UpstreamUnavailable(#[from] ports::ServiceError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Answer {0} is not a digit between 0 and 9")]
    InvalidDigit(i64),

    #[error("Plate {plate_index} already has a response")]
    DuplicateResponse { plate_index: usize },

    #[error("All plates in this session have been answered")]
    SessionComplete,

    #[error("Could not start test session: {0}")]
    SessionStart(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
