//! Ports layer: Trait definitions for external collaborators.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the scoring core and the services it depends on (image
//! classifier, plate provisioning, response evaluation).

mod classifier;
mod evaluator;
mod plates;

pub use classifier::{ImageClassifier, ImagePayload, DEFAULT_MAX_IMAGE_BYTES};
pub use evaluator::{EvaluationRequest, EvaluationResponse, ResponseEvaluator};
pub use plates::{PlateProvider, PlateRecord, ProvisionedPlates};

/// Failure reported by an external collaborator.
///
/// Kept free of any transport library types so adapters can map their own
/// errors into it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Service rejected the request: {0}")]
    Rejected(String),

    #[error("Malformed service response: {0}")]
    Decode(String),
}

impl ServiceError {
    /// Whether the service understood the request but refused the input
    /// itself (as opposed to being unreachable or broken).
    #[must_use]
    pub fn is_input_rejection(&self) -> bool {
        match self {
            Self::Rejected(_) => true,
            Self::Status { status, .. } => (400..500).contains(status),
            Self::Transport(_) | Self::Decode(_) => false,
        }
    }
}
