//! Application layer: Use cases and services.
//!
//! Pure transforms (`findings`, `colour_diagnosis`) and the services that
//! combine them with the collaborator ports.

pub mod colour_diagnosis;
pub mod findings;
mod retinal;
mod session;

pub use colour_diagnosis::{classify, evaluate, Likelihoods};
pub use findings::{fallback_report, normalize, FallbackKind};
pub use retinal::RetinalService;
pub use session::ColourTestService;
