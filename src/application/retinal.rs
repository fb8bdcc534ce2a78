//! Retinal analysis service: Classifier call plus report normalization.
//!
//! Collaborator failures never reach the caller; they become fallback
//! reports.

use std::sync::Arc;

use crate::domain::DiagnosisReport;
use crate::ports::{ImageClassifier, ImagePayload};

use super::findings::{self, FallbackKind};

/// Service for analyzing retinal fundus images.
pub struct RetinalService<C>
where
    C: ImageClassifier,
{
    classifier: Arc<C>,
}

impl<C> RetinalService<C>
where
    C: ImageClassifier,
{
    /// Create a new retinal analysis service.
    pub fn new(classifier: Arc<C>) -> Self {
        Self { classifier }
    }

    /// Classify an image and build its report.
    ///
    /// Always returns a report: if the classifier fails, the report is an
    /// `Invalid Image` or `Error` fallback with `error` set.
    pub fn analyze(&self, image: &ImagePayload) -> DiagnosisReport {
        tracing::info!(
            "Classifying {} ({} bytes)...",
            image.file_name,
            image.bytes.len()
        );

        match self.classifier.classify(image) {
            Ok(result) => {
                let report = findings::normalize(&result);
                tracing::info!(
                    "Classification complete: {} at {}% ({} severity, {} findings)",
                    report.primary_diagnosis,
                    report.confidence,
                    report.severity,
                    report.findings.len()
                );
                report
            }
            Err(e) => {
                let kind = FallbackKind::for_error(&e);
                tracing::warn!("Classifier failed ({:?}): {}", kind, e);
                findings::fallback_report(kind, e.to_string())
            }
        }
    }
}
