//! Colour test session manager: Plate provisioning, answers, submission.
//!
//! The service holds no session state. A `TestSession` and its
//! `ResponseSheet` are plain values owned by the caller; failed calls leave
//! both untouched so the test can be resumed or resubmitted.

use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::{uuid_v4, ColourType, ResponseSheet, TestPlate, TestResult, TestSession};
use crate::ports::{EvaluationRequest, PlateProvider, ResponseEvaluator};
use crate::OculusError;

use super::colour_diagnosis;

/// Service running Ishihara colour vision tests.
pub struct ColourTestService<P, E>
where
    P: PlateProvider,
    E: ResponseEvaluator,
{
    plates: Arc<P>,
    evaluator: Arc<E>,
}

impl<P, E> ColourTestService<P, E>
where
    P: PlateProvider,
    E: ResponseEvaluator,
{
    /// Create a new colour test service.
    pub fn new(plates: Arc<P>, evaluator: Arc<E>) -> Self {
        Self { plates, evaluator }
    }

    /// Provision `count` plates and open a new session.
    ///
    /// # Errors
    /// - `InvalidInput` if `count` is zero
    /// - `SessionStart` if the provider fails, returns no plates, or tags a
    ///   plate with an unknown colour type or the same filename twice
    pub fn start_session(&self, count: usize) -> crate::Result<TestSession> {
        if count == 0 {
            return Err(OculusError::InvalidInput(
                "plate count must be at least 1".to_string(),
            ));
        }

        tracing::info!("Requesting {} test plates...", count);

        let provisioned = self
            .plates
            .provision(count)
            .map_err(|e| OculusError::SessionStart(e.to_string()))?;

        if provisioned.images.is_empty() {
            return Err(OculusError::SessionStart(
                "plate service returned no plates".to_string(),
            ));
        }

        let plates = provisioned
            .images
            .into_iter()
            .map(|record| {
                let colour_type = ColourType::try_from(record.colour_type).map_err(|e| {
                    OculusError::SessionStart(format!("plate {}: {e}", record.filename))
                })?;
                Ok(TestPlate {
                    id: record.id,
                    filename: record.filename,
                    colour_type,
                })
            })
            .collect::<crate::Result<Vec<_>>>()?;

        {
            let mut seen = HashSet::with_capacity(plates.len());
            if let Some(dup) = plates.iter().find(|p| !seen.insert(p.filename.as_str())) {
                return Err(OculusError::SessionStart(format!(
                    "plate {} provisioned more than once",
                    dup.filename
                )));
            }
        }

        if plates.len() != count {
            tracing::warn!(
                "Requested {} plates but received {}",
                count,
                plates.len()
            );
        }

        let test_id = if provisioned.test_id.trim().is_empty() {
            let id = uuid_v4();
            tracing::debug!("Plate service sent no test id, generated {}", id);
            id
        } else {
            provisioned.test_id
        };

        let session = TestSession::new(test_id, plates);
        tracing::info!(
            "Started colour test {} with {} plates",
            session.test_id(),
            session.len()
        );
        Ok(session)
    }

    /// Record an answer. See [`TestSession::record_response`].
    ///
    /// # Errors
    /// Same as [`TestSession::record_response`].
    pub fn record_response(
        &self,
        session: &TestSession,
        sheet: &mut ResponseSheet,
        plate_index: usize,
        digit: i64,
    ) -> crate::Result<()> {
        session.record_response(sheet, plate_index, digit)
    }

    #[must_use]
    pub fn is_complete(&self, session: &TestSession, sheet: &ResponseSheet) -> bool {
        session.is_complete(sheet)
    }

    /// Fetch the image bytes of a plate for display.
    ///
    /// # Errors
    /// `InvalidInput` for an unknown index, `UpstreamUnavailable` if the
    /// image cannot be fetched.
    pub fn plate_image(&self, session: &TestSession, plate_index: usize) -> crate::Result<Vec<u8>> {
        let plate = session.plate(plate_index).ok_or_else(|| {
            OculusError::InvalidInput(format!(
                "plate {plate_index} is out of range for a {}-plate test",
                session.len()
            ))
        })?;

        let bytes = self.plates.fetch_image(&plate.filename)?;
        tracing::debug!("Fetched {} ({} bytes)", plate.filename, bytes.len());
        Ok(bytes)
    }

    /// Submit a complete sheet for scoring and diagnose the result.
    ///
    /// # Errors
    /// - `InvalidInput` if the sheet is incomplete or does not match the
    ///   session's plates
    /// - `UpstreamUnavailable` if the evaluator fails; the session and
    ///   sheet can be submitted again
    pub fn submit(&self, session: &TestSession, sheet: &ResponseSheet) -> crate::Result<TestResult> {
        session.verify_sheet(sheet)?;

        tracing::info!(
            "Submitting {} answers for test {}...",
            sheet.len(),
            session.test_id()
        );

        let response = self.evaluator.evaluate(&EvaluationRequest::from(sheet))?;

        if response.total_questions as usize != sheet.len() {
            tracing::warn!(
                "Evaluator scored {} questions for {} answers",
                response.total_questions,
                sheet.len()
            );
        }

        let result = colour_diagnosis::evaluate(response);
        tracing::info!(
            "Colour test {} complete: {:.1}% accuracy, {} ({:?} mode)",
            session.test_id(),
            result.overall_accuracy,
            result.diagnosis.status,
            result.mode
        );
        Ok(result)
    }
}
