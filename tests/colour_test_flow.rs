//! End-to-end colour test through in-memory collaborators.

use std::sync::{Arc, Mutex};

use oculus::application::ColourTestService;
use oculus::domain::{
    ColourType, DeficiencySeverity, DeficiencyType, DetailedResult, EvaluationMode, TypeAnalysis,
    TypeBreakdown, VisionStatus,
};
use oculus::ports::{
    EvaluationRequest, EvaluationResponse, PlateProvider, PlateRecord, ProvisionedPlates,
    ResponseEvaluator, ServiceError,
};
use oculus::OculusError;

/// Plate service with a fixed catalogue of (filename, reported type, digit).
struct Catalogue {
    plates: Vec<(String, i64, u8)>,
}

impl Catalogue {
    fn new(plates: &[(&str, i64, u8)]) -> Self {
        Self {
            plates: plates
                .iter()
                .map(|(f, t, d)| ((*f).to_string(), *t, *d))
                .collect(),
        }
    }

    fn digit_for(&self, filename: &str) -> Option<(i64, u8)> {
        self.plates
            .iter()
            .find(|(f, _, _)| f == filename)
            .map(|(_, t, d)| (*t, *d))
    }
}

impl PlateProvider for Catalogue {
    fn provision(&self, count: usize) -> Result<ProvisionedPlates, ServiceError> {
        let images: Vec<PlateRecord> = self
            .plates
            .iter()
            .take(count)
            .enumerate()
            .map(|(i, (filename, colour_type, _))| PlateRecord {
                id: i as u32,
                filename: filename.clone(),
                colour_type: *colour_type,
            })
            .collect();
        Ok(ProvisionedPlates {
            test_id: String::new(),
            total_images: images.len(),
            images,
        })
    }

    fn fetch_image(&self, _filename: &str) -> Result<Vec<u8>, ServiceError> {
        Ok(Vec::new())
    }
}

/// Evaluator scoring against the catalogue.
struct Scorer {
    catalogue: Arc<Catalogue>,
    detailed: bool,
    down: Mutex<bool>,
    seen: Mutex<Vec<EvaluationRequest>>,
}

impl Scorer {
    fn new(catalogue: Arc<Catalogue>, detailed: bool) -> Self {
        Self {
            catalogue,
            detailed,
            down: Mutex::new(false),
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl ResponseEvaluator for Scorer {
    fn evaluate(&self, request: &EvaluationRequest) -> Result<EvaluationResponse, ServiceError> {
        self.seen.lock().expect("Should lock").push(request.clone());
        if *self.down.lock().expect("Should lock") {
            return Err(ServiceError::Transport("connection refused".to_string()));
        }

        let mut results = Vec::new();
        let mut upstream = [(0u32, 0u32); 4];
        for response in &request.responses {
            let (reported, correct) = self
                .catalogue
                .digit_for(&response.filename)
                .ok_or_else(|| ServiceError::Rejected("unknown plate".to_string()))?;
            let is_correct = response.user_answer.value() == correct;
            let slot = (reported - 1) as usize;
            upstream[slot].0 += 1;
            if !is_correct {
                upstream[slot].1 += 1;
            }
            results.push(DetailedResult {
                filename: response.filename.clone(),
                correct_digit: i64::from(correct),
                user_answer: i64::from(response.user_answer.value()),
                is_correct,
                color_type: reported,
            });
        }

        let total = results.len() as u32;
        let correct = results.iter().filter(|r| r.is_correct).count() as u32;
        let mut type_analysis = TypeBreakdown::default();
        for (t, (n, m)) in ColourType::ALL.into_iter().zip(upstream) {
            type_analysis.set(t, TypeAnalysis::from_counts(n, m));
        }

        Ok(EvaluationResponse {
            overall_accuracy: f64::from(correct) / f64::from(total) * 100.0,
            total_correct: correct,
            total_questions: total,
            type_analysis,
            diagnosis: Some(serde_json::json!({"status": "possible_weakness"})),
            detailed_results: self.detailed.then_some(results),
        })
    }
}

/// Ten plates: four type 1, three type 2 and three `theme_4` plates the
/// service labels as type 3.
fn catalogue() -> Arc<Catalogue> {
    Arc::new(Catalogue::new(&[
        ("theme_1_01.png", 1, 1),
        ("theme_2_01.png", 2, 8),
        ("theme_4_01.png", 3, 9),
        ("theme_1_02.png", 1, 5),
        ("theme_2_02.png", 2, 3),
        ("theme_4_02.png", 3, 4),
        ("theme_1_03.png", 1, 7),
        ("theme_2_03.png", 2, 6),
        ("theme_4_03.png", 3, 5),
        ("theme_1_04.png", 1, 2),
    ]))
}

fn correct_digit(filename: &str, catalogue: &Catalogue) -> i64 {
    let (_, d) = catalogue.digit_for(filename).expect("Should know plate");
    i64::from(d)
}

/// Answer red/green plates correctly and every green one wrong.
fn green_blind_answer(filename: &str, catalogue: &Catalogue) -> i64 {
    let right = correct_digit(filename, catalogue);
    if filename.contains("theme_1") || filename.contains("theme_4") {
        (right + 1) % 10
    } else {
        right
    }
}

#[test]
fn test_green_blind_user_with_corrected_types() {
    let catalogue = catalogue();
    let scorer = Arc::new(Scorer::new(Arc::clone(&catalogue), true));
    let service = ColourTestService::new(Arc::clone(&catalogue), Arc::clone(&scorer));

    let session = service.start_session(10).expect("Should start");
    assert_eq!(session.len(), 10);
    assert_eq!(session.test_id().len(), 36);

    let mut sheet = session.new_sheet();
    for (i, plate) in session.plates().iter().enumerate() {
        let digit = green_blind_answer(&plate.filename, &catalogue);
        service
            .record_response(&session, &mut sheet, i, digit)
            .expect("Should record");
    }
    assert!(service.is_complete(&session, &sheet));

    let result = service.submit(&session, &sheet).expect("Should evaluate");
    assert_eq!(result.mode, EvaluationMode::Corrected);
    assert_eq!(result.total_questions, 10);
    assert_eq!(result.total_correct, 3);

    let t4 = result.type_analysis.get(ColourType::YellowGreen);
    assert_eq!((t4.total, t4.mistakes), (3, 3));
    assert!(!result.type_analysis.get(ColourType::GrayRed).has_data());

    let d = &result.diagnosis;
    assert_eq!(d.status, VisionStatus::ColourBlind);
    assert_eq!(d.deficiency, Some(DeficiencyType::Deuteranopia));
    assert_eq!(d.deutan_likelihood, 100.0);
    assert_eq!(d.protan_likelihood, 0.0);

    let seen = scorer.seen.lock().expect("Should lock");
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].responses.len(), 10);
    assert_eq!(seen[0].responses[2].filename, "theme_4_01.png");
}

#[test]
fn test_degraded_mode_uses_upstream_types() {
    let catalogue = catalogue();
    let scorer = Arc::new(Scorer::new(Arc::clone(&catalogue), false));
    let service = ColourTestService::new(Arc::clone(&catalogue), scorer);

    let session = service.start_session(10).expect("Should start");
    let mut sheet = session.new_sheet();
    for (i, plate) in session.plates().iter().enumerate() {
        let digit = green_blind_answer(&plate.filename, &catalogue);
        service
            .record_response(&session, &mut sheet, i, digit)
            .expect("Should record");
    }

    let result = service.submit(&session, &sheet).expect("Should evaluate");
    assert_eq!(result.mode, EvaluationMode::Degraded);

    // The mislabeled plates count as type 3 here: deutan 100 (type 1 only),
    // protan mean(0, 100) = 50.
    assert_eq!(result.type_analysis.get(ColourType::GrayRed).mistakes, 3);
    assert_eq!(result.diagnosis.deutan_likelihood, 100.0);
    assert_eq!(result.diagnosis.protan_likelihood, 50.0);
    assert_eq!(result.diagnosis.deficiency, Some(DeficiencyType::Deuteranopia));
}

#[test]
fn test_rejected_answers_leave_sheet_unchanged() {
    let catalogue = catalogue();
    let scorer = Arc::new(Scorer::new(Arc::clone(&catalogue), true));
    let service = ColourTestService::new(Arc::clone(&catalogue), scorer);

    let session = service.start_session(3).expect("Should start");
    let mut sheet = session.new_sheet();

    assert!(matches!(
        service.record_response(&session, &mut sheet, 0, 10),
        Err(OculusError::InvalidDigit(10))
    ));
    assert!(matches!(
        service.record_response(&session, &mut sheet, 0, -1),
        Err(OculusError::InvalidDigit(-1))
    ));
    assert!(sheet.is_empty());

    service
        .record_response(&session, &mut sheet, 0, 2)
        .expect("Should record");
    assert!(matches!(
        service.record_response(&session, &mut sheet, 0, 3),
        Err(OculusError::DuplicateResponse { plate_index: 0 })
    ));
    assert!(matches!(
        service.record_response(&session, &mut sheet, 2, 3),
        Err(OculusError::InvalidInput(_))
    ));
    assert_eq!(sheet.len(), 1);
    assert_eq!(sheet.responses()[0].user_answer.value(), 2);

    service.record_response(&session, &mut sheet, 1, 8).expect("Should record");
    service.record_response(&session, &mut sheet, 2, 9).expect("Should record");
    assert!(matches!(
        service.record_response(&session, &mut sheet, 3, 1),
        Err(OculusError::SessionComplete)
    ));
}

#[test]
fn test_session_resumable_after_evaluator_outage() {
    let catalogue = catalogue();
    let scorer = Arc::new(Scorer::new(Arc::clone(&catalogue), true));
    let service = ColourTestService::new(Arc::clone(&catalogue), Arc::clone(&scorer));

    let session = service.start_session(10).expect("Should start");
    let mut sheet = session.new_sheet();
    for (i, plate) in session.plates().iter().enumerate() {
        let digit = correct_digit(&plate.filename, &catalogue);
        service
            .record_response(&session, &mut sheet, i, digit)
            .expect("Should record");
    }

    *scorer.down.lock().expect("Should lock") = true;
    assert!(matches!(
        service.submit(&session, &sheet),
        Err(OculusError::UpstreamUnavailable(ServiceError::Transport(_)))
    ));

    *scorer.down.lock().expect("Should lock") = false;
    let result = service.submit(&session, &sheet).expect("Should evaluate");
    assert_eq!(result.total_correct, 10);
    assert_eq!(result.diagnosis.status, VisionStatus::Normal);
    assert_eq!(result.diagnosis.severity, DeficiencySeverity::None);

    let seen = scorer.seen.lock().expect("Should lock");
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], seen[1]);
}
