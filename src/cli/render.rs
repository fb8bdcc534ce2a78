//! Plain text rendering of reports and test results.

use std::fmt::Write;

use crate::domain::{DiagnosisReport, EvaluationMode, TestResult};

/// Render a retinal report for the terminal.
#[must_use]
pub fn render_report(report: &DiagnosisReport) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "Retinal Analysis");
    let _ = writeln!(output, "================");
    let _ = writeln!(
        output,
        "Diagnosis:  {} ({}% confidence, {} severity)",
        report.primary_diagnosis, report.confidence, report.severity
    );

    if let Some(error) = &report.error {
        let _ = writeln!(output, "Reason:     {error}");
    }

    if !report.findings.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "Findings:");
        for finding in &report.findings {
            let _ = writeln!(
                output,
                "  {:<24} {:>3}%  {}",
                finding.condition, finding.confidence, finding.severity
            );
        }
    }

    if let Some(info) = &report.condition_info {
        let _ = writeln!(output);
        let _ = writeln!(output, "About:      {}", info.description);
        let _ = writeln!(output, "Symptoms:   {}", info.symptoms);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "{}", report.recommendation);
    output
}

/// Render a colour test result for the terminal.
#[must_use]
pub fn render_test_result(result: &TestResult) -> String {
    let mut output = String::new();
    let diagnosis = &result.diagnosis;

    let _ = writeln!(output, "Colour Vision Test");
    let _ = writeln!(output, "==================");
    let _ = writeln!(
        output,
        "Score:      {}/{} correct ({:.1}%)",
        result.total_correct, result.total_questions, result.overall_accuracy
    );
    let _ = writeln!(output, "Result:     {}", diagnosis.summary);
    let _ = writeln!(
        output,
        "Status:     {} (severity {}, confidence {})",
        diagnosis.status, diagnosis.severity, diagnosis.confidence
    );
    if let Some(deficiency) = diagnosis.deficiency {
        let _ = writeln!(output, "Type:       {deficiency}");
    }
    let _ = writeln!(
        output,
        "Likelihood: Deutan {:.1}%, Protan {:.1}%",
        diagnosis.deutan_likelihood, diagnosis.protan_likelihood
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "Per plate type:");
    for (colour_type, analysis) in result.type_analysis.iter() {
        if !analysis.has_data() {
            continue;
        }
        let _ = writeln!(
            output,
            "  {} ({:<16}) {:>2}/{:<2} wrong  {:>5.1}%",
            colour_type,
            colour_type.axis(),
            analysis.mistakes,
            analysis.total,
            analysis.error_percentage
        );
    }

    if !diagnosis.details.is_empty() {
        let _ = writeln!(output);
        for detail in &diagnosis.details {
            let _ = writeln!(output, "- {detail}");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "{}", diagnosis.recommendation);

    if result.mode == EvaluationMode::Degraded {
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "Note: per-plate results were unavailable, so plate types could not be \
             verified. The Deutan/Protan split may be unreliable."
        );
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{classify, fallback_report, FallbackKind};
    use crate::domain::{ColourType, TypeAnalysis, TypeBreakdown};

    #[test]
    fn test_render_fallback_report() {
        let report = fallback_report(FallbackKind::Error, "Transport failure: connection refused");
        let text = render_report(&report);
        assert!(text.contains("Diagnosis:  Error (0% confidence, Low severity)"));
        assert!(text.contains("Reason:     Transport failure: connection refused"));
        assert!(!text.contains("Findings:"));
    }

    #[test]
    fn test_render_degraded_result() {
        let mut breakdown = TypeBreakdown::default();
        breakdown.set(ColourType::GreenOrange, TypeAnalysis::from_counts(20, 18));

        let result = TestResult {
            overall_accuracy: 10.0,
            total_correct: 2,
            total_questions: 20,
            type_analysis: breakdown,
            diagnosis: classify(&breakdown),
            mode: EvaluationMode::Degraded,
        };

        let text = render_test_result(&result);
        assert!(text.contains("Score:      2/20 correct (10.0%)"));
        assert!(text.contains("Type:       Deuteranopia"));
        assert!(text.contains("Type 1 (green vs orange"));
        assert!(!text.contains("Type 2 ("));
        assert!(text.contains("- Type 1 errors (green vs orange): 90.0%"));
        assert!(text.contains("Note: per-plate results were unavailable"));
    }
}
