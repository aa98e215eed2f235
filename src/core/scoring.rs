//! Pure scoring rules.
//!
//! Comparison trims leading and trailing whitespace on both sides and then
//! requires an exact match. Case, inner whitespace and number formatting all
//! matter.

use chrono::{DateTime, Utc};

use crate::core::domain::{
    CaseResult, RunKind, RunOutcome, ScoringReport, SuiteOutcome, TestCase,
};

pub fn outputs_match(actual: &str, expected: &str) -> bool {
    actual.trim() == expected.trim()
}

/// `round(100 * passed / total)` with halves rounded up, `0` for an empty suite.
pub fn score_percent(passed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let passed = passed.min(total);
    ((200 * passed + total) / (2 * total)) as u8
}

/// Scores one run. Only a `Completed` run can pass.
pub fn evaluate_case(case: &TestCase, run: &RunOutcome) -> CaseResult {
    let passed = run.kind == RunKind::Completed && outputs_match(&run.stdout, &case.expected_output);

    CaseResult {
        input: case.input.clone(),
        actual_output: run.stdout.clone(),
        expected_output_or_redacted: case.visible_expected_output(),
        passed,
        diagnostic: run.diagnostic.clone(),
    }
}

/// Result for a case that never ran, e.g. because the submission did not compile.
pub fn failed_case(case: &TestCase, diagnostic: &str) -> CaseResult {
    CaseResult {
        input: case.input.clone(),
        actual_output: String::new(),
        expected_output_or_redacted: case.visible_expected_output(),
        passed: false,
        diagnostic: Some(diagnostic.to_string()),
    }
}

pub fn build_report(
    outcome: SuiteOutcome,
    cases: Vec<CaseResult>,
    diagnostic: Option<String>,
    started_at: DateTime<Utc>,
) -> ScoringReport {
    let passed_count = cases.iter().filter(|c| c.passed).count();
    let total_count = cases.len();

    ScoringReport {
        outcome,
        score_percent: score_percent(passed_count, total_count),
        passed_count,
        total_count,
        cases,
        diagnostic,
        started_at,
        finished_at: Utc::now(),
    }
}
