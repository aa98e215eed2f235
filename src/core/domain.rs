use chrono::{DateTime, Utc};

use crate::constants::{COMPILATION_FAILED_MSG, REDACTION_MARKER};

/// A single ad-hoc execution: one source text and the stdin fed to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub source: String,
    pub stdin: String,
}

impl ExecutionRequest {
    pub fn new(source: &str, stdin: &str) -> Self {
        ExecutionRequest {
            source: source.to_string(),
            stdin: stdin.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileOutcome {
    pub succeeded: bool,
    pub diagnostic: String,
}

impl CompileOutcome {
    pub fn success() -> Self {
        CompileOutcome {
            succeeded: true,
            diagnostic: String::new(),
        }
    }

    /// Builds a failed outcome. An empty compiler message is replaced so the
    /// submitter never sees a blank diagnostic.
    pub fn failure(diagnostic: impl Into<String>) -> Self {
        let diagnostic = diagnostic.into();
        CompileOutcome {
            succeeded: false,
            diagnostic: if diagnostic.trim().is_empty() {
                COMPILATION_FAILED_MSG.to_string()
            } else {
                diagnostic
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunKind {
    Completed,
    RuntimeFailed,
    TimedOut,
    LaunchFailed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunOutcome {
    pub kind: RunKind,
    pub stdout: String,
    pub stderr: String,
    pub exit_status: Option<i32>,
    pub execution_time_ms: u64,
    /// Set for every kind except `Completed`.
    pub diagnostic: Option<String>,
}

impl RunOutcome {
    pub fn launch_failed(msg: impl Into<String>) -> Self {
        RunOutcome {
            kind: RunKind::LaunchFailed,
            stdout: String::new(),
            stderr: String::new(),
            exit_status: None,
            execution_time_ms: 0,
            diagnostic: Some(msg.into()),
        }
    }
}

/// Caller-facing classification of one execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Success,
    GuardRejected,
    CompileFailed,
    RuntimeFailed,
    TimedOut,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionResult {
    pub verdict: Verdict,
    pub output: String,
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
    pub hidden: bool,
}

impl TestCase {
    pub fn new(input: &str, expected_output: &str, hidden: bool) -> Self {
        TestCase {
            input: input.to_string(),
            expected_output: expected_output.to_string(),
            hidden,
        }
    }

    /// Expected output as it may be shown to the submitter.
    pub fn visible_expected_output(&self) -> String {
        if self.hidden {
            REDACTION_MARKER.to_string()
        } else {
            self.expected_output.clone()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaseResult {
    pub input: String,
    pub actual_output: String,
    pub expected_output_or_redacted: String,
    pub passed: bool,
    pub diagnostic: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SuiteOutcome {
    Scored,
    CompileFailed,
    GuardRejected,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoringReport {
    pub outcome: SuiteOutcome,
    pub cases: Vec<CaseResult>,
    pub passed_count: usize,
    pub total_count: usize,
    pub score_percent: u8,
    /// Shared reason when no case could run (guard rejection, compile error).
    pub diagnostic: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Lifecycle of one submission being scored.
///
/// `GuardRejected`, `CompileFailed` and `Scored` are terminal and carry the
/// report; each scoring call reaches exactly one of them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SuiteState {
    Created,
    Compiling,
    Compiled,
    RunningCase { index: usize },
    CaseCompleted { index: usize, result: CaseResult },
    GuardRejected(ScoringReport),
    CompileFailed(ScoringReport),
    Scored(ScoringReport),
}

impl Default for SuiteState {
    fn default() -> Self {
        SuiteState::Created
    }
}

impl SuiteState {
    pub fn terminal(report: ScoringReport) -> Self {
        match report.outcome {
            SuiteOutcome::GuardRejected => SuiteState::GuardRejected(report),
            SuiteOutcome::CompileFailed => SuiteState::CompileFailed(report),
            SuiteOutcome::Scored => SuiteState::Scored(report),
        }
    }

    pub fn report(&self) -> Option<&ScoringReport> {
        match self {
            SuiteState::GuardRejected(report)
            | SuiteState::CompileFailed(report)
            | SuiteState::Scored(report) => Some(report),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.report().is_some()
    }
}
