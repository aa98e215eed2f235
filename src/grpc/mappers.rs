use tonic::Status;

use crate::core::{domain, errors::EngineError};
use crate::grpc::models::{self, Empty, chrono_to_prost, suite_event};

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("Value of {field} does not fit into the wire type: {value}")]
    OutOfRange { field: &'static str, value: usize },
}

fn to_u32(value: usize, field: &'static str) -> Result<u32, ConversionError> {
    u32::try_from(value).map_err(|_| ConversionError::OutOfRange { field, value })
}

impl From<ConversionError> for Status {
    fn from(err: ConversionError) -> Self {
        Status::internal(err.to_string())
    }
}

impl From<EngineError> for Status {
    fn from(err: EngineError) -> Self {
        tracing::error!(error = %err, "Request failed on the engine side");
        match err {
            EngineError::Unavailable => Status::unavailable(err.to_string()),
            _ => Status::internal(err.to_string()),
        }
    }
}

impl From<models::RunOnceRequest> for domain::ExecutionRequest {
    fn from(req: models::RunOnceRequest) -> Self {
        Self {
            source: req.source,
            stdin: req.stdin,
        }
    }
}

impl From<models::TestCase> for domain::TestCase {
    fn from(case: models::TestCase) -> Self {
        Self {
            input: case.input,
            expected_output: case.expected_output,
            hidden: case.hidden,
        }
    }
}

impl From<domain::Verdict> for models::Verdict {
    fn from(verdict: domain::Verdict) -> Self {
        match verdict {
            domain::Verdict::Success => models::Verdict::Success,
            domain::Verdict::GuardRejected => models::Verdict::GuardRejected,
            domain::Verdict::CompileFailed => models::Verdict::CompileFailed,
            domain::Verdict::RuntimeFailed => models::Verdict::RuntimeFailed,
            domain::Verdict::TimedOut => models::Verdict::TimedOut,
        }
    }
}

impl From<domain::SuiteOutcome> for models::SuiteOutcome {
    fn from(outcome: domain::SuiteOutcome) -> Self {
        match outcome {
            domain::SuiteOutcome::Scored => models::SuiteOutcome::Scored,
            domain::SuiteOutcome::CompileFailed => models::SuiteOutcome::CompileFailed,
            domain::SuiteOutcome::GuardRejected => models::SuiteOutcome::GuardRejected,
        }
    }
}

impl From<domain::ExecutionResult> for models::RunOnceResponse {
    fn from(result: domain::ExecutionResult) -> Self {
        Self {
            verdict: models::Verdict::from(result.verdict).into(),
            output: result.output,
            error: result.error,
        }
    }
}

impl From<domain::CaseResult> for models::CaseResult {
    fn from(result: domain::CaseResult) -> Self {
        Self {
            input: result.input,
            actual_output: result.actual_output,
            expected_output_or_redacted: result.expected_output_or_redacted,
            passed: result.passed,
            diagnostic: result.diagnostic,
        }
    }
}

impl TryFrom<domain::ScoringReport> for models::RunSuiteResponse {
    type Error = ConversionError;

    fn try_from(report: domain::ScoringReport) -> Result<Self, ConversionError> {
        Ok(Self {
            outcome: models::SuiteOutcome::from(report.outcome).into(),
            score_percent: report.score_percent.into(),
            passed_count: to_u32(report.passed_count, "passed_count")?,
            total_count: to_u32(report.total_count, "total_count")?,
            per_case: report.cases.into_iter().map(Into::into).collect(),
            started_at: Some(chrono_to_prost(report.started_at)),
            finished_at: Some(chrono_to_prost(report.finished_at)),
            diagnostic: report.diagnostic,
        })
    }
}

impl TryFrom<domain::SuiteState> for models::SuiteEvent {
    type Error = ConversionError;

    fn try_from(state: domain::SuiteState) -> Result<Self, ConversionError> {
        let state = match state {
            domain::SuiteState::Created => suite_event::State::Created(Empty {}),
            domain::SuiteState::Compiling => suite_event::State::Compiling(Empty {}),
            domain::SuiteState::Compiled => suite_event::State::Compiled(Empty {}),
            domain::SuiteState::RunningCase { index } => {
                suite_event::State::RunningCase(models::RunningCase {
                    index: to_u32(index, "index")?,
                })
            }
            domain::SuiteState::CaseCompleted { index, result } => {
                suite_event::State::CaseCompleted(models::CaseCompleted {
                    index: to_u32(index, "index")?,
                    result: Some(result.into()),
                })
            }
            domain::SuiteState::GuardRejected(report) => {
                suite_event::State::GuardRejected(report.try_into()?)
            }
            domain::SuiteState::CompileFailed(report) => {
                suite_event::State::CompileFailed(report.try_into()?)
            }
            domain::SuiteState::Scored(report) => suite_event::State::Scored(report.try_into()?),
        };

        Ok(Self { state: Some(state) })
    }
}
