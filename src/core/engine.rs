use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Semaphore, SemaphorePermit, mpsc::Sender};

use crate::{
    constants::RUN_DEADLINE,
    core::{
        classifier::classify,
        domain::{
            ExecutionRequest, ExecutionResult, RunKind, ScoringReport, SuiteOutcome, SuiteState,
            TestCase, Verdict,
        },
        errors::EngineError,
        guard,
        scoring::{build_report, evaluate_case, failed_case},
        traits::executor::Executor,
        workspace::{Workspace, WorkspaceManager},
    },
};

/// Entry point for collaborators: ad-hoc runs and suite scoring.
///
/// Holds no per-request state. Every call gets its own workspace, and the
/// semaphore bounds how many calls compile or run at the same time.
#[derive(Clone, Debug)]
pub struct Engine {
    executor: Arc<dyn Executor>,
    workspaces: WorkspaceManager,
    run_deadline: Duration,
    permits: Arc<Semaphore>,
}

impl Engine {
    pub fn new(
        executor: Arc<dyn Executor>,
        workspaces: WorkspaceManager,
        max_concurrent: usize,
    ) -> Self {
        Engine {
            executor,
            workspaces,
            run_deadline: RUN_DEADLINE,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub fn with_run_deadline(mut self, deadline: Duration) -> Self {
        self.run_deadline = deadline;
        self
    }

    /// Stops admitting requests. Calls already holding a permit run to the
    /// end; queued and later ones fail with [`EngineError::Unavailable`].
    pub fn close(&self) {
        self.permits.close();
        tracing::info!("Engine closed, no new requests are admitted");
    }

    #[tracing::instrument(skip_all)]
    pub async fn run_once(&self, request: &ExecutionRequest) -> Result<ExecutionResult, EngineError> {
        if let Err(rejection) = guard::check(&request.source) {
            return Ok(ExecutionResult {
                verdict: Verdict::GuardRejected,
                output: String::new(),
                error: Some(rejection.message()),
            });
        }

        let _permit = self.permit().await?;
        let workspace = self.workspaces.acquire().await?;
        let result = self.compile_and_run(&workspace, request).await;
        self.workspaces.release(workspace).await;

        if let Ok(result) = &result {
            tracing::info!(verdict = ?result.verdict, "Execution finished");
        }
        result
    }

    pub async fn run_suite(
        &self,
        source: &str,
        cases: &[TestCase],
    ) -> Result<ScoringReport, EngineError> {
        self.run_suite_with_progress(source, cases, None).await
    }

    /// Scores `source` against `cases`, reporting every state transition to
    /// `progress` when given. The terminal state carries the returned report.
    #[tracing::instrument(skip_all, fields(cases = cases.len()))]
    pub async fn run_suite_with_progress(
        &self,
        source: &str,
        cases: &[TestCase],
        progress: Option<Sender<SuiteState>>,
    ) -> Result<ScoringReport, EngineError> {
        let started_at = Utc::now();
        let progress = Progress(progress);
        progress.emit(SuiteState::Created).await;

        if let Err(rejection) = guard::check(source) {
            let msg = rejection.message();
            let results = cases.iter().map(|case| failed_case(case, &msg)).collect();
            let report = build_report(SuiteOutcome::GuardRejected, results, Some(msg), started_at);
            progress.emit(SuiteState::terminal(report.clone())).await;
            return Ok(report);
        }

        let _permit = self.permit().await?;
        let workspace = self.workspaces.acquire().await?;
        let report = self
            .score_in(&workspace, source, cases, &progress, started_at)
            .await;
        self.workspaces.release(workspace).await;
        let report = report?;

        tracing::info!(
            outcome = ?report.outcome,
            passed = report.passed_count,
            total = report.total_count,
            score = report.score_percent,
            "Suite scored"
        );
        progress.emit(SuiteState::terminal(report.clone())).await;
        Ok(report)
    }

    async fn permit(&self) -> Result<SemaphorePermit<'_>, EngineError> {
        self.permits
            .acquire()
            .await
            .map_err(|_| EngineError::Unavailable)
    }

    async fn compile_and_run(
        &self,
        workspace: &Workspace,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResult, EngineError> {
        let compile = self.executor.compile(workspace, &request.source).await?;
        if !compile.succeeded {
            return classify(&compile, None);
        }

        let run = self
            .executor
            .run(workspace, &request.stdin, self.run_deadline)
            .await;
        classify(&compile, Some(run))
    }

    /// Compiles once, then runs the cases one after another in the same workspace.
    async fn score_in(
        &self,
        workspace: &Workspace,
        source: &str,
        cases: &[TestCase],
        progress: &Progress,
        started_at: DateTime<Utc>,
    ) -> Result<ScoringReport, EngineError> {
        progress.emit(SuiteState::Compiling).await;
        let compile = self.executor.compile(workspace, source).await?;

        if !compile.succeeded {
            tracing::info!("Submission does not compile, no case will run");
            let results = cases
                .iter()
                .map(|case| failed_case(case, &compile.diagnostic))
                .collect();
            return Ok(build_report(
                SuiteOutcome::CompileFailed,
                results,
                Some(compile.diagnostic),
                started_at,
            ));
        }
        progress.emit(SuiteState::Compiled).await;

        let mut results = Vec::with_capacity(cases.len());
        for (index, case) in cases.iter().enumerate() {
            progress.emit(SuiteState::RunningCase { index }).await;

            let run = self
                .executor
                .run(workspace, &case.input, self.run_deadline)
                .await;
            if run.kind == RunKind::LaunchFailed {
                return Err(EngineError::LaunchFailed {
                    msg: run.diagnostic.unwrap_or_default(),
                });
            }

            let result = evaluate_case(case, &run);
            tracing::debug!(index, kind = ?run.kind, passed = result.passed, "Case evaluated");
            progress
                .emit(SuiteState::CaseCompleted {
                    index,
                    result: result.clone(),
                })
                .await;
            results.push(result);
        }

        Ok(build_report(SuiteOutcome::Scored, results, None, started_at))
    }
}

struct Progress(Option<Sender<SuiteState>>);

impl Progress {
    async fn emit(&self, state: SuiteState) {
        let Some(tx) = &self.0 else {
            return;
        };
        if tx.send(state).await.is_err() {
            tracing::debug!("Progress receiver dropped");
        }
    }
}
