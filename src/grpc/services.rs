use tokio::sync::mpsc::{Sender, channel};
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};

use crate::{
    core::{
        domain::{self, SuiteState},
        engine::Engine,
    },
    grpc::models::{
        RunOnceRequest, RunOnceResponse, RunSuiteRequest, RunSuiteResponse, SuiteEvent,
        engine_service_server::EngineService,
    },
};

#[derive(Clone, Debug)]
pub struct EngineServiceImpl {
    engine: Engine,
}

#[tonic::async_trait]
impl EngineService for EngineServiceImpl {
    type WatchSuiteStream = ReceiverStream<Result<SuiteEvent, Status>>;

    #[tracing::instrument(skip_all)]
    async fn run_once(
        &self,
        request: Request<RunOnceRequest>,
    ) -> Result<Response<RunOnceResponse>, Status> {
        let request: domain::ExecutionRequest = request.into_inner().into();
        tracing::info!(
            source_bytes = request.source.len(),
            stdin_bytes = request.stdin.len(),
            "Received RunOnce"
        );

        let result = self.engine.run_once(&request).await?;
        Ok(Response::new(result.into()))
    }

    #[tracing::instrument(skip_all)]
    async fn run_suite(
        &self,
        request: Request<RunSuiteRequest>,
    ) -> Result<Response<RunSuiteResponse>, Status> {
        let (source, cases) = into_suite(request.into_inner());
        tracing::info!(cases = cases.len(), "Received RunSuite");

        let report = self.engine.run_suite(&source, &cases).await?;
        Ok(Response::new(report.try_into()?))
    }

    #[tracing::instrument(skip_all)]
    async fn watch_suite(
        &self,
        request: Request<RunSuiteRequest>,
    ) -> Result<Response<Self::WatchSuiteStream>, Status> {
        let (source, cases) = into_suite(request.into_inner());
        tracing::info!(cases = cases.len(), "Received WatchSuite");

        let (stream_tx, stream_rx) = channel::<Result<SuiteEvent, Status>>(128);
        let (progress_tx, mut progress_rx) = channel::<SuiteState>(128);
        let engine = self.engine.clone();

        tokio::spawn(async move {
            let scoring = engine.run_suite_with_progress(&source, &cases, Some(progress_tx));
            let forwarding = async {
                while let Some(state) = progress_rx.recv().await {
                    tracing::debug!("Send new suite state: {:?}", state);
                    send(&stream_tx, SuiteEvent::try_from(state).map_err(Status::from)).await;
                }
            };

            let (result, ()) = futures::join!(scoring, forwarding);
            if let Err(e) = result {
                send(&stream_tx, Err(e.into())).await;
            }
        });

        Ok(Response::new(ReceiverStream::new(stream_rx)))
    }
}

impl EngineServiceImpl {
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }
}

fn into_suite(request: RunSuiteRequest) -> (String, Vec<domain::TestCase>) {
    let cases = request.test_cases.into_iter().map(Into::into).collect();
    (request.source, cases)
}

async fn send(stream_tx: &Sender<Result<SuiteEvent, Status>>, event: Result<SuiteEvent, Status>) {
    // The scoring keeps going when the client hangs up; its workspace must still be released.
    if stream_tx.send(event).await.is_err() {
        tracing::debug!("Client dropped the suite stream");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        constants::{GUARD_REJECTED_MSG, REDACTION_MARKER},
        core::{
            domain::{CompileOutcome, RunKind, RunOutcome},
            traits::executor::ExecutorError,
            workspace::WorkspaceManager,
        },
        grpc::models::{SuiteOutcome, TestCase as GrpcTestCase, Verdict, suite_event::State},
        stubs::executor::ExecutorStub,
    };
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_stream::StreamExt;
    use uuid::Uuid;

    fn test_root() -> PathBuf {
        std::env::temp_dir().join(format!("engine_service_test_{}", Uuid::new_v4()))
    }

    fn completed(stdout: &str) -> RunOutcome {
        RunOutcome {
            kind: RunKind::Completed,
            stdout: stdout.to_string(),
            stderr: String::new(),
            exit_status: Some(0),
            execution_time_ms: 12,
            diagnostic: None,
        }
    }

    fn service(
        root: &PathBuf,
        compile: Result<CompileOutcome, ExecutorError>,
        run: RunOutcome,
    ) -> EngineServiceImpl {
        let executor = ExecutorStub::new(compile, run, Duration::from_millis(10));
        let engine = Engine::new(Arc::new(executor), WorkspaceManager::new(root), 2);
        EngineServiceImpl::new(engine)
    }

    fn suite_request(source: &str) -> RunSuiteRequest {
        RunSuiteRequest {
            source: source.to_string(),
            test_cases: vec![
                GrpcTestCase {
                    input: "2 3".to_string(),
                    expected_output: "5".to_string(),
                    hidden: false,
                },
                GrpcTestCase {
                    input: "1 1".to_string(),
                    expected_output: "2".to_string(),
                    hidden: true,
                },
            ],
        }
    }

    fn cleanup(root: &PathBuf) {
        if root.exists() {
            assert_eq!(std::fs::read_dir(root).unwrap().count(), 0);
            std::fs::remove_dir_all(root).unwrap();
        }
    }

    #[tokio::test]
    async fn test_run_once_success() {
        let root = test_root();
        let service = service(&root, Ok(CompileOutcome::success()), completed("5\n"));

        let response = service
            .run_once(Request::new(RunOnceRequest {
                source: "public class Solution {}".to_string(),
                stdin: "2 3".to_string(),
            }))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.verdict(), Verdict::Success);
        assert_eq!(response.output, "5\n");
        assert_eq!(response.error, None);
        cleanup(&root);
    }

    #[tokio::test]
    async fn test_run_once_guard_rejected() {
        let root = test_root();
        let service = service(&root, Ok(CompileOutcome::success()), completed("5\n"));

        let response = service
            .run_once(Request::new(RunOnceRequest {
                source: "new ProcessBuilder(\"ls\").start();".to_string(),
                stdin: String::new(),
            }))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.verdict(), Verdict::GuardRejected);
        assert_eq!(response.output, "");
        assert_eq!(response.error.as_deref(), Some(GUARD_REJECTED_MSG));
        cleanup(&root);
    }

    #[tokio::test]
    async fn test_run_once_compile_failed() {
        let root = test_root();
        let service = service(
            &root,
            Ok(CompileOutcome::failure("Solution.java:1: error: ';' expected")),
            completed(""),
        );

        let response = service
            .run_once(Request::new(RunOnceRequest {
                source: "public class Solution {".to_string(),
                stdin: String::new(),
            }))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.verdict(), Verdict::CompileFailed);
        assert_eq!(
            response.error.as_deref(),
            Some("Solution.java:1: error: ';' expected")
        );
        cleanup(&root);
    }

    #[tokio::test]
    async fn test_launch_failure_is_internal() {
        let root = test_root();
        let service = service(
            &root,
            Err(ExecutorError::LaunchFailed {
                program: "javac".to_string(),
                msg: "No such file or directory".to_string(),
            }),
            completed(""),
        );

        let error = service
            .run_once(Request::new(RunOnceRequest {
                source: "public class Solution {}".to_string(),
                stdin: String::new(),
            }))
            .await
            .unwrap_err();

        assert_eq!(error.code(), tonic::Code::Internal);
        assert!(error.message().contains("javac"));
        cleanup(&root);
    }

    #[tokio::test]
    async fn test_run_suite_scores_and_redacts() {
        let root = test_root();
        let service = service(&root, Ok(CompileOutcome::success()), completed("5\n"));

        let response = service
            .run_suite(Request::new(suite_request("public class Solution {}")))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.outcome(), SuiteOutcome::Scored);
        assert_eq!(response.passed_count, 1);
        assert_eq!(response.total_count, 2);
        assert_eq!(response.score_percent, 50);
        assert!(response.per_case[0].passed);
        assert_eq!(response.per_case[0].expected_output_or_redacted, "5");
        assert!(!response.per_case[1].passed);
        assert_eq!(
            response.per_case[1].expected_output_or_redacted,
            REDACTION_MARKER
        );
        assert!(response.started_at.is_some());
        assert!(response.finished_at.is_some());
        cleanup(&root);
    }

    #[tokio::test]
    async fn test_watch_suite_streams_every_state() {
        let root = test_root();
        let service = service(&root, Ok(CompileOutcome::success()), completed("5"));

        let mut stream = service
            .watch_suite(Request::new(suite_request("public class Solution {}")))
            .await
            .unwrap()
            .into_inner();

        let mut states = Vec::new();
        while let Some(event) = stream.next().await {
            states.push(event.unwrap().state.unwrap());
        }

        assert_eq!(states.len(), 8);
        assert!(matches!(states[0], State::Created(_)));
        assert!(matches!(states[1], State::Compiling(_)));
        assert!(matches!(states[2], State::Compiled(_)));
        assert!(matches!(&states[3], State::RunningCase(running) if running.index == 0));
        assert!(matches!(&states[6], State::CaseCompleted(done) if done.index == 1));
        match &states[7] {
            State::Scored(report) => {
                assert_eq!(report.score_percent, 50);
                assert_eq!(report.per_case.len(), 2);
            }
            other => panic!("Expected Scored, got: {:?}", other),
        }
        cleanup(&root);
    }

    #[tokio::test]
    async fn test_watch_suite_compile_failure() {
        let root = test_root();
        let service = service(
            &root,
            Ok(CompileOutcome::failure("error: cannot find symbol")),
            completed("5"),
        );

        let mut stream = service
            .watch_suite(Request::new(suite_request("public class Solution {")))
            .await
            .unwrap()
            .into_inner();

        let mut states = Vec::new();
        while let Some(event) = stream.next().await {
            states.push(event.unwrap().state.unwrap());
        }

        assert_eq!(states.len(), 3);
        match states.last().unwrap() {
            State::CompileFailed(report) => {
                assert_eq!(report.score_percent, 0);
                assert_eq!(report.passed_count, 0);
                assert_eq!(report.diagnostic.as_deref(), Some("error: cannot find symbol"));
                assert!(report.per_case.iter().all(|case| !case.passed));
            }
            other => panic!("Expected CompileFailed, got: {:?}", other),
        }
        cleanup(&root);
    }

    #[tokio::test]
    async fn test_watch_suite_ends_with_error_on_launch_failure() {
        let root = test_root();
        let service = service(
            &root,
            Ok(CompileOutcome::success()),
            RunOutcome::launch_failed("failed to launch java: No such file or directory"),
        );

        let mut stream = service
            .watch_suite(Request::new(suite_request("public class Solution {}")))
            .await
            .unwrap()
            .into_inner();

        let mut events = Vec::new();
        while let Some(event) = stream.next().await {
            events.push(event);
        }

        let last = events.pop().unwrap();
        assert_eq!(last.unwrap_err().code(), tonic::Code::Internal);
        assert!(events.into_iter().all(|event| event.is_ok()));
        cleanup(&root);
    }
}
