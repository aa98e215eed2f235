use std::time::Duration;

use crate::core::{
    domain::{CompileOutcome, RunOutcome},
    traits::executor::{Executor, ExecutorError},
    workspace::Workspace,
};

/// Answers every call with the same canned outcome after a fixed delay.
#[derive(Debug, Clone)]
pub struct ExecutorStub {
    compile: Result<CompileOutcome, ExecutorError>,
    run: RunOutcome,
    delay: Duration,
}

impl ExecutorStub {
    pub fn new(
        compile: Result<CompileOutcome, ExecutorError>,
        run: RunOutcome,
        delay: Duration,
    ) -> Self {
        Self {
            compile,
            run,
            delay,
        }
    }
}

#[async_trait::async_trait]
impl Executor for ExecutorStub {
    #[tracing::instrument(skip(self, workspace), fields(workspace = %workspace.id()))]
    async fn compile(
        &self,
        workspace: &Workspace,
        source: &str,
    ) -> Result<CompileOutcome, ExecutorError> {
        tracing::debug!("Start compilation: source={:?}", source);
        tokio::time::sleep(self.delay).await;
        tracing::debug!("Compilation result: {:?}", self.compile);

        self.compile.clone()
    }

    #[tracing::instrument(skip(self, workspace), fields(workspace = %workspace.id()))]
    async fn run(&self, workspace: &Workspace, stdin: &str, deadline: Duration) -> RunOutcome {
        tracing::debug!("Start execution: stdin={:?}, deadline={:?}", stdin, deadline);
        tokio::time::sleep(self.delay).await;
        tracing::debug!("Execution result: {:?}", self.run);

        self.run.clone()
    }
}
