use std::time::Duration;

use crate::core::{
    domain::{CompileOutcome, RunOutcome},
    workspace::Workspace,
};

/// Compiles and runs one submission inside a workspace it does not own.
#[mockall::automock]
#[async_trait::async_trait]
pub trait Executor: std::fmt::Debug + Send + Sync {
    /// Materializes `source` under the entry-point file name and compiles it.
    ///
    /// A submission that does not compile is an `Ok` outcome; `Err` is kept for
    /// faults of the environment.
    async fn compile(
        &self,
        workspace: &Workspace,
        source: &str,
    ) -> Result<CompileOutcome, ExecutorError>;

    /// Runs the artifact produced by [`Executor::compile`] against `stdin`.
    async fn run(&self, workspace: &Workspace, stdin: &str, deadline: Duration) -> RunOutcome;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutorError {
    #[error("failed to launch {program}: {msg}")]
    LaunchFailed { program: String, msg: String },
    #[error("workspace is unusable: {msg}")]
    Workspace { msg: String },
}
