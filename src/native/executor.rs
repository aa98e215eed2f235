use std::time::Duration;

use tokio::fs;

use crate::{
    constants::{COMPILE_TIME_LIMIT_EXCEEDED_MSG, DEFAULT_MAX_OUTPUT_BYTES, TIME_LIMIT_EXCEEDED_MSG},
    core::{
        domain::{CompileOutcome, RunKind, RunOutcome},
        traits::executor::{Executor, ExecutorError},
        workspace::Workspace,
    },
    native::{
        process::{Finished, supervise},
        toolchain::Toolchain,
    },
};

/// Runs the toolchain directly on the host, one process group per step.
#[derive(Clone, Debug)]
pub struct NativeExecutor {
    toolchain: Toolchain,
    compile_timeout: Option<Duration>,
    max_output_bytes: usize,
}

impl NativeExecutor {
    pub fn new(toolchain: Toolchain) -> Self {
        NativeExecutor {
            toolchain,
            compile_timeout: None,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }

    pub fn with_compile_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.compile_timeout = timeout;
        self
    }

    pub fn with_max_output_bytes(mut self, limit: usize) -> Self {
        self.max_output_bytes = limit;
        self
    }
}

#[async_trait::async_trait]
impl Executor for NativeExecutor {
    #[tracing::instrument(skip(self, workspace, source), fields(workspace = %workspace.id()))]
    async fn compile(
        &self,
        workspace: &Workspace,
        source: &str,
    ) -> Result<CompileOutcome, ExecutorError> {
        let source_path = workspace.path().join(&self.toolchain.entry_file);
        fs::write(&source_path, source)
            .await
            .map_err(|e| ExecutorError::Workspace {
                msg: format!("failed to write {}: {}", source_path.display(), e),
            })?;

        let compiler = &self.toolchain.compiler;
        let mut cmd = compiler.command(workspace.path());
        cmd.stdin(std::process::Stdio::null());
        let child = cmd.spawn().map_err(|e| ExecutorError::LaunchFailed {
            program: compiler.program_name(),
            msg: e.to_string(),
        })?;

        let finished = supervise(child, "", self.compile_timeout, self.max_output_bytes)
            .await
            .map_err(|e| ExecutorError::LaunchFailed {
                program: compiler.program_name(),
                msg: format!("failed to wait for compiler: {}", e),
            })?;
        tracing::debug!(
            status = ?finished.status,
            elapsed_ms = finished.elapsed.as_millis() as u64,
            "Compiler finished"
        );

        Ok(compile_outcome(finished))
    }

    #[tracing::instrument(skip(self, workspace, stdin), fields(workspace = %workspace.id()))]
    async fn run(&self, workspace: &Workspace, stdin: &str, deadline: Duration) -> RunOutcome {
        let runtime = &self.toolchain.runtime;
        let child = match runtime.command(workspace.path()).spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::error!(program = %runtime.program_name(), error = %e, "Runtime could not be launched");
                return RunOutcome::launch_failed(format!(
                    "failed to launch {}: {}",
                    runtime.program_name(),
                    e
                ));
            }
        };

        match supervise(child, stdin, Some(deadline), self.max_output_bytes).await {
            Ok(finished) => run_outcome(finished),
            Err(e) => RunOutcome::launch_failed(format!("failed to wait for program: {}", e)),
        }
    }
}

fn compile_outcome(finished: Finished) -> CompileOutcome {
    if finished.timed_out() {
        return CompileOutcome::failure(COMPILE_TIME_LIMIT_EXCEEDED_MSG);
    }
    if finished.status.is_some_and(|status| status.success()) {
        return CompileOutcome::success();
    }

    // javac reports on stderr; some toolchains only use stdout.
    if finished.stderr.trim().is_empty() {
        CompileOutcome::failure(finished.stdout)
    } else {
        CompileOutcome::failure(finished.stderr)
    }
}

fn run_outcome(finished: Finished) -> RunOutcome {
    let exit_status = finished.exit_code();
    let execution_time_ms = finished.elapsed.as_millis() as u64;

    let (kind, diagnostic) = if finished.timed_out() {
        (RunKind::TimedOut, Some(TIME_LIMIT_EXCEEDED_MSG.to_string()))
    } else if !finished.stderr.is_empty() {
        // Anything on the error stream fails the run, whatever the exit code.
        (RunKind::RuntimeFailed, Some(finished.stderr.clone()))
    } else if exit_status == Some(0) {
        (RunKind::Completed, None)
    } else if let Some(code) = exit_status {
        (
            RunKind::RuntimeFailed,
            Some(format!("Process exited with status {}", code)),
        )
    } else {
        (
            RunKind::RuntimeFailed,
            Some(format!(
                "Process terminated by signal {}",
                finished.signal().unwrap_or_default()
            )),
        )
    };

    RunOutcome {
        kind,
        stdout: finished.stdout,
        stderr: finished.stderr,
        exit_status,
        execution_time_ms,
        diagnostic,
    }
}
