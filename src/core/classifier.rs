use crate::core::{
    domain::{CompileOutcome, ExecutionResult, RunKind, RunOutcome, Verdict},
    errors::EngineError,
};

/// Maps raw compile/run outcomes to the caller-facing result.
///
/// `run` is `None` only when compilation failed. Output passes through
/// untouched; trimming is a comparison concern of the scorer.
pub fn classify(
    compile: &CompileOutcome,
    run: Option<RunOutcome>,
) -> Result<ExecutionResult, EngineError> {
    if !compile.succeeded {
        return Ok(ExecutionResult {
            verdict: Verdict::CompileFailed,
            output: String::new(),
            error: Some(compile.diagnostic.clone()),
        });
    }

    let Some(run) = run else {
        return Err(EngineError::LaunchFailed {
            msg: "compiled submission was never run".to_string(),
        });
    };

    let verdict = match run.kind {
        RunKind::Completed => Verdict::Success,
        RunKind::RuntimeFailed => Verdict::RuntimeFailed,
        RunKind::TimedOut => Verdict::TimedOut,
        RunKind::LaunchFailed => {
            return Err(EngineError::LaunchFailed {
                msg: run.diagnostic.unwrap_or_default(),
            });
        }
    };

    let error = match verdict {
        Verdict::Success => None,
        _ => run.diagnostic,
    };

    Ok(ExecutionResult {
        verdict,
        output: run.stdout,
        error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TIME_LIMIT_EXCEEDED_MSG;

    fn outcome(kind: RunKind, stdout: &str, diagnostic: Option<&str>) -> RunOutcome {
        RunOutcome {
            kind,
            stdout: stdout.to_string(),
            stderr: String::new(),
            exit_status: None,
            execution_time_ms: 10,
            diagnostic: diagnostic.map(str::to_string),
        }
    }

    #[test]
    fn test_compile_failure_has_no_output() {
        let compile = CompileOutcome::failure("Solution.java:3: error: ';' expected");
        let result = classify(&compile, None).unwrap();

        assert_eq!(result.verdict, Verdict::CompileFailed);
        assert_eq!(result.output, "");
        assert_eq!(
            result.error.as_deref(),
            Some("Solution.java:3: error: ';' expected")
        );
    }

    #[test]
    fn test_completed_output_is_not_trimmed() {
        let result = classify(
            &CompileOutcome::success(),
            Some(outcome(RunKind::Completed, "  5\n\n", None)),
        )
        .unwrap();

        assert_eq!(result.verdict, Verdict::Success);
        assert_eq!(result.output, "  5\n\n");
        assert_eq!(result.error, None);
    }

    #[test]
    fn test_timeout_keeps_partial_output() {
        let result = classify(
            &CompileOutcome::success(),
            Some(outcome(
                RunKind::TimedOut,
                "partial\n",
                Some(TIME_LIMIT_EXCEEDED_MSG),
            )),
        )
        .unwrap();

        assert_eq!(result.verdict, Verdict::TimedOut);
        assert_eq!(result.output, "partial\n");
        assert_eq!(result.error.as_deref(), Some(TIME_LIMIT_EXCEEDED_MSG));
    }

    #[test]
    fn test_runtime_failure_carries_stderr_diagnostic() {
        let result = classify(
            &CompileOutcome::success(),
            Some(outcome(
                RunKind::RuntimeFailed,
                "1\n",
                Some("Exception in thread \"main\""),
            )),
        )
        .unwrap();

        assert_eq!(result.verdict, Verdict::RuntimeFailed);
        assert_eq!(result.output, "1\n");
        assert_eq!(result.error.as_deref(), Some("Exception in thread \"main\""));
    }

    #[test]
    fn test_launch_failure_is_a_system_error() {
        let result = classify(
            &CompileOutcome::success(),
            Some(RunOutcome::launch_failed("No such file or directory")),
        );

        assert!(matches!(result, Err(EngineError::LaunchFailed { msg }) if msg.contains("No such file")));
    }
}
