use std::time::Duration;

/// Wall-clock limit applied to every run of a compiled submission.
pub const RUN_DEADLINE: Duration = Duration::from_secs(5);

pub const TIME_LIMIT_EXCEEDED_MSG: &str = "Time Limit Exceeded";
pub const COMPILE_TIME_LIMIT_EXCEEDED_MSG: &str = "Compilation time limit exceeded";
pub const COMPILATION_FAILED_MSG: &str = "Compilation Failed";
pub const GUARD_REJECTED_MSG: &str = "Security Violation: Restricted keywords detected.";

/// Shown instead of the expected output of hidden test cases.
pub const REDACTION_MARKER: &str = "[hidden]";

pub const CLEANUP_RETRY_DELAY: Duration = Duration::from_millis(50);

pub const DEFAULT_ADDR: &str = "[::1]:50051";
pub const DEFAULT_MAX_CONCURRENT: usize = 8;
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;
pub const DEFAULT_CLEANUP_ATTEMPTS: u32 = 3;

/// Public class name every submission must declare.
pub const ENTRY_POINT: &str = "Solution";

/// How long to keep draining pipes after the process is gone.
pub const CAPTURE_GRACE: Duration = Duration::from_secs(1);
