use crate::core::{traits::executor::ExecutorError, workspace::WorkspaceError};

/// System-level failures. Problems with the submitted program never end up
/// here; they are reported as verdicts.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("toolchain could not be launched: {msg}")]
    LaunchFailed { msg: String },
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error("workspace is unusable: {msg}")]
    WorkspaceUnusable { msg: String },
    #[error("engine is shutting down")]
    Unavailable,
}

impl From<ExecutorError> for EngineError {
    fn from(err: ExecutorError) -> Self {
        match err {
            e @ ExecutorError::LaunchFailed { .. } => EngineError::LaunchFailed { msg: e.to_string() },
            ExecutorError::Workspace { msg } => EngineError::WorkspaceUnusable { msg },
        }
    }
}
